//! Serialization formats for record files.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// On-disk encoding of record content.
///
/// The format decides both the bytes written for a record and the file
/// suffix appended to every resolved address of an entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Pretty-printed UTF-8 JSON (`.json`).
    #[default]
    Json,
    /// CBOR as produced by `ciborium` (`.cbor`).
    Cbor,
}

impl Format {
    /// File suffix, including the leading dot.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Json => ".json",
            Self::Cbor => ".cbor",
        }
    }

    /// Lowercase format name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Cbor => "cbor",
        }
    }

    /// Encodes `value` into bytes.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` if the value cannot be represented.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> CodecResult<Vec<u8>> {
        match self {
            Self::Json => {
                serde_json::to_vec_pretty(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
            }
            Self::Cbor => {
                let mut buffer = Vec::new();
                ciborium::ser::into_writer(value, &mut buffer)
                    .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
                Ok(buffer)
            }
        }
    }

    /// Decodes bytes into a `T`.
    ///
    /// # Errors
    ///
    /// Returns `DecodingFailed` if the bytes are malformed or do not match
    /// the shape of `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
            }
            Self::Cbor => {
                ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "cbor" => Ok(Self::Cbor),
            _ => Err(CodecError::UnknownFormat { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: String,
        name: String,
        count: u32,
    }

    #[test]
    fn suffixes() {
        assert_eq!(Format::Json.suffix(), ".json");
        assert_eq!(Format::Cbor.suffix(), ".cbor");
        assert_eq!(Format::default(), Format::Json);
    }

    #[test]
    fn json_is_readable_text() {
        let bytes = Format::Json.encode(&json!({"name": "gear"})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"name\": \"gear\""));
    }

    #[test]
    fn typed_roundtrip_both_formats() {
        let widget = Widget {
            id: "1f30d7b6-0296-489a-9615-55868aeef78a".into(),
            name: "gear".into(),
            count: 3,
        };
        for format in [Format::Json, Format::Cbor] {
            let bytes = format.encode(&widget).unwrap();
            let back: Widget = format.decode(&bytes).unwrap();
            assert_eq!(back, widget);
        }
    }

    #[test]
    fn cbor_decodes_into_json_value() {
        let value = json!({"name": "gear", "tags": ["a", "b"], "count": 2});
        let bytes = Format::Cbor.encode(&value).unwrap();
        let back: serde_json::Value = Format::Cbor.decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn decode_garbage_fails() {
        let err = Format::Json.decode::<Widget>(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));

        let err = Format::Json.decode::<Widget>(br#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));

        let err = Format::Cbor.decode::<Widget>(&[0xff, 0x00]).unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
    }

    #[test]
    fn parse_names() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("CBOR".parse::<Format>().unwrap(), Format::Cbor);
        assert!("yaml".parse::<Format>().is_err());
        assert_eq!(Format::Cbor.to_string(), "cbor");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Format::Cbor).unwrap(), "\"cbor\"");
        let format: Format = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, Format::Json);
    }

    proptest! {
        #[test]
        fn text_survives_both_formats(name in "\\PC{0,40}", count in any::<u32>()) {
            let widget = Widget { id: "x".into(), name, count };
            for format in [Format::Json, Format::Cbor] {
                let bytes = format.encode(&widget).unwrap();
                let back: Widget = format.decode(&bytes).unwrap();
                prop_assert_eq!(&back, &widget);
            }
        }
    }
}
