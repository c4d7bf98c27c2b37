//! # recordfs Codec
//!
//! Record content encoding/decoding for recordfs.
//!
//! Each entity kind stores its records in one [`Format`]. The format owns the
//! byte encoding and the file suffix appended to resolved addresses, so the
//! rest of recordfs never touches serialization details.
//!
//! ## Usage
//!
//! ```
//! use recordfs_codec::Format;
//! use serde_json::json;
//!
//! let value = json!({"name": "gear"});
//! let bytes = Format::Json.encode(&value).unwrap();
//! let decoded: serde_json::Value = Format::Json.decode(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! assert_eq!(Format::Json.suffix(), ".json");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod format;

pub use error::{CodecError, CodecResult};
pub use format::Format;
