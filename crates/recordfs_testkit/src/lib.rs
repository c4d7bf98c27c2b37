//! # recordfs Testkit
//!
//! Test utilities for recordfs.
//!
//! This crate provides:
//! - A sample schema (widgets, nested subwidgets, versioned notes)
//! - Temporary stores on disk or in memory
//! - Property-based test generators using proptest
//! - Concurrent write stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use recordfs_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let widgets = store.documents(&widget_kind()).unwrap();
//!     widgets.put_record(Widget::new(widget_one(), "gear")).unwrap();
//!     assert_eq!(widgets.list_all().unwrap().len(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
