//! # recordfs Storage
//!
//! Storage backend and watch traits, with implementations, for recordfs.
//!
//! This crate provides the lowest-level abstraction recordfs stores records
//! through. Backends are **opaque hierarchical byte stores**: they read,
//! write, list and remove files addressed by root-relative paths and know
//! nothing about entity kinds, templates or versions.
//!
//! ## Design Principles
//!
//! - Paths are `/`-prefixed strings relative to one root
//! - Replacing writes are atomic; no-clobber writes never overwrite
//! - Backends must be `Send + Sync` for shared access
//! - Watches are scoped: dropping a [`WatchHandle`] releases it
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage below a directory
//!
//! ## Example
//!
//! ```rust
//! use recordfs_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.write_bytes("/widgets/a.json", b"hello world").unwrap();
//! let data = backend.read_bytes("/widgets/a.json").unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
pub mod path;
mod watch;

pub use backend::{DirEntry, StorageBackend, Walk};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, DEFAULT_POLL_INTERVAL};
pub use memory::InMemoryBackend;
pub use watch::{WatchEvent, WatchEventKind, WatchHandle, WatchSource};
