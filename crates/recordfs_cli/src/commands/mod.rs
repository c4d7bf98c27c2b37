//! CLI command implementations.

pub mod check;
pub mod classify;
pub mod get;
pub mod history;
pub mod list;
pub mod resolve;
pub mod watch;
