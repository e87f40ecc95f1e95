//! lobster-core: HPROF heap dump parsing, object graph model, and queries
//!
//! The pipeline is parse -> resolve -> query:
//! - [`parser`] reads a binary HPROF dump into an unresolved [`snapshot::Snapshot`]
//! - [`snapshot::Snapshot::resolve`] links classes, instances and roots into
//!   an object graph, optionally inverting it for referrer queries
//! - [`query`] renders analysis pages over the resolved snapshot, and
//!   [`server`] exposes them over HTTP

pub mod errors;
pub mod parser;
pub mod query;
pub mod server;
pub mod snapshot;

pub use errors::{ErrorKind, LobsterError, Result};
pub use parser::{parse_buffer, parse_file};
pub use snapshot::Snapshot;
