//! Shared utilities for the lobster heap analyzer
//!
//! Small, dependency-light helpers used by `lobster-core`:
//! - `bytes`: big-endian readers over raw dump data
//! - `hex`: object identifier formatting and parsing
//! - `html`: entity escaping for query pages

pub mod bytes;
pub mod hex;
pub mod html;

pub use bytes::{BeReader, ByteError};
pub use hex::{parse_hex, to_hex, HexError};
pub use html::encode_html;
