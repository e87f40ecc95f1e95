//! Dump file parsing

pub mod hprof;
pub mod read_buffer;
pub mod record;

pub use hprof::{parse_buffer, parse_file};
pub use read_buffer::ReadBuffer;
