//! Built-in sink implementations.

mod file;
mod log;

pub use file::{FileSink, FileSinkConfig};
pub use log::LogSink;
