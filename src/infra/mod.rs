//! Driver-only configuration sources.

mod header_file;

pub use header_file::HeaderFile;
