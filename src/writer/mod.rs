//! Archive output path.
//!
//! The archive writer frames and gzip-compresses one record at a time onto
//! an offset-tracking sink, so every record's exact compressed byte range
//! is known as soon as it is written.

mod archive;
mod count;

pub use archive::WarcWriter;
pub use count::CountingWriter;
