//! # WARC Archive Writer
//!
//! Persists fetched web content into gzip-per-record WARC files and
//! simultaneously produces a CDX byte-range index over them.
//!
//! ## Core Concepts
//!
//! - **Records**: Self-contained archive units (warcinfo, request, response,
//!   revisit, metadata, conversion), each compressed independently so a
//!   reader can decompress exactly one record from its byte range
//! - **Warcinfo**: The per-file manifest record; always first, referenced by
//!   every content record in the file
//! - **CDX index**: One line per indexed response carrying the canonical
//!   sort key, timestamp, and the record's exact compressed offset/length
//!
//! ## Example
//!
//! ```ignore
//! use warcforge::{CdxWriter, FetchMeta, WarcinfoFields};
//! use chrono::Utc;
//!
//! let mut writer = CdxWriter::new(warc_file, cdx_file, "crawl-0001.warc.gz");
//!
//! let warcinfo_id = writer.write_warcinfo(&WarcinfoFields::default())?;
//! let request_id = writer.write_request(url, ip, Utc::now(), &warcinfo_id, request_bytes)?;
//! writer.write_response(
//!     url, ip, Utc::now(), &warcinfo_id, &request_id,
//!     Some("sha1:deadbeef"), None, None, body, &meta,
//! )?;
//! ```

pub mod digest;
pub mod error;
pub mod header;
pub mod index;
pub mod pipeline;
pub mod types;
pub mod writer;

// Re-exports
pub use error::{Result, WarcError};
pub use header::RecordHeader;
pub use index::{CdxWriter, KeyError, SortKeyMaker, SurtKeyMaker};
pub use pipeline::{Capture, WriterPipeline};
pub use types::*;
pub use writer::{CountingWriter, WarcWriter};
