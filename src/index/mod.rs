//! CDX index emission.
//!
//! The index is a sequential projection of the archive: one line per
//! indexed response, written in call order, carrying the canonical sort
//! key and the record's exact compressed byte range.

mod cdx;
mod surt;

pub use cdx::CdxWriter;
pub use surt::{KeyError, SortKeyMaker, SurtKeyMaker};
