//! WARC record header framing.
//!
//! A header block is the fixed version line, `Name: Value` lines in a
//! fixed order (mandatory fields first, extensions after), and a blank-line
//! terminator. Field order is part of the on-disk contract, so fields are
//! kept as an insertion-ordered list rather than a map.

use crate::error::{Result, WarcError};
use crate::types::{RecordId, RecordKind};
use chrono::{DateTime, Utc};

/// Fixed version line.
pub const WARC_VERSION: &str = "WARC/1.0";

// Mandatory header names.
pub const WARC_TYPE: &str = "WARC-Type";
pub const WARC_DATE: &str = "WARC-Date";
pub const WARC_RECORD_ID: &str = "WARC-Record-ID";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

// Extension header names, emitted only when applicable.
pub const WARC_IP_ADDRESS: &str = "WARC-IP-Address";
pub const WARC_WARCINFO_ID: &str = "WARC-Warcinfo-ID";
pub const WARC_TARGET_URI: &str = "WARC-Target-URI";
pub const WARC_CONCURRENT_TO: &str = "WARC-Concurrent-To";
pub const WARC_REFERS_TO: &str = "WARC-Refers-To";
pub const WARC_BLOCK_DIGEST: &str = "WARC-Block-Digest";
pub const WARC_PAYLOAD_DIGEST: &str = "WARC-Payload-Digest";
pub const WARC_TRUNCATED: &str = "WARC-Truncated";
pub const WARC_IDENTIFIED_PAYLOAD_TYPE: &str = "WARC-Identified-Payload-Type";
pub const WARC_PROFILE: &str = "WARC-Profile";
pub const WARC_FILENAME: &str = "WARC-Filename";

const CRLF: &str = "\r\n";
const COLONSP: &str = ": ";

/// Format a timestamp the way WARC-Date requires: ISO-8601 UTC, second
/// precision, `Z` suffix.
pub fn format_warc_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Ordered header block for one record.
///
/// Construction fixes the five mandatory fields; `set` appends extension
/// fields in call order. Every value passes the same framing check, so a
/// header line can never smuggle in another line. Content-Length is taken
/// from the actual body length by the caller, never from external input.
#[derive(Debug)]
pub struct RecordHeader {
    fields: Vec<(&'static str, String)>,
}

impl RecordHeader {
    /// Start a header with the mandatory fields in their fixed order.
    ///
    /// Rejects a content type that would break line framing; the other
    /// mandatory values are generated, not caller input, but are checked
    /// the same way.
    pub fn new(
        kind: RecordKind,
        date: &DateTime<Utc>,
        record_id: &RecordId,
        content_length: u64,
        content_type: &str,
    ) -> Result<Self> {
        let mut header = Self { fields: Vec::with_capacity(8) };
        header.push(WARC_TYPE, kind.as_str().to_string())?;
        header.push(WARC_DATE, format_warc_date(date))?;
        header.push(WARC_RECORD_ID, record_id.bracketed())?;
        header.push(CONTENT_LENGTH, content_length.to_string())?;
        header.push(CONTENT_TYPE, content_type.to_string())?;
        Ok(header)
    }

    /// Append an extension field.
    ///
    /// Rejects duplicate names and values that would break line framing.
    pub fn set(&mut self, name: &'static str, value: impl Into<String>) -> Result<()> {
        self.push(name, value.into())
    }

    fn push(&mut self, name: &'static str, value: String) -> Result<()> {
        if value.contains('\r') || value.contains('\n') {
            return Err(WarcError::InvalidHeader { name, value });
        }
        if self.fields.iter().any(|(n, _)| *n == name) {
            return Err(WarcError::DuplicateHeader(name));
        }
        self.fields.push((name, value));
        Ok(())
    }

    /// Render the complete header block, blank-line terminator included.
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::with_capacity(512);
        out.push_str(WARC_VERSION);
        out.push_str(CRLF);
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push_str(COLONSP);
            out.push_str(value);
            out.push_str(CRLF);
        }
        out.push_str(CRLF);
        out.into_bytes()
    }
}
