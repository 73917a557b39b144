//! Core types for the archive writer.

use std::fmt;
use std::io::Read;
use uuid::Uuid;

/// Unique identifier for an archive record.
///
/// A fresh random UUID per record; identifiers are opaque and carry no
/// ordering. Rendered in URN form (`urn:uuid:...`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        RecordId(Uuid::new_v4())
    }

    /// Render as an angle-bracketed URI reference, the form WARC headers use.
    pub fn bracketed(&self) -> String {
        format!("<{}>", self)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId(urn:uuid:{})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:uuid:{}", self.0)
    }
}

/// Archive record types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Warcinfo,
    Request,
    Response,
    Revisit,
    Metadata,
    Conversion,
}

impl RecordKind {
    /// The WARC-Type header token.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Warcinfo => "warcinfo",
            RecordKind::Request => "request",
            RecordKind::Response => "response",
            RecordKind::Revisit => "revisit",
            RecordKind::Metadata => "metadata",
            RecordKind::Conversion => "conversion",
        }
    }
}

/// Why a revisit record was written instead of a full response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisitProfile {
    /// The payload digest matched a previously stored response.
    IdenticalPayloadDigest,
    /// The server answered 304 Not Modified.
    ServerNotModified,
}

impl RevisitProfile {
    /// The WARC-Profile URI.
    pub fn as_uri(&self) -> &'static str {
        match self {
            RevisitProfile::IdenticalPayloadDigest => {
                "http://netpreserve.org/warc/1.0/revisit/identical-payload-digest"
            }
            RevisitProfile::ServerNotModified => {
                "http://netpreserve.org/warc/1.0/revisit/server-not-modified"
            }
        }
    }
}

/// Why body capture was cut short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TruncatedReason {
    /// A configured length limit was reached.
    Length,
    /// A time limit was reached.
    Time,
    /// The connection was lost mid-transfer.
    Disconnect,
    Unspecified,
}

impl TruncatedReason {
    /// The WARC-Truncated reason token.
    pub fn as_str(&self) -> &'static str {
        match self {
            TruncatedReason::Length => "length",
            TruncatedReason::Time => "time",
            TruncatedReason::Disconnect => "disconnect",
            TruncatedReason::Unspecified => "unspecified",
        }
    }
}

/// A record body: in-memory bytes, or a reader bounded by a declared length.
pub enum Body<'a> {
    Bytes(&'a [u8]),
    /// Reader plus the exact number of bytes expected from it. The record
    /// header declares this length, so the reader producing fewer bytes is
    /// an error.
    Stream(&'a mut dyn Read, u64),
}

impl Body<'_> {
    /// The length the record header will declare.
    pub fn declared_len(&self) -> u64 {
        match self {
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::Stream(_, len) => *len,
        }
    }
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Body::Stream(_, len) => write!(f, "Body::Stream({} bytes)", len),
        }
    }
}

/// Metadata attached to a fetch result by the crawl pipeline.
///
/// Insertion-ordered; `get` returns the first value set for a name. The
/// index writer reads at least `Content-Type` and `HTTP-Status-Code`.
#[derive(Clone, Debug, Default)]
pub struct FetchMeta {
    fields: Vec<(String, String)>,
}

impl FetchMeta {
    pub const CONTENT_TYPE: &'static str = "Content-Type";
    pub const HTTP_STATUS_CODE: &'static str = "HTTP-Status-Code";
    pub const IDENTIFIED_PAYLOAD_TYPE: &'static str = "Identified-Payload-Type";

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value set for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Optional provenance fields for the warcinfo (manifest) record body.
#[derive(Clone, Debug, Default)]
pub struct WarcinfoFields {
    pub hostname: Option<String>,
    pub software: Option<String>,
    pub is_part_of: Option<String>,
    pub operator: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
}
