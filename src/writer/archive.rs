//! WARC record writer.
//!
//! Each record is framed (header block, body, record separator) and wrapped
//! in its own gzip member, fully finalized before the call returns. Records
//! are therefore independently decompressible: a reader can seek to a
//! recorded offset and decompress exactly one record.

use crate::error::{Result, WarcError};
use crate::header::{self, RecordHeader};
use crate::types::{
    Body, FetchMeta, RecordId, RecordKind, RevisitProfile, TruncatedReason, WarcinfoFields,
};
use crate::writer::CountingWriter;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::trace;

const CRLF: &[u8] = b"\r\n";

const CONTENT_TYPE_WARC_FIELDS: &str = "application/warc-fields";
const CONTENT_TYPE_HTTP_REQUEST: &str = "application/http; msgtype=request";
const CONTENT_TYPE_HTTP_RESPONSE: &str = "application/http; msgtype=response";

// Literal values for the warcinfo body, fixed by the standard.
const WARC_FORMAT: &str = "WARC File Format 1.0";
const WARC_CONFORMS_TO: &str =
    "http://bibnum.bnf.fr/WARC/WARC_ISO_28500_version1_latestdraft.pdf";

/// Single-owner writer for one WARC output stream.
///
/// The warcinfo (manifest) record must be written first; every content
/// record operation fails with [`WarcError::WarcinfoMissing`] until it has
/// been. All operations return the freshly generated [`RecordId`].
///
/// Any IO error is fatal to the file: nothing is retried, and the caller
/// must treat the output as suspect after a failed write.
pub struct WarcWriter<W: Write> {
    out: CountingWriter<W>,
    warcinfo_id: Option<RecordId>,
}

impl WarcWriter<File> {
    /// Create a fresh archive file and take an exclusive lock on it.
    ///
    /// Fails with [`WarcError::Locked`] if another process holds the lock.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.try_lock_exclusive().map_err(|_| WarcError::Locked)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> WarcWriter<W> {
    /// Wrap an output sink. The writer assumes exclusive ownership of it.
    pub fn new(sink: W) -> Self {
        Self {
            out: CountingWriter::new(sink),
            warcinfo_id: None,
        }
    }

    /// Bytes flushed to the underlying sink so far.
    ///
    /// Read immediately before and after a record write, the difference is
    /// that record's exact compressed length.
    pub fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }

    /// Identifier of this file's warcinfo record, once written.
    pub fn warcinfo_id(&self) -> Option<&RecordId> {
        self.warcinfo_id.as_ref()
    }

    /// Flush and return the inner sink.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out.into_inner())
    }

    /// Write the warcinfo (manifest) record. Must be the first record of
    /// the file; its body is a `key: value` block describing provenance.
    pub fn write_warcinfo(&mut self, filename: &str, fields: &WarcinfoFields) -> Result<RecordId> {
        let mut body = String::with_capacity(256);
        push_warc_field(&mut body, "robots", "classic");
        if let Some(hostname) = &fields.hostname {
            push_warc_field(&mut body, "hostname", hostname);
        }
        if let Some(software) = &fields.software {
            push_warc_field(&mut body, "software", software);
        }
        if let Some(is_part_of) = &fields.is_part_of {
            push_warc_field(&mut body, "isPartOf", is_part_of);
        }
        if let Some(operator) = &fields.operator {
            push_warc_field(&mut body, "operator", operator);
        }
        if let Some(description) = &fields.description {
            push_warc_field(&mut body, "description", description);
        }
        if let Some(publisher) = &fields.publisher {
            push_warc_field(&mut body, "publisher", publisher);
        }
        push_warc_field(&mut body, "format", WARC_FORMAT);
        push_warc_field(&mut body, "conformsTo", WARC_CONFORMS_TO);

        let record_id = RecordId::new();
        let mut head = RecordHeader::new(
            RecordKind::Warcinfo,
            &Utc::now(),
            &record_id,
            body.len() as u64,
            CONTENT_TYPE_WARC_FIELDS,
        )?;
        head.set(header::WARC_FILENAME, filename)?;

        self.write_record(RecordKind::Warcinfo, head, Body::Bytes(body.as_bytes()))?;
        self.warcinfo_id = Some(record_id);
        Ok(record_id)
    }

    /// Write the request half of a capture.
    pub fn write_request(
        &mut self,
        target_uri: &str,
        ip: &str,
        date: DateTime<Utc>,
        warcinfo_id: &RecordId,
        body: &[u8],
    ) -> Result<RecordId> {
        self.require_warcinfo()?;
        let record_id = RecordId::new();
        let mut head = RecordHeader::new(
            RecordKind::Request,
            &date,
            &record_id,
            body.len() as u64,
            CONTENT_TYPE_HTTP_REQUEST,
        )?;
        head.set(header::WARC_WARCINFO_ID, warcinfo_id.bracketed())?;
        head.set(header::WARC_IP_ADDRESS, ip)?;
        head.set(header::WARC_TARGET_URI, target_uri)?;

        self.write_record(RecordKind::Request, head, Body::Bytes(body))?;
        Ok(record_id)
    }

    /// Write a full response record. `related_id` is the concurrently
    /// written request; digests come precomputed from the fetcher.
    #[allow(clippy::too_many_arguments)]
    pub fn write_response(
        &mut self,
        target_uri: &str,
        ip: &str,
        date: DateTime<Utc>,
        warcinfo_id: &RecordId,
        related_id: &RecordId,
        payload_digest: Option<&str>,
        block_digest: Option<&str>,
        truncated: Option<TruncatedReason>,
        body: &[u8],
        meta: &FetchMeta,
    ) -> Result<RecordId> {
        self.require_warcinfo()?;
        let record_id = RecordId::new();
        let mut head = RecordHeader::new(
            RecordKind::Response,
            &date,
            &record_id,
            body.len() as u64,
            CONTENT_TYPE_HTTP_RESPONSE,
        )?;
        head.set(header::WARC_WARCINFO_ID, warcinfo_id.bracketed())?;
        head.set(header::WARC_CONCURRENT_TO, related_id.bracketed())?;
        head.set(header::WARC_IP_ADDRESS, ip)?;
        head.set(header::WARC_TARGET_URI, target_uri)?;
        if let Some(digest) = payload_digest {
            head.set(header::WARC_PAYLOAD_DIGEST, digest)?;
        }
        if let Some(digest) = block_digest {
            head.set(header::WARC_BLOCK_DIGEST, digest)?;
        }
        if let Some(reason) = truncated {
            head.set(header::WARC_TRUNCATED, reason.as_str())?;
        }
        if let Some(identified) = meta.get(FetchMeta::IDENTIFIED_PAYLOAD_TYPE) {
            head.set(header::WARC_IDENTIFIED_PAYLOAD_TYPE, identified)?;
        }

        self.write_record(RecordKind::Response, head, Body::Bytes(body))?;
        Ok(record_id)
    }

    /// Write a revisit record in place of a response whose payload is known
    /// to duplicate or be unchanged from `related_id`.
    ///
    /// The body is a length-bounded reader; the reader producing fewer than
    /// `body_len` bytes fails the record with [`WarcError::BodyLength`].
    #[allow(clippy::too_many_arguments)]
    pub fn write_revisit(
        &mut self,
        target_uri: &str,
        ip: &str,
        date: DateTime<Utc>,
        warcinfo_id: &RecordId,
        related_id: &RecordId,
        profile: RevisitProfile,
        payload_digest: Option<&str>,
        body: &mut dyn Read,
        body_len: u64,
    ) -> Result<RecordId> {
        self.require_warcinfo()?;
        let record_id = RecordId::new();
        let mut head = RecordHeader::new(
            RecordKind::Revisit,
            &date,
            &record_id,
            body_len,
            CONTENT_TYPE_HTTP_RESPONSE,
        )?;
        head.set(header::WARC_WARCINFO_ID, warcinfo_id.bracketed())?;
        head.set(header::WARC_REFERS_TO, related_id.bracketed())?;
        head.set(header::WARC_IP_ADDRESS, ip)?;
        head.set(header::WARC_TARGET_URI, target_uri)?;
        head.set(header::WARC_PROFILE, profile.as_uri())?;
        if let Some(digest) = payload_digest {
            head.set(header::WARC_PAYLOAD_DIGEST, digest)?;
        }

        self.write_record(RecordKind::Revisit, head, Body::Stream(body, body_len))?;
        Ok(record_id)
    }

    /// Write a metadata record concurrent to `related_id`.
    pub fn write_metadata(
        &mut self,
        target_uri: &str,
        date: DateTime<Utc>,
        warcinfo_id: &RecordId,
        related_id: &RecordId,
        block_digest: Option<&str>,
        body: &[u8],
    ) -> Result<RecordId> {
        self.require_warcinfo()?;
        let record_id = RecordId::new();
        let mut head = RecordHeader::new(
            RecordKind::Metadata,
            &date,
            &record_id,
            body.len() as u64,
            CONTENT_TYPE_WARC_FIELDS,
        )?;
        head.set(header::WARC_WARCINFO_ID, warcinfo_id.bracketed())?;
        head.set(header::WARC_CONCURRENT_TO, related_id.bracketed())?;
        head.set(header::WARC_TARGET_URI, target_uri)?;
        if let Some(digest) = block_digest {
            head.set(header::WARC_BLOCK_DIGEST, digest)?;
        }

        self.write_record(RecordKind::Metadata, head, Body::Bytes(body))?;
        Ok(record_id)
    }

    /// Write a conversion record holding content derived from `related_id`
    /// (re-encoded text, extracted plaintext), not the original bytes.
    #[allow(clippy::too_many_arguments)]
    pub fn write_conversion(
        &mut self,
        target_uri: &str,
        date: DateTime<Utc>,
        warcinfo_id: &RecordId,
        related_id: &RecordId,
        block_digest: Option<&str>,
        content_type: &str,
        body: &[u8],
    ) -> Result<RecordId> {
        self.require_warcinfo()?;
        let record_id = RecordId::new();
        let mut head = RecordHeader::new(
            RecordKind::Conversion,
            &date,
            &record_id,
            body.len() as u64,
            content_type,
        )?;
        head.set(header::WARC_WARCINFO_ID, warcinfo_id.bracketed())?;
        head.set(header::WARC_REFERS_TO, related_id.bracketed())?;
        head.set(header::WARC_TARGET_URI, target_uri)?;
        if let Some(digest) = block_digest {
            head.set(header::WARC_BLOCK_DIGEST, digest)?;
        }

        self.write_record(RecordKind::Conversion, head, Body::Bytes(body))?;
        Ok(record_id)
    }

    fn require_warcinfo(&self) -> Result<()> {
        if self.warcinfo_id.is_none() {
            return Err(WarcError::WarcinfoMissing);
        }
        Ok(())
    }

    /// Frame one record into a fresh gzip member.
    ///
    /// The member is fully finished before returning, so the byte count on
    /// the sink covers the complete record. On error the partially written
    /// member is abandoned and the file must be considered suspect.
    fn write_record(&mut self, kind: RecordKind, head: RecordHeader, body: Body<'_>) -> Result<()> {
        let start = self.out.bytes_written();
        let mut gz = GzEncoder::new(&mut self.out, Compression::default());

        gz.write_all(&head.render())?;
        match body {
            Body::Bytes(bytes) => gz.write_all(bytes)?,
            Body::Stream(reader, declared) => {
                let copied = io::copy(&mut reader.take(declared), &mut gz)?;
                if copied != declared {
                    return Err(WarcError::BodyLength {
                        declared,
                        got: copied,
                    });
                }
            }
        }
        gz.write_all(CRLF)?;
        gz.write_all(CRLF)?;
        gz.finish()?;

        trace!(
            kind = kind.as_str(),
            compressed = self.out.bytes_written() - start,
            "wrote record"
        );
        Ok(())
    }
}

fn push_warc_field(buf: &mut String, name: &str, value: &str) {
    buf.push_str(name);
    buf.push_str(": ");
    buf.push_str(value);
    buf.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn decompress(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut out)
            .expect("valid gzip member");
        out
    }

    fn manifest_writer() -> (WarcWriter<Vec<u8>>, RecordId) {
        let mut writer = WarcWriter::new(Vec::new());
        let id = writer
            .write_warcinfo("test.warc.gz", &WarcinfoFields::default())
            .unwrap();
        (writer, id)
    }

    #[test]
    fn test_content_record_requires_warcinfo() {
        let mut writer = WarcWriter::new(Vec::new());
        let bogus = RecordId::new();
        let err = writer
            .write_request("http://example.org/", "1.2.3.4", Utc::now(), &bogus, b"GET /")
            .unwrap_err();
        assert!(matches!(err, WarcError::WarcinfoMissing));
        assert_eq!(writer.bytes_written(), 0);
    }

    #[test]
    fn test_warcinfo_body_fields() {
        let mut writer = WarcWriter::new(Vec::new());
        let fields = WarcinfoFields {
            hostname: Some("crawler-01".into()),
            software: Some("warcforge 0.1".into()),
            ..Default::default()
        };
        writer.write_warcinfo("crawl-0001.warc.gz", &fields).unwrap();

        let bytes = writer.finish().unwrap();
        let record = decompress(&bytes);
        assert!(record.contains("WARC-Type: warcinfo\r\n"));
        assert!(record.contains("WARC-Filename: crawl-0001.warc.gz\r\n"));
        assert!(record.contains("robots: classic\r\n"));
        assert!(record.contains("hostname: crawler-01\r\n"));
        assert!(record.contains("format: WARC File Format 1.0\r\n"));
        assert!(record.contains("conformsTo: http://"));
        assert!(record.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_content_length_is_exact() {
        let (mut writer, warcinfo_id) = manifest_writer();
        let body = b"GET / HTTP/1.1\r\nHost: example.org\r\n\r\n";
        let start = writer.bytes_written();
        writer
            .write_request("http://example.org/", "1.2.3.4", Utc::now(), &warcinfo_id, body)
            .unwrap();
        let end = writer.bytes_written();

        let bytes = writer.finish().unwrap();
        assert_eq!(end, bytes.len() as u64);
        let record = decompress(&bytes[start as usize..end as usize]);
        assert!(record.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(record.contains("WARC-Target-URI: http://example.org/\r\n"));
    }

    #[test]
    fn test_response_linkage_headers() {
        let (mut writer, warcinfo_id) = manifest_writer();
        let request_id = writer
            .write_request("http://example.org/", "1.2.3.4", Utc::now(), &warcinfo_id, b"")
            .unwrap();
        let before = writer.bytes_written();
        writer
            .write_response(
                "http://example.org/",
                "1.2.3.4",
                Utc::now(),
                &warcinfo_id,
                &request_id,
                Some("sha1:deadbeef"),
                None,
                Some(TruncatedReason::Length),
                b"hello",
                &FetchMeta::new(),
            )
            .unwrap();

        let bytes = writer.finish().unwrap();
        let record = decompress(&bytes[before as usize..]);
        assert!(record.contains(&format!("WARC-Warcinfo-ID: {}\r\n", warcinfo_id.bracketed())));
        assert!(record.contains(&format!("WARC-Concurrent-To: {}\r\n", request_id.bracketed())));
        assert!(record.contains("WARC-Payload-Digest: sha1:deadbeef\r\n"));
        assert!(record.contains("WARC-Truncated: length\r\n"));
        assert!(record.contains("hello\r\n\r\n"));
    }

    #[test]
    fn test_revisit_stream_body() {
        let (mut writer, warcinfo_id) = manifest_writer();
        let prior = RecordId::new();
        let body = b"HTTP/1.1 304 Not Modified\r\n\r\n";
        let before = writer.bytes_written();
        writer
            .write_revisit(
                "http://example.org/",
                "1.2.3.4",
                Utc::now(),
                &warcinfo_id,
                &prior,
                RevisitProfile::ServerNotModified,
                None,
                &mut &body[..],
                body.len() as u64,
            )
            .unwrap();

        let bytes = writer.finish().unwrap();
        let record = decompress(&bytes[before as usize..]);
        assert!(record.contains("WARC-Type: revisit\r\n"));
        assert!(record.contains(&format!("WARC-Refers-To: {}\r\n", prior.bracketed())));
        assert!(record.contains(
            "WARC-Profile: http://netpreserve.org/warc/1.0/revisit/server-not-modified\r\n"
        ));
    }

    #[test]
    fn test_short_stream_body_fails() {
        let (mut writer, warcinfo_id) = manifest_writer();
        let prior = RecordId::new();
        let body = b"short";
        let err = writer
            .write_revisit(
                "http://example.org/",
                "1.2.3.4",
                Utc::now(),
                &warcinfo_id,
                &prior,
                RevisitProfile::IdenticalPayloadDigest,
                None,
                &mut &body[..],
                100,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WarcError::BodyLength { declared: 100, got: 5 }
        ));
    }

    #[test]
    fn test_distinct_record_ids() {
        let (mut writer, warcinfo_id) = manifest_writer();
        let a = writer
            .write_request("http://example.org/", "1.2.3.4", Utc::now(), &warcinfo_id, b"x")
            .unwrap();
        let b = writer
            .write_request("http://example.org/", "1.2.3.4", Utc::now(), &warcinfo_id, b"x")
            .unwrap();
        assert_ne!(a, b);
    }
}
