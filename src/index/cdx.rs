//! CDX index writer.
//!
//! Composes the archive writer: every indexed response is appended to the
//! archive first, then one index line is emitted using the byte range the
//! offset-tracking sink observed for that record. A malformed target URL
//! only costs the index line, never the archive record.

use crate::error::Result;
use crate::index::surt::{SortKeyMaker, SurtKeyMaker};
use crate::types::{FetchMeta, RecordId, TruncatedReason, WarcinfoFields};
use crate::writer::WarcWriter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

/// Sentinel for an absent digest.
const ABSENT: &str = "-";

/// Index line payload. Key order is part of the format; serde emits struct
/// fields in declaration order.
#[derive(Serialize)]
struct CdxPayload<'a> {
    url: &'a str,
    mime: &'a str,
    status: &'a str,
    digest: &'a str,
    length: String,
    offset: String,
    filename: &'a str,
}

/// JSON formatting expected by downstream index readers: `": "` between key
/// and value, `", "` between entries, all non-ASCII escaped.
struct CdxJsonFormatter;

impl serde_json::ser::Formatter for CdxJsonFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !first {
            writer.write_all(b", ")?;
        }
        Ok(())
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Archive writer plus a CDX line sink.
///
/// Indexed writes are strictly sequenced: archive record first, index line
/// second, in call order. The index is never reordered or buffered across
/// entries.
pub struct CdxWriter<W: Write, C: Write> {
    archive: WarcWriter<W>,
    cdx_out: C,
    filename: String,
    key_maker: Box<dyn SortKeyMaker + Send>,
}

impl<W: Write, C: Write> CdxWriter<W, C> {
    /// Wrap an archive sink and an index sink. `filename` is the archive
    /// file name recorded in every index line and in the warcinfo record.
    pub fn new(warc_out: W, cdx_out: C, filename: impl Into<String>) -> Self {
        Self::with_key_maker(warc_out, cdx_out, filename, Box::new(SurtKeyMaker))
    }

    /// Same, with a custom sort key scheme.
    pub fn with_key_maker(
        warc_out: W,
        cdx_out: C,
        filename: impl Into<String>,
        key_maker: Box<dyn SortKeyMaker + Send>,
    ) -> Self {
        Self {
            archive: WarcWriter::new(warc_out),
            cdx_out,
            filename: filename.into(),
            key_maker,
        }
    }

    /// The composed archive writer, for record kinds that are not indexed.
    pub fn archive(&self) -> &WarcWriter<W> {
        &self.archive
    }

    pub fn archive_mut(&mut self) -> &mut WarcWriter<W> {
        &mut self.archive
    }

    /// Write the warcinfo record for this file.
    pub fn write_warcinfo(&mut self, fields: &WarcinfoFields) -> Result<RecordId> {
        let filename = self.filename.clone();
        self.archive.write_warcinfo(&filename, fields)
    }

    /// Write a request record (not indexed).
    pub fn write_request(
        &mut self,
        target_uri: &str,
        ip: &str,
        date: DateTime<Utc>,
        warcinfo_id: &RecordId,
        body: &[u8],
    ) -> Result<RecordId> {
        self.archive
            .write_request(target_uri, ip, date, warcinfo_id, body)
    }

    /// Append a response record and emit its index line.
    ///
    /// The record is durable before the line is written; if the target URL
    /// cannot be canonicalized the line is skipped with a diagnostic and
    /// the call still succeeds.
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
        let offset = self.archive.bytes_written();
        let record_id = self.archive.write_response(
            target_uri,
            ip,
            date,
            warcinfo_id,
            related_id,
            payload_digest,
            block_digest,
            truncated,
            body,
            meta,
        )?;
        let length = self.archive.bytes_written() - offset;
        self.write_cdx_line(target_uri, &date, offset, length, payload_digest, meta)?;
        Ok(record_id)
    }

    /// Flush both sinks and return them.
    pub fn finish(mut self) -> Result<(W, C)> {
        self.cdx_out.flush()?;
        Ok((self.archive.finish()?, self.cdx_out))
    }

    fn write_cdx_line(
        &mut self,
        url: &str,
        date: &DateTime<Utc>,
        offset: u64,
        length: u64,
        payload_digest: Option<&str>,
        meta: &FetchMeta,
    ) -> Result<()> {
        let key = match self.key_maker.make_key(url) {
            Ok(key) => key,
            Err(e) => {
                error!(url, error = %e, "failed to derive sort key, skipping index line");
                return Ok(());
            }
        };

        let payload = CdxPayload {
            url,
            mime: clean_mime(meta.get(FetchMeta::CONTENT_TYPE)),
            status: meta.get(FetchMeta::HTTP_STATUS_CODE).unwrap_or("unk"),
            digest: clean_digest(payload_digest),
            length: length.to_string(),
            offset: offset.to_string(),
            filename: &self.filename,
        };
        let mut json = Vec::with_capacity(256);
        let mut ser = serde_json::Serializer::with_formatter(&mut json, CdxJsonFormatter);
        payload.serialize(&mut ser)?;

        self.cdx_out.write_all(key.as_bytes())?;
        self.cdx_out.write_all(b" ")?;
        self.cdx_out
            .write_all(date.format("%Y%m%d%H%M%S").to_string().as_bytes())?;
        self.cdx_out.write_all(b" ")?;
        self.cdx_out.write_all(&json)?;
        self.cdx_out.write_all(b"\n")?;
        Ok(())
    }
}

/// Strip MIME parameters: substring before the first `;` or space, with the
/// `unk` sentinel for empty or missing types.
fn clean_mime(mime: Option<&str>) -> &str {
    let mime = match mime {
        Some(mime) => mime,
        None => return "unk",
    };
    let mime = match mime.find(|c| c == ';' || c == ' ') {
        Some(pos) => &mime[..pos],
        None => mime,
    };
    if mime.is_empty() {
        "unk"
    } else {
        mime
    }
}

/// Strip the `sha1:` algorithm prefix; other digests pass through.
fn clean_digest(digest: Option<&str>) -> &str {
    match digest {
        Some(digest) => digest.strip_prefix("sha1:").unwrap_or(digest),
        None => ABSENT,
    }
}
