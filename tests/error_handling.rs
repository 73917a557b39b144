//! Error-path tests: contract violations and unrecoverable writes.

use chrono::Utc;
use tempfile::TempDir;
use warcforge::{
    CdxWriter, FetchMeta, RecordId, WarcError, WarcWriter, WarcinfoFields,
};

#[test]
fn test_content_record_before_manifest_rejected() {
    let mut writer = CdxWriter::new(Vec::new(), Vec::new(), "crawl-0001.warc.gz");
    let bogus = RecordId::new();
    let err = writer
        .write_response(
            "http://example.org/",
            "192.0.2.1",
            Utc::now(),
            &bogus,
            &bogus,
            None,
            None,
            None,
            b"hello",
            &FetchMeta::new(),
        )
        .unwrap_err();
    assert!(matches!(err, WarcError::WarcinfoMissing));

    let (warc, cdx) = writer.finish().unwrap();
    assert!(warc.is_empty(), "nothing written to the archive");
    assert!(cdx.is_empty(), "nothing written to the index");
}

#[test]
fn test_header_injection_rejected_before_any_write() {
    let mut writer = WarcWriter::new(Vec::new());
    let warcinfo_id = writer
        .write_warcinfo("crawl-0001.warc.gz", &WarcinfoFields::default())
        .unwrap();

    let before = writer.bytes_written();
    let err = writer
        .write_request(
            "http://example.org/\r\nWARC-Type: forged",
            "192.0.2.1",
            Utc::now(),
            &warcinfo_id,
            b"",
        )
        .unwrap_err();
    assert!(matches!(err, WarcError::InvalidHeader { .. }));
    assert_eq!(writer.bytes_written(), before, "no partial record written");
}

#[test]
fn test_conversion_content_type_injection_rejected() {
    let mut writer = WarcWriter::new(Vec::new());
    let warcinfo_id = writer
        .write_warcinfo("crawl-0001.warc.gz", &WarcinfoFields::default())
        .unwrap();
    let related = RecordId::new();

    let before = writer.bytes_written();
    let err = writer
        .write_conversion(
            "http://example.org/",
            Utc::now(),
            &warcinfo_id,
            &related,
            None,
            "text/plain\r\nWARC-Type: forged",
            b"x",
        )
        .unwrap_err();
    assert!(matches!(err, WarcError::InvalidHeader { .. }));
    assert_eq!(writer.bytes_written(), before, "no partial record written");
}

#[test]
fn test_archive_file_is_exclusively_owned() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crawl-0001.warc.gz");

    let mut writer = WarcWriter::create(&path).unwrap();
    writer
        .write_warcinfo("crawl-0001.warc.gz", &WarcinfoFields::default())
        .unwrap();

    // A second writer on the same destination must be refused.
    assert!(WarcWriter::create(&path).is_err());
}

#[test]
fn test_io_error_propagates() {
    struct BrokenSink;
    impl std::io::Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut writer = WarcWriter::new(BrokenSink);
    let err = writer
        .write_warcinfo("crawl-0001.warc.gz", &WarcinfoFields::default())
        .unwrap_err();
    assert!(matches!(err, WarcError::Io(_)));
}
