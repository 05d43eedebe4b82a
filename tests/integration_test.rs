//! End-to-end tests for the wikiload import pipeline.
//!
//! Every test starts from XML text shaped like a real MediaWiki export,
//! compresses it with bzip2 into a temp file, and runs the full pipeline:
//! decompression, line assembly, fragment extraction, decoding and storage.
//!
//! # Sample Data
//!
//! The `sample_xml()` fixture contains:
//! - a `<siteinfo>` block with a five-entry namespace catalog, one entry
//!   written self-closing (the main namespace)
//! - "Example" (id 10): an anonymous revision with body `hello`
//! - "Old Name" (id 11): a redirect to "Target Page" with no revision
//! - a malformed page (unbalanced `<ns>`), which must be skipped
//! - "Rust" (id 12): a minor revision by a registered contributor
//! - "Talk:Rust" (id 13): same contributor again, IP-free

use bzip2::write::BzEncoder;
use bzip2::Compression;
use chrono::{TimeZone, Utc};
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use wikiload::csv_sink::{CsvSink, CONTRIBUTORS_FILE, NAMESPACES_FILE, PAGES_FILE, REVISIONS_FILE};
use wikiload::error::ImportError;
use wikiload::import::{import_dump, ImportOptions};
use wikiload::jsonl_sink::JsonlSink;
use wikiload::models::{NamespaceEntry, PageRecord};
use wikiload::progress::NoProgress;
use wikiload::sink::{Insert, MemorySink};

fn compress(xml: &str) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(xml.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Helper: write bzip2-compressed XML into a temp file named `*.xml.bz2`.
fn create_bz2_xml(xml: &str) -> NamedTempFile {
    let mut tmp = tempfile::Builder::new().suffix(".xml.bz2").tempfile().unwrap();
    tmp.write_all(&compress(xml)).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn sample_xml() -> &'static str {
    r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/" version="0.10" xml:lang="en">
  <siteinfo>
    <sitename>Wikipedia</sitename>
    <namespaces>
      <namespace key="-2" case="first-letter">Media</namespace>
      <namespace key="-1" case="first-letter">Special</namespace>
      <namespace key="0" case="first-letter" />
      <namespace key="1" case="first-letter">Talk</namespace>
      <namespace key="4" case="first-letter">Wiki &amp; Project</namespace>
    </namespaces>
  </siteinfo>
  <page>
    <title>Example</title>
    <ns>0</ns>
    <id>10</id>
    <revision>
      <id>100</id>
      <timestamp>2020-01-01T00:00:00Z</timestamp>
      <model>wikitext</model>
      <format>text/x-wiki</format>
      <text bytes="999" xml:space="preserve">hello</text>
      <sha1>aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa</sha1>
    </revision>
  </page>
  <page>
    <title>Old Name</title>
    <ns>0</ns>
    <id>11</id>
    <redirect title="Target Page" />
  </page>
  <page>
    <title>Broken</title>
    <ns>0
    <id>99</id>
  </page>
  <page>
    <title>Rust</title>
    <ns>0</ns>
    <id>12</id>
    <revision>
      <id>120</id>
      <parentid>119</parentid>
      <timestamp>2024-01-15T10:30:00Z</timestamp>
      <contributor>
        <username>Ferris</username>
        <id>7</id>
      </contributor>
      <minor />
      <comment>fix typo</comment>
      <text bytes="1" xml:space="preserve">Rust is a
    systems language.</text>
      <sha1>bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb</sha1>
    </revision>
  </page>
  <page>
    <title>Talk:Rust</title>
    <ns>1</ns>
    <id>13</id>
    <revision>
      <id>130</id>
      <timestamp>2024-01-16T08:00:00+01:00</timestamp>
      <contributor>
        <username>Ferris</username>
        <id>7</id>
      </contributor>
      <text xml:space="preserve">discussion</text>
    </revision>
  </page>
</mediawiki>
"#
}

fn import_into_memory(xml: &str) -> (MemorySink, wikiload::stats::ImportStats) {
    let tmp = create_bz2_xml(xml);
    let mut sink = MemorySink::new();
    let stats =
        import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default()).unwrap();
    (sink, stats)
}

// ---------------------------------------------------------------------------
// Namespace catalog
// ---------------------------------------------------------------------------

#[test]
fn namespaces_decoded_in_document_order() {
    let (sink, stats) = import_into_memory(sample_xml());
    let expected = vec![
        NamespaceEntry { id: -2, name: Some("Media".into()) },
        NamespaceEntry { id: -1, name: Some("Special".into()) },
        NamespaceEntry { id: 0, name: None },
        NamespaceEntry { id: 1, name: Some("Talk".into()) },
        NamespaceEntry { id: 4, name: Some("Wiki & Project".into()) },
    ];
    assert_eq!(sink.namespaces(), expected.as_slice());
    assert_eq!(stats.namespaces_saved, 5);
}

#[test]
fn scenario_two_entry_catalog() {
    let xml = "<mediawiki>\n<siteinfo>\n<namespaces>\n\
               <namespace key=\"0\">Main</namespace>\n\
               <namespace key=\"-1\">Special</namespace>\n\
               </namespaces>\n</siteinfo>\n</mediawiki>\n";
    let (sink, _) = import_into_memory(xml);
    assert_eq!(
        sink.namespaces(),
        &[
            NamespaceEntry { id: 0, name: Some("Main".into()) },
            NamespaceEntry { id: -1, name: Some("Special".into()) },
        ]
    );
}

#[test]
fn broken_namespace_catalog_aborts_run() {
    let xml = "<mediawiki>\n<namespaces>\n<namespace>Main</namespace>\n</namespaces>\n\
               <page>\n<title>T</title>\n<ns>0</ns>\n<id>1</id>\n</page>\n</mediawiki>\n";
    let tmp = create_bz2_xml(xml);
    let mut sink = MemorySink::new();
    let result = import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default());
    assert!(matches!(result, Err(ImportError::NamespaceParse(_))));
    assert!(sink.pages().is_empty());
    assert!(sink.is_closed());
}

// ---------------------------------------------------------------------------
// Pages and revisions
// ---------------------------------------------------------------------------

#[test]
fn anonymous_revision_has_no_contributor() {
    let (sink, _) = import_into_memory(sample_xml());
    assert_eq!(
        sink.pages()[0],
        PageRecord {
            id: 10,
            title: "Example".into(),
            namespace: 0,
            redirect_target: None,
        }
    );
    let rev = &sink.revisions()[0];
    assert_eq!(rev.id, 100);
    assert_eq!(rev.page_id, 10);
    assert_eq!(rev.contributor_id, None);
    assert_eq!(rev.parent_id, None);
    assert_eq!(rev.timestamp, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(rev.length, 5);
    assert!(!rev.is_minor);
    assert_eq!(rev.text, "hello");
}

#[test]
fn redirect_page_without_revision() {
    let (sink, _) = import_into_memory(sample_xml());
    let redirect = sink.pages().iter().find(|p| p.id == 11).unwrap();
    assert_eq!(redirect.redirect_target.as_deref(), Some("Target Page"));
    assert!(sink.revisions().iter().all(|r| r.page_id != 11));
}

#[test]
fn malformed_page_is_skipped_and_run_continues() {
    let (sink, stats) = import_into_memory(sample_xml());
    assert_eq!(stats.pages_processed, 5);
    assert_eq!(stats.pages_skipped, 1);
    assert_eq!(stats.pages_saved, 4);
    let ids: Vec<u64> = sink.pages().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![10, 11, 12, 13]);
}

#[test]
fn registered_contributor_and_minor_flag() {
    let (sink, stats) = import_into_memory(sample_xml());
    let rev = sink.revisions().iter().find(|r| r.id == 120).unwrap();
    assert_eq!(rev.contributor_id, Some(7));
    assert_eq!(rev.parent_id, Some(119));
    assert!(rev.is_minor);
    assert_eq!(rev.comment, "fix typo");
    // Lines are trimmed during assembly, so the continuation's indentation is gone.
    assert_eq!(rev.text, "Rust is a\nsystems language.");
    assert_eq!(rev.length, rev.text.len() as u64);
    assert_eq!(stats.revisions_saved, 3);
}

#[test]
fn contributor_stored_once_across_pages() {
    let (sink, _) = import_into_memory(sample_xml());
    assert_eq!(sink.contributors().len(), 1);
    assert_eq!(sink.contributors()[0].name, "Ferris");
}

#[test]
fn timestamps_normalized_to_utc() {
    let (sink, _) = import_into_memory(sample_xml());
    let rev = sink.revisions().iter().find(|r| r.id == 130).unwrap();
    assert_eq!(rev.timestamp, Utc.with_ymd_and_hms(2024, 1, 16, 7, 0, 0).unwrap());
}

#[test]
fn contributor_written_before_revision() {
    let (sink, _) = import_into_memory(sample_xml());
    let writes = sink.writes();
    let contributor = writes.iter().position(|w| *w == Insert::Contributor(7)).unwrap();
    let revision = writes.iter().position(|w| *w == Insert::Revision(120)).unwrap();
    let page = writes.iter().position(|w| *w == Insert::Page(12)).unwrap();
    assert!(page < contributor && contributor < revision);
}

// ---------------------------------------------------------------------------
// Stream handling
// ---------------------------------------------------------------------------

#[test]
fn multistream_archive_is_read_to_the_end() {
    let xml = sample_xml();
    let split = xml.find("  <page>\n    <title>Rust</title>").unwrap();
    let mut data = compress(&xml[..split]);
    data.extend(compress(&xml[split..]));

    let mut tmp = tempfile::Builder::new().suffix(".bz2").tempfile().unwrap();
    tmp.write_all(&data).unwrap();
    tmp.flush().unwrap();

    let mut sink = MemorySink::new();
    let stats =
        import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default()).unwrap();
    assert_eq!(stats.pages_saved, 4);
}

#[test]
fn uncompressed_dump_is_accepted() {
    let mut tmp = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
    tmp.write_all(sample_xml().as_bytes()).unwrap();
    tmp.flush().unwrap();

    let mut sink = MemorySink::new();
    let stats =
        import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default()).unwrap();
    assert_eq!(stats.pages_saved, 4);
    assert_eq!(sink.namespaces().len(), 5);
}

#[test]
fn truncated_dump_fails_with_open_fragment() {
    let xml = sample_xml();
    let cut = xml.find("<title>Talk:Rust</title>").unwrap();
    let tmp = create_bz2_xml(&xml[..cut]);
    let mut sink = MemorySink::new();
    let result = import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default());
    assert!(matches!(result, Err(ImportError::UnterminatedFragment { .. })));
    assert_eq!(sink.pages().len(), 3);
}

#[test]
fn corrupt_archive_is_a_read_error() {
    let mut tmp = tempfile::Builder::new().suffix(".bz2").tempfile().unwrap();
    tmp.write_all(b"BZh9 definitely not bzip2 data").unwrap();
    tmp.flush().unwrap();
    let mut sink = MemorySink::new();
    let result = import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default());
    assert!(matches!(result, Err(ImportError::Io(_))));
}

#[test]
fn limit_applies_to_page_fragments() {
    let tmp = create_bz2_xml(sample_xml());
    let mut sink = MemorySink::new();
    let options = ImportOptions {
        limit: Some(3),
        ..Default::default()
    };
    let stats = import_dump(tmp.path(), &mut sink, &mut NoProgress, &options).unwrap();
    assert_eq!(stats.pages_processed, 3);
    assert_eq!(stats.pages_skipped, 1);
    assert_eq!(sink.pages().len(), 2);
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[test]
fn csv_sink_end_to_end() {
    let tmp = create_bz2_xml(sample_xml());
    let out = TempDir::new().unwrap();
    let mut sink = CsvSink::create(out.path()).unwrap();
    import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default()).unwrap();

    let count_rows = |name: &str| {
        csv::Reader::from_path(out.path().join(name))
            .unwrap()
            .records()
            .count()
    };
    assert_eq!(count_rows(NAMESPACES_FILE), 5);
    assert_eq!(count_rows(CONTRIBUTORS_FILE), 1);
    assert_eq!(count_rows(PAGES_FILE), 4);
    assert_eq!(count_rows(REVISIONS_FILE), 3);

    let pages = fs::read_to_string(out.path().join(PAGES_FILE)).unwrap();
    assert!(pages.contains("11,0,Target Page,Old Name,old name"));
}

#[test]
fn jsonl_sink_end_to_end() {
    let tmp = create_bz2_xml(sample_xml());
    let out = TempDir::new().unwrap();
    let path = out.path().join("records.jsonl");
    let mut sink = JsonlSink::create(&path).unwrap();
    import_dump(tmp.path(), &mut sink, &mut NoProgress, &ImportOptions::default()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let count = |kind: &str| records.iter().filter(|r| r["type"] == kind).count();
    assert_eq!(count("namespace"), 5);
    assert_eq!(count("page"), 4);
    assert_eq!(count("contributor"), 1);
    assert_eq!(count("revision"), 3);
}
