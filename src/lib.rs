//! wikiload: streaming importer for MediaWiki XML dumps
//!
//! A dump (usually a multi-gigabyte `.xml.bz2`) is read once, start to end,
//! and turned into four record types: namespaces, pages, contributors and
//! revisions. Those are handed to a storage [`sink::Sink`].
//!
//! # Pipeline
//!
//! 1. **Line assembly** -- [`reader`] decompresses the dump and yields
//!    trimmed lines
//! 2. **Fragment extraction** -- [`fragment`] watches for `<namespaces>` and
//!    `<page>` marker lines and buffers one block at a time
//! 3. **Decoding** -- [`namespace`] repairs and decodes the namespace
//!    catalog; [`page`] decodes page blocks into typed [`models`]
//! 4. **Storage** -- [`import`] forwards records to the sink and reports
//!    progress after every page
//!
//! Memory use is bounded by the largest single page, never by the dump size.
//!
//! # Key Modules
//!
//! - [`reader`] -- Dump opening (bzip2 multistream) and line assembly
//! - [`fragment`] -- Marker-driven fragment state machine
//! - [`xml`] -- Element tree over `quick-xml` events
//! - [`namespace`] -- Namespace catalog repair and decoding
//! - [`page`] -- Page, revision and contributor decoding
//! - [`sink`] -- Storage capability trait, in-memory and null sinks
//! - [`csv_sink`] -- One CSV table per record type
//! - [`jsonl_sink`] -- Tagged JSON lines
//! - [`progress`] -- Progress reporting and runtime formatting
//! - [`import`] -- The import loop, cancellation and page limits
//! - [`stats`] -- Per-run counters
//! - [`error`] -- Error types and fatality rules
//! - [`config`] -- Constants
//!
//! # Example Usage
//!
//! ```bash
//! # Load a dump into CSV tables
//! wikiload -v import -i enwiki-latest-pages-articles.xml.bz2 --sink csv -o tables/
//!
//! # Stream records as JSON lines, first 1000 pages only
//! wikiload import -i dump.xml.bz2 --sink jsonl -o records.jsonl --limit 1000
//! ```

pub mod config;
pub mod csv_sink;
pub mod error;
pub mod fragment;
pub mod import;
pub mod jsonl_sink;
pub mod models;
pub mod namespace;
pub mod page;
pub mod progress;
pub mod reader;
pub mod sink;
pub mod stats;
pub mod xml;
