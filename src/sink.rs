//! Storage capability consumed by the import loop.
//!
//! Backends must honor three contracts:
//!
//! - **Idempotent ids** -- saving a namespace, page or revision id that is
//!   already stored is a no-op success.
//! - **Contributor as dimension** -- `save_contributor_if_absent` checks the
//!   id before inserting; a known id is never an error.
//! - **Write order** -- `save_page` stores the page, then the contributor,
//!   then the revision. Nothing is rolled back: a failure after the page row
//!   was accepted is reported as [`SinkError::Partial`].

use crate::error::SinkError;
use crate::models::{ContributorRecord, NamespaceEntry, PageBundle, PageRecord, RevisionRecord};
use rustc_hash::FxHashSet;
use tracing::debug;

pub trait Sink {
    fn save_namespace(&mut self, ns: &NamespaceEntry) -> Result<(), SinkError>;

    fn save_contributor_if_absent(&mut self, contributor: &ContributorRecord)
        -> Result<(), SinkError>;

    fn save_page(&mut self, bundle: &PageBundle) -> Result<(), SinkError>;

    /// Flushes and releases the backend. Called once at the end of every run.
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn save_namespace(&mut self, ns: &NamespaceEntry) -> Result<(), SinkError> {
        (**self).save_namespace(ns)
    }

    fn save_contributor_if_absent(
        &mut self,
        contributor: &ContributorRecord,
    ) -> Result<(), SinkError> {
        (**self).save_contributor_if_absent(contributor)
    }

    fn save_page(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        (**self).save_page(bundle)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

/// Wraps a failure that happened after `page_id` was already stored.
pub(crate) fn partial(page_id: u64, err: SinkError) -> SinkError {
    SinkError::Partial {
        page_id,
        reason: err.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Namespace(i32),
    Contributor(u64),
    Page(u64),
    Revision(u64),
}

/// Keeps every stored record in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemorySink {
    namespaces: Vec<NamespaceEntry>,
    contributors: Vec<ContributorRecord>,
    pages: Vec<PageRecord>,
    revisions: Vec<RevisionRecord>,
    namespace_ids: FxHashSet<i32>,
    contributor_ids: FxHashSet<u64>,
    page_ids: FxHashSet<u64>,
    revision_ids: FxHashSet<u64>,
    writes: Vec<Insert>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespaces(&self) -> &[NamespaceEntry] {
        &self.namespaces
    }

    pub fn contributors(&self) -> &[ContributorRecord] {
        &self.contributors
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn revisions(&self) -> &[RevisionRecord] {
        &self.revisions
    }

    /// Inserts in the order they reached storage; duplicates are not listed.
    pub fn writes(&self) -> &[Insert] {
        &self.writes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Sink for MemorySink {
    fn save_namespace(&mut self, ns: &NamespaceEntry) -> Result<(), SinkError> {
        if self.namespace_ids.insert(ns.id) {
            self.namespaces.push(ns.clone());
            self.writes.push(Insert::Namespace(ns.id));
        }
        Ok(())
    }

    fn save_contributor_if_absent(
        &mut self,
        contributor: &ContributorRecord,
    ) -> Result<(), SinkError> {
        if self.contributor_ids.insert(contributor.id) {
            self.contributors.push(contributor.clone());
            self.writes.push(Insert::Contributor(contributor.id));
        }
        Ok(())
    }

    fn save_page(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        if self.page_ids.insert(bundle.page.id) {
            self.pages.push(bundle.page.clone());
            self.writes.push(Insert::Page(bundle.page.id));
        }
        if let Some(contributor) = &bundle.contributor {
            self.save_contributor_if_absent(contributor)?;
        }
        if let Some(revision) = &bundle.revision {
            if self.revision_ids.insert(revision.id) {
                self.revisions.push(revision.clone());
                self.writes.push(Insert::Revision(revision.id));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}

/// Accepts and discards everything. With `verbose`, each record is logged at debug level.
#[derive(Debug, Default)]
pub struct NullSink {
    verbose: bool,
}

impl NullSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Sink for NullSink {
    fn save_namespace(&mut self, ns: &NamespaceEntry) -> Result<(), SinkError> {
        if self.verbose {
            debug!(id = ns.id, name = ns.name.as_deref(), "Namespace");
        }
        Ok(())
    }

    fn save_contributor_if_absent(
        &mut self,
        contributor: &ContributorRecord,
    ) -> Result<(), SinkError> {
        if self.verbose {
            debug!(id = contributor.id, name = %contributor.name, "Contributor");
        }
        Ok(())
    }

    fn save_page(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        if !self.verbose {
            return Ok(());
        }
        let page = &bundle.page;
        debug!(
            id = page.id,
            ns = page.namespace,
            redirect = page.redirect_target.as_deref(),
            title = %page.title,
            "Page"
        );
        if let Some(contributor) = &bundle.contributor {
            self.save_contributor_if_absent(contributor)?;
        }
        if let Some(rev) = &bundle.revision {
            let preview: String = rev
                .text
                .chars()
                .take(100)
                .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                .collect();
            debug!(
                id = rev.id,
                page = rev.page_id,
                contrib = rev.contributor_id,
                parent = rev.parent_id,
                datetime = %crate::models::format_timestamp(&rev.timestamp),
                length = rev.length,
                minor = rev.is_minor,
                comment = %rev.comment,
                sha1 = %rev.hash,
                body = %preview,
                "Revision"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bundle(page_id: u64, contributor: Option<u64>, revision: Option<u64>) -> PageBundle {
        PageBundle {
            page: PageRecord {
                id: page_id,
                title: format!("Page {page_id}"),
                namespace: 0,
                redirect_target: None,
            },
            contributor: contributor.map(|id| ContributorRecord {
                id,
                name: format!("user{id}"),
            }),
            revision: revision.map(|id| RevisionRecord {
                id,
                page_id,
                contributor_id: contributor,
                parent_id: None,
                timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                length: 0,
                is_minor: false,
                comment: String::new(),
                hash: String::new(),
                text: String::new(),
            }),
        }
    }

    #[test]
    fn page_writes_in_dependency_order() {
        let mut sink = MemorySink::new();
        sink.save_page(&bundle(1, Some(5), Some(10))).unwrap();
        assert_eq!(
            sink.writes(),
            &[Insert::Page(1), Insert::Contributor(5), Insert::Revision(10)]
        );
    }

    #[test]
    fn namespace_save_is_idempotent() {
        let mut sink = MemorySink::new();
        let ns = NamespaceEntry {
            id: 1,
            name: Some("Talk".into()),
        };
        sink.save_namespace(&ns).unwrap();
        sink.save_namespace(&ns).unwrap();
        assert_eq!(sink.namespaces(), &[ns]);
    }

    #[test]
    fn contributor_is_stored_once() {
        let mut sink = MemorySink::new();
        let c = ContributorRecord {
            id: 9,
            name: "Bob".into(),
        };
        sink.save_contributor_if_absent(&c).unwrap();
        sink.save_contributor_if_absent(&c).unwrap();
        sink.save_page(&bundle(2, Some(9), Some(20))).unwrap();
        assert_eq!(sink.contributors().len(), 1);
    }

    #[test]
    fn repeated_page_bundle_is_idempotent() {
        let mut sink = MemorySink::new();
        sink.save_page(&bundle(3, None, Some(30))).unwrap();
        sink.save_page(&bundle(3, None, Some(30))).unwrap();
        assert_eq!(sink.pages().len(), 1);
        assert_eq!(sink.revisions().len(), 1);
        assert_eq!(sink.writes().len(), 2);
    }

    #[test]
    fn boxed_sink_delegates() {
        let mut sink: Box<dyn Sink> = Box::new(NullSink::new(true));
        sink.save_page(&bundle(4, Some(1), Some(40))).unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn partial_keeps_page_id() {
        let err = partial(8, SinkError::Io(std::io::Error::other("r")));
        assert!(matches!(err, SinkError::Partial { page_id: 8, .. }));
    }
}
