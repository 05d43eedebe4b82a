use crate::config::WRITE_BUFFER_SIZE;
use crate::error::SinkError;
use crate::models::{ContributorRecord, NamespaceEntry, PageBundle, PageRecord, RevisionRecord};
use crate::sink::{partial, Sink};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line<'a> {
    Namespace(&'a NamespaceEntry),
    Contributor(&'a ContributorRecord),
    Page(&'a PageRecord),
    Revision(&'a RevisionRecord),
}

/// Document-style sink: one JSON object per record, tagged with its `type`.
pub struct JsonlSink<W: Write> {
    out: W,
    namespace_ids: FxHashSet<i32>,
    contributor_ids: FxHashSet<u64>,
    page_ids: FxHashSet<u64>,
    revision_ids: FxHashSet<u64>,
}

impl JsonlSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            namespace_ids: FxHashSet::default(),
            contributor_ids: FxHashSet::default(),
            page_ids: FxHashSet::default(),
            revision_ids: FxHashSet::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &Line<'_>) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.out, line)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn save_dependents(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        if let Some(contributor) = &bundle.contributor {
            self.save_contributor_if_absent(contributor)?;
        }
        if let Some(revision) = &bundle.revision {
            if !self.revision_ids.contains(&revision.id) {
                self.emit(&Line::Revision(revision))?;
                self.revision_ids.insert(revision.id);
            }
        }
        Ok(())
    }
}

impl<W: Write> Sink for JsonlSink<W> {
    fn save_namespace(&mut self, ns: &NamespaceEntry) -> Result<(), SinkError> {
        if !self.namespace_ids.contains(&ns.id) {
            self.emit(&Line::Namespace(ns))?;
            self.namespace_ids.insert(ns.id);
        }
        Ok(())
    }

    fn save_contributor_if_absent(
        &mut self,
        contributor: &ContributorRecord,
    ) -> Result<(), SinkError> {
        if !self.contributor_ids.contains(&contributor.id) {
            self.emit(&Line::Contributor(contributor))?;
            self.contributor_ids.insert(contributor.id);
        }
        Ok(())
    }

    fn save_page(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        let page = &bundle.page;
        if !self.page_ids.contains(&page.id) {
            self.emit(&Line::Page(page))?;
            self.page_ids.insert(page.id);
        }
        self.save_dependents(bundle).map_err(|e| partial(page.id, e))
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
