use crate::config::WRITE_BUFFER_SIZE;
use crate::error::SinkError;
use crate::models::{ContributorRecord, NamespaceEntry, PageBundle, RevisionRecord};
use crate::sink::{partial, Sink};
use csv::Writer;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const NAMESPACES_FILE: &str = "namespaces.csv";
pub const CONTRIBUTORS_FILE: &str = "contributors.csv";
pub const PAGES_FILE: &str = "pages.csv";
pub const REVISIONS_FILE: &str = "revisions.csv";

type CsvWriter = Writer<BufWriter<File>>;

#[derive(Serialize)]
struct PageRow<'a> {
    id: u64,
    namespace: i32,
    redirect: Option<&'a str>,
    title: &'a str,
    search: String,
}

/// Writes one CSV table per record type into an output directory.
///
/// Ids already written in this run are skipped, so each table holds every
/// id at most once.
pub struct CsvSink {
    dir: PathBuf,
    namespaces: CsvWriter,
    contributors: CsvWriter,
    pages: CsvWriter,
    revisions: CsvWriter,
    namespace_ids: FxHashSet<i32>,
    contributor_ids: FxHashSet<u64>,
    page_ids: FxHashSet<u64>,
    revision_ids: FxHashSet<u64>,
}

impl CsvSink {
    pub fn create(dir: &Path) -> Result<Self, SinkError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            namespaces: open_table(dir, NAMESPACES_FILE)?,
            contributors: open_table(dir, CONTRIBUTORS_FILE)?,
            pages: open_table(dir, PAGES_FILE)?,
            revisions: open_table(dir, REVISIONS_FILE)?,
            namespace_ids: FxHashSet::default(),
            contributor_ids: FxHashSet::default(),
            page_ids: FxHashSet::default(),
            revision_ids: FxHashSet::default(),
        })
    }

    fn save_revision(&mut self, revision: &RevisionRecord) -> Result<(), SinkError> {
        if self.revision_ids.contains(&revision.id) {
            return Ok(());
        }
        self.revisions.serialize(revision)?;
        self.revision_ids.insert(revision.id);
        Ok(())
    }

    fn save_dependents(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        if let Some(contributor) = &bundle.contributor {
            self.save_contributor_if_absent(contributor)?;
        }
        if let Some(revision) = &bundle.revision {
            self.save_revision(revision)?;
        }
        Ok(())
    }
}

fn open_table(dir: &Path, name: &str) -> Result<CsvWriter, SinkError> {
    let file = File::create(dir.join(name))?;
    Ok(Writer::from_writer(BufWriter::with_capacity(
        WRITE_BUFFER_SIZE,
        file,
    )))
}

impl Sink for CsvSink {
    fn save_namespace(&mut self, ns: &NamespaceEntry) -> Result<(), SinkError> {
        if self.namespace_ids.contains(&ns.id) {
            return Ok(());
        }
        self.namespaces.serialize(ns)?;
        self.namespace_ids.insert(ns.id);
        Ok(())
    }

    fn save_contributor_if_absent(
        &mut self,
        contributor: &ContributorRecord,
    ) -> Result<(), SinkError> {
        if self.contributor_ids.contains(&contributor.id) {
            return Ok(());
        }
        self.contributors.serialize(contributor)?;
        self.contributor_ids.insert(contributor.id);
        Ok(())
    }

    fn save_page(&mut self, bundle: &PageBundle) -> Result<(), SinkError> {
        let page = &bundle.page;
        if !self.page_ids.contains(&page.id) {
            self.pages.serialize(PageRow {
                id: page.id,
                namespace: page.namespace,
                redirect: page.redirect_target.as_deref(),
                title: &page.title,
                search: page.title.to_lowercase(),
            })?;
            self.page_ids.insert(page.id);
        }
        self.save_dependents(bundle).map_err(|e| partial(page.id, e))
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.namespaces.flush()?;
        self.contributors.flush()?;
        self.pages.flush()?;
        self.revisions.flush()?;
        info!(
            dir = %self.dir.display(),
            namespaces = self.namespace_ids.len(),
            contributors = self.contributor_ids.len(),
            pages = self.page_ids.len(),
            revisions = self.revision_ids.len(),
            "CSV tables written"
        );
        Ok(())
    }
}
