/// Counters for one import run, owned by the driving loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub namespaces_saved: u64,
    pub pages_processed: u64,
    pub pages_saved: u64,
    pub revisions_saved: u64,
    pub pages_skipped: u64,
    pub sink_failures: u64,
    pub stray_close_markers: u64,
    pub lines_read: u64,
    pub cancelled: bool,
    last_title: String,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_namespaces(&mut self) {
        self.namespaces_saved += 1;
    }

    pub fn inc_pages_processed(&mut self) {
        self.pages_processed += 1;
    }

    pub fn inc_pages_saved(&mut self) {
        self.pages_saved += 1;
    }

    pub fn inc_revisions_saved(&mut self) {
        self.revisions_saved += 1;
    }

    pub fn inc_pages_skipped(&mut self) {
        self.pages_skipped += 1;
    }

    pub fn inc_sink_failures(&mut self) {
        self.sink_failures += 1;
    }

    pub fn set_last_title(&mut self, title: &str) {
        self.last_title.clear();
        self.last_title.push_str(title);
    }

    /// Title of the most recent page that decoded successfully.
    pub fn last_title(&self) -> &str {
        &self.last_title
    }
}
