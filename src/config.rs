/// Read buffer for the decompressed dump stream
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Buffer size for CSV and JSONL sink writers
pub const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// Progress redraw interval (redraw every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Storage format for revision timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const NAMESPACES_OPEN: &str = "<namespaces>";
pub const NAMESPACES_CLOSE: &str = "</namespaces>";
pub const PAGE_OPEN: &str = "<page>";
pub const PAGE_CLOSE: &str = "</page>";
