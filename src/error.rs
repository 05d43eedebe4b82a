//! Error types for the import pipeline.
//!
//! [`ImportError`] covers every failure the core can raise. Whether a variant
//! ends the run is decided by [`ImportError::is_fatal`]:
//!
//! | Variant | Stage | Fatal |
//! |---------|-------|-------|
//! | `Open` | opening the dump | yes |
//! | `Io` | reading the stream | yes |
//! | `NamespaceParse` | namespace catalog | yes |
//! | `UnterminatedFragment` | end of stream | yes |
//! | `PageParse` | page fragment | no, fragment skipped |
//! | `Sink` | storage backend | no, logged and counted |

use crate::fragment::FragmentKind;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to open dump {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading dump stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse namespaces: {0}")]
    NamespaceParse(String),

    #[error("unable to parse page: {0}")]
    PageParse(String),

    #[error("stream ended inside an open {kind} fragment")]
    UnterminatedFragment { kind: FragmentKind },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ImportError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ImportError::PageParse(_) | ImportError::Sink(_))
    }
}

/// Failures reported by a [`Sink`](crate::sink::Sink) backend.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The page row was stored but a dependent contributor or revision write failed.
    #[error("page {page_id} stored, dependent write failed: {reason}")]
    Partial { page_id: u64, reason: String },
}

impl SinkError {
    /// Whether the page row survived this failure.
    pub fn page_persisted(&self) -> bool {
        matches!(self, SinkError::Partial { .. })
    }
}
