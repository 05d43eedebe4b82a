use crate::config::TIMESTAMP_FORMAT;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// One entry of the dump's namespace catalog. `name` is `None` for the main namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceEntry {
    pub id: i32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub id: u64,
    pub title: String,
    pub namespace: i32,
    pub redirect_target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorRecord {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionRecord {
    pub id: u64,
    pub page_id: u64,
    pub contributor_id: Option<u64>,
    pub parent_id: Option<u64>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Byte length of `text`, always recomputed from the body.
    pub length: u64,
    pub is_minor: bool,
    pub comment: String,
    pub hash: String,
    pub text: String,
}

/// Everything decoded from a single `<page>` fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBundle {
    pub page: PageRecord,
    pub contributor: Option<ContributorRecord>,
    pub revision: Option<RevisionRecord>,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&ts.format(TIMESTAMP_FORMAT))
}
