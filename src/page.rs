use crate::error::ImportError;
use crate::models::{ContributorRecord, PageBundle, PageRecord, RevisionRecord};
use crate::xml::Element;
use chrono::{DateTime, SubsecRound, Utc};
use std::str::FromStr;
use tracing::warn;

/// Decodes one `<page>` fragment into its page, revision and contributor records.
///
/// Only the first `<revision>` is read. `ImportError::PageParse` is returned
/// for malformed markup or a missing or invalid `id`, `title` or `ns`. A
/// revision with a bad field is dropped together with its contributor and
/// the page record is still returned.
pub fn decode_page(body: &str) -> Result<PageBundle, ImportError> {
    let root = Element::parse(body).map_err(|e| ImportError::PageParse(e.to_string()))?;
    if root.name != "page" {
        return Err(ImportError::PageParse(format!(
            "expected <page> root, found <{}>",
            root.name
        )));
    }

    let page = PageRecord {
        id: required_number(&root, "id")?,
        title: root
            .child_text("title")
            .ok_or_else(|| missing("title"))?
            .to_owned(),
        namespace: required_number(&root, "ns")?,
        redirect_target: root
            .child("redirect")
            .and_then(|r| r.attr("title"))
            .map(str::to_owned),
    };

    let decoded = root
        .child("revision")
        .map(|rev| decode_revision(rev, page.id));
    let (contributor, revision) = match decoded {
        None => (None, None),
        Some(Ok((contributor, revision))) => (contributor, Some(revision)),
        Some(Err(e)) => {
            warn!(page_id = page.id, title = %page.title, error = %e, "Dropping revision");
            (None, None)
        }
    };

    Ok(PageBundle {
        page,
        contributor,
        revision,
    })
}

fn decode_revision(
    rev: &Element,
    page_id: u64,
) -> Result<(Option<ContributorRecord>, RevisionRecord), ImportError> {
    let id = required_number(rev, "id")?;
    let contributor = match rev.child("contributor") {
        Some(c) => decode_contributor(c)?,
        None => None,
    };
    let parent_id = optional_number(rev, "parentid")?.filter(|&p| p != 0);
    let timestamp = rev
        .child_text("timestamp")
        .ok_or_else(|| missing("timestamp"))
        .and_then(parse_timestamp)?;

    let text = rev.child_text("text").unwrap_or_default().to_owned();
    let revision = RevisionRecord {
        id,
        page_id,
        contributor_id: contributor.as_ref().map(|c| c.id),
        parent_id,
        timestamp,
        length: text.len() as u64,
        is_minor: rev.child("minor").is_some(),
        comment: rev.child_text("comment").unwrap_or_default().to_owned(),
        hash: rev.child_text("sha1").unwrap_or_default().to_owned(),
        text,
    };
    Ok((contributor, revision))
}

/// IP edits and suppressed users carry a `<contributor>` with no `<id>`.
/// They are not folded into a shared contributor 0 with an empty name: no
/// record is produced and the revision keeps `contributor_id = None`.
fn decode_contributor(el: &Element) -> Result<Option<ContributorRecord>, ImportError> {
    let Some(id) = optional_number(el, "id")? else {
        return Ok(None);
    };
    Ok(Some(ContributorRecord {
        id,
        name: el.child_text("username").unwrap_or_default().to_owned(),
    }))
}

/// Parses an absolute RFC 3339 timestamp into UTC with whole-second precision.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ImportError> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| ImportError::PageParse(format!("invalid timestamp {raw:?}: {e}")))?;
    Ok(parsed.with_timezone(&Utc).trunc_subsecs(0))
}

fn required_number<T: FromStr>(el: &Element, name: &str) -> Result<T, ImportError> {
    optional_number(el, name)?.ok_or_else(|| missing(name))
}

fn optional_number<T: FromStr>(el: &Element, name: &str) -> Result<Option<T>, ImportError> {
    let Some(raw) = el.child_text(name).map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ImportError::PageParse(format!("invalid <{name}> value {raw:?}")))
}

fn missing(name: &str) -> ImportError {
    ImportError::PageParse(format!("missing <{name}>"))
}
