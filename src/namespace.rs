//! Decoder for the `<namespaces>` catalog block.
//!
//! The export writes each entry as `<namespace key="N" ...>Name</namespace>`.
//! Here the entry name is moved into a `name` attribute before parsing, by
//! rewriting `">` to `" name="` and `</namespace>` to `" />`. The rewrite
//! only makes sense for this block and is applied once per fragment; entries
//! already written as `<namespace key="0" ... />` pass through unchanged and
//! decode with no name.

use crate::error::ImportError;
use crate::models::NamespaceEntry;
use crate::xml::Element;

pub fn repair_namespace_block(body: &str) -> String {
    body.replace("\">", "\" name=\"")
        .replace("</namespace>", "\" />")
}

pub fn decode_namespaces(body: &str) -> Result<Vec<NamespaceEntry>, ImportError> {
    let repaired = repair_namespace_block(body);
    let root =
        Element::parse(&repaired).map_err(|e| ImportError::NamespaceParse(e.to_string()))?;

    root.children_named("namespace")
        .map(|ns| {
            let key = ns
                .attr("key")
                .ok_or_else(|| ImportError::NamespaceParse("namespace without key".into()))?;
            let id = key.trim().parse::<i32>().map_err(|_| {
                ImportError::NamespaceParse(format!("non-numeric namespace key {key:?}"))
            })?;
            Ok(NamespaceEntry {
                id,
                name: ns.attr("name").map(str::to_owned),
            })
        })
        .collect()
}
