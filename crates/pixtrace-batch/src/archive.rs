//! Archive layout for batch results.
//!
//! Produces `(name, contents)` pairs only; whether they end up in a
//! directory, a zip file, or an HTTP response is the caller's business.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::batch::BatchItem;

/// One file in the result archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// File name, without directories.
    pub name: String,
    /// UTF-8 file contents.
    pub contents: String,
}

/// Strip the last extension from `identifier`.
///
/// Only the final `.suffix` is removed, so `photo.final.png` becomes
/// `photo.final`. An identifier without a dot is returned unchanged.
///
/// ```
/// use pixtrace_batch::file_stem;
/// assert_eq!(file_stem("logo.png"), "logo");
/// assert_eq!(file_stem("photo.final.jpg"), "photo.final");
/// assert_eq!(file_stem("README"), "README");
/// ```
#[must_use]
pub fn file_stem(identifier: &str) -> &str {
    identifier
        .rsplit_once('.')
        .map_or(identifier, |(stem, _)| stem)
}

/// Lay out batch results as archive entries, one per item, in item order.
///
/// Successes become `<stem>.svg` holding the document. Failures become
/// `<stem>_ERROR.txt` holding `Conversion failed: <message>`. Names are
/// unique: when a name is already taken (`logo.png` and `logo.jpg` in one
/// batch), `_2`, `_3`, ... is appended to the stem of the later item.
#[must_use]
pub fn archive_entries(items: &[BatchItem]) -> Vec<ArchiveEntry> {
    let mut taken = HashSet::new();
    items
        .iter()
        .map(|item| {
            let stem = file_stem(&item.identifier);
            match &item.outcome {
                Ok(conversion) => ArchiveEntry {
                    name: unique_name(&mut taken, stem, ".svg"),
                    contents: conversion.svg.clone(),
                },
                Err(err) => ArchiveEntry {
                    name: unique_name(&mut taken, stem, "_ERROR.txt"),
                    contents: format!("Conversion failed: {err}"),
                },
            }
        })
        .collect()
}

/// First of `<stem><suffix>`, `<stem>_2<suffix>`, ... not yet in `taken`,
/// which it is then added to.
fn unique_name(taken: &mut HashSet<String>, stem: &str, suffix: &str) -> String {
    let mut name = format!("{stem}{suffix}");
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{stem}_{n}{suffix}");
        n += 1;
    }
    taken.insert(name.clone());
    name
}
