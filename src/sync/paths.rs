//! Canonical local names and paths derived from remote attributes.
//!
//! Every function here is pure: the same item and export target always
//! produce the same string, so a re-run resolves to the same files the
//! previous run wrote.

use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use crate::remote::{RemoteItem, Revision};
use crate::types::ExportTarget;

/// File name extension of metadata sidecars.
pub const SIDECAR_EXT: &str = "json";

/// Replace path separators in a remote title; titles are attribute data, not
/// path components.
pub fn sanitize_title(title: &str) -> String {
    title.replace('/', "_")
}

/// The name an item's content is stored under, before any suffixes: the
/// original filename when declared, otherwise the sanitized title.
fn base_source(item: &RemoteItem) -> String {
    item.original_filename
        .clone()
        .unwrap_or_else(|| sanitize_title(&item.title))
}

/// Extension for the local copy. Native documents take the export target's
/// extension; anything else uses the declared extension or the trailing
/// segment of the name after the last `.`.
pub fn item_extension(item: &RemoteItem, target: ExportTarget) -> String {
    if item.is_native_doc() {
        return target.extension(&item.mime_type).to_string();
    }
    if let Some(ext) = &item.file_extension {
        return ext.clone();
    }
    let name = base_source(item);
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name[dot + 1..].to_string(),
        _ => String::new(),
    }
}

fn base_name(item: &RemoteItem, extension: &str) -> String {
    let name = base_source(item);
    if extension.is_empty() {
        return name;
    }
    let suffix = format!(".{extension}");
    match name.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

fn version_suffix(item: &RemoteItem) -> String {
    match item.version {
        Some(version) if version > 1 => format!("({version})"),
        _ => String::new(),
    }
}

/// Local file name for an item's current content:
/// `base[(version)][.ext]`.
pub fn resolve_name(item: &RemoteItem, target: ExportTarget) -> String {
    let extension = item_extension(item, target);
    let mut name = base_name(item, &extension);
    name.push_str(&version_suffix(item));
    if !extension.is_empty() {
        name.push('.');
        name.push_str(&extension);
    }
    name
}

/// Local file name for one historical revision:
/// `base[(version)]_(revId_revModified)[.ext]`, with the revision id
/// zero-padded to four places and the timestamp in RFC 3339.
pub fn resolve_revision_name(item: &RemoteItem, revision: &Revision, target: ExportTarget) -> String {
    let extension = item_extension(item, target);
    let mut name = base_name(item, &extension);
    name.push_str(&version_suffix(item));
    let modified = revision
        .modified_date
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default();
    name.push_str(&format!("_({:0>4}_{})", revision.id, modified));
    if !extension.is_empty() {
        name.push('.');
        name.push_str(&extension);
    }
    name
}

/// Join an accumulated ancestor-folder path (`.`-rooted, `/`-separated) and
/// a file name under a local root.
pub fn local_path(root: &Path, folder_path: &str, name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in folder_path.split('/') {
        if !component.is_empty() && component != "." {
            path.push(component);
        }
    }
    path.push(name);
    path
}

/// Path of the metadata sidecar mirroring a data file.
pub fn sidecar_path(metadata_root: &Path, folder_path: &str, name: &str) -> PathBuf {
    local_path(metadata_root, folder_path, &format!("{name}.{SIDECAR_EXT}"))
}
