//! Revision history synchronization and audit.

use std::path::Path;

use super::attr::md5_of_file;
use super::error::SyncError;
use super::fetch::Fetcher;
use super::paths;
use crate::remote::{RemoteItem, Revision};
use crate::types::ExportTarget;

/// A revision list with one entry describes only the current state, not
/// history; treat it as no history at all.
pub fn normalize_history(revisions: Vec<Revision>) -> Option<Vec<Revision>> {
    if revisions.len() > 1 {
        Some(revisions)
    } else {
        None
    }
}

/// Fetch every recorded revision of `item` into its revision-suffixed path,
/// sequentially. Returns the number of revisions fetched.
///
/// A failed or corrupt revision is logged and never aborts its siblings or
/// the parent item; only a run-fatal error propagates. Revisions whose
/// declared checksum disagrees with the fetched bytes are reported as
/// integrity errors, and declared values absent on the remote are filled in
/// from the fetch outcome.
pub async fn sync_revisions(
    fetcher: &Fetcher<'_>,
    item: &mut RemoteItem,
    folder_path: &str,
    data_root: &Path,
    target: ExportTarget,
) -> Result<u64, SyncError> {
    let Some(mut revisions) = item.revisions.take() else {
        return Ok(0);
    };

    let mut fetched = 0;
    for index in 0..revisions.len() {
        let name = paths::resolve_revision_name(item, &revisions[index], target);
        let dest = paths::local_path(data_root, folder_path, &name);
        match fetcher.fetch_revision(item, &revisions[index], &dest).await {
            Ok(outcome) => {
                fetched += 1;
                let revision = &mut revisions[index];
                if let Some(declared) = &revision.md5_checksum {
                    if *declared != outcome.md5_hex {
                        tracing::error!(
                            "revision integrity error: {} is {} but revision {} of {} declares {}",
                            dest.display(),
                            outcome.md5_hex,
                            revision.id,
                            item.id,
                            declared
                        );
                    }
                }
                if revision.md5_checksum.is_none() {
                    revision.md5_checksum = Some(outcome.md5_hex);
                }
                if revision.file_size.is_none() {
                    revision.file_size = Some(outcome.bytes_written);
                }
            }
            Err(e) if e.is_run_fatal() => {
                item.revisions = Some(revisions);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "failed to fetch revision {} of {}: {e}",
                    revisions[index].id,
                    item.id
                );
            }
        }
    }

    item.revisions = Some(revisions);
    Ok(fetched)
}

/// Offline audit: recompute each local revision file's checksum against the
/// value recorded in the snapshot. Returns ids of revisions that are
/// missing or disagree.
pub async fn audit_revisions(
    item: &RemoteItem,
    folder_path: &str,
    data_root: &Path,
    target: ExportTarget,
) -> Vec<String> {
    let Some(revisions) = &item.revisions else {
        return Vec::new();
    };

    let mut bad = Vec::new();
    for revision in revisions {
        let name = paths::resolve_revision_name(item, revision, target);
        let path = paths::local_path(data_root, folder_path, &name);
        let computed = match md5_of_file(&path).await {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(
                    "invalid revision {} of {}: cannot read {}: {e}",
                    revision.id,
                    item.id,
                    path.display()
                );
                bad.push(revision.id.clone());
                continue;
            }
        };
        if let Some(declared) = &revision.md5_checksum {
            if *declared != computed {
                tracing::error!(
                    "invalid revision: {} is {computed}, should be {declared}",
                    path.display()
                );
                bad.push(revision.id.clone());
            }
        }
    }
    bad
}
