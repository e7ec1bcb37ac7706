//! Per-item, per-dimension comparison of a remote item against its local
//! copy. The comparison is origin-blind: it works identically whether the
//! item came from a live listing or was reconstructed from a persisted
//! snapshot.

use std::fmt;

use super::attr::LocalFileAttr;
use super::error::SyncError;
use super::fingerprint;
use crate::remote::RemoteItem;

/// Outcome of one comparison dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    Match,
    /// Carries a short human-readable delta (seconds off, size percentage,
    /// differing digests).
    Mismatch(String),
    /// The remote does not declare this dimension; it is excluded from the
    /// validity decision.
    NotApplicable,
}

impl MatchStatus {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, MatchStatus::Mismatch(_))
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Match => write!(f, "match"),
            MatchStatus::Mismatch(detail) => write!(f, "{detail}"),
            MatchStatus::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// Terminal status of one item for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Valid,
    Invalid,
    Missing,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Valid => write!(f, "valid"),
            ItemStatus::Invalid => write!(f, "INVALID"),
            ItemStatus::Missing => write!(f, "missing"),
        }
    }
}

/// Comparison record for one item. Computed fresh every run, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub status: ItemStatus,
    pub checksum: MatchStatus,
    pub size: MatchStatus,
    pub modified_time: MatchStatus,
    pub access_time: MatchStatus,
    /// Independent of the content dimensions: recorded fingerprint versus a
    /// recomputation over the item's current metadata.
    pub fingerprint: MatchStatus,
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} md5={} size={} mtime={} atime={} meta={}",
            self.status,
            self.checksum,
            self.size,
            self.modified_time,
            self.access_time,
            self.fingerprint
        )
    }
}

/// Compare every dimension the remote declares against the local copy.
///
/// `stored_fingerprint` is the digest recorded in the item's sidecar, or
/// `None` when no sidecar exists yet. The overall status is decided by the
/// content dimensions alone; fingerprint drift is reported separately.
pub fn compare(
    item: &RemoteItem,
    attr: &LocalFileAttr,
    stored_fingerprint: Option<&str>,
) -> Result<VerificationResult, SyncError> {
    let fingerprint = match stored_fingerprint {
        None => MatchStatus::NotApplicable,
        Some(stored) => {
            let current = fingerprint::fingerprint(item)?;
            if current == stored {
                MatchStatus::Match
            } else {
                MatchStatus::Mismatch(format!("{stored} != {current}"))
            }
        }
    };

    if !attr.exists {
        return Ok(VerificationResult {
            status: ItemStatus::Missing,
            checksum: MatchStatus::NotApplicable,
            size: MatchStatus::NotApplicable,
            modified_time: MatchStatus::NotApplicable,
            access_time: MatchStatus::NotApplicable,
            fingerprint,
        });
    }

    let checksum = match (&item.md5_checksum, &attr.md5_hex) {
        (Some(remote), Some(local)) if remote == local => MatchStatus::Match,
        (Some(remote), local) => MatchStatus::Mismatch(format!(
            "{} != {remote}",
            local.as_deref().unwrap_or("(unreadable)")
        )),
        (None, _) => MatchStatus::NotApplicable,
    };

    let size = match (item.file_size, attr.size) {
        (None, _) => MatchStatus::NotApplicable,
        (Some(remote), Some(local)) if remote == local => MatchStatus::Match,
        (Some(remote), Some(local)) if remote > 0 => {
            MatchStatus::Mismatch(format!("{:.1}%", 100.0 * local as f64 / remote as f64))
        }
        (Some(remote), Some(local)) => MatchStatus::Mismatch(format!("{local} != {remote}")),
        (Some(_), None) => MatchStatus::Mismatch("no local size".to_string()),
    };

    let modified_time = time_dimension(
        item.modified_date.map(|t| t.timestamp()),
        attr.modified_secs,
    );
    let access_time = time_dimension(
        item.last_viewed_by_me_date.map(|t| t.timestamp()),
        attr.accessed_secs,
    );

    let any_mismatch = checksum.is_mismatch()
        || size.is_mismatch()
        || modified_time.is_mismatch()
        || access_time.is_mismatch();

    Ok(VerificationResult {
        status: if any_mismatch {
            ItemStatus::Invalid
        } else {
            ItemStatus::Valid
        },
        checksum,
        size,
        modified_time,
        access_time,
        fingerprint,
    })
}

/// Whole-second timestamp comparison; mismatch detail is the absolute delta.
fn time_dimension(remote_secs: Option<i64>, local_secs: Option<i64>) -> MatchStatus {
    match (remote_secs, local_secs) {
        (None, _) => MatchStatus::NotApplicable,
        (Some(remote), Some(local)) if remote == local => MatchStatus::Match,
        (Some(remote), Some(local)) => {
            MatchStatus::Mismatch(format!("{}s", (remote - local).abs()))
        }
        (Some(_), None) => MatchStatus::Mismatch("no local time".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fingerprint::fingerprint;
    use crate::testutil::plain_file;

    fn attr_for(item: &RemoteItem, content: &[u8]) -> LocalFileAttr {
        LocalFileAttr {
            exists: true,
            size: Some(content.len() as u64),
            modified_secs: item.modified_date.map(|t| t.timestamp()),
            accessed_secs: None,
            md5_hex: Some(crate::testutil::md5_hex(content)),
        }
    }

    #[test]
    fn test_missing_local_copy() {
        let item = plain_file("f1", "a.txt", b"abc");
        let result = compare(&item, &LocalFileAttr::default(), None).unwrap();
        assert_eq!(result.status, ItemStatus::Missing);
        assert_eq!(result.checksum, MatchStatus::NotApplicable);
        assert_eq!(result.fingerprint, MatchStatus::NotApplicable);
    }

    #[test]
    fn test_all_dimensions_match() {
        let item = plain_file("f1", "a.txt", b"abc");
        let result = compare(&item, &attr_for(&item, b"abc"), None).unwrap();
        assert_eq!(result.status, ItemStatus::Valid);
        assert_eq!(result.checksum, MatchStatus::Match);
        assert_eq!(result.size, MatchStatus::Match);
        assert_eq!(result.modified_time, MatchStatus::Match);
        // The fixture declares no view time.
        assert_eq!(result.access_time, MatchStatus::NotApplicable);
    }

    #[test]
    fn test_checksum_mismatch_invalidates() {
        let item = plain_file("f1", "a.txt", b"abc");
        let mut attr = attr_for(&item, b"abc");
        attr.md5_hex = Some("zzz999".to_string());
        let result = compare(&item, &attr, None).unwrap();
        assert_eq!(result.status, ItemStatus::Invalid);
        assert!(result.checksum.is_mismatch());
    }

    #[test]
    fn test_size_mismatch_reports_percentage() {
        let item = plain_file("f1", "a.txt", b"abcd");
        let mut attr = attr_for(&item, b"abcd");
        attr.size = Some(2);
        let result = compare(&item, &attr, None).unwrap();
        assert_eq!(result.size, MatchStatus::Mismatch("50.0%".to_string()));
    }

    #[test]
    fn test_time_mismatch_reports_delta() {
        let item = plain_file("f1", "a.txt", b"abc");
        let mut attr = attr_for(&item, b"abc");
        attr.modified_secs = attr.modified_secs.map(|s| s - 90);
        let result = compare(&item, &attr, None).unwrap();
        assert_eq!(result.modified_time, MatchStatus::Mismatch("90s".to_string()));
        assert_eq!(result.status, ItemStatus::Invalid);
    }

    #[test]
    fn test_fingerprint_independent_of_content_dimensions() {
        let item = plain_file("f1", "a.txt", b"abc");
        let stored = fingerprint(&item).unwrap();
        let result = compare(&item, &attr_for(&item, b"abc"), Some(&stored)).unwrap();
        assert_eq!(result.fingerprint, MatchStatus::Match);
        assert_eq!(result.status, ItemStatus::Valid);

        // Metadata drifts: fingerprint flags it, content status does not.
        let mut drifted = item.clone();
        drifted.title = "renamed.txt".to_string();
        let result = compare(&drifted, &attr_for(&item, b"abc"), Some(&stored)).unwrap();
        assert!(result.fingerprint.is_mismatch());
        assert_eq!(result.status, ItemStatus::Valid);
    }
}
