//! Streaming content fetch with incremental checksum.
//!
//! Content is pulled through a fixed-size buffer: each chunk is folded into
//! the running MD5 and written to disk before the next chunk is polled, so
//! peak memory stays at the chunk size no matter how large the item is.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

use super::error::SyncError;
use crate::remote::{Drive, RemoteError, RemoteItem, Revision};
use crate::retry::{retry_with_backoff, Disposition, RetryPolicy};
use crate::types::ExportTarget;

pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// What a successful fetch produced. The caller uses these as the item's
/// working checksum/size when the remote declared none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub bytes_written: u64,
    pub md5_hex: String,
}

pub struct Fetcher<'a> {
    client: &'a dyn Drive,
    policy: RetryPolicy,
    chunk_size: usize,
    export: ExportTarget,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        client: &'a dyn Drive,
        policy: RetryPolicy,
        chunk_size: usize,
        export: ExportTarget,
    ) -> Self {
        Self {
            client,
            policy,
            chunk_size,
            export,
        }
    }

    /// Fetch an item's current content to `dest`. Native documents are
    /// exported in the configured target format instead of served raw.
    pub async fn fetch_item(
        &self,
        item: &RemoteItem,
        dest: &Path,
    ) -> Result<FetchOutcome, SyncError> {
        self.fetch(item, None, dest).await
    }

    /// Fetch one historical revision to `dest`.
    pub async fn fetch_revision(
        &self,
        item: &RemoteItem,
        revision: &Revision,
        dest: &Path,
    ) -> Result<FetchOutcome, SyncError> {
        self.fetch(item, Some(revision), dest).await
    }

    async fn fetch(
        &self,
        item: &RemoteItem,
        revision: Option<&Revision>,
        dest: &Path,
    ) -> Result<FetchOutcome, SyncError> {
        let classify = |e: &SyncError| match e {
            SyncError::Remote(remote) if remote.is_retryable() => Disposition::Retry,
            _ => Disposition::Abort,
        };
        let result = retry_with_backoff(&self.policy, classify, || {
            self.attempt(item, revision, dest, false)
        })
        .await;

        let outcome = match result {
            // Flagged content gets exactly one more attempt, with the
            // acknowledgment flag set.
            Err(e) if e.is_flagged_content() => {
                tracing::warn!(
                    "remote flagged content for {} ({}), retrying once acknowledged",
                    item.title,
                    item.id
                );
                self.attempt(item, revision, dest, true).await?
            }
            other => other?,
        };

        self.apply_declared_times(item, revision, dest);
        Ok(outcome)
    }

    /// One full download attempt. Always restarts from byte zero with a
    /// fresh hasher; partial output from a failed attempt is overwritten.
    async fn attempt(
        &self,
        item: &RemoteItem,
        revision: Option<&Revision>,
        dest: &Path,
        acknowledge_abuse: bool,
    ) -> Result<FetchOutcome, SyncError> {
        let stream = match revision {
            Some(rev) => self.client.get_revision_media(&item.id, &rev.id).await?,
            None if item.is_native_doc() => {
                self.client
                    .export_media(&item.id, self.export.export_mime(&item.mime_type))
                    .await?
            }
            None => self.client.get_media(&item.id, acknowledge_abuse).await?,
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dest)
            .await
            .map_err(|e| SyncError::io(dest, e))?;

        let mut reader = StreamReader::new(stream);
        let mut hasher = Md5::new();
        let mut buf = vec![0u8; self.chunk_size.max(1)];
        let mut bytes_written: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| recover_stream_error(dest, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n])
                .await
                .map_err(|e| SyncError::io(dest, e))?;
            bytes_written += n as u64;
        }
        file.flush().await.map_err(|e| SyncError::io(dest, e))?;

        Ok(FetchOutcome {
            bytes_written,
            md5_hex: hex::encode(hasher.finalize()),
        })
    }

    /// Stamp the written file with the remote's declared timestamps,
    /// truncated to whole seconds to match the validity comparison. Failure
    /// is logged and never invalidates the fetch.
    fn apply_declared_times(&self, item: &RemoteItem, revision: Option<&Revision>, dest: &Path) {
        let modified = revision
            .and_then(|rev| rev.modified_date)
            .or(item.modified_date);
        let accessed = item.last_viewed_by_me_date;

        let mut times = std::fs::FileTimes::new();
        let mut any = false;
        if let Some(modified) = modified {
            times = times.set_modified(truncated_system_time(modified));
            any = true;
        }
        if let Some(accessed) = accessed {
            times = times.set_accessed(truncated_system_time(accessed));
            any = true;
        }
        if !any {
            return;
        }
        let applied = std::fs::File::options()
            .write(true)
            .open(dest)
            .and_then(|file| file.set_times(times));
        if let Err(e) = applied {
            tracing::warn!("cannot set timestamps on {}: {e}", dest.display());
        }
    }
}

fn truncated_system_time(time: DateTime<Utc>) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(time.timestamp().max(0) as u64)
}

/// Mid-stream failures arrive as `std::io::Error`; unwrap the transport
/// error they carry so retry classification sees the remote failure, not a
/// generic local I/O error.
fn recover_stream_error(dest: &Path, err: std::io::Error) -> SyncError {
    match err.downcast::<RemoteError>() {
        Ok(remote) => SyncError::Remote(remote),
        Err(io) => SyncError::io(dest, io),
    }
}
