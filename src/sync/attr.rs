//! Local-copy attributes and the validity decision.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::error::SyncError;
use crate::remote::RemoteItem;

const HASH_READ_BUF: usize = 64 * 1024;

/// Snapshot of one local file, recomputed fresh on every check and never
/// cached across runs. The checksum is computed only when the file exists.
#[derive(Debug, Clone, Default)]
pub struct LocalFileAttr {
    pub exists: bool,
    pub size: Option<u64>,
    pub modified_secs: Option<i64>,
    pub accessed_secs: Option<i64>,
    pub md5_hex: Option<String>,
}

impl LocalFileAttr {
    /// Stat a path and, when present, hash its full content.
    pub async fn stat(path: &Path) -> Result<Self, SyncError> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(SyncError::io(path, e)),
        };
        Ok(Self {
            exists: true,
            size: Some(meta.len()),
            modified_secs: meta.modified().ok().map(epoch_secs),
            accessed_secs: meta.accessed().ok().map(epoch_secs),
            md5_hex: Some(md5_of_file(path).await.map_err(|e| SyncError::io(path, e))?),
        })
    }

    /// Whether the local copy is still a faithful mirror of the remote item.
    ///
    /// Every dimension the remote declares must match; dimensions the remote
    /// leaves out (native documents never declare checksum or size) are
    /// excluded from the decision. Timestamps compare at whole-second
    /// resolution on both sides.
    pub fn is_valid(&self, item: &RemoteItem) -> bool {
        if !self.exists {
            return false;
        }
        if let Some(remote_md5) = &item.md5_checksum {
            if self.md5_hex.as_ref() != Some(remote_md5) {
                return false;
            }
        }
        if let Some(modified) = item.modified_date {
            if self.modified_secs != Some(modified.timestamp()) {
                return false;
            }
        }
        if let Some(viewed) = item.last_viewed_by_me_date {
            if self.accessed_secs != Some(viewed.timestamp()) {
                return false;
            }
        }
        if let Some(size) = item.file_size {
            if self.size != Some(size) {
                return false;
            }
        }
        true
    }
}

fn epoch_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// MD5 of a file's content, read in bounded chunks.
pub async fn md5_of_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; HASH_READ_BUF];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
