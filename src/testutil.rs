//! In-memory remote store used across the test suite.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use md5::{Digest, Md5};
use serde_json::Map;

use crate::remote::{ByteStream, Drive, ItemPage, RemoteError, RemoteItem, Revision, FOLDER_MIME};

pub fn folder(id: &str, title: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        title: title.to_string(),
        mime_type: FOLDER_MIME.to_string(),
        md5_checksum: None,
        file_size: None,
        modified_date: None,
        last_viewed_by_me_date: None,
        created_date: None,
        version: None,
        original_filename: None,
        file_extension: None,
        revisions: None,
        extra: Map::new(),
    }
}

/// A regular file whose declared checksum/size match `content`.
pub fn plain_file(id: &str, title: &str, content: &[u8]) -> RemoteItem {
    let extension = title.rsplit_once('.').map(|(_, ext)| ext.to_string());
    RemoteItem {
        id: id.to_string(),
        title: title.to_string(),
        mime_type: "text/plain".to_string(),
        md5_checksum: Some(md5_hex(content)),
        file_size: Some(content.len() as u64),
        modified_date: Some(Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()),
        last_viewed_by_me_date: None,
        created_date: None,
        version: None,
        original_filename: Some(title.to_string()),
        file_extension: extension,
        revisions: None,
        extra: Map::new(),
    }
}

/// A native document: export only, no declared checksum or size.
pub fn native_doc(id: &str, title: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        title: title.to_string(),
        mime_type: "application/vnd.google-apps.document".to_string(),
        md5_checksum: None,
        file_size: None,
        modified_date: Some(Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()),
        last_viewed_by_me_date: None,
        created_date: None,
        version: None,
        original_filename: None,
        file_extension: None,
        revisions: None,
        extra: Map::new(),
    }
}

pub fn revision(id: &str, content: &[u8]) -> Revision {
    Revision {
        id: id.to_string(),
        modified_date: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        md5_checksum: Some(md5_hex(content)),
        file_size: Some(content.len() as u64),
        extra: Map::new(),
    }
}

pub fn md5_hex(content: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[derive(Default)]
pub struct FakeDrive {
    children: HashMap<String, Vec<RemoteItem>>,
    media: HashMap<String, Vec<u8>>,
    exports: HashMap<String, Vec<u8>>,
    revisions: HashMap<String, Vec<Revision>>,
    revision_media: HashMap<(String, String), Vec<u8>>,
    failing_folders: HashSet<String>,
    flagged: HashSet<String>,
    transient_failures: Mutex<HashMap<String, u32>>,
    auth_expired: bool,
    media_calls: AtomicU32,
    /// Items per listing page; 0 means everything in one page.
    pub page_size: usize,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_children(&mut self, parent: &str, children: Vec<RemoteItem>) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .extend(children);
    }

    pub fn set_media(&mut self, id: &str, content: &[u8]) {
        self.media.insert(id.to_string(), content.to_vec());
    }

    pub fn set_export(&mut self, id: &str, content: &[u8]) {
        self.exports.insert(id.to_string(), content.to_vec());
    }

    pub fn set_revisions(&mut self, id: &str, revisions: Vec<Revision>) {
        self.revisions.insert(id.to_string(), revisions);
    }

    pub fn set_revision_media(&mut self, id: &str, revision_id: &str, content: &[u8]) {
        self.revision_media
            .insert((id.to_string(), revision_id.to_string()), content.to_vec());
    }

    pub fn fail_listing(&mut self, folder_id: &str) {
        self.failing_folders.insert(folder_id.to_string());
    }

    pub fn expire_auth(&mut self) {
        self.auth_expired = true;
    }

    pub fn flag(&mut self, id: &str) {
        self.flagged.insert(id.to_string());
    }

    /// The next `times` media requests for `id` fail with a 503.
    pub fn fail_media_times(&mut self, id: &str, times: u32) {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }

    /// Total media requests served or failed (raw, export and revision).
    pub fn media_calls(&self) -> u32 {
        self.media_calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), RemoteError> {
        if self.auth_expired {
            return Err(RemoteError::AuthExpired);
        }
        Ok(())
    }

    fn media_gate(&self, id: &str) -> Result<(), RemoteError> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        let mut failures = self.transient_failures.lock().unwrap();
        if let Some(left) = failures.get_mut(id) {
            if *left > 0 {
                *left -= 1;
                return Err(RemoteError::Status {
                    status: 503,
                    endpoint: id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn stream_of(content: &[u8]) -> ByteStream {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![Ok(Bytes::copy_from_slice(content))];
        Box::pin(futures_util::stream::iter(chunks))
    }
}

#[async_trait::async_trait]
impl Drive for FakeDrive {
    async fn list_children(
        &self,
        folder_id: &str,
        _query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ItemPage, RemoteError> {
        self.gate()?;
        if self.failing_folders.contains(folder_id) {
            return Err(RemoteError::Status {
                status: 500,
                endpoint: folder_id.to_string(),
            });
        }
        let all = self.children.get(folder_id).cloned().unwrap_or_default();
        if self.page_size == 0 {
            return Ok(ItemPage {
                items: all,
                next_page_token: None,
            });
        }
        let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let items: Vec<RemoteItem> = all.iter().skip(offset).take(self.page_size).cloned().collect();
        let next = offset + items.len();
        let next_page_token = (next < all.len()).then(|| next.to_string());
        Ok(ItemPage {
            items,
            next_page_token,
        })
    }

    async fn get_item(&self, item_id: &str) -> Result<RemoteItem, RemoteError> {
        self.gate()?;
        self.children
            .values()
            .flatten()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(item_id.to_string()))
    }

    async fn get_media(
        &self,
        item_id: &str,
        acknowledge_abuse: bool,
    ) -> Result<ByteStream, RemoteError> {
        self.media_gate(item_id)?;
        if self.flagged.contains(item_id) && !acknowledge_abuse {
            return Err(RemoteError::FlaggedContent(item_id.to_string()));
        }
        self.media
            .get(item_id)
            .map(|c| Self::stream_of(c))
            .ok_or_else(|| RemoteError::NotFound(item_id.to_string()))
    }

    async fn export_media(
        &self,
        item_id: &str,
        _mime_type: &str,
    ) -> Result<ByteStream, RemoteError> {
        self.media_gate(item_id)?;
        self.exports
            .get(item_id)
            .map(|c| Self::stream_of(c))
            .ok_or_else(|| RemoteError::NotFound(item_id.to_string()))
    }

    async fn get_revision_media(
        &self,
        item_id: &str,
        revision_id: &str,
    ) -> Result<ByteStream, RemoteError> {
        self.media_gate(item_id)?;
        self.revision_media
            .get(&(item_id.to_string(), revision_id.to_string()))
            .map(|c| Self::stream_of(c))
            .ok_or_else(|| RemoteError::NotFound(format!("{item_id}/{revision_id}")))
    }

    async fn list_revisions(&self, item_id: &str) -> Result<Vec<Revision>, RemoteError> {
        self.gate()?;
        Ok(self.revisions.get(item_id).cloned().unwrap_or_default())
    }
}
