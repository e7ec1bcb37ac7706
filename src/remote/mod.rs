//! Remote store capability: the trait the sync engine consumes, plus the
//! HTTP implementation and wire model.

pub mod error;
pub mod http;
pub mod item;

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

pub use error::RemoteError;
pub use http::HttpDrive;
pub use item::{ItemPage, RemoteItem, Revision, FOLDER_MIME};

/// Content bytes as they arrive from the store. Errors are `std::io::Error`
/// so the stream can feed a `StreamReader`; transport failures carry a
/// [`RemoteError`] as their source and are recovered by the fetcher for
/// retry classification.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// The four capabilities the engine needs from a remote content store.
///
/// Implementations must be side-effect free on the remote: every method is a
/// read. Pagination is continuation-token based; a `None` token means the
/// first page.
#[async_trait::async_trait]
pub trait Drive: Send + Sync {
    /// List one page of a folder's children, optionally narrowed by a
    /// store-side metadata query. The query never filters out folders.
    async fn list_children(
        &self,
        folder_id: &str,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ItemPage, RemoteError>;

    /// Fetch a single item's metadata by id.
    async fn get_item(&self, item_id: &str) -> Result<RemoteItem, RemoteError>;

    /// Stream an item's raw content. `acknowledge_abuse` opts into
    /// downloading content the store has flagged.
    async fn get_media(
        &self,
        item_id: &str,
        acknowledge_abuse: bool,
    ) -> Result<ByteStream, RemoteError>;

    /// Stream a converted rendition of a native document.
    async fn export_media(&self, item_id: &str, mime_type: &str)
        -> Result<ByteStream, RemoteError>;

    /// Stream the content of one historical revision.
    async fn get_revision_media(
        &self,
        item_id: &str,
        revision_id: &str,
    ) -> Result<ByteStream, RemoteError>;

    /// List an item's revisions, oldest first.
    async fn list_revisions(&self, item_id: &str) -> Result<Vec<Revision>, RemoteError>;
}
