//! `reqwest` implementation of the [`Drive`] capability against the store's
//! REST surface, authenticated with a ready bearer token. The OAuth flow
//! that produces the token lives outside this tool.

use futures_util::TryStreamExt;
use serde_json::Value;

use super::error::RemoteError;
use super::item::{ItemPage, RemoteItem, Revision, RevisionPage, FOLDER_MIME};
use super::{ByteStream, Drive};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v2";

pub struct HttpDrive {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpDrive {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.http.get(url).bearer_auth(&self.token)
    }

    /// Map a non-success response onto the error taxonomy. 403 needs the
    /// body: the store reports flagged content as a permission error with an
    /// abuse reason code.
    async fn check(
        resp: reqwest::Response,
        endpoint: &str,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status.as_u16() {
            401 => Err(RemoteError::AuthExpired),
            403 => {
                let body = resp.text().await.unwrap_or_default();
                if body.contains("cannotDownloadAbusiveFile") || body.contains("abusiveContent") {
                    Err(RemoteError::FlaggedContent(endpoint.to_string()))
                } else {
                    Err(RemoteError::Status {
                        status: 403,
                        endpoint: endpoint.to_string(),
                    })
                }
            }
            404 => Err(RemoteError::NotFound(endpoint.to_string())),
            code => Err(RemoteError::Status {
                status: code,
                endpoint: endpoint.to_string(),
            }),
        }
    }

    fn into_stream(resp: reqwest::Response) -> ByteStream {
        Box::pin(
            resp.bytes_stream()
                .map_err(|e| std::io::Error::other(RemoteError::Transport(e))),
        )
    }

    /// Email address of the authenticated account, used as the per-account
    /// mirror subdirectory.
    pub async fn user_email(&self) -> Result<String, RemoteError> {
        let resp = self.get(format!("{}/about", self.base_url)).send().await?;
        let about: Value = Self::check(resp, "about").await?.json().await?;
        about
            .pointer("/user/emailAddress")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(RemoteError::NotFound("about.user.emailAddress".to_string()))
    }

    /// Resolve a `/`-separated folder path to its folder item, starting at
    /// the hierarchy root. `None` resolves to the root folder itself.
    pub async fn resolve_folder(&self, path: Option<&str>) -> Result<RemoteItem, RemoteError> {
        let Some(path) = path else {
            return self.get_item("root").await;
        };
        let mut folder = self.get_item("root").await?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let escaped = segment.replace('\'', "\\'");
            let query = format!("'{}' in parents and title='{}'", folder.id, escaped);
            let resp = self
                .get(format!("{}/files", self.base_url))
                .query(&[("q", query.as_str())])
                .send()
                .await?;
            let page: ItemPage = Self::check(resp, "files.list").await?.json().await?;
            folder = page
                .items
                .into_iter()
                .find(RemoteItem::is_folder)
                .ok_or_else(|| RemoteError::NotFound(format!("folder '{segment}' in {path}")))?;
        }
        Ok(folder)
    }
}

#[async_trait::async_trait]
impl Drive for HttpDrive {
    async fn list_children(
        &self,
        folder_id: &str,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ItemPage, RemoteError> {
        // Folders are OR-ed back into a caller query so a content filter can
        // never prune the traversal itself.
        let q = match query {
            Some(extra) => format!(
                "'{folder_id}' in parents and ( ( mimeType = '{FOLDER_MIME}' ) or ( {extra} ) )"
            ),
            None => format!("'{folder_id}' in parents"),
        };
        let mut params = vec![("q", q)];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let resp = self
            .get(format!("{}/files", self.base_url))
            .query(&params)
            .send()
            .await?;
        Ok(Self::check(resp, "files.list").await?.json().await?)
    }

    async fn get_item(&self, item_id: &str) -> Result<RemoteItem, RemoteError> {
        let resp = self
            .get(format!("{}/files/{item_id}", self.base_url))
            .send()
            .await?;
        Ok(Self::check(resp, "files.get").await?.json().await?)
    }

    async fn get_media(
        &self,
        item_id: &str,
        acknowledge_abuse: bool,
    ) -> Result<ByteStream, RemoteError> {
        let resp = self
            .get(format!("{}/files/{item_id}", self.base_url))
            .query(&[
                ("alt", "media"),
                ("acknowledgeAbuse", if acknowledge_abuse { "true" } else { "false" }),
            ])
            .send()
            .await?;
        Ok(Self::into_stream(Self::check(resp, item_id).await?))
    }

    async fn export_media(
        &self,
        item_id: &str,
        mime_type: &str,
    ) -> Result<ByteStream, RemoteError> {
        let resp = self
            .get(format!("{}/files/{item_id}/export", self.base_url))
            .query(&[("mimeType", mime_type)])
            .send()
            .await?;
        Ok(Self::into_stream(Self::check(resp, item_id).await?))
    }

    async fn get_revision_media(
        &self,
        item_id: &str,
        revision_id: &str,
    ) -> Result<ByteStream, RemoteError> {
        let resp = self
            .get(format!(
                "{}/files/{item_id}/revisions/{revision_id}",
                self.base_url
            ))
            .query(&[("alt", "media")])
            .send()
            .await?;
        Ok(Self::into_stream(Self::check(resp, revision_id).await?))
    }

    async fn list_revisions(&self, item_id: &str) -> Result<Vec<Revision>, RemoteError> {
        let resp = self
            .get(format!("{}/files/{item_id}/revisions", self.base_url))
            .send()
            .await?;
        let page: RevisionPage = Self::check(resp, "revisions.list").await?.json().await?;
        Ok(page.items)
    }
}
