//! Remote hierarchy traversal.
//!
//! Iterative walk over an explicit work queue, so traversal depth never
//! grows the call stack. Each folder is listed page by page until the
//! continuation token runs out; children are visited in title order, which
//! makes repeated runs over an unchanged tree produce identical output.

use std::collections::VecDeque;

use super::error::SyncError;
use super::paths::sanitize_title;
use crate::remote::{Drive, RemoteItem};

/// Hierarchies deeper than this are assumed cyclic or hostile; deeper
/// folders are logged and skipped.
pub const MAX_DEPTH: usize = 128;

/// Per-file callback of a traversal.
///
/// Implementations handle their own per-item failures; an `Err` return is
/// reserved for run-fatal conditions and stops the walk.
#[async_trait::async_trait]
pub trait ItemVisitor: Send {
    async fn visit(&mut self, item: RemoteItem, folder_path: &str) -> Result<(), SyncError>;
}

/// Walk every file beneath `root`, handing each to `visitor` along with the
/// accumulated ancestor-folder path (`.`-rooted).
///
/// `query` narrows file listings on the store side; `filter` narrows them
/// client side. Neither ever prunes a folder: folders must always be
/// expanded to reach their descendants. A listing failure skips that
/// folder's subtree and the walk continues with its siblings; only a fatal
/// remote error (revoked authorization) aborts the walk.
pub async fn walk(
    client: &dyn Drive,
    root: RemoteItem,
    query: Option<&str>,
    filter: Option<&(dyn Fn(&RemoteItem) -> bool + Send + Sync)>,
    visitor: &mut dyn ItemVisitor,
) -> Result<(), SyncError> {
    let mut queue: VecDeque<(RemoteItem, String, usize)> = VecDeque::new();
    queue.push_back((root, ".".to_string(), 0));

    while let Some((folder, folder_path, depth)) = queue.pop_front() {
        if depth > MAX_DEPTH {
            tracing::warn!(
                "folder {} exceeds depth limit {MAX_DEPTH}, skipping subtree",
                folder.title
            );
            continue;
        }

        let mut page_token: Option<String> = None;
        loop {
            let page = match client
                .list_children(&folder.id, query, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(
                        "cannot list folder '{}' ({}): {e}; skipping subtree",
                        folder.title,
                        folder.id
                    );
                    break;
                }
            };

            let mut children = page.items;
            children.sort_by(|a, b| a.title.cmp(&b.title));

            for child in children {
                if child.is_folder() {
                    let child_path = format!("{folder_path}/{}", sanitize_title(&child.title));
                    queue.push_back((child, child_path, depth + 1));
                } else if filter.is_none_or(|keep| keep(&child)) {
                    visitor.visit(child, &folder_path).await?;
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
    }
    Ok(())
}
