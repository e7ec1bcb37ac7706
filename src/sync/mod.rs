//! Mirror engine — decides per item whether the local copy is still a
//! faithful mirror, fetches content and revision history when it is not,
//! persists the redacted metadata sidecar, and emits one comparison record
//! per item. Fully sequential: one item completes before the next begins,
//! bounding both memory and request rate.

pub mod attr;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod paths;
pub mod revisions;
pub mod snapshot;
pub mod verify;
pub mod walk;

use std::path::PathBuf;

use attr::LocalFileAttr;
use error::SyncError;
use fetch::Fetcher;
use verify::VerificationResult;
use walk::ItemVisitor;

use crate::remote::{Drive, RemoteItem};
use crate::retry::RetryPolicy;
use crate::types::ExportTarget;

/// Subset of application config consumed by the engine. Decoupled from CLI
/// parsing so the engine can be tested on its own.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub data_root: PathBuf,
    pub metadata_root: PathBuf,
    pub export: ExportTarget,
    pub fetch_revisions: bool,
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

/// Run-scoped mutable state, threaded explicitly instead of living in a
/// process-wide global.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Successful content fetches this run, revisions included.
    pub downloaded: u64,
}

/// Terminal outcome of one item. Every visited item produces exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Verified(VerificationResult),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub id: String,
    pub path: String,
    pub outcome: ItemOutcome,
}

/// Per-status totals for the end-of-run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub valid: u64,
    pub invalid: u64,
    pub missing: u64,
    pub failed: u64,
}

pub fn summarize(reports: &[ItemReport]) -> RunSummary {
    let mut summary = RunSummary::default();
    for report in reports {
        match &report.outcome {
            ItemOutcome::Verified(result) => match result.status {
                verify::ItemStatus::Valid => summary.valid += 1,
                verify::ItemStatus::Invalid => summary.invalid += 1,
                verify::ItemStatus::Missing => summary.missing += 1,
            },
            ItemOutcome::Failed(_) => summary.failed += 1,
        }
    }
    summary
}

fn record(reports: &mut Vec<ItemReport>, id: String, path: String, outcome: ItemOutcome) {
    match &outcome {
        ItemOutcome::Verified(result) => tracing::info!("{result} {path} ({id})"),
        ItemOutcome::Failed(reason) => tracing::error!("FAILED {path} ({id}): {reason}"),
    }
    reports.push(ItemReport { id, path, outcome });
}

/// List an item's revisions and keep them only when they are real history.
/// A listing failure degrades to "no history" unless it is run-fatal.
async fn annotate_revisions(client: &dyn Drive, item: &mut RemoteItem) -> Result<(), SyncError> {
    match client.list_revisions(&item.id).await {
        Ok(listed) => {
            item.revisions = revisions::normalize_history(listed);
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            tracing::warn!("cannot list revisions for {}: {e}", item.id);
            Ok(())
        }
    }
}

/// Visitor for the `sync` command: fetch whatever is stale, then verify.
pub struct SyncVisitor<'a> {
    client: &'a dyn Drive,
    config: MirrorConfig,
    pub ctx: RunContext,
    pub reports: Vec<ItemReport>,
}

impl<'a> SyncVisitor<'a> {
    pub fn new(client: &'a dyn Drive, config: MirrorConfig) -> Self {
        Self {
            client,
            config,
            ctx: RunContext::default(),
            reports: Vec::new(),
        }
    }

    async fn process(
        &mut self,
        item: &mut RemoteItem,
        folder_path: &str,
        name: &str,
    ) -> Result<VerificationResult, SyncError> {
        let data_path = paths::local_path(&self.config.data_root, folder_path, name);
        let sidecar = paths::sidecar_path(&self.config.metadata_root, folder_path, name);
        let fetcher = Fetcher::new(
            self.client,
            self.config.retry.clone(),
            self.config.chunk_size,
            self.config.export,
        );

        if self.config.fetch_revisions {
            annotate_revisions(self.client, item).await?;
        }

        let mut local = LocalFileAttr::stat(&data_path).await?;
        if !local.is_valid(item) {
            let outcome = fetcher.fetch_item(item, &data_path).await?;
            self.ctx.downloaded += 1;
            if self.config.fetch_revisions {
                self.ctx.downloaded += revisions::sync_revisions(
                    &fetcher,
                    item,
                    folder_path,
                    &self.config.data_root,
                    self.config.export,
                )
                .await?;
            }
            // The store never declares checksum/size for native documents;
            // the fetched bytes become the item's working values.
            if item.md5_checksum.is_none() {
                item.md5_checksum = Some(outcome.md5_hex);
            }
            if item.file_size.is_none() {
                item.file_size = Some(outcome.bytes_written);
            }
            snapshot::save(item, &sidecar).await?;
            local = LocalFileAttr::stat(&data_path).await?;
        } else if item.is_native_doc() {
            item.md5_checksum = local.md5_hex.clone();
            item.file_size = local.size;
        }

        let stored = snapshot::stored_fingerprint(&sidecar).await?;
        verify::compare(item, &local, stored.as_deref())
    }
}

#[async_trait::async_trait]
impl ItemVisitor for SyncVisitor<'_> {
    async fn visit(&mut self, mut item: RemoteItem, folder_path: &str) -> Result<(), SyncError> {
        let name = paths::resolve_name(&item, self.config.export);
        let path = format!("{folder_path}/{name}");
        let id = item.id.clone();
        match self.process(&mut item, folder_path, &name).await {
            Ok(result) => record(&mut self.reports, id, path, ItemOutcome::Verified(result)),
            Err(e) if e.is_run_fatal() => return Err(e),
            Err(e) => record(&mut self.reports, id, path, ItemOutcome::Failed(e.to_string())),
        }
        Ok(())
    }
}

/// Visitor for the `audit` command: compare only, never fetch.
pub struct AuditVisitor<'a> {
    client: &'a dyn Drive,
    config: MirrorConfig,
    pub reports: Vec<ItemReport>,
}

impl<'a> AuditVisitor<'a> {
    pub fn new(client: &'a dyn Drive, config: MirrorConfig) -> Self {
        Self {
            client,
            config,
            reports: Vec::new(),
        }
    }

    async fn process(
        &mut self,
        item: &mut RemoteItem,
        folder_path: &str,
        name: &str,
    ) -> Result<VerificationResult, SyncError> {
        let data_path = paths::local_path(&self.config.data_root, folder_path, name);
        let sidecar = paths::sidecar_path(&self.config.metadata_root, folder_path, name);

        if self.config.fetch_revisions {
            annotate_revisions(self.client, item).await?;
        }

        let local = LocalFileAttr::stat(&data_path).await?;
        if item.is_native_doc() && local.exists {
            item.md5_checksum = local.md5_hex.clone();
            item.file_size = local.size;
        }

        let stored = snapshot::stored_fingerprint(&sidecar).await?;
        verify::compare(item, &local, stored.as_deref())
    }
}

#[async_trait::async_trait]
impl ItemVisitor for AuditVisitor<'_> {
    async fn visit(&mut self, mut item: RemoteItem, folder_path: &str) -> Result<(), SyncError> {
        let name = paths::resolve_name(&item, self.config.export);
        let path = format!("{folder_path}/{name}");
        let id = item.id.clone();
        match self.process(&mut item, folder_path, &name).await {
            Ok(result) => record(&mut self.reports, id, path, ItemOutcome::Verified(result)),
            Err(e) if e.is_run_fatal() => return Err(e),
            Err(e) => record(&mut self.reports, id, path, ItemOutcome::Failed(e.to_string())),
        }
        Ok(())
    }
}

/// Visitor for the `verify` command: offline comparison of reconstructed
/// snapshot items, no remote connection at all.
pub struct VerifyVisitor {
    config: MirrorConfig,
    pub reports: Vec<ItemReport>,
}

impl VerifyVisitor {
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            config,
            reports: Vec::new(),
        }
    }

    async fn process(
        &mut self,
        item: &RemoteItem,
        folder_path: &str,
        name: &str,
    ) -> Result<VerificationResult, SyncError> {
        let data_path = paths::local_path(&self.config.data_root, folder_path, name);
        let sidecar = paths::sidecar_path(&self.config.metadata_root, folder_path, name);

        let local = LocalFileAttr::stat(&data_path).await?;
        let stored = snapshot::stored_fingerprint(&sidecar).await?;
        let result = verify::compare(item, &local, stored.as_deref())?;

        let bad = revisions::audit_revisions(
            item,
            folder_path,
            &self.config.data_root,
            self.config.export,
        )
        .await;
        if !bad.is_empty() {
            tracing::warn!("{} has {} invalid revision(s)", item.id, bad.len());
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl ItemVisitor for VerifyVisitor {
    async fn visit(&mut self, item: RemoteItem, folder_path: &str) -> Result<(), SyncError> {
        let name = paths::resolve_name(&item, self.config.export);
        let path = format!("{folder_path}/{name}");
        let id = item.id.clone();
        match self.process(&item, folder_path, &name).await {
            Ok(result) => record(&mut self.reports, id, path, ItemOutcome::Verified(result)),
            Err(e) if e.is_run_fatal() => return Err(e),
            Err(e) => record(&mut self.reports, id, path, ItemOutcome::Failed(e.to_string())),
        }
        Ok(())
    }
}
