use std::path::PathBuf;

use crate::cli::Cli;
use crate::retry::RetryPolicy;
use crate::sync::MirrorConfig;
use crate::types::{ExportTarget, ItemCategory};

/// Application configuration assembled from the CLI.
#[derive(Debug)]
pub struct Config {
    pub destination: PathBuf,
    pub metadata_destination: PathBuf,
    pub folder: Option<String>,
    pub query: Option<String>,
    pub category: ItemCategory,
    pub export: ExportTarget,
    pub fetch_revisions: bool,
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        if cli.chunk_size == 0 {
            anyhow::bail!("--chunk-size must be at least 1 byte");
        }
        Ok(Self {
            destination: PathBuf::from(&cli.destination),
            metadata_destination: PathBuf::from(&cli.metadata_destination),
            folder: cli.folder.clone(),
            query: cli.query.clone(),
            category: cli.category,
            export: cli.export,
            fetch_revisions: !cli.no_revisions,
            chunk_size: cli.chunk_size,
            retry: RetryPolicy {
                max_attempts: cli.max_attempts,
                base_delay_secs: cli.retry_delay_secs,
                ..RetryPolicy::default()
            },
        })
    }

    /// Engine view of this configuration, rooted under one account's
    /// subdirectories.
    pub fn mirror_config(&self, account: &str) -> MirrorConfig {
        MirrorConfig {
            data_root: self.destination.join(account),
            metadata_root: self.metadata_destination.join(account),
            export: self.export,
            fetch_revisions: self.fetch_revisions,
            chunk_size: self.chunk_size,
            retry: self.retry.clone(),
        }
    }
}
