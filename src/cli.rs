use clap::{Parser, Subcommand};

use crate::types::{ExportTarget, ItemCategory};

#[derive(Parser, Debug)]
#[command(name = "drivemirror", about = "Mirror and verify a remote drive")]
pub struct Cli {
    /// API access token.
    /// WARNING: passing via --access-token is visible in process listings.
    /// Prefer the DRIVEMIRROR_TOKEN environment variable instead.
    #[arg(short = 't', long, env = "DRIVEMIRROR_TOKEN")]
    pub access_token: Option<String>,

    /// Local root for mirrored content
    #[arg(short = 'd', long, default_value = "./download")]
    pub destination: String,

    /// Local root for metadata sidecars
    #[arg(short = 'm', long, default_value = "./download-metadata")]
    pub metadata_destination: String,

    /// Source folder path within the remote drive (default: the root)
    #[arg(short = 'f', long)]
    pub folder: Option<String>,

    /// Remote metadata query narrowing which files are listed
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Content category to process
    #[arg(long, value_enum, default_value = "all")]
    pub category: ItemCategory,

    /// Export format for native documents
    #[arg(long, value_enum, default_value = "pdf")]
    pub export: ExportTarget,

    /// Don't mirror revision history
    #[arg(long)]
    pub no_revisions: bool,

    /// Download chunk size in bytes
    #[arg(long, default_value_t = crate::sync::fetch::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Attempts per download before giving up on an item
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Base retry backoff in seconds
    #[arg(long, default_value_t = 2)]
    pub retry_delay_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download whatever is stale and verify the mirror
    Sync,
    /// Compare remote metadata against the mirror without downloading
    Audit,
    /// Verify the mirror offline, from persisted metadata alone
    Verify,
}
