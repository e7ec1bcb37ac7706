//! drivemirror — one-way mirror of a remote drive with continuous
//! verification.
//!
//! Walks the remote hierarchy, downloads whatever the validity check says is
//! stale (streaming with an incremental checksum and bounded retries),
//! persists a redacted metadata sidecar per item, and reports a per-dimension
//! comparison for every file. Verification also runs fully offline against
//! the persisted sidecars.

#![warn(clippy::all)]

mod cli;
mod config;
mod remote;
pub mod retry;
mod sync;
#[cfg(test)]
mod testutil;
mod types;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::Config;
use remote::{HttpDrive, RemoteItem};
use sync::{summarize, AuditVisitor, ItemReport, SyncVisitor, VerifyVisitor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;

    match cli.command {
        Command::Verify => run_verify(&config).await,
        Command::Sync | Command::Audit => {
            let token = cli.access_token.as_deref().context(
                "an access token is required; pass --access-token or set DRIVEMIRROR_TOKEN",
            )?;
            let drive = HttpDrive::new(token);
            run_remote(&drive, &config, matches!(cli.command, Command::Sync)).await
        }
    }
}

/// Live commands: walk the remote tree and either mirror (`sync`) or only
/// compare (`audit`).
async fn run_remote(drive: &HttpDrive, config: &Config, fetch: bool) -> anyhow::Result<()> {
    let account = match drive.user_email().await {
        Ok(email) => email,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            tracing::warn!("cannot resolve account identity: {e}");
            "(noaccount)".to_string()
        }
    };
    let root = drive
        .resolve_folder(config.folder.as_deref())
        .await
        .context("cannot resolve source folder")?;

    let category = config.category;
    let keep = move |item: &RemoteItem| category.matches(&item.mime_type);
    let query = config.query.as_deref();
    let mirror = config.mirror_config(&account);

    if fetch {
        let mut visitor = SyncVisitor::new(drive, mirror);
        sync::walk::walk(drive, root, query, Some(&keep), &mut visitor).await?;
        print_summary(&account, &visitor.reports);
        println!("{} files downloaded from {account}", visitor.ctx.downloaded);
    } else {
        let mut visitor = AuditVisitor::new(drive, mirror);
        sync::walk::walk(drive, root, query, Some(&keep), &mut visitor).await?;
        print_summary(&account, &visitor.reports);
    }
    Ok(())
}

/// Offline verification: one pass per account directory found under the
/// metadata root, no remote connection at all.
async fn run_verify(config: &Config) -> anyhow::Result<()> {
    let mut accounts: Vec<String> = std::fs::read_dir(&config.metadata_destination)
        .with_context(|| {
            format!(
                "cannot read metadata root {}",
                config.metadata_destination.display()
            )
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    accounts.sort();

    for account in accounts {
        let mut visitor = VerifyVisitor::new(config.mirror_config(&account));
        sync::snapshot::walk_snapshots(&config.metadata_destination.join(&account), &mut visitor)
            .await?;
        print_summary(&account, &visitor.reports);
    }
    Ok(())
}

fn print_summary(account: &str, reports: &[ItemReport]) {
    let summary = summarize(reports);
    println!(
        "{account}: {} valid, {} invalid, {} missing, {} failed",
        summary.valid, summary.invalid, summary.missing, summary.failed
    );
}
