//! CosmicPanel daemon entrypoint.
//!
//! Usage:
//!   cosmicpanel --config /etc/cosmicpanel/config.yml [--debug] [--dnsonly]
//!
//! Loads the configuration, installs logging for the startup scope and runs
//! the bootstrap. Any configuration or account error exits with status 1.

use anyhow::{Context, Result};
use clap::Parser;
use cosmicpanel::{Bootstrap, ConfigStore, LicenseServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cosmicpanel")]
#[command(about = "CosmicPanel daemon", version)]
struct Args {
    /// Location of the configuration file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Run in debug mode regardless of the configuration file
    #[arg(long)]
    debug: bool,

    /// Request a DNS-only license instead of a trial when verification fails
    #[arg(long)]
    dnsonly: bool,

    /// Override the license verify endpoint
    #[arg(long)]
    license_verify_url: Option<String>,

    /// Override the license request endpoint
    #[arg(long)]
    license_request_url: Option<String>,

    /// Timeout in seconds for each license server call
    #[arg(long, default_value = "30")]
    license_timeout: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut store = match ConfigStore::open(&args.config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("cosmicpanel: {}", e);
            return ExitCode::FAILURE;
        }
    };
    store.config_mut().apply_debug_flag(args.debug);

    let level = if store.config().is_debug() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::with_default(subscriber, || match run(&args, &mut store) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    })
}

fn run(args: &Args, store: &mut ConfigStore) -> Result<()> {
    tracing::info!(config = %store.path().display(), "CosmicPanel starting");

    let mut license = LicenseServerConfig {
        timeout: Duration::from_secs(args.license_timeout),
        ..Default::default()
    };
    if let Some(url) = &args.license_verify_url {
        license.verify_url = url.clone();
    }
    if let Some(url) = &args.license_request_url {
        license.request_url = url.clone();
    }

    let bootstrap = Bootstrap::new(license).context("invalid license server settings")?;
    let report = bootstrap
        .run(store, args.dnsonly)
        .with_context(|| format!("bootstrap failed for {}", store.path().display()))?;

    tracing::info!(
        user = %report.user.username,
        license = %report.license,
        "CosmicPanel ready"
    );
    Ok(())
}
