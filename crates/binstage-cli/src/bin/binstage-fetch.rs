//! binstage-fetch - fetch one repository's prebuilt static binary.
//!
//! Resolves a GitHub `owner/repo` through the three-tier fallback chain
//! (musl release assets, soar's package index, generic Linux release
//! assets) and installs the extracted files into `--dest` with executable
//! permissions normalized.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use binstage_core::Resolver;
use binstage_schema::{Arch, RepoSpec};

/// Fetch a prebuilt static binary for one GitHub repository via `soar`.
#[derive(Debug, Parser)]
#[command(name = "binstage-fetch", version)]
struct Cli {
    /// GitHub repository, as `owner/repo`.
    repo: String,

    /// Destination directory for the fetched files (created if absent).
    #[arg(long, value_name = "DIR")]
    dest: PathBuf,

    /// Target architecture: x86_64 (amd64) or arm64 (aarch64).
    /// Auto-detected from this machine when omitted.
    #[arg(long, value_name = "ARCH")]
    arch: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Exit contract: 0 for --help/--version, 1 for bad or missing
    // arguments (clap's default of 2 is remapped).
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let failed = e.use_stderr();
            let _ = e.print();
            return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Validate inputs, then drive the resolver.
///
/// Order matters: the identifier and architecture are checked and `soar`
/// located before anything touches the network.
fn run(cli: &Cli) -> Result<()> {
    let repo: RepoSpec = cli.repo.parse()?;
    let arch = match &cli.arch {
        Some(alias) => alias.parse::<Arch>().map_err(anyhow::Error::msg)?,
        None => Arch::detect().map_err(anyhow::Error::msg)?,
    };

    let resolver = Resolver::new(arch)?;
    let report = resolver.resolve(&repo, &cli.dest)?;
    info!(
        "{repo} resolved via {} ({} installed, {} skipped)",
        report.tier, report.summary.installed, report.summary.skipped
    );

    println!("Install complete. Files to: {}", cli.dest.display());
    Ok(())
}
