//! binstage-batch - fetch a list of packages and stage their executables.
//!
//! Runs one `binstage-fetch` child per package (sequentially, each bounded
//! by a 300-second timeout), collects every ELF binary and shebang script
//! the children staged into `<output-dir>/bin`, and writes an advisory
//! `FAILED_FETCHES.txt` for packages whose whole fallback chain failed.
//! Resolution failures never change the exit status; only configuration
//! problems exit non-zero.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use binstage_core::batch::{self, BatchOptions, FETCH_TIMEOUT};
use binstage_core::manifest;
use binstage_schema::Arch;

/// Fixed locations searched for `binstage-fetch` after the directory of
/// the running executable.
const FETCHER_FALLBACKS: &[&str] = &["/usr/local/bin/binstage-fetch", "./binstage-fetch"];

/// Fetch many packages and collect their executables into one bin directory.
#[derive(Debug, Parser)]
#[command(name = "binstage-batch", version)]
struct Cli {
    /// Packages to fetch: an inline whitespace-separated list of
    /// `owner/repo` identifiers, a newline-delimited file, or a JSON
    /// document (bare array or `{"packages": [...]}`).
    packages: String,

    /// Target architecture forwarded to every fetch.
    #[arg(long, default_value = "x86_64", value_name = "ARCH")]
    target_arch: String,

    /// Output directory; executables land in its `bin/` subdirectory.
    #[arg(long, default_value = "/build/output", value_name = "DIR")]
    output_dir: PathBuf,

    /// Explicit path to the binstage-fetch executable.
    #[arg(long, value_name = "PATH")]
    soar_script: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

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

/// Validate configuration, run the batch, and emit the stdout report.
///
/// Once configuration validates, the result is always `Ok` as far as
/// resolution goes: failed packages are data in the report, not errors.
fn run(cli: &Cli) -> Result<()> {
    let arch = cli.target_arch.parse::<Arch>().map_err(anyhow::Error::msg)?;
    let packages = manifest::parse_packages(&cli.packages)?;
    let fetcher = locate_fetcher(cli.soar_script.as_deref())?;

    let opts = BatchOptions {
        arch,
        output_dir: cli.output_dir.clone(),
        fetcher,
        timeout: FETCH_TIMEOUT,
    };
    let report = batch::run(&packages, &opts)?;

    batch::print_failure_summary(&report);
    batch::print_bin_listing(&cli.output_dir);
    Ok(())
}

/// Find the `binstage-fetch` executable.
///
/// An explicit `--soar-script` override must exist; otherwise the search
/// order is: alongside this executable, then the fixed fallback paths.
fn locate_fetcher(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        anyhow::ensure!(
            path.is_file(),
            "fetch script not found at {}",
            path.display()
        );
        return Ok(path.to_path_buf());
    }

    if let Ok(exe) = std::env::current_exe() {
        let sibling = exe.with_file_name("binstage-fetch");
        if sibling.is_file() {
            return Ok(sibling);
        }
    }
    for candidate in FETCHER_FALLBACKS {
        let path = Path::new(candidate);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
    }
    anyhow::bail!("binstage-fetch executable not found; pass --soar-script <path>")
}
