//! Sequential batch engine: one `binstage-fetch` child per package.
//!
//! The batch never fails because a package failed; resolution failures are
//! aggregated into the report and the sentinel file. Only
//! configuration-class problems (uncreatable output directory, unwritable
//! report) surface as errors.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use binstage_schema::Arch;
use thiserror::Error;
use tracing::{info, warn};
use wait_timeout::ChildExt;
use walkdir::WalkDir;

use crate::stage::{self, StageSummary};

/// Sentinel report file written into the output directory when at least
/// one package failed every tier.
pub const REPORT_FILE: &str = "FAILED_FETCHES.txt";

/// Default hard ceiling for one fetcher child.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Fatal configuration-class errors for a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The output directory (or its `bin/`) could not be created.
    #[error("failed to create output dir: {path} ({source})")]
    OutputDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },
    /// The batch staging root could not be created.
    #[error("failed to create staging dir: {0}")]
    Staging(#[source] io::Error),
    /// The failure report could not be written.
    ///
    /// Fatal because the sentinel file is the batch's only
    /// machine-readable failure channel.
    #[error("failed to write FAILED_FETCHES.txt to {path} ({source})")]
    Report {
        /// Intended report path.
        path: PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },
}

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Normalized target architecture forwarded to each fetcher child.
    pub arch: Arch,
    /// Output directory; staged executables land in its `bin/` subdirectory.
    pub output_dir: PathBuf,
    /// Path to the `binstage-fetch` executable.
    pub fetcher: PathBuf,
    /// Hard per-package ceiling; the child is killed when it elapses.
    pub timeout: Duration,
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// How many packages were attempted.
    pub attempted: usize,
    /// Identifiers whose entire fallback chain failed, in input order.
    pub failures: Vec<String>,
    /// Total files found across per-package staging directories.
    pub staged_files: usize,
    /// Collection/normalization counters for the `bin/` directory.
    pub summary: StageSummary,
}

impl BatchReport {
    /// Path of the sentinel report inside `output_dir`.
    pub fn report_path(output_dir: &Path) -> PathBuf {
        output_dir.join(REPORT_FILE)
    }

    /// One-line sentinel body: `FAILED_FETCHES:<id1>,<id2>,...`.
    pub fn sentinel_line(&self) -> String {
        format!("FAILED_FETCHES:{}\n", self.failures.join(","))
    }
}

/// Run the whole batch: fetch each package sequentially, collect
/// executables into `<output-dir>/bin`, normalize permissions, and write
/// the failure report when needed.
///
/// A package that times out, exits non-zero, or cannot even be spawned is
/// recorded as failed and the batch continues.
///
/// # Errors
///
/// Only configuration-class problems: uncreatable output/staging
/// directories or an unwritable report file.
pub fn run(packages: &[String], opts: &BatchOptions) -> Result<BatchReport, BatchError> {
    let bin_dir = opts.output_dir.join("bin");
    fs::create_dir_all(&bin_dir).map_err(|source| BatchError::OutputDir {
        path: bin_dir.clone(),
        source,
    })?;

    let staging_root = tempfile::Builder::new()
        .prefix("binstage-batch-")
        .tempdir()
        .map_err(BatchError::Staging)?;

    let mut report = BatchReport {
        attempted: packages.len(),
        ..BatchReport::default()
    };

    let arch = opts.arch;
    info!("fetching {} packages", packages.len());
    for package in packages {
        info!("fetching {package} for arch={arch}");
        let pkg_dir = staging_root
            .path()
            .join(format!("fetch_{}", package.replace('/', "_")));
        if let Err(e) = fs::create_dir_all(&pkg_dir) {
            warn!("{package} error: {e}");
            report.failures.push(package.clone());
            continue;
        }
        if fetch_one(package, &pkg_dir, opts) {
            let count = file_count(&pkg_dir);
            report.staged_files += count;
            info!("{package} downloaded to {} ({count} files)", pkg_dir.display());
        } else {
            report.failures.push(package.clone());
        }
    }
    info!("total downloaded files: {}", report.staged_files);

    report.summary = stage::collect_binaries(staging_root.path(), &bin_dir);
    report.summary.merge(stage::normalize_dir(&bin_dir));
    info!("processed {} files", report.summary.installed);

    if !report.failures.is_empty() {
        let path = BatchReport::report_path(&opts.output_dir);
        fs::write(&path, report.sentinel_line()).map_err(|source| BatchError::Report {
            path: path.clone(),
            source,
        })?;
        warn!(
            "{} package(s) failed to download, but continuing anyway",
            report.failures.len()
        );
    }

    Ok(report)
}

/// Spawn one fetcher child for `package` and wait, bounded by the timeout.
///
/// The child inherits stdout/stderr so soar's progress text reaches the
/// operator; stdin is closed to keep everything non-interactive.
fn fetch_one(package: &str, dest: &Path, opts: &BatchOptions) -> bool {
    let mut cmd = Command::new(&opts.fetcher);
    cmd.arg(package)
        .arg("--arch")
        .arg(opts.arch.as_str())
        .arg("--dest")
        .arg(dest)
        .stdin(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("{package} error: {e}");
            return false;
        }
    };
    match child.wait_timeout(opts.timeout) {
        Ok(Some(status)) if status.success() => true,
        Ok(Some(status)) => {
            warn!("{package} failed with exit code {}", status.code().unwrap_or(-1));
            false
        }
        Ok(None) => {
            // Out of time: kill and reap so no zombie outlives the batch.
            let _ = child.kill();
            let _ = child.wait();
            warn!("{package} timed out ({}s)", opts.timeout.as_secs());
            false
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            warn!("{package} error: {e}");
            false
        }
    }
}

/// Print the operator-facing failure summary to stdout.
///
/// stdout is the batch's report surface; logs go to stderr.
pub fn print_failure_summary(report: &BatchReport) {
    if report.failures.is_empty() {
        return;
    }
    println!("=== FAILED_FETCHES ===");
    println!("{}", report.failures.join(","));
}

/// Print the final `bin/` listing to stdout: permission bits, size, name.
pub fn print_bin_listing(output_dir: &Path) {
    let bin_dir = output_dir.join("bin");
    println!("=== output bin contents ===");
    println!("Contents of {}:", bin_dir.display());

    let mut entries: Vec<_> = WalkDir::new(&bin_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by_key(|e| e.file_name().to_os_string());

    for entry in entries {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let mode = meta.permissions().mode() & 0o777;
        let size = meta.len();
        let name = entry.file_name().to_string_lossy();
        println!("  {mode:3o} {size:10}  {name}");
    }
}

fn file_count(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Write a fake fetcher that answers the exact argv shape
    /// `<pkg> --arch <arch> --dest <dir>` used by [`fetch_one`].
    fn fake_fetcher(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-fetch");
        fs::write(&path, format!("#!/bin/sh\npkg=\"$1\"\ndest=\"$5\"\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn options(tmp: &Path, fetcher: PathBuf, timeout_secs: u64) -> BatchOptions {
        BatchOptions {
            arch: Arch::X86_64,
            output_dir: tmp.join("output"),
            fetcher,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[test]
    fn test_mixed_batch_writes_report_and_stages_winners() {
        let tmp = tempdir().unwrap();
        let fetcher = fake_fetcher(
            tmp.path(),
            r#"mkdir -p "$dest"
case "$pkg" in
  ok/repo) printf '\177ELF' > "$dest/oktool"; printf 'readme' > "$dest/README"; exit 0 ;;
  *) exit 1 ;;
esac"#,
        );
        let opts = options(tmp.path(), fetcher, 30);
        let packages = vec!["ok/repo".to_string(), "bad/repo".to_string()];

        let report = run(&packages, &opts).unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.failures, ["bad/repo"]);
        assert_eq!(report.staged_files, 2);
        assert_eq!(report.summary.installed, 1);
        assert_eq!(report.summary.ignored, 1);

        // The winner's binary landed in bin/ with exec bits.
        let staged = opts.output_dir.join("bin/oktool");
        assert!(staged.is_file());
        let mode = fs::metadata(&staged).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        assert!(!opts.output_dir.join("bin/README").exists());

        // Sentinel holds exactly the failed identifier.
        let sentinel = fs::read_to_string(BatchReport::report_path(&opts.output_dir)).unwrap();
        assert_eq!(sentinel, "FAILED_FETCHES:bad/repo\n");
    }

    #[test]
    fn test_no_failures_means_no_report_file() {
        let tmp = tempdir().unwrap();
        let fetcher = fake_fetcher(
            tmp.path(),
            r#"mkdir -p "$dest"; printf '#!/bin/sh\n' > "$dest/tool.sh"; exit 0"#,
        );
        let opts = options(tmp.path(), fetcher, 30);

        let report = run(&["a/b".to_string()], &opts).unwrap();
        assert!(report.failures.is_empty());
        assert!(!BatchReport::report_path(&opts.output_dir).exists());
        assert!(opts.output_dir.join("bin/tool.sh").is_file());
    }

    #[test]
    fn test_timeout_kills_child_and_batch_continues() {
        let tmp = tempdir().unwrap();
        let fetcher = fake_fetcher(
            tmp.path(),
            r#"mkdir -p "$dest"
case "$pkg" in
  slow/pkg) sleep 30; exit 0 ;;
  *) printf '\177ELF' > "$dest/fast"; exit 0 ;;
esac"#,
        );
        let opts = options(tmp.path(), fetcher, 1);
        let packages = vec!["slow/pkg".to_string(), "fast/pkg".to_string()];

        let report = run(&packages, &opts).unwrap();
        assert_eq!(report.failures, ["slow/pkg"]);
        assert!(opts.output_dir.join("bin/fast").is_file());
    }

    #[test]
    fn test_unspawnable_fetcher_is_per_package_failure() {
        let tmp = tempdir().unwrap();
        let opts = options(tmp.path(), tmp.path().join("missing-fetcher"), 5);

        let report = run(&["a/b".to_string()], &opts).unwrap();
        assert_eq!(report.failures, ["a/b"]);
        let sentinel = fs::read_to_string(BatchReport::report_path(&opts.output_dir)).unwrap();
        assert_eq!(sentinel, "FAILED_FETCHES:a/b\n");
    }

    #[test]
    fn test_sentinel_line_joins_with_commas() {
        let report = BatchReport {
            failures: vec!["a/b".to_string(), "c/d".to_string()],
            ..BatchReport::default()
        };
        assert_eq!(report.sentinel_line(), "FAILED_FETCHES:a/b,c/d\n");
    }
}
