//! Thin wrapper around the external `soar` CLI.
//!
//! All network access and archive extraction is delegated to `soar dl`;
//! binstage only shapes the invocations and inspects the outcomes. The
//! tool is treated as an opaque collaborator: no output parsing beyond a
//! small set of error sentinels.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use binstage_schema::RepoSpec;
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the external resolver binary searched on `PATH`.
pub const SOAR_BIN: &str = "soar";

/// Substrings in soar output that mark an index lookup as failed even when
/// the exit status reads success.
pub const ERROR_SENTINELS: &[&str] = &["[ERROR]", "Invalid download resource"];

/// Error raised when the external tool cannot be located.
#[derive(Debug, Error)]
pub enum SoarError {
    /// `soar` is not discoverable on `PATH`.
    #[error("the 'soar' CLI (with 'dl' subcommand) is required but not found in PATH. Please install it.")]
    NotFound(#[source] which::Error),
}

/// Handle to a located `soar` executable.
#[derive(Debug, Clone)]
pub struct Soar {
    bin: PathBuf,
}

impl Soar {
    /// Find `soar` on `PATH`.
    ///
    /// # Errors
    ///
    /// Fails when the tool is absent -- callers surface this before any
    /// network activity happens.
    pub fn locate() -> Result<Self, SoarError> {
        let bin = which::which(SOAR_BIN).map_err(SoarError::NotFound)?;
        debug!("using soar at {}", bin.display());
        Ok(Self { bin })
    }

    /// Wrap an explicit executable path (tests and overrides).
    pub fn at(bin: PathBuf) -> Self {
        Self { bin }
    }

    /// Path of the wrapped executable.
    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Download from a GitHub repository, selecting release assets by
    /// filename regex and extracting into `extract_dir`.
    ///
    /// Runs `soar dl -y --regex <pattern> --github <owner/repo> --extract
    /// --extract-dir <extract_dir> -o <download_dir>`. The `-y` keeps the
    /// tool non-interactive.
    ///
    /// # Errors
    ///
    /// Returns the spawn/wait error; a non-zero exit from soar itself is
    /// *not* an error here -- callers judge success from the filesystem.
    pub fn fetch_github(
        &self,
        repo: &RepoSpec,
        pattern: &str,
        download_dir: &Path,
        extract_dir: &Path,
    ) -> io::Result<Output> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("dl")
            .arg("-y")
            .arg("--regex")
            .arg(pattern)
            .arg("--github")
            .arg(repo.to_string())
            .arg("--extract")
            .arg("--extract-dir")
            .arg(extract_dir)
            .arg("-o")
            .arg(download_dir);
        debug!("running {cmd:?}");
        cmd.output()
    }

    /// Look `owner/repo` up in soar's own curated package index.
    ///
    /// Runs `soar dl <owner/repo> -y` with the child's working directory
    /// set to `workdir`: soar drops index downloads into its cwd, and the
    /// parent process's cwd must never be mutated for this.
    ///
    /// # Errors
    ///
    /// Returns the spawn/wait error. Judge the lookup itself with
    /// [`index_lookup_succeeded`].
    pub fn fetch_index(&self, repo: &RepoSpec, workdir: &Path) -> io::Result<Output> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("dl")
            .arg(repo.to_string())
            .arg("-y")
            .current_dir(workdir);
        debug!("running {cmd:?}");
        cmd.output()
    }
}

/// Forward a finished child's streams to this process's stderr.
///
/// Operators watching a build want soar's own progress text; stdout stays
/// reserved for binstage's report surface.
pub fn forward_output(output: &Output) {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    let forwarded = handle
        .write_all(&output.stdout)
        .and_then(|()| handle.write_all(&output.stderr));
    if let Err(e) = forwarded {
        warn!("could not forward soar output: {e}");
    }
}

/// Whether a finished index lookup actually succeeded.
///
/// soar has been observed exiting 0 after printing `[ERROR]` lines, so the
/// combined output text is checked alongside the exit status.
pub fn index_lookup_succeeded(output: &Output) -> bool {
    if !output.status.success() {
        return false;
    }
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    !ERROR_SENTINELS.iter().any(|s| combined.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(raw_status: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(raw_status),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_index_success_requires_clean_exit() {
        assert!(index_lookup_succeeded(&output(0, "downloaded\n", "")));
        // Raw wait status 256 == exited with code 1.
        assert!(!index_lookup_succeeded(&output(256, "", "")));
    }

    #[test]
    fn test_index_sentinels_override_exit_code() {
        assert!(!index_lookup_succeeded(&output(
            0,
            "[ERROR] package not found\n",
            ""
        )));
        assert!(!index_lookup_succeeded(&output(
            0,
            "",
            "soar: Invalid download resource\n"
        )));
    }
}
