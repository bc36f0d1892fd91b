//! Ordered fallback chain for locating one repository's release asset.
//!
//! Three tiers, tried in fixed priority order, stopping at the first
//! success:
//!
//! 1. **github-musl** -- GitHub release assets filtered by the musl-static
//!    pattern list for the target architecture;
//! 2. **soar-index** -- soar's own curated package index, for packages that
//!    are not GitHub-hosted releases;
//! 3. **github-generic** -- the GitHub query again with the libc constraint
//!    dropped (any Linux build).
//!
//! GitHub tiers judge success from the filesystem (at least one regular
//! file extracted), never from soar's exit code; the index tier judges by
//! exit status plus output sentinels. A tier that yields nothing simply
//! advances the chain; only exhausting all three is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use binstage_schema::{Arch, LibcPolicy, RepoSpec, asset_patterns};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::soar::{self, Soar, SoarError};
use crate::stage::{self, StageSummary};

/// One stage of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// GitHub release assets, musl-static pattern list.
    GithubMusl,
    /// soar's own curated package index.
    SoarIndex,
    /// GitHub release assets, any-Linux pattern list.
    GithubGeneric,
}

impl Tier {
    /// All tiers in resolution order, most preferred first.
    pub const CHAIN: [Tier; 3] = [Tier::GithubMusl, Tier::SoarIndex, Tier::GithubGeneric];

    /// Label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GithubMusl => "github-musl",
            Self::SoarIndex => "soar-index",
            Self::GithubGeneric => "github-generic",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fatal resolution errors.
///
/// Soft per-tier problems never show up here: a tier that yields nothing
/// advances the chain instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The external tool is missing from `PATH`.
    #[error(transparent)]
    Soar(#[from] SoarError),
    /// The destination directory could not be created.
    #[error("failed to create dest dir: {path} ({source})")]
    DestDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },
    /// A temporary staging directory could not be created.
    #[error("failed to create staging dir: {0}")]
    Staging(#[source] io::Error),
    /// Every tier was tried and none produced a usable asset.
    #[error("all download attempts failed for {0}")]
    AllAttemptsFailed(RepoSpec),
}

/// Outcome of a successful resolution.
#[derive(Debug)]
pub struct FetchReport {
    /// The tier that produced the files.
    pub tier: Tier,
    /// Staged-file counters and soft warnings.
    pub summary: StageSummary,
}

/// Drives the fallback chain for one repository at a time.
#[derive(Debug)]
pub struct Resolver {
    soar: Soar,
    arch: Arch,
}

impl Resolver {
    /// Locate `soar` on `PATH` and build a resolver for `arch`.
    ///
    /// # Errors
    ///
    /// Fails before any network activity when the tool is absent.
    pub fn new(arch: Arch) -> Result<Self, FetchError> {
        Ok(Self {
            soar: Soar::locate()?,
            arch,
        })
    }

    /// Build a resolver around an already-located tool.
    pub fn with_soar(soar: Soar, arch: Arch) -> Self {
        Self { soar, arch }
    }

    /// Resolve one repository into `dest`, trying each tier in order.
    ///
    /// `dest` is created first (parents included). On success the report
    /// names the winning tier and how many files were staged.
    ///
    /// # Errors
    ///
    /// [`FetchError::DestDir`] / [`FetchError::Staging`] for uncreatable
    /// directories, [`FetchError::AllAttemptsFailed`] when the whole chain
    /// comes up empty.
    pub fn resolve(&self, repo: &RepoSpec, dest: &Path) -> Result<FetchReport, FetchError> {
        fs::create_dir_all(dest).map_err(|source| FetchError::DestDir {
            path: dest.to_path_buf(),
            source,
        })?;

        let arch = self.arch;
        for tier in Tier::CHAIN {
            info!("trying {tier} for {repo} (arch: {arch})");
            if let Some(summary) = self.attempt(tier, repo, dest)? {
                let staged = summary.installed;
                info!("{tier} succeeded for {repo}: {staged} file(s) staged");
                return Ok(FetchReport { tier, summary });
            }
        }
        Err(FetchError::AllAttemptsFailed(repo.clone()))
    }

    /// Run one tier. `Ok(None)` means the tier yielded nothing.
    fn attempt(
        &self,
        tier: Tier,
        repo: &RepoSpec,
        dest: &Path,
    ) -> Result<Option<StageSummary>, FetchError> {
        match tier {
            Tier::GithubMusl => self.attempt_github(repo, LibcPolicy::MuslOnly, dest),
            Tier::SoarIndex => self.attempt_index(repo, dest),
            Tier::GithubGeneric => self.attempt_github(repo, LibcPolicy::AnyLinux, dest),
        }
    }

    /// GitHub-scoped query, one fresh staging directory per pattern so a
    /// failed attempt can never contaminate a later success check.
    fn attempt_github(
        &self,
        repo: &RepoSpec,
        policy: LibcPolicy,
        dest: &Path,
    ) -> Result<Option<StageSummary>, FetchError> {
        let patterns = asset_patterns(self.arch, policy);
        for (i, pattern) in patterns.iter().enumerate() {
            debug!("attempt {}/{} with regex: {pattern}", i + 1, patterns.len());

            let staging = tempfile::Builder::new()
                .prefix("binstage-")
                .tempdir()
                .map_err(FetchError::Staging)?;
            let download_dir = staging.path().join("download");
            let extract_dir = staging.path().join("extract");
            fs::create_dir_all(&download_dir).map_err(FetchError::Staging)?;
            fs::create_dir_all(&extract_dir).map_err(FetchError::Staging)?;

            let output = match self.soar.fetch_github(repo, pattern, &download_dir, &extract_dir) {
                Ok(output) => output,
                Err(e) => {
                    warn!("soar invocation failed for {repo}: {e}");
                    continue;
                }
            };
            soar::forward_output(&output);

            // Filesystem truth: soar may exit 0 having produced nothing, or
            // non-zero with usable output. Only the extract dir decides.
            if has_regular_files(&extract_dir) {
                return Ok(Some(stage::install_tree(&extract_dir, dest)));
            }
            debug!("no files extracted for {repo}");
        }
        Ok(None)
    }

    /// Index lookup. soar extracts straight into `dest` (as its cwd), so
    /// new files are found by a before/after snapshot and normalized in
    /// place.
    fn attempt_index(&self, repo: &RepoSpec, dest: &Path) -> Result<Option<StageSummary>, FetchError> {
        let before = stage::snapshot(dest);
        let output = match self.soar.fetch_index(repo, dest) {
            Ok(output) => output,
            Err(e) => {
                warn!("soar invocation failed for {repo}: {e}");
                return Ok(None);
            }
        };
        soar::forward_output(&output);

        if !soar::index_lookup_succeeded(&output) {
            debug!("index lookup failed for {repo}");
            return Ok(None);
        }
        Ok(Some(stage::normalize_new_files(dest, &before)))
    }
}

fn has_regular_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .any(|e| e.file_type().is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    /// Write a fake `soar` whose behavior is keyed off its arguments, and
    /// return its path.
    fn fake_soar(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("soar");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Shell prelude that extracts the `--extract-dir` value and the
    /// `--github` repo from a GitHub-shaped invocation.
    const PARSE_GITHUB_ARGS: &str = r#"
extract=""
repo=""
prev=""
for a in "$@"; do
  case "$prev" in
    --extract-dir) extract="$a" ;;
    --github) repo="$a" ;;
  esac
  prev="$a"
done
"#;

    #[test]
    fn test_tier1_success_stops_chain() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("out");
        // Succeeds on the first pattern: drop an ELF into the extract dir.
        let body = format!(
            "{PARSE_GITHUB_ARGS}\nprintf '\\177ELF' > \"$extract/tool\"\nexit 0"
        );
        let soar = Soar::at(fake_soar(tmp.path(), &body));
        let resolver = Resolver::with_soar(soar, Arch::X86_64);

        let report = resolver.resolve(&"ok/repo".parse().unwrap(), &dest).unwrap();
        assert_eq!(report.tier, Tier::GithubMusl);
        assert_eq!(report.summary.installed, 1);
        let tool = dest.join("tool");
        assert!(tool.is_file());
        let mode = fs::metadata(&tool).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_empty_extraction_falls_through_to_index() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("out");
        // GitHub invocations exit 0 but extract nothing; the index lookup
        // (no --github flag) creates a script in its cwd and succeeds.
        let body = format!(
            r#"{PARSE_GITHUB_ARGS}
if [ -n "$repo" ]; then
  exit 0
fi
printf '#!/bin/sh\necho hi\n' > idxtool
exit 0"#
        );
        let soar = Soar::at(fake_soar(tmp.path(), &body));
        let resolver = Resolver::with_soar(soar, Arch::X86_64);

        let report = resolver.resolve(&"indexed/pkg".parse().unwrap(), &dest).unwrap();
        assert_eq!(report.tier, Tier::SoarIndex);
        assert_eq!(report.summary.installed, 1);
        let tool = dest.join("idxtool");
        assert!(tool.is_file());
        let mode = fs::metadata(&tool).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_index_sentinel_falls_through_to_generic() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("out");
        // Musl patterns yield nothing; the index exits 0 but prints an
        // error sentinel; the generic tier finally extracts a file.
        let body = format!(
            r#"{PARSE_GITHUB_ARGS}
if [ -z "$repo" ]; then
  echo '[ERROR] Invalid download resource'
  exit 0
fi
case "$4" in
  *musl*) exit 0 ;;
esac
printf '\177ELF' > "$extract/gnutool"
exit 0"#
        );
        let soar = Soar::at(fake_soar(tmp.path(), &body));
        let resolver = Resolver::with_soar(soar, Arch::X86_64);

        let report = resolver.resolve(&"gnu/only".parse().unwrap(), &dest).unwrap();
        assert_eq!(report.tier, Tier::GithubGeneric);
        assert!(dest.join("gnutool").is_file());
    }

    #[test]
    fn test_all_tiers_exhausted_is_an_error() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("out");
        let body = "exit 1";
        let soar = Soar::at(fake_soar(tmp.path(), body));
        let resolver = Resolver::with_soar(soar, Arch::Arm64);

        let err = resolver.resolve(&"bad/repo".parse().unwrap(), &dest).unwrap_err();
        assert!(matches!(err, FetchError::AllAttemptsFailed(_)));
        // The destination was still created, but stays empty.
        assert!(dest.is_dir());
        assert!(!has_regular_files(&dest));
    }
}
