//! File classification, permission normalization, and no-overwrite staging.
//!
//! Everything here follows two rules shared by both binaries:
//!
//! 1. a file whose opening bytes are the ELF magic or `#!` gets
//!    `u+x,g+x,o+x` added (existing bits preserved, never cleared);
//! 2. the destination is append-only -- a pre-existing file with the same
//!    base name always wins and the incoming file is skipped.
//!
//! Per-file problems (unreadable file, chmod failure, copy failure) are
//! soft: logged as warnings and folded into the [`StageSummary`], never
//! aborting an otherwise-successful operation.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use binstage_schema::FileKind;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Executable bits added during normalization (`u+x,g+x,o+x`).
const EXEC_BITS: u32 = 0o111;

/// Counters and soft warnings accumulated while staging files.
#[derive(Debug, Default, Clone)]
pub struct StageSummary {
    /// Files copied (or normalized in place) into the destination.
    pub installed: usize,
    /// Incoming files skipped because the base name already existed.
    pub skipped: usize,
    /// Files classified `Unrecognized` and dropped during collection.
    pub ignored: usize,
    /// Soft failures that did not abort the operation.
    pub warnings: Vec<String>,
}

impl StageSummary {
    /// Fold another summary into this one.
    pub fn merge(&mut self, other: StageSummary) {
        self.installed += other.installed;
        self.skipped += other.skipped;
        self.ignored += other.ignored;
        self.warnings.extend(other.warnings);
    }
}

/// Classify a file by reading its opening bytes.
///
/// # Errors
///
/// Returns the open/read error; callers decide whether that is soft.
pub fn classify(path: &Path) -> io::Result<FileKind> {
    let mut prefix = Vec::with_capacity(4);
    fs::File::open(path)?.take(4).read_to_end(&mut prefix)?;
    Ok(FileKind::from_prefix(&prefix))
}

/// Add `u+x,g+x,o+x` to a file's permission bits.
///
/// Idempotent: bits already present are left alone and nothing is ever
/// cleared.
///
/// # Errors
///
/// Returns the metadata/chmod error; callers decide whether that is soft.
pub fn ensure_executable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    if mode & EXEC_BITS == EXEC_BITS {
        return Ok(());
    }
    perms.set_mode(mode | EXEC_BITS);
    fs::set_permissions(path, perms)
}

/// Normalize and install every regular file under `staging` into `dest`.
///
/// `Binary` and `Script` files get exec bits while still in staging (the
/// copy carries the mode along); all regular files are then copied flat by
/// base name into `dest`. First writer wins: a name already present in
/// `dest` is kept and the incoming file skipped.
pub fn install_tree(staging: &Path, dest: &Path) -> StageSummary {
    let mut summary = StageSummary::default();
    for entry in regular_files(staging) {
        let path = entry.path();
        normalize_exec_bits(path, &mut summary);

        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dest.join(name);
        if target.exists() {
            info!("skip existing {}", name.to_string_lossy());
            summary.skipped += 1;
            continue;
        }
        match fs::copy(path, &target) {
            Ok(_) => summary.installed += 1,
            Err(e) => soften(
                &mut summary,
                format!("failed to copy {} to {}: {e}", path.display(), target.display()),
            ),
        }
    }
    summary
}

/// Record the set of regular files currently under `dir`.
///
/// Paired with [`normalize_new_files`] by the index tier, which lets soar
/// extract straight into the destination.
pub fn snapshot(dir: &Path) -> HashSet<PathBuf> {
    regular_files(dir).map(walkdir::DirEntry::into_path).collect()
}

/// Normalize files that appeared under `dir` since `before` was taken.
///
/// Each new `Binary`/`Script` gets exec bits in place; the new-file count
/// doubles as the staged count.
pub fn normalize_new_files(dir: &Path, before: &HashSet<PathBuf>) -> StageSummary {
    let mut summary = StageSummary::default();
    for entry in regular_files(dir) {
        if before.contains(entry.path()) {
            continue;
        }
        normalize_exec_bits(entry.path(), &mut summary);
        summary.installed += 1;
    }
    summary
}

/// Copy classified executables from a staging tree into `bin_dir`.
///
/// `Binary` and `Script` files are copied flat by base name; collisions
/// with pre-existing files are skipped and logged; `Unrecognized` files
/// (readmes, licenses, completions) are dropped and logged as ignored.
pub fn collect_binaries(staging: &Path, bin_dir: &Path) -> StageSummary {
    let mut summary = StageSummary::default();
    for entry in regular_files(staging) {
        let path = entry.path();
        let Some(name) = path.file_name() else {
            continue;
        };
        let shown = name.to_string_lossy();

        let target = bin_dir.join(name);
        if target.exists() {
            info!("skip existing {shown}");
            summary.skipped += 1;
            continue;
        }

        let kind = match classify(path) {
            Ok(kind) => kind,
            Err(e) => {
                soften(&mut summary, format!("could not classify {}: {e}", path.display()));
                continue;
            }
        };
        if !kind.wants_exec_bits() {
            info!("ignored {shown}");
            summary.ignored += 1;
            continue;
        }
        match fs::copy(path, &target) {
            Ok(_) => {
                info!("copied {kind} {shown}");
                summary.installed += 1;
            }
            Err(e) => soften(
                &mut summary,
                format!("failed to copy {} to {}: {e}", path.display(), target.display()),
            ),
        }
    }
    summary
}

/// Apply the exec-bit rule to every file directly inside `dir`, regardless
/// of which step put it there.
pub fn normalize_dir(dir: &Path) -> StageSummary {
    let mut summary = StageSummary::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        normalize_exec_bits(entry.path(), &mut summary);
    }
    summary
}

/// Classify one file and add exec bits when it wants them.
///
/// All failure modes here are soft.
fn normalize_exec_bits(path: &Path, summary: &mut StageSummary) {
    match classify(path) {
        Ok(kind) if kind.wants_exec_bits() => {
            if let Err(e) = ensure_executable(path) {
                soften(summary, format!("failed to set executable permissions: {e}"));
            }
        }
        Ok(_) => {}
        Err(e) => soften(summary, format!("could not classify {}: {e}", path.display())),
    }
}

fn soften(summary: &mut StageSummary, msg: String) {
    warn!("{msg}");
    summary.warnings.push(msg);
}

fn regular_files(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
}
