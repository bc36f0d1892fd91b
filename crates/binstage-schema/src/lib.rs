//! Shared vocabulary types for the binstage tools.
//!
//! Everything in this crate is plain data: architecture tags, `owner/repo`
//! identifiers, byte-prefix file classification, and the ordered asset
//! pattern tables handed to `soar --regex`. No I/O happens here.

pub mod arch;
pub mod asset_pattern;
pub mod file_kind;
pub mod repo;

// Re-exports
pub use arch::Arch;
pub use asset_pattern::{LibcPolicy, asset_patterns};
pub use file_kind::{ELF_MAGIC, FileKind, SHEBANG};
pub use repo::{RepoSpec, RepoSpecError};
