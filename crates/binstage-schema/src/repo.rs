//! Validated GitHub `owner/repo` identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when an `owner/repo` identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoSpecError {
    /// The identifier does not contain exactly one `/`.
    #[error("invalid repository '{0}': expected owner/repo with exactly one '/'")]
    MalformedSlug(String),
    /// The owner or the repository half is empty.
    #[error("invalid repository '{0}': owner and repo must both be non-empty")]
    EmptyComponent(String),
}

/// A validated GitHub repository identifier.
///
/// Parsing is the only way to construct one, so a held value is always
/// well-formed: exactly one `/`, both halves non-empty. This check runs
/// before any subprocess is spawned or network activity happens.
///
/// # Example
///
/// ```
/// use binstage_schema::RepoSpec;
///
/// let repo: RepoSpec = "sharkdp/fd".parse().unwrap();
/// assert_eq!(repo.owner(), "sharkdp");
/// assert_eq!(repo.name(), "fd");
/// assert_eq!(repo.to_string(), "sharkdp/fd");
/// assert!("not-a-repo".parse::<RepoSpec>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    owner: String,
    name: String,
}

impl RepoSpec {
    /// Repository owner (the half before `/`).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name (the half after `/`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem-safe form with `/` flattened to `_`.
    ///
    /// Used to name per-package staging directories, e.g. `sharkdp/fd`
    /// stages under `fetch_sharkdp_fd`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSpec {
    type Err = RepoSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RepoSpecError::MalformedSlug(s.to_string()));
        };
        if owner.is_empty() || name.is_empty() {
            return Err(RepoSpecError::EmptyComponent(s.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slug() {
        let repo: RepoSpec = "Gaurav-Gosain/tuios".parse().unwrap();
        assert_eq!(repo.owner(), "Gaurav-Gosain");
        assert_eq!(repo.name(), "tuios");
        assert_eq!(repo.to_string(), "Gaurav-Gosain/tuios");
        assert_eq!(repo.dir_name(), "Gaurav-Gosain_tuios");
    }

    #[test]
    fn test_missing_slash_rejected() {
        assert_eq!(
            "ripgrep".parse::<RepoSpec>(),
            Err(RepoSpecError::MalformedSlug("ripgrep".to_string()))
        );
    }

    #[test]
    fn test_extra_slash_rejected() {
        assert_eq!(
            "a/b/c".parse::<RepoSpec>(),
            Err(RepoSpecError::MalformedSlug("a/b/c".to_string()))
        );
    }

    #[test]
    fn test_empty_components_rejected() {
        for bad in ["/fd", "sharkdp/", "/"] {
            assert_eq!(
                bad.parse::<RepoSpec>(),
                Err(RepoSpecError::EmptyComponent(bad.to_string())),
                "{bad}"
            );
        }
    }
}
