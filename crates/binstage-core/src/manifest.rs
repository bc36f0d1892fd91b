//! Package-list parsing with input-shape auto-detection.
//!
//! The batch CLI takes one positional argument that may be an inline
//! whitespace-separated list, a newline-delimited file, or a JSON document
//! (bare string array or an object with a `packages` array). Detection
//! order: existing file first, JSON sniffed by its leading character.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Error raised while resolving the packages argument.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path given on the command line.
        path: String,
        /// Underlying filesystem error.
        source: std::io::Error,
    },
    /// The document is not valid JSON at all.
    #[error("Failed to parse JSON in {path}: {source}")]
    Json {
        /// Path given on the command line.
        path: String,
        /// Parser error with position info.
        source: serde_json::Error,
    },
    /// Valid JSON, but neither a string array nor `{"packages": [...]}`.
    #[error("Invalid JSON format in {0}")]
    InvalidShape(String),
    /// No identifiers were left after trimming and dropping blanks.
    #[error("no packages specified")]
    Empty,
}

/// The two accepted JSON shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PackagesDoc {
    /// Bare array: `["a/b", "c/d"]`
    List(Vec<String>),
    /// Object: `{"packages": ["a/b", "c/d"]}`
    Object {
        packages: Vec<String>,
    },
}

/// Resolve the positional packages argument into a clean identifier list.
///
/// Every entry is trimmed and blank entries are dropped; identifiers are
/// *not* validated here -- a malformed `owner/repo` is a per-package
/// failure at fetch time, not a batch-fatal one.
///
/// # Errors
///
/// [`ManifestError::Empty`] when nothing is left, and the JSON variants
/// when a manifest file fails to parse or has neither accepted shape.
pub fn parse_packages(arg: &str) -> Result<Vec<String>, ManifestError> {
    let path = Path::new(arg);
    let entries: Vec<String> = if path.is_file() {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: arg.to_string(),
            source,
        })?;
        let sniff = content.trim_start();
        if sniff.starts_with('{') || sniff.starts_with('[') {
            parse_json(arg, &content)?
        } else {
            content.lines().map(str::to_string).collect()
        }
    } else {
        arg.split_whitespace().map(str::to_string).collect()
    };

    let packages: Vec<String> = entries
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if packages.is_empty() {
        return Err(ManifestError::Empty);
    }
    Ok(packages)
}

fn parse_json(origin: &str, content: &str) -> Result<Vec<String>, ManifestError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|source| ManifestError::Json {
            path: origin.to_string(),
            source,
        })?;
    match serde_json::from_value::<PackagesDoc>(value) {
        Ok(PackagesDoc::List(list) | PackagesDoc::Object { packages: list }) => Ok(list),
        Err(_) => Err(ManifestError::InvalidShape(origin.to_string())),
    }
}
