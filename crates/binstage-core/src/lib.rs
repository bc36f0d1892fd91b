//! Core library for binstage.
//!
//! Implements the three-tier release-asset fallback chain over the external
//! `soar` CLI, structural file classification and permission normalization
//! for extracted files, package manifest parsing, and the sequential batch
//! engine that drives one `binstage-fetch` child per package.

pub mod batch;
pub mod manifest;
pub mod resolver;
pub mod soar;
pub mod stage;

pub use batch::{BatchError, BatchOptions, BatchReport};
pub use manifest::ManifestError;
pub use resolver::{FetchError, FetchReport, Resolver, Tier};
pub use soar::Soar;
pub use stage::StageSummary;
