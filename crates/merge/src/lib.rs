//! Binary merge engine.
//!
//! Reconciles the client and server variants of the same compiled
//! program into one artifact tree:
//!
//! - `ordered`: order-preserving merge of two keyed sequences.
//! - `artifact`: structural model of a compiled type plus the codec seam.
//! - `class`: member-by-member merge of two type artifacts.
//! - `archive`: entry-stream archives (read/write, gzip or plain).
//! - `merger`: whole-archive merge with per-entry policy.

pub mod archive;
pub mod artifact;
pub mod class;
pub mod merger;
pub mod ordered;

use std::path::PathBuf;

pub use archive::{Archive, ArchiveEntry};
pub use artifact::{Annotation, ArtifactCodec, FlatCodec, TypeArtifact};
pub use class::ClassMerger;
pub use merger::{ArchiveMergePolicy, ArchiveMerger, MergeStats, ResourcePolicy};

/// Which variant of the program a side-exclusive member came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    /// Marker value stored in the side annotation.
    pub fn marker(self) -> &'static str {
        match self {
            Side::Client => "CLIENT",
            Side::Server => "SERVER",
        }
    }
}

/// Errors produced by the merge engine. All are fatal; no retries.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Malformed binary artifact or archive entry.
    #[error("malformed artifact: {0}")]
    Decode(String),

    /// Required input path absent, checked before any decode.
    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    /// Non-type entry differs between variants and the resource policy
    /// forbids picking a side.
    #[error("divergent resource entry: {0}")]
    DivergentResource(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
