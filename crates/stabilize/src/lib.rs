//! Stable-name allocation across releases.
//!
//! Every symbol of a release gets an opaque stable identifier
//! (`class_7`, `field_19`, `method_4`); identifiers carry over between
//! releases through deobfuscated-name matching and never regress.
//!
//! - `index`: queryable symbol table of one release.
//! - `ancestry`: ancestor closure and override detection.
//! - `stabilizer`: the allocator and its intermediary file format.

pub mod ancestry;
pub mod index;
pub mod stabilizer;

use std::path::PathBuf;

pub use ancestry::{retain_method_roots, AncestorClosure};
pub use index::{ArchiveIndex, SymbolIndex};
pub use stabilizer::Stabilizer;

#[derive(Debug, thiserror::Error)]
pub enum StabilizeError {
    /// Malformed intermediary file.
    #[error("malformed intermediary file {path}, line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    #[error(transparent)]
    Mapping(#[from] mappings::MappingError),

    #[error(transparent)]
    Merge(#[from] merge::MergeError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
