//! Mapping trees and the algebra over them.
//!
//! A `MappingTree` is a hierarchical store of per-symbol rename records.
//! `algebra` composes and inverts trees, `translate` remaps descriptors
//! through a tree's class renames, and `dialect` is the read/write seam
//! for the on-disk mapping formats.

pub mod algebra;
pub mod dialect;
pub mod directory;
pub mod tabular;
pub mod translate;
pub mod tree;

use std::path::PathBuf;

pub use algebra::{compose, invert};
pub use dialect::{delete_output, read_tree, write_tree, MappingDialect};
pub use translate::Translator;
pub use tree::{MappingRecord, MappingTree};

/// Errors of the mapping side. All fatal, surfaced synchronously.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// Undecodable mapping text in a declared dialect.
    #[error("parse error in {path}, line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Dialect tag with no registered reader/writer. Reported before any
    /// work begins.
    #[error("unsupported mapping dialect {0:?}")]
    UnsupportedDialect(String),

    /// Required path absent, checked before decode.
    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    /// Post-operation consistency check failed.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("descriptor error: {0}")]
    Descriptor(#[from] common::DescriptorError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
