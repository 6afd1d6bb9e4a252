//! Shared symbol model for the seamster workspace.
//!
//! Everything here is plain data consumed by the merge, mappings and
//! stabilize crates: structural symbol references, type descriptors,
//! member access flags and the tab-separated row codec used by the
//! tabular dialect and the intermediary file.

pub mod descriptor;
pub mod flags;
pub mod row;
pub mod symbol;

pub use descriptor::{DescriptorError, FieldDescriptor, MethodDescriptor};
pub use flags::AccessFlags;
pub use row::{decode_row, encode_row, RowError};
pub use symbol::{ClassRef, FieldRef, MethodRef, SymbolKind, SymbolRef};
