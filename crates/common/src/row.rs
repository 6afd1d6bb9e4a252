//! Tab-separated row codec for symbol references.
//!
//! Row shapes:
//! ```text
//! CLASS  <name> [extra...]
//! FIELD  <owner> <descriptor> <name> [extra...]
//! METHOD <owner> <descriptor> <name> [extra...]
//! ```
//! Shared by the tabular mapping dialect and the stabilizer's
//! intermediary file, which both append trailing columns.

use crate::symbol::{ClassRef, FieldRef, MethodRef, SymbolRef};

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("unknown row kind {kind:?} in line {line:?}")]
    UnknownKind { kind: String, line: String },
    #[error("row has too few columns: {0:?}")]
    TooShort(String),
}

/// Encodes a symbol ref plus trailing columns as one tab-joined line
/// (without the newline).
pub fn encode_row(sym: &SymbolRef, extra: &[&str]) -> String {
    let mut cols: Vec<&str> = Vec::with_capacity(4 + extra.len());
    match sym {
        SymbolRef::Class(c) => {
            cols.push("CLASS");
            cols.push(c.name());
        }
        SymbolRef::Field(f) => {
            cols.push("FIELD");
            cols.push(f.owner.name());
            cols.push(&f.descriptor);
            cols.push(&f.name);
        }
        SymbolRef::Method(m) => {
            cols.push("METHOD");
            cols.push(m.owner.name());
            cols.push(&m.descriptor);
            cols.push(&m.name);
        }
    }
    cols.extend_from_slice(extra);
    cols.join("\t")
}

/// Decodes one line into a symbol ref and its trailing columns.
pub fn decode_row(line: &str) -> Result<(SymbolRef, Vec<String>), RowError> {
    let cols: Vec<&str> = line.split('\t').collect();
    let (sym, consumed) = match cols[0] {
        "CLASS" if cols.len() >= 2 => (SymbolRef::Class(ClassRef::new(cols[1])), 2),
        "FIELD" if cols.len() >= 4 => (
            SymbolRef::Field(FieldRef {
                owner: ClassRef::new(cols[1]),
                descriptor: cols[2].to_string(),
                name: cols[3].to_string(),
            }),
            4,
        ),
        "METHOD" if cols.len() >= 4 => (
            SymbolRef::Method(MethodRef {
                owner: ClassRef::new(cols[1]),
                descriptor: cols[2].to_string(),
                name: cols[3].to_string(),
            }),
            4,
        ),
        "CLASS" | "FIELD" | "METHOD" => return Err(RowError::TooShort(line.to_string())),
        other => {
            return Err(RowError::UnknownKind {
                kind: other.to_string(),
                line: line.to_string(),
            })
        }
    };
    Ok((sym, cols[consumed..].iter().map(|s| s.to_string()).collect()))
}
