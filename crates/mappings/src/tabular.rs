//! Tabular mapping dialect: newline records, tab-separated.
//!
//! First line is the column header `tabular\t<from>\t<to>`; every other
//! line is a symbol row with the target name as its trailing column:
//!
//! ```text
//! CLASS   <obfName>  <deobfName>
//! FIELD   <ownerClass> <descriptor> <obfName> <deobfName>
//! METHOD  <ownerClass> <descriptor> <obfName> <deobfName>
//! ```

use std::fs;
use std::path::Path;

use common::row::{decode_row, encode_row};

use crate::dialect::MappingDialect;
use crate::tree::{MappingRecord, MappingTree};
use crate::MappingError;

pub struct TabularDialect {
    from_column: String,
    to_column: String,
}

impl TabularDialect {
    pub fn new(from_column: impl Into<String>, to_column: impl Into<String>) -> Self {
        Self {
            from_column: from_column.into(),
            to_column: to_column.into(),
        }
    }

    fn header(&self) -> String {
        format!("tabular\t{}\t{}", self.from_column, self.to_column)
    }
}

impl MappingDialect for TabularDialect {
    fn read(&self, path: &Path) -> Result<MappingTree, MappingError> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines().enumerate();

        let (_, header) = lines.next().ok_or_else(|| MappingError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: "empty mapping file".into(),
        })?;
        if header != self.header() {
            return Err(MappingError::Parse {
                path: path.to_path_buf(),
                line: 1,
                message: format!("expected header {:?}, found {header:?}", self.header()),
            });
        }

        let mut tree = MappingTree::new();
        for (idx, line) in lines {
            if line.is_empty() {
                continue;
            }
            let (sym, extra) = decode_row(line).map_err(|e| MappingError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                message: e.to_string(),
            })?;
            if extra.len() != 1 {
                return Err(MappingError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: format!("expected one target column, found {}", extra.len()),
                });
            }
            tree.insert(sym, MappingRecord::renamed(&extra[0]));
        }
        Ok(tree)
    }

    fn write(&self, tree: &MappingTree, path: &Path) -> Result<(), MappingError> {
        let mut out = String::new();
        out.push_str(&self.header());
        out.push('\n');
        for (sym, record) in tree.nodes() {
            // Unnamed nodes only carry structure; rows exist for renames.
            if let Some(target) = record.target.as_deref() {
                out.push_str(&encode_row(sym, &[target]));
                out.push('\n');
            }
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, out)?;
        Ok(())
    }
}
