//! Dialect registry: the read/write seam for on-disk mapping formats.
//!
//! Engines never touch format details; they ask the registry for a
//! dialect by tag. Unknown tags fail with `UnsupportedDialect` before
//! any file is opened.

use std::path::Path;

use crate::directory::DirectoryDialect;
use crate::tabular::TabularDialect;
use crate::tree::MappingTree;
use crate::MappingError;

/// Read/write contract every mapping format implements.
pub trait MappingDialect {
    fn read(&self, path: &Path) -> Result<MappingTree, MappingError>;
    fn write(&self, tree: &MappingTree, path: &Path) -> Result<(), MappingError>;
}

/// Resolves a dialect tag. `directory`, or `tabular:<from>:<to>`.
pub fn resolve(tag: &str) -> Result<Box<dyn MappingDialect>, MappingError> {
    if tag == "directory" {
        return Ok(Box::new(DirectoryDialect));
    }
    if let Some(columns) = tag.strip_prefix("tabular:") {
        let parts: Vec<&str> = columns.split(':').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(MappingError::UnsupportedDialect(format!(
                "{tag} (specify column names as tabular:<from>:<to>)"
            )));
        }
        return Ok(Box::new(TabularDialect::new(parts[0], parts[1])));
    }
    Err(MappingError::UnsupportedDialect(tag.to_string()))
}

/// Reads a tree, checking tag and path before any decode.
pub fn read_tree(tag: &str, path: &Path) -> Result<MappingTree, MappingError> {
    let dialect = resolve(tag)?;
    if !path.exists() {
        return Err(MappingError::MissingInput(path.to_path_buf()));
    }
    dialect.read(path)
}

/// Writes a tree in the given dialect.
pub fn write_tree(tree: &MappingTree, tag: &str, path: &Path) -> Result<(), MappingError> {
    resolve(tag)?.write(tree, path)
}

/// Removes a previous output file or directory, then verifies it is
/// actually gone. A path that survives deletion is an integrity failure,
/// not something to write through.
pub fn delete_output(path: &Path) -> Result<(), MappingError> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }
    if path.exists() {
        return Err(MappingError::Integrity(format!(
            "failed to delete {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_is_unsupported() {
        assert!(matches!(
            resolve("proguard"),
            Err(MappingError::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn test_tabular_tag_requires_two_columns() {
        assert!(resolve("tabular:official:named").is_ok());
        assert!(matches!(
            resolve("tabular:official"),
            Err(MappingError::UnsupportedDialect(_))
        ));
        assert!(matches!(
            resolve("tabular:a:b:c"),
            Err(MappingError::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn test_read_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tree("tabular:a:b", &dir.path().join("absent.tab")).unwrap_err();
        assert!(matches!(err, MappingError::MissingInput(_)));
    }

    #[test]
    fn test_unsupported_tag_reported_before_path_check() {
        // Even with a missing path, the tag failure comes first.
        let err = read_tree("nope", Path::new("/definitely/missing")).unwrap_err();
        assert!(matches!(err, MappingError::UnsupportedDialect(_)));
    }

    #[test]
    fn test_cross_dialect_conversion_preserves_tree() {
        use crate::tree::MappingRecord;
        use common::{ClassRef, FieldRef, SymbolRef};

        let mut tree = MappingTree::new();
        tree.insert(
            SymbolRef::Class(ClassRef::new("a/Foo")),
            MappingRecord::renamed("Widget"),
        );
        tree.insert(
            SymbolRef::Field(FieldRef {
                owner: ClassRef::new("a/Foo"),
                name: "x".into(),
                descriptor: "I".into(),
            }),
            MappingRecord::renamed("count"),
        );

        let dir = tempfile::tempdir().unwrap();
        let maps = dir.path().join("maps");
        write_tree(&tree, "directory", &maps).unwrap();
        let read = read_tree("directory", &maps).unwrap();

        let tab = dir.path().join("map.tab");
        write_tree(&read, "tabular:official:named", &tab).unwrap();
        assert_eq!(read_tree("tabular:official:named", &tab).unwrap(), tree);
    }

    #[test]
    fn test_delete_output_file_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.tab");
        std::fs::write(&file, "x").unwrap();
        delete_output(&file).unwrap();
        assert!(!file.exists());

        let sub = dir.path().join("outdir");
        std::fs::create_dir_all(sub.join("deep")).unwrap();
        std::fs::write(sub.join("deep/file.mapping"), "x").unwrap();
        delete_output(&sub).unwrap();
        assert!(!sub.exists());

        // Deleting a non-existent path is a no-op.
        delete_output(&file).unwrap();
    }
}
