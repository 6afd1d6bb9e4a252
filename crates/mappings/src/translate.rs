//! Descriptor translation through a tree's class renames.
//!
//! Descriptors repeat heavily across the members of a release, so both
//! directions memoize translated strings.

use std::cell::RefCell;
use std::collections::HashMap;

use common::{FieldDescriptor, MethodDescriptor, SymbolRef};

use crate::algebra::image_of;
use crate::tree::MappingTree;
use crate::MappingError;

/// Class-name and descriptor translator derived from one mapping tree.
pub struct Translator {
    classes: HashMap<String, String>,
    field_cache: RefCell<HashMap<String, String>>,
    method_cache: RefCell<HashMap<String, String>>,
}

impl Translator {
    /// Translates source names to their image names (e.g. obf -> deobf
    /// for an obf -> deobf tree).
    pub fn forward(tree: &MappingTree) -> Self {
        Self::from_map(class_image_map(tree))
    }

    /// Translates image names back to source names.
    pub fn inverse(tree: &MappingTree) -> Self {
        let map = class_image_map(tree)
            .into_iter()
            .map(|(from, to)| (to, from))
            .collect();
        Self::from_map(map)
    }

    fn from_map(classes: HashMap<String, String>) -> Self {
        Self {
            classes,
            field_cache: RefCell::new(HashMap::new()),
            method_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Translated class name, or `None` when the tree does not rename it.
    pub fn class_name(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    pub fn field_descriptor(&self, desc: &str) -> Result<String, MappingError> {
        if let Some(hit) = self.field_cache.borrow().get(desc) {
            return Ok(hit.clone());
        }
        let parsed = FieldDescriptor::parse(desc)?;
        let out = parsed
            .remap(&|name| self.classes.get(name).cloned())
            .as_str()
            .to_string();
        self.field_cache
            .borrow_mut()
            .insert(desc.to_string(), out.clone());
        Ok(out)
    }

    pub fn method_descriptor(&self, desc: &str) -> Result<String, MappingError> {
        if let Some(hit) = self.method_cache.borrow().get(desc) {
            return Ok(hit.clone());
        }
        let parsed = MethodDescriptor::parse(desc)?;
        let out = parsed
            .remap(&|name| self.classes.get(name).cloned())
            .as_str()
            .to_string();
        self.method_cache
            .borrow_mut()
            .insert(desc.to_string(), out.clone());
        Ok(out)
    }
}

/// Full source name -> full image name for every class node of the tree.
/// Nested classes inherit their parent's image even when unmapped.
pub fn class_image_map(tree: &MappingTree) -> HashMap<String, String> {
    let mut images: HashMap<SymbolRef, SymbolRef> = HashMap::new();
    let mut out = HashMap::new();
    for (sym, record) in tree.nodes() {
        let image = image_of(sym, record, &images);
        if let (SymbolRef::Class(from), SymbolRef::Class(to)) = (sym, &image) {
            if from.name() != to.name() {
                out.insert(from.name().to_string(), to.name().to_string());
            }
        }
        images.insert(sym.clone(), image);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MappingRecord;
    use common::ClassRef;

    fn tree() -> MappingTree {
        let mut t = MappingTree::new();
        t.insert(
            SymbolRef::Class(ClassRef::new("a")),
            MappingRecord::renamed("com/example/Widget"),
        );
        t.insert(
            SymbolRef::Class(ClassRef::new("a$b")),
            MappingRecord::renamed("Part"),
        );
        t.insert(SymbolRef::Class(ClassRef::new("c")), MappingRecord::unnamed());
        t
    }

    #[test]
    fn test_class_image_map_nested() {
        let map = class_image_map(&tree());
        assert_eq!(map.get("a").unwrap(), "com/example/Widget");
        assert_eq!(map.get("a$b").unwrap(), "com/example/Widget$Part");
        assert!(!map.contains_key("c"));
    }

    #[test]
    fn test_forward_descriptor_translation() {
        let tr = Translator::forward(&tree());
        assert_eq!(
            tr.field_descriptor("[La$b;").unwrap(),
            "[Lcom/example/Widget$Part;"
        );
        assert_eq!(
            tr.method_descriptor("(La;I)Lc;").unwrap(),
            "(Lcom/example/Widget;I)Lc;"
        );
    }

    #[test]
    fn test_inverse_descriptor_translation() {
        let tr = Translator::inverse(&tree());
        assert_eq!(
            tr.field_descriptor("Lcom/example/Widget;").unwrap(),
            "La;"
        );
        assert_eq!(tr.class_name("com/example/Widget$Part"), Some("a$b"));
    }

    #[test]
    fn test_memoized_result_is_stable() {
        let tr = Translator::forward(&tree());
        let first = tr.method_descriptor("(La;)V").unwrap();
        let second = tr.method_descriptor("(La;)V").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_descriptor_is_error() {
        let tr = Translator::forward(&tree());
        assert!(matches!(
            tr.field_descriptor("Qx"),
            Err(MappingError::Descriptor(_))
        ));
    }
}
