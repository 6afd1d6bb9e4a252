//! Hierarchical store of per-symbol rename records.

use std::collections::{BTreeSet, HashMap};

use common::SymbolRef;

/// Rename record for one symbol. `target: None` marks a symbol that is
/// present in the tree without a rename; that is not the same as the
/// symbol being absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingRecord {
    pub target: Option<String>,
}

impl MappingRecord {
    pub fn renamed(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
        }
    }

    pub fn unnamed() -> Self {
        Self { target: None }
    }
}

/// SymbolRef -> MappingRecord store. Inserting a symbol materializes any
/// missing ancestors with empty records, so traversal can always hand a
/// node its parent first. Instances are treated as immutable once built;
/// every transform produces a new tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTree {
    records: HashMap<SymbolRef, MappingRecord>,
    children: HashMap<SymbolRef, BTreeSet<SymbolRef>>,
    roots: BTreeSet<SymbolRef>,
}

impl MappingTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) the record of `sym`.
    pub fn insert(&mut self, sym: SymbolRef, record: MappingRecord) {
        self.link(&sym);
        self.records.insert(sym, record);
    }

    fn link(&mut self, sym: &SymbolRef) {
        if self.records.contains_key(sym) {
            return;
        }
        match sym.owner() {
            Some(owner) => {
                if !self.records.contains_key(&owner) {
                    self.link(&owner);
                    self.records.insert(owner.clone(), MappingRecord::unnamed());
                }
                self.children.entry(owner).or_default().insert(sym.clone());
            }
            None => {
                self.roots.insert(sym.clone());
            }
        }
    }

    pub fn get(&self, sym: &SymbolRef) -> Option<&MappingRecord> {
        self.records.get(sym)
    }

    /// Rename target of `sym`, if the tree has one.
    pub fn target_of(&self, sym: &SymbolRef) -> Option<&str> {
        self.records.get(sym)?.target.as_deref()
    }

    pub fn contains(&self, sym: &SymbolRef) -> bool {
        self.records.contains_key(sym)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn children_of(&self, sym: &SymbolRef) -> impl Iterator<Item = &SymbolRef> {
        self.children.get(sym).into_iter().flatten()
    }

    /// Depth-first traversal, parents strictly before children, siblings
    /// in sorted order. Deterministic for a given tree.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            tree: self,
            stack: self.roots.iter().rev().collect(),
        }
    }
}

pub struct Nodes<'t> {
    tree: &'t MappingTree,
    stack: Vec<&'t SymbolRef>,
}

impl<'t> Iterator for Nodes<'t> {
    type Item = (&'t SymbolRef, &'t MappingRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let sym = self.stack.pop()?;
        if let Some(kids) = self.tree.children.get(sym) {
            self.stack.extend(kids.iter().rev());
        }
        let record = &self.tree.records[sym];
        Some((sym, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ClassRef, FieldRef, MethodRef};

    fn class(name: &str) -> SymbolRef {
        SymbolRef::Class(ClassRef::new(name))
    }

    fn field(owner: &str, name: &str, desc: &str) -> SymbolRef {
        SymbolRef::Field(FieldRef {
            owner: ClassRef::new(owner),
            name: name.into(),
            descriptor: desc.into(),
        })
    }

    fn method(owner: &str, name: &str, desc: &str) -> SymbolRef {
        SymbolRef::Method(MethodRef {
            owner: ClassRef::new(owner),
            name: name.into(),
            descriptor: desc.into(),
        })
    }

    #[test]
    fn test_insert_materializes_ancestors() {
        let mut tree = MappingTree::new();
        tree.insert(field("a/Foo$Bar", "x", "I"), MappingRecord::renamed("count"));

        assert!(tree.contains(&class("a/Foo$Bar")));
        assert!(tree.contains(&class("a/Foo")));
        assert_eq!(tree.get(&class("a/Foo")).unwrap().target, None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_parent_before_child_order() {
        let mut tree = MappingTree::new();
        tree.insert(method("b", "m", "()V"), MappingRecord::renamed("run"));
        tree.insert(class("a$i"), MappingRecord::renamed("Inner"));
        tree.insert(field("a", "f", "I"), MappingRecord::unnamed());

        let order: Vec<SymbolRef> = tree.nodes().map(|(s, _)| s.clone()).collect();
        let pos = |sym: &SymbolRef| order.iter().position(|s| s == sym).unwrap();
        for (sym, _) in tree.nodes() {
            if let Some(owner) = sym.owner() {
                assert!(pos(&owner) < pos(sym), "{owner} after {sym}");
            }
        }
        assert_eq!(order.len(), tree.len());
    }

    #[test]
    fn test_absent_vs_unnamed() {
        let mut tree = MappingTree::new();
        tree.insert(class("a"), MappingRecord::unnamed());
        assert!(tree.get(&class("a")).is_some());
        assert_eq!(tree.target_of(&class("a")), None);
        assert!(tree.get(&class("b")).is_none());
    }

    #[test]
    fn test_insert_replaces_record() {
        let mut tree = MappingTree::new();
        tree.insert(class("a"), MappingRecord::unnamed());
        tree.insert(class("a"), MappingRecord::renamed("Foo"));
        assert_eq!(tree.target_of(&class("a")), Some("Foo"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_deterministic_traversal() {
        let mut tree = MappingTree::new();
        for name in ["c", "a", "b"] {
            tree.insert(class(name), MappingRecord::unnamed());
        }
        let order: Vec<String> = tree.nodes().map(|(s, _)| s.name().to_string()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
