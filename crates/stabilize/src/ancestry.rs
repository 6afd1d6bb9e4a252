//! Ancestor closure and override-root detection.
//!
//! A method only deserves its own stable name when it is the root of its
//! override chain: private and static methods always are, and so is any
//! method no ancestor class also declares. The closure walk is iterative
//! with a visited set, so inheritance cycles in hostile input terminate.

use std::collections::{HashMap, HashSet, VecDeque};

use common::{ClassRef, MethodRef, SymbolRef};
use mappings::MappingTree;

use crate::index::SymbolIndex;

/// Memoized transitive ancestors (superclasses and interfaces) per class.
#[derive(Default)]
pub struct AncestorClosure {
    cache: HashMap<ClassRef, Vec<ClassRef>>,
}

impl AncestorClosure {
    pub fn new() -> Self {
        Self::default()
    }

    /// All transitive ancestors of `class` known to the index. The class
    /// itself is not included, even when a cycle reaches back to it.
    pub fn ancestors(&mut self, index: &dyn SymbolIndex, class: &ClassRef) -> &[ClassRef] {
        if !self.cache.contains_key(class) {
            let computed = compute_ancestors(index, class);
            self.cache.insert(class.clone(), computed);
        }
        &self.cache[class]
    }

    /// Whether `method` introduces its own name rather than overriding
    /// an ancestor's.
    pub fn is_method_root(&mut self, index: &dyn SymbolIndex, method: &MethodRef) -> bool {
        let Some(flags) = index.method_flags(method) else {
            return true;
        };
        if flags.is_private() || flags.is_static() {
            return true;
        }
        for ancestor in self.ancestors(index, &method.owner) {
            let inherited = MethodRef {
                owner: ancestor.clone(),
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
            };
            if index.contains_method(&inherited) {
                return false;
            }
        }
        true
    }
}

/// Copy of `tree` without override methods: a method node survives only
/// when it is the root of its override chain in `index`. Class and field
/// nodes pass through unchanged.
pub fn retain_method_roots(index: &dyn SymbolIndex, tree: &MappingTree) -> MappingTree {
    let mut closure = AncestorClosure::new();
    let mut out = MappingTree::new();
    for (sym, record) in tree.nodes() {
        if let SymbolRef::Method(method) = sym {
            if !closure.is_method_root(index, method) {
                continue;
            }
        }
        out.insert(sym.clone(), record.clone());
    }
    out
}

fn compute_ancestors(index: &dyn SymbolIndex, class: &ClassRef) -> Vec<ClassRef> {
    let mut visited: HashSet<ClassRef> = HashSet::new();
    visited.insert(class.clone());
    let mut out = Vec::new();
    let mut work: VecDeque<ClassRef> = VecDeque::new();
    work.push_back(class.clone());

    while let Some(current) = work.pop_front() {
        for parent in index
            .interfaces(&current)
            .into_iter()
            .chain(index.superclass(&current))
        {
            if visited.insert(parent.clone()) {
                out.push(parent.clone());
                work.push_back(parent);
            }
        }
    }
    out
}
