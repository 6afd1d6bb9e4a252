//! Compose and invert operations over mapping trees.
//!
//! Both walk a tree in parent-before-child order and rebuild each node's
//! "image" coordinates on the renamed side: the node's target name if it
//! has one, else its own name, reduced to the suffix after the last `$`
//! (the parent chain already carries the nesting context).

use std::collections::{HashMap, HashSet};

use common::SymbolRef;

use crate::tree::{MappingRecord, MappingTree};

/// Image of `sym` on the renamed side, given the images of all symbols
/// visited before it. Requires parent-before-child traversal.
pub(crate) fn image_of(
    sym: &SymbolRef,
    record: &MappingRecord,
    images: &HashMap<SymbolRef, SymbolRef>,
) -> SymbolRef {
    let parent_image = sym.owner().and_then(|o| images.get(&o).cloned());
    let name = record.target.as_deref().unwrap_or_else(|| sym.name());
    sym.with_owner_and_name(parent_image.as_ref(), name)
}

/// Inverts a tree's rename relation: a tree mapping obf -> deobf becomes
/// one mapping deobf -> obf. Round-trips exactly as long as no two
/// siblings share a target simple name.
pub fn invert(tree: &MappingTree) -> MappingTree {
    let mut result = MappingTree::new();
    let mut images: HashMap<SymbolRef, SymbolRef> = HashMap::new();

    for (sym, record) in tree.nodes() {
        let image = image_of(sym, record, &images);
        images.insert(sym.clone(), image.clone());

        let back = match record.target {
            Some(_) => MappingRecord::renamed(sym.name()),
            None => MappingRecord::unnamed(),
        };
        result.insert(image, back);
    }
    result
}

/// Relational composition: `left` maps obf -> mid, `right` maps
/// mid -> deobf; the result maps obf -> deobf directly, with no node left
/// at the mid coordinates.
///
/// `keep_left_only` keeps left nodes whose mid image has no right record;
/// `keep_right_only` keeps unconsumed right nodes, remapped onto the
/// left-side parent chain where one exists. The same primitive serves
/// forward composition and mapping-diff.
pub fn compose(
    left: &MappingTree,
    right: &MappingTree,
    keep_left_only: bool,
    keep_right_only: bool,
) -> MappingTree {
    let mut result = MappingTree::new();
    let mut left_to_mid: HashMap<SymbolRef, SymbolRef> = HashMap::new();
    let mut mid_to_left: HashMap<SymbolRef, SymbolRef> = HashMap::new();
    let mut consumed: HashSet<SymbolRef> = HashSet::new();

    for (sym, record) in left.nodes() {
        let mid = image_of(sym, record, &left_to_mid);
        left_to_mid.insert(sym.clone(), mid.clone());
        mid_to_left.insert(mid.clone(), sym.clone());

        match right.get(&mid).and_then(|r| r.target.clone()) {
            Some(target) => {
                // Collapse the mid step: right's record lands at the
                // left node's original coordinates.
                result.insert(sym.clone(), MappingRecord::renamed(target));
                consumed.insert(mid);
            }
            None => {
                if keep_left_only {
                    result.insert(sym.clone(), record.clone());
                }
            }
        }
    }

    if keep_right_only {
        for (sym, record) in right.nodes() {
            if consumed.contains(sym) {
                continue;
            }
            let corrected = match sym.owner().and_then(|o| mid_to_left.get(&o).cloned()) {
                Some(left_parent) => sym.with_owner_and_name(Some(&left_parent), sym.name()),
                None => sym.clone(),
            };
            result.insert(corrected.clone(), record.clone());
            mid_to_left.insert(sym.clone(), corrected);
        }
    }
    result
}
