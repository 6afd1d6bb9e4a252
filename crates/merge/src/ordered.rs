//! Order-preserving merge of two keyed sequences.
//!
//! The key walk is greedy: shared runs are emitted in lockstep, and on
//! divergence all leading client-only keys drain before the server-only
//! keys. This is not an optimal diff; pathological interleavings can come
//! out in a surprising (but still complete) order. The adversarial
//! fixtures below pin the current behavior.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::Side;

/// Merges two key sequences into one order-preserving union.
///
/// Every key of either input appears exactly once. Runs present in both
/// inputs keep their shared order; side-exclusive runs are emitted at the
/// point of divergence, client side first.
pub fn merge_preserve_order<K: Eq + Hash + Clone>(first: &[K], second: &[K]) -> Vec<K> {
    let first_set: HashSet<&K> = first.iter().collect();
    let second_set: HashSet<&K> = second.iter().collect();

    let mut emitted: HashSet<K> = HashSet::new();
    let mut out = Vec::with_capacity(first.len().max(second.len()));
    let mut push = |out: &mut Vec<K>, emitted: &mut HashSet<K>, key: &K| {
        if emitted.insert(key.clone()) {
            out.push(key.clone());
        }
    };

    let mut i = 0;
    let mut j = 0;
    while i < first.len() || j < second.len() {
        let before = (i, j);
        while i < first.len() && j < second.len() && first[i] == second[j] {
            push(&mut out, &mut emitted, &first[i]);
            i += 1;
            j += 1;
        }
        while i < first.len() && !second_set.contains(&first[i]) {
            push(&mut out, &mut emitted, &first[i]);
            i += 1;
        }
        while j < second.len() && !first_set.contains(&second[j]) {
            push(&mut out, &mut emitted, &second[j]);
            j += 1;
        }
        if (i, j) == before {
            // Shared keys in conflicting order block every walk above.
            // Force one client step (server once the client is drained)
            // so the merge terminates; the emitted set keeps the union
            // exact-once.
            if i < first.len() {
                push(&mut out, &mut emitted, &first[i]);
                i += 1;
            } else {
                push(&mut out, &mut emitted, &second[j]);
                j += 1;
            }
        }
    }
    out
}

/// Per-family merge capabilities: how to derive an item's identity key
/// and how to tag a side-exclusive item.
pub trait MemberFamily {
    type Item: Clone;
    type Key: Eq + Hash + Clone;

    fn identity(item: &Self::Item) -> Self::Key;

    /// Called exactly once, at emission, on an item present on one side only.
    fn tag_side(item: &mut Self::Item, side: Side);
}

/// Merges the client and server items of one member family.
///
/// For a key present on both sides the client item is emitted unchanged
/// and the server copy is discarded. For a side-exclusive key the item is
/// tagged with its side, then emitted.
pub fn merge_family<F: MemberFamily>(client: &[F::Item], server: &[F::Item]) -> Vec<F::Item> {
    let client_keys: Vec<F::Key> = client.iter().map(F::identity).collect();
    let server_keys: Vec<F::Key> = server.iter().map(F::identity).collect();

    let client_map: HashMap<&F::Key, &F::Item> = client_keys.iter().zip(client).collect();
    let server_map: HashMap<&F::Key, &F::Item> = server_keys.iter().zip(server).collect();

    let mut out = Vec::with_capacity(client.len().max(server.len()));
    for key in merge_preserve_order(&client_keys, &server_keys) {
        match (client_map.get(&key), server_map.get(&key)) {
            (Some(&item), Some(_)) => out.push(item.clone()),
            (Some(&item), None) => {
                let mut item = item.clone();
                F::tag_side(&mut item, Side::Client);
                out.push(item);
            }
            (None, Some(&item)) => {
                let mut item = item.clone();
                F::tag_side(&mut item, Side::Server);
                out.push(item);
            }
            (None, None) => unreachable!("merged key missing from both inputs"),
        }
    }
    out
}
