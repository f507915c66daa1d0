use crate::error::{Error, Result};
use crate::hash::{hash_pair, leaf_hash, Hash, ZERO_HASH};
use crate::index::Index;
use crate::store::{Backend, LeafRecord, NodeStore};
use crate::walker::{walk, LevelInfo, Terminal, WalkResult};

/// Re-hashes from `current` up through `levels` (ascending by level),
/// combining with each recorded sibling and persisting the resulting
/// internal node. A level whose rebuilt pair is `(0, 0)` is not stored —
/// `hash_pair` already collapses it to the zero hash, so omitting the put
/// is what makes the collapse rule (§4.5.2) hold. Whenever the recomputed
/// hash differs from the node previously occupying that position, the old
/// one is deleted; the store is content-addressed and a node's hash is
/// specific to the full subtree beneath it, so a replaced node is never
/// still referenced elsewhere.
fn climb<B: Backend>(
    store: &NodeStore<B>,
    index: &Index,
    levels: &[LevelInfo],
    mut current: Hash,
) -> Result<Hash> {
    for info in levels {
        let bit = index.bit(info.level);
        let (l, r) = if bit {
            (info.sibling, current)
        } else {
            (current, info.sibling)
        };
        let new_hash = hash_pair(&l, &r);
        if new_hash != info.old_node_hash {
            store.delete_node(&info.old_node_hash)?;
        }
        if l != ZERO_HASH || r != ZERO_HASH {
            store.put_node(&new_hash, &l, &r)?;
        }
        current = new_hash;
    }
    Ok(current)
}

/// Builds the full ascending (leaf-to-root) level list for an insert: the
/// levels `walk` actually found a real node at (already carrying the
/// correct sibling and old-hash-to-delete) plus, below the lowest one it
/// reached, synthetic entries padded with the zero sibling — these are the
/// levels a brand-new leaf passes through with nothing else occupying them.
fn full_levels(w: &WalkResult, depth: u16) -> Vec<LevelInfo> {
    let floor = w.levels.last().map(|l| l.level).unwrap_or(depth);
    let mut out = Vec::with_capacity(depth as usize);
    for level in 0..floor {
        out.push(LevelInfo {
            level,
            sibling: ZERO_HASH,
            old_node_hash: ZERO_HASH,
        });
    }
    out.extend(w.levels.iter().rev().copied());
    out
}

fn ascending(levels: &[LevelInfo]) -> Vec<LevelInfo> {
    let mut v: Vec<LevelInfo> = levels.to_vec();
    v.reverse();
    v
}

/// Inserts `value` at `index`, which must currently be empty (C6, §4.5.1).
/// Returns the new root.
///
/// This covers both the "normal" case (nothing else nearby) and the
/// "divergence" case (the walk ran into an existing lone leaf's subtree and
/// stopped at the zero sibling next to it) uniformly: in the divergence
/// case the walk's last real node already records the existing leaf's
/// combined subtree hash as a non-zero sibling at the level where the two
/// indices first differ, so `full_levels` + `climb` folds the new leaf in
/// at exactly that level without needing to touch anything below it.
pub fn insert<B: Backend>(
    store: &NodeStore<B>,
    root: Hash,
    index: &Index,
    value: &Hash,
    depth: u16,
) -> Result<Hash> {
    let w = walk(store, root, index, depth)?;
    if matches!(w.terminal, Terminal::Leaf(..)) {
        return Err(Error::KeyExists);
    }

    let new_leaf = leaf_hash(index, value);
    store.put_leaf(
        &new_leaf,
        &LeafRecord {
            index: *index,
            value: *value,
        },
    )?;

    let levels = full_levels(&w, depth);
    climb(store, index, &levels, new_leaf)
}

/// Updates the value stored at `index`, which must already exist (§4.5.1,
/// §4.5.3). Setting the same value it already holds is a no-op: the root is
/// unchanged and nothing is written. The old leaf record is deleted only
/// after `climb` has rewritten the node path away from it — each backend
/// call is its own transaction, so deleting first would leave a window
/// where a crash strands a node still pointing at an absent leaf.
pub fn update<B: Backend>(
    store: &NodeStore<B>,
    root: Hash,
    index: &Index,
    value: &Hash,
    depth: u16,
) -> Result<Hash> {
    let w = walk(store, root, index, depth)?;
    let old_hash = match &w.terminal {
        Terminal::Leaf(hash, _) => *hash,
        Terminal::Empty => return Err(Error::KeyNotFound),
    };

    let new_leaf = leaf_hash(index, value);
    if new_leaf == old_hash {
        return Ok(root);
    }

    store.put_leaf(
        &new_leaf,
        &LeafRecord {
            index: *index,
            value: *value,
        },
    )?;
    let new_root = climb(store, index, &ascending(&w.levels), new_leaf)?;
    store.delete_leaf(&old_hash)?;
    Ok(new_root)
}

/// Removes the leaf at `index`, which must currently exist (§4.5.2). The
/// collapse rule — deleting a rebuilt node whose children are both zero and
/// propagating zero upward — falls out of `climb`'s own bookkeeping: once
/// the path above the removed leaf has no other occupant, each level's
/// rebuilt pair is `(0, 0)`, `hash_pair` collapses it to zero, and `climb`
/// skips storing it (and deletes the node that used to be there). The leaf
/// record itself is deleted last, after `climb` succeeds, for the same
/// crash-recovery reason as in `update`: until the node path no longer
/// references it, deleting it first would leave a dangling pointer behind.
pub fn delete<B: Backend>(
    store: &NodeStore<B>,
    root: Hash,
    index: &Index,
    depth: u16,
) -> Result<Hash> {
    let w = walk(store, root, index, depth)?;
    let leaf_to_remove = match &w.terminal {
        Terminal::Leaf(hash, _) => *hash,
        Terminal::Empty => return Err(Error::KeyNotFound),
    };

    let new_root = climb(store, index, &ascending(&w.levels), ZERO_HASH)?;
    store.delete_leaf(&leaf_to_remove)?;
    Ok(new_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::MemoryBackend;

    fn new_store() -> NodeStore<MemoryBackend> {
        NodeStore::new(MemoryBackend::new())
    }

    #[test]
    fn insert_into_empty_tree_builds_full_depth_chain() {
        let store = new_store();
        let idx = Index::from_u64(5);
        let value = [0x11u8; 32];
        let root = insert(&store, ZERO_HASH, &idx, &value, 8).unwrap();

        let mut expected = leaf_hash(&idx, &value);
        for level in 0..8u16 {
            let bit = idx.bit(level);
            let (l, r) = if bit {
                (ZERO_HASH, expected)
            } else {
                (expected, ZERO_HASH)
            };
            expected = hash_pair(&l, &r);
        }
        assert_eq!(root, expected);
    }

    #[test]
    fn insert_on_occupied_slot_fails() {
        let store = new_store();
        let idx = Index::from_u64(5);
        let root = insert(&store, ZERO_HASH, &idx, &[1u8; 32], 8).unwrap();
        let err = insert(&store, root, &idx, &[2u8; 32], 8).unwrap_err();
        assert!(matches!(err, Error::KeyExists));
    }

    #[test]
    fn second_insert_diverges_and_both_leaves_remain() {
        let store = new_store();
        let a = Index::from_u64(0b0000_0001);
        let b = Index::from_u64(0b0000_0011);
        let root = insert(&store, ZERO_HASH, &a, &[1u8; 32], 8).unwrap();
        let root = insert(&store, root, &b, &[2u8; 32], 8).unwrap();

        let wa = walk(&store, root, &a, 8).unwrap();
        assert!(wa.exists_for(&a));
        let wb = walk(&store, root, &b, 8).unwrap();
        assert!(wb.exists_for(&b));
    }

    #[test]
    fn update_changes_root_and_idempotent_update_does_not() {
        let store = new_store();
        let idx = Index::from_u64(1);
        let root = insert(&store, ZERO_HASH, &idx, &[1u8; 32], 8).unwrap();
        let root2 = update(&store, root, &idx, &[2u8; 32], 8).unwrap();
        assert_ne!(root, root2);
        let root3 = update(&store, root2, &idx, &[2u8; 32], 8).unwrap();
        assert_eq!(root2, root3);
    }

    #[test]
    fn update_missing_key_fails() {
        let store = new_store();
        let idx = Index::from_u64(1);
        let err = update(&store, ZERO_HASH, &idx, &[1u8; 32], 8).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound));
    }

    #[test]
    fn delete_only_leaf_restores_zero_root() {
        let store = new_store();
        let idx = Index::from_u64(1);
        let root = insert(&store, ZERO_HASH, &idx, &[1u8; 32], 8).unwrap();
        let root = delete(&store, root, &idx, 8).unwrap();
        assert_eq!(root, ZERO_HASH);
    }

    #[test]
    fn delete_missing_key_fails() {
        let store = new_store();
        let idx = Index::from_u64(1);
        let err = delete(&store, ZERO_HASH, &idx, 8).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound));
    }

    #[test]
    fn delete_one_of_two_restores_the_solo_chain_for_the_other() {
        let store = new_store();
        let a = Index::from_u64(0b0000_0001);
        let b = Index::from_u64(0b0000_0011);
        let root = insert(&store, ZERO_HASH, &a, &[1u8; 32], 8).unwrap();
        let root = insert(&store, root, &b, &[2u8; 32], 8).unwrap();
        let root = delete(&store, root, &b, 8).unwrap();

        let solo_store = new_store();
        let solo_root = insert(&solo_store, ZERO_HASH, &a, &[1u8; 32], 8).unwrap();
        assert_eq!(root, solo_root);

        let w = walk(&store, root, &a, 8).unwrap();
        assert!(w.exists_for(&a));
    }

    #[test]
    fn insert_delete_insert_round_trips_to_same_root() {
        let store = new_store();
        let idx = Index::from_u64(7);
        let value = [9u8; 32];
        let root1 = insert(&store, ZERO_HASH, &idx, &value, 16).unwrap();
        let root_after_delete = delete(&store, root1, &idx, 16).unwrap();
        assert_eq!(root_after_delete, ZERO_HASH);
        let root2 = insert(&store, ZERO_HASH, &idx, &value, 16).unwrap();
        assert_eq!(root1, root2);
    }
}
