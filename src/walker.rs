use crate::error::{Error, Result};
use crate::hash::{Hash, ZERO_HASH};
use crate::index::Index;
use crate::store::{Backend, LeafRecord, NodeStore};

/// A real (non-zero) node encountered while descending one level, in the
/// order it was visited (root to leaf).
#[derive(Debug, Clone, Copy)]
pub struct LevelInfo {
    pub level: u16,
    pub sibling: Hash,
    /// the hash currently occupying this ancestor position, so callers that
    /// rebuild the path can delete the node being replaced.
    pub old_node_hash: Hash,
}

#[derive(Debug, Clone)]
pub enum Terminal {
    /// the walk descended into the zero hash at some level; the slot (and
    /// everything below it) is empty.
    Empty,
    /// the walk consumed every level and landed on a stored leaf. Since each
    /// level's child is chosen by the queried index's own bit, this leaf's
    /// index is always the query index (I4 rules out any other occupant
    /// reachable this way).
    Leaf(Hash, LeafRecord),
}

/// Result of walking from the root toward level 0 for a given index (C3).
#[derive(Debug, Clone)]
pub struct WalkResult {
    /// real nodes encountered, in root-to-leaf order (descending level).
    pub levels: Vec<LevelInfo>,
    pub terminal: Terminal,
}

impl WalkResult {
    pub fn exists_for(&self, index: &Index) -> bool {
        matches!(&self.terminal, Terminal::Leaf(_, record) if record.index == *index)
    }
}

/// Walks from `root` toward level 0, following `index`'s bits (C3).
///
/// Every occupied position in the tree carries a real stored node at every
/// level down to the leaf — a lone leaf is still wrapped in single-child
/// nodes all the way from the level it was inserted at down to level 0,
/// padded with the zero hash on the unoccupied side. So at each level the
/// walk either finds the zero hash (the remaining levels are all empty and
/// the walk stops early) or a real node to descend through; only after all
/// `depth` levels have been consumed can `current` be a leaf.
pub fn walk<B: Backend>(
    store: &NodeStore<B>,
    root: Hash,
    index: &Index,
    depth: u16,
) -> Result<WalkResult> {
    let mut current = root;
    let mut levels = Vec::new();

    for level in (0..depth).rev() {
        if current == ZERO_HASH {
            return Ok(WalkResult {
                levels,
                terminal: Terminal::Empty,
            });
        }
        let (l, r) = store
            .get_node(&current)?
            .ok_or(Error::CorruptStore("expected an internal node above the leaf level"))?;
        let bit = index.bit(level);
        let (chosen, sibling) = if bit { (r, l) } else { (l, r) };
        levels.push(LevelInfo {
            level,
            sibling,
            old_node_hash: current,
        });
        current = chosen;
    }

    if current == ZERO_HASH {
        return Ok(WalkResult {
            levels,
            terminal: Terminal::Empty,
        });
    }
    let record = store
        .get_leaf(&current)?
        .ok_or(Error::CorruptStore("expected a leaf at the bottom of the walk"))?;
    Ok(WalkResult {
        levels,
        terminal: Terminal::Leaf(current, record),
    })
}
