use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::hash::{Hash, ZERO_HASH};
use crate::index::Index;
use crate::mutator;
use crate::proof::{proof_from_walk, Proof, UpdateProof};
use crate::store::{Backend, NodeStore};
use crate::walker::walk;

/// The sparse Merkle tree façade (C7): a fixed `depth`, a content-addressed
/// node store over some [`Backend`], and the current root. Mutations take
/// an exclusive lock on the root for their whole duration (one writer at a
/// time, §5); reads only hold the lock long enough to snapshot the root,
/// since the node store underneath is safe for concurrent readers.
pub struct Tree<B: Backend> {
    store: NodeStore<B>,
    depth: u16,
    root: RwLock<Hash>,
}

impl<B: Backend> Tree<B> {
    /// Opens a tree over `backend` at `depth` levels, starting from the
    /// empty root. `depth` must be in `1..=256`.
    pub fn new(backend: B, depth: u16) -> Result<Self> {
        if depth == 0 || depth > 256 {
            return Err(Error::InvalidDepth(depth));
        }
        Ok(Tree {
            store: NodeStore::new(backend),
            depth,
            root: RwLock::new(ZERO_HASH),
        })
    }

    /// Reopens a tree over `backend` at `depth`, resuming from a
    /// previously-persisted root rather than the empty tree.
    pub fn with_root(backend: B, depth: u16, root: Hash) -> Result<Self> {
        if depth == 0 || depth > 256 {
            return Err(Error::InvalidDepth(depth));
        }
        Ok(Tree {
            store: NodeStore::new(backend),
            depth,
            root: RwLock::new(root),
        })
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn root(&self) -> Hash {
        *self.root.read().expect("root lock poisoned")
    }

    fn check_range(&self, index: &Index) -> Result<()> {
        if !index.fits_depth(self.depth) {
            return Err(Error::OutOfRange);
        }
        Ok(())
    }

    /// Returns the value at `index`, or `None` if the slot is empty.
    pub fn get(&self, index: &Index) -> Result<Option<Hash>> {
        self.check_range(index)?;
        let root = self.root();
        let w = walk(&self.store, root, index, self.depth)?;
        Ok(if w.exists_for(index) {
            match w.terminal {
                crate::walker::Terminal::Leaf(_, record) => Some(record.value),
                _ => unreachable!(),
            }
        } else {
            None
        })
    }

    /// Inserts `value` at `index`. Fails with [`Error::KeyExists`] if the
    /// slot is already occupied, or [`Error::OutOfRange`] if `index` does
    /// not fit the configured depth.
    pub fn insert(&self, index: &Index, value: Hash) -> Result<()> {
        self.check_range(index)?;
        let mut root = self.root.write().expect("root lock poisoned");
        let new_root = mutator::insert(&self.store, *root, index, &value, self.depth)?;
        *root = new_root;
        Ok(())
    }

    /// Updates the value at `index`. Fails with [`Error::KeyNotFound`] if
    /// the slot is empty. Setting the same value it already holds is a
    /// no-op (§4.5.3).
    pub fn update(&self, index: &Index, value: Hash) -> Result<()> {
        self.check_range(index)?;
        let mut root = self.root.write().expect("root lock poisoned");
        let new_root = mutator::update(&self.store, *root, index, &value, self.depth)?;
        *root = new_root;
        Ok(())
    }

    /// Removes the value at `index`. Fails with [`Error::KeyNotFound`] if
    /// the slot is already empty.
    pub fn delete(&self, index: &Index) -> Result<()> {
        self.check_range(index)?;
        let mut root = self.root.write().expect("root lock poisoned");
        let new_root = mutator::delete(&self.store, *root, index, self.depth)?;
        *root = new_root;
        Ok(())
    }

    /// Produces an existence or non-existence [`Proof`] for `index` against
    /// the current root (C4).
    pub fn get_proof(&self, index: &Index) -> Result<Proof> {
        self.check_range(index)?;
        let root = self.root();
        let w = walk(&self.store, root, index, self.depth)?;
        Ok(proof_from_walk(index, &w, self.depth))
    }

    /// Inserts `value` at `index` and returns an [`UpdateProof`] capturing
    /// the slot's prior state alongside the new leaf hash.
    pub fn insert_with_proof(&self, index: &Index, value: Hash) -> Result<UpdateProof> {
        self.check_range(index)?;
        let mut root = self.root.write().expect("root lock poisoned");
        let w = walk(&self.store, *root, index, self.depth)?;
        let proof = proof_from_walk(index, &w, self.depth);
        if proof.exists {
            return Err(Error::KeyExists);
        }
        let new_root = mutator::insert(&self.store, *root, index, &value, self.depth)?;
        *root = new_root;
        Ok(UpdateProof {
            proof,
            new_leaf: crate::hash::leaf_hash(index, &value),
        })
    }

    /// Deletes the value at `index` and returns an [`UpdateProof`] capturing
    /// the slot's prior state; `new_leaf` is the zero hash.
    pub fn delete_with_proof(&self, index: &Index) -> Result<UpdateProof> {
        self.check_range(index)?;
        let mut root = self.root.write().expect("root lock poisoned");
        let w = walk(&self.store, *root, index, self.depth)?;
        let proof = proof_from_walk(index, &w, self.depth);
        if !proof.exists {
            return Err(Error::KeyNotFound);
        }
        let new_root = mutator::delete(&self.store, *root, index, self.depth)?;
        *root = new_root;
        Ok(UpdateProof {
            proof,
            new_leaf: ZERO_HASH,
        })
    }
}
