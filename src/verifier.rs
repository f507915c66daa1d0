use crate::hash::{hash_pair, leaf_hash, ZERO_HASH};
use crate::index::Index;
use crate::proof::Proof;

/// Recomputes a root from `proof` and checks it against `expected_root`
/// (§4.6). Pure function: no store access, no knowledge of how the proof
/// was produced.
///
/// Rejects `depth > 256` and any `index` with a set bit at or above `depth`
/// before touching `index.bit()`, which is undefined past bit 255.
///
/// Walks level `0` up to `depth - 1`, folding in a sibling wherever
/// `enables` marks one present and the zero hash otherwise, then compares
/// the recomputed leaf value for the claimed `index` against `expected_root`.
pub fn verify(
    expected_root: [u8; 32],
    index: &Index,
    proof: &Proof,
    depth: u16,
) -> bool {
    if depth > 256 {
        return false;
    }
    if !index.fits_depth(depth) {
        return false;
    }
    if proof.index != *index {
        return false;
    }
    if proof.enables.len() != depth as usize {
        return false;
    }

    let leaf_claim = if proof.exists {
        if proof.leaf != leaf_hash(index, &proof.value) {
            return false;
        }
        proof.leaf
    } else {
        if proof.leaf != ZERO_HASH || proof.value != ZERO_HASH {
            return false;
        }
        ZERO_HASH
    };

    let mut siblings = proof.siblings.iter();
    let mut current = leaf_claim;
    for level in 0..depth {
        let sibling = if proof.enables.get(level) {
            match siblings.next() {
                Some(s) => *s,
                None => return false,
            }
        } else {
            ZERO_HASH
        };
        let bit = index.bit(level);
        let (l, r) = if bit { (sibling, current) } else { (current, sibling) };
        current = hash_pair(&l, &r);
    }

    if siblings.next().is_some() {
        return false;
    }

    current == expected_root
}
