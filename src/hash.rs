use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};
use crate::index::Index;

/// A 32-byte digest. All-zero is the distinguished "empty" value.
pub type Hash = [u8; 32];

pub const ZERO_HASH: Hash = [0u8; 32];

/// `hash_pair(l, r)`: if both operands are zero, the result is zero so that
/// empty subtrees hash to zero at every level without ever being stored.
/// Any other combination — including exactly one zero operand — is hashed
/// for real. A single-sided shortcut would make a stored node's hash
/// independent of which level it occupies, and the path walker has no way
/// to recover that level once it's lost; hashing through a zero sibling
/// keeps every level's node distinct so a stored hash always identifies
/// exactly one position in the tree.
pub fn hash_pair(l: &Hash, r: &Hash) -> Hash {
    if *l == ZERO_HASH && *r == ZERO_HASH {
        return ZERO_HASH;
    }
    let mut hasher = Keccak256::new();
    hasher.update(l);
    hasher.update(r);
    hasher.finalize().into()
}

/// `leaf_hash(index, value)`: Keccak-256 of `index(32, BE) || value(32) ||
/// 0x01`. The trailing domain byte keeps leaf preimages (65 bytes) distinct
/// from internal-node preimages (always 64 bytes).
pub fn leaf_hash(index: &Index, value: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(index.to_be_bytes());
    hasher.update(value);
    hasher.update([0x01u8]);
    hasher.finalize().into()
}

pub fn to_hex(h: &Hash) -> String {
    format!("0x{}", hex::encode(h))
}

pub fn from_hex(s: &str) -> Result<Hash> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.len() != 64 {
        return Err(Error::MalformedHex);
    }
    let bytes = hex::decode(stripped).map_err(|_| Error::MalformedHex)?;
    bytes.try_into().map_err(|_| Error::MalformedHex)
}
