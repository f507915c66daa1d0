use serde::{Deserialize, Serialize};

use crate::hash::{from_hex, to_hex, Hash, ZERO_HASH};
use crate::index::Index;
use crate::walker::{Terminal, WalkResult};

/// Bitmask of length `depth` where bit `i` is set iff the sibling at level
/// `i` is non-zero. Backed by a plain `Vec<bool>` rather than a packed
/// bitset — proofs are small (at most `depth` bits) and this keeps the
/// indexing code simple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enables(Vec<bool>);

impl Enables {
    pub fn new(depth: u16) -> Self {
        Enables(vec![false; depth as usize])
    }

    pub fn set(&mut self, level: u16) {
        self.0[level as usize] = true;
    }

    pub fn get(&self, level: u16) -> bool {
        self.0[level as usize]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn popcount(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    /// `0x`-prefixed hex string, MSB-first within each byte, bit 0 of the
    /// mask occupying the least significant bit of the last byte.
    pub fn to_hex(&self) -> String {
        let nbytes = self.0.len().div_ceil(8);
        let mut bytes = vec![0u8; nbytes];
        for (i, bit) in self.0.iter().enumerate() {
            if *bit {
                let byte_idx = nbytes - 1 - i / 8;
                bytes[byte_idx] |= 1 << (i % 8);
            }
        }
        format!("0x{}", hex::encode(bytes))
    }

    pub fn from_hex(s: &str, depth: u16) -> Result<Self, crate::error::Error> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| crate::error::Error::MalformedHex)?;
        let nbytes = (depth as usize).div_ceil(8);
        if bytes.len() != nbytes {
            return Err(crate::error::Error::MalformedHex);
        }
        let mut bits = vec![false; depth as usize];
        for i in 0..depth as usize {
            let byte_idx = nbytes - 1 - i / 8;
            bits[i] = (bytes[byte_idx] >> (i % 8)) & 1 == 1;
        }
        Ok(Enables(bits))
    }
}

/// `{exists, leaf, value, index, enables, siblings}` (C4). For
/// non-existence proofs `leaf` and `value` are 0 but the accumulated path
/// siblings are still reported so a verifier can confirm the slot is empty
/// under the claimed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub exists: bool,
    pub leaf: Hash,
    pub value: Hash,
    pub index: Index,
    pub enables: Enables,
    pub siblings: Vec<Hash>,
}

/// Proof ⊕ newLeaf. Captures the pre-operation state of the slot plus the
/// new leaf hash (0 for deletion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateProof {
    pub proof: Proof,
    pub new_leaf: Hash,
}

/// Builds a [`Proof`] from a completed walk (C4). `walk.levels` already
/// carries every real node the descent passed through (root to leaf order);
/// a level's sibling is reported only when it's non-zero, since the
/// verifier treats an unset `enables` bit as an implicit zero sibling.
pub fn proof_from_walk(index: &Index, walk: &WalkResult, depth: u16) -> Proof {
    let mut enables = Enables::new(depth);
    for info in &walk.levels {
        if info.sibling != ZERO_HASH {
            enables.set(info.level);
        }
    }
    let siblings: Vec<Hash> = walk
        .levels
        .iter()
        .rev()
        .filter(|info| info.sibling != ZERO_HASH)
        .map(|info| info.sibling)
        .collect();

    match &walk.terminal {
        Terminal::Leaf(hash, record) => Proof {
            exists: true,
            leaf: *hash,
            value: record.value,
            index: *index,
            enables,
            siblings,
        },
        Terminal::Empty => Proof {
            exists: false,
            leaf: ZERO_HASH,
            value: ZERO_HASH,
            index: *index,
            enables,
            siblings,
        },
    }
}

/// JSON wire representation (§6): 0x-prefixed lowercase hex for hashes, a
/// decimal string for the index, and a hex string for the enables mask.
#[derive(Serialize, Deserialize)]
struct ProofWire {
    exists: bool,
    leaf: String,
    value: String,
    index: String,
    enables: String,
    siblings: Vec<String>,
}

impl Serialize for Proof {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let wire = ProofWire {
            exists: self.exists,
            leaf: to_hex(&self.leaf),
            value: to_hex(&self.value),
            index: self.index.to_decimal_string(),
            enables: self.enables.to_hex(),
            siblings: self.siblings.iter().map(to_hex).collect(),
        };
        wire.serialize(serializer)
    }
}

impl Proof {
    /// Deserializing requires the tree's configured depth up front, since
    /// the wire format's `enables` string doesn't self-describe its bit
    /// width (a leading 0x00 byte is ambiguous between depths).
    pub fn from_wire_json(s: &str, depth: u16) -> Result<Self, crate::error::Error> {
        let wire: ProofWire =
            serde_json::from_str(s).map_err(|_| crate::error::Error::MalformedHex)?;
        let siblings = wire
            .siblings
            .iter()
            .map(|s| from_hex(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Proof {
            exists: wire.exists,
            leaf: from_hex(&wire.leaf)?,
            value: from_hex(&wire.value)?,
            index: Index::from_decimal_string(&wire.index)?,
            enables: Enables::from_hex(&wire.enables, depth)?,
            siblings,
        })
    }

    pub fn to_wire_json(&self) -> String {
        serde_json::to_string(self).expect("Proof serialization is infallible")
    }
}

#[derive(Serialize, Deserialize)]
struct UpdateProofWire {
    #[serde(flatten)]
    proof: ProofWire,
    #[serde(rename = "newLeaf")]
    new_leaf: String,
}

impl Serialize for UpdateProof {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let wire = UpdateProofWire {
            proof: ProofWire {
                exists: self.proof.exists,
                leaf: to_hex(&self.proof.leaf),
                value: to_hex(&self.proof.value),
                index: self.proof.index.to_decimal_string(),
                enables: self.proof.enables.to_hex(),
                siblings: self.proof.siblings.iter().map(to_hex).collect(),
            },
            new_leaf: to_hex(&self.new_leaf),
        };
        wire.serialize(serializer)
    }
}

impl UpdateProof {
    pub fn to_wire_json(&self) -> String {
        serde_json::to_string(self).expect("UpdateProof serialization is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enables_hex_round_trip() {
        let mut e = Enables::new(8);
        e.set(0);
        e.set(5);
        let hex = e.to_hex();
        let back = Enables::from_hex(&hex, 8).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn enables_popcount_matches_siblings() {
        let mut e = Enables::new(16);
        e.set(1);
        e.set(3);
        e.set(15);
        assert_eq!(e.popcount(), 3);
    }

    #[test]
    fn proof_wire_round_trip() {
        let proof = Proof {
            exists: true,
            leaf: [7u8; 32],
            value: [8u8; 32],
            index: Index::from_u64(9),
            enables: {
                let mut e = Enables::new(4);
                e.set(1);
                e
            },
            siblings: vec![[1u8; 32]],
        };
        let json = proof.to_wire_json();
        let back = Proof::from_wire_json(&json, 4).unwrap();
        assert_eq!(proof, back);
    }

    #[test]
    fn update_proof_wire_uses_camel_case_new_leaf_key() {
        let update_proof = UpdateProof {
            proof: Proof {
                exists: false,
                leaf: ZERO_HASH,
                value: ZERO_HASH,
                index: Index::from_u64(6),
                enables: Enables::new(8),
                siblings: vec![],
            },
            new_leaf: [3u8; 32],
        };
        let json = update_proof.to_wire_json();
        assert!(json.contains("\"newLeaf\""));
        assert!(!json.contains("\"new_leaf\""));
    }
}
