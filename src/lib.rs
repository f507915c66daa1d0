pub mod error;
pub mod hash;
pub mod index;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod mutator;
pub mod proof;
pub mod store;
pub mod tree;
pub mod verifier;
pub mod walker;

pub use error::{Error, Result};
pub use hash::{hash_pair, leaf_hash, Hash, ZERO_HASH};
pub use index::Index;
pub use lmdb_backend::LmdbBackend;
pub use memory_backend::MemoryBackend;
pub use proof::{Proof, UpdateProof};
pub use store::{Backend, LeafRecord, NodeStore};
pub use tree::Tree;
pub use verifier::verify;
