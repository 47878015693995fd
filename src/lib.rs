//! Merkle Patricia Forestry proofs.
//!
//! A [`TraversalProof`] captured from a trie is compressed by [`serialize()`]
//! into CBOR bytes that the on-chain verifier understands. The same bytes are
//! checked off-chain with [`verify()`].
pub mod commitment;
pub mod decode;
pub mod format;
pub mod hash;
pub mod merkle;
pub mod path;
pub mod proof;
pub mod serialize;
pub mod traversal;
pub mod utils;
pub mod wire;

pub use commitment::{CommitmentScheme, MpfCommitment};
pub use decode::{decode, DecodeError};
pub use hash::{Blake2b256, Hash, HashFunction};
pub use path::NibblePath;
pub use proof::{verify, verify_with, Inconsistency, ProofError, Verifier};
pub use serialize::{compress, serialize, serialize_default, SerializeError};
pub use traversal::{BranchStep, ForkStep, ProofKind, TraversalProof, TraversalStep};
pub use wire::{Neighbor, WireProof, WireStep};
