//! Compressing a traversal proof into its wire form.
use thiserror::Error;

use crate::{
    commitment::{CommitmentScheme, MpfCommitment},
    hash::{Blake2b256, HashFunction},
    merkle::neighbors,
    path::{NibblePath, PathError},
    traversal::{BranchStep, ForkStep, TraversalProof, TraversalStep},
    wire::{Neighbor, WireProof, WireStep},
};

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("CBOR encoding error {0}")]
    Cbor(#[from] ciborium::ser::Error<std::io::Error>),
    #[error("Key path has {got} nibbles but the proof steps consume {needed}")]
    KeyPathTooShort { needed: usize, got: usize },
    #[error("Path error {0}")]
    PathError(#[from] PathError),
}

/// Compresses a traversal proof.
///
/// `key_path` is the path of the proven key in the trie, i.e. the already
/// hashed key. It is only read for different-leaf proofs, to find where the
/// query and the conflicting leaf part ways.
pub fn compress<H: HashFunction, C: CommitmentScheme>(
    proof: &TraversalProof,
    key_path: &[u8],
    hash: &H,
    commitments: &C,
) -> Result<WireProof, SerializeError> {
    let null_hash = commitments.null_hash();
    let mut steps: Vec<WireStep> = proof
        .steps()
        .iter()
        .map(|step| match step {
            TraversalStep::Branch(branch) => compress_branch(branch, hash, &null_hash),
            TraversalStep::Fork(fork) => compress_fork(fork, &null_hash),
        })
        .collect();

    if let (Some(key_hash), Some(value_hash)) =
        (proof.conflicting_key_hash(), proof.conflicting_value_hash())
    {
        let consumed = proof.consumed_nibbles();
        let query = NibblePath::from_bytes(key_path);
        if query.len() < consumed {
            return Err(SerializeError::KeyPathTooShort {
                needed: consumed,
                got: query.len(),
            });
        }
        let query = query.suffix_from(consumed)?;
        let conflicting = NibblePath::from_bytes(key_hash).suffix_from(consumed)?;
        steps.push(WireStep::Leaf {
            skip: query.common_prefix_len(&conflicting),
            key_hash: key_hash.to_vec(),
            value_hash: value_hash.to_vec(),
        });
    }
    log::debug!(
        "Compressed {:?} proof with {} traversal steps into {} wire steps",
        proof.kind(),
        proof.steps().len(),
        steps.len()
    );
    Ok(WireProof::new(steps))
}

fn compress_branch<H: HashFunction>(branch: &BranchStep, hash: &H, null_hash: &[u8]) -> WireStep {
    WireStep::Branch {
        skip: branch.skip_path().len(),
        neighbors: neighbors(hash, branch.child_hashes(), branch.child_index(), null_hash),
        value_hash: branch.branch_value_hash().map(<[u8]>::to_vec),
    }
}

fn compress_fork(fork: &ForkStep, null_hash: &[u8]) -> WireStep {
    WireStep::Fork {
        skip: fork.skip_path().len(),
        neighbor: Neighbor {
            nibble: fork.neighbor_nibble(),
            prefix: fork.suffix().as_nibbles().to_vec(),
            root: fork.neighbor_root().unwrap_or(null_hash).to_vec(),
        },
    }
}

/// Compresses and encodes a traversal proof into wire bytes.
pub fn serialize<H: HashFunction, C: CommitmentScheme>(
    proof: &TraversalProof,
    key_path: &[u8],
    hash: &H,
    commitments: &C,
) -> Result<Vec<u8>, SerializeError> {
    compress(proof, key_path, hash, commitments)?.to_cbor()
}

/// [`serialize`] with Blake2b-256 and forestry commitments.
pub fn serialize_default(proof: &TraversalProof, key_path: &[u8]) -> Result<Vec<u8>, SerializeError> {
    serialize(proof, key_path, &Blake2b256, &MpfCommitment::<Blake2b256>::default())
}
