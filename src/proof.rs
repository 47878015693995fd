//! For verifying a Merkle Patricia Forestry proof against a trusted root.
//!
//! The verifier walks the path of the key, H(key), one proof step at a time
//! and rebuilds every node on the way back up:
//!
//! - Branch: the child hash is folded with its 4 neighbors.
//! - Fork: the path leaves a branch whose prefix diverges from the key. The
//!   diverging branch is the only other child.
//! - Leaf: the path meets the leaf of another key, which is the only other child.
//!
//! The root that comes out is compared with the trusted root.
//!
//! A terminal Fork in a non-inclusion proof ends the walk with the root it
//! carries, which is returned unchecked. The wire format holds nothing that
//! authenticates it, so a forged terminal Fork whose root is the commitment
//! of the node actually found there can show a present key as absent. Only
//! the fork nibble is checked against the key path.
use thiserror::Error;

use crate::{
    commitment::{CommitmentScheme, MpfCommitment},
    decode::{decode, DecodeError},
    hash::{Blake2b256, Hash, HashFunction},
    merkle::{fold_neighbors, sparse_merkle16},
    path::{NibblePath, PathError},
    utils::{concat, hex_encode},
    wire::{Neighbor, WireProof, WireStep},
};

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("Proof is internally inconsistent: {0}")]
    Inconsistent(#[from] Inconsistency),
    #[error("Malformed proof {0}")]
    Malformed(#[from] DecodeError),
    #[error("Inclusion proofs require a value")]
    MissingValue,
    #[error("Path error {0}")]
    PathError(#[from] PathError),
}

/// A well formed proof that cannot describe any trie.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Inconsistency {
    #[error("Fork neighbor nibble {nibble} at step {step} is the nibble of the key path")]
    ForkNibbleCollision { step: usize, nibble: u8 },
    #[error("Leaf neighbor nibble {nibble} at step {step} is the nibble of the key path")]
    LeafNibbleCollision { step: usize, nibble: u8 },
    #[error("Leaf neighbor key at step {step} does not share the first {cursor} nibbles of the key path")]
    LeafPathMismatch { step: usize, cursor: usize },
    #[error("Step {step} skips to nibble {next} of a {len} nibble key path")]
    SkipOverrun { step: usize, next: usize, len: usize },
}

/// Checks proofs with a given hash function and commitment scheme.
///
/// The default verifier uses Blake2b-256 and forestry commitments, which is
/// what the on-chain verifier expects.
#[derive(Debug, Default, Clone)]
pub struct Verifier<H = Blake2b256, C = MpfCommitment<H>> {
    hash: H,
    commitments: C,
}

impl<H: HashFunction, C: CommitmentScheme> Verifier<H, C> {
    pub fn new(hash: H, commitments: C) -> Self {
        Self { hash, commitments }
    }
    /// Decodes `proof_bytes` and checks that it links `key` to `expected_root`.
    ///
    /// With `including` the proof must show `key` holding `value`, otherwise
    /// that `key` is absent. A missing or empty root stands for the empty trie.
    /// `Ok(false)` means the proof is well formed but leads to another root.
    pub fn verify(
        &self,
        expected_root: Option<&[u8]>,
        key: &[u8],
        value: Option<&[u8]>,
        including: bool,
        proof_bytes: &[u8],
    ) -> Result<bool, ProofError> {
        let proof = decode(proof_bytes)?;
        self.verify_proof(expected_root, key, value, including, &proof)
    }
    /// As [`Verifier::verify`], for a proof that is already decoded.
    pub fn verify_proof(
        &self,
        expected_root: Option<&[u8]>,
        key: &[u8],
        value: Option<&[u8]>,
        including: bool,
        proof: &WireProof,
    ) -> Result<bool, ProofError> {
        let computed = self.compute_root(proof, key, value, including)?;
        let expected = match expected_root {
            Some(root) if !root.is_empty() => root.to_vec(),
            _ => self.commitments.null_hash(),
        };
        if computed != expected {
            log::debug!(
                "Proof root {} does not match expected root {}",
                hex_encode(&computed),
                hex_encode(&expected)
            );
            return Ok(false);
        }
        Ok(true)
    }
    /// Root of the trie the proof describes. The empty trie has the null hash.
    pub fn compute_root(
        &self,
        proof: &WireProof,
        key: &[u8],
        value: Option<&[u8]>,
        including: bool,
    ) -> Result<Hash, ProofError> {
        let leaf_value_hash = match (including, value) {
            (true, Some(value)) => Some(self.hash.digest(value)),
            (true, None) => return Err(ProofError::MissingValue),
            (false, _) => None,
        };
        let fold = Fold {
            hash: &self.hash,
            commitments: &self.commitments,
            steps: &proof.steps,
            path: NibblePath::from_bytes(&self.hash.digest(key)),
            leaf_value_hash,
        };
        let root = fold.node(0, 0)?;
        Ok(root.unwrap_or_else(|| self.commitments.null_hash()))
    }
}

/// Rebuilds the nodes along a single key path.
struct Fold<'a, H, C> {
    hash: &'a H,
    commitments: &'a C,
    steps: &'a [WireStep],
    path: NibblePath,
    /// Present for inclusion proofs.
    leaf_value_hash: Option<Hash>,
}

impl<'a, H: HashFunction, C: CommitmentScheme> Fold<'a, H, C> {
    fn including(&self) -> bool {
        self.leaf_value_hash.is_some()
    }

    /// Hash of the node reached at step `ix`, found at `cursor` nibbles down
    /// the path. `None` is an empty subtree.
    fn node(&self, ix: usize, cursor: usize) -> Result<Option<Hash>, ProofError> {
        let Some(step) = self.steps.get(ix) else {
            return match &self.leaf_value_hash {
                Some(value_hash) => {
                    let suffix = self.path.suffix_from(cursor)?;
                    Ok(Some(self.commitments.commit_leaf(&suffix, value_hash)))
                }
                None => Ok(None),
            };
        };
        // The fold never moves the cursor past the end of the path.
        let remaining = self.path.len() - cursor;
        if step.skip() >= remaining {
            log::debug!("Step {ix} skips past the end of the key path");
            return Err(Inconsistency::SkipOverrun {
                step: ix,
                next: cursor.saturating_add(1).saturating_add(step.skip()),
                len: self.path.len(),
            }
            .into());
        }
        let next = cursor + 1 + step.skip();
        let nibble = self.path.nibble_at(next - 1)?;
        let prefix = self.path.slice(cursor, next - 1)?;
        let terminal = ix + 1 == self.steps.len();
        log::trace!("Step {ix} at nibble {cursor}: skip {}, nibble {nibble}", step.skip());

        match step {
            WireStep::Branch {
                neighbors,
                value_hash,
                ..
            } => {
                let child = self.child(ix, next)?;
                let merkle = fold_neighbors(self.hash, nibble, &child, neighbors);
                Ok(Some(self.commitments.commit_branch_root(
                    &prefix,
                    &merkle,
                    value_hash.as_deref(),
                )))
            }
            WireStep::Fork { neighbor, .. } => {
                if neighbor.nibble == nibble {
                    log::debug!("Fork at step {ix} collides with the key path");
                    return Err(Inconsistency::ForkNibbleCollision {
                        step: ix,
                        nibble,
                    }
                    .into());
                }
                if terminal && !self.including() {
                    return Ok(Some(neighbor.root.clone()));
                }
                let child = self.child(ix, next)?;
                let neighbor_hash = self.fork_neighbor_hash(neighbor);
                Ok(Some(self.sparse(&prefix, (nibble, child), (neighbor.nibble, neighbor_hash))))
            }
            WireStep::Leaf {
                key_hash,
                value_hash,
                ..
            } => {
                let neighbor_path = NibblePath::from_bytes(key_hash);
                if neighbor_path.len() < next
                    || neighbor_path.slice(0, cursor)? != self.path.slice(0, cursor)?
                {
                    log::debug!("Leaf at step {ix} does not follow the key path");
                    return Err(Inconsistency::LeafPathMismatch { step: ix, cursor }.into());
                }
                let neighbor_nibble = neighbor_path.nibble_at(next - 1)?;
                if neighbor_nibble == nibble {
                    log::debug!("Leaf at step {ix} collides with the key path");
                    return Err(Inconsistency::LeafNibbleCollision {
                        step: ix,
                        nibble,
                    }
                    .into());
                }
                if terminal && !self.including() {
                    let suffix = neighbor_path.suffix_from(cursor)?;
                    return Ok(Some(self.commitments.commit_leaf(&suffix, value_hash)));
                }
                let child = self.child(ix, next)?;
                let suffix = neighbor_path.suffix_from(next)?;
                let neighbor_hash = self.commitments.commit_leaf(&suffix, value_hash);
                Ok(Some(self.sparse(&prefix, (nibble, child), (neighbor_nibble, neighbor_hash))))
            }
        }
    }

    /// Hash of the node below step `ix`, with the null hash for an empty subtree.
    fn child(&self, ix: usize, next: usize) -> Result<Hash, ProofError> {
        Ok(self
            .node(ix + 1, next)?
            .unwrap_or_else(|| self.commitments.null_hash()))
    }

    fn fork_neighbor_hash(&self, neighbor: &Neighbor) -> Hash {
        self.hash.digest(&concat(&[&neighbor.prefix, &neighbor.root]))
    }

    /// Commitment of a branch with exactly two children.
    fn sparse(&self, prefix: &NibblePath, me: (u8, Hash), neighbor: (u8, Hash)) -> Hash {
        let null_hash = self.commitments.null_hash();
        let merkle = sparse_merkle16(self.hash, &null_hash, me, neighbor);
        self.commitments.commit_branch_root(prefix, &merkle, None)
    }
}

/// Verifies proof bytes with Blake2b-256 and forestry commitments.
pub fn verify(
    expected_root: Option<&[u8]>,
    key: &[u8],
    value: Option<&[u8]>,
    including: bool,
    proof_bytes: &[u8],
) -> Result<bool, ProofError> {
    Verifier::<Blake2b256>::default().verify(expected_root, key, value, including, proof_bytes)
}

/// Verifies proof bytes with an explicit hash function and commitment scheme.
pub fn verify_with<H: HashFunction, C: CommitmentScheme>(
    expected_root: Option<&[u8]>,
    key: &[u8],
    value: Option<&[u8]>,
    including: bool,
    proof_bytes: &[u8],
    hash: H,
    commitments: C,
) -> Result<bool, ProofError> {
    Verifier::new(hash, commitments).verify(expected_root, key, value, including, proof_bytes)
}
