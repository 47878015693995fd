//! The raw proof captured while walking a trie from its root towards a key.
//!
//! A [`TraversalProof`] records every node met on the way down in full, as
//! the trie sees it. It is the input to [`crate::serialize`], which compresses
//! it into the wire form.
use thiserror::Error;

use crate::{
    hash::Hash,
    merkle::BRANCH_WIDTH,
    path::NibblePath,
};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TraversalError {
    #[error("Branch child index must be in the range 0-15, got {0}")]
    ChildIndexOutOfRange(usize),
    #[error("{0} must not be empty")]
    EmptyHash(&'static str),
    #[error("Fork neighbor nibble must be in the range 0-15, got {0}")]
    NibbleOutOfRange(u8),
    #[error("Branch has at most 16 children, got {0}")]
    TooManyChildren(usize),
}

/// What a traversal proof demonstrates about its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// The key is present with a value.
    Inclusion,
    /// The walk reached an empty slot, or a branch whose prefix diverges from the key.
    NonInclusionMissingBranch,
    /// The walk reached a leaf that belongs to another key.
    NonInclusionDifferentLeaf,
}

/// A branch passed through on the way down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStep {
    skip_path: NibblePath,
    child_hashes: [Option<Hash>; BRANCH_WIDTH],
    child_index: u8,
    branch_value_hash: Option<Hash>,
}

impl BranchStep {
    /// Records a branch with prefix `skip_path` whose child `child_index` was followed.
    ///
    /// Fewer than 16 children are padded with absent ones. Empty hashes are
    /// treated as absent.
    pub fn new(
        skip_path: NibblePath,
        child_hashes: Vec<Option<Hash>>,
        child_index: usize,
        branch_value_hash: Option<Hash>,
    ) -> Result<Self, TraversalError> {
        if child_index >= BRANCH_WIDTH {
            return Err(TraversalError::ChildIndexOutOfRange(child_index));
        }
        if child_hashes.len() > BRANCH_WIDTH {
            return Err(TraversalError::TooManyChildren(child_hashes.len()));
        }
        let mut children: [Option<Hash>; BRANCH_WIDTH] = Default::default();
        for (slot, child) in children.iter_mut().zip(child_hashes) {
            *slot = child.filter(|hash| !hash.is_empty());
        }
        Ok(Self {
            skip_path,
            child_hashes: children,
            child_index: child_index as u8,
            branch_value_hash: branch_value_hash.filter(|hash| !hash.is_empty()),
        })
    }
    pub fn skip_path(&self) -> &NibblePath {
        &self.skip_path
    }
    pub fn child_hashes(&self) -> &[Option<Hash>; BRANCH_WIDTH] {
        &self.child_hashes
    }
    pub fn child_index(&self) -> u8 {
        self.child_index
    }
    pub fn branch_value_hash(&self) -> Option<&[u8]> {
        self.branch_value_hash.as_deref()
    }
}

/// A branch whose prefix diverges from the key being proven.
///
/// The query path and the branch prefix share `skip_path`, then part at
/// `neighbor_nibble`. The rest of the branch prefix is `suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkStep {
    skip_path: NibblePath,
    neighbor_nibble: u8,
    suffix: NibblePath,
    neighbor_root: Option<Hash>,
}

impl ForkStep {
    pub fn new(
        skip_path: NibblePath,
        neighbor_nibble: u8,
        suffix: NibblePath,
        neighbor_root: Option<Hash>,
    ) -> Result<Self, TraversalError> {
        if neighbor_nibble > 15 {
            return Err(TraversalError::NibbleOutOfRange(neighbor_nibble));
        }
        Ok(Self {
            skip_path,
            neighbor_nibble,
            suffix,
            neighbor_root: neighbor_root.filter(|hash| !hash.is_empty()),
        })
    }
    pub fn skip_path(&self) -> &NibblePath {
        &self.skip_path
    }
    pub fn neighbor_nibble(&self) -> u8 {
        self.neighbor_nibble
    }
    pub fn suffix(&self) -> &NibblePath {
        &self.suffix
    }
    /// Commitment of the diverging branch. `None` stands for the null hash.
    pub fn neighbor_root(&self) -> Option<&[u8]> {
        self.neighbor_root.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalStep {
    Branch(BranchStep),
    Fork(ForkStep),
}

impl TraversalStep {
    pub fn skip_path(&self) -> &NibblePath {
        match self {
            TraversalStep::Branch(branch) => branch.skip_path(),
            TraversalStep::Fork(fork) => fork.skip_path(),
        }
    }
    /// Number of nibbles skipped before the nibble this step selects on.
    pub fn skip(&self) -> usize {
        self.skip_path().len()
    }
}

impl From<BranchStep> for TraversalStep {
    fn from(step: BranchStep) -> Self {
        TraversalStep::Branch(step)
    }
}

impl From<ForkStep> for TraversalStep {
    fn from(step: ForkStep) -> Self {
        TraversalStep::Fork(step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Inclusion {
        value: Vec<u8>,
        value_hash: Hash,
        suffix: NibblePath,
    },
    MissingBranch,
    DifferentLeaf {
        key_hash: Hash,
        value_hash: Hash,
        suffix: NibblePath,
    },
}

/// Steps from the root down, then what was found at the end of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalProof {
    steps: Vec<TraversalStep>,
    terminal: Terminal,
}

impl TraversalProof {
    /// The key is present. `suffix` is the remainder of the path stored in its leaf.
    pub fn inclusion(
        steps: Vec<TraversalStep>,
        value: Vec<u8>,
        value_hash: Hash,
        suffix: NibblePath,
    ) -> Result<Self, TraversalError> {
        if value_hash.is_empty() {
            return Err(TraversalError::EmptyHash("Value hash"));
        }
        Ok(Self {
            steps,
            terminal: Terminal::Inclusion {
                value,
                value_hash,
                suffix,
            },
        })
    }
    pub fn non_inclusion_missing_branch(steps: Vec<TraversalStep>) -> Self {
        Self {
            steps,
            terminal: Terminal::MissingBranch,
        }
    }
    /// The walk ended at the leaf of another key, with key hash `conflicting_key_hash`.
    pub fn non_inclusion_different_leaf(
        steps: Vec<TraversalStep>,
        conflicting_key_hash: Hash,
        conflicting_value_hash: Hash,
        conflicting_suffix: NibblePath,
    ) -> Result<Self, TraversalError> {
        if conflicting_key_hash.is_empty() {
            return Err(TraversalError::EmptyHash("Conflicting key hash"));
        }
        if conflicting_value_hash.is_empty() {
            return Err(TraversalError::EmptyHash("Conflicting value hash"));
        }
        Ok(Self {
            steps,
            terminal: Terminal::DifferentLeaf {
                key_hash: conflicting_key_hash,
                value_hash: conflicting_value_hash,
                suffix: conflicting_suffix,
            },
        })
    }
    pub fn kind(&self) -> ProofKind {
        match self.terminal {
            Terminal::Inclusion { .. } => ProofKind::Inclusion,
            Terminal::MissingBranch => ProofKind::NonInclusionMissingBranch,
            Terminal::DifferentLeaf { .. } => ProofKind::NonInclusionDifferentLeaf,
        }
    }
    pub fn steps(&self) -> &[TraversalStep] {
        &self.steps
    }
    /// Nibbles of the key path accounted for by the steps: Σ(1 + skip).
    pub fn consumed_nibbles(&self) -> usize {
        self.steps.iter().map(|step| 1 + step.skip()).sum()
    }
    pub fn value(&self) -> Option<&[u8]> {
        match &self.terminal {
            Terminal::Inclusion { value, .. } => Some(value),
            _ => None,
        }
    }
    pub fn value_hash(&self) -> Option<&[u8]> {
        match &self.terminal {
            Terminal::Inclusion { value_hash, .. } => Some(value_hash),
            _ => None,
        }
    }
    pub fn suffix(&self) -> Option<&NibblePath> {
        match &self.terminal {
            Terminal::Inclusion { suffix, .. } => Some(suffix),
            _ => None,
        }
    }
    pub fn conflicting_key_hash(&self) -> Option<&[u8]> {
        match &self.terminal {
            Terminal::DifferentLeaf { key_hash, .. } => Some(key_hash),
            _ => None,
        }
    }
    pub fn conflicting_value_hash(&self) -> Option<&[u8]> {
        match &self.terminal {
            Terminal::DifferentLeaf { value_hash, .. } => Some(value_hash),
            _ => None,
        }
    }
    pub fn conflicting_suffix(&self) -> Option<&NibblePath> {
        match &self.terminal {
            Terminal::DifferentLeaf { suffix, .. } => Some(suffix),
            _ => None,
        }
    }
}
