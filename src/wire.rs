//! The compressed proof, as it travels and as the on-chain verifier reads it.
//!
//! A wire proof is a CBOR array of steps. Each step is a Plutus data
//! constructor, i.e. a tagged array:
//!
//! ```text
//! 121([skip, neighbors, ?value_hash])          Branch
//! 122([skip, 121([nibble, prefix, root])])     Fork
//! 123([skip, key_hash, value_hash])            Leaf
//! ```
use ciborium::value::{Integer, Value};

use crate::{
    decode::{decode, DecodeError},
    hash::Hash,
    merkle::NEIGHBOR_COUNT,
    serialize::SerializeError,
};

/// Constructor 0: Branch step, and the Neighbor record inside a Fork step.
pub const TAG_BRANCH: u64 = 121;
/// Constructor 1: Fork step.
pub const TAG_FORK: u64 = 122;
/// Constructor 2: Leaf step.
pub const TAG_LEAF: u64 = 123;

/// The branch a proof path forks away from, described by a single nibble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    /// Slot of the neighbor branch in the parent.
    pub nibble: u8,
    /// Prefix of the neighbor branch, one nibble per byte.
    pub prefix: Vec<u8>,
    /// Merkle root of the neighbor branch, or its full commitment when the
    /// fork ends a non-inclusion proof.
    pub root: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireStep {
    Branch {
        skip: usize,
        /// Sibling subtree roots, top level first.
        neighbors: [Hash; NEIGHBOR_COUNT],
        value_hash: Option<Hash>,
    },
    Fork {
        skip: usize,
        neighbor: Neighbor,
    },
    Leaf {
        skip: usize,
        key_hash: Hash,
        value_hash: Hash,
    },
}

impl WireStep {
    pub fn skip(&self) -> usize {
        match self {
            WireStep::Branch { skip, .. }
            | WireStep::Fork { skip, .. }
            | WireStep::Leaf { skip, .. } => *skip,
        }
    }
    /// Plutus data form of the step.
    pub fn to_value(&self) -> Value {
        match self {
            WireStep::Branch {
                skip,
                neighbors,
                value_hash,
            } => {
                let mut fields = vec![uint(*skip), Value::Bytes(neighbors.concat())];
                if let Some(value_hash) = value_hash {
                    fields.push(Value::Bytes(value_hash.clone()));
                }
                tagged(TAG_BRANCH, fields)
            }
            WireStep::Fork { skip, neighbor } => {
                let neighbor = tagged(
                    TAG_BRANCH,
                    vec![
                        uint(usize::from(neighbor.nibble)),
                        Value::Bytes(neighbor.prefix.clone()),
                        Value::Bytes(neighbor.root.clone()),
                    ],
                );
                tagged(TAG_FORK, vec![uint(*skip), neighbor])
            }
            WireStep::Leaf {
                skip,
                key_hash,
                value_hash,
            } => tagged(
                TAG_LEAF,
                vec![
                    uint(*skip),
                    Value::Bytes(key_hash.clone()),
                    Value::Bytes(value_hash.clone()),
                ],
            ),
        }
    }
}

/// Proof steps ordered from the root down.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WireProof {
    pub steps: Vec<WireStep>,
}

impl WireProof {
    pub fn new(steps: Vec<WireStep>) -> Self {
        Self { steps }
    }
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    pub fn to_value(&self) -> Value {
        Value::Array(self.steps.iter().map(WireStep::to_value).collect())
    }
    /// Encodes the proof with definite lengths and minimal integer heads.
    pub fn to_cbor(&self) -> Result<Vec<u8>, SerializeError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(&self.to_value(), &mut bytes)?;
        Ok(bytes)
    }
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode(bytes)
    }
}

fn uint(n: usize) -> Value {
    Value::Integer(Integer::from(n as u64))
}

fn tagged(tag: u64, fields: Vec<Value>) -> Value {
    Value::Tag(tag, Box::new(Value::Array(fields)))
}
