//! Reading wire proofs back from CBOR.
//!
//! The decoder is strict about shape: every step must be one of the three
//! known constructors with exactly its fields, and nothing may follow the
//! top level array. Indefinite length arrays and byte strings are accepted,
//! as they carry the same data.
use ciborium::value::Value;
use thiserror::Error;

use crate::{
    hash::Hash,
    merkle::NEIGHBOR_COUNT,
    wire::{Neighbor, WireProof, WireStep, TAG_BRANCH, TAG_FORK, TAG_LEAF},
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid CBOR {0}")]
    Cbor(#[from] ciborium::de::Error<std::io::Error>),
    #[error("Expected an array for {0}")]
    ExpectedArray(&'static str),
    #[error("Expected a byte string for {0}")]
    ExpectedBytes(&'static str),
    #[error("Expected an unsigned integer for {0}")]
    ExpectedUint(&'static str),
    #[error("{step} step expects {expected} fields, got {got}")]
    InvalidArity {
        step: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("Branch neighbors must be a non-empty multiple of 4 bytes, got {0} bytes")]
    InvalidNeighborsLength(usize),
    #[error("Nibble must be in the range 0-15, got {0}")]
    NibbleOutOfRange(u64),
    #[error("Proof has {0} trailing bytes after the step array")]
    TrailingBytes(usize),
    #[error("Expected tag {expected} for {context}, got {got}")]
    UnexpectedTag {
        context: &'static str,
        expected: u64,
        got: u64,
    },
    #[error("Fork neighbor is not a tagged constructor")]
    UntaggedNeighbor,
    #[error("Step {0} is not a tagged constructor")]
    UntaggedStep(usize),
    #[error("Unknown step tag {0}")]
    UnknownTag(u64),
}

/// Decodes proof bytes into a wire proof. Never returns a partial proof.
pub fn decode(bytes: &[u8]) -> Result<WireProof, DecodeError> {
    let mut reader = bytes;
    let value: Value = ciborium::from_reader(&mut reader)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes(reader.len()));
    }
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(DecodeError::ExpectedArray("proof")),
    };
    let steps = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_step(index, item))
        .collect::<Result<Vec<WireStep>, DecodeError>>()?;
    log::trace!("Decoded proof with {} steps", steps.len());
    Ok(WireProof::new(steps))
}

fn decode_step(index: usize, item: Value) -> Result<WireStep, DecodeError> {
    let (tag, inner) = match item {
        Value::Tag(tag, inner) => (tag, *inner),
        _ => return Err(DecodeError::UntaggedStep(index)),
    };
    match tag {
        TAG_BRANCH => decode_branch(inner),
        TAG_FORK => decode_fork(inner),
        TAG_LEAF => decode_leaf(inner),
        unknown => Err(DecodeError::UnknownTag(unknown)),
    }
}

fn decode_branch(inner: Value) -> Result<WireStep, DecodeError> {
    let fields = as_array(inner, "branch step")?;
    if !(2..=3).contains(&fields.len()) {
        return Err(DecodeError::InvalidArity {
            step: "Branch",
            expected: "2 or 3",
            got: fields.len(),
        });
    }
    let mut fields = fields.into_iter();
    let skip = next_uint(&mut fields, "branch skip")?;
    let neighbors = split_neighbors(&next_bytes(&mut fields, "branch neighbors")?)?;
    let value_hash = match fields.next() {
        Some(value) => Some(as_bytes(value, "branch value hash")?),
        None => None,
    };
    Ok(WireStep::Branch {
        skip: to_usize(skip, "branch skip")?,
        neighbors,
        value_hash,
    })
}

fn decode_fork(inner: Value) -> Result<WireStep, DecodeError> {
    let fields = as_array(inner, "fork step")?;
    if fields.len() != 2 {
        return Err(DecodeError::InvalidArity {
            step: "Fork",
            expected: "2",
            got: fields.len(),
        });
    }
    let mut fields = fields.into_iter();
    let skip = next_uint(&mut fields, "fork skip")?;
    let neighbor = match fields.next() {
        Some(Value::Tag(TAG_BRANCH, neighbor)) => *neighbor,
        Some(Value::Tag(got, _)) => {
            return Err(DecodeError::UnexpectedTag {
                context: "fork neighbor",
                expected: TAG_BRANCH,
                got,
            })
        }
        _ => return Err(DecodeError::UntaggedNeighbor),
    };
    let neighbor_fields = as_array(neighbor, "fork neighbor")?;
    if neighbor_fields.len() != 3 {
        return Err(DecodeError::InvalidArity {
            step: "Fork neighbor",
            expected: "3",
            got: neighbor_fields.len(),
        });
    }
    let mut neighbor_fields = neighbor_fields.into_iter();
    let nibble = next_uint(&mut neighbor_fields, "fork neighbor nibble")?;
    if nibble > 15 {
        return Err(DecodeError::NibbleOutOfRange(nibble));
    }
    let prefix = next_bytes(&mut neighbor_fields, "fork neighbor prefix")?;
    let root = next_bytes(&mut neighbor_fields, "fork neighbor root")?;
    Ok(WireStep::Fork {
        skip: to_usize(skip, "fork skip")?,
        neighbor: Neighbor {
            nibble: nibble as u8,
            prefix,
            root,
        },
    })
}

fn decode_leaf(inner: Value) -> Result<WireStep, DecodeError> {
    let fields = as_array(inner, "leaf step")?;
    if fields.len() != 3 {
        return Err(DecodeError::InvalidArity {
            step: "Leaf",
            expected: "3",
            got: fields.len(),
        });
    }
    let mut fields = fields.into_iter();
    let skip = next_uint(&mut fields, "leaf skip")?;
    let key_hash = next_bytes(&mut fields, "leaf key hash")?;
    let value_hash = next_bytes(&mut fields, "leaf value hash")?;
    Ok(WireStep::Leaf {
        skip: to_usize(skip, "leaf skip")?,
        key_hash,
        value_hash,
    })
}

/// Splits concatenated branch neighbors into 4 equal chunks.
pub(crate) fn split_neighbors(bytes: &[u8]) -> Result<[Hash; NEIGHBOR_COUNT], DecodeError> {
    if bytes.is_empty() || bytes.len() % NEIGHBOR_COUNT != 0 {
        return Err(DecodeError::InvalidNeighborsLength(bytes.len()));
    }
    let width = bytes.len() / NEIGHBOR_COUNT;
    let mut neighbors: [Hash; NEIGHBOR_COUNT] = Default::default();
    for (neighbor, chunk) in neighbors.iter_mut().zip(bytes.chunks_exact(width)) {
        *neighbor = chunk.to_vec();
    }
    Ok(neighbors)
}

fn as_array(value: Value, context: &'static str) -> Result<Vec<Value>, DecodeError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(DecodeError::ExpectedArray(context)),
    }
}

fn as_bytes(value: Value, context: &'static str) -> Result<Vec<u8>, DecodeError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        _ => Err(DecodeError::ExpectedBytes(context)),
    }
}

fn as_uint(value: Value, context: &'static str) -> Result<u64, DecodeError> {
    match value {
        Value::Integer(n) => u64::try_from(n).map_err(|_| DecodeError::ExpectedUint(context)),
        _ => Err(DecodeError::ExpectedUint(context)),
    }
}

fn next_uint(
    fields: &mut impl Iterator<Item = Value>,
    context: &'static str,
) -> Result<u64, DecodeError> {
    let value = fields.next().ok_or(DecodeError::ExpectedUint(context))?;
    as_uint(value, context)
}

fn next_bytes(
    fields: &mut impl Iterator<Item = Value>,
    context: &'static str,
) -> Result<Vec<u8>, DecodeError> {
    let value = fields.next().ok_or(DecodeError::ExpectedBytes(context))?;
    as_bytes(value, context)
}

fn to_usize(n: u64, context: &'static str) -> Result<usize, DecodeError> {
    usize::try_from(n).map_err(|_| DecodeError::ExpectedUint(context))
}
