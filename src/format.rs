//! Human readable renderings of a wire proof.
//!
//! JSON for tooling, and the Aiken source literal used when writing on-chain
//! test cases. Hex strings carry no 0x prefix in either form.
use hex::FromHexError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    decode::{decode, split_neighbors, DecodeError},
    wire::{Neighbor, WireProof, WireStep},
};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Decode error {0}")]
    DecodeError(#[from] DecodeError),
    #[error("Hex error {0}")]
    FromHexError(#[from] FromHexError),
    #[error("JSON error {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Nibble must be in the range 0-15, got {0}")]
    NibbleOutOfRange(u8),
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JsonStep {
    Branch {
        skip: usize,
        neighbors: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Fork {
        skip: usize,
        neighbor: JsonForkNeighbor,
    },
    Leaf {
        skip: usize,
        neighbor: JsonLeafNeighbor,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct JsonForkNeighbor {
    nibble: u8,
    prefix: String,
    root: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct JsonLeafNeighbor {
    key: String,
    value: String,
}

fn json_step(step: &WireStep) -> JsonStep {
    match step {
        WireStep::Branch {
            skip,
            neighbors,
            value_hash,
        } => JsonStep::Branch {
            skip: *skip,
            neighbors: hex::encode(neighbors.concat()),
            value: value_hash.as_ref().map(hex::encode),
        },
        WireStep::Fork { skip, neighbor } => JsonStep::Fork {
            skip: *skip,
            neighbor: JsonForkNeighbor {
                nibble: neighbor.nibble,
                prefix: hex::encode(&neighbor.prefix),
                root: hex::encode(&neighbor.root),
            },
        },
        WireStep::Leaf {
            skip,
            key_hash,
            value_hash,
        } => JsonStep::Leaf {
            skip: *skip,
            neighbor: JsonLeafNeighbor {
                key: hex::encode(key_hash),
                value: hex::encode(value_hash),
            },
        },
    }
}

fn wire_step(step: JsonStep) -> Result<WireStep, FormatError> {
    Ok(match step {
        JsonStep::Branch {
            skip,
            neighbors,
            value,
        } => WireStep::Branch {
            skip,
            neighbors: split_neighbors(&hex::decode(neighbors)?)?,
            value_hash: value.map(hex::decode).transpose()?,
        },
        JsonStep::Fork { skip, neighbor } => {
            if neighbor.nibble > 15 {
                return Err(FormatError::NibbleOutOfRange(neighbor.nibble));
            }
            WireStep::Fork {
                skip,
                neighbor: Neighbor {
                    nibble: neighbor.nibble,
                    prefix: hex::decode(neighbor.prefix)?,
                    root: hex::decode(neighbor.root)?,
                },
            }
        }
        JsonStep::Leaf { skip, neighbor } => WireStep::Leaf {
            skip,
            key_hash: hex::decode(neighbor.key)?,
            value_hash: hex::decode(neighbor.value)?,
        },
    })
}

/// Compact JSON array of steps.
pub fn to_json(proof: &WireProof) -> Result<String, FormatError> {
    let steps: Vec<JsonStep> = proof.steps.iter().map(json_step).collect();
    Ok(serde_json::to_string(&steps)?)
}

pub fn from_json(json: &str) -> Result<WireProof, FormatError> {
    let steps: Vec<JsonStep> = serde_json::from_str(json)?;
    let steps = steps
        .into_iter()
        .map(wire_step)
        .collect::<Result<Vec<WireStep>, FormatError>>()?;
    Ok(WireProof::new(steps))
}

/// The proof as an Aiken `Proof` literal.
pub fn to_aiken(proof: &WireProof) -> String {
    let mut out = String::from("[\n");
    for step in &proof.steps {
        let line = match step {
            WireStep::Branch { skip, neighbors, .. } => format!(
                "  Branch {{ skip: {skip}, neighbors: #\"{}\" }},\n",
                hex::encode(neighbors.concat())
            ),
            WireStep::Fork { skip, neighbor } => format!(
                "  Fork {{ skip: {skip}, neighbor: Neighbor {{ nibble: {}, prefix: #\"{}\", root: #\"{}\" }} }},\n",
                neighbor.nibble,
                hex::encode(&neighbor.prefix),
                hex::encode(&neighbor.root)
            ),
            WireStep::Leaf {
                skip,
                key_hash,
                value_hash,
            } => format!(
                "  Leaf {{ skip: {skip}, key: #\"{}\", value: #\"{}\" }},\n",
                hex::encode(key_hash),
                hex::encode(value_hash)
            ),
        };
        out.push_str(&line);
    }
    out.push(']');
    out
}

/// Decodes proof bytes, then renders them as JSON.
pub fn json_from_cbor(proof_bytes: &[u8]) -> Result<String, FormatError> {
    to_json(&decode(proof_bytes)?)
}

/// Decodes proof bytes, then renders them as an Aiken literal.
pub fn aiken_from_cbor(proof_bytes: &[u8]) -> Result<String, FormatError> {
    Ok(to_aiken(&decode(proof_bytes)?))
}
