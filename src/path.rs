//! For addressing positions in a Merkle Patricia Forestry trie.
//!
//! The path of a key is defined as the hash of that key: H(key). A 32 byte
//! digest is therefore a path of 64 nibbles.
//!
//! Navigation is done in nibbles, with 16 choices at each level. Branches
//! may carry a prefix that skips a run of nibbles shared by all their
//! children, and leaves carry the suffix of the path that is left once the
//! leaf is reached.
//!
//! Inside proofs, sub-paths travel as one nibble per byte ("nibble bytes").
//! Leaf commitments instead use a packed encoding with a parity marker,
//! see [`encode_suffix`].
use std::fmt;

use thiserror::Error;

/// An error with a trie path.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PathError {
    #[error("Nibble must be in the range 0-15, got {0}")]
    InvalidNibble(u8),
    #[error("Character {0:?} is not a hex digit")]
    InvalidHexDigit(char),
    #[error("Unable to request nibble at index {index}, path has {len} nibbles")]
    InvalidIndex { index: usize, len: usize },
    #[error("Sub-path {start}..{end} is out of bounds for a path of {len} nibbles")]
    InvalidRange { start: usize, end: usize, len: usize },
}

/// A sequence of nibbles that represent a traversal from some node of the trie.
///
/// E.g., Path 5a1 follows child indices in this order: [5, 10, 1]
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NibblePath {
    // Nibble (u4) sequence represented as sequence of u8.
    nibbles: Vec<u8>,
}

impl NibblePath {
    /// The path with no nibbles.
    pub fn empty() -> Self {
        Self::default()
    }
    /// Turn a byte array into a nibble path, high nibble first.
    pub fn from_bytes(path_bytes: &[u8]) -> Self {
        let nibbles = path_bytes.iter().flat_map(byte_to_nibbles).collect();
        Self { nibbles }
    }
    /// Creates a path from nibbles, each represented as a u8.
    pub fn from_nibbles(nibbles: Vec<u8>) -> Result<Self, PathError> {
        if let Some(invalid) = nibbles.iter().find(|n| **n > 15) {
            return Err(PathError::InvalidNibble(*invalid));
        }
        Ok(Self { nibbles })
    }
    /// Creates a path from a hex string where every character is one nibble.
    ///
    /// Unlike byte hex, the string may have an odd length: "5a1" -> [5, 10, 1]
    pub fn from_hex(hex: &str) -> Result<Self, PathError> {
        let nibbles = hex
            .trim_start_matches("0x")
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or(PathError::InvalidHexDigit(c))
            })
            .collect::<Result<Vec<u8>, PathError>>()?;
        Ok(Self { nibbles })
    }
    pub fn len(&self) -> usize {
        self.nibbles.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }
    /// Returns the nibble at the specified index.
    pub fn nibble_at(&self, index: usize) -> Result<u8, PathError> {
        self.nibbles
            .get(index)
            .copied()
            .ok_or(PathError::InvalidIndex {
                index,
                len: self.len(),
            })
    }
    /// Returns the nibbles from `index` (inclusive) to the end of the path.
    pub fn suffix_from(&self, index: usize) -> Result<NibblePath, PathError> {
        self.slice(index, self.len())
    }
    /// Returns the nibbles in the half-open range `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<NibblePath, PathError> {
        let nibbles = self
            .nibbles
            .get(start..end)
            .ok_or(PathError::InvalidRange {
                start,
                end,
                len: self.len(),
            })?;
        Ok(Self {
            nibbles: nibbles.to_vec(),
        })
    }
    /// Appends another path to this one: [b, e] + [8, a] -> [b, e, 8, a]
    pub fn concat(&self, other: &NibblePath) -> NibblePath {
        let mut nibbles = Vec::with_capacity(self.len() + other.len());
        nibbles.extend_from_slice(&self.nibbles);
        nibbles.extend_from_slice(&other.nibbles);
        Self { nibbles }
    }
    /// Number of leading nibbles the two paths have in common.
    pub fn common_prefix_len(&self, other: &NibblePath) -> usize {
        self.nibbles
            .iter()
            .zip(other.nibbles.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }
    /// Returns the path as one nibble per byte. This is the form sub-paths
    /// take inside proofs and branch hashes.
    pub fn as_nibbles(&self) -> &[u8] {
        &self.nibbles
    }
    /// One hex character per nibble.
    pub fn to_hex(&self) -> String {
        self.nibbles
            .iter()
            .map(|n| char::from_digit(u32::from(*n), 16).unwrap_or('?'))
            .collect()
    }
}

impl fmt::Display for NibblePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Encodes a leaf suffix for a leaf commitment.
///
/// The parity of the suffix is carried by a marker byte so that odd and even
/// suffixes can never produce the same bytes:
/// - Even: `0xff` + packed nibbles. `[0xa, 0xb]` -> `[0xff, 0xab]`
/// - Odd: `0x00` + first nibble (as a byte) + packed remaining nibbles.
///   `[0x1, 0xa, 0xb]` -> `[0x00, 0x01, 0xab]`
pub fn encode_suffix(suffix: &NibblePath) -> Vec<u8> {
    let nibbles = suffix.as_nibbles();
    let mut encoded = Vec::with_capacity(nibbles.len() / 2 + 2);
    match nibbles.split_first() {
        Some((first, remaining)) if nibbles.len() % 2 == 1 => {
            encoded.push(0x00);
            encoded.push(*first);
            encoded.extend(pack_nibbles(remaining));
        }
        _ => {
            encoded.push(0xff);
            encoded.extend(pack_nibbles(nibbles));
        }
    }
    encoded
}

// Nibbles of a NibblePath are always in range and the caller ensures an even count.
fn pack_nibbles(nibbles: &[u8]) -> impl Iterator<Item = u8> + '_ {
    nibbles.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1])
}

/// Represents byte as an array of nibbles: 0xbc -> [0xb, 0xc]
pub fn byte_to_nibbles(byte: &u8) -> [u8; 2] {
    // 0xbc -> 0xb
    let high = byte >> 4;
    // 0xbc -> 0xc
    let low = byte & 0xF;
    [high, low]
}
