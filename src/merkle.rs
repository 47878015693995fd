//! Binary merkle trees over the 16 children of a branch.
//!
//! A branch commits to its children through a perfect binary tree of depth 4.
//! A proof does not carry all 16 children, only the 4 roots of the sibling
//! subtrees met on the way from the selected child up to the top. These are
//! the "neighbors" of that child.
use crate::hash::{Hash, HashFunction};

/// Number of children of a branch.
pub const BRANCH_WIDTH: usize = 16;
/// Number of sibling subtree roots between a child and the branch merkle root.
pub const NEIGHBOR_COUNT: usize = 4;

/// Merkle root of a power-of-two sized list of nodes.
///
/// Pairs are hashed left to right, layer by layer, as `H(left ‖ right)`.
pub fn merkle_root<H: HashFunction>(hash: &H, nodes: &[Hash]) -> Hash {
    match nodes {
        [] => Hash::new(),
        [single] => single.clone(),
        _ => {
            let (left, right) = nodes.split_at(nodes.len() / 2);
            let mut pair = merkle_root(hash, left);
            pair.extend(merkle_root(hash, right));
            hash.digest(&pair)
        }
    }
}

/// Replaces absent children with the null hash.
pub fn fill_children(children: &[Option<Hash>; BRANCH_WIDTH], null_hash: &[u8]) -> Vec<Hash> {
    children
        .iter()
        .map(|child| child.clone().unwrap_or_else(|| null_hash.to_vec()))
        .collect()
}

/// Merkle root of all 16 children of a branch.
pub fn merkle16<H: HashFunction>(
    hash: &H,
    children: &[Option<Hash>; BRANCH_WIDTH],
    null_hash: &[u8],
) -> Hash {
    merkle_root(hash, &fill_children(children, null_hash))
}

/// Compresses 16 children into the 4 neighbors of child `me`, top level first.
///
/// The first neighbor is the root of the half not containing `me`, the second
/// the root of the quarter next to `me` within its half, and so on down to the
/// sibling leaf.
pub fn neighbors<H: HashFunction>(
    hash: &H,
    children: &[Option<Hash>; BRANCH_WIDTH],
    me: u8,
    null_hash: &[u8],
) -> [Hash; NEIGHBOR_COUNT] {
    let nodes = fill_children(children, null_hash);
    let me = usize::from(me);
    let mut found: [Hash; NEIGHBOR_COUNT] = Default::default();
    let mut pivot = 8;
    let mut n = 8;
    for neighbor in found.iter_mut() {
        if me < pivot {
            *neighbor = merkle_root(hash, &nodes[pivot..pivot + n]);
            pivot -= n / 2;
        } else {
            *neighbor = merkle_root(hash, &nodes[pivot - n..pivot]);
            pivot += n / 2;
        }
        n /= 2;
    }
    found
}

/// Rebuilds the branch merkle root from one child and its 4 neighbors.
///
/// Walks from the deepest neighbor (index 3) up to the top (index 0). Bit
/// `3 - i` of the nibble places the accumulator on the right (bit set) or on
/// the left (bit clear) of neighbor `i`.
pub fn fold_neighbors<H: HashFunction>(
    hash: &H,
    nibble: u8,
    me: &[u8],
    neighbors: &[Hash; NEIGHBOR_COUNT],
) -> Hash {
    let mut acc = me.to_vec();
    for (i, neighbor) in neighbors.iter().enumerate().rev() {
        let bit = (nibble >> (3 - i)) & 1;
        let mut pair = Vec::with_capacity(acc.len() + neighbor.len());
        match bit == 1 {
            true => {
                pair.extend_from_slice(neighbor);
                pair.extend_from_slice(&acc);
            }
            false => {
                pair.extend_from_slice(&acc);
                pair.extend_from_slice(neighbor);
            }
        }
        acc = hash.digest(&pair);
    }
    acc
}

/// Merkle root of a branch that has exactly two non-null children.
pub fn sparse_merkle16<H: HashFunction>(
    hash: &H,
    null_hash: &[u8],
    me: (u8, Hash),
    neighbor: (u8, Hash),
) -> Hash {
    let mut children: [Option<Hash>; BRANCH_WIDTH] = Default::default();
    children[usize::from(me.0 & 0xf)] = Some(me.1);
    children[usize::from(neighbor.0 & 0xf)] = Some(neighbor.1);
    merkle16(hash, &children, null_hash)
}
