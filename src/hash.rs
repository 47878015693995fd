//! Hash functions used to build trie paths and commitments.
use blake2::{digest::consts::U32, Blake2b, Digest};

/// A hash digest. The length is set by the hash function that produced it.
pub type Hash = Vec<u8>;

/// A function from arbitrary bytes to a fixed length digest.
pub trait HashFunction {
    fn digest(&self, data: &[u8]) -> Hash;
    /// Length in bytes of every digest this function produces.
    fn output_len(&self) -> usize {
        self.digest(&[]).len()
    }
}

impl<F> HashFunction for F
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    fn digest(&self, data: &[u8]) -> Hash {
        self(data)
    }
}

/// Blake2b with a 256 bit output. The hash of the on-chain verifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Blake2b256;

impl HashFunction for Blake2b256 {
    fn digest(&self, data: &[u8]) -> Hash {
        Blake2b::<U32>::digest(data).to_vec()
    }
    fn output_len(&self) -> usize {
        32
    }
}
