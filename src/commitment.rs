//! How leaves and branches commit to their content.
use crate::{
    hash::{Blake2b256, Hash, HashFunction},
    merkle::{merkle16, BRANCH_WIDTH},
    path::{encode_suffix, NibblePath},
    utils::concat,
};

/// The rules that turn trie nodes into hashes.
pub trait CommitmentScheme {
    /// Hash of a leaf holding the value with hash `value_hash` at the end of `suffix`.
    fn commit_leaf(&self, suffix: &NibblePath, value_hash: &[u8]) -> Hash;
    /// Hash of a branch from its prefix and the merkle root of its children.
    fn commit_branch_root(
        &self,
        prefix: &NibblePath,
        children_root: &[u8],
        value_hash: Option<&[u8]>,
    ) -> Hash;
    /// Hash of a branch from its prefix and its 16 children.
    fn commit_branch(
        &self,
        prefix: &NibblePath,
        children: &[Option<Hash>; BRANCH_WIDTH],
        value_hash: Option<&[u8]>,
    ) -> Hash;
    /// Hash standing in for an empty subtree.
    fn null_hash(&self) -> Hash;
}

/// Commitments compatible with the on-chain Merkle Patricia Forestry verifier.
///
/// - null: all zero bytes, as long as a digest.
/// - leaf: `H(encode_suffix(suffix) ‖ value_hash)`
/// - branch: `H(prefix nibbles ‖ merkle16(children))`
///
/// Forestry keys are all digests of the same length, so no key is ever the
/// prefix of another and branches never hold a value. A branch value hash is
/// still folded in when one is supplied: `M = H(M ‖ commit_leaf([], value_hash))`.
#[derive(Debug, Default, Clone)]
pub struct MpfCommitment<H = Blake2b256> {
    hash: H,
}

impl<H: HashFunction> MpfCommitment<H> {
    pub fn new(hash: H) -> Self {
        Self { hash }
    }
}

impl<H: HashFunction> CommitmentScheme for MpfCommitment<H> {
    fn commit_leaf(&self, suffix: &NibblePath, value_hash: &[u8]) -> Hash {
        let mut preimage = encode_suffix(suffix);
        preimage.extend_from_slice(value_hash);
        self.hash.digest(&preimage)
    }
    fn commit_branch_root(
        &self,
        prefix: &NibblePath,
        children_root: &[u8],
        value_hash: Option<&[u8]>,
    ) -> Hash {
        let merkle = match value_hash {
            Some(value_hash) => {
                let mut preimage = children_root.to_vec();
                preimage.extend(self.commit_leaf(&NibblePath::empty(), value_hash));
                self.hash.digest(&preimage)
            }
            None => children_root.to_vec(),
        };
        self.hash.digest(&concat(&[prefix.as_nibbles(), &merkle]))
    }
    fn commit_branch(
        &self,
        prefix: &NibblePath,
        children: &[Option<Hash>; BRANCH_WIDTH],
        value_hash: Option<&[u8]>,
    ) -> Hash {
        let root = merkle16(&self.hash, children, &self.null_hash());
        self.commit_branch_root(prefix, &root, value_hash)
    }
    fn null_hash(&self) -> Hash {
        vec![0u8; self.hash.output_len()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null_hash_length_follows_hash() {
        assert_eq!(MpfCommitment::<Blake2b256>::default().null_hash(), vec![0u8; 32]);
        let short = MpfCommitment::new(|data: &[u8]| Blake2b256.digest(data)[..20].to_vec());
        assert_eq!(short.null_hash(), vec![0u8; 20]);
    }

    #[test]
    fn test_commit_leaf_even_and_odd_suffix() {
        let scheme = MpfCommitment::<Blake2b256>::default();
        let value_hash = Blake2b256.digest(b"value");

        let even = NibblePath::from_hex("abcd").unwrap();
        let mut preimage = hex::decode("ffabcd").unwrap();
        preimage.extend(&value_hash);
        assert_eq!(
            scheme.commit_leaf(&even, &value_hash),
            Blake2b256.digest(&preimage)
        );

        let odd = NibblePath::from_hex("abc").unwrap();
        let mut preimage = hex::decode("000abc").unwrap();
        preimage.extend(&value_hash);
        assert_eq!(
            scheme.commit_leaf(&odd, &value_hash),
            Blake2b256.digest(&preimage)
        );
    }

    #[test]
    fn test_commit_branch_uses_nibble_bytes_prefix() {
        let scheme = MpfCommitment::<Blake2b256>::default();
        let mut children: [Option<Hash>; BRANCH_WIDTH] = Default::default();
        children[0] = Some(Blake2b256.digest(b"zero"));
        children[15] = Some(Blake2b256.digest(b"fifteen"));
        let prefix = NibblePath::from_hex("7a").unwrap();

        let root = merkle16(&Blake2b256, &children, &[0u8; 32]);
        let mut preimage = vec![0x07, 0x0a];
        preimage.extend(&root);
        assert_eq!(
            scheme.commit_branch(&prefix, &children, None),
            Blake2b256.digest(&preimage)
        );
    }

    #[test]
    fn test_branch_value_changes_commitment() {
        let scheme = MpfCommitment::<Blake2b256>::default();
        let mut children: [Option<Hash>; BRANCH_WIDTH] = Default::default();
        children[4] = Some(Blake2b256.digest(b"four"));
        let prefix = NibblePath::empty();
        let value_hash = Blake2b256.digest(b"branch value");

        let without = scheme.commit_branch(&prefix, &children, None);
        let with = scheme.commit_branch(&prefix, &children, Some(&value_hash));
        assert_ne!(without, with);

        let root = merkle16(&Blake2b256, &children, &[0u8; 32]);
        let mut folded = root;
        folded.extend(scheme.commit_leaf(&prefix, &value_hash));
        let expected = Blake2b256.digest(&Blake2b256.digest(&folded));
        assert_eq!(with, expected);
    }
}
