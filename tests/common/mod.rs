//! Shared helpers for the integration tests.
//!
//! Holds a small in-memory forestry trie. It computes roots independently of
//! the proof code and captures traversal proofs the way a real trie would.
#![allow(dead_code)]
use std::{fs::File, io::BufReader};

use mpf_proof::{
    serialize_default, utils::hex_decode, Blake2b256, BranchStep, CommitmentScheme, ForkStep,
    Hash, HashFunction, MpfCommitment, NibblePath, TraversalProof, TraversalStep,
};
use serde::Deserialize;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn blake(data: &[u8]) -> Hash {
    Blake2b256.digest(data)
}

pub fn bytes(hex: &str) -> Vec<u8> {
    hex_decode(hex).unwrap()
}

enum Node {
    Leaf {
        suffix: NibblePath,
        value: Vec<u8>,
        key_hash: Hash,
    },
    Branch {
        prefix: NibblePath,
        children: Box<[Option<Node>; 16]>,
    },
}

fn leaf(path: &NibblePath, from: usize, value: Vec<u8>, key_hash: Hash) -> Node {
    Node::Leaf {
        suffix: path.suffix_from(from).unwrap(),
        value,
        key_hash,
    }
}

/// Forestry trie keyed by H(key).
#[derive(Default)]
pub struct ReferenceTrie {
    root: Option<Node>,
    scheme: MpfCommitment<Blake2b256>,
}

impl ReferenceTrie {
    pub fn from_entries<K: AsRef<[u8]>, V: AsRef<[u8]>>(entries: &[(K, V)]) -> Self {
        let mut trie = Self::default();
        for (key, value) in entries {
            trie.put(key.as_ref(), value.as_ref());
        }
        trie
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        let key_hash = blake(key);
        let path = NibblePath::from_bytes(&key_hash);
        let root = self.root.take();
        self.root = Some(insert(root, &path, 0, value.to_vec(), key_hash));
    }

    pub fn root_hash(&self) -> Hash {
        match &self.root {
            Some(node) => self.hash(node),
            None => self.scheme.null_hash(),
        }
    }

    fn hash(&self, node: &Node) -> Hash {
        match node {
            Node::Leaf { suffix, value, .. } => self.scheme.commit_leaf(suffix, &blake(value)),
            Node::Branch { prefix, children } => {
                let mut hashes: [Option<Hash>; 16] = Default::default();
                for (slot, child) in hashes.iter_mut().zip(children.iter()) {
                    *slot = child.as_ref().map(|child| self.hash(child));
                }
                self.scheme.commit_branch(prefix, &hashes, None)
            }
        }
    }

    fn child_hashes(&self, children: &[Option<Node>; 16]) -> Vec<Option<Hash>> {
        children
            .iter()
            .map(|child| child.as_ref().map(|child| self.hash(child)))
            .collect()
    }

    /// Walks from the root towards `key`, recording every node met.
    pub fn traversal_proof(&self, key: &[u8]) -> TraversalProof {
        let path = NibblePath::from_bytes(&blake(key));
        let mut steps: Vec<TraversalStep> = vec![];
        let mut cursor = 0;
        let mut node = self.root.as_ref();
        loop {
            let Some(current) = node else {
                return TraversalProof::non_inclusion_missing_branch(steps);
            };
            let rest = path.suffix_from(cursor).unwrap();
            match current {
                Node::Leaf {
                    suffix,
                    value,
                    key_hash,
                } => {
                    if *suffix == rest {
                        return TraversalProof::inclusion(
                            steps,
                            value.clone(),
                            blake(value),
                            suffix.clone(),
                        )
                        .unwrap();
                    }
                    return TraversalProof::non_inclusion_different_leaf(
                        steps,
                        key_hash.clone(),
                        blake(value),
                        suffix.clone(),
                    )
                    .unwrap();
                }
                Node::Branch { prefix, children } => {
                    let shared = prefix.common_prefix_len(&rest);
                    if shared < prefix.len() {
                        let fork = ForkStep::new(
                            prefix.slice(0, shared).unwrap(),
                            prefix.nibble_at(shared).unwrap(),
                            prefix.suffix_from(shared + 1).unwrap(),
                            Some(self.hash(current)),
                        )
                        .unwrap();
                        steps.push(fork.into());
                        return TraversalProof::non_inclusion_missing_branch(steps);
                    }
                    let index = usize::from(rest.nibble_at(prefix.len()).unwrap());
                    let step = BranchStep::new(
                        prefix.clone(),
                        self.child_hashes(children),
                        index,
                        None,
                    )
                    .unwrap();
                    steps.push(step.into());
                    cursor += prefix.len() + 1;
                    node = children[index].as_ref();
                }
            }
        }
    }

    /// Wire bytes of the proof for `key`.
    pub fn proof_bytes(&self, key: &[u8]) -> Vec<u8> {
        serialize_default(&self.traversal_proof(key), &blake(key)).unwrap()
    }
}

fn insert(node: Option<Node>, path: &NibblePath, cursor: usize, value: Vec<u8>, key_hash: Hash) -> Node {
    let rest = path.suffix_from(cursor).unwrap();
    match node {
        None => leaf(path, cursor, value, key_hash),
        Some(Node::Leaf {
            suffix,
            value: existing,
            key_hash: existing_key,
        }) => {
            if suffix == rest {
                return leaf(path, cursor, value, key_hash);
            }
            let shared = suffix.common_prefix_len(&rest);
            let mut children: Box<[Option<Node>; 16]> = Box::default();
            children[usize::from(suffix.nibble_at(shared).unwrap())] =
                Some(leaf(&suffix, shared + 1, existing, existing_key));
            children[usize::from(rest.nibble_at(shared).unwrap())] =
                Some(leaf(&rest, shared + 1, value, key_hash));
            Node::Branch {
                prefix: suffix.slice(0, shared).unwrap(),
                children,
            }
        }
        Some(Node::Branch {
            prefix,
            mut children,
        }) => {
            let shared = prefix.common_prefix_len(&rest);
            if shared == prefix.len() {
                let index = usize::from(rest.nibble_at(shared).unwrap());
                let child = children[index].take();
                children[index] = Some(insert(child, path, cursor + shared + 1, value, key_hash));
                return Node::Branch { prefix, children };
            }
            let mut split: Box<[Option<Node>; 16]> = Box::default();
            split[usize::from(prefix.nibble_at(shared).unwrap())] = Some(Node::Branch {
                prefix: prefix.suffix_from(shared + 1).unwrap(),
                children,
            });
            split[usize::from(rest.nibble_at(shared).unwrap())] =
                Some(leaf(&rest, shared + 1, value, key_hash));
            Node::Branch {
                prefix: prefix.slice(0, shared).unwrap(),
                children: split,
            }
        }
    }
}

/// Proof vectors recorded from an independent encoder.
#[derive(Debug, Deserialize)]
pub struct Vectors {
    pub hash: String,
    pub tries: Vec<TrieVector>,
}

#[derive(Debug, Deserialize)]
pub struct TrieVector {
    pub name: String,
    pub entries: Vec<EntryVector>,
    pub root: String,
    pub proofs: Vec<ProofVector>,
}

#[derive(Debug, Deserialize)]
pub struct EntryVector {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ProofVector {
    pub key: String,
    pub value: Option<String>,
    pub including: bool,
    pub kind: String,
    pub cbor: String,
    #[serde(default)]
    pub has_fork: Option<bool>,
}

impl TrieVector {
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .iter()
            .map(|entry| (bytes(&entry.key), bytes(&entry.value)))
            .collect()
    }
    pub fn trie(&self) -> ReferenceTrie {
        ReferenceTrie::from_entries(&self.entries())
    }
}

pub fn load_vectors() -> Vectors {
    let file = File::open("data/mpf_vectors.json").expect("Could not open vectors file");
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).expect("Could not deserialize vectors")
}

pub fn trie_vector(name: &str) -> TrieVector {
    load_vectors()
        .tries
        .into_iter()
        .find(|trie| trie.name == name)
        .unwrap_or_else(|| panic!("No trie vector named {name}"))
}
