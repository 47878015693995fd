//! Proofs recorded from an independent encoder must be reproduced byte for
//! byte, and must verify against the recorded roots.
mod common;

use common::{blake, bytes, init_logger, load_vectors, trie_vector};
use mpf_proof::{decode, verify, ProofKind, WireStep};

#[test]
fn test_vectors_use_blake2b_256() {
    assert_eq!(load_vectors().hash, "blake2b-256");
}

#[test]
fn test_reference_roots_match_vectors() {
    init_logger();
    for trie in load_vectors().tries {
        assert_eq!(
            hex::encode(trie.trie().root_hash()),
            trie.root,
            "root of trie {}",
            trie.name
        );
    }
}

#[test]
fn test_serializer_reproduces_recorded_bytes() {
    init_logger();
    for trie in load_vectors().tries {
        let reference = trie.trie();
        for proof in &trie.proofs {
            let key = bytes(&proof.key);
            assert_eq!(
                hex::encode(reference.proof_bytes(&key)),
                proof.cbor,
                "proof bytes for key {} in trie {}",
                proof.key,
                trie.name
            );
            let expected_kind = match proof.kind.as_str() {
                "inclusion" => ProofKind::Inclusion,
                "missing_branch" => ProofKind::NonInclusionMissingBranch,
                "different_leaf" => ProofKind::NonInclusionDifferentLeaf,
                other => panic!("unknown proof kind {other}"),
            };
            assert_eq!(reference.traversal_proof(&key).kind(), expected_kind);
        }
    }
}

#[test]
fn test_recorded_proofs_verify() -> anyhow::Result<()> {
    init_logger();
    for trie in load_vectors().tries {
        let root = bytes(&trie.root);
        for proof in &trie.proofs {
            let key = bytes(&proof.key);
            let value = proof.value.as_deref().map(bytes);
            let verified = verify(
                Some(&root),
                &key,
                value.as_deref(),
                proof.including,
                &bytes(&proof.cbor),
            )?;
            assert!(verified, "proof for key {} in trie {}", proof.key, trie.name);
        }
    }
    Ok(())
}

#[test]
fn test_vectors_cover_every_step_kind() {
    let fruits = trie_vector("fruits");
    let kinds: Vec<&str> = fruits.proofs.iter().map(|p| p.kind.as_str()).collect();
    assert!(kinds.contains(&"inclusion"));
    assert!(kinds.contains(&"missing_branch"));
    assert!(kinds.contains(&"different_leaf"));
    assert!(fruits.proofs.iter().any(|p| p.has_fork == Some(true)));

    // Different leaf proofs end with a Leaf step for the conflicting key.
    for proof in fruits.proofs.iter().filter(|p| p.kind == "different_leaf") {
        let wire = decode(&bytes(&proof.cbor)).unwrap();
        let key_path = blake(&bytes(&proof.key));
        match wire.steps.last() {
            Some(WireStep::Leaf { key_hash, .. }) => assert_ne!(*key_hash, key_path),
            other => panic!("expected a leaf step, got {other:?}"),
        }
    }
}

#[test]
fn test_fork_proofs_end_with_fork() {
    let pair = trie_vector("shared-prefix-pair");
    for proof in pair.proofs.iter().filter(|p| !p.including) {
        let wire = decode(&bytes(&proof.cbor)).unwrap();
        assert_eq!(wire.steps.len(), 1);
        match &wire.steps[0] {
            WireStep::Fork { skip, neighbor } => {
                assert_eq!(*skip, 0);
                assert!(neighbor.nibble <= 15);
                // The stored root is the whole trie.
                assert_eq!(hex::encode(&neighbor.root), pair.root);
            }
            other => panic!("expected a fork step, got {other:?}"),
        }
    }
}

#[test]
fn test_empty_trie_vector() {
    let empty = trie_vector("empty");
    let proof = &empty.proofs[0];
    assert_eq!(proof.cbor, "80");
    assert!(verify(None, &bytes(&proof.key), None, false, &bytes(&proof.cbor)).unwrap());
}
