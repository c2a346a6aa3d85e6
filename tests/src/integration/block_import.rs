//! # Block Import
//!
//! Signed blocks through `ForkChoice::on_block` with the full validator:
//! head tracking, rejections and the state-root check. Head-selection input
//! reaches the strategy only through committed transactions.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chain_storage::ReadOnlyStore;
    use fork_choice::{
        BasicStateTransition, BlockImportResult, BlockValidationError, StateTransition,
    };
    use shared_types::constants::SECONDS_PER_SLOT;
    use shared_types::{AttestationData, Checkpoint, SignatureBytes, SignedBeaconBlock, TreeHash};

    use crate::fixtures::{
        init_tracing, produce_block_with_attestations, sign_attestation, sign_block,
        sign_block_as, Harness, Proposer,
    };

    // =============================================================================
    // HAPPY PATH
    // =============================================================================

    #[tokio::test]
    async fn test_signed_chain_is_imported_and_becomes_head() {
        init_tracing();
        let harness = Harness::memory(4);

        let roots = harness.extend(harness.genesis_root, &[1, 2, 3]).await;

        let head = *roots.last().unwrap();
        assert_eq!(harness.store.head().unwrap(), head);
        for root in &roots {
            let block = harness.store.get_block(root).unwrap().unwrap();
            let state = harness.state(root);
            assert_eq!(state.slot, block.slot());
            assert_eq!(state.hash_tree_root(), block.state_root());
        }
        assert_eq!(harness.strategy.block_count(), 4);
    }

    #[tokio::test]
    async fn test_skipped_slots_are_processed() {
        let harness = Harness::memory(4);
        let roots = harness.extend(harness.genesis_root, &[3, 7]).await;

        let state = harness.state(&roots[1]);
        assert_eq!(state.slot, 7);
        // Empty slots repeat the previous block root.
        assert_eq!(state.block_roots[4], roots[0]);
        assert_eq!(state.block_roots[6], roots[0]);
    }

    // =============================================================================
    // REJECTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_wrong_proposer_fails_signature_check() {
        init_tracing();
        let harness = Harness::memory(4);
        let block = harness.block_at(harness.genesis_root, 1, Proposer::Wrong);
        let root = block.root();

        let result = harness.import(block).await.unwrap();

        assert!(
            matches!(
                result,
                BlockImportResult::FailedSignature(BlockValidationError::InvalidBlockSignature {
                    slot: 1,
                    ..
                })
            ),
            "unexpected result: {result}"
        );
        assert!(!harness.store.contains_block(&root).unwrap());
        assert_eq!(harness.store.head().unwrap(), harness.genesis_root);
    }

    #[tokio::test]
    async fn test_expected_proposer_signed_with_another_key_is_rejected() {
        let harness = Harness::memory(4);
        let first = harness.extend(harness.genesis_root, &[1]).await[0];
        let parent_state = harness.state(&harness.genesis_root);

        // A second slot-1 block naming the right proposer with a valid
        // state root, but signed by someone else.
        let mut message = harness
            .block_at(harness.genesis_root, 1, Proposer::Correct)
            .message;
        message.body.graffiti = [0x5A; 32];
        let unsigned = SignedBeaconBlock {
            message: message.clone(),
            signature: SignatureBytes::empty(),
        };
        message.state_root = BasicStateTransition
            .apply(&parent_state, &unsigned)
            .unwrap()
            .hash_tree_root();
        let proposer = message.proposer_index;
        let signer = (proposer + 1) % harness.keys.len() as u64;
        let forged = sign_block_as(&harness.keys, &parent_state, message, signer);
        let root = forged.root();
        assert_ne!(root, first);

        let result = harness.import(forged).await.unwrap();
        match result {
            BlockImportResult::FailedSignature(BlockValidationError::InvalidBlockSignature {
                slot,
                proposer_index,
                ..
            }) => {
                assert_eq!(slot, 1);
                assert_eq!(proposer_index, proposer);
            }
            other => panic!("expected FailedSignature, got {other}"),
        }
        assert!(!harness.store.contains_block(&root).unwrap());
        assert!(!harness.strategy.contains_block(&root));
        assert_eq!(harness.store.head().unwrap(), first);
    }

    #[tokio::test]
    async fn test_reimport_reports_already_processed() {
        let harness = Harness::memory(4);
        let block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        let root = block.root();

        assert!(harness.import(block.clone()).await.unwrap().is_successful());
        let count = harness.store.snapshot().unwrap().block_count();

        let again = harness.import(block).await.unwrap();
        assert_eq!(again, BlockImportResult::BlockAlreadyProcessed { root });
        assert_eq!(harness.store.snapshot().unwrap().block_count(), count);
    }

    #[tokio::test]
    async fn test_single_bit_state_root_flip_is_rejected() {
        let harness = Harness::memory(4);
        let parent_state = harness.state(&harness.genesis_root);
        let good = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        let expected_root = good.state_root();

        let mut message = good.message.clone();
        message.state_root[0] ^= 0x80;
        let claimed_root = message.state_root;
        let tampered = sign_block(&harness.keys, &parent_state, message);

        match harness.import(tampered).await.unwrap() {
            BlockImportResult::InvalidStateRoot(BlockValidationError::InvalidStateRoot {
                block_state_root,
                computed_state_root,
            }) => {
                assert_eq!(block_state_root, hex::encode(claimed_root));
                assert_eq!(computed_state_root, hex::encode(expected_root));
            }
            other => panic!("expected InvalidStateRoot, got {other}"),
        }

        // The untampered block still imports.
        assert!(harness.import(good).await.unwrap().is_successful());
    }

    #[tokio::test]
    async fn test_unknown_parent_is_reported() {
        let harness = Harness::memory(4);
        let mut block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        block.message.parent_root = [0xAB; 32];

        assert_eq!(
            harness.import(block).await.unwrap(),
            BlockImportResult::UnknownParent {
                parent_root: [0xAB; 32]
            }
        );
    }

    #[tokio::test]
    async fn test_block_ahead_of_clock_is_from_future() {
        let harness = Harness::memory(4);
        let block = harness.block_at(harness.genesis_root, 2, Proposer::Correct);

        let mut tx = harness.store.start_transaction().unwrap();
        harness.fork_choice.on_tick(&mut tx, 12);
        let result = harness
            .fork_choice
            .on_block(&mut tx, block, Arc::new(BasicStateTransition), &harness.strategy)
            .await
            .unwrap();

        assert_eq!(
            result,
            BlockImportResult::BlockIsFromFuture {
                slot: 2,
                current_slot: 1
            }
        );
        assert_eq!(result.failure_reason(), Some("block_is_from_future"));
    }

    // =============================================================================
    // HEAD SELECTION
    // =============================================================================

    #[tokio::test]
    async fn test_attestations_move_head_to_heavier_fork() {
        init_tracing();
        let harness = Harness::memory(4);
        let a = harness.extend(harness.genesis_root, &[1]).await[0];
        let b = harness.extend(harness.genesis_root, &[2]).await[0];

        // No votes yet: equal weight, larger root wins.
        assert_eq!(harness.store.head().unwrap(), a.max(b));
        let lighter = a.min(b);
        let lighter_slot = harness.store.get_block(&lighter).unwrap().unwrap().slot();

        let genesis_state = harness.state(&harness.genesis_root);
        let attestation = sign_attestation(
            &harness.keys,
            &genesis_state,
            &[0, 1, 2],
            AttestationData {
                slot: lighter_slot,
                index: 0,
                beacon_block_root: lighter,
                source: Checkpoint::new(0, harness.genesis_root),
                target: Checkpoint::new(0, harness.genesis_root),
            },
        );

        let mut tx = harness.store.start_transaction().unwrap();
        harness.fork_choice.on_tick(&mut tx, 3 * 12);
        let outcome = harness
            .fork_choice
            .on_attestation(&mut tx, &attestation)
            .await
            .unwrap();
        assert!(outcome.is_successful(), "attestation rejected: {outcome:?}");
        assert_eq!(tx.latest_message(2), Some(Checkpoint::new(0, lighter)));

        assert_eq!(harness.fork_choice.process_head(&mut tx, &harness.strategy), lighter);
        harness.fork_choice.commit(tx, &harness.strategy).await.unwrap();
        assert_eq!(harness.store.head().unwrap(), lighter);
        assert_eq!(
            harness.store.latest_message(0).unwrap(),
            Some(Checkpoint::new(0, lighter))
        );
        assert_eq!(harness.strategy.vote_count(), 3);
    }

    #[tokio::test]
    async fn test_abandoned_import_does_not_steer_later_heads() {
        init_tracing();
        let harness = Harness::memory(4);
        let a = harness.extend(harness.genesis_root, &[1]).await[0];
        let b = harness.extend(harness.genesis_root, &[2]).await[0];
        let (heavy, lighter) = (a.max(b), a.min(b));
        assert_eq!(harness.store.head().unwrap(), heavy);
        let lighter_slot = harness.store.get_block(&lighter).unwrap().unwrap().slot();

        // Slot-3 block on the heavy head whose body votes for the lighter
        // sibling.
        let genesis_state = harness.state(&harness.genesis_root);
        let attestation = sign_attestation(
            &harness.keys,
            &genesis_state,
            &[0, 1, 2],
            AttestationData {
                slot: lighter_slot,
                index: 0,
                beacon_block_root: lighter,
                source: Checkpoint::default(),
                target: Checkpoint::new(0, harness.genesis_root),
            },
        );
        let carrier = produce_block_with_attestations(
            &harness.keys,
            &harness.state(&heavy),
            heavy,
            3,
            Proposer::Correct,
            vec![attestation],
        );
        let carrier_root = carrier.root();

        {
            let mut tx = harness.store.start_transaction().unwrap();
            harness.fork_choice.on_tick(&mut tx, 3 * SECONDS_PER_SLOT);
            let result = harness
                .fork_choice
                .on_block(&mut tx, carrier, Arc::new(BasicStateTransition), &harness.strategy)
                .await
                .unwrap();
            assert!(result.is_successful(), "block rejected: {result}");
            assert_eq!(tx.head(), lighter);
        }

        let next = harness.extend(heavy, &[4]).await[0];
        assert_eq!(harness.store.head().unwrap(), next);
        assert!(!harness.store.contains_block(&carrier_root).unwrap());
        assert_eq!(harness.store.latest_message(0).unwrap(), None);
        assert!(!harness.strategy.contains_block(&carrier_root));
        assert_eq!(harness.strategy.vote_count(), 0);
    }
}
