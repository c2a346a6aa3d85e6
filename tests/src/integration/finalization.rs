//! # Finalization
//!
//! Advancing the finalized checkpoint prunes the in-memory store, indexes
//! the finalized chain by slot in the database, and can never go backwards.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chain_storage::{ReadOnlyStore, StorageError};
    use fork_choice::BlockImportResult;
    use shared_types::{Checkpoint, Hash};

    use crate::fixtures::{init_tracing, Harness, MemoryDatabase, Proposer};

    /// Chain with blocks at slots 1, 32 and 33, finalized at epoch 1.
    async fn finalized_chain() -> (Harness, Arc<MemoryDatabase>, Vec<Hash>) {
        init_tracing();
        let (harness, db) = Harness::persistent(4);
        let roots = harness.extend(harness.genesis_root, &[1, 32, 33]).await;

        let checkpoint = Checkpoint::new(1, roots[1]);
        let mut tx = harness.store.start_transaction().unwrap();
        tx.set_justified_checkpoint(checkpoint);
        tx.set_best_justified_checkpoint(checkpoint);
        tx.set_finalized_checkpoint(checkpoint);
        tx.commit().await.unwrap();

        (harness, db, roots)
    }

    #[tokio::test]
    async fn test_finalization_prunes_store_and_indexes_database() {
        let (harness, db, roots) = finalized_chain().await;
        let genesis_root = harness.genesis_root;

        let snapshot = harness.store.snapshot().unwrap();
        assert_eq!(snapshot.finalized_checkpoint(), Checkpoint::new(1, roots[1]));
        assert!(!snapshot.contains_block(&genesis_root));
        assert!(!snapshot.contains_block(&roots[0]));
        assert!(snapshot.contains_block(&roots[1]));
        assert!(snapshot.contains_block(&roots[2]));
        assert_eq!(snapshot.head(), roots[2]);

        assert_eq!(db.get_finalized_root_at_slot(0).unwrap(), Some(genesis_root));
        assert_eq!(db.get_finalized_root_at_slot(1).unwrap(), Some(roots[0]));
        assert_eq!(db.get_finalized_root_at_slot(32).unwrap(), Some(roots[1]));
        assert_eq!(db.get_finalized_root_at_slot(33).unwrap(), None);
        assert_eq!(
            db.get_latest_finalized_root_at_slot(20).unwrap(),
            Some(roots[0])
        );
        assert_eq!(
            db.get_latest_finalized_root_at_slot(1_000).unwrap(),
            Some(roots[1])
        );

        // Pruned hot blocks remain readable from finalized history.
        assert_eq!(
            db.get_signed_block(&roots[0]).unwrap().map(|b| b.slot()),
            Some(1)
        );
        assert!(db.get_state(&roots[1]).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_finalization_cannot_regress() {
        let (harness, db, roots) = finalized_chain().await;
        let before = harness.store.finalized_checkpoint().unwrap();

        let mut tx = harness.store.start_transaction().unwrap();
        tx.set_finalized_checkpoint(Checkpoint::new(0, roots[1]));
        let err = tx.commit().await.unwrap_err();

        assert!(matches!(
            err,
            StorageError::FinalizationRegression {
                requested: 0,
                current: 1
            }
        ));
        assert!(err.is_illegal_state());
        assert_eq!(harness.store.finalized_checkpoint().unwrap(), before);

        let persisted = db.create_memory_store().unwrap().unwrap();
        assert_eq!(persisted.finalized_checkpoint(), before);
    }

    #[tokio::test]
    async fn test_checkpoints_must_name_known_blocks_in_order() {
        let (harness, _db, roots) = finalized_chain().await;

        let mut tx = harness.store.start_transaction().unwrap();
        tx.set_finalized_checkpoint(Checkpoint::new(2, [0x99; 32]));
        assert!(matches!(
            tx.commit().await,
            Err(StorageError::UnknownCheckpointRoot {
                kind: "finalized",
                ..
            })
        ));

        let mut tx = harness.store.start_transaction().unwrap();
        tx.set_finalized_checkpoint(Checkpoint::new(2, roots[2]));
        assert!(matches!(
            tx.commit().await,
            Err(StorageError::InconsistentCheckpoints {
                justified: 1,
                finalized: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_import_continues_only_on_finalized_chain() {
        let (harness, _db, roots) = finalized_chain().await;

        let next = harness.extend(roots[2], &[34]).await[0];
        assert_eq!(harness.store.head().unwrap(), next);

        // Blocks below the finalized block were pruned and cannot be
        // built on.
        let mut fork = harness.block_at(roots[1], 36, Proposer::Correct);
        fork.message.parent_root = roots[0];
        assert_eq!(
            harness.import(fork).await.unwrap(),
            BlockImportResult::UnknownParent {
                parent_root: roots[0]
            }
        );
    }
}
