//! # Database Lifecycle
//!
//! `Open -> Closed` is one-way: once closed, every database operation and
//! every read or commit through a bound store fails with an illegal-state
//! error, and nothing half-written survives.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chain_storage::{
        Database, ReadOnlyStore, StorageConfig, StorageError, StorageUpdate, StoreSnapshot,
    };
    use fork_choice::{BasicStateTransition, ForkChoiceError};

    use crate::fixtures::{
        genesis_state, init_tracing, interop_keys, open_database, Harness, Proposer,
    };

    fn assert_closed<T: std::fmt::Debug>(result: Result<T, StorageError>, operation: &str) {
        match result {
            Err(err @ StorageError::DatabaseClosed { .. }) => {
                assert!(err.is_illegal_state(), "{operation}: not an illegal state");
            }
            other => panic!("{operation}: expected DatabaseClosed, got {other:?}"),
        }
    }

    #[test]
    fn test_every_database_operation_fails_after_close() {
        init_tracing();
        let keys = interop_keys(4);
        let genesis = StoreSnapshot::from_genesis(genesis_state(&keys));
        let genesis_root = genesis.head();
        let db = open_database();
        db.store_genesis(&genesis).unwrap();

        db.close().unwrap();
        assert!(db.is_closed());

        assert_closed(db.store_genesis(&genesis), "store_genesis");
        assert_closed(db.update(&StorageUpdate::default()), "update");
        assert_closed(db.create_memory_store(), "create_memory_store");
        assert_closed(db.get_signed_block(&genesis_root), "get_signed_block");
        assert_closed(db.get_state(&genesis_root), "get_state");
        assert_closed(db.get_finalized_root_at_slot(0), "get_finalized_root_at_slot");
        assert_closed(
            db.get_latest_finalized_root_at_slot(0),
            "get_latest_finalized_root_at_slot",
        );
        assert_closed(db.close(), "close");
    }

    #[tokio::test]
    async fn test_bound_store_refuses_reads_and_transactions_after_close() {
        let (harness, db) = Harness::persistent(4);
        assert!(harness.store.head().is_ok());

        db.close().unwrap();

        assert_closed(harness.store.head(), "head");
        assert_closed(harness.store.snapshot(), "snapshot");
        assert_closed(harness.store.get_block(&harness.genesis_root), "get_block");
        assert_closed(harness.store.finalized_checkpoint(), "finalized_checkpoint");
        assert_closed(harness.store.start_transaction().map(|_| ()), "start_transaction");
    }

    #[tokio::test]
    async fn test_import_after_close_is_a_fault_not_a_rejection() {
        let (harness, db) = Harness::persistent(4);
        let block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        db.close().unwrap();

        let err = harness.import(block).await.unwrap_err();
        assert!(matches!(
            err,
            ForkChoiceError::Storage(StorageError::DatabaseClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_commit_racing_close_leaves_database_untouched() {
        init_tracing();
        let (harness, db) = Harness::persistent(4);
        let block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        let root = block.root();

        let mut tx = harness.store.start_transaction().unwrap();
        harness.fork_choice.on_tick(&mut tx, 12);
        let result = harness
            .fork_choice
            .on_block(&mut tx, block, Arc::new(BasicStateTransition), &harness.strategy)
            .await
            .unwrap();
        assert!(result.is_successful());
        assert_eq!(tx.head(), root);

        db.close().unwrap();
        let err = harness
            .fork_choice
            .commit(tx, &harness.strategy)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForkChoiceError::Storage(StorageError::DatabaseClosed { .. })
        ));
        assert!(!harness.strategy.contains_block(&root));

        // Reopen the same backend and check nothing of the block landed.
        drop(harness);
        let Ok(db) = Arc::try_unwrap(db) else {
            panic!("database still shared");
        };
        let reopened = Database::open(db.into_backend(), StorageConfig::default());
        let snapshot = reopened.create_memory_store().unwrap().unwrap();
        assert_eq!(snapshot.block_count(), 1);
        assert!(!snapshot.contains_block(&root));
        assert_ne!(snapshot.head(), root);
        assert_eq!(snapshot.time(), 0);
        assert!(reopened.get_signed_block(&root).unwrap().is_none());
    }
}
