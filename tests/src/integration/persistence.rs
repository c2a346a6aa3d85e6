//! # Persistence
//!
//! A store rebuilt from the database after a restart matches the one that
//! wrote it and keeps importing.

#[cfg(test)]
mod tests {
    use chain_storage::{ReadOnlyStore, Store};
    use shared_types::Checkpoint;

    use crate::fixtures::{init_tracing, interop_keys, open_database, Harness};

    #[test]
    fn test_empty_database_has_no_store() {
        let db = open_database();
        assert!(db.create_memory_store().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reload_restores_committed_store() {
        init_tracing();
        let (harness, db) = Harness::persistent(4);
        let roots = harness.extend(harness.genesis_root, &[1, 2, 3]).await;
        let before = harness.store.snapshot().unwrap();
        drop(harness);

        let reloaded = db.create_memory_store().unwrap().unwrap();
        assert_eq!(reloaded.block_count(), 4);
        assert_eq!(reloaded.state_count(), 4);
        assert_eq!(reloaded.head(), roots[2]);
        assert_eq!(reloaded.time(), before.time());
        assert_eq!(reloaded.genesis_time(), before.genesis_time());
        assert_eq!(reloaded.justified_checkpoint(), before.justified_checkpoint());
        assert_eq!(
            reloaded.best_justified_checkpoint(),
            before.best_justified_checkpoint()
        );
        assert_eq!(reloaded.finalized_checkpoint(), before.finalized_checkpoint());
        for root in &roots {
            assert_eq!(reloaded.get_block(root), before.get_block(root));
            assert_eq!(reloaded.get_block_state(root), before.get_block_state(root));
        }
    }

    #[tokio::test]
    async fn test_restarted_node_continues_the_chain() {
        let (harness, db) = Harness::persistent(4);
        let roots = harness.extend(harness.genesis_root, &[1, 2]).await;
        drop(harness);

        let snapshot = db.create_memory_store().unwrap().unwrap();
        let restarted = Harness::with_store(interop_keys(4), Store::new(snapshot, db.clone()));
        assert_eq!(restarted.strategy.block_count(), 3);

        let next = restarted.extend(roots[1], &[3]).await[0];
        assert_eq!(restarted.store.head().unwrap(), next);
        assert_eq!(
            db.create_memory_store().unwrap().unwrap().head(),
            next
        );
    }

    #[tokio::test]
    async fn test_latest_messages_survive_restart() {
        let (harness, db) = Harness::persistent(4);
        let head = harness.extend(harness.genesis_root, &[1]).await[0];

        let mut tx = harness.store.start_transaction().unwrap();
        tx.put_latest_message(3, Checkpoint::new(0, head));
        tx.commit().await.unwrap();
        drop(harness);

        let reloaded = db.create_memory_store().unwrap().unwrap();
        assert_eq!(reloaded.latest_message(3), Some(Checkpoint::new(0, head)));
        assert_eq!(reloaded.latest_message(2), None);
    }
}
