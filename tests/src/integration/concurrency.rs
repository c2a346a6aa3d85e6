//! # Concurrency
//!
//! Transactions on separate tasks stay isolated until they commit, and
//! readers only ever observe whole commits.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chain_storage::ReadOnlyStore;
    use fork_choice::BasicStateTransition;

    use crate::fixtures::{init_tracing, Harness, Proposer};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_imports_on_separate_tasks_both_land() {
        init_tracing();
        let harness = Arc::new(Harness::memory(4));
        let parent = harness.extend(harness.genesis_root, &[1]).await[0];

        let left = harness.block_at(parent, 2, Proposer::Correct);
        let right = harness.block_at(parent, 3, Proposer::Correct);
        let (left_root, right_root) = (left.root(), right.root());

        let tasks: Vec<_> = [left, right]
            .into_iter()
            .map(|block| {
                let harness = Arc::clone(&harness);
                tokio::spawn(async move { harness.import(block).await })
            })
            .collect();
        for task in tasks {
            let result = task.await.unwrap().unwrap();
            assert!(result.is_successful(), "import rejected: {result}");
        }

        let snapshot = harness.store.snapshot().unwrap();
        assert!(snapshot.contains_block(&left_root));
        assert!(snapshot.contains_block(&right_root));
        assert!(snapshot.get_block_state(&left_root).is_some());
        assert!(snapshot.get_block_state(&right_root).is_some());
        assert!([left_root, right_root].contains(&snapshot.head()));
    }

    #[tokio::test]
    async fn test_staged_block_invisible_until_commit() {
        let harness = Arc::new(Harness::memory(4));
        let block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        let root = block.root();

        let mut tx = harness.store.start_transaction().unwrap();
        let bystander = harness.store.start_transaction().unwrap();
        harness.fork_choice.on_tick(&mut tx, 12);
        let result = harness
            .fork_choice
            .on_block(&mut tx, block, Arc::new(BasicStateTransition), &harness.strategy)
            .await
            .unwrap();
        assert!(result.is_successful());

        let reader = Arc::clone(&harness);
        let seen = tokio::spawn(async move {
            let store = &reader.store;
            (store.head().unwrap(), store.contains_block(&root).unwrap())
        })
        .await
        .unwrap();
        assert_eq!(seen, (harness.genesis_root, false));
        assert!(!bystander.contains_block(&root));

        assert!(!harness.strategy.contains_block(&root));
        harness.fork_choice.commit(tx, &harness.strategy).await.unwrap();
        assert_eq!(harness.store.head().unwrap(), root);
        assert!(harness.strategy.contains_block(&root));
        assert!(harness.store.contains_block(&root).unwrap());

        // An older transaction keeps reading the snapshot it started from.
        assert!(!bystander.contains_block(&root));
        assert_eq!(bystander.head(), harness.genesis_root);
        assert!(harness.store.start_transaction().unwrap().contains_block(&root));
    }

    #[tokio::test]
    async fn test_dropped_transaction_has_no_effect() {
        let harness = Harness::memory(4);
        let block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
        let root = block.root();

        {
            let mut tx = harness.store.start_transaction().unwrap();
            harness.fork_choice.on_tick(&mut tx, 12);
            harness
                .fork_choice
                .on_block(&mut tx, block, Arc::new(BasicStateTransition), &harness.strategy)
                .await
                .unwrap();
            assert_eq!(tx.pending_block_count(), 1);
        }

        assert!(!harness.store.contains_block(&root).unwrap());
        assert_eq!(harness.store.time().unwrap(), 0);
        assert!(!harness.strategy.contains_block(&root));
    }
}
