//! # Beacon Core Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | shared-types | `BeaconState::hash_tree_root` |
//! | fork-choice | `BasicStateTransition::apply` across skipped slots |
//! | shared-crypto | single and aggregate BLS verification |
//! | fork-choice + chain-storage | `on_block` end to end, including commit |

use std::time::Duration;

use chain_tests::fixtures::{
    genesis_state, interop_keys, produce_block, sign_attestation, Harness, Proposer,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fork_choice::{BasicStateTransition, StateTransition};
use shared_crypto::{BlsSignatureVerifier, SignatureVerifier};
use shared_types::constants::DOMAIN_BEACON_ATTESTER;
use shared_types::helpers::{compute_signing_root, get_domain};
use shared_types::{genesis_block, AttestationData, Checkpoint, TreeHash};

fn bench_state_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-types");

    for validators in [16u64, 64, 256] {
        let state = genesis_state(&interop_keys(validators));
        group.bench_with_input(
            BenchmarkId::new("state_hash_tree_root", validators),
            &state,
            |b, state| b.iter(|| black_box(state.hash_tree_root())),
        );
    }
    group.finish();
}

fn bench_state_transition(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork-choice-transition");
    let keys = interop_keys(16);
    let state = genesis_state(&keys);
    let parent_root = genesis_block(&state).hash_tree_root();

    for slot in [1u64, 8, 32] {
        let block = produce_block(&keys, &state, parent_root, slot, Proposer::Correct);
        group.throughput(Throughput::Elements(slot));
        group.bench_with_input(BenchmarkId::new("apply", slot), &block, |b, block| {
            b.iter(|| black_box(BasicStateTransition.apply(&state, block)))
        });
    }
    group.finish();
}

fn bench_bls_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-crypto-bls");
    group.measurement_time(Duration::from_secs(10));

    let keys = interop_keys(64);
    let state = genesis_state(&keys);
    let genesis_root = genesis_block(&state).hash_tree_root();
    let verifier = BlsSignatureVerifier;

    for size in [1usize, 16, 64] {
        let indices: Vec<u64> = (0..size as u64).collect();
        let data = AttestationData {
            slot: 0,
            index: 0,
            beacon_block_root: genesis_root,
            source: Checkpoint::new(0, genesis_root),
            target: Checkpoint::new(0, genesis_root),
        };
        let attestation = sign_attestation(&keys, &state, &indices, data);
        let pubkeys: Vec<_> = indices
            .iter()
            .map(|i| keys[*i as usize].public_key_bytes())
            .collect();
        let domain = get_domain(&state, DOMAIN_BEACON_ATTESTER, 0);
        let signing_root = compute_signing_root(&data.hash_tree_root(), &domain);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("verify_aggregate", size),
            &attestation,
            |b, attestation| {
                b.iter(|| {
                    black_box(verifier.verify_aggregate(
                        &pubkeys,
                        &signing_root,
                        &attestation.signature,
                    ))
                })
            },
        );
    }
    group.finish();
}

fn bench_block_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork-choice-import");
    group.sample_size(20);
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    group.bench_function("on_block_and_commit", |b| {
        b.iter_with_setup(
            || {
                let harness = Harness::memory(16);
                let block = harness.block_at(harness.genesis_root, 1, Proposer::Correct);
                (harness, block)
            },
            |(harness, block)| {
                let result = runtime
                    .block_on(harness.import(block))
                    .expect("import machinery");
                black_box(result)
            },
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_state_hashing,
    bench_state_transition,
    bench_bls_verification,
    bench_block_import,
);
criterion_main!(benches);
