//! Many-to-many exchanges with merge.

use nbx::{Append, ExchangeMode, Push, Rank};
use nbx_sim::{FabricConfig, SimCluster};

use super::{cluster, init_tracing};

#[test]
fn test_hello_ring() {
    init_tracing();

    for seed in 0..4u64 {
        let outcome = SimCluster::new(4)
            .seed(seed)
            .config(FabricConfig::chaotic())
            .run(|transport| async move {
                let mut cluster = cluster(transport);
                let rank = cluster.rank();
                let next = (rank + 1) % cluster.size();
                let greeting = format!("Hello from {rank} to {next}");

                let mut inbox: Vec<String> = Vec::new();
                let summary = cluster
                    .send_recv(
                        &[next],
                        &[greeting.as_str()],
                        &mut inbox,
                        ExchangeMode::Discover,
                        Push,
                    )
                    .await
                    .expect("send_recv");
                (summary, inbox)
            })
            .expect("run");

        for (rank, (summary, inbox)) in outcome.results.iter().enumerate() {
            let prev = (rank + 3) % 4;
            assert_eq!(summary.sources, vec![prev], "seed {seed}");
            assert_eq!(summary.sizes, vec![1]);
            assert_eq!(*inbox, vec![format!("Hello from {prev} to {rank}")]);
        }
    }
}

#[test]
fn test_known_sources_many_to_many() {
    init_tracing();

    // Every rank sends rank+1 copies of its rank to every higher rank.
    let outcome = SimCluster::new(5)
        .seed(21)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let rank = cluster.rank();
            let size = cluster.size();

            let dests: Vec<Rank> = (rank + 1..size).collect();
            let payload = vec![rank as u32; rank + 1];
            let payloads: Vec<&Vec<u32>> = dests.iter().map(|_| &payload).collect();
            let sources: Vec<Rank> = (0..rank).rev().collect();

            let mut recv: Vec<u32> = Vec::new();
            let summary = cluster
                .send_recv(
                    &dests,
                    &payloads,
                    &mut recv,
                    ExchangeMode::KnownSources(sources),
                    Append,
                )
                .await
                .expect("send_recv");
            (summary, recv)
        })
        .expect("run");

    for (rank, (summary, recv)) in outcome.results.iter().enumerate() {
        let expected: Vec<u32> = (0..rank)
            .flat_map(|source| std::iter::repeat(source as u32).take(source + 1))
            .collect();
        assert_eq!(*recv, expected);
        assert_eq!(summary.sources, (0..rank).collect::<Vec<_>>());
        assert_eq!(summary.sizes, (1..=rank).collect::<Vec<_>>());
    }
}

#[test]
fn test_mismatched_lists_are_rejected() {
    let outcome = SimCluster::new(2)
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let mut recv: Vec<u8> = Vec::new();
            cluster
                .send_recv(&[0, 1], &[&vec![1u8]], &mut recv, ExchangeMode::Discover, Append)
                .await
                .map(|_| ())
        })
        .expect("run");

    for result in outcome.results {
        assert!(matches!(
            result,
            Err(nbx::NbxError::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }
}
