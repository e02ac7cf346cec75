//! Gather at a root with each merge strategy.

use nbx::{pack_record, Append, Push, ReplaceAt, ZeroCopyAppend, P1};
use nbx_sim::{FabricConfig, SimCluster};

use super::{cluster, init_tracing};

#[derive(Debug, Clone, Default, PartialEq)]
struct Tracer {
    id: u64,
    position: [f64; 3],
    history: Vec<f64>,
}

pack_record!(Tracer {
    0 => id,
    1 => position,
    2 => history,
});

fn contribution(rank: usize) -> Vec<u64> {
    (0..rank as u64 + 1).map(|i| rank as u64 * 100 + i).collect()
}

#[test]
fn test_gather_identity() {
    init_tracing();

    const ROOT: usize = 2;
    for seed in 0..5u64 {
        let outcome = SimCluster::new(5)
            .seed(seed)
            .config(FabricConfig::chaotic())
            .run(|transport| async move {
                let mut cluster = cluster(transport);
                let send = contribution(cluster.rank());
                let mut recv: Vec<u64> = Vec::new();
                let summary = cluster
                    .gather(&send, &mut recv, ROOT, Append)
                    .await
                    .expect("gather");
                (summary, recv)
            })
            .expect("run");

        // Remote contributions in rank order, the root's own last.
        let expected: Vec<u64> = [0, 1, 3, 4, ROOT]
            .into_iter()
            .flat_map(contribution)
            .collect();
        for (rank, (summary, recv)) in outcome.results.iter().enumerate() {
            if rank == ROOT {
                assert_eq!(*recv, expected, "seed {seed}");
                assert_eq!(recv.len(), 1 + 2 + 3 + 4 + 5);
                assert_eq!(summary.sources, vec![0, 1, 3, 4, ROOT]);
                assert_eq!(summary.total(), recv.len());
            } else {
                assert!(recv.is_empty());
                assert!(summary.is_empty());
            }
        }
    }
}

#[test]
fn test_gather_records_with_field_selection() {
    let outcome = SimCluster::new(3)
        .seed(4)
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let rank = cluster.rank();
            let send = Tracer {
                id: rank as u64 + 10,
                position: [rank as f64; 3],
                history: vec![0.5; rank],
            };
            let mut recv: Vec<Tracer> = Vec::new();
            cluster
                .gather_props::<P1<0>, _, _, _>(&send, &mut recv, 0, Push)
                .await
                .expect("gather");
            recv
        })
        .expect("run");

    let ids: Vec<u64> = outcome.results[0].iter().map(|tracer| tracer.id).collect();
    assert_eq!(ids, vec![11, 12, 10]);
    assert!(outcome.results[0]
        .iter()
        .all(|tracer| tracer.position == [0.0; 3] && tracer.history.is_empty()));
}

#[test]
fn test_zero_copy_and_slot_merges_agree() {
    init_tracing();

    let sizes = [3usize, 0, 2, 4];
    let outcome = SimCluster::new(4)
        .seed(9)
        .config(FabricConfig::chaotic())
        .run(move |transport| async move {
            let mut cluster = cluster(transport);
            let rank = cluster.rank();
            let send: Vec<f64> = (0..sizes[rank]).map(|i| rank as f64 + i as f64 / 10.0).collect();

            let mut appended: Vec<f64> = Vec::new();
            cluster
                .gather(&send, &mut appended, 0, ZeroCopyAppend)
                .await
                .expect("gather");

            let mut slotted = vec![f64::NAN; sizes.iter().sum()];
            cluster
                .gather(&send, &mut slotted, 0, ReplaceAt::from_sizes(&sizes))
                .await
                .expect("gather");
            (appended, slotted)
        })
        .expect("run");

    let (appended, slotted) = &outcome.results[0];
    let in_rank_order: Vec<f64> = (0..4)
        .flat_map(|rank| (0..sizes[rank]).map(move |i| rank as f64 + i as f64 / 10.0))
        .collect();
    assert_eq!(*slotted, in_rank_order);

    // Append order puts the root last.
    let mut root_last = in_rank_order[sizes[0]..].to_vec();
    root_last.extend_from_slice(&in_rank_order[..sizes[0]]);
    assert_eq!(*appended, root_last);
}

#[test]
fn test_gather_rejects_unknown_root() {
    let outcome = SimCluster::new(2)
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let mut recv: Vec<u8> = Vec::new();
            cluster.gather(&vec![1u8], &mut recv, 7, Append).await.map(|_| ())
        })
        .expect("run");
    assert!(outcome
        .results
        .iter()
        .all(|result| matches!(result, Err(nbx::NbxError::InvalidRank { rank: 7, size: 2 }))));
}
