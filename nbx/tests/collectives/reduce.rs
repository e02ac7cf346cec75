//! All-gather, broadcast and reductions.

use nbx_sim::{FabricConfig, SimCluster};

use super::{cluster, init_tracing};

#[test]
fn test_all_gather_in_rank_order() {
    init_tracing();

    let outcome = SimCluster::new(6)
        .seed(13)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let mine = format!("rank-{}", cluster.rank());
            cluster.all_gather(&mine).await.expect("all_gather")
        })
        .expect("run");

    let expected: Vec<String> = (0..6).map(|rank| format!("rank-{rank}")).collect();
    for gathered in outcome.results {
        assert_eq!(gathered, expected);
    }
}

#[test]
fn test_broadcast_from_root() {
    let outcome = SimCluster::new(5)
        .seed(2)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let mut value = if cluster.rank() == 3 {
                vec![1.0f32, 2.0, 3.0]
            } else {
                vec![cluster.rank() as f32]
            };
            cluster.broadcast(&mut value, 3).await.expect("broadcast");
            value
        })
        .expect("run");

    assert!(outcome
        .results
        .iter()
        .all(|value| *value == vec![1.0, 2.0, 3.0]));
}

#[test]
fn test_reductions() {
    let outcome = SimCluster::new(7)
        .seed(5)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let rank = cluster.rank() as i64;
            let sum = cluster.sum(&rank).await.expect("sum");
            let max = cluster.max(&(rank * 3 % 7)).await.expect("max");
            let min = cluster.min(&(10 - rank)).await.expect("min");
            let product = cluster
                .all_reduce(&(rank + 1), |a, b| a * b)
                .await
                .expect("all_reduce");
            (sum, max, min, product)
        })
        .expect("run");

    for result in outcome.results {
        assert_eq!(result, (21, 6, 4, 5040));
    }
}

#[test]
fn test_float_reduction_is_identical_everywhere() {
    let outcome = SimCluster::new(8)
        .seed(77)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let mut cluster = cluster(transport);
            let value = 0.1f64 * (cluster.rank() as f64 + 1.0).powi(7);
            cluster.sum(&value).await.expect("sum").to_bits()
        })
        .expect("run");

    let first = outcome.results[0];
    assert!(outcome.results.iter().all(|bits| *bits == first));
}
