//! Discovering exchanges over random communication multigraphs.

use std::rc::Rc;

use nbx::{ExactAlloc, ExchangeMode, NbxConfig, NbxEngine, Outgoing, Rank, Transport};
use nbx_sim::{FabricConfig, SimCluster};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Outgoing messages of every rank: `(dest, payload)` in send order.
type Graph = Vec<Vec<(Rank, Vec<u8>)>>;

fn random_graph(size: usize, seed: u64) -> Graph {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..size)
        .map(|source| {
            (0..rng.random_range(0..5usize))
                .map(|index| {
                    let dest = rng.random_range(0..size);
                    let len = rng.random_range(0..48usize);
                    let payload = (0..len)
                        .map(|i| (source * 31 + index * 7 + i) as u8)
                        .collect();
                    (dest, payload)
                })
                .collect()
        })
        .collect()
}

/// Messages `rank` must hold after one epoch, in `(source, send index)` order.
fn expected_for(graph: &Graph, rank: Rank) -> Vec<(Rank, Vec<u8>)> {
    graph
        .iter()
        .enumerate()
        .flat_map(|(source, sends)| {
            sends
                .iter()
                .filter(move |(dest, payload)| *dest == rank && !payload.is_empty())
                .map(move |(_, payload)| (source, payload.clone()))
        })
        .collect()
}

fn run_epoch(graph: &Rc<Graph>, seed: u64, config: FabricConfig) -> Vec<Vec<(Rank, Vec<u8>)>> {
    let size = graph.len();
    SimCluster::new(size)
        .seed(seed)
        .config(config)
        .run(|transport| {
            let graph = Rc::clone(graph);
            async move {
                let rank = transport.rank();
                let mut engine =
                    NbxEngine::new(transport, NbxConfig::default()).expect("engine");
                let sends = graph[rank]
                    .iter()
                    .map(|(dest, payload)| Outgoing::new(*dest, payload.clone()))
                    .collect();
                let mut table = engine
                    .exchange(sends, ExchangeMode::Discover, &mut ExactAlloc)
                    .await
                    .expect("exchange");
                table.reorder();
                table
                    .iter()
                    .map(|entry| (entry.source, entry.payload().to_vec()))
                    .collect::<Vec<_>>()
            }
        })
        .expect("run")
        .results
}

#[test]
fn test_every_message_arrives_exactly_once() {
    super::init_tracing();

    for size in [1usize, 2, 3, 5, 8] {
        for seed in 0..6u64 {
            let graph = Rc::new(random_graph(size, seed * 97 + size as u64));
            let received = run_epoch(&graph, seed, FabricConfig::chaotic());
            for (rank, got) in received.iter().enumerate() {
                assert_eq!(
                    *got,
                    expected_for(&graph, rank),
                    "size {size} seed {seed} rank {rank}"
                );
            }
        }
    }
}

#[test]
fn test_single_process_sends_to_itself() {
    let graph = Rc::new(vec![vec![(0, vec![1, 2, 3]), (0, Vec::new()), (0, vec![4])]]);
    let received = run_epoch(&graph, 1, FabricConfig::fast_local());
    assert_eq!(received, vec![vec![(0, vec![1, 2, 3]), (0, vec![4])]]);
}

#[test]
fn test_silent_group_terminates() {
    let graph = Rc::new(vec![Vec::new(); 6]);
    let received = run_epoch(&graph, 4, FabricConfig::chaotic());
    assert!(received.iter().all(Vec::is_empty));
}

#[test]
fn test_consecutive_epochs_do_not_mix() {
    super::init_tracing();

    let outcome = SimCluster::new(4)
        .seed(11)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let rank = transport.rank();
            let size = transport.size();
            let mut engine = NbxEngine::new(transport, NbxConfig::default()).expect("engine");

            let mut rounds = Vec::new();
            for round in 0..5u8 {
                assert_eq!(engine.epoch(), u32::from(round));
                let sends = (0..size)
                    .filter(|&peer| peer != rank)
                    .map(|peer| Outgoing::new(peer, vec![round, rank as u8]))
                    .collect();
                let mut table = engine
                    .exchange(sends, ExchangeMode::Discover, &mut ExactAlloc)
                    .await
                    .expect("exchange");
                table.reorder();
                rounds.push(
                    table
                        .iter()
                        .map(|entry| entry.payload().to_vec())
                        .collect::<Vec<_>>(),
                );
            }
            (rank, rounds, engine.stats())
        })
        .expect("run");

    for (rank, rounds, stats) in outcome.results {
        for (round, payloads) in rounds.iter().enumerate() {
            let expected: Vec<Vec<u8>> = (0..4u8)
                .filter(|&peer| usize::from(peer) != rank)
                .map(|peer| vec![round as u8, peer])
                .collect();
            assert_eq!(*payloads, expected, "rank {rank} round {round}");
        }
        assert_eq!(stats.epochs, 5);
        assert_eq!(stats.messages_sent, 15);
        assert_eq!(stats.messages_received, 15);
        assert_eq!(stats.bytes_received, 30);
    }
}

#[test]
fn test_epoch_counter_wraps() {
    let outcome = SimCluster::new(2)
        .seed(5)
        .run(|transport| async move {
            let peer = 1 - transport.rank();
            let config = NbxConfig::default().with_epoch_cycle(3);
            let mut engine = NbxEngine::new(transport, config).expect("engine");
            let mut epochs = Vec::new();
            for round in 0..7u8 {
                epochs.push(engine.epoch());
                let table = engine
                    .exchange(
                        vec![Outgoing::new(peer, vec![round])],
                        ExchangeMode::Discover,
                        &mut ExactAlloc,
                    )
                    .await
                    .expect("exchange");
                assert_eq!(table.entries()[0].payload(), &[round]);
            }
            epochs
        })
        .expect("run");

    for epochs in outcome.results {
        assert_eq!(epochs, vec![0, 1, 2, 0, 1, 2, 0]);
    }
}
