//! Exchanges whose receivers know their sources in advance.

use std::cell::RefCell;
use std::rc::Rc;

use nbx::{
    ExactAlloc, ExchangeMode, NbxConfig, NbxEngine, NbxState, Outgoing, RecvInfo, Transport,
};
use nbx_sim::{FabricConfig, SimCluster};

#[test]
fn test_known_sizes_ring() {
    super::init_tracing();

    for seed in 0..4u64 {
        let outcome = SimCluster::new(5)
            .seed(seed)
            .config(FabricConfig::chaotic())
            .run(|transport| async move {
                let rank = transport.rank();
                let size = transport.size();
                let next = (rank + 1) % size;
                let prev = (rank + size - 1) % size;
                let mut engine = NbxEngine::new(transport, NbxConfig::default()).expect("engine");

                let table = engine
                    .exchange(
                        vec![Outgoing::new(next, vec![rank as u8; rank + 1])],
                        ExchangeMode::KnownSizes(vec![(prev, prev + 1)]),
                        &mut ExactAlloc,
                    )
                    .await
                    .expect("exchange");
                assert_eq!(engine.state(), NbxState::Done);
                (prev, table.sources(), table.entries()[0].payload().to_vec())
            })
            .expect("run");

        for (prev, sources, payload) in outcome.results {
            assert_eq!(sources, vec![prev]);
            assert_eq!(payload, vec![prev as u8; prev + 1]);
        }
        // No barrier is needed when the receive side is known.
        assert_eq!(outcome.stats.barriers, 0);
    }
}

#[test]
fn test_known_sources_learn_sizes() {
    super::init_tracing();

    let outcome = SimCluster::new(4)
        .seed(8)
        .config(FabricConfig::chaotic())
        .run(|transport| async move {
            let rank = transport.rank();
            let mut engine = NbxEngine::new(transport, NbxConfig::default()).expect("engine");

            // Rank 0 collects two messages from every other rank, one of them
            // empty, plus one from itself.
            let sends = if rank == 0 {
                vec![Outgoing::new(0, b"self".to_vec())]
            } else {
                vec![
                    Outgoing::new(0, vec![rank as u8; rank * 3]),
                    Outgoing::new(0, Vec::new()),
                ]
            };
            let sources = if rank == 0 {
                vec![3, 1, 0, 2, 1, 3, 2]
            } else {
                Vec::new()
            };

            let mut table = engine
                .exchange(sends, ExchangeMode::KnownSources(sources), &mut ExactAlloc)
                .await
                .expect("exchange");
            table.reorder();
            table
                .iter()
                .map(|entry| (entry.source, entry.payload().to_vec()))
                .collect::<Vec<_>>()
        })
        .expect("run");

    assert_eq!(
        outcome.results[0],
        vec![
            (0, b"self".to_vec()),
            (1, vec![1; 3]),
            (1, Vec::new()),
            (2, vec![2; 6]),
            (2, Vec::new()),
            (3, vec![3; 9]),
            (3, Vec::new()),
        ]
    );
    assert!(outcome.results[1..].iter().all(Vec::is_empty));
}

#[test]
fn test_allocator_sees_running_totals() {
    let outcome = SimCluster::new(3)
        .seed(2)
        .run(|transport| async move {
            let rank = transport.rank();
            let mut engine = NbxEngine::new(transport, NbxConfig::default()).expect("engine");
            let sends = if rank == 0 {
                Vec::new()
            } else {
                vec![Outgoing::new(0, vec![0u8; rank * 10])]
            };
            let mode = if rank == 0 {
                ExchangeMode::KnownSizes(vec![(1, 10), (2, 20)])
            } else {
                ExchangeMode::KnownSizes(Vec::new())
            };

            let seen = Rc::new(RefCell::new(Vec::new()));
            let log = Rc::clone(&seen);
            let mut alloc = move |info: &RecvInfo| {
                log.borrow_mut().push(*info);
                vec![0u8; info.size + 16]
            };
            let table = engine
                .exchange(sends, mode, &mut alloc)
                .await
                .expect("exchange");
            assert_eq!(table.sizes(), if rank == 0 { vec![10, 20] } else { vec![] });
            let infos = seen.borrow().clone();
            infos
        })
        .expect("run");

    let infos = &outcome.results[0];
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].total_size, 0);
    assert_eq!(infos[1].total_size, 10);
    assert!(infos.iter().all(|info| info.total_senders == Some(2)));
    assert_eq!(
        infos.iter().map(|info| info.request_index).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(infos[1].source, 2);
}
