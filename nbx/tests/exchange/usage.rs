//! Usage errors and fatal failures.

use nbx::{
    ExactAlloc, ExchangeMode, NbxConfig, NbxEngine, NbxError, NbxState, Outgoing, RecvInfo,
    Transport, TransportError,
};
use nbx_sim::{FabricConfig, SimCluster};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_second_post_is_rejected_until_execute() {
    let outcome = SimCluster::new(1)
        .run(|transport| async move {
            let mut engine = NbxEngine::new(transport, NbxConfig::default()).expect("engine");

            let err = engine.execute(&mut ExactAlloc).await.expect_err("nothing posted");
            assert!(matches!(err, NbxError::InvalidState { .. }));

            engine
                .post(vec![Outgoing::new(0, vec![1u8])], ExchangeMode::Discover)
                .expect("post");
            assert_eq!(engine.state(), NbxState::Sending);
            assert_eq!(engine.outstanding(), 1);

            let err = engine
                .post(vec![Outgoing::new(0, vec![2u8])], ExchangeMode::Discover)
                .expect_err("outstanding");
            assert!(matches!(err, NbxError::OutstandingRequests { count: 1 }));

            let table = engine.execute(&mut ExactAlloc).await.expect("execute");
            assert_eq!(table.len(), 1);
            assert_eq!(engine.outstanding(), 0);

            engine
                .post(Vec::new(), ExchangeMode::Discover)
                .expect("post after completion");
            let err = engine
                .post(Vec::new(), ExchangeMode::Discover)
                .expect_err("already posted");
            assert!(matches!(err, NbxError::InvalidState { .. }));
            engine.execute(&mut ExactAlloc).await.expect("execute");
        })
        .expect("run");
    assert!(outcome.aborted.is_none());
}

#[test]
fn test_invalid_arguments_post_nothing() {
    let outcome = SimCluster::new(2)
        .run(|transport| async move {
            let config = NbxConfig::default().with_tag_stride(4);
            let mut engine = NbxEngine::new(transport, config).expect("engine");

            let err = engine
                .post(vec![Outgoing::new(2, vec![1u8])], ExchangeMode::Discover)
                .expect_err("rank out of range");
            assert!(matches!(err, NbxError::InvalidRank { rank: 2, size: 2 }));

            let err = engine
                .post(Vec::new(), ExchangeMode::KnownSizes(vec![(5, 1)]))
                .expect_err("source out of range");
            assert!(matches!(err, NbxError::InvalidRank { rank: 5, .. }));

            let sends = (0..4).map(|_| Outgoing::new(0, vec![0u8])).collect();
            let err = engine
                .post(sends, ExchangeMode::Discover)
                .expect_err("too many");
            assert!(matches!(err, NbxError::TooManyMessages { count: 4, limit: 3 }));

            assert_eq!(engine.state(), NbxState::Idle);
            assert_eq!(engine.outstanding(), 0);
        })
        .expect("run");
    assert_eq!(outcome.stats.messages, 0);
}

#[test]
fn test_short_allocation_aborts_the_group() {
    let outcome = SimCluster::new(2)
        .seed(6)
        .run(|transport| async move {
            let rank = transport.rank();
            let mut engine = NbxEngine::new(transport, NbxConfig::default()).expect("engine");
            let sends = if rank == 0 {
                vec![Outgoing::new(1, vec![9u8; 8])]
            } else {
                Vec::new()
            };
            let mut stingy = |_: &RecvInfo| -> Vec<u8> { Vec::new() };
            engine
                .exchange(sends, ExchangeMode::Discover, &mut stingy)
                .await
                .map(|_| ())
        })
        .expect("run");

    assert!(outcome.aborted.is_some());
    assert!(matches!(
        outcome.results[1],
        Err(NbxError::AllocationTooSmall {
            from_rank: 0,
            needed: 8,
            allocated: 0
        })
    ));
    match &outcome.results[0] {
        Err(err @ NbxError::Transport { source, .. }) => {
            assert!(err.is_fatal());
            assert!(matches!(source, TransportError::Aborted { .. }));
        }
        other => panic!("rank 0 should fail with the abort, got {other:?}"),
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let outcome = SimCluster::new(1)
        .run(|transport| async move {
            let config = NbxConfig::default().with_tag_stride(1);
            matches!(
                NbxEngine::new(transport, config),
                Err(NbxError::InvalidConfig(_))
            )
        })
        .expect("run");
    assert_eq!(outcome.results, vec![true]);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("capture lock").extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_stalled_epoch_is_reported_once_per_rank() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    // Messages need several ticks to arrive, so both ranks idle at least once.
    let fabric = FabricConfig::fast_local().with_latency_ticks(16..17);
    let config = NbxConfig::default().with_stall_report_after(Some(Duration::ZERO));
    let outcome = tracing::subscriber::with_default(subscriber, || {
        SimCluster::new(2)
            .config(fabric)
            .run(|transport| {
                let config = config.clone();
                async move {
                    let mut engine = NbxEngine::new(transport, config).expect("engine");
                    let peer = 1 - engine.rank();
                    engine
                        .exchange(
                            vec![Outgoing::new(peer, vec![7u8; 4])],
                            ExchangeMode::Discover,
                            &mut ExactAlloc,
                        )
                        .await
                        .expect("exchange")
                        .len()
                }
            })
            .expect("run")
    });
    assert_eq!(outcome.results, vec![1, 1]);

    let output = String::from_utf8(captured.0.lock().expect("capture lock").clone())
        .expect("utf8 log");
    let stalls: Vec<&str> = output
        .lines()
        .filter(|line| line.contains("exchange epoch is stalled"))
        .collect();
    assert_eq!(stalls.len(), 2, "{output}");
    assert!(stalls.iter().any(|line| line.contains("rank=0")));
    assert!(stalls.iter().any(|line| line.contains("rank=1")));
}

