//! Failure reporting: panics, aborts and the watchdog.

use nbx_core::{Transport, TransportError};
use nbx_sim::{FabricConfig, SimCluster, SimError};

#[test]
fn test_empty_group_is_rejected() {
    let err = SimCluster::new(0)
        .run(|_transport| async {})
        .expect_err("empty group");
    assert!(matches!(err, SimError::EmptyGroup));
}

#[test]
fn test_panic_is_reported_and_aborts_peers() {
    let err = SimCluster::new(2)
        .run(|mut transport| async move {
            if transport.rank() == 1 {
                panic!("rank 1 gives up");
            }
            // Rank 0 waits for a barrier rank 1 never enters.
            let barrier = transport.post_barrier().expect("barrier");
            loop {
                match transport.test(barrier) {
                    Ok(Some(_)) => return,
                    Ok(None) => transport.idle().await,
                    Err(err) => {
                        assert!(matches!(err, TransportError::Aborted { .. }));
                        return;
                    }
                }
            }
        })
        .expect_err("panic");

    assert!(matches!(err, SimError::RankPanicked { rank: 1, .. }));
}

#[test]
fn test_watchdog_turns_hang_into_error() {
    let outcome = SimCluster::new(2)
        .config(FabricConfig::fast_local().with_max_ticks(50))
        .run(|mut transport| async move {
            if transport.rank() == 1 {
                return Ok::<(), TransportError>(());
            }
            let recv = transport.post_recv(1, 0, vec![0; 4]).expect("recv");
            loop {
                match transport.test(recv)? {
                    Some(_) => return Ok(()),
                    None => transport.idle().await,
                }
            }
        })
        .expect("run");

    assert!(matches!(
        outcome.results[0],
        Err(TransportError::Aborted { .. })
    ));
    assert!(outcome.results[1].is_ok());
    assert!(outcome
        .aborted
        .as_deref()
        .is_some_and(|reason| reason.contains("watchdog")));
}
