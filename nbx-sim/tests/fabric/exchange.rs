//! Point-to-point traffic and barriers across a simulated group.

use bytes::Bytes;
use nbx_core::{Completion, Transport};
use nbx_sim::{FabricConfig, SimCluster, SimTransport};

/// Poll `request` until it completes.
async fn wait(transport: &mut SimTransport, request: nbx_core::RequestId) -> Completion {
    loop {
        if let Some(done) = transport.test(request).expect("test") {
            return done;
        }
        transport.idle().await;
    }
}

#[test]
fn test_ring_with_posted_receives() {
    let _ = tracing_subscriber::fmt::try_init();

    let outcome = SimCluster::new(5)
        .seed(3)
        .config(FabricConfig::chaotic())
        .run(|mut transport| async move {
            let rank = transport.rank();
            let size = transport.size();
            let next = (rank + 1) % size;
            let prev = (rank + size - 1) % size;

            let send = transport
                .post_send(next, 7, Bytes::from(format!("from {rank}")))
                .expect("send");
            let recv = transport.post_recv(prev, 7, vec![0; 64]).expect("recv");

            let received = wait(&mut transport, recv).await;
            assert_eq!(wait(&mut transport, send).await, Completion::Sent);
            match received {
                Completion::Received(bytes) => String::from_utf8(bytes).expect("utf8"),
                other => panic!("unexpected completion {other:?}"),
            }
        })
        .expect("run");

    for (rank, text) in outcome.results.iter().enumerate() {
        assert_eq!(*text, format!("from {}", (rank + 4) % 5));
    }
    assert_eq!(outcome.stats.messages, 5);
    assert_eq!(outcome.stats.delivered, 5);
    assert!(outcome.aborted.is_none());
}

#[test]
fn test_probe_sees_every_source_once() {
    for seed in 0..8 {
        let outcome = SimCluster::new(4)
            .seed(seed)
            .run(|mut transport| async move {
                let rank = transport.rank();
                let mut sends = Vec::new();
                if rank != 0 {
                    sends.push(
                        transport
                            .post_send(0, 100, Bytes::from(vec![rank as u8; rank]))
                            .expect("send"),
                    );
                }

                let mut arrivals = Vec::new();
                if rank == 0 {
                    while arrivals.len() < 3 {
                        match transport.probe_any(100..101).expect("probe") {
                            Some(probe) => {
                                let mut buf = vec![0; probe.size];
                                transport.recv_probed(&probe, &mut buf).expect("recv");
                                assert_eq!(buf, vec![probe.source as u8; probe.source]);
                                arrivals.push(probe.source);
                            }
                            None => transport.idle().await,
                        }
                    }
                }
                while !transport.test_all(&mut sends).expect("test_all") {
                    transport.idle().await;
                }
                arrivals
            })
            .expect("run");

        let mut arrivals = outcome.results[0].clone();
        arrivals.sort_unstable();
        assert_eq!(arrivals, vec![1, 2, 3], "seed {seed}");
    }
}

#[test]
fn test_arrival_order_depends_on_seed() {
    let orders: Vec<Vec<usize>> = (0..16)
        .map(|seed| {
            let outcome = SimCluster::new(6)
                .seed(seed)
                .config(FabricConfig::chaotic())
                .run(|mut transport| async move {
                    let rank = transport.rank();
                    let mut sends = Vec::new();
                    if rank != 0 {
                        sends.push(transport.post_send(0, 1, Bytes::new()).expect("send"));
                    }
                    let mut arrivals = Vec::new();
                    while rank == 0 && arrivals.len() < 5 {
                        match transport.probe_any(1..2).expect("probe") {
                            Some(probe) => {
                                transport.recv_probed(&probe, &mut []).expect("recv");
                                arrivals.push(probe.source);
                            }
                            None => transport.idle().await,
                        }
                    }
                    while !transport.test_all(&mut sends).expect("test_all") {
                        transport.idle().await;
                    }
                    arrivals
                })
                .expect("run");
            outcome.results[0].clone()
        })
        .collect();

    let first = &orders[0];
    assert!(orders.iter().any(|order| order != first), "{orders:?}");
}

#[test]
fn test_barrier_rounds_are_sequential() {
    let outcome = SimCluster::new(3)
        .seed(9)
        .config(FabricConfig::default().with_barrier_skew_ticks(0..10))
        .run(|mut transport| async move {
            for _ in 0..4 {
                let barrier = transport.post_barrier().expect("barrier");
                assert_eq!(wait(&mut transport, barrier).await, Completion::Barrier);
            }
        })
        .expect("run");

    assert_eq!(outcome.stats.barriers, 4);
}
