//! Shared state of a simulated fabric.
//!
//! All processes of a group share one [`SimFabric`]. It holds a mailbox per
//! destination, every outstanding request, the barrier rounds, and the clock.
//!
//! ## Matching rules
//!
//! - A message becomes visible `latency` ticks after it was sent. Latencies
//!   are drawn from the seeded generator, so the order in which messages from
//!   different sources show up changes with the seed.
//! - Messages between one pair of processes become visible in send order.
//! - A send completes only when the destination matched the message.
//! - A barrier round completes when every process entered it; each process
//!   observes the completion after its own skew.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;
use std::rc::Rc;

use bytes::Bytes;
use nbx_core::{Completion, Probe, Rank, RequestId, Tag, TransportError, TransportResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, trace, warn};

use crate::config::sample_range;
use crate::{FabricConfig, SimError, SimResult, SimTransport};

/// Counters maintained by a fabric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FabricStats {
    /// Messages sent.
    pub messages: u64,
    /// Payload bytes sent.
    pub bytes: u64,
    /// Messages matched by their destination.
    pub delivered: u64,
    /// Probes that found a message.
    pub probes: u64,
    /// Barrier rounds completed.
    pub barriers: u64,
}

#[derive(Debug)]
struct InFlight {
    seq: u64,
    source: Rank,
    tag: Tag,
    payload: Bytes,
    visible_at: u64,
    send: RequestId,
}

#[derive(Debug)]
enum RequestState {
    Send {
        owner: Rank,
        matched: bool,
    },
    Recv {
        owner: Rank,
        source: Rank,
        tag: Tag,
        buffer: Vec<u8>,
        outcome: Option<TransportResult<usize>>,
    },
    Barrier {
        owner: Rank,
        round: usize,
        release_delay: u64,
    },
}

impl RequestState {
    fn owner(&self) -> Rank {
        match self {
            RequestState::Send { owner, .. }
            | RequestState::Recv { owner, .. }
            | RequestState::Barrier { owner, .. } => *owner,
        }
    }
}

#[derive(Debug, Default)]
struct BarrierRound {
    arrived: usize,
    completed_at: Option<u64>,
}

/// Mutable state behind a [`SimFabric`].
#[derive(Debug)]
pub(crate) struct FabricState {
    size: usize,
    config: FabricConfig,
    rng: ChaCha8Rng,
    tick: u64,
    next_request: u64,
    next_seq: u64,
    mailboxes: Vec<VecDeque<InFlight>>,
    /// Last visibility tick per (source, destination) pair.
    pair_clock: Vec<u64>,
    requests: BTreeMap<RequestId, RequestState>,
    barrier_calls: Vec<usize>,
    rounds: Vec<BarrierRound>,
    aborted: Option<String>,
    stats: FabricStats,
}

impl FabricState {
    fn new(size: usize, seed: u64, config: FabricConfig) -> Self {
        Self {
            size,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            next_request: 0,
            next_seq: 0,
            mailboxes: (0..size).map(|_| VecDeque::new()).collect(),
            pair_clock: vec![0; size * size],
            requests: BTreeMap::new(),
            barrier_calls: vec![0; size],
            rounds: Vec::new(),
            aborted: None,
            stats: FabricStats::default(),
        }
    }

    fn check_live(&self) -> TransportResult<()> {
        match &self.aborted {
            Some(reason) => Err(TransportError::Aborted {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_rank(&self, rank: Rank) -> TransportResult<()> {
        if rank < self.size {
            Ok(())
        } else {
            Err(TransportError::InvalidRank {
                rank,
                size: self.size,
            })
        }
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request);
        self.next_request += 1;
        id
    }

    pub(crate) fn post_send(
        &mut self,
        source: Rank,
        dest: Rank,
        tag: Tag,
        payload: Bytes,
    ) -> TransportResult<RequestId> {
        self.check_live()?;
        self.check_rank(dest)?;

        let latency = sample_range(&mut self.rng, &self.config.latency_ticks);
        let clock = &mut self.pair_clock[source * self.size + dest];
        let visible_at = (self.tick + latency).max(*clock);
        *clock = visible_at;

        let send = self.next_request_id();
        self.requests.insert(
            send,
            RequestState::Send {
                owner: source,
                matched: false,
            },
        );

        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.messages += 1;
        self.stats.bytes += payload.len() as u64;
        trace!(source, dest, tag, bytes = payload.len(), visible_at, "message posted");

        self.mailboxes[dest].push_back(InFlight {
            seq,
            source,
            tag,
            payload,
            visible_at,
            send,
        });
        Ok(send)
    }

    pub(crate) fn post_recv(
        &mut self,
        owner: Rank,
        source: Rank,
        tag: Tag,
        buffer: Vec<u8>,
    ) -> TransportResult<RequestId> {
        self.check_live()?;
        self.check_rank(source)?;
        let id = self.next_request_id();
        self.requests.insert(
            id,
            RequestState::Recv {
                owner,
                source,
                tag,
                buffer,
                outcome: None,
            },
        );
        Ok(id)
    }

    pub(crate) fn probe_any(
        &mut self,
        owner: Rank,
        tags: Range<Tag>,
    ) -> TransportResult<Option<Probe>> {
        self.check_live()?;
        let tick = self.tick;
        let found = self.mailboxes[owner]
            .iter()
            .filter(|msg| msg.visible_at <= tick && tags.contains(&msg.tag))
            .min_by_key(|msg| (msg.visible_at, msg.seq))
            .map(|msg| Probe {
                source: msg.source,
                tag: msg.tag,
                size: msg.payload.len(),
            });
        if found.is_some() {
            self.stats.probes += 1;
        }
        Ok(found)
    }

    pub(crate) fn recv_probed(
        &mut self,
        owner: Rank,
        probe: &Probe,
        buffer: &mut [u8],
    ) -> TransportResult<()> {
        self.check_live()?;
        let tick = self.tick;
        let position = self.mailboxes[owner]
            .iter()
            .position(|msg| msg.source == probe.source && msg.tag == probe.tag)
            .filter(|&i| self.mailboxes[owner][i].visible_at <= tick)
            .ok_or_else(|| TransportError::Failed {
                message: format!(
                    "no message from rank {} with tag {} to receive",
                    probe.source, probe.tag
                ),
            })?;

        let needed = self.mailboxes[owner][position].payload.len();
        if needed > buffer.len() {
            return Err(TransportError::Truncated {
                needed,
                available: buffer.len(),
            });
        }
        let msg = self.take_message(owner, position)?;
        buffer[..needed].copy_from_slice(&msg.payload);
        Ok(())
    }

    pub(crate) fn post_barrier(&mut self, owner: Rank) -> TransportResult<RequestId> {
        self.check_live()?;
        let round = self.barrier_calls[owner];
        self.barrier_calls[owner] += 1;
        if self.rounds.len() <= round {
            self.rounds.resize_with(round + 1, BarrierRound::default);
        }

        let size = self.size;
        let tick = self.tick;
        let entry = &mut self.rounds[round];
        entry.arrived += 1;
        if entry.arrived == size {
            entry.completed_at = Some(tick);
            self.stats.barriers += 1;
            trace!(round, tick, "barrier round complete");
        }

        let release_delay = sample_range(&mut self.rng, &self.config.barrier_skew_ticks);
        let id = self.next_request_id();
        self.requests.insert(
            id,
            RequestState::Barrier {
                owner,
                round,
                release_delay,
            },
        );
        Ok(id)
    }

    pub(crate) fn test(
        &mut self,
        owner: Rank,
        id: RequestId,
    ) -> TransportResult<Option<Completion>> {
        self.check_live()?;
        let is_recv = match self.requests.get(&id) {
            Some(state) if state.owner() == owner => matches!(state, RequestState::Recv { .. }),
            _ => return Err(TransportError::UnknownRequest(id)),
        };
        if is_recv {
            self.match_posted_receives(owner)?;
        }

        let ready = match self.requests.get(&id) {
            Some(RequestState::Send { matched, .. }) => *matched,
            Some(RequestState::Recv { outcome, .. }) => outcome.is_some(),
            Some(RequestState::Barrier {
                round,
                release_delay,
                ..
            }) => self.rounds[*round]
                .completed_at
                .is_some_and(|at| self.tick >= at + release_delay),
            None => false,
        };
        if !ready {
            return Ok(None);
        }

        match self.requests.remove(&id) {
            Some(RequestState::Send { .. }) => Ok(Some(Completion::Sent)),
            Some(RequestState::Recv {
                mut buffer,
                outcome: Some(outcome),
                ..
            }) => {
                let len = outcome?;
                buffer.truncate(len);
                Ok(Some(Completion::Received(buffer)))
            }
            Some(RequestState::Barrier { .. }) => Ok(Some(Completion::Barrier)),
            _ => Err(TransportError::UnknownRequest(id)),
        }
    }

    /// Match the owner's posted receives, oldest first, against visible messages.
    fn match_posted_receives(&mut self, owner: Rank) -> TransportResult<()> {
        let pending: Vec<(RequestId, Rank, Tag)> = self
            .requests
            .iter()
            .filter_map(|(id, state)| match state {
                RequestState::Recv {
                    owner: o,
                    source,
                    tag,
                    outcome: None,
                    ..
                } if *o == owner => Some((*id, *source, *tag)),
                _ => None,
            })
            .collect();

        let tick = self.tick;
        for (id, source, tag) in pending {
            let Some(position) = self.mailboxes[owner]
                .iter()
                .position(|msg| msg.source == source && msg.tag == tag)
            else {
                continue;
            };
            if self.mailboxes[owner][position].visible_at > tick {
                continue;
            }
            let msg = self.take_message(owner, position)?;
            if let Some(RequestState::Recv {
                buffer, outcome, ..
            }) = self.requests.get_mut(&id)
            {
                let needed = msg.payload.len();
                *outcome = Some(if needed > buffer.len() {
                    Err(TransportError::Truncated {
                        needed,
                        available: buffer.len(),
                    })
                } else {
                    buffer[..needed].copy_from_slice(&msg.payload);
                    Ok(needed)
                });
            }
        }
        Ok(())
    }

    /// Remove a message from a mailbox and complete its send.
    fn take_message(&mut self, owner: Rank, position: usize) -> TransportResult<InFlight> {
        let msg = self.mailboxes[owner]
            .remove(position)
            .ok_or_else(|| TransportError::Failed {
                message: format!("mailbox of rank {owner} has no entry {position}"),
            })?;
        if let Some(RequestState::Send { matched, .. }) = self.requests.get_mut(&msg.send) {
            *matched = true;
        }
        self.stats.delivered += 1;
        trace!(
            source = msg.source,
            dest = owner,
            tag = msg.tag,
            bytes = msg.payload.len(),
            "message matched"
        );
        Ok(msg)
    }

    pub(crate) fn abort(&mut self, owner: Rank, reason: &str) {
        if self.aborted.is_none() {
            error!(rank = owner, reason, "group aborted");
            self.aborted = Some(format!("rank {owner}: {reason}"));
        }
    }

    /// Let one tick pass, firing the watchdog when the budget is spent.
    pub(crate) fn advance(&mut self) {
        self.tick += 1;
        if self.tick > self.config.max_ticks && self.aborted.is_none() {
            warn!(
                max_ticks = self.config.max_ticks,
                in_flight = self.in_flight(),
                "watchdog fired"
            );
            self.aborted = Some(format!(
                "watchdog: group still running after {} ticks",
                self.config.max_ticks
            ));
        }
    }

    fn in_flight(&self) -> usize {
        self.mailboxes.iter().map(VecDeque::len).sum()
    }
}

/// Deterministic in-process message-passing fabric.
///
/// Cloning a fabric yields another handle to the same shared state.
/// Single-threaded: all processes run as tasks on one local executor.
#[derive(Debug, Clone)]
pub struct SimFabric {
    state: Rc<RefCell<FabricState>>,
}

impl SimFabric {
    /// Create a fabric for `size` processes.
    pub fn new(size: usize, seed: u64, config: FabricConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(FabricState::new(size, seed, config))),
        }
    }

    /// Transport endpoint of `rank`.
    pub fn endpoint(&self, rank: Rank) -> SimResult<SimTransport> {
        let size = self.size();
        if rank >= size {
            return Err(SimError::InvalidRank { rank, size });
        }
        Ok(SimTransport::new(self.clone(), rank))
    }

    /// Transport endpoints of every rank, in rank order.
    pub fn endpoints(&self) -> Vec<SimTransport> {
        (0..self.size())
            .map(|rank| SimTransport::new(self.clone(), rank))
            .collect()
    }

    /// Number of processes.
    pub fn size(&self) -> usize {
        self.state.borrow().size
    }

    /// Current tick.
    pub fn tick(&self) -> u64 {
        self.state.borrow().tick
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> FabricStats {
        self.state.borrow().stats
    }

    /// Messages sent but not matched yet.
    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight()
    }

    /// Whether the group was aborted.
    pub fn is_aborted(&self) -> bool {
        self.state.borrow().aborted.is_some()
    }

    /// Reason the group was aborted, if it was.
    pub fn abort_reason(&self) -> Option<String> {
        self.state.borrow().aborted.clone()
    }

    /// Abort the group on behalf of `rank`.
    pub fn abort(&self, rank: Rank, reason: &str) {
        self.state.borrow_mut().abort(rank, reason);
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut FabricState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}
