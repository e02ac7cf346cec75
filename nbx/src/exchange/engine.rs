//! The NBX exchange engine.

use std::panic::Location;
use std::time::{Duration, Instant};

use bytes::Bytes;
use nbx_core::{Completion, Rank, RequestId, Transport, TransportError, TransportResult};
use serde::Serialize;
use tracing::{debug, error, trace, warn};

use super::epoch::{EpochCounter, TagLayout};
use crate::{NbxConfig, NbxError, NbxResult, NbxState, RecvAllocator, RecvInfo, RecvTable};

/// One outgoing message of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// Destination rank.
    pub dest: Rank,
    /// Message bytes.
    pub payload: Bytes,
}

impl Outgoing {
    /// Message of `payload` for `dest`.
    pub fn new(dest: Rank, payload: impl Into<Bytes>) -> Self {
        Self {
            dest,
            payload: payload.into(),
        }
    }
}

/// What the receiving side knows before an exchange starts.
///
/// Every process of the group must pass the same variant for a given epoch.
/// Ranks may repeat in the known-source lists: each entry stands for one
/// message, and messages from one source are received in the order they
/// were sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeMode {
    /// Sources and sizes are unknown; incoming messages are discovered by
    /// probing until the termination barrier completes. Empty payloads are
    /// not sent.
    Discover,
    /// One message is expected from each listed source; sizes travel in a
    /// preceding length round. Every payload is sent, empty ones included.
    KnownSources(Vec<Rank>),
    /// One message of the given size is expected from each listed source.
    /// Every payload is sent, empty ones included.
    KnownSizes(Vec<(Rank, usize)>),
}

/// Cumulative counters of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExchangeStats {
    /// Completed epochs.
    pub epochs: u64,
    /// Data messages sent.
    pub messages_sent: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Data messages received.
    pub messages_received: u64,
    /// Payload bytes received.
    pub bytes_received: u64,
}

/// Reports an epoch that runs longer than the configured delay, once.
struct StallWatch {
    started: Instant,
    after: Option<Duration>,
    reported: bool,
}

impl StallWatch {
    fn new(after: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            after,
            reported: false,
        }
    }

    fn check(&mut self, rank: Rank, epoch: u32, state: NbxState, outstanding: usize) {
        let Some(after) = self.after else {
            return;
        };
        let elapsed = self.started.elapsed();
        if !self.reported && elapsed >= after {
            self.reported = true;
            warn!(rank, epoch, %state, outstanding, ?elapsed, "exchange epoch is stalled");
        }
    }
}

/// Non-blocking exchange engine of one process.
///
/// An exchange runs in two steps: [`post`](NbxEngine::post) validates the
/// outgoing messages and posts every send, [`execute`](NbxEngine::execute)
/// drives the epoch until the whole group finished it and returns the
/// received messages in arrival order. [`exchange`](NbxEngine::exchange)
/// does both.
///
/// ```text
///  Idle/Done --post--> Sending --execute--> Draining --sends done--> BarrierPending
///                                              |                           |
///                                              +--known sources--+   barrier done
///                                                                v         v
///                                                               Done <-----+
/// ```
///
/// Any substrate failure aborts the whole group and is returned as
/// [`NbxError::Transport`]; there is no retry at this layer.
pub struct NbxEngine<T: Transport> {
    transport: T,
    config: NbxConfig,
    layout: TagLayout,
    epoch: EpochCounter,
    state: NbxState,
    mode: Option<ExchangeMode>,
    sends: Vec<RequestId>,
    pending_recvs: usize,
    barrier: Option<RequestId>,
    stats: ExchangeStats,
}

impl<T: Transport> NbxEngine<T> {
    /// Engine driving `transport`.
    pub fn new(transport: T, config: NbxConfig) -> NbxResult<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            layout: TagLayout::new(&config),
            epoch: EpochCounter::new(config.epoch_cycle),
            config,
            state: NbxState::Idle,
            mode: None,
            sends: Vec::new(),
            pending_recvs: 0,
            barrier: None,
            stats: ExchangeStats::default(),
        })
    }

    /// Rank of this process.
    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    /// Number of processes in the group.
    pub fn size(&self) -> usize {
        self.transport.size()
    }

    /// Epoch the next (or current) exchange runs in.
    pub fn epoch(&self) -> u32 {
        self.epoch.current()
    }

    /// Current state.
    pub fn state(&self) -> NbxState {
        self.state
    }

    /// Cumulative counters.
    pub fn stats(&self) -> ExchangeStats {
        self.stats
    }

    /// Requests posted and not yet completed.
    pub fn outstanding(&self) -> usize {
        self.sends.len() + self.pending_recvs + usize::from(self.barrier.is_some())
    }

    /// Engine configuration.
    pub fn config(&self) -> &NbxConfig {
        &self.config
    }

    /// The substrate.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the substrate.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Post every send of a new epoch.
    ///
    /// Fails without posting anything if a previous exchange is unfinished,
    /// if a rank is out of range, or if a discovering exchange has more
    /// messages than an epoch has data tags.
    pub fn post(&mut self, sends: Vec<Outgoing>, mode: ExchangeMode) -> NbxResult<()> {
        if self.state.is_active() || self.outstanding() > 0 {
            let count = self.outstanding();
            error!(
                rank = self.rank(),
                epoch = self.epoch(),
                state = %self.state,
                count,
                "exchange posted while another is unfinished"
            );
            return Err(if count > 0 {
                NbxError::OutstandingRequests { count }
            } else {
                NbxError::InvalidState {
                    message: format!("exchange posted in state {}", self.state),
                }
            });
        }

        let size = self.size();
        let check = |rank: Rank| {
            if rank < size {
                Ok(())
            } else {
                Err(NbxError::InvalidRank { rank, size })
            }
        };
        for send in &sends {
            check(send.dest)?;
        }
        match &mode {
            ExchangeMode::Discover => {
                let limit = self.layout.max_messages();
                if sends.len() > limit {
                    return Err(NbxError::TooManyMessages {
                        count: sends.len(),
                        limit,
                    });
                }
            }
            ExchangeMode::KnownSources(sources) => sources.iter().try_for_each(|&s| check(s))?,
            ExchangeMode::KnownSizes(sources) => sources.iter().try_for_each(|&(s, _)| check(s))?,
        }

        let epoch = self.epoch();
        for (index, send) in sends.into_iter().enumerate() {
            let tag = match &mode {
                ExchangeMode::Discover if send.payload.is_empty() => continue,
                ExchangeMode::Discover => self.layout.data_tag(epoch, index),
                ExchangeMode::KnownSources(_) => {
                    let len = Bytes::copy_from_slice(&(send.payload.len() as u64).to_ne_bytes());
                    let tag = self.layout.length_tag(epoch);
                    let request = Self::call(&mut self.transport, "post_send", |t| {
                        t.post_send(send.dest, tag, len)
                    })?;
                    self.sends.push(request);
                    self.layout.data_tag(epoch, 0)
                }
                ExchangeMode::KnownSizes(_) => self.layout.data_tag(epoch, 0),
            };

            let bytes = send.payload.len();
            let request = Self::call(&mut self.transport, "post_send", |t| {
                t.post_send(send.dest, tag, send.payload)
            })?;
            self.sends.push(request);
            self.stats.messages_sent += 1;
            self.stats.bytes_sent += bytes as u64;
            trace!(rank = self.rank(), epoch, dest = send.dest, tag, bytes, "send posted");
        }

        self.mode = Some(mode);
        self.set_state(NbxState::Sending);
        Ok(())
    }

    /// Drive the posted epoch to completion.
    ///
    /// Returns once this process has received every message addressed to it
    /// and, for a discovering exchange, the group agreed that every send
    /// completed. Buffers come from `alloc`; entries are in arrival order.
    pub async fn execute<A>(&mut self, alloc: &mut A) -> NbxResult<RecvTable>
    where
        A: RecvAllocator + ?Sized,
    {
        if self.state != NbxState::Sending {
            return Err(NbxError::InvalidState {
                message: format!("execute called in state {}", self.state),
            });
        }
        let mode = self.mode.take().ok_or_else(|| NbxError::InvalidState {
            message: "no exchange mode posted".to_string(),
        })?;

        let mut watch = StallWatch::new(self.config.stall_report_after);
        self.set_state(NbxState::Draining);
        let table = match mode {
            ExchangeMode::Discover => self.discover(alloc, &mut watch).await?,
            ExchangeMode::KnownSources(sources) => {
                let sizes = self.exchange_lengths(&sources, &mut watch).await?;
                let expected: Vec<(Rank, usize)> = sources.into_iter().zip(sizes).collect();
                self.receive_known(&expected, alloc, &mut watch).await?
            }
            ExchangeMode::KnownSizes(expected) => {
                self.receive_known(&expected, alloc, &mut watch).await?
            }
        };

        self.stats.epochs += 1;
        self.stats.messages_received += table.len() as u64;
        self.stats.bytes_received += table.total_bytes() as u64;
        self.set_state(NbxState::Done);
        debug!(
            rank = self.rank(),
            epoch = self.epoch(),
            messages = table.len(),
            bytes = table.total_bytes(),
            stats = ?self.stats,
            "exchange epoch finished"
        );
        self.epoch.advance();
        Ok(table)
    }

    /// Post `sends` and drive the epoch to completion.
    pub async fn exchange<A>(
        &mut self,
        sends: Vec<Outgoing>,
        mode: ExchangeMode,
        alloc: &mut A,
    ) -> NbxResult<RecvTable>
    where
        A: RecvAllocator + ?Sized,
    {
        self.post(sends, mode)?;
        self.execute(alloc).await
    }

    /// Probe and drain until the termination barrier completes.
    async fn discover<A>(&mut self, alloc: &mut A, watch: &mut StallWatch) -> NbxResult<RecvTable>
    where
        A: RecvAllocator + ?Sized,
    {
        let epoch = self.epoch();
        let tags = self.layout.data_range(epoch);
        let mut table = RecvTable::new();

        loop {
            let mut progressed = false;

            while let Some(probe) =
                Self::call(&mut self.transport, "probe_any", |t| t.probe_any(tags.clone()))?
            {
                progressed = true;
                let info = RecvInfo {
                    size: probe.size,
                    total_size: table.total_bytes(),
                    total_senders: None,
                    source: probe.source,
                    request_index: table.len(),
                    tag: self.layout.relative(epoch, probe.tag),
                };
                let mut data = alloc.allocate(&info);
                self.check_allocation(&info, data.len())?;
                Self::call(&mut self.transport, "recv_probed", |t| {
                    t.recv_probed(&probe, &mut data[..probe.size])
                })?;
                trace!(
                    rank = self.rank(),
                    epoch,
                    source = probe.source,
                    tag = info.tag,
                    bytes = probe.size,
                    "message received"
                );
                table.push(probe.source, Some(info.tag), data, probe.size);
            }

            match self.barrier {
                None => {
                    let sent = Self::call(&mut self.transport, "test_all", |t| {
                        t.test_all(&mut self.sends)
                    })?;
                    if sent {
                        let barrier =
                            Self::call(&mut self.transport, "post_barrier", |t| t.post_barrier())?;
                        self.barrier = Some(barrier);
                        self.set_state(NbxState::BarrierPending);
                        progressed = true;
                    }
                }
                Some(barrier) => {
                    if Self::call(&mut self.transport, "test", |t| t.test(barrier))?.is_some() {
                        self.barrier = None;
                        return Ok(table);
                    }
                }
            }

            if !progressed {
                watch.check(self.rank(), epoch, self.state, self.outstanding());
                self.transport.idle().await;
            }
        }
    }

    /// Receive the payload length of every declared source.
    async fn exchange_lengths(
        &mut self,
        sources: &[Rank],
        watch: &mut StallWatch,
    ) -> NbxResult<Vec<usize>> {
        let tag = self.layout.length_tag(self.epoch());
        let mut requests = Vec::with_capacity(sources.len());
        for &source in sources {
            let buffer = vec![0; std::mem::size_of::<u64>()];
            requests.push(Self::call(&mut self.transport, "post_recv", |t| {
                t.post_recv(source, tag, buffer)
            })?);
        }

        let buffers = self.wait_receives(requests, false, watch).await?;
        let mut sizes = Vec::with_capacity(buffers.len());
        for (buffer, &source) in buffers.iter().zip(sources) {
            let Ok(raw) = <[u8; 8]>::try_from(buffer.as_slice()) else {
                let message = format!(
                    "length message of {} bytes from rank {source}",
                    buffer.len()
                );
                return Err(self.fatal("length exchange", TransportError::Failed { message }));
            };
            sizes.push(u64::from_ne_bytes(raw) as usize);
        }
        Ok(sizes)
    }

    /// Post one receive per expected message and wait for them and the sends.
    async fn receive_known<A>(
        &mut self,
        expected: &[(Rank, usize)],
        alloc: &mut A,
        watch: &mut StallWatch,
    ) -> NbxResult<RecvTable>
    where
        A: RecvAllocator + ?Sized,
    {
        let epoch = self.epoch();
        let tag = self.layout.data_tag(epoch, 0);
        let mut requests = Vec::with_capacity(expected.len());
        let mut total_size = 0;
        for (request_index, &(source, size)) in expected.iter().enumerate() {
            let info = RecvInfo {
                size,
                total_size,
                total_senders: Some(expected.len()),
                source,
                request_index,
                tag: 0,
            };
            let buffer = alloc.allocate(&info);
            self.check_allocation(&info, buffer.len())?;
            total_size += size;
            requests.push(Self::call(&mut self.transport, "post_recv", |t| {
                t.post_recv(source, tag, buffer)
            })?);
        }

        let buffers = self.wait_receives(requests, true, watch).await?;
        let mut table = RecvTable::new();
        for (data, &(source, _)) in buffers.into_iter().zip(expected) {
            trace!(rank = self.rank(), epoch, source, bytes = data.len(), "message received");
            let len = data.len();
            table.push(source, Some(0), data, len);
        }
        Ok(table)
    }

    /// Wait for every receive in `requests`, and for the sends when asked.
    ///
    /// Buffers are returned in request order.
    async fn wait_receives(
        &mut self,
        requests: Vec<RequestId>,
        with_sends: bool,
        watch: &mut StallWatch,
    ) -> NbxResult<Vec<Vec<u8>>> {
        let mut buffers: Vec<Option<Vec<u8>>> = vec![None; requests.len()];
        let mut pending: Vec<(usize, RequestId)> = requests.into_iter().enumerate().collect();
        self.pending_recvs = pending.len();

        loop {
            let mut progressed = false;
            let mut i = 0;
            while i < pending.len() {
                let (slot, request) = pending[i];
                let completed = Self::call(&mut self.transport, "test", |t| match t.test(request)? {
                    Some(Completion::Received(data)) => Ok(Some(data)),
                    Some(other) => Err(TransportError::Failed {
                        message: format!("receive {request} completed as {other:?}"),
                    }),
                    None => Ok(None),
                })?;
                match completed {
                    Some(data) => {
                        buffers[slot] = Some(data);
                        pending.swap_remove(i);
                        progressed = true;
                    }
                    None => i += 1,
                }
            }
            self.pending_recvs = pending.len();

            let sends_done = !with_sends
                || Self::call(&mut self.transport, "test_all", |t| t.test_all(&mut self.sends))?;
            if pending.is_empty() && sends_done {
                return Ok(buffers.into_iter().flatten().collect());
            }

            if !progressed {
                watch.check(self.rank(), self.epoch(), self.state, self.outstanding());
                self.transport.idle().await;
            }
        }
    }

    fn check_allocation(&mut self, info: &RecvInfo, allocated: usize) -> NbxResult<()> {
        if allocated >= info.size {
            return Ok(());
        }
        error!(
            rank = self.rank(),
            source = info.source,
            needed = info.size,
            allocated,
            "receive buffer too small"
        );
        self.transport.abort("receive buffer too small");
        Err(NbxError::AllocationTooSmall {
            from_rank: info.source,
            needed: info.size,
            allocated,
        })
    }

    fn set_state(&mut self, state: NbxState) {
        debug!(
            rank = self.rank(),
            epoch = self.epoch(),
            from = %self.state,
            to = %state,
            "exchange state"
        );
        self.state = state;
    }

    /// Report a failure detected by the engine itself and abort the group.
    #[track_caller]
    fn fatal(&mut self, op: &'static str, source: TransportError) -> NbxError {
        let location = Location::caller();
        error!(
            rank = self.rank(),
            epoch = self.epoch(),
            op,
            %location,
            error = %source,
            "exchange failed"
        );
        self.transport.abort(&format!("{op} failed: {source}"));
        NbxError::Transport {
            op,
            location,
            source,
        }
    }

    /// Run one substrate call, aborting the group if it fails.
    #[track_caller]
    fn call<R>(
        transport: &mut T,
        op: &'static str,
        f: impl FnOnce(&mut T) -> TransportResult<R>,
    ) -> NbxResult<R> {
        match f(transport) {
            Ok(value) => Ok(value),
            Err(source) => {
                let location = Location::caller();
                error!(
                    rank = transport.rank(),
                    op,
                    %location,
                    error = %source,
                    "transport call failed"
                );
                transport.abort(&format!("{op} failed: {source}"));
                Err(NbxError::Transport {
                    op,
                    location,
                    source,
                })
            }
        }
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for NbxEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NbxEngine")
            .field("transport", &self.transport)
            .field("epoch", &self.epoch.current())
            .field("state", &self.state)
            .field("outstanding", &self.outstanding())
            .field("stats", &self.stats)
            .finish()
    }
}
