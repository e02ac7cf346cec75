//! Per-process endpoint of a simulated fabric.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use nbx_core::{Completion, Probe, Rank, RequestId, Tag, Transport, TransportResult};

use crate::fabric::FabricState;
use crate::SimFabric;

/// [`Transport`] implementation backed by a [`SimFabric`].
#[derive(Debug, Clone)]
pub struct SimTransport {
    fabric: SimFabric,
    rank: Rank,
}

impl SimTransport {
    pub(crate) fn new(fabric: SimFabric, rank: Rank) -> Self {
        Self { fabric, rank }
    }

    /// The fabric this endpoint belongs to.
    pub fn fabric(&self) -> &SimFabric {
        &self.fabric
    }
}

#[async_trait(?Send)]
impl Transport for SimTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.fabric.size()
    }

    fn post_send(&mut self, dest: Rank, tag: Tag, payload: Bytes) -> TransportResult<RequestId> {
        let rank = self.rank;
        self.fabric.with(|s| s.post_send(rank, dest, tag, payload))
    }

    fn post_recv(
        &mut self,
        source: Rank,
        tag: Tag,
        buffer: Vec<u8>,
    ) -> TransportResult<RequestId> {
        let rank = self.rank;
        self.fabric.with(|s| s.post_recv(rank, source, tag, buffer))
    }

    fn probe_any(&mut self, tags: Range<Tag>) -> TransportResult<Option<Probe>> {
        let rank = self.rank;
        self.fabric.with(|s| s.probe_any(rank, tags))
    }

    fn recv_probed(&mut self, probe: &Probe, buffer: &mut [u8]) -> TransportResult<()> {
        let rank = self.rank;
        self.fabric.with(|s| s.recv_probed(rank, probe, buffer))
    }

    fn post_barrier(&mut self) -> TransportResult<RequestId> {
        let rank = self.rank;
        self.fabric.with(|s| s.post_barrier(rank))
    }

    fn test(&mut self, request: RequestId) -> TransportResult<Option<Completion>> {
        let rank = self.rank;
        self.fabric.with(|s| s.test(rank, request))
    }

    fn abort(&mut self, reason: &str) {
        self.fabric.abort(self.rank, reason);
    }

    async fn idle(&mut self) {
        self.fabric.with(FabricState::advance);
        tokio::task::yield_now().await;
    }
}
