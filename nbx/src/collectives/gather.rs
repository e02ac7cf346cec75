use bytes::Bytes;
use nbx_core::{Rank, Transport};
use nbx_pack::{pack_to_vec, AllProps, Pack, Props};
use tracing::debug;

use super::{merge_table, Merge, RecvSummary};
use crate::{Cluster, ExactAlloc, ExchangeMode, NbxResult, Outgoing};

impl<T: Transport> Cluster<T> {
    /// Collect every process's `send` at `root`.
    ///
    /// Non-root processes ship their packed value to the root, which merges
    /// the remote contributions in rank order and its own value last. The
    /// returned summary is empty everywhere but at the root.
    ///
    /// A value that packs to zero bytes is not sent and is missing at the root.
    pub async fn gather<S, R, M>(
        &mut self,
        send: &S,
        recv: &mut R,
        root: Rank,
        merge: M,
    ) -> NbxResult<RecvSummary>
    where
        S: Pack + ?Sized,
        R: ?Sized,
        M: Merge<R>,
    {
        self.gather_props::<AllProps, S, R, M>(send, recv, root, merge)
            .await
    }

    /// [`gather`](Cluster::gather) packing only the fields selected by `P`.
    pub async fn gather_props<P, S, R, M>(
        &mut self,
        send: &S,
        recv: &mut R,
        root: Rank,
        mut merge: M,
    ) -> NbxResult<RecvSummary>
    where
        P: Props,
        S: Pack + ?Sized,
        R: ?Sized,
        M: Merge<R>,
    {
        self.check_rank(root)?;
        let rank = self.rank();
        let payload = Bytes::from(pack_to_vec::<P, S>(send)?);

        let sends = if rank == root {
            Vec::new()
        } else {
            vec![Outgoing::new(root, payload.clone())]
        };
        let mut table = self
            .engine
            .exchange(sends, ExchangeMode::Discover, &mut ExactAlloc)
            .await?;
        if rank != root {
            return Ok(RecvSummary::default());
        }

        table.push_local(rank, None, &payload);
        table.reorder();
        let summary = merge_table::<P, R, M>(&table, recv, &mut merge)?;
        debug!(rank, sources = summary.len(), elements = summary.total(), "gather merged");
        Ok(summary)
    }
}
