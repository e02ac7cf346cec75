use nbx_core::{Rank, Transport};
use nbx_pack::{pack_batch, AllProps, Pack, Props};
use tracing::debug;

use super::{merge_table, Merge, RecvSummary};
use crate::{Cluster, ExactAlloc, ExchangeMode, NbxError, NbxResult, Outgoing};

impl<T: Transport> Cluster<T> {
    /// Many-to-many exchange: send `payloads[i]` to `dests[i]` and merge
    /// everything received into `recv`.
    ///
    /// Received messages are merged by ascending source rank, and in send
    /// order for messages from the same source. The summary lists the source
    /// and element count of every merged message.
    ///
    /// With [`ExchangeMode::Discover`] empty payloads are not sent; packed
    /// containers always carry a length prefix, so this only concerns values
    /// that pack to zero bytes.
    ///
    /// ```no_run
    /// # use nbx::{Cluster, ExchangeMode, NbxResult, Push, Transport};
    /// # async fn ring<T: Transport>(cluster: &mut Cluster<T>) -> NbxResult<()> {
    /// let next = (cluster.rank() + 1) % cluster.size();
    /// let greeting = format!("Hello from {} to {next}", cluster.rank());
    ///
    /// let mut inbox: Vec<String> = Vec::new();
    /// let summary = cluster
    ///     .send_recv(&[next], &[greeting.as_str()], &mut inbox, ExchangeMode::Discover, Push)
    ///     .await?;
    /// assert_eq!(summary.len(), inbox.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_recv<S, R, M>(
        &mut self,
        dests: &[Rank],
        payloads: &[&S],
        recv: &mut R,
        mode: ExchangeMode,
        merge: M,
    ) -> NbxResult<RecvSummary>
    where
        S: Pack + ?Sized,
        R: ?Sized,
        M: Merge<R>,
    {
        self.send_recv_props::<AllProps, S, R, M>(dests, payloads, recv, mode, merge)
            .await
    }

    /// [`send_recv`](Cluster::send_recv) packing only the fields selected by `P`.
    pub async fn send_recv_props<P, S, R, M>(
        &mut self,
        dests: &[Rank],
        payloads: &[&S],
        recv: &mut R,
        mode: ExchangeMode,
        mut merge: M,
    ) -> NbxResult<RecvSummary>
    where
        P: Props,
        S: Pack + ?Sized,
        R: ?Sized,
        M: Merge<R>,
    {
        if dests.len() != payloads.len() {
            return Err(NbxError::LengthMismatch {
                what: "send_recv payloads",
                expected: dests.len(),
                actual: payloads.len(),
            });
        }

        let sends = dests
            .iter()
            .zip(pack_batch::<P, S>(payloads)?)
            .map(|(&dest, payload)| Outgoing::new(dest, payload))
            .collect();
        let mut table = self.engine.exchange(sends, mode, &mut ExactAlloc).await?;
        table.reorder();

        let summary = merge_table::<P, R, M>(&table, recv, &mut merge)?;
        debug!(
            rank = self.rank(),
            messages = summary.len(),
            elements = summary.total(),
            "send_recv merged"
        );
        Ok(summary)
    }
}
