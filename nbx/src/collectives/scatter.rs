use nbx_core::{Rank, Transport};
use nbx_pack::{pack_batch, AllProps, Pack, Props};
use tracing::debug;

use super::{merge_table, Merge, RecvSummary};
use crate::{Cluster, ExactAlloc, ExchangeMode, NbxError, NbxResult, Outgoing};

impl<T: Transport> Cluster<T> {
    /// Distribute consecutive slices of the root's `send` to `processes`.
    ///
    /// `processes[i]` receives the next `sizes[i]` elements of `send` as a
    /// packed vector, including when the slice is empty. Only the root's
    /// `send`, `processes` and `sizes` are read. Every process merges what it
    /// received into `recv`; the root merges its own slices locally.
    pub async fn scatter<E, R, M>(
        &mut self,
        send: &[E],
        recv: &mut R,
        processes: &[Rank],
        sizes: &[usize],
        root: Rank,
        merge: M,
    ) -> NbxResult<RecvSummary>
    where
        E: Pack,
        R: ?Sized,
        M: Merge<R>,
    {
        self.scatter_props::<AllProps, E, R, M>(send, recv, processes, sizes, root, merge)
            .await
    }

    /// [`scatter`](Cluster::scatter) packing only the fields selected by `P`.
    pub async fn scatter_props<P, E, R, M>(
        &mut self,
        send: &[E],
        recv: &mut R,
        processes: &[Rank],
        sizes: &[usize],
        root: Rank,
        mut merge: M,
    ) -> NbxResult<RecvSummary>
    where
        P: Props,
        E: Pack,
        R: ?Sized,
        M: Merge<R>,
    {
        self.check_rank(root)?;
        let rank = self.rank();

        let mut sends = Vec::new();
        let mut local = Vec::new();
        if rank == root {
            if processes.len() != sizes.len() {
                return Err(NbxError::LengthMismatch {
                    what: "scatter sizes",
                    expected: processes.len(),
                    actual: sizes.len(),
                });
            }
            let total = sizes.iter().try_fold(0usize, |acc, &s| acc.checked_add(s));
            match total {
                Some(total) if total <= send.len() => {}
                _ => {
                    return Err(NbxError::LengthMismatch {
                        what: "scatter elements",
                        expected: send.len(),
                        actual: total.unwrap_or(usize::MAX),
                    });
                }
            }
            for &process in processes {
                self.check_rank(process)?;
            }

            let mut start = 0;
            let slices: Vec<&[E]> = sizes
                .iter()
                .map(|&size| {
                    let slice = &send[start..start + size];
                    start += size;
                    slice
                })
                .collect();
            let payloads = pack_batch::<P, [E]>(&slices)?;
            for (&process, payload) in processes.iter().zip(payloads) {
                if process == root {
                    local.push(payload);
                } else {
                    sends.push(Outgoing::new(process, payload));
                }
            }
        }

        let mut table = self
            .engine
            .exchange(sends, ExchangeMode::Discover, &mut ExactAlloc)
            .await?;
        for payload in &local {
            table.push_local(rank, None, payload);
        }
        table.reorder();

        let summary = merge_table::<P, R, M>(&table, recv, &mut merge)?;
        debug!(
            rank,
            root,
            messages = summary.len(),
            elements = summary.total(),
            "scatter merged"
        );
        Ok(summary)
    }
}
