use std::ops::Add;

use bytes::Bytes;
use nbx_core::{Rank, Transport};
use nbx_pack::{pack_to_vec, unpack_from, AllProps, Unpack};

use crate::{Cluster, ExactAlloc, ExchangeMode, NbxError, NbxResult, Outgoing};

impl<T: Transport> Cluster<T> {
    /// Every process's `value`, in rank order, on every process.
    pub async fn all_gather<V>(&mut self, value: &V) -> NbxResult<Vec<V>>
    where
        V: Unpack + Default,
    {
        let rank = self.rank();
        let payload = Bytes::from(pack_to_vec::<AllProps, V>(value)?);
        let others: Vec<Rank> = (0..self.size()).filter(|&peer| peer != rank).collect();
        let sends = others
            .iter()
            .map(|&peer| Outgoing::new(peer, payload.clone()))
            .collect();

        let mut table = self
            .engine
            .exchange(sends, ExchangeMode::KnownSources(others), &mut ExactAlloc)
            .await?;
        table.push_local(rank, Some(0), &payload);
        table.reorder();

        table
            .iter()
            .map(|entry| unpack_from::<AllProps, V>(entry.payload()).map_err(NbxError::from))
            .collect()
    }

    /// Replace `value` on every process with the root's.
    pub async fn broadcast<V>(&mut self, value: &mut V, root: Rank) -> NbxResult<()>
    where
        V: Unpack + Default,
    {
        self.check_rank(root)?;
        let rank = self.rank();
        let sends = if rank == root {
            let payload = Bytes::from(pack_to_vec::<AllProps, V>(value)?);
            (0..self.size())
                .filter(|&peer| peer != root)
                .map(|peer| Outgoing::new(peer, payload.clone()))
                .collect()
        } else {
            Vec::new()
        };

        let table = self
            .engine
            .exchange(sends, ExchangeMode::Discover, &mut ExactAlloc)
            .await?;
        if rank == root {
            return Ok(());
        }
        let entry = table.iter().find(|entry| entry.source == root).ok_or_else(|| {
            NbxError::InvalidState {
                message: format!("no broadcast message from root {root}"),
            }
        })?;
        *value = unpack_from::<AllProps, V>(entry.payload())?;
        Ok(())
    }

    /// Fold every process's `value` with `op`, in rank order, on every process.
    ///
    /// All processes fold the same sequence the same way, so the result is
    /// identical everywhere even for operations that are not associative,
    /// such as floating-point addition.
    pub async fn all_reduce<V, F>(&mut self, value: &V, op: F) -> NbxResult<V>
    where
        V: Unpack + Default,
        F: FnMut(V, V) -> V,
    {
        self.all_gather(value)
            .await?
            .into_iter()
            .reduce(op)
            .ok_or_else(|| NbxError::InvalidState {
                message: "all_reduce over an empty group".to_string(),
            })
    }

    /// Sum of every process's `value`.
    pub async fn sum<V>(&mut self, value: &V) -> NbxResult<V>
    where
        V: Unpack + Default + Add<Output = V>,
    {
        self.all_reduce(value, |a, b| a + b).await
    }

    /// Largest of every process's `value`; the lowest rank wins ties.
    pub async fn max<V>(&mut self, value: &V) -> NbxResult<V>
    where
        V: Unpack + Default + PartialOrd,
    {
        self.all_reduce(value, |a, b| if b > a { b } else { a }).await
    }

    /// Smallest of every process's `value`; the lowest rank wins ties.
    pub async fn min<V>(&mut self, value: &V) -> NbxResult<V>
    where
        V: Unpack + Default + PartialOrd,
    {
        self.all_reduce(value, |a, b| if b < a { b } else { a }).await
    }
}
