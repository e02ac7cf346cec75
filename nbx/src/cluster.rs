//! The explicit communication context.

use nbx_core::{Rank, Transport};

use crate::{NbxConfig, NbxEngine, NbxError, NbxResult};

/// Communication context of one process.
///
/// Owns the exchange engine and therefore the epoch counter of the process.
/// Every collective is a method on the context; there is no global state, so
/// several independent contexts can coexist as long as their tag spaces
/// (see [`NbxConfig::tag_base`]) do not overlap.
///
/// The context is created when the process joins the group and dropped when
/// it leaves.
#[derive(Debug)]
pub struct Cluster<T: Transport> {
    pub(crate) engine: NbxEngine<T>,
}

impl<T: Transport> Cluster<T> {
    /// Context over `transport`.
    pub fn new(transport: T, config: NbxConfig) -> NbxResult<Self> {
        Ok(Self {
            engine: NbxEngine::new(transport, config)?,
        })
    }

    /// Context around an existing engine.
    pub fn from_engine(engine: NbxEngine<T>) -> Self {
        Self { engine }
    }

    /// Rank of this process.
    pub fn rank(&self) -> Rank {
        self.engine.rank()
    }

    /// Number of processes in the group.
    pub fn size(&self) -> usize {
        self.engine.size()
    }

    /// The exchange engine.
    pub fn engine(&self) -> &NbxEngine<T> {
        &self.engine
    }

    /// Mutable access to the exchange engine, for raw exchanges.
    pub fn engine_mut(&mut self) -> &mut NbxEngine<T> {
        &mut self.engine
    }

    /// Give back the engine.
    pub fn into_engine(self) -> NbxEngine<T> {
        self.engine
    }

    pub(crate) fn check_rank(&self, rank: Rank) -> NbxResult<()> {
        let size = self.size();
        if rank < size {
            Ok(())
        } else {
            Err(NbxError::InvalidRank { rank, size })
        }
    }
}
