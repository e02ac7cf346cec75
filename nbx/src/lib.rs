//! # nbx
//!
//! Dynamic sparse data exchange for message-passing process groups.
//!
//! Every process of a group says what it wants to send and to whom; nobody
//! says what it expects to receive. One exchange epoch later each process
//! holds exactly the messages addressed to it, ordered the same way on every
//! run.
//!
//! ## Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              nbx (this crate)                               │
//! │   Cluster context • NBX engine • collectives + merges       │
//! ├──────────────────────────┬──────────────────────────────────┤
//! │  nbx-pack                │       nbx-sim (tests)            │
//! │  • Type classification   │       • Simulated fabric         │
//! │  • Size request / pack   │       • Seeded arrival order     │
//! │  • Unpack                │       • Barrier skew, watchdog   │
//! ├──────────────────────────┴──────────────────────────────────┤
//! │                     nbx-core                                │
//! │  Transport trait: send, recv, probe, barrier, test, abort   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use nbx::{Append, Cluster, NbxConfig};
//!
//! let mut cluster = Cluster::new(transport, NbxConfig::default())?;
//! let mine = vec![cluster.rank() as u64; 3];
//! let mut all: Vec<u64> = Vec::new();
//! cluster.gather(&mine, &mut all, 0, Append).await?;
//! ```
//!
//! ## Which Crate to Use
//!
//! | Use case | Crate |
//! |----------|-------|
//! | Exchanges and collectives (recommended) | `nbx` |
//! | Implementing a substrate | `nbx-core` |
//! | Serialization only | `nbx-pack` |
//! | Testing with a simulated group | `nbx-sim` |

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// Re-export all public items from sub-crates
pub use nbx_core::*;
pub use nbx_pack::*;

mod cluster;
mod collectives;
mod config;
mod error;
mod exchange;

// Context exports
pub use cluster::Cluster;
pub use config::NbxConfig;

// Exchange exports
pub use exchange::{
    ExactAlloc, ExchangeMode, ExchangeStats, NbxEngine, NbxState, Outgoing, RecvAllocator,
    RecvEntry, RecvInfo, RecvTable,
};

// Collective exports
pub use collectives::{Append, Merge, Push, RecvSummary, ReplaceAt, ZeroCopyAppend};

// Error exports
pub use error::{NbxError, NbxResult};
