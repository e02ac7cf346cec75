//! Dynamic sparse data exchange.
//!
//! Every process of a group calls the engine once per epoch with the messages
//! it wants to send. Nobody needs to know who sends to it: receivers probe
//! for incoming messages while their own synchronous sends complete, then
//! enter a non-blocking barrier and keep probing until the barrier completes
//! on their side. A completed barrier proves every send of the group was
//! matched, so nothing addressed to this process is still in flight.
//!
//! | Mode | Receiver knows | Rounds |
//! |------|----------------|--------|
//! | [`ExchangeMode::Discover`] | nothing | probe loop + barrier |
//! | [`ExchangeMode::KnownSources`] | who sends | length round + data round |
//! | [`ExchangeMode::KnownSizes`] | who sends and how much | data round |

mod alloc;
mod engine;
mod epoch;
mod recv_table;
mod state;

pub use alloc::{ExactAlloc, RecvAllocator, RecvInfo};
pub use engine::{ExchangeMode, ExchangeStats, NbxEngine, Outgoing};
pub use recv_table::{RecvEntry, RecvTable};
pub use state::NbxState;
