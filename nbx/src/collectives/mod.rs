//! Semantic collectives.
//!
//! Collectives pack their input, run one exchange epoch, reorder the
//! received messages by `(source, tag)` and merge them into the receive
//! container. The reorder makes the merged result independent of network
//! arrival order.
//!
//! | Collective | Mode | Merged at |
//! |------------|------|-----------|
//! | [`gather`](crate::Cluster::gather) | discover | root, own value last |
//! | [`scatter`](crate::Cluster::scatter) | discover | every listed process |
//! | [`send_recv`](crate::Cluster::send_recv) | caller's choice | everyone |
//! | [`all_gather`](crate::Cluster::all_gather) | known sources | everyone, rank order |
//! | [`broadcast`](crate::Cluster::broadcast) | discover | every non-root |
//! | [`all_reduce`](crate::Cluster::all_reduce) | known sources | everyone, folded in rank order |

mod gather;
mod merge;
mod reduce;
mod scatter;
mod send_recv;

pub use merge::{Append, Merge, Push, RecvSummary, ReplaceAt, ZeroCopyAppend};

use nbx_pack::Props;

use crate::{NbxResult, RecvTable};

/// Merge every entry of a reordered table into `recv`.
fn merge_table<P, R, M>(table: &RecvTable, recv: &mut R, merge: &mut M) -> NbxResult<RecvSummary>
where
    P: Props,
    R: ?Sized,
    M: Merge<R>,
{
    let mut summary = RecvSummary::default();
    for entry in table {
        let count = merge.merge::<P>(recv, entry.payload(), entry.source)?;
        summary.record(entry.source, count);
    }
    Ok(summary)
}
