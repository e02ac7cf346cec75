use std::fmt;

/// Progress of the current exchange epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NbxState {
    /// No exchange posted.
    Idle,
    /// Sends posted, nothing executed yet.
    Sending,
    /// Probing for incoming messages while own sends complete.
    Draining,
    /// Own sends completed and the barrier entered; still receiving.
    BarrierPending,
    /// The last epoch finished on this process.
    Done,
}

impl NbxState {
    /// Whether an epoch is in progress.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            NbxState::Sending | NbxState::Draining | NbxState::BarrierPending
        )
    }
}

impl fmt::Display for NbxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NbxState::Idle => "idle",
            NbxState::Sending => "sending",
            NbxState::Draining => "draining",
            NbxState::BarrierPending => "barrier-pending",
            NbxState::Done => "done",
        };
        f.write_str(name)
    }
}
