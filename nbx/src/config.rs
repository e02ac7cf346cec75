//! Configuration of the exchange engine.

use std::time::Duration;

use nbx_core::Tag;
use serde::{Deserialize, Serialize};

use crate::{NbxError, NbxResult};

/// Largest tag every MPI implementation is required to support.
const PORTABLE_TAG_MAX: u64 = i32::MAX as u64;

/// Configuration of an [`NbxEngine`](crate::NbxEngine).
///
/// Every exchange epoch owns a contiguous range of `tag_stride` tags starting
/// at `tag_base + epoch * tag_stride`. Epochs wrap after `epoch_cycle`, so the
/// whole tag space is `epoch_cycle * tag_stride` tags.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nbx::NbxConfig;
///
/// let config = NbxConfig::default()
///     .with_tag_base(1 << 20)
///     .with_stall_report_after(Some(Duration::from_secs(30)));
/// config.validate().expect("fits the portable tag range");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NbxConfig {
    /// Number of epochs before the counter wraps.
    pub epoch_cycle: u32,

    /// First tag used by the engine.
    pub tag_base: Tag,

    /// Tags reserved per epoch. The last one carries the length exchange of
    /// the known-sources mode, so an epoch holds at most `tag_stride - 1`
    /// outgoing messages per process.
    pub tag_stride: Tag,

    /// Wall-clock delay after which a still-running epoch is reported.
    ///
    /// The report is a log line only; the epoch keeps running. `None`
    /// disables it.
    pub stall_report_after: Option<Duration>,
}

impl Default for NbxConfig {
    fn default() -> Self {
        Self {
            epoch_cycle: 2048,
            tag_base: 0,
            tag_stride: 131_072,
            stall_report_after: Some(Duration::from_secs(10)),
        }
    }
}

impl NbxConfig {
    /// Set the number of epochs before the counter wraps.
    pub fn with_epoch_cycle(mut self, epoch_cycle: u32) -> Self {
        self.epoch_cycle = epoch_cycle;
        self
    }

    /// Set the first tag used by the engine.
    pub fn with_tag_base(mut self, tag_base: Tag) -> Self {
        self.tag_base = tag_base;
        self
    }

    /// Set the number of tags reserved per epoch.
    pub fn with_tag_stride(mut self, tag_stride: Tag) -> Self {
        self.tag_stride = tag_stride;
        self
    }

    /// Set or disable the stall report delay.
    pub fn with_stall_report_after(mut self, delay: Option<Duration>) -> Self {
        self.stall_report_after = delay;
        self
    }

    /// Check that the tag space is usable.
    pub fn validate(&self) -> NbxResult<()> {
        if self.epoch_cycle == 0 {
            return Err(NbxError::InvalidConfig(
                "epoch_cycle must be at least 1".to_string(),
            ));
        }
        if self.tag_stride < 2 {
            return Err(NbxError::InvalidConfig(format!(
                "tag_stride {} leaves no room for data tags",
                self.tag_stride
            )));
        }
        let end = u64::from(self.tag_base)
            + u64::from(self.epoch_cycle) * u64::from(self.tag_stride);
        if end > PORTABLE_TAG_MAX + 1 {
            return Err(NbxError::InvalidConfig(format!(
                "tag space {}..{end} exceeds the portable tag limit {PORTABLE_TAG_MAX}",
                self.tag_base
            )));
        }
        Ok(())
    }
}
