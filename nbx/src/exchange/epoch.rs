//! Epoch counter and tag partitioning.
//!
//! Consecutive exchanges use disjoint tag ranges, so a process that left the
//! termination barrier early cannot match its next epoch's probes against
//! messages still trailing from the previous one.

use std::ops::Range;

use nbx_core::Tag;

use crate::NbxConfig;

/// Wrapping epoch counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EpochCounter {
    current: u32,
    cycle: u32,
}

impl EpochCounter {
    pub(crate) fn new(cycle: u32) -> Self {
        Self { current: 0, cycle }
    }

    pub(crate) fn current(&self) -> u32 {
        self.current
    }

    pub(crate) fn advance(&mut self) {
        self.current = (self.current + 1) % self.cycle;
    }
}

/// Tag ranges owned by each epoch.
///
/// | Tag | Use |
/// |-----|-----|
/// | `start + i`, `i < stride - 1` | data message `i` of a discovering sender |
/// | `start` | every data message of the known-source modes |
/// | `start + stride - 1` | length exchange |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagLayout {
    base: Tag,
    stride: Tag,
}

impl TagLayout {
    pub(crate) fn new(config: &NbxConfig) -> Self {
        Self {
            base: config.tag_base,
            stride: config.tag_stride,
        }
    }

    /// Every tag of `epoch`.
    pub(crate) fn range(&self, epoch: u32) -> Range<Tag> {
        let start = self.base + epoch * self.stride;
        start..start + self.stride
    }

    /// Data tags of `epoch`, excluding the length tag.
    pub(crate) fn data_range(&self, epoch: u32) -> Range<Tag> {
        let range = self.range(epoch);
        range.start..range.end - 1
    }

    pub(crate) fn data_tag(&self, epoch: u32, index: usize) -> Tag {
        self.range(epoch).start + index as Tag
    }

    pub(crate) fn length_tag(&self, epoch: u32) -> Tag {
        self.range(epoch).end - 1
    }

    /// Tag relative to the start of `epoch`.
    pub(crate) fn relative(&self, epoch: u32, tag: Tag) -> Tag {
        tag - self.range(epoch).start
    }

    pub(crate) fn max_messages(&self) -> usize {
        (self.stride - 1) as usize
    }
}
