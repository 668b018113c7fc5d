// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Work units derived from a partition plan, and the slicing of a unit
//! into sequential sub-passes for multi-pass dispatch.

use std::ops::Range;

use crate::partition::PartitionPlan;

/// A contiguous band of rows owned by exactly one worker.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorkUnit {
    /// Position of the unit in the plan, `0..unit_count`.
    pub index: usize,
    /// First row of the band.
    pub range_start: usize,
    /// One past the last row of the band.
    pub range_end: usize,
    /// Number of rows in the band.
    pub width: usize,
}

impl WorkUnit {
    /// The rows this unit renders.
    pub fn rows(&self) -> Range<usize> {
        self.range_start..self.range_end
    }

    /// The rows of sub-pass `pass` when the unit is cut into `passes`
    /// slices.  Every slice but the last is `width / passes` rows; the
    /// last one takes what is left, so slices may be empty when the unit
    /// is narrower than the number of passes.
    pub fn sub_pass(&self, pass: usize, passes: usize) -> Range<usize> {
        debug_assert!(pass < passes);
        let step = self.width / passes;
        let start = self.range_start + pass * step;
        let end = if pass + 1 == passes {
            self.range_end
        } else {
            start + step
        };
        start..end
    }
}

impl PartitionPlan {
    /// The unit at `index`, or `None` past the end of the plan.  Every
    /// unit is `chunk_size` rows wide except the last, which also
    /// carries the remainder.
    pub fn unit(&self, index: usize) -> Option<WorkUnit> {
        if index >= self.unit_count {
            return None;
        }
        let range_start = index * self.chunk_size;
        let width = if index + 1 == self.unit_count {
            self.chunk_size + self.remainder
        } else {
            self.chunk_size
        };
        Some(WorkUnit {
            index,
            range_start,
            range_end: range_start + width,
            width,
        })
    }

    /// Every unit of the plan, in order.
    pub fn units(&self) -> impl Iterator<Item = WorkUnit> + '_ {
        (0..self.unit_count).filter_map(move |i| self.unit(i))
    }
}

/// Where one worker stands in the multi-pass protocol.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorkerState {
    /// The unit the worker owns.
    pub unit_index: usize,
    /// The sub-pass the worker is on.
    pub subchunk_cursor: usize,
}

impl WorkerState {
    /// A worker about to run its first sub-pass.
    pub fn new(unit_index: usize) -> Self {
        WorkerState {
            unit_index,
            subchunk_cursor: 0,
        }
    }

    /// Acknowledge the current sub-pass.  Returns the next pass to run,
    /// or `None` when the acknowledged pass was the unit's last.
    pub fn advance(&mut self, passes: usize) -> Option<usize> {
        if self.subchunk_cursor + 1 < passes {
            self.subchunk_cursor += 1;
            Some(self.subchunk_cursor)
        } else {
            None
        }
    }
}
