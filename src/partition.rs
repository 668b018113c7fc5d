// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The load partitioner.  Given the size of the row domain, the number
//! of execution units and a virtualization factor, decide how big each
//! work unit is and how many of them there are.
//!
//! The virtualization factor slides the chunk size linearly between
//! `total / workers` (one unit per worker) at 0.0 and a single row per
//! unit at 1.0.  Whatever does not divide evenly is first spread across
//! all units, and only the residue left after that lands on the last
//! unit.

use crate::error::{Error, Result};

/// The outcome of partitioning: immutable once computed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PartitionPlan {
    /// Number of rows in the domain.
    pub total_load: usize,
    /// Number of execution units the split was tuned for.
    pub worker_hint: usize,
    /// Granularity knob, 0.0 (coarse) to 1.0 (fine).
    pub virtualization: f64,
    /// Rows per work unit.
    pub chunk_size: usize,
    /// Extra rows carried by the last unit.
    pub remainder: usize,
    /// Number of work units.
    pub unit_count: usize,
}

impl PartitionPlan {
    /// Partition `total_load` rows for `worker_hint` execution units.
    pub fn new(virtualization: f64, total_load: usize, worker_hint: usize) -> Result<Self> {
        let (chunk_size, remainder, unit_count) =
            compute_partition(virtualization, total_load, worker_hint)?;
        Ok(PartitionPlan {
            total_load,
            worker_hint,
            virtualization,
            chunk_size,
            remainder,
            unit_count,
        })
    }

    /// True when the whole domain is rendered by one unit, which then
    /// writes the single combined artifact.
    pub fn is_single_unit(&self) -> bool {
        self.unit_count == 1
    }
}

/// Returns `(chunk_size, remainder, unit_count)`.
///
/// Pure and deterministic.  Fails with `InvalidArgument` when the inputs
/// are out of range and `InvalidPartition` when the arithmetic would
/// produce an empty chunk or no units at all.
pub fn compute_partition(
    virtualization: f64,
    total_load: usize,
    worker_count: usize,
) -> Result<(usize, usize, usize)> {
    if !(0.0..=1.0).contains(&virtualization) {
        return Err(Error::InvalidArgument(format!(
            "virtualization must be in [0.0, 1.0], got {}",
            virtualization
        )));
    }
    if total_load == 0 {
        return Err(Error::InvalidArgument("total load must be positive".to_string()));
    }
    if worker_count == 0 {
        return Err(Error::InvalidArgument("worker count must be positive".to_string()));
    }

    let total = total_load as i64;
    let n = total_load as f64 / worker_count as f64;
    let mut chunk_size = ((1.0 - n) * virtualization + n).round() as i64;
    if chunk_size <= 0 {
        return Err(Error::InvalidPartition {
            chunk_size,
            unit_count: 0,
        });
    }

    let unit_count = total / chunk_size;
    if unit_count <= 0 {
        return Err(Error::InvalidPartition {
            chunk_size,
            unit_count,
        });
    }

    // Spread the leftover over every unit before handing the residue to
    // the last one.
    let remainder = total - unit_count * chunk_size;
    chunk_size += remainder / unit_count;
    let remainder = total - unit_count * chunk_size;

    Ok((chunk_size as usize, remainder as usize, unit_count as usize))
}
