// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The all-contribute barrier.  Each work unit contributes exactly once;
//! when the last distinct unit arrives the terminal callback runs, once,
//! and the tracker goes inert.
//!
//! The tracker itself is not synchronized.  It is either owned by the
//! single consumer of the report channel (as the coordinator does) or
//! wrapped in a `Mutex` by whoever shares it.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::error::{Error, Result};

/// What a contribution did to the barrier.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Progress {
    /// Still waiting on this many units.
    Pending(usize),
    /// That was the last one; the callback has run.
    Complete,
}

/// Counts distinct unit contributions against an expected total.
pub struct CompletionTracker<F: FnOnce()> {
    expected: usize,
    received: HashSet<usize>,
    on_complete: Option<F>,
}

impl<F: FnOnce()> CompletionTracker<F> {
    /// A barrier for units `0..expected` that runs `on_complete` when
    /// all of them have reported.
    pub fn new(expected: usize, on_complete: F) -> Self {
        CompletionTracker {
            expected,
            received: HashSet::with_capacity(expected),
            on_complete: Some(on_complete),
        }
    }

    /// Record that `unit` has finished.
    ///
    /// A unit seen before is a `DuplicateContribution`; anything arriving
    /// once the barrier has fired, or naming a unit outside the plan, is
    /// an `ExcessContribution`.  Neither changes the count.
    pub fn on_contribution(&mut self, unit: usize) -> Result<Progress> {
        if self.is_complete() || unit >= self.expected {
            error!(unit, expected = self.expected, "contribution past the barrier");
            return Err(Error::ExcessContribution(unit));
        }
        if !self.received.insert(unit) {
            error!(unit, "duplicate contribution");
            return Err(Error::DuplicateContribution(unit));
        }

        let remaining = self.expected - self.received.len();
        debug!(unit, remaining, "contribution received");
        if remaining > 0 {
            return Ok(Progress::Pending(remaining));
        }
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
        Ok(Progress::Complete)
    }

    /// Units the barrier is waiting for in total.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Distinct units heard from so far.
    pub fn received(&self) -> usize {
        self.received.len()
    }

    /// True once the terminal callback has run.
    pub fn is_complete(&self) -> bool {
        self.on_complete.is_none()
    }
}
