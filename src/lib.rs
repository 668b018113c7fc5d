#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer with tunable over-decomposition.
//!
//! Rendering the Mandelbrot set is embarrassingly parallel: every pixel
//! is colored on its own, by counting how many times `z = z * z + c`
//! can be iterated before `z` runs off to infinity.  What is left to
//! decide is how to cut the image up.
//!
//! The rows of the image are split into contiguous work units.  A
//! single "virtualization" factor between 0 and 1 picks how many: at 0
//! there is one unit per execution unit, at 1 there is one unit per
//! row.  Each unit is rendered by its own worker thread and written to
//! its own image file.  The coordinator waits on a completion barrier
//! that releases once every unit has reported exactly once, then
//! reports the elapsed time.

extern crate crossbeam;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod config;
pub mod coordinator;
pub mod error;
pub mod kernel;
pub mod partition;
pub mod plan;
pub mod planes;
pub mod raster;
pub mod tracker;
pub mod worker;

pub use config::{Config, Dispatch, Settings};
pub use coordinator::{Coordinator, Phase, Summary};
pub use error::{ArtifactFailure, Error, Result};
pub use partition::{compute_partition, PartitionPlan};
pub use plan::{WorkUnit, WorkerState};
pub use tracker::{CompletionTracker, Progress};
