// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run configuration.  `Config` is what the user asked for, as loosely
//! typed as the command line; `Settings` is what survives validation and
//! is never changed afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::kernel::DEFAULT_ITERATIONS;
use crate::raster::Format;

/// Rows (and columns) of the raster when none are given.
pub const DEFAULT_DOMAIN_SIZE: i64 = 600;

/// How work units are driven.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// Each worker renders its whole unit in one go.
    SinglePass,
    /// Each worker renders its unit as `unit_count` sequential
    /// sub-passes, one artifact open at a time.
    MultiPass,
}

impl Dispatch {
    /// Label used in the startup banner.
    pub fn label(self) -> &'static str {
        match self {
            Dispatch::SinglePass => "single-pass",
            Dispatch::MultiPass => "multi-pass",
        }
    }
}

/// Unvalidated run configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Side of the square raster, in pixels.
    pub domain_size: i64,
    /// Granularity knob, 0.0 to 1.0.
    pub virtualization: f64,
    /// Execution units to tune the partition for.
    pub workers: i64,
    /// Escape-time iteration limit.
    pub iterations: i64,
    /// Directory artifacts are written into.
    pub output_dir: PathBuf,
    /// Artifact file format.
    pub format: Format,
    /// Single- or multi-pass.
    pub dispatch: Dispatch,
    /// Give up waiting after this many seconds.
    pub timeout: Option<f64>,
    /// Print a line per finished unit.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            domain_size: DEFAULT_DOMAIN_SIZE,
            virtualization: 0.0,
            workers: num_cpus::get() as i64,
            iterations: DEFAULT_ITERATIONS as i64,
            output_dir: PathBuf::from("."),
            format: Format::Ppm,
            dispatch: Dispatch::SinglePass,
            timeout: None,
            progress: false,
        }
    }
}

/// Validated, normalized run configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Side of the square raster, in pixels.
    pub domain_size: usize,
    /// Granularity knob, within 0.0 to 1.0.
    pub virtualization: f64,
    /// Execution units, never more than there are rows.
    pub workers: usize,
    /// Escape-time iteration limit.
    pub iterations: usize,
    /// Existing directory artifacts are written into.
    pub output_dir: PathBuf,
    /// Artifact file format.
    pub format: Format,
    /// Single- or multi-pass.
    pub dispatch: Dispatch,
    /// Deadline for the completion barrier.
    pub timeout: Option<Duration>,
    /// Print a line per finished unit.
    pub progress: bool,
}

fn positive(name: &str, value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(Error::InvalidArgument(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(value as usize)
}

impl Config {
    /// Check every value and produce the settings the run will use.
    pub fn validate(&self) -> Result<Settings> {
        let domain_size = positive("domain size", self.domain_size)?;
        let workers = positive("worker count", self.workers)?;
        let iterations = positive("iteration count", self.iterations)?;

        if !(0.0..=1.0).contains(&self.virtualization) {
            return Err(Error::InvalidArgument(format!(
                "virtualization must be in [0.0, 1.0], got {}",
                self.virtualization
            )));
        }

        let timeout = match self.timeout {
            None => None,
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => {
                return Err(Error::InvalidArgument(format!(
                    "timeout must be a positive number of seconds, got {}",
                    secs
                )))
            }
        };

        if !self.output_dir.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "output directory {} does not exist",
                self.output_dir.display()
            )));
        }

        Ok(Settings {
            domain_size,
            virtualization: self.virtualization,
            // More units than rows cannot be split.
            workers: workers.min(domain_size),
            iterations,
            output_dir: self.output_dir.clone(),
            format: self.format,
            dispatch: self.dispatch,
            timeout,
            progress: self.progress,
        })
    }
}
