// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Every way a render can fail.  All of them are terminal for the run;
//! nothing here is retried.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A single artifact that could not be written.
#[derive(Debug, Error)]
#[error("unit {unit}{}: cannot write {}: {source}", pass_label(.pass), .path.display())]
pub struct ArtifactFailure {
    /// Index of the work unit that failed.
    pub unit: usize,
    /// The sub-pass being written, in multi-pass dispatch.
    pub pass: Option<usize>,
    /// Where the artifact was going.
    pub path: PathBuf,
    /// What the encoder reported.
    #[source]
    pub source: io::Error,
}

fn pass_label(pass: &Option<usize>) -> String {
    match pass {
        Some(p) => format!(" pass {}", p),
        None => String::new(),
    }
}

/// Errors produced while validating, partitioning, dispatching or
/// awaiting a render.
#[derive(Debug, Error)]
pub enum Error {
    /// User supplied configuration outside its legal range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The partition arithmetic degenerated.
    #[error("invalid partition: chunk size {chunk_size}, unit count {unit_count}")]
    InvalidPartition {
        /// Chunk size computed before the guard tripped.
        chunk_size: i64,
        /// Unit count computed before the guard tripped (0 if never reached).
        unit_count: i64,
    },

    /// A unit reported completion twice.
    #[error("work unit {0} contributed more than once")]
    DuplicateContribution(usize),

    /// A unit reported after the barrier had already been released.
    #[error("work unit {0} contributed after every unit had already reported")]
    ExcessContribution(usize),

    /// One or more workers failed to write their artifacts.
    #[error("artifact write failed for unit(s) {}", FailureList(.0))]
    ArtifactWrite(Vec<ArtifactFailure>),

    /// The deadline passed before every unit reported.
    #[error("timed out after {waited:?}: {received} of {expected} units reported")]
    Timeout {
        /// Contributions received before the deadline.
        received: usize,
        /// Contributions the barrier was waiting for.
        expected: usize,
        /// How long the coordinator waited.
        waited: Duration,
    },

    /// Rendering a unit panicked.
    #[error("worker for unit {0} panicked")]
    WorkerPanicked(usize),

    /// Every worker hung up without the barrier firing.
    #[error("workers exited early: {received} of {expected} units reported")]
    WorkersLost {
        /// Contributions received before the channel closed.
        received: usize,
        /// Contributions the barrier was waiting for.
        expected: usize,
    },

    /// The operating system refused to start a worker thread.
    #[error("cannot spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

struct FailureList<'a>(&'a [ArtifactFailure]);

impl<'a> fmt::Display for FailureList<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let units: Vec<String> = self.0.iter().map(|a| a.unit.to_string()).collect();
        write!(f, "{}", units.join(", "))?;
        for failure in self.0 {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_failures_name_every_unit() {
        let err = Error::ArtifactWrite(vec![
            ArtifactFailure {
                unit: 2,
                pass: None,
                path: PathBuf::from("out-mandelbrot-2.ppm"),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            },
            ArtifactFailure {
                unit: 5,
                pass: Some(1),
                path: PathBuf::from("out-mandelbrot-5-1.ppm"),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("artifact write failed for unit(s) 2, 5"));
        assert!(text.contains("unit 5 pass 1: cannot write out-mandelbrot-5-1.ppm: disk full"));
    }
}
