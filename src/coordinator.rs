// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The coordinator validates the configuration, partitions the rows,
//! queues the work units for a fixed pool of threads (one per execution
//! unit) and then sits on the report channel until the completion
//! barrier releases it.
//!
//! It is the only consumer of the report channel, so the completion
//! tracker it owns needs no lock.  In multi-pass dispatch it is also the
//! one that advances each unit's sub-pass cursor, queueing the next
//! sub-pass only once the previous one has been acknowledged.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use crate::config::{Config, Dispatch, Settings};
use crate::error::{Error, Result};
use crate::kernel::{EscapeTime, Kernel};
use crate::partition::PartitionPlan;
use crate::plan::WorkerState;
use crate::planes::PlaneMapper;
use crate::raster::{ArtifactNamer, RasterEncoder};
use crate::tracker::{CompletionTracker, Progress};
use crate::worker::{self, Context, Job, Report};

/// Where the coordinator is in its run.  Phases only move forward.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub enum Phase {
    /// Configuration validated, nothing computed.
    Init,
    /// The partition plan exists.
    Partitioned,
    /// Work is queued and the pool is running.
    Dispatched,
    /// Blocked on the completion barrier.
    AwaitingCompletion,
    /// Barrier released and timing printed.
    Reported,
    /// Pool joined; the run is over.
    Terminated,
}

/// What a successful run produced.
#[derive(Clone, Debug)]
pub struct Summary {
    /// The partition the run used.
    pub plan: PartitionPlan,
    /// Wall-clock time from dispatch to barrier release.
    pub elapsed: Duration,
    /// Every artifact written, in completion order.
    pub artifacts: Vec<PathBuf>,
}

/// Drives a render from configuration to completion.
pub struct Coordinator {
    settings: Settings,
    phase: Phase,
    kernel: Option<Box<dyn Kernel>>,
    encoder: Option<Box<dyn RasterEncoder>>,
    pool: Vec<JoinHandle<()>>,
    // The coordinator keeps its own receiver so it can empty the queue
    // when it gives up.
    jobs: Option<(Sender<Job>, Receiver<Job>)>,
}

impl Coordinator {
    /// Validate `config`.  Nothing is partitioned or started when this
    /// fails.
    pub fn new(config: &Config) -> Result<Self> {
        let settings = config.validate()?;
        Ok(Coordinator::from_settings(settings))
    }

    /// A coordinator for settings that are already validated.
    pub fn from_settings(settings: Settings) -> Self {
        debug!(?settings, "configuration accepted");
        Coordinator {
            settings,
            phase: Phase::Init,
            kernel: None,
            encoder: None,
            pool: vec![],
            jobs: None,
        }
    }

    /// Color pixels with `kernel` instead of the escape-time kernel.
    pub fn with_kernel(mut self, kernel: Box<dyn Kernel>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Write artifacts with `encoder` instead of the configured format.
    pub fn with_encoder(mut self, encoder: Box<dyn RasterEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// The validated settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(next > self.phase);
        debug!(from = ?self.phase, to = ?next, "coordinator phase");
        self.phase = next;
    }

    /// Run the whole lifecycle: partition, print the banner, dispatch,
    /// wait for every unit, print the timing.  On any failure the
    /// queued work is dropped, the pool abandoned and the error returned.
    pub fn run(mut self) -> Result<Summary> {
        let plan = self.partition()?;
        println!("{}", banner(&self.settings, &plan));

        let started = Instant::now();
        let reports = match self.dispatch(&plan) {
            Ok(reports) => reports,
            Err(e) => {
                self.abandon();
                return Err(e);
            }
        };

        match self.await_completion(&plan, &reports, started) {
            Ok((elapsed, artifacts)) => {
                self.transition(Phase::Reported);
                println!("Mandel: computation time {:.6} s", elapsed.as_secs_f64());
                self.join();
                self.transition(Phase::Terminated);
                Ok(Summary {
                    plan,
                    elapsed,
                    artifacts,
                })
            }
            Err(e) => {
                error!(error = %e, "render failed");
                self.abandon();
                Err(e)
            }
        }
    }

    fn partition(&mut self) -> Result<PartitionPlan> {
        let plan = PartitionPlan::new(
            self.settings.virtualization,
            self.settings.domain_size,
            self.settings.workers,
        )?;
        info!(
            chunk_size = plan.chunk_size,
            remainder = plan.remainder,
            unit_count = plan.unit_count,
            "partitioned"
        );
        self.transition(Phase::Partitioned);
        Ok(plan)
    }

    fn dispatch(&mut self, plan: &PartitionPlan) -> Result<Receiver<Report>> {
        let kernel: Box<dyn Kernel> = match self.kernel.take() {
            Some(kernel) => kernel,
            None => Box::new(EscapeTime::new(self.settings.iterations)),
        };
        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => self.settings.format.encoder(),
        };
        let context = Arc::new(Context {
            plan: *plan,
            plane: PlaneMapper::square(plan.total_load)?,
            kernel,
            encoder,
            namer: ArtifactNamer::new(
                &self.settings.output_dir,
                self.settings.format,
                plan.is_single_unit(),
            ),
        });

        // The queue is unbounded and we hold a receiver, so sends cannot fail.
        let (job_tx, job_rx) = unbounded();
        for unit in plan.units() {
            let job = match self.settings.dispatch {
                Dispatch::SinglePass => Job::Whole(unit),
                Dispatch::MultiPass => Job::Pass(unit, 0),
            };
            let _ = job_tx.send(job);
        }
        self.jobs = Some((job_tx, job_rx.clone()));

        let (report_tx, report_rx) = unbounded();
        let threads = self.settings.workers.min(plan.unit_count);
        for n in 0..threads {
            let (context, jobs, reports) = (context.clone(), job_rx.clone(), report_tx.clone());
            let handle = thread::Builder::new()
                .name(format!("mandel-worker-{}", n))
                .spawn(move || worker::serve(context, jobs, reports))
                .map_err(Error::Spawn)?;
            self.pool.push(handle);
        }

        info!(
            threads,
            units = plan.unit_count,
            mode = self.settings.dispatch.label(),
            "dispatched"
        );
        self.transition(Phase::Dispatched);
        Ok(report_rx)
    }

    fn next_report(
        &self,
        reports: &Receiver<Report>,
        deadline: Option<Instant>,
        started: Instant,
        received: usize,
        expected: usize,
    ) -> Result<Report> {
        let outcome = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                let wait = if deadline > now {
                    deadline - now
                } else {
                    Duration::from_secs(0)
                };
                reports.recv_timeout(wait)
            }
            None => reports.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match outcome {
            Ok(report) => Ok(report),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                received,
                expected,
                waited: started.elapsed(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::WorkersLost { received, expected }),
        }
    }

    fn await_completion(
        &mut self,
        plan: &PartitionPlan,
        reports: &Receiver<Report>,
        started: Instant,
    ) -> Result<(Duration, Vec<PathBuf>)> {
        self.transition(Phase::AwaitingCompletion);

        let expected = plan.unit_count;
        let deadline = self.settings.timeout.map(|t| started + t);
        let mut states: Vec<WorkerState> = (0..expected).map(WorkerState::new).collect();
        let mut artifacts = vec![];
        let mut released = None;

        {
            let mut tracker = CompletionTracker::new(expected, || {
                released = Some(Instant::now());
                info!(units = expected, "all units reported");
            });

            loop {
                let report =
                    self.next_report(reports, deadline, started, tracker.received(), expected)?;
                let finished = match report {
                    Report::Finished { unit, path } => {
                        artifacts.push(path);
                        Some(unit)
                    }
                    Report::Pass { unit, pass, path } => {
                        artifacts.extend(path);
                        self.acknowledge_pass(plan, &mut states, unit, pass)?
                    }
                    Report::Panicked { unit } => return Err(Error::WorkerPanicked(unit)),
                    Report::Failed(failure) => {
                        let mut failures = vec![failure];
                        while let Ok(report) = reports.try_recv() {
                            if let Report::Failed(failure) = report {
                                failures.push(failure);
                            }
                        }
                        return Err(Error::ArtifactWrite(failures));
                    }
                };

                if let Some(unit) = finished {
                    if self.settings.progress {
                        if let Some(work) = plan.unit(unit) {
                            println!(
                                "Mandel: unit {} finished (rows {}..{})",
                                unit, work.range_start, work.range_end
                            );
                        }
                    }
                    if tracker.on_contribution(unit)? == Progress::Complete {
                        break;
                    }
                }
            }
        }

        let elapsed = match released {
            Some(at) => at.duration_since(started),
            None => started.elapsed(),
        };
        Ok((elapsed, artifacts))
    }

    /// Move a unit's sub-pass cursor on and queue its next sub-pass.
    /// Returns the unit when the acknowledged pass was its last, so it
    /// can contribute to the barrier.
    fn acknowledge_pass(
        &self,
        plan: &PartitionPlan,
        states: &mut [WorkerState],
        unit: usize,
        pass: usize,
    ) -> Result<Option<usize>> {
        let state = match states.get_mut(unit) {
            Some(state) => state,
            None => return Err(Error::ExcessContribution(unit)),
        };
        if state.subchunk_cursor != pass {
            return Err(Error::DuplicateContribution(unit));
        }
        let next = match state.advance(plan.unit_count) {
            Some(next) => next,
            None => return Ok(Some(unit)),
        };
        match (plan.unit(unit), self.jobs.as_ref()) {
            (Some(work), Some((tx, _))) => {
                let _ = tx.send(Job::Pass(work, next));
            }
            _ => warn!(unit, next, "no queue for the next sub-pass"),
        }
        Ok(None)
    }

    // Closing the queue lets the idle pool threads leave their loop.
    fn join(&mut self) {
        self.jobs = None;
        for (n, handle) in self.pool.drain(..).enumerate() {
            if handle.join().is_err() {
                warn!(thread = n, "pool thread panicked after reporting");
            }
        }
    }

    // Pending jobs are thrown away; anything still rendering is
    // detached and dies with the process.
    fn abandon(&mut self) {
        if let Some((_, queue)) = self.jobs.take() {
            let dropped = queue.try_iter().count();
            if dropped > 0 {
                warn!(jobs = dropped, "dropping queued work");
            }
        }
        if !self.pool.is_empty() {
            warn!(threads = self.pool.len(), "abandoning pool");
        }
        self.pool.clear();
    }
}

/// The two-line startup banner.
pub fn banner(settings: &Settings, plan: &PartitionPlan) -> String {
    format!(
        "Mandel: domain {size}x{size}, {} execution units, virtualization {:.2}\n\
         Mandel: chunk size {}, remainder {}, work units {}, {}",
        settings.workers,
        settings.virtualization,
        plan.chunk_size,
        plan.remainder,
        plan.unit_count,
        settings.dispatch.label(),
        size = settings.domain_size,
    )
}
