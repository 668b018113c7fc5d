// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Workers and the threads that run them.
//!
//! A worker owns one work unit.  It colors every pixel of its band of
//! rows with the kernel, hands the band to the encoder, and tells the
//! coordinator how it went.
//!
//! Workers do not get a thread each.  The coordinator starts one pool
//! thread per execution unit and queues jobs; each pool thread takes the
//! next job, builds the worker for it and sends back a report.  In
//! single-pass dispatch a job is a whole unit.  In multi-pass dispatch a
//! job is one sub-pass, and the coordinator queues a unit's next
//! sub-pass only after acknowledging the previous one, so a unit never
//! has more than one artifact open.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use itertools::iproduct;
use tracing::{debug, error, trace, warn};

use crate::error::ArtifactFailure;
use crate::kernel::Kernel;
use crate::partition::PartitionPlan;
use crate::plan::WorkUnit;
use crate::planes::{Pixel, PlaneMapper};
use crate::raster::{ArtifactNamer, RasterEncoder};

/// Everything a worker needs that is the same for every worker.  Built
/// once by the coordinator and shared read-only.
pub struct Context {
    /// The partition every unit was cut from.
    pub plan: PartitionPlan,
    /// Pixel to complex-plane mapping for the full raster.
    pub plane: PlaneMapper,
    /// The per-point color function.
    pub kernel: Box<dyn Kernel>,
    /// The artifact writer.
    pub encoder: Box<dyn RasterEncoder>,
    /// Where artifacts go.
    pub namer: ArtifactNamer,
}

/// A piece of work queued for the pool.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Job {
    /// Single-pass: render the whole unit.
    Whole(WorkUnit),
    /// Multi-pass: render one sub-pass of the unit.
    Pass(WorkUnit, usize),
}

impl Job {
    /// The unit the job belongs to.
    pub fn unit(&self) -> &WorkUnit {
        match self {
            Job::Whole(unit) | Job::Pass(unit, _) => unit,
        }
    }
}

/// What a worker tells the coordinator.
#[derive(Debug)]
pub enum Report {
    /// Single-pass: the whole unit is written.
    Finished {
        /// The unit.
        unit: usize,
        /// Where it was written.
        path: PathBuf,
    },
    /// Multi-pass: one sub-pass is done.
    Pass {
        /// The unit.
        unit: usize,
        /// The sub-pass that finished.
        pass: usize,
        /// Where it was written; empty sub-passes write nothing.
        path: Option<PathBuf>,
    },
    /// The encoder failed; the unit will not complete.
    Failed(ArtifactFailure),
    /// The job panicked; the unit will not complete.
    Panicked {
        /// The unit.
        unit: usize,
    },
}

/// Renders one work unit.
pub struct Worker {
    unit: WorkUnit,
    context: Arc<Context>,
}

impl Worker {
    /// A worker for `unit`.
    pub fn new(unit: WorkUnit, context: Arc<Context>) -> Self {
        Worker { unit, context }
    }

    /// The unit this worker owns.
    pub fn unit(&self) -> &WorkUnit {
        &self.unit
    }

    /// Color `rows` of the raster, full width, into an RGB buffer.
    pub fn render(&self, rows: Range<usize>) -> Vec<u8> {
        let plane = &self.context.plane;
        let width = plane.width();
        let mut pixels = Vec::with_capacity(rows.len() * width * 3);
        for (row, column) in iproduct!(rows, 0..width) {
            let point = plane.pixel_to_point(&Pixel(column, row));
            pixels.extend_from_slice(&self.context.kernel.color(point));
        }
        pixels
    }

    fn write(
        &self,
        rows: Range<usize>,
        path: PathBuf,
        pass: Option<usize>,
    ) -> Result<PathBuf, ArtifactFailure> {
        let height = rows.len();
        let pixels = self.render(rows);
        let width = self.context.plane.width();
        match self
            .context
            .encoder
            .write(&path, width as u32, height as u32, &pixels)
        {
            Ok(()) => Ok(path),
            Err(source) => Err(ArtifactFailure {
                unit: self.unit.index,
                pass,
                path,
                source,
            }),
        }
    }

    /// Render the whole unit and write its artifact.
    pub fn compute(&self) -> Result<PathBuf, ArtifactFailure> {
        let path = self.context.namer.unit(self.unit.index);
        debug!(unit = self.unit.index, rows = ?self.unit.rows(), "rendering unit");
        self.write(self.unit.rows(), path, None)
    }

    /// Render sub-pass `pass` of the unit and write its artifact.  An
    /// empty slice writes nothing and returns `None`.
    pub fn compute_pass(&self, pass: usize) -> Result<Option<PathBuf>, ArtifactFailure> {
        let rows = self.unit.sub_pass(pass, self.context.plan.unit_count);
        if rows.is_empty() {
            trace!(unit = self.unit.index, pass, "empty sub-pass");
            return Ok(None);
        }
        let path = self.context.namer.sub_pass(self.unit.index, pass);
        trace!(unit = self.unit.index, pass, rows = ?rows, "rendering sub-pass");
        self.write(rows, path, Some(pass)).map(Some)
    }

    /// Run the whole unit (`pass` is `None`) or one sub-pass of it, and
    /// say how it went.
    pub fn execute(&self, pass: Option<usize>) -> Report {
        let unit = self.unit.index;
        match pass {
            None => match self.compute() {
                Ok(path) => Report::Finished { unit, path },
                Err(failure) => Report::Failed(failure),
            },
            Some(pass) => match self.compute_pass(pass) {
                Ok(path) => Report::Pass { unit, pass, path },
                Err(failure) => Report::Failed(failure),
            },
        }
    }
}

/// Body of a pool thread: take jobs until the queue closes, sending
/// exactly one report per job.  A panicking job is reported rather than
/// taking the thread down with it.
pub fn serve(context: Arc<Context>, jobs: Receiver<Job>, reports: Sender<Report>) {
    for job in jobs.iter() {
        let worker = Worker::new(*job.unit(), context.clone());
        let pass = match job {
            Job::Whole(_) => None,
            Job::Pass(_, pass) => Some(pass),
        };
        let report = match panic::catch_unwind(AssertUnwindSafe(|| worker.execute(pass))) {
            Ok(report) => report,
            Err(_) => {
                error!(unit = worker.unit().index, "worker panicked");
                Report::Panicked {
                    unit: worker.unit().index,
                }
            }
        };
        if reports.send(report).is_err() {
            warn!(unit = worker.unit().index, "coordinator stopped listening");
            break;
        }
    }
    debug!("pool thread done");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::EscapeTime;
    use crate::raster::{Format, PnmRaster};
    use crossbeam::channel::unbounded;
    use num::Complex;
    use std::io;
    use std::path::Path;

    struct Broken;

    impl RasterEncoder for Broken {
        fn write(&self, _: &Path, _: u32, _: u32, _: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left"))
        }
    }

    struct Exploding;

    impl Kernel for Exploding {
        fn color(&self, _: Complex<f64>) -> [u8; 3] {
            panic!("kernel blew up");
        }
    }

    fn context_with(
        dir: &Path,
        kernel: Box<dyn Kernel>,
        encoder: Box<dyn RasterEncoder>,
        plan: PartitionPlan,
    ) -> Arc<Context> {
        Arc::new(Context {
            plan,
            plane: PlaneMapper::square(plan.total_load).unwrap(),
            kernel,
            encoder,
            namer: ArtifactNamer::new(dir, Format::Ppm, plan.is_single_unit()),
        })
    }

    fn context(dir: &Path, encoder: Box<dyn RasterEncoder>, plan: PartitionPlan) -> Arc<Context> {
        context_with(dir, Box::new(EscapeTime::default()), encoder, plan)
    }

    #[test]
    fn band_buffer_matches_the_full_image() {
        let dir = tempfile::tempdir().unwrap();
        let plan = PartitionPlan::new(0.0, 40, 4).unwrap();
        let ctx = context(dir.path(), Box::new(PnmRaster), plan);

        let whole = Worker::new(
            WorkUnit {
                index: 0,
                range_start: 0,
                range_end: 40,
                width: 40,
            },
            ctx.clone(),
        )
        .render(0..40);
        let unit = plan.unit(2).unwrap();
        let band = Worker::new(unit, ctx).render(unit.rows());

        assert_eq!(band.len(), 10 * 40 * 3);
        assert_eq!(&band[..], &whole[20 * 40 * 3..30 * 40 * 3]);
    }

    #[test]
    fn whole_unit_writes_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let plan = PartitionPlan::new(0.0, 32, 4).unwrap();
        let ctx = context(dir.path(), Box::new(PnmRaster), plan);

        match Worker::new(plan.unit(1).unwrap(), ctx).execute(None) {
            Report::Finished { unit, path } => {
                assert_eq!(unit, 1);
                assert_eq!(path, dir.path().join("out-mandelbrot-1.ppm"));
                assert!(path.exists());
            }
            other => panic!("got {:?}", other),
        }
    }

    #[test]
    fn encoder_failure_is_reported_not_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let plan = PartitionPlan::new(0.0, 16, 2).unwrap();
        let ctx = context(dir.path(), Box::new(Broken), plan);

        match Worker::new(plan.unit(0).unwrap(), ctx).execute(Some(1)) {
            Report::Failed(failure) => {
                assert_eq!(failure.unit, 0);
                assert_eq!(failure.pass, Some(1));
            }
            other => panic!("got {:?}", other),
        }
    }

    #[test]
    fn pool_thread_reports_once_per_job_in_queue_order() {
        let dir = tempfile::tempdir().unwrap();
        let plan = PartitionPlan::new(0.0, 24, 3).unwrap();
        let ctx = context(dir.path(), Box::new(PnmRaster), plan);
        let (job_tx, job_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        let unit = plan.unit(2).unwrap();
        job_tx.send(Job::Pass(unit, 0)).unwrap();
        job_tx.send(Job::Pass(unit, 1)).unwrap();
        job_tx.send(Job::Whole(plan.unit(0).unwrap())).unwrap();
        drop(job_tx);
        serve(ctx, job_rx, report_tx);

        let reports: Vec<Report> = report_rx.iter().collect();
        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0], Report::Pass { unit: 2, pass: 0, .. }));
        assert!(matches!(reports[1], Report::Pass { unit: 2, pass: 1, .. }));
        assert!(matches!(reports[2], Report::Finished { unit: 0, .. }));
        assert!(dir.path().join("out-mandelbrot-2-0.ppm").exists());
        assert!(dir.path().join("out-mandelbrot-2-1.ppm").exists());
        assert!(!dir.path().join("out-mandelbrot-2-2.ppm").exists());
    }

    #[test]
    fn panicking_job_is_reported_and_the_thread_carries_on() {
        let dir = tempfile::tempdir().unwrap();
        let plan = PartitionPlan::new(0.0, 8, 2).unwrap();
        let ctx = context_with(dir.path(), Box::new(Exploding), Box::new(PnmRaster), plan);
        let (job_tx, job_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        job_tx.send(Job::Whole(plan.unit(0).unwrap())).unwrap();
        job_tx.send(Job::Whole(plan.unit(1).unwrap())).unwrap();
        drop(job_tx);
        serve(ctx, job_rx, report_tx);

        let units: Vec<usize> = report_rx
            .iter()
            .map(|r| match r {
                Report::Panicked { unit } => unit,
                other => panic!("got {:?}", other),
            })
            .collect();
        assert_eq!(units, vec![0, 1]);
    }
}
