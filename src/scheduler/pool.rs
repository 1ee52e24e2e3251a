//! Fixed-capacity thread pool. Jobs beyond the thread count wait in the job channel.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crate::error::{SchedulerError, SchedulerResult};
use crate::utils::config::PackagePaths;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

/// Pool thread: run jobs until every sender is dropped. A panicking job is logged and the thread keeps serving.
fn pool_thread_loop(job_rx: Receiver<Job>) {
    while let Ok(job) = job_rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!(
                "Job panicked on {}",
                thread::current().name().unwrap_or("<unnamed>")
            );
        }
    }
}

impl WorkerPool {
    /// Spawn `size` threads (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (job_tx, job_rx) = unbounded::<Job>();
        let paths = PackagePaths::get();
        let handles = (0..size)
            .map(|idx| {
                let job_rx = job_rx.clone();
                thread::Builder::new()
                    .name(paths.thread_name(idx))
                    .spawn(move || pool_thread_loop(job_rx))
                    .unwrap_or_else(|e| panic!("failed to spawn pool thread {idx}: {e}"))
            })
            .collect();
        debug!("Worker pool ready with {} threads", size);
        Self {
            job_tx: Some(job_tx),
            handles,
        }
    }

    pub fn capacity(&self) -> usize {
        self.handles.len()
    }

    pub fn submit<F>(&self, job: F) -> SchedulerResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self.job_tx.as_ref().ok_or(SchedulerError::PoolClosed)?;
        tx.send(Box::new(job))
            .map_err(|_| SchedulerError::PoolClosed)
    }

    /// Close the job channel and join every thread. Blocks until running jobs return.
    pub fn join(mut self) -> anyhow::Result<()> {
        drop(self.job_tx.take());
        let mut panicked = 0;
        for h in self.handles.drain(..) {
            if h.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(anyhow::anyhow!("{} pool thread(s) panicked", panicked));
        }
        Ok(())
    }
}

impl Drop for WorkerPool {
    /// Closing the channel lets idle threads exit; busy ones finish their job first. Not joined here.
    fn drop(&mut self) {
        drop(self.job_tx.take());
    }
}
