use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, warn};

use crate::{Result, ThreadPool};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Connection workers fed from one unbounded crossbeam channel.
///
/// The pool owns the only [`Sender`]; every worker holds a clone of the [`Receiver`] and takes
/// the next queued job as soon as it is idle. A worker whose job panics is replaced, so a
/// misbehaving connection does not shrink the pool. Dropping the pool closes the channel and
/// each worker exits after its current job.
pub struct SharedQueueThreadPool {
    jobs: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let (jobs, queue) = channel::unbounded::<Job>();
        let ids = Arc::new(AtomicUsize::new(0));
        for _ in 0..threads {
            Worker::start(queue.clone(), Arc::clone(&ids))?;
        }
        debug!(threads, "started shared queue pool");
        Ok(SharedQueueThreadPool { jobs })
    }

    /// queues `job` for the next idle worker
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // the pool keeps the sender alive and workers only leave on disconnect
        if self.jobs.send(Box::new(job)).is_err() {
            error!("no worker is left to run the job, dropping it");
        }
    }
}

/// Lives on a worker thread's stack. If the thread unwinds out of a job, `drop` starts the
/// replacement worker.
struct Worker {
    queue: Receiver<Job>,
    ids: Arc<AtomicUsize>,
}

impl Worker {
    fn start(queue: Receiver<Job>, ids: Arc<AtomicUsize>) -> Result<()> {
        let n = ids.fetch_add(1, Ordering::Relaxed);
        let worker = Worker { queue, ids };
        thread::Builder::new()
            .name(format!("recs-worker-{}", n))
            .spawn(move || worker.run())?;
        Ok(())
    }

    fn run(self) {
        while let Ok(job) = self.queue.recv() {
            job();
        }
        debug!("queue closed, worker exiting");
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        warn!("a job panicked, replacing its worker");
        if let Err(e) = Worker::start(self.queue.clone(), Arc::clone(&self.ids)) {
            error!("could not start a replacement worker: {}", e);
        }
    }
}
