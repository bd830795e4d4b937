use crate::{ThreadPool, Result, StoreError};
use tracing::{debug, error};
use rayon;

/// A thread pool that uses a work stealing strategy as implemented by the [`Rayon`] library.
///
/// [`Rayon`]: https://docs.rs/rayon/latest/rayon/index.html
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {

    fn new(threads: u32) -> Result<Self> where Self: Sized {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("recs-rayon-{}", i))
            // without a handler a panicking job aborts the whole process
            .panic_handler(|_| error!("a job panicked on the rayon pool"))
            .build()
            .map_err(|e|
                StoreError::StringErr(format!("could not build thread pool: {:?}", &e)))?;
        debug!("created rayon thread pool with {} threads", &threads);

        Ok(
            Self { pool }
        )
    }

    /// queues `job` on the pool and returns immediately
    fn spawn<F>(&self, job: F) where F: FnOnce() + Send + 'static {
        self.pool.spawn(job);
    }
}
