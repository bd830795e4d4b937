//! Thread pools used by [`RecsServer`] to service connections.
//!
//! [`RecsServer`]: ../struct.RecsServer.html
use crate::Result;

/// A pool of worker threads that run jobs handed to [`spawn`](ThreadPool::spawn)
pub trait ThreadPool: Send + 'static {
    /// creates a pool with the given number of `threads`
    ///
    /// # Errors
    /// returns an error if a worker thread could not be started
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// runs `job` on one of the pool's threads
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

mod rayon_pool;
mod shared_queue;

pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
