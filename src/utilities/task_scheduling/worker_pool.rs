use super::task_handle::{task_pair, TaskHandle};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads pulling boxed jobs from a shared queue.
///
/// Dropping the pool closes the queue and joins every worker after the queued jobs finish.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads (at least one).
    pub fn new(name: &str, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{worker_index}"))
                .spawn(move || Self::worker_loop(worker_index, &receiver));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => warn!(%error, worker_index, "failed to spawn worker thread"),
            }
        }
        debug!(name, workers = workers.len(), "worker pool started");
        Self {
            sender: if workers.is_empty() { None } else { Some(sender) },
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn worker_loop(worker_index: usize, receiver: &Mutex<Receiver<Job>>) {
        loop {
            let job = {
                let guard = receiver.lock().unwrap_or_else(PoisonError::into_inner);
                guard.recv()
            };
            let Ok(job) = job else {
                break;
            };
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                warn!(worker_index, "job panicked");
            }
        }
    }

    /// Queues a job and returns the handle its result will be published to. If no worker
    /// threads are available the job runs on the calling thread.
    pub fn submit<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (handle, completion) = task_pair();
        let boxed: Job = Box::new(move || completion.complete(job()));
        match &self.sender {
            Some(sender) => {
                if let Err(mpsc::SendError(job)) = sender.send(boxed) {
                    job();
                }
            }
            None => boxed(),
        }
        handle
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_complete_and_results_arrive() {
        let pool = WorkerPool::new("test", 2);
        let handles: Vec<_> = (0..8u64).map(|i| pool.submit(move || i * i)).collect();
        let results: Vec<u64> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn test_panicking_job_abandons_its_handle_only() {
        let pool = WorkerPool::new("test", 1);
        let bad = pool.submit(|| -> u32 { panic!("boom") });
        let good = pool.submit(|| 3u32);
        assert!(bad.wait().is_err());
        assert_eq!(good.wait().unwrap(), 3);
    }
}
