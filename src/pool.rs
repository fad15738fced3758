use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::GlobeError;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub const DEFAULT_WORKERS: usize = 32;

/// Fixed set of long-lived worker threads fed from one queue. Jobs submitted while every
/// worker is busy wait in the queue; [`WorkerPool::cancel_pending`] turns the queued ones
/// into no-ops.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, GlobeError> {
        let size = size.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let shutdown = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("wms-worker-{index}"))
                .spawn(move || worker_loop(receiver, shutdown))
                .map_err(|err| GlobeError::WorkerPool(err.to_string()))?;
            workers.push(handle);
        }
        Ok(Self {
            sender: Some(sender),
            workers,
            generation: Arc::new(AtomicU64::new(0)),
            shutdown,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let generation = Arc::clone(&self.generation);
        let stamp = generation.load(Ordering::Acquire);
        let job: Job = Box::new(move || {
            if generation.load(Ordering::Acquire) != stamp {
                return;
            }
            // The receiver is gone when the cache was invalidated meanwhile.
            let _ = tx.send(task());
        });
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                tracing::error!("worker queue closed, task dropped");
            }
        }
        TaskHandle { receiver: rx }
    }

    /// Queued jobs submitted before this call are skipped; running jobs finish.
    pub fn cancel_pending(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let queued = self.sender.as_ref().map_or(0, Sender::len);
        tracing::debug!(generation, queued, "cancelled pending work");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.sender.take();
        for worker in self.workers.drain(..) {
            worker.join().ok();
        }
    }
}

fn worker_loop(receiver: Receiver<Job>, shutdown: Arc<AtomicBool>) {
    while let Ok(job) = receiver.recv() {
        if shutdown.load(Ordering::Acquire) {
            continue;
        }
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("worker task panicked");
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TaskPoll<T> {
    Pending,
    Ready(T),
    Lost,
}

#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub fn poll(&self) -> TaskPoll<T> {
        match self.receiver.try_recv() {
            Ok(value) => TaskPoll::Ready(value),
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Disconnected) => TaskPoll::Lost,
        }
    }

    pub fn wait(self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn runs_submitted_jobs() {
        let pool = WorkerPool::new(4).unwrap();
        let handles = (0..16).map(|n| pool.submit(move || n * 2)).collect::<Vec<_>>();
        let results = handles
            .into_iter()
            .map(|handle| handle.wait().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(results, (0..16).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn poll_does_not_block() {
        let pool = WorkerPool::new(1).unwrap();
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = pool.submit(move || {
            gate_rx.recv().ok();
            7
        });
        assert_eq!(handle.poll(), TaskPoll::Pending);
        gate_tx.send(()).unwrap();
        assert_eq!(handle.wait(), Some(7));
    }

    #[test]
    fn excess_jobs_queue_behind_busy_workers() {
        let pool = WorkerPool::new(2).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let handles = (0..8)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                pool.submit(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(10));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.wait();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn cancelled_jobs_are_skipped() {
        let pool = WorkerPool::new(1).unwrap();
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let blocker = pool.submit(move || {
            started_tx.send(()).ok();
            gate_rx.recv().ok();
            0
        });
        started_rx.recv().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let stale = (1..=5)
            .map(|n| {
                let ran = Arc::clone(&ran);
                pool.submit(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    n
                })
            })
            .collect::<Vec<_>>();

        pool.cancel_pending();
        let fresh = pool.submit(|| 42);
        gate_tx.send(()).unwrap();

        assert_eq!(blocker.wait(), Some(0));
        assert_eq!(fresh.wait(), Some(42));
        for handle in stale {
            assert_eq!(handle.poll(), TaskPoll::Lost);
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_skips_queued_jobs() {
        let pool = WorkerPool::new(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let _blocker = pool.submit(move || {
            gate_rx.recv().ok();
        });
        let _queued = (0..10)
            .map(|_| {
                let ran = Arc::clone(&ran);
                pool.submit(move || {
                    std::thread::sleep(Duration::from_millis(100));
                    ran.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect::<Vec<_>>();

        let release = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            gate_tx.send(()).ok();
        });
        let started = std::time::Instant::now();
        drop(pool);
        release.join().unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_job_is_lost_and_worker_survives() {
        let pool = WorkerPool::new(1).unwrap();
        let lost = pool.submit(|| -> u8 { panic!("boom") });
        assert_eq!(lost.wait(), None);
        assert_eq!(pool.submit(|| 3u8).wait(), Some(3));
    }
}
