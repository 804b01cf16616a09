//! Transaction Worker: a single dedicated thread that serializes every
//! mutating and read-visible operation against the [`StoreEngine`], avoiding
//! the lost-update hazard on the global quota row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::common::{Error, Result};
use crate::store::StoreEngine;

type Job = Box<dyn FnOnce(&StoreEngine) + Send>;

/// A handle to a unit of work already enqueued on the worker.
///
/// Dropping it without calling [`PendingResult::wait`] discards the result;
/// the unit still runs to completion regardless.
pub struct PendingResult<T> {
    rx: crossbeam_channel::Receiver<Result<T>>,
}

impl<T> PendingResult<T> {
    /// Block until the submitted unit of work completes.
    pub fn wait(self) -> Result<T> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(Error::Interrupted),
        }
    }
}

/// Serializes all store operations through one worker thread.
pub struct TransactionWorker {
    engine: Arc<StoreEngine>,
    job_tx: Mutex<Option<crossbeam_channel::Sender<Job>>>,
    done_rx: Mutex<Option<crossbeam_channel::Receiver<()>>>,
    handle: Mutex<Option<std::thread::JoinHandle<()>>>,
    closed: AtomicBool,
    shutdown_deadline: Duration,
}

impl TransactionWorker {
    /// Spawn the worker thread against `engine`. The worker holds its own
    /// `Arc` clone; callers keep theirs for direct reads that bypass the
    /// worker (`tileSets()`, `tilesForPage()`).
    pub fn spawn(engine: Arc<StoreEngine>, shutdown_deadline: Duration) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let worker_engine = Arc::clone(&engine);

        let handle = std::thread::Builder::new()
            .name("diskquota-tx-worker".to_string())
            .spawn(move || {
                for job in job_rx.iter() {
                    job(&worker_engine);
                }
                let _ = done_tx.send(());
            })
            .expect("failed to spawn transaction worker thread");

        Self {
            engine,
            job_tx: Mutex::new(Some(job_tx)),
            done_rx: Mutex::new(Some(done_rx)),
            handle: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
            shutdown_deadline,
        }
    }

    /// Direct access to the engine for reads that bypass the worker.
    pub fn engine(&self) -> &StoreEngine {
        &self.engine
    }

    /// Enqueue `f` and return a handle that resolves when it completes.
    /// Fails immediately with [`Error::StoreClosed`] if the worker is closed.
    pub fn submit<T, F>(&self, f: F) -> Result<PendingResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&StoreEngine) -> Result<T> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreClosed);
        }

        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let job: Job = Box::new(move |engine| {
            let result = f(engine);
            let _ = result_tx.send(result);
        });

        let guard = self.job_tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.send(job).map_err(|_| Error::StoreClosed)?,
            None => return Err(Error::StoreClosed),
        }

        Ok(PendingResult { rx: result_rx })
    }

    /// Enqueue `f` and block the calling thread until it completes.
    pub fn submit_and_wait<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreEngine) -> Result<T> + Send + 'static,
    {
        self.submit(f)?.wait()
    }

    /// Stop accepting submissions and drain the queue, waiting up to the
    /// configured shutdown deadline. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Dropping the sender lets the worker thread's `job_rx.iter()` end
        // once every already-queued unit has run.
        self.job_tx.lock().take();

        if let Some(done_rx) = self.done_rx.lock().take() {
            if done_rx.recv_timeout(self.shutdown_deadline).is_err() {
                log::warn!(
                    "transaction worker did not drain within {:?}; closing store best-effort",
                    self.shutdown_deadline
                );
            }
        }

        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for TransactionWorker {
    fn drop(&mut self) {
        self.close();
    }
}
