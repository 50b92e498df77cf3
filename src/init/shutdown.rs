//! Graceful shutdown handle (`spec.md` §4.5 "On shutdown").
//!
//! Shaped after `crates/httproxy/src/init/shutdown/mod.rs`'s
//! `GracefulShutdown`, but built on `std::sync::{Mutex, Condvar}` instead of
//! the teacher's async `mea` primitives, since the acceptor and workers here
//! are blocking OS threads, not async tasks (`SPEC_FULL.md` §3).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use anyhow::Result;

#[derive(Clone)]
pub struct GracefulShutdown {
    inner: Arc<Inner>,
}

struct Inner {
    shutting_down: AtomicBool,
    active_workers: AtomicUsize,
    gate: Mutex<()>,
    cv: Condvar,
}

/// RAII guard held by a worker thread for its lifetime; decrements the
/// active-worker count on drop regardless of how the thread exits,
/// including on panic (`SPEC_FULL.md` §5.5: the acceptor counts only the
/// workers it spawned, not the process-wide thread count).
pub struct WorkerGuard {
    inner: Arc<Inner>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if self.inner.active_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.inner.gate.lock().unwrap();
            self.inner.cv.notify_all();
        }
    }
}

impl GracefulShutdown {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                shutting_down: AtomicBool::new(false),
                active_workers: AtomicUsize::new(0),
                gate: Mutex::new(()),
                cv: Condvar::new(),
            }),
        }
    }

    pub fn initiate(&self) {
        if self.inner.shutting_down.swap(true, Ordering::Release) {
            return;
        }
        let _guard = self.inner.gate.lock().unwrap();
        self.inner.cv.notify_all();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    pub fn active_workers(&self) -> usize {
        self.inner.active_workers.load(Ordering::Acquire)
    }

    /// Registers a newly-spawned worker; the returned guard decrements the
    /// count when the worker thread finishes (or panics).
    pub fn register_worker(&self) -> WorkerGuard {
        self.inner.active_workers.fetch_add(1, Ordering::AcqRel);
        WorkerGuard {
            inner: self.inner.clone(),
        }
    }

    /// Blocks the calling thread until every registered worker has finished.
    pub fn wait_for_drain(&self) {
        let guard = self.inner.gate.lock().unwrap();
        let _unused = self
            .inner
            .cv
            .wait_while(guard, |_| self.inner.active_workers.load(Ordering::Acquire) != 0)
            .unwrap();
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a Ctrl-C handler that initiates shutdown (`spec.md` §4.5,
/// §7 "Operator interrupt causes the acceptor to stop").
pub fn install(shutdown: GracefulShutdown) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("shutdown requested (Ctrl+C); draining in-flight workers");
        shutdown.initiate();
    })?;
    Ok(())
}
