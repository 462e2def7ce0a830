//! The single-threaded cooperative I/O reactor that drives every
//! transport. `post`/`poll_one`/`run` are the thread-safe submission and
//! single-threaded draining primitives; one external thread owns `run`.
//!
//! Built on a single-threaded `tokio` runtime, the same executor the
//! teacher's relay server drives its connection-handling tasks on (see
//! `relay/src/relay.rs`), just configured `new_current_thread` instead of
//! multi-threaded: the spec calls for one thread owning the reactor, with
//! other threads only allowed to `post` work onto it.

use crate::logger::{default_logger, Log};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle used by any thread (including the reactor's own) to submit work.
/// Cloning shares the same underlying queue.
#[derive(Clone)]
pub struct Handle {
    sender: mpsc::UnboundedSender<Task>,
}

impl Handle {
    /// Thread-safe: schedules `task` to run on the reactor thread, in
    /// submission order relative to other `post` calls.
    pub fn post(&self, task: impl Future<Output = ()> + Send + 'static) {
        let _ = self.sender.send(Box::pin(task));
    }
}

/// Owns the `tokio` current-thread runtime and the task queue. Must be
/// driven by exactly one thread via [`NetworkContext::run`] or repeated
/// [`NetworkContext::poll_one`] calls.
pub struct NetworkContext {
    runtime: tokio::runtime::Runtime,
    receiver: mpsc::UnboundedReceiver<Task>,
    handle: Handle,
    stopped: Arc<AtomicBool>,
    logger: Arc<dyn Log>,
}

impl NetworkContext {
    pub fn new() -> std::io::Result<Self> {
        Self::with_logger(default_logger())
    }

    pub fn with_logger(logger: Arc<dyn Log>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(NetworkContext { runtime, receiver, handle: Handle { sender }, stopped: Arc::new(AtomicBool::new(false)), logger })
    }

    /// A cloneable, thread-safe handle for posting work from any thread.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub fn post(&self, task: impl Future<Output = ()> + Send + 'static) {
        self.handle.post(task);
    }

    /// Runs every task currently queued (and any they themselves post) to
    /// completion, without blocking for new work. Returns the number of
    /// top-level tasks drained.
    pub fn poll_one(&mut self) -> usize {
        self.runtime.block_on(async {
            let mut drained = 0;
            while let Ok(task) = self.receiver.try_recv() {
                task.await;
                drained += 1;
            }
            drained
        })
    }

    /// Drives the reactor until [`NetworkContext::stop`] is called,
    /// blocking the calling thread in between arrivals.
    pub fn run(&mut self) {
        let stopped = self.stopped.clone();
        self.runtime.block_on(async {
            while !stopped.load(Ordering::Acquire) {
                match self.receiver.recv().await {
                    Some(task) => task.await,
                    None => break,
                }
            }
        });
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// A one-shot timer; resolves after `duration` on the reactor.
    pub async fn sleep(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub fn logger(&self) -> Arc<dyn Log> {
        self.logger.clone()
    }
}
