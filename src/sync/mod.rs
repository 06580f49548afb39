//! Synchronous façade over the async core.
//!
//! A dedicated background thread hosts a single-threaded Tokio runtime and
//! the real async [`crate::manager::DeviceManager`]; public sync methods on
//! [`manager::SyncDeviceManager`] and [`device::SyncCcd`]/
//! [`device::SyncMonochromator`] send a boxed async job over an unbounded
//! `tokio::sync::mpsc` channel to that thread and block on a reply channel.
//! The dispatch loop awaits the job queue rather than blocking the runtime's
//! only OS thread on it, so unsolicited binary telemetry reaching the
//! reader/worker tasks spawned by an earlier job is still serviced while the
//! façade is otherwise idle. The wire traffic and state machine are
//! identical to the async core — only the waiting primitive differs,
//! satisfying "do not implement two parallel protocol stacks".

pub mod device;
pub mod manager;

use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;

use tokio::sync::mpsc as tokio_mpsc;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// A cheap, cloneable reference to the background runtime thread's job
/// queue. Every sync wrapper (manager, device) holds one of these.
#[derive(Clone)]
pub(crate) struct RuntimeHandle {
    job_tx: tokio_mpsc::UnboundedSender<Job>,
}

impl RuntimeHandle {
    /// Runs `f` to completion on the background runtime and blocks the
    /// calling thread until it finishes.
    pub(crate) fn run<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let result = f().await;
                let _ = reply_tx.send(result);
            })
        });
        self.job_tx
            .send(job)
            .expect("background runtime thread has exited");
        reply_rx
            .recv()
            .expect("background runtime thread dropped the reply channel")
    }
}

/// Owns the background thread and its single-threaded Tokio runtime.
/// Dropping this shuts the thread down once its current job finishes.
pub(crate) struct Runtime {
    handle: RuntimeHandle,
    _thread: std::thread::JoinHandle<()>,
}

impl Runtime {
    pub(crate) fn spawn() -> Self {
        let (job_tx, mut job_rx) = tokio_mpsc::unbounded_channel::<Job>();
        let thread = std::thread::Builder::new()
            .name("icl-client-sync".to_owned())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to start the sync facade's background tokio runtime");
                rt.block_on(async move {
                    while let Some(job) = job_rx.recv().await {
                        job().await;
                    }
                });
            })
            .expect("failed to spawn the sync facade's background thread");

        Runtime {
            handle: RuntimeHandle { job_tx },
            _thread: thread,
        }
    }

    pub(crate) fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }
}
