//! Runtime helper for spawning endpoint dispatch workers.
//!
//! Every worker gets its own OS thread driving a current-thread tokio runtime, so
//! blocking transport calls on one endpoint never stall another endpoint.

use std::future::Future;
use std::io;
use std::thread::{self, JoinHandle};
use tokio::runtime::Builder;
use tokio::sync::{oneshot, watch};
use tracing::{error, trace};
use uuid::Uuid;

/// Receiving side of a worker's stop request.
pub(crate) struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopSignal {
    pub(crate) fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once stop was requested or the requesting side went away.
    pub(crate) async fn requested(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

/// A running dispatch worker and the means to stop and join it.
pub(crate) struct DispatchWorker<R> {
    worker_id: String,
    stop: watch::Sender<bool>,
    thread: JoinHandle<Option<R>>,
}

impl<R> DispatchWorker<R> {
    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub(crate) fn request_stop(&self) {
        self.stop.send_replace(true);
    }

    /// Waits for the worker thread and hands back the resources it was running with.
    /// `None` if the thread panicked.
    pub(crate) fn join(self) -> Option<R> {
        match self.thread.join() {
            Ok(resources) => resources,
            Err(_) => {
                error!(worker_id = %self.worker_id, "dispatch worker panicked");
                None
            }
        }
    }
}

/// Spawns `run_loop` on a dedicated thread.
///
/// On spawn failure the resources are returned alongside the error so the caller
/// can park them again.
pub(crate) fn spawn_dispatch_worker<R, F, Fut>(
    thread_name: String,
    resources: R,
    run_loop: F,
) -> Result<DispatchWorker<R>, (io::Error, R)>
where
    R: Send + 'static,
    F: FnOnce(R, StopSignal, String) -> Fut + Send + 'static,
    Fut: Future<Output = R>,
{
    let worker_id = Uuid::new_v4().hyphenated().to_string();
    let (stop_tx, stop_rx) = watch::channel(false);
    let (resources_tx, resources_rx) = oneshot::channel::<R>();

    let thread_worker_id = worker_id.clone();
    let spawned = thread::Builder::new().name(thread_name).spawn(move || {
        let Ok(resources) = resources_rx.blocking_recv() else {
            return None;
        };

        let runtime = match Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(worker_id = %thread_worker_id, err = %err, "unable to build worker runtime");
                return Some(resources);
            }
        };

        trace!(worker_id = %thread_worker_id, "within worker runtime");
        let stop = StopSignal { receiver: stop_rx };
        Some(runtime.block_on(run_loop(resources, stop, thread_worker_id)))
    });

    let thread = match spawned {
        Ok(thread) => thread,
        Err(err) => return Err((err, resources)),
    };

    if let Err(resources) = resources_tx.send(resources) {
        // The thread is gone before it could take ownership.
        let _ = thread.join();
        return Err((
            io::Error::new(io::ErrorKind::Other, "dispatch worker exited early"),
            resources,
        ));
    }

    Ok(DispatchWorker {
        worker_id,
        stop: stop_tx,
        thread,
    })
}
