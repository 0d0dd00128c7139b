//! Start/stop/destroy transitions shared by publishers and subscribers.
//!
//! Two locks are involved. The control lock serialises lifecycle calls and owns the
//! worker slot; the state lock (see [`StateLock`]) is shared with the dispatch
//! worker. The control lock may be held while joining a worker, the state lock
//! never is, so a worker re-checking state can always make progress.

use crate::control_plane::endpoint_state::EndpointState;
use crate::control_plane::state_lock::StateLock;
use crate::error::{Error, Result};
use crate::observability::events;
use crate::runtime::worker_runtime::{spawn_dispatch_worker, DispatchWorker, StopSignal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "lifecycle";

/// The lifecycle capability set common to every endpoint kind.
pub trait Lifecycle {
    /// Moves the endpoint into `Running`, spawning its dispatch worker on a fresh
    /// transition. Idempotent while running.
    fn start(&self) -> Result<()>;

    /// Moves a running endpoint into `Stopped` and waits for its dispatch worker
    /// to exit.
    fn stop(&self) -> Result<()>;

    /// Stops the endpoint if needed and releases its transport handle.
    fn destroy(&self) -> Result<()>;

    fn is_stopped(&self) -> bool;

    fn is_destroyed(&self) -> bool;

    fn state(&self) -> EndpointState;
}

/// The endpoint-kind specific half of a lifecycle: what the worker runs and how the
/// transport handle is released.
pub(crate) trait DispatchEndpoint: Send + Sync + 'static {
    type Settings: Send;
    type Resources: Send + 'static;

    fn kind(&self) -> &'static str;

    fn topic(&self) -> &str;

    fn state_lock(&self) -> &StateLock<Self::Settings>;

    /// Releases the transport handle. Called with the state lock held and only
    /// after the dispatch worker has exited.
    fn release(&self) -> Result<()>;

    /// The worker body. Returns the resources so a later start can reuse them.
    async fn dispatch(
        self: Arc<Self>,
        resources: Self::Resources,
        stop: StopSignal,
        worker_id: String,
    ) -> Self::Resources;
}

struct Control<R> {
    parked: Option<R>,
    worker: Option<DispatchWorker<R>>,
}

pub(crate) struct LifecycleDriver<E: DispatchEndpoint> {
    endpoint: Arc<E>,
    control: Mutex<Control<E::Resources>>,
}

impl<E: DispatchEndpoint> LifecycleDriver<E> {
    pub(crate) fn new(endpoint: Arc<E>, resources: E::Resources) -> Self {
        Self {
            endpoint,
            control: Mutex::new(Control {
                parked: Some(resources),
                worker: None,
            }),
        }
    }

    pub(crate) fn endpoint(&self) -> &Arc<E> {
        &self.endpoint
    }

    fn control(&self) -> MutexGuard<'_, Control<E::Resources>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt_worker(&self, control: &mut Control<E::Resources>) {
        let Some(worker) = control.worker.take() else {
            return;
        };

        let worker_id = worker.worker_id().to_string();
        worker.request_stop();
        match worker.join() {
            Some(resources) => control.parked = Some(resources),
            None => error!(
                event = events::WORKER_LOST,
                component = COMPONENT,
                kind = self.endpoint.kind(),
                topic = self.endpoint.topic(),
                worker_id = %worker_id,
                "dispatch resources lost with the worker"
            ),
        }

        debug!(
            event = events::WORKER_JOINED,
            component = COMPONENT,
            kind = self.endpoint.kind(),
            topic = self.endpoint.topic(),
            worker_id = %worker_id,
            "dispatch worker joined"
        );
    }

    fn revert_start(&self) {
        let mut guarded = self.endpoint.state_lock().lock();
        if guarded.state.is_running() {
            guarded.state = EndpointState::Stopped;
        }
    }
}

impl<E: DispatchEndpoint> Lifecycle for LifecycleDriver<E> {
    fn start(&self) -> Result<()> {
        let mut control = self.control();

        let fresh = self.endpoint.state_lock().lock().state.begin_start()?;
        if !fresh {
            debug!(
                event = events::LIFECYCLE_START,
                component = COMPONENT,
                kind = self.endpoint.kind(),
                topic = self.endpoint.topic(),
                "already running"
            );
            return Ok(());
        }

        let Some(resources) = control.parked.take() else {
            self.revert_start();
            return Err(Error::TransportError(
                "dispatch resources unavailable after abnormal worker exit".to_string(),
            ));
        };

        let endpoint = self.endpoint.clone();
        // Thread names must not contain NUL.
        let thread_name = format!("ecal-{}-{}", self.endpoint.kind(), self.endpoint.topic())
            .replace('\0', "");
        match spawn_dispatch_worker(thread_name, resources, move |resources, stop, worker_id| {
            endpoint.dispatch(resources, stop, worker_id)
        }) {
            Ok(worker) => {
                info!(
                    event = events::LIFECYCLE_START,
                    component = COMPONENT,
                    kind = self.endpoint.kind(),
                    topic = self.endpoint.topic(),
                    worker_id = worker.worker_id(),
                    "dispatch worker started"
                );
                control.worker = Some(worker);
                Ok(())
            }
            Err((err, resources)) => {
                control.parked = Some(resources);
                self.revert_start();
                error!(
                    event = events::WORKER_SPAWN_FAILED,
                    component = COMPONENT,
                    kind = self.endpoint.kind(),
                    topic = self.endpoint.topic(),
                    err = %err,
                    "unable to spawn dispatch worker"
                );
                Err(Error::TransportError(format!(
                    "unable to spawn dispatch worker: {err}"
                )))
            }
        }
    }

    fn stop(&self) -> Result<()> {
        let mut control = self.control();

        let was_running = self.endpoint.state_lock().lock().state.begin_stop()?;
        self.halt_worker(&mut control);

        info!(
            event = events::LIFECYCLE_STOP,
            component = COMPONENT,
            kind = self.endpoint.kind(),
            topic = self.endpoint.topic(),
            was_running,
            "endpoint stopped"
        );
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        let mut control = self.control();

        self.endpoint.state_lock().lock().state.begin_stop()?;
        self.halt_worker(&mut control);

        let mut guarded = self.endpoint.state_lock().lock();
        guarded.state.ensure_usable()?;
        if let Err(err) = self.endpoint.release() {
            warn!(
                event = events::LIFECYCLE_DESTROY_FAILED,
                component = COMPONENT,
                kind = self.endpoint.kind(),
                topic = self.endpoint.topic(),
                err = %err,
                "unable to release transport handle"
            );
            return Err(err);
        }
        guarded.state.finish_destroy();
        drop(guarded);

        // Dropping the parked resources closes the endpoint's channels.
        control.parked = None;

        info!(
            event = events::LIFECYCLE_DESTROY,
            component = COMPONENT,
            kind = self.endpoint.kind(),
            topic = self.endpoint.topic(),
            "endpoint destroyed"
        );
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        !self.endpoint.state_lock().is_running()
    }

    fn is_destroyed(&self) -> bool {
        self.endpoint.state_lock().state().is_destroyed()
    }

    fn state(&self) -> EndpointState {
        self.endpoint.state_lock().state()
    }
}
