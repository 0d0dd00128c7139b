//! The per-endpoint state lock.
//!
//! One mutex guards the lifecycle state together with the endpoint-local mirror
//! of every value set through the transport. Holders keep it only for a state
//! check plus at most one transport call, never across a channel wait.

use crate::control_plane::endpoint_state::EndpointState;
use crate::error::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) struct Guarded<S> {
    pub(crate) state: EndpointState,
    pub(crate) settings: S,
}

pub(crate) struct StateLock<S> {
    inner: Mutex<Guarded<S>>,
}

impl<S> StateLock<S> {
    pub(crate) fn new(settings: S) -> Self {
        Self {
            inner: Mutex::new(Guarded {
                state: EndpointState::Created,
                settings,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Guarded<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> EndpointState {
        self.lock().state
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Runs `f` under the lock unless the endpoint is destroyed.
    pub(crate) fn with_usable<T>(&self, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        let mut guarded = self.lock();
        guarded.state.ensure_usable()?;
        f(&mut guarded.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::StateLock;
    use crate::error::Error;

    #[test]
    fn with_usable_rejects_destroyed_without_running_closure() {
        let lock = StateLock::new(0u32);
        lock.lock().state.finish_destroy();

        let mut called = false;
        let res = lock.with_usable(|_| {
            called = true;
            Ok(())
        });

        assert_eq!(res, Err(Error::DestroyedEndpoint));
        assert!(!called);
    }

    #[test]
    fn with_usable_mutates_settings() {
        let lock = StateLock::new(1u32);
        lock.with_usable(|value| {
            *value += 1;
            Ok(())
        })
        .expect("usable endpoint");
        assert_eq!(lock.lock().settings, 2);
    }
}
