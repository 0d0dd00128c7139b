//! Endpoint state machine and its transition rules.

use crate::error::{Error, Result};
use strum::Display;

/// Lifecycle state of one publisher or subscriber.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum EndpointState {
    #[default]
    Created,
    Running,
    Stopped,
    Destroyed,
}

impl EndpointState {
    pub fn is_running(self) -> bool {
        self == EndpointState::Running
    }

    pub fn is_destroyed(self) -> bool {
        self == EndpointState::Destroyed
    }

    pub(crate) fn ensure_usable(self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::DestroyedEndpoint);
        }
        Ok(())
    }

    pub(crate) fn ensure_running(self) -> Result<()> {
        self.ensure_usable()?;
        if !self.is_running() {
            return Err(Error::NotRunning);
        }
        Ok(())
    }

    /// Moves into `Running`. Returns `true` on a fresh transition, `false` when
    /// already running.
    pub(crate) fn begin_start(&mut self) -> Result<bool> {
        self.ensure_usable()?;
        if self.is_running() {
            return Ok(false);
        }
        *self = EndpointState::Running;
        Ok(true)
    }

    /// Moves `Running` into `Stopped`. Returns `true` if the endpoint was running.
    /// `Created` stays `Created`.
    pub(crate) fn begin_stop(&mut self) -> Result<bool> {
        self.ensure_usable()?;
        if !self.is_running() {
            return Ok(false);
        }
        *self = EndpointState::Stopped;
        Ok(true)
    }

    pub(crate) fn finish_destroy(&mut self) {
        *self = EndpointState::Destroyed;
    }
}
