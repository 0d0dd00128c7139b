/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Conditions raised inside dispatch workers.
//!
//! Workers cannot return errors to whoever queued or consumes a message, so they
//! publish them on a per-endpoint broadcast channel in addition to logging them.

use crate::error::Error;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointEvent {
    /// A dispatch worker started for a new run.
    WorkerStarted { worker_id: String },
    /// A dispatch worker left its loop.
    WorkerStopped { worker_id: String },
    /// A message could not be forwarded; the worker kept going.
    DispatchFailed { worker_id: String, error: Error },
    /// The data channel was closed by the application side.
    ChannelClosed { worker_id: String },
}

#[derive(Clone)]
pub(crate) struct EventSink {
    sender: broadcast::Sender<EndpointEvent>,
}

impl EventSink {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<EndpointEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn report(&self, event: EndpointEvent) {
        if self.sender.send(event).is_err() {
            trace!("no event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EndpointEvent, EventSink};
    use crate::error::Error;

    #[test]
    fn report_without_subscribers_is_silent() {
        let sink = EventSink::new(4);
        sink.report(EndpointEvent::ChannelClosed {
            worker_id: "w".into(),
        });
    }

    #[tokio::test]
    async fn subscribers_see_reported_events() {
        let sink = EventSink::new(4);
        let mut events = sink.subscribe();
        let event = EndpointEvent::DispatchFailed {
            worker_id: "w".into(),
            error: Error::NotRunning,
        };
        sink.report(event.clone());
        assert_eq!(events.recv().await.expect("event"), event);
    }
}
