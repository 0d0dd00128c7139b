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

use crate::config::{SubscriberConfig, DUMP_CAPACITY};
use crate::control_plane::endpoint_state::EndpointState;
use crate::control_plane::lifecycle::{DispatchEndpoint, Lifecycle, LifecycleDriver};
use crate::control_plane::state_lock::StateLock;
use crate::data_plane::ingress_poller::{message_polling_loop, SubscriberOutbox};
use crate::error::{Error, Result};
use crate::event::{EndpointEvent, EventSink};
use crate::message::Message;
use crate::observability::events;
use crate::qos::Qos;
use crate::runtime::worker_runtime::StopSignal;
use crate::transport::{Capability, EndpointHandle, SubscriberTransport};
use bytes::Bytes;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

const COMPONENT: &str = "subscriber";

pub(crate) struct SubscriberSettings {
    description: String,
    qos: Qos,
    ids: Vec<i64>,
    timeout: Option<Duration>,
}

/// State shared between a [`Subscriber`] and its dispatch worker.
pub(crate) struct SubscriberEndpoint {
    transport: Arc<dyn SubscriberTransport>,
    handle: EndpointHandle,
    topic: String,
    type_name: String,
    buffer_capacity: usize,
    poll_interval: Duration,
    state: StateLock<SubscriberSettings>,
    events: EventSink,
}

impl SubscriberEndpoint {
    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// One bounded receive attempt. `Ok(None)` is a timeout.
    ///
    /// The state is checked under the lock, the receive itself runs without it so
    /// lifecycle calls never wait a poll interval for the lock. `destroy` joins the
    /// worker before releasing the handle, so the handle is live for the whole call.
    pub(crate) fn poll(&self, scratch: &mut [u8]) -> Result<Option<Message>> {
        self.state.lock().state.ensure_running()?;

        let Some(received) = self
            .transport
            .receive(self.handle, scratch, self.poll_interval)
        else {
            return Ok(None);
        };

        if received.len > scratch.len() {
            return Err(Error::OversizedMessage {
                received: received.len,
                capacity: scratch.len(),
            });
        }

        Ok(Some(Message::new(
            Bytes::copy_from_slice(&scratch[..received.len]),
            received.timestamp,
        )))
    }

    fn accessor<T>(
        &self,
        name: &'static str,
        f: impl FnOnce(&mut SubscriberSettings) -> Result<T>,
    ) -> Result<T> {
        self.state.with_usable(f).map_err(|err| {
            warn!(
                event = events::ACCESSOR_FAILED,
                component = COMPONENT,
                topic = %self.topic,
                accessor = name,
                err = %err,
                "subscriber accessor failed"
            );
            err
        })
    }
}

impl DispatchEndpoint for SubscriberEndpoint {
    type Settings = SubscriberSettings;
    type Resources = SubscriberOutbox;

    fn kind(&self) -> &'static str {
        "subscriber"
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn state_lock(&self) -> &StateLock<SubscriberSettings> {
        &self.state
    }

    fn release(&self) -> Result<()> {
        self.transport.destroy_subscriber(self.handle)
    }

    async fn dispatch(
        self: Arc<Self>,
        outbox: SubscriberOutbox,
        stop: StopSignal,
        worker_id: String,
    ) -> SubscriberOutbox {
        message_polling_loop(self, outbox, stop, worker_id).await
    }
}

/// A subscriber endpoint.
///
/// While running, every message the transport delivers for the topic is copied
/// into an owned [`Message`] and sent on the output channel returned by
/// [`Subscriber::create`]. A slow consumer back-pressures the dispatch worker.
pub struct Subscriber {
    driver: LifecycleDriver<SubscriberEndpoint>,
}

impl Subscriber {
    /// Creates a subscriber on `topic` with a receive buffer of `buffer_capacity`
    /// bytes, starting it when `auto_start` is set.
    pub fn create(
        transport: Arc<dyn SubscriberTransport>,
        topic: &str,
        type_name: &str,
        description: &str,
        auto_start: bool,
        buffer_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<Message>)> {
        let config = SubscriberConfig {
            topic: topic.to_string(),
            type_name: type_name.to_string(),
            description: description.to_string(),
            auto_start,
            buffer_capacity,
            ..Default::default()
        };
        Self::from_config(transport, &config)
    }

    pub fn from_config(
        transport: Arc<dyn SubscriberTransport>,
        config: &SubscriberConfig,
    ) -> Result<(Self, mpsc::Receiver<Message>)> {
        config.validate()?;

        if !transport.is_initialized(Capability::Subscriber) {
            error!(
                event = events::LIFECYCLE_CREATE_FAILED,
                component = COMPONENT,
                topic = %config.topic,
                "transport not initialized for subscribers"
            );
            return Err(Error::TransportUnavailable(
                "transport not initialized for subscribers".to_string(),
            ));
        }

        let handle = transport
            .create_subscriber(&config.topic, &config.type_name, &config.description)
            .map_err(|err| {
                error!(
                    event = events::LIFECYCLE_CREATE_FAILED,
                    component = COMPONENT,
                    topic = %config.topic,
                    err = %err,
                    "unable to create subscriber"
                );
                match err {
                    Error::TransportUnavailable(_) => err,
                    other => Error::TransportUnavailable(other.to_string()),
                }
            })?;

        debug!(
            event = events::LIFECYCLE_CREATE,
            component = COMPONENT,
            topic = %config.topic,
            type_name = %config.type_name,
            %handle,
            buffer_capacity = config.buffer_capacity,
            "subscriber created"
        );

        let endpoint = Arc::new(SubscriberEndpoint {
            transport,
            handle,
            topic: config.topic.clone(),
            type_name: config.type_name.clone(),
            buffer_capacity: config.buffer_capacity,
            poll_interval: config.poll_interval(),
            state: StateLock::new(SubscriberSettings {
                description: config.description.clone(),
                qos: Qos::default(),
                ids: Vec::new(),
                timeout: None,
            }),
            events: EventSink::new(config.event_capacity),
        });

        let (sender, output) = mpsc::channel(config.channel_capacity);
        let subscriber = Self {
            driver: LifecycleDriver::new(
                endpoint,
                SubscriberOutbox::new(sender, config.buffer_capacity),
            ),
        };

        if let Some(qos) = config.qos {
            subscriber.set_qos(qos)?;
        }
        if !config.ids.is_empty() {
            subscriber.set_ids(&config.ids)?;
        }
        if config.auto_start {
            subscriber.start()?;
        }

        Ok((subscriber, output))
    }

    fn endpoint(&self) -> &SubscriberEndpoint {
        self.driver.endpoint()
    }

    pub fn topic(&self) -> &str {
        &self.endpoint().topic
    }

    pub fn type_name(&self) -> &str {
        &self.endpoint().type_name
    }

    pub fn description(&self) -> String {
        self.endpoint().state.lock().settings.description.clone()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.endpoint().buffer_capacity
    }

    pub fn poll_interval(&self) -> Duration {
        self.endpoint().poll_interval
    }

    /// Accepted publisher IDs; empty accepts all.
    pub fn ids(&self) -> Vec<i64> {
        self.endpoint().state.lock().settings.ids.clone()
    }

    /// The last timeout set through [`Subscriber::set_timeout`].
    pub fn timeout(&self) -> Option<Duration> {
        self.endpoint().state.lock().settings.timeout
    }

    /// Reads the QoS from the transport.
    pub fn qos(&self) -> Result<Qos> {
        let endpoint = self.endpoint();
        endpoint.accessor("qos", |_| {
            Qos::try_from(endpoint.transport.subscriber_qos(endpoint.handle)?)
        })
    }

    pub fn set_qos(&self, qos: Qos) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_qos", |settings| {
            endpoint
                .transport
                .set_subscriber_qos(endpoint.handle, qos.into())?;
            settings.qos = qos;
            Ok(())
        })
    }

    pub fn set_ids(&self, ids: &[i64]) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_ids", |settings| {
            endpoint.transport.set_ids(endpoint.handle, ids)?;
            settings.ids = ids.to_vec();
            Ok(())
        })
    }

    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_timeout", |settings| {
            endpoint.transport.set_timeout(endpoint.handle, timeout)?;
            settings.timeout = Some(timeout);
            Ok(())
        })
    }

    /// Diagnostic dump from the transport, at most 4096 bytes.
    pub fn dump(&self) -> Result<Vec<u8>> {
        let endpoint = self.endpoint();
        endpoint.accessor("dump", |_| {
            endpoint
                .transport
                .dump_subscriber(endpoint.handle, DUMP_CAPACITY)
        })
    }

    /// Subscribes to conditions raised by the dispatch worker, such as oversized
    /// messages.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EndpointEvent> {
        self.endpoint().events.subscribe()
    }
}

impl Lifecycle for Subscriber {
    fn start(&self) -> Result<()> {
        self.driver.start()
    }

    fn stop(&self) -> Result<()> {
        self.driver.stop()
    }

    fn destroy(&self) -> Result<()> {
        self.driver.destroy()
    }

    fn is_stopped(&self) -> bool {
        self.driver.is_stopped()
    }

    fn is_destroyed(&self) -> bool {
        self.driver.is_destroyed()
    }

    fn state(&self) -> EndpointState {
        self.driver.state()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if self.is_destroyed() {
            return;
        }
        if let Err(err) = self.destroy() {
            warn!(
                event = events::LIFECYCLE_DROP_DESTROY_FAILED,
                component = COMPONENT,
                topic = %self.topic(),
                err = %err,
                "unable to destroy subscriber on drop"
            );
        }
    }
}

impl Debug for Subscriber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic())
            .field("type_name", &self.type_name())
            .field("buffer_capacity", &self.buffer_capacity())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
