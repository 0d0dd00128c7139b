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

use crate::config::{PublisherConfig, DUMP_CAPACITY};
use crate::control_plane::endpoint_state::EndpointState;
use crate::control_plane::lifecycle::{DispatchEndpoint, Lifecycle, LifecycleDriver};
use crate::control_plane::state_lock::StateLock;
use crate::data_plane::egress_worker::{message_forwarding_loop, PublisherInbox};
use crate::error::{Error, Result};
use crate::event::{EndpointEvent, EventSink};
use crate::message::Message;
use crate::observability::events;
use crate::qos::Qos;
use crate::runtime::worker_runtime::StopSignal;
use crate::transport::{Capability, EndpointHandle, PublisherTransport, SendMode, TransportLayer};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

const PUBLISHER_TAG: &str = "Publisher:";
const PUBLISHER_FN_CREATE_TAG: &str = "create():";
const PUBLISHER_FN_DROP_TAG: &str = "drop():";

pub(crate) struct PublisherSettings {
    description: String,
    qos: Qos,
    id: i64,
    max_bandwidth: i64,
    layer_modes: BTreeMap<TransportLayer, SendMode>,
}

/// State shared between a [`Publisher`] and its dispatch worker.
pub(crate) struct PublisherEndpoint {
    transport: Arc<dyn PublisherTransport>,
    handle: EndpointHandle,
    topic: String,
    type_name: String,
    state: StateLock<PublisherSettings>,
    events: EventSink,
}

impl PublisherEndpoint {
    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// Forwards one message to the transport.
    ///
    /// Takes the state lock, so a message never reaches the transport after the
    /// endpoint stopped or its handle was released.
    pub(crate) fn send(&self, message: &Message) -> Result<usize> {
        let guarded = self.state.lock();
        guarded.state.ensure_running()?;
        if message.is_empty() {
            return Err(Error::empty_payload());
        }

        let written = self
            .transport
            .send(self.handle, &message.payload, message.timestamp);
        if written < message.len() {
            return Err(Error::PartialSend {
                written,
                expected: message.len(),
            });
        }
        Ok(written)
    }

    fn accessor<T>(
        &self,
        name: &'static str,
        f: impl FnOnce(&mut PublisherSettings) -> Result<T>,
    ) -> Result<T> {
        self.state.with_usable(f).map_err(|err| {
            warn!(
                event = events::ACCESSOR_FAILED,
                component = "publisher",
                topic = %self.topic,
                accessor = name,
                err = %err,
                "publisher accessor failed"
            );
            err
        })
    }
}

impl DispatchEndpoint for PublisherEndpoint {
    type Settings = PublisherSettings;
    type Resources = PublisherInbox;

    fn kind(&self) -> &'static str {
        "publisher"
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn state_lock(&self) -> &StateLock<PublisherSettings> {
        &self.state
    }

    fn release(&self) -> Result<()> {
        self.transport.destroy_publisher(self.handle)
    }

    async fn dispatch(
        self: Arc<Self>,
        inbox: PublisherInbox,
        stop: StopSignal,
        worker_id: String,
    ) -> PublisherInbox {
        message_forwarding_loop(self, inbox, stop, worker_id).await
    }
}

/// A publisher endpoint.
///
/// Messages sent on the input channel returned by [`Publisher::create`] are
/// forwarded to the transport, in order, while the publisher is running. Messages
/// queued while it is stopped stay queued until the next [`Lifecycle::start`].
///
/// ```
/// use std::sync::Arc;
/// use ecal_endpoints::transport::loopback::LoopbackTransport;
/// use ecal_endpoints::{Capability, Lifecycle, Message, Publisher};
///
/// let transport = Arc::new(LoopbackTransport::new());
/// transport.initialize("publisher-doc", &[Capability::Publisher]).unwrap();
///
/// let (publisher, input) =
///     Publisher::create(transport, "Hello", "base:std::string", "", true).unwrap();
/// input.blocking_send(Message::now("Hello World")).unwrap();
/// publisher.destroy().unwrap();
/// ```
pub struct Publisher {
    driver: LifecycleDriver<PublisherEndpoint>,
}

impl Publisher {
    /// Creates a publisher on `topic`, starting it when `auto_start` is set.
    pub fn create(
        transport: Arc<dyn PublisherTransport>,
        topic: &str,
        type_name: &str,
        description: &str,
        auto_start: bool,
    ) -> Result<(Self, mpsc::Sender<Message>)> {
        let config = PublisherConfig {
            topic: topic.to_string(),
            type_name: type_name.to_string(),
            description: description.to_string(),
            auto_start,
            ..Default::default()
        };
        Self::from_config(transport, &config)
    }

    pub fn from_config(
        transport: Arc<dyn PublisherTransport>,
        config: &PublisherConfig,
    ) -> Result<(Self, mpsc::Sender<Message>)> {
        config.validate()?;

        if !transport.is_initialized(Capability::Publisher) {
            error!(
                "{}:{} transport not initialized for publishers, topic: {}",
                PUBLISHER_TAG, PUBLISHER_FN_CREATE_TAG, config.topic
            );
            return Err(Error::TransportUnavailable(
                "transport not initialized for publishers".to_string(),
            ));
        }

        let handle = transport
            .create_publisher(&config.topic, &config.type_name, &config.description)
            .map_err(|err| {
                error!(
                    event = events::LIFECYCLE_CREATE_FAILED,
                    component = "publisher",
                    topic = %config.topic,
                    err = %err,
                    "{}:{} unable to create publisher",
                    PUBLISHER_TAG,
                    PUBLISHER_FN_CREATE_TAG
                );
                match err {
                    Error::TransportUnavailable(_) => err,
                    other => Error::TransportUnavailable(other.to_string()),
                }
            })?;

        debug!(
            event = events::LIFECYCLE_CREATE,
            component = "publisher",
            topic = %config.topic,
            type_name = %config.type_name,
            %handle,
            "{}:{} publisher created",
            PUBLISHER_TAG,
            PUBLISHER_FN_CREATE_TAG
        );

        let endpoint = Arc::new(PublisherEndpoint {
            transport,
            handle,
            topic: config.topic.clone(),
            type_name: config.type_name.clone(),
            state: StateLock::new(PublisherSettings {
                description: config.description.clone(),
                qos: Qos::default(),
                id: 0,
                max_bandwidth: -1,
                layer_modes: BTreeMap::new(),
            }),
            events: EventSink::new(config.event_capacity),
        });

        let (input, receiver) = mpsc::channel(config.channel_capacity);
        let publisher = Self {
            driver: LifecycleDriver::new(endpoint, PublisherInbox::new(receiver)),
        };

        // On failure below, dropping `publisher` releases the handle again.
        if let Some(qos) = config.qos {
            publisher.set_qos(qos)?;
        }
        if config.auto_start {
            publisher.start()?;
        }

        Ok((publisher, input))
    }

    fn endpoint(&self) -> &PublisherEndpoint {
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

    /// The last ID set through [`Publisher::set_id`], `0` before that.
    pub fn id(&self) -> i64 {
        self.endpoint().state.lock().settings.id
    }

    /// The last cap set through [`Publisher::set_max_bandwidth`]; `-1` is unlimited.
    pub fn max_bandwidth(&self) -> i64 {
        self.endpoint().state.lock().settings.max_bandwidth
    }

    /// The send mode last set for `layer`, if any.
    pub fn layer_mode(&self, layer: TransportLayer) -> Option<SendMode> {
        self.endpoint()
            .state
            .lock()
            .settings
            .layer_modes
            .get(&layer)
            .copied()
    }

    /// Reads the QoS from the transport.
    ///
    /// Callers wanting the `{BestEffort, KeepLast}` fallback on failure use
    /// `qos().unwrap_or_default()`.
    pub fn qos(&self) -> Result<Qos> {
        let endpoint = self.endpoint();
        endpoint.accessor("qos", |_| {
            Qos::try_from(endpoint.transport.publisher_qos(endpoint.handle)?)
        })
    }

    pub fn set_qos(&self, qos: Qos) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_qos", |settings| {
            endpoint
                .transport
                .set_publisher_qos(endpoint.handle, qos.into())?;
            settings.qos = qos;
            Ok(())
        })
    }

    pub fn set_description(&self, description: &str) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_description", |settings| {
            endpoint
                .transport
                .set_description(endpoint.handle, description)?;
            settings.description = description.to_string();
            Ok(())
        })
    }

    pub fn set_layer_mode(&self, layer: TransportLayer, mode: SendMode) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_layer_mode", |settings| {
            endpoint
                .transport
                .set_layer_mode(endpoint.handle, layer, mode)?;
            if layer == TransportLayer::All {
                settings.layer_modes.clear();
            }
            settings.layer_modes.insert(layer, mode);
            Ok(())
        })
    }

    pub fn set_max_bandwidth(&self, bytes_per_second: i64) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_max_bandwidth", |settings| {
            endpoint
                .transport
                .set_max_bandwidth(endpoint.handle, bytes_per_second)?;
            settings.max_bandwidth = bytes_per_second;
            Ok(())
        })
    }

    pub fn set_id(&self, id: i64) -> Result<()> {
        let endpoint = self.endpoint();
        endpoint.accessor("set_id", |settings| {
            endpoint.transport.set_id(endpoint.handle, id)?;
            settings.id = id;
            Ok(())
        })
    }

    /// Diagnostic dump from the transport, at most 4096 bytes.
    pub fn dump(&self) -> Result<Vec<u8>> {
        let endpoint = self.endpoint();
        endpoint.accessor("dump", |_| {
            endpoint
                .transport
                .dump_publisher(endpoint.handle, DUMP_CAPACITY)
        })
    }

    /// Subscribes to conditions raised by the dispatch worker.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EndpointEvent> {
        self.endpoint().events.subscribe()
    }
}

impl Lifecycle for Publisher {
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

impl Drop for Publisher {
    fn drop(&mut self) {
        if self.is_destroyed() {
            return;
        }
        if let Err(err) = self.destroy() {
            warn!(
                event = events::LIFECYCLE_DROP_DESTROY_FAILED,
                component = "publisher",
                topic = %self.topic(),
                err = %err,
                "{}:{} unable to destroy publisher on drop",
                PUBLISHER_TAG,
                PUBLISHER_FN_DROP_TAG
            );
        }
    }
}

impl Debug for Publisher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic())
            .field("type_name", &self.type_name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
