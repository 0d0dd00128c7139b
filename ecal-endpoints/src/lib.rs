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

//! # ecal-endpoints
//!
//! Publish/subscribe endpoints layered over a blocking message transport.
//!
//! A [`Publisher`] hands back the send side of a channel and forwards every
//! queued [`Message`] to the transport. A [`Subscriber`] polls the transport and
//! hands back the receive side of a channel carrying what arrived. Both follow the
//! same lifecycle (see [`Lifecycle`]):
//!
//! ```text
//! Created --start--> Running --stop--> Stopped --start--> Running
//!    \                  |                 /
//!     '-----------------+----destroy-----'------> Destroyed
//! ```
//!
//! `Destroyed` is terminal. Every call on a destroyed endpoint fails with
//! [`Error::DestroyedEndpoint`] without touching the transport.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use ecal_endpoints::transport::loopback::LoopbackTransport;
//! use ecal_endpoints::{Capability, Lifecycle, Message, Publisher, Qos, Reliability, Subscriber};
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! transport
//!     .initialize("quick-start", &[Capability::Publisher, Capability::Subscriber])
//!     .unwrap();
//!
//! let (subscriber, mut output) =
//!     Subscriber::create(transport.clone(), "Hello", "base:std::string", "", true, 1024)
//!         .unwrap();
//! let (publisher, input) =
//!     Publisher::create(transport, "Hello", "base:std::string", "", true).unwrap();
//!
//! publisher
//!     .set_qos(Qos { reliability: Reliability::Reliable, ..Qos::default() })
//!     .unwrap();
//! input.blocking_send(Message::new("HELLO WORLD FROM RUST", 42)).unwrap();
//!
//! let message = output.blocking_recv().unwrap();
//! assert_eq!(message.timestamp, 42);
//!
//! publisher.destroy().unwrap();
//! subscriber.destroy().unwrap();
//! ```
//!
//! ## Internal architecture map
//!
//! - Control plane: endpoint state machine, state lock, start/stop/destroy
//! - Data plane: publisher egress worker, subscriber ingress poller
//! - Runtime: dedicated worker threads with current-thread tokio runtimes
//! - Transport: the blocking primitives endpoints consume, plus a loopback bus
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries. Errors raised inside dispatch workers are
//! also published on each endpoint's event channel (`subscribe_events`).

mod config;
pub use config::{
    EndpointsConfig, PublisherConfig, SubscriberConfig, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_POLL_INTERVAL_MS, DUMP_CAPACITY,
};

mod control_plane;
pub use control_plane::endpoint_state::EndpointState;
pub use control_plane::lifecycle::Lifecycle;

mod data_plane;

mod error;
pub use error::{Error, Result};

mod event;
pub use event::EndpointEvent;

mod message;
pub use message::Message;

#[doc(hidden)]
pub mod observability;

mod publisher;
pub use publisher::Publisher;

mod qos;
pub use qos::{HistoryKind, Qos, RawQos, Reliability};

mod runtime;

mod subscriber;
pub use subscriber::Subscriber;

pub mod transport;
pub use transport::{Capability, SendMode, TransportLayer};
