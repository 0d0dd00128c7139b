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

//! Data-plane layer.
//!
//! Owns the two dispatch loops: the publisher egress worker that drains the input
//! channel into the transport, and the subscriber ingress poller that turns
//! bounded transport receives into owned messages on the output channel. Both
//! loops re-check endpoint state after every wait and carry a message that was
//! in flight when the endpoint stopped over to the next run.
//!
//! ```
//! use std::sync::Arc;
//! use ecal_endpoints::transport::loopback::LoopbackTransport;
//! use ecal_endpoints::{Capability, Lifecycle, Message, Publisher, Subscriber};
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! transport
//!     .initialize("data-plane-doc", &[Capability::Publisher, Capability::Subscriber])
//!     .unwrap();
//!
//! let (subscriber, mut output) =
//!     Subscriber::create(transport.clone(), "doc", "", "", true, 64).unwrap();
//! let (publisher, input) = Publisher::create(transport, "doc", "", "", true).unwrap();
//!
//! input.blocking_send(Message::new("ping", 1)).unwrap();
//! let received = output.blocking_recv().unwrap();
//! assert_eq!(&received.payload[..], b"ping");
//!
//! publisher.destroy().unwrap();
//! subscriber.destroy().unwrap();
//! ```

pub(crate) mod egress_worker;
pub(crate) mod ingress_poller;
