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

//! Control-plane layer.
//!
//! Owns the endpoint state machine, the per-endpoint state lock and the
//! start/stop/destroy transitions. Transitions are serialised per endpoint and a
//! stop or destroy only returns once the dispatch worker has exited, so
//! "destroyed" implies no worker is still executing.
//!
//! ```
//! use std::sync::Arc;
//! use ecal_endpoints::transport::loopback::LoopbackTransport;
//! use ecal_endpoints::{Capability, EndpointState, Lifecycle, Publisher};
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! transport.initialize("control-plane-doc", &[Capability::Publisher]).unwrap();
//!
//! let (publisher, _input) = Publisher::create(transport, "doc", "", "", false).unwrap();
//! assert_eq!(publisher.state(), EndpointState::Created);
//!
//! publisher.start().unwrap();
//! publisher.start().unwrap();
//! assert_eq!(publisher.state(), EndpointState::Running);
//!
//! publisher.destroy().unwrap();
//! assert!(publisher.start().is_err());
//! ```

pub(crate) mod endpoint_state;
pub(crate) mod lifecycle;
pub(crate) mod state_lock;
