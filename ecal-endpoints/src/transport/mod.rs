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

//! The transport boundary.
//!
//! Endpoints consume a transport through two handle-keyed traits. Every method is
//! synchronous and may block for a bounded time. Implementations must tolerate
//! calls on one handle from several threads: a subscriber polls `receive` from its
//! dispatch worker while accessors run on the caller's thread.

pub mod loopback;

use crate::error::Result;
use crate::qos::RawQos;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use strum::{Display, EnumIter};

/// Opaque reference to one transport-side publisher or subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointHandle(u64);

impl EndpointHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Transport subsystems that must be initialized before endpoints are created.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash)]
pub enum Capability {
    Publisher,
    Subscriber,
}

#[derive(
    Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransportLayer {
    Udp,
    Shm,
    Tcp,
    InProc,
    All,
}

#[derive(
    Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    Off,
    On,
    #[default]
    Auto,
}

/// Outcome of one successful receive.
///
/// `len` is the size the transport reports for the message. It may exceed the
/// buffer handed to [`SubscriberTransport::receive`]; callers treat that as a
/// contract violation and discard the buffer contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Received {
    pub len: usize,
    pub timestamp: i64,
}

/// Process-wide initialization status, owned outside of this crate.
pub trait TransportStatus: Send + Sync {
    fn is_initialized(&self, capability: Capability) -> bool;
}

pub trait PublisherTransport: TransportStatus {
    fn create_publisher(
        &self,
        topic: &str,
        type_name: &str,
        description: &str,
    ) -> Result<EndpointHandle>;

    fn destroy_publisher(&self, handle: EndpointHandle) -> Result<()>;

    /// Sends one payload and returns the number of bytes written.
    fn send(&self, handle: EndpointHandle, payload: &[u8], timestamp: i64) -> usize;

    fn publisher_qos(&self, handle: EndpointHandle) -> Result<RawQos>;

    fn set_publisher_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()>;

    fn set_description(&self, handle: EndpointHandle, description: &str) -> Result<()>;

    fn set_layer_mode(
        &self,
        handle: EndpointHandle,
        layer: TransportLayer,
        mode: SendMode,
    ) -> Result<()>;

    /// Caps outgoing bandwidth in bytes per second; negative means unlimited.
    fn set_max_bandwidth(&self, handle: EndpointHandle, bytes_per_second: i64) -> Result<()>;

    fn set_id(&self, handle: EndpointHandle, id: i64) -> Result<()>;

    fn dump_publisher(&self, handle: EndpointHandle, max_bytes: usize) -> Result<Vec<u8>>;
}

pub trait SubscriberTransport: TransportStatus {
    fn create_subscriber(
        &self,
        topic: &str,
        type_name: &str,
        description: &str,
    ) -> Result<EndpointHandle>;

    fn destroy_subscriber(&self, handle: EndpointHandle) -> Result<()>;

    /// Waits up to `timeout` for one message and copies it into `buffer`.
    /// `None` means nothing arrived in time.
    fn receive(
        &self,
        handle: EndpointHandle,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Option<Received>;

    fn subscriber_qos(&self, handle: EndpointHandle) -> Result<RawQos>;

    fn set_subscriber_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()>;

    /// Restricts accepted publishers to `ids`; an empty slice accepts all.
    fn set_ids(&self, handle: EndpointHandle, ids: &[i64]) -> Result<()>;

    fn set_timeout(&self, handle: EndpointHandle, timeout: Duration) -> Result<()>;

    fn dump_subscriber(&self, handle: EndpointHandle, max_bytes: usize) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::{EndpointHandle, SendMode, TransportLayer};

    #[test]
    fn handle_displays_as_hex() {
        assert_eq!(EndpointHandle::new(255).to_string(), "0xff");
        assert_eq!(EndpointHandle::new(7).raw(), 7);
    }

    #[test]
    fn layer_and_mode_use_snake_case() {
        let layer: TransportLayer = serde_json::from_str("\"in_proc\"").expect("valid layer");
        assert_eq!(layer, TransportLayer::InProc);
        assert_eq!(SendMode::default(), SendMode::Auto);
    }
}
