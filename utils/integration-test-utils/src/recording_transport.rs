/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

//! A scriptable transport that records every call an endpoint makes.

use ecal_endpoints::transport::{
    EndpointHandle, PublisherTransport, Received, SubscriberTransport, TransportStatus,
};
use ecal_endpoints::{Capability, Error, RawQos, Result, SendMode, TransportLayer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// One payload handed to `send`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub handle: EndpointHandle,
    pub payload: Vec<u8>,
    pub timestamp: i64,
}

struct ScriptedReceive {
    payload: Vec<u8>,
    reported_len: usize,
    timestamp: i64,
}

#[derive(Default)]
struct Recorded {
    uninitialized: HashSet<Capability>,
    next_handle: u64,
    live: HashSet<EndpointHandle>,
    creates: usize,
    destroys: usize,
    calls: usize,
    sends: Vec<SentMessage>,
    receives: VecDeque<ScriptedReceive>,
    qos: HashMap<EndpointHandle, RawQos>,
    ids: HashMap<EndpointHandle, Vec<i64>>,
    fail_create: bool,
    fail_destroy: bool,
    short_write: usize,
}

/// Records publisher and subscriber calls and replays scripted receive results.
///
/// Every primitive counts as one transport call, so tests can assert that an
/// operation reached the transport or that it did not.
#[derive(Default)]
pub struct RecordingTransport {
    recorded: Mutex<Recorded>,
    scripted: Condvar,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn call(&self) -> MutexGuard<'_, Recorded> {
        let mut recorded = self.recorded();
        recorded.calls += 1;
        recorded
    }

    /// Reports `capability` as not initialized from now on.
    pub fn uninitialize(&self, capability: Capability) {
        self.recorded().uninitialized.insert(capability);
    }

    pub fn fail_create(&self, fail: bool) {
        self.recorded().fail_create = fail;
    }

    pub fn fail_destroy(&self, fail: bool) {
        self.recorded().fail_destroy = fail;
    }

    /// Makes every following `send` write `missing` bytes less than asked.
    pub fn short_write(&self, missing: usize) {
        self.recorded().short_write = missing;
    }

    /// Overrides the raw QoS reported for `handle`.
    pub fn set_raw_qos(&self, handle: EndpointHandle, qos: RawQos) {
        self.recorded().qos.insert(handle, qos);
    }

    /// Queues a receive result carrying `payload`.
    pub fn push_receive(&self, payload: &[u8], timestamp: i64) {
        self.push_receive_reporting(payload, payload.len(), timestamp);
    }

    /// Queues a receive result that reports `reported_len` bytes, which may exceed
    /// the payload and the subscriber's buffer.
    pub fn push_receive_reporting(&self, payload: &[u8], reported_len: usize, timestamp: i64) {
        self.recorded().receives.push_back(ScriptedReceive {
            payload: payload.to_vec(),
            reported_len,
            timestamp,
        });
        self.scripted.notify_all();
    }

    pub fn pending_receives(&self) -> usize {
        self.recorded().receives.len()
    }

    pub fn sends(&self) -> Vec<SentMessage> {
        self.recorded().sends.clone()
    }

    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.recorded()
            .sends
            .iter()
            .map(|sent| sent.payload.clone())
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.recorded().creates
    }

    pub fn destroys(&self) -> usize {
        self.recorded().destroys
    }

    /// Total transport calls, creation included.
    pub fn calls(&self) -> usize {
        self.recorded().calls
    }

    pub fn live_handles(&self) -> usize {
        self.recorded().live.len()
    }

    pub fn ids(&self, handle: EndpointHandle) -> Vec<i64> {
        self.recorded().ids.get(&handle).cloned().unwrap_or_default()
    }

    fn create(&self, kind: &str, topic: &str) -> Result<EndpointHandle> {
        let mut recorded = self.call();
        if recorded.fail_create {
            return Err(Error::TransportError(format!("{kind} allocation refused")));
        }
        recorded.creates += 1;
        recorded.next_handle += 1;
        let handle = EndpointHandle::new(recorded.next_handle);
        recorded.live.insert(handle);
        trace!(kind, topic, %handle, "recorded create");
        Ok(handle)
    }

    fn destroy(&self, handle: EndpointHandle) -> Result<()> {
        let mut recorded = self.call();
        if recorded.fail_destroy {
            return Err(Error::TransportError("release refused".to_string()));
        }
        if !recorded.live.remove(&handle) {
            return Err(Error::TransportError(format!("unknown handle {handle}")));
        }
        recorded.destroys += 1;
        Ok(())
    }

    fn qos(&self, handle: EndpointHandle) -> Result<RawQos> {
        Ok(self.call().qos.get(&handle).copied().unwrap_or_default())
    }

    fn store_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()> {
        self.call().qos.insert(handle, qos);
        Ok(())
    }

    fn touch(&self) -> Result<()> {
        self.call();
        Ok(())
    }
}

impl TransportStatus for RecordingTransport {
    fn is_initialized(&self, capability: Capability) -> bool {
        !self.recorded().uninitialized.contains(&capability)
    }
}

impl PublisherTransport for RecordingTransport {
    fn create_publisher(&self, topic: &str, _: &str, _: &str) -> Result<EndpointHandle> {
        self.create("publisher", topic)
    }

    fn destroy_publisher(&self, handle: EndpointHandle) -> Result<()> {
        self.destroy(handle)
    }

    fn send(&self, handle: EndpointHandle, payload: &[u8], timestamp: i64) -> usize {
        let mut recorded = self.call();
        recorded.sends.push(SentMessage {
            handle,
            payload: payload.to_vec(),
            timestamp,
        });
        trace!(%handle, len = payload.len(), timestamp, "recorded send");
        payload.len().saturating_sub(recorded.short_write)
    }

    fn publisher_qos(&self, handle: EndpointHandle) -> Result<RawQos> {
        self.qos(handle)
    }

    fn set_publisher_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()> {
        self.store_qos(handle, qos)
    }

    fn set_description(&self, _: EndpointHandle, _: &str) -> Result<()> {
        self.touch()
    }

    fn set_layer_mode(&self, _: EndpointHandle, _: TransportLayer, _: SendMode) -> Result<()> {
        self.touch()
    }

    fn set_max_bandwidth(&self, _: EndpointHandle, _: i64) -> Result<()> {
        self.touch()
    }

    fn set_id(&self, _: EndpointHandle, _: i64) -> Result<()> {
        self.touch()
    }

    fn dump_publisher(&self, handle: EndpointHandle, max_bytes: usize) -> Result<Vec<u8>> {
        self.call();
        let mut dump = format!("publisher {handle}").into_bytes();
        dump.truncate(max_bytes);
        Ok(dump)
    }
}

impl SubscriberTransport for RecordingTransport {
    fn create_subscriber(&self, topic: &str, _: &str, _: &str) -> Result<EndpointHandle> {
        self.create("subscriber", topic)
    }

    fn destroy_subscriber(&self, handle: EndpointHandle) -> Result<()> {
        self.destroy(handle)
    }

    fn receive(
        &self,
        _handle: EndpointHandle,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Option<Received> {
        let recorded = self.call();
        let (mut recorded, _) = self
            .scripted
            .wait_timeout_while(recorded, timeout, |recorded| recorded.receives.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        let scripted = recorded.receives.pop_front()?;
        let copied = scripted.payload.len().min(buffer.len());
        buffer[..copied].copy_from_slice(&scripted.payload[..copied]);
        Some(Received {
            len: scripted.reported_len,
            timestamp: scripted.timestamp,
        })
    }

    fn subscriber_qos(&self, handle: EndpointHandle) -> Result<RawQos> {
        self.qos(handle)
    }

    fn set_subscriber_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()> {
        self.store_qos(handle, qos)
    }

    fn set_ids(&self, handle: EndpointHandle, ids: &[i64]) -> Result<()> {
        self.call().ids.insert(handle, ids.to_vec());
        Ok(())
    }

    fn set_timeout(&self, _: EndpointHandle, _: Duration) -> Result<()> {
        self.touch()
    }

    fn dump_subscriber(&self, handle: EndpointHandle, max_bytes: usize) -> Result<Vec<u8>> {
        self.call();
        let mut dump = format!("subscriber {handle}").into_bytes();
        dump.truncate(max_bytes);
        Ok(dump)
    }
}
