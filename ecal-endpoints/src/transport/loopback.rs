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

//! In-process loopback transport.
//!
//! Publishers and subscribers created on the same [`LoopbackTransport`] exchange
//! messages by topic name through per-subscriber queues. It stands in for a real
//! inter-process transport in samples, tests and benchmarks.
//!
//! Behavior worth knowing:
//! - a subscriber with `KeepLast` history keeps at most [`KEEP_LAST_DEPTH`] queued
//!   messages, dropping the oldest; `KeepAll` keeps everything;
//! - a subscriber with a non-empty ID filter only accepts publishers whose ID is in
//!   the filter;
//! - a timestamp of [`Message::TIMESTAMP_NOW`](crate::Message::TIMESTAMP_NOW) is
//!   replaced by the current time in microseconds;
//! - setting [`SendMode::Off`] on [`TransportLayer::InProc`] (or `All`) makes
//!   `send` write nothing.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::qos::{HistoryKind, RawQos};
use crate::transport::{
    Capability, EndpointHandle, PublisherTransport, Received, SendMode, SubscriberTransport,
    TransportLayer, TransportStatus,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

pub const KEEP_LAST_DEPTH: usize = 8;

struct Sample {
    payload: Vec<u8>,
    timestamp: i64,
}

struct PublisherEntry {
    topic: String,
    type_name: String,
    description: String,
    qos: RawQos,
    id: i64,
    max_bandwidth: i64,
    layer_modes: BTreeMap<TransportLayer, SendMode>,
    sent: u64,
}

impl PublisherEntry {
    fn in_proc_mode(&self) -> SendMode {
        self.layer_modes
            .get(&TransportLayer::InProc)
            .or_else(|| self.layer_modes.get(&TransportLayer::All))
            .copied()
            .unwrap_or_default()
    }
}

struct SubscriberEntry {
    topic: String,
    type_name: String,
    description: String,
    qos: RawQos,
    ids: Vec<i64>,
    timeout: Option<Duration>,
    queue: VecDeque<Sample>,
    received: u64,
}

impl SubscriberEntry {
    fn accepts(&self, topic: &str, publisher_id: i64) -> bool {
        self.topic == topic && (self.ids.is_empty() || self.ids.contains(&publisher_id))
    }

    fn enqueue(&mut self, sample: Sample) {
        if self.qos.history_kind == i32::from(HistoryKind::KeepLast) {
            while self.queue.len() >= KEEP_LAST_DEPTH {
                self.queue.pop_front();
            }
        }
        self.queue.push_back(sample);
    }
}

#[derive(Default)]
struct Bus {
    unit_name: Option<String>,
    initialized: HashSet<Capability>,
    next_handle: u64,
    publishers: HashMap<EndpointHandle, PublisherEntry>,
    subscribers: HashMap<EndpointHandle, SubscriberEntry>,
}

impl Bus {
    fn allocate_handle(&mut self) -> EndpointHandle {
        self.next_handle += 1;
        EndpointHandle::new(self.next_handle)
    }

    fn publisher(&mut self, handle: EndpointHandle) -> Result<&mut PublisherEntry> {
        self.publishers
            .get_mut(&handle)
            .ok_or_else(|| unknown_handle(handle))
    }

    fn subscriber(&mut self, handle: EndpointHandle) -> Result<&mut SubscriberEntry> {
        self.subscribers
            .get_mut(&handle)
            .ok_or_else(|| unknown_handle(handle))
    }
}

fn unknown_handle(handle: EndpointHandle) -> Error {
    Error::TransportError(format!("unknown handle {handle}"))
}

fn truncated(mut dump: String, max_bytes: usize) -> Result<Vec<u8>> {
    if max_bytes == 0 {
        return Err(Error::TransportError("dump buffer is empty".to_string()));
    }
    while dump.len() > max_bytes {
        dump.pop();
    }
    Ok(dump.into_bytes())
}

#[derive(Default)]
pub struct LoopbackTransport {
    bus: Mutex<Bus>,
    arrived: Condvar,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn bus(&self) -> MutexGuard<'_, Bus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Brings up the given capabilities. Fails if all of them were already up.
    pub fn initialize(&self, unit_name: &str, capabilities: &[Capability]) -> Result<()> {
        let mut bus = self.bus();
        let mut added = false;
        for capability in capabilities {
            added |= bus.initialized.insert(*capability);
        }
        if !added {
            return Err(Error::TransportError("already initialized".to_string()));
        }
        bus.unit_name = Some(unit_name.to_string());
        debug!(unit_name, ?capabilities, "loopback transport initialized");
        Ok(())
    }

    /// Shuts the given capabilities down. Fails if none of them were up.
    pub fn finalize(&self, capabilities: &[Capability]) -> Result<()> {
        let mut bus = self.bus();
        let mut removed = false;
        for capability in capabilities {
            removed |= bus.initialized.remove(capability);
        }
        if !removed {
            return Err(Error::TransportError("already finalized".to_string()));
        }
        if bus.initialized.is_empty() {
            bus.unit_name = None;
        }
        Ok(())
    }

    /// `true` while any capability is initialized.
    pub fn ok(&self) -> bool {
        !self.bus().initialized.is_empty()
    }

    pub fn unit_name(&self) -> Option<String> {
        self.bus().unit_name.clone()
    }

    pub fn publisher_count(&self) -> usize {
        self.bus().publishers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus().subscribers.len()
    }

    fn ensure_initialized(bus: &Bus, capability: Capability) -> Result<()> {
        if !bus.initialized.contains(&capability) {
            return Err(Error::TransportUnavailable(format!(
                "{capability} capability not initialized"
            )));
        }
        Ok(())
    }

    fn ensure_topic(topic: &str) -> Result<()> {
        if topic.is_empty() {
            return Err(Error::TransportUnavailable(
                "topic name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl TransportStatus for LoopbackTransport {
    fn is_initialized(&self, capability: Capability) -> bool {
        self.bus().initialized.contains(&capability)
    }
}

impl PublisherTransport for LoopbackTransport {
    fn create_publisher(
        &self,
        topic: &str,
        type_name: &str,
        description: &str,
    ) -> Result<EndpointHandle> {
        let mut bus = self.bus();
        Self::ensure_initialized(&bus, Capability::Publisher)?;
        Self::ensure_topic(topic)?;

        let handle = bus.allocate_handle();
        bus.publishers.insert(
            handle,
            PublisherEntry {
                topic: topic.to_string(),
                type_name: type_name.to_string(),
                description: description.to_string(),
                qos: RawQos::default(),
                id: 0,
                max_bandwidth: -1,
                layer_modes: BTreeMap::new(),
                sent: 0,
            },
        );
        Ok(handle)
    }

    fn destroy_publisher(&self, handle: EndpointHandle) -> Result<()> {
        self.bus()
            .publishers
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| unknown_handle(handle))
    }

    fn send(&self, handle: EndpointHandle, payload: &[u8], timestamp: i64) -> usize {
        let mut guard = self.bus();
        let bus = &mut *guard;

        let Some(publisher) = bus.publishers.get_mut(&handle) else {
            return 0;
        };
        if publisher.in_proc_mode() == SendMode::Off {
            trace!(%handle, "in-process layer switched off");
            return 0;
        }
        publisher.sent += 1;

        let timestamp = if timestamp == Message::TIMESTAMP_NOW {
            chrono::Utc::now().timestamp_micros()
        } else {
            timestamp
        };

        let mut delivered = 0;
        for subscriber in bus.subscribers.values_mut() {
            if subscriber.accepts(&publisher.topic, publisher.id) {
                subscriber.enqueue(Sample {
                    payload: payload.to_vec(),
                    timestamp,
                });
                delivered += 1;
            }
        }
        drop(guard);

        if delivered > 0 {
            self.arrived.notify_all();
        }
        payload.len()
    }

    fn publisher_qos(&self, handle: EndpointHandle) -> Result<RawQos> {
        Ok(self.bus().publisher(handle)?.qos)
    }

    fn set_publisher_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()> {
        self.bus().publisher(handle)?.qos = qos;
        Ok(())
    }

    fn set_description(&self, handle: EndpointHandle, description: &str) -> Result<()> {
        self.bus().publisher(handle)?.description = description.to_string();
        Ok(())
    }

    fn set_layer_mode(
        &self,
        handle: EndpointHandle,
        layer: TransportLayer,
        mode: SendMode,
    ) -> Result<()> {
        let mut bus = self.bus();
        let publisher = bus.publisher(handle)?;
        if layer == TransportLayer::All {
            publisher.layer_modes.clear();
        }
        publisher.layer_modes.insert(layer, mode);
        Ok(())
    }

    fn set_max_bandwidth(&self, handle: EndpointHandle, bytes_per_second: i64) -> Result<()> {
        self.bus().publisher(handle)?.max_bandwidth = bytes_per_second;
        Ok(())
    }

    fn set_id(&self, handle: EndpointHandle, id: i64) -> Result<()> {
        self.bus().publisher(handle)?.id = id;
        Ok(())
    }

    fn dump_publisher(&self, handle: EndpointHandle, max_bytes: usize) -> Result<Vec<u8>> {
        let mut bus = self.bus();
        let publisher = bus.publisher(handle)?;
        let dump = format!(
            "publisher {handle}\n  topic: {}\n  type: {}\n  description: {}\n  id: {}\n  qos: {:?}\n  max_bandwidth: {}\n  layers: {:?}\n  sent: {}\n",
            publisher.topic,
            publisher.type_name,
            publisher.description,
            publisher.id,
            publisher.qos,
            publisher.max_bandwidth,
            publisher.layer_modes,
            publisher.sent,
        );
        truncated(dump, max_bytes)
    }
}

impl SubscriberTransport for LoopbackTransport {
    fn create_subscriber(
        &self,
        topic: &str,
        type_name: &str,
        description: &str,
    ) -> Result<EndpointHandle> {
        let mut bus = self.bus();
        Self::ensure_initialized(&bus, Capability::Subscriber)?;
        Self::ensure_topic(topic)?;

        let handle = bus.allocate_handle();
        bus.subscribers.insert(
            handle,
            SubscriberEntry {
                topic: topic.to_string(),
                type_name: type_name.to_string(),
                description: description.to_string(),
                qos: RawQos::default(),
                ids: Vec::new(),
                timeout: None,
                queue: VecDeque::new(),
                received: 0,
            },
        );
        Ok(handle)
    }

    fn destroy_subscriber(&self, handle: EndpointHandle) -> Result<()> {
        let removed = self.bus().subscribers.remove(&handle);
        // Wake receivers blocked on the removed queue.
        self.arrived.notify_all();
        removed.map(|_| ()).ok_or_else(|| unknown_handle(handle))
    }

    fn receive(
        &self,
        handle: EndpointHandle,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Option<Received> {
        let bus = self.bus();
        let (mut bus, _) = self
            .arrived
            .wait_timeout_while(bus, timeout, |bus| {
                bus.subscribers
                    .get(&handle)
                    .is_some_and(|subscriber| subscriber.queue.is_empty())
            })
            .unwrap_or_else(PoisonError::into_inner);

        let subscriber = bus.subscribers.get_mut(&handle)?;
        let sample = subscriber.queue.pop_front()?;
        subscriber.received += 1;

        let copied = sample.payload.len().min(buffer.len());
        buffer[..copied].copy_from_slice(&sample.payload[..copied]);
        Some(Received {
            len: sample.payload.len(),
            timestamp: sample.timestamp,
        })
    }

    fn subscriber_qos(&self, handle: EndpointHandle) -> Result<RawQos> {
        Ok(self.bus().subscriber(handle)?.qos)
    }

    fn set_subscriber_qos(&self, handle: EndpointHandle, qos: RawQos) -> Result<()> {
        self.bus().subscriber(handle)?.qos = qos;
        Ok(())
    }

    fn set_ids(&self, handle: EndpointHandle, ids: &[i64]) -> Result<()> {
        self.bus().subscriber(handle)?.ids = ids.to_vec();
        Ok(())
    }

    fn set_timeout(&self, handle: EndpointHandle, timeout: Duration) -> Result<()> {
        self.bus().subscriber(handle)?.timeout = Some(timeout);
        Ok(())
    }

    fn dump_subscriber(&self, handle: EndpointHandle, max_bytes: usize) -> Result<Vec<u8>> {
        let mut bus = self.bus();
        let subscriber = bus.subscriber(handle)?;
        let dump = format!(
            "subscriber {handle}\n  topic: {}\n  type: {}\n  description: {}\n  ids: {:?}\n  timeout: {:?}\n  qos: {:?}\n  queued: {}\n  received: {}\n",
            subscriber.topic,
            subscriber.type_name,
            subscriber.description,
            subscriber.ids,
            subscriber.timeout,
            subscriber.qos,
            subscriber.queue.len(),
            subscriber.received,
        );
        truncated(dump, max_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::{LoopbackTransport, KEEP_LAST_DEPTH};
    use crate::error::Error;
    use crate::qos::{HistoryKind, Qos, RawQos, Reliability};
    use crate::transport::{
        Capability, PublisherTransport, SendMode, SubscriberTransport, TransportLayer,
        TransportStatus,
    };
    use std::time::Duration;

    const POLL: Duration = Duration::from_millis(20);

    fn transport() -> LoopbackTransport {
        let transport = LoopbackTransport::new();
        transport
            .initialize(
                "loopback-test",
                &[Capability::Publisher, Capability::Subscriber],
            )
            .expect("initialize loopback");
        transport
    }

    #[test]
    fn create_requires_initialized_capability() {
        let transport = LoopbackTransport::new();
        assert!(!transport.is_initialized(Capability::Publisher));
        assert!(matches!(
            transport.create_publisher("t", "", ""),
            Err(Error::TransportUnavailable(_))
        ));

        transport
            .initialize("unit", &[Capability::Subscriber])
            .expect("initialize subscriber");
        assert!(transport.create_subscriber("t", "", "").is_ok());
        assert!(transport.create_publisher("t", "", "").is_err());
    }

    #[test]
    fn initialize_and_finalize_report_repeats() {
        let transport = transport();
        assert!(transport.ok());
        assert_eq!(transport.unit_name().as_deref(), Some("loopback-test"));
        assert!(transport
            .initialize("again", &[Capability::Publisher])
            .is_err());

        transport
            .finalize(&[Capability::Publisher, Capability::Subscriber])
            .expect("finalize");
        assert!(!transport.ok());
        assert!(transport.finalize(&[Capability::Publisher]).is_err());
    }

    #[test]
    fn send_reaches_matching_topic_only() {
        let transport = transport();
        let publisher = transport.create_publisher("t1", "raw", "").expect("pub");
        let matching = transport.create_subscriber("t1", "raw", "").expect("sub");
        let other = transport.create_subscriber("t2", "raw", "").expect("sub");

        assert_eq!(transport.send(publisher, b"abc", 42), 3);

        let mut buffer = [0u8; 8];
        let received = transport
            .receive(matching, &mut buffer, POLL)
            .expect("message on t1");
        assert_eq!(received.len, 3);
        assert_eq!(received.timestamp, 42);
        assert_eq!(&buffer[..3], b"abc");
        assert!(transport.receive(other, &mut buffer, POLL).is_none());
    }

    #[test]
    fn oversized_receive_reports_full_length() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        let subscriber = transport.create_subscriber("t", "", "").expect("sub");

        transport.send(publisher, &[1u8; 10], 0);
        let mut buffer = [0u8; 8];
        let received = transport
            .receive(subscriber, &mut buffer, POLL)
            .expect("message");
        assert_eq!(received.len, 10);
    }

    #[test]
    fn empty_payload_is_a_message_not_a_timeout() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        let subscriber = transport.create_subscriber("t", "", "").expect("sub");

        transport.send(publisher, &[], 5);
        let mut buffer = [0u8; 4];
        assert_eq!(
            transport
                .receive(subscriber, &mut buffer, POLL)
                .map(|received| received.len),
            Some(0)
        );
    }

    #[test]
    fn id_filter_limits_publishers() {
        let transport = transport();
        let accepted = transport.create_publisher("t", "", "").expect("pub");
        let rejected = transport.create_publisher("t", "", "").expect("pub");
        let subscriber = transport.create_subscriber("t", "", "").expect("sub");
        transport.set_id(accepted, 1).expect("set id");
        transport.set_id(rejected, 2).expect("set id");
        transport.set_ids(subscriber, &[1]).expect("set ids");

        transport.send(rejected, b"no", 0);
        transport.send(accepted, b"yes", 0);

        let mut buffer = [0u8; 4];
        let received = transport
            .receive(subscriber, &mut buffer, POLL)
            .expect("accepted message");
        assert_eq!(&buffer[..received.len], b"yes");
        assert!(transport.receive(subscriber, &mut buffer, POLL).is_none());
    }

    #[test]
    fn keep_last_drops_oldest() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        let subscriber = transport.create_subscriber("t", "", "").expect("sub");

        for index in 0..(KEEP_LAST_DEPTH + 2) {
            transport.send(publisher, &[index as u8], 0);
        }

        let mut buffer = [0u8; 1];
        transport
            .receive(subscriber, &mut buffer, POLL)
            .expect("oldest kept");
        assert_eq!(buffer[0], 2);
    }

    #[test]
    fn keep_all_retains_everything() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        let subscriber = transport.create_subscriber("t", "", "").expect("sub");
        let keep_all = RawQos::from(Qos::new(Reliability::Reliable, HistoryKind::KeepAll));
        transport
            .set_subscriber_qos(subscriber, keep_all)
            .expect("set qos");

        for index in 0..(KEEP_LAST_DEPTH + 2) {
            transport.send(publisher, &[index as u8], 0);
        }

        let mut buffer = [0u8; 1];
        transport
            .receive(subscriber, &mut buffer, POLL)
            .expect("first kept");
        assert_eq!(buffer[0], 0);
    }

    #[test]
    fn in_proc_layer_off_writes_nothing() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        transport
            .set_layer_mode(publisher, TransportLayer::All, SendMode::Off)
            .expect("set layer");
        assert_eq!(transport.send(publisher, b"abc", 0), 0);

        transport
            .set_layer_mode(publisher, TransportLayer::InProc, SendMode::On)
            .expect("set layer");
        assert_eq!(transport.send(publisher, b"abc", 0), 3);
    }

    #[test]
    fn now_timestamp_is_stamped() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        let subscriber = transport.create_subscriber("t", "", "").expect("sub");

        transport.send(publisher, b"x", -1);
        let mut buffer = [0u8; 1];
        let received = transport
            .receive(subscriber, &mut buffer, POLL)
            .expect("message");
        assert!(received.timestamp > 0);
    }

    #[test]
    fn destroyed_handles_are_unknown() {
        let transport = transport();
        let publisher = transport.create_publisher("t", "", "").expect("pub");
        transport.destroy_publisher(publisher).expect("destroy");
        assert!(transport.destroy_publisher(publisher).is_err());
        assert_eq!(transport.send(publisher, b"abc", 0), 0);
        assert_eq!(transport.publisher_count(), 0);
    }

    #[test]
    fn dump_is_truncated_to_max_bytes() {
        let transport = transport();
        let subscriber = transport.create_subscriber("topic", "", "").expect("sub");
        let dump = transport.dump_subscriber(subscriber, 10).expect("dump");
        assert_eq!(dump.len(), 10);
        assert!(transport.dump_subscriber(subscriber, 0).is_err());
    }
}
