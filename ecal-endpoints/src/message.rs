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

//! The value exchanged over endpoint channels.

use bytes::Bytes;

/// A byte payload plus the producer timestamp.
///
/// Payloads are reference-counted [`Bytes`], so cloning a message never copies
/// the payload. Received messages always own their payload; they never alias
/// the subscriber's scratch buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub payload: Bytes,
    pub timestamp: i64,
}

impl Message {
    /// Timestamp value asking the transport to stamp the message on send.
    pub const TIMESTAMP_NOW: i64 = -1;

    pub fn new(payload: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            payload: payload.into(),
            timestamp,
        }
    }

    /// Builds a message the transport stamps with its own clock.
    pub fn now(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, Self::TIMESTAMP_NOW)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Message;

    #[test]
    fn now_uses_transport_timestamp_marker() {
        let message = Message::now("abc");
        assert_eq!(message.timestamp, Message::TIMESTAMP_NOW);
        assert_eq!(message.len(), 3);
    }

    #[test]
    fn empty_payload_is_reported() {
        assert!(Message::new(Vec::new(), 7).is_empty());
        assert!(!Message::new(vec![0u8], 7).is_empty());
    }
}
