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

//! Endpoint configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "publishers": [{ "topic": "Hello", "type_name": "base:std::string" }],
//!   "subscribers": [{ "topic": "Hello", "buffer_capacity": 1024, "poll_interval_ms": 50 }]
//! }
//! ```

use crate::error::{Error, Result};
use crate::qos::Qos;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DUMP_CAPACITY: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub topic: String,
    pub type_name: String,
    pub description: String,
    pub auto_start: bool,
    /// Capacity of the input channel handed back by `create`.
    pub channel_capacity: usize,
    pub event_capacity: usize,
    /// Applied right after creation when set.
    pub qos: Option<Qos>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            type_name: String::new(),
            description: String::new(),
            auto_start: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            qos: None,
        }
    }
}

impl PublisherConfig {
    pub fn new(topic: &str, type_name: &str) -> Self {
        Self {
            topic: topic.to_string(),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::InvalidArgument(
                "channel_capacity must be larger than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidArgument(
                "event_capacity must be larger than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    pub topic: String,
    pub type_name: String,
    pub description: String,
    pub auto_start: bool,
    /// Size of the receive buffer; larger messages are dropped and reported.
    pub buffer_capacity: usize,
    /// Capacity of the output channel handed back by `create`.
    pub channel_capacity: usize,
    pub event_capacity: usize,
    /// Upper bound of one transport receive attempt.
    pub poll_interval_ms: u64,
    pub qos: Option<Qos>,
    /// Accepted publisher IDs; empty accepts all.
    pub ids: Vec<i64>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            type_name: String::new(),
            description: String::new(),
            auto_start: true,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            qos: None,
            ids: Vec::new(),
        }
    }
}

impl SubscriberConfig {
    pub fn new(topic: &str, type_name: &str, buffer_capacity: usize) -> Self {
        Self {
            topic: topic.to_string(),
            type_name: type_name.to_string(),
            buffer_capacity,
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::InvalidArgument(
                "buffer_capacity must be larger than zero".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::InvalidArgument(
                "channel_capacity must be larger than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidArgument(
                "event_capacity must be larger than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidArgument(
                "poll_interval_ms must be larger than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A set of endpoints to bring up together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub publishers: Vec<PublisherConfig>,
    pub subscribers: Vec<SubscriberConfig>,
}

impl EndpointsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| Error::InvalidArgument(format!("unable to parse config: {err}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading endpoints config");
        let data = fs::read_to_string(path).map_err(|err| {
            Error::InvalidArgument(format!("unable to read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&data)
    }
}
