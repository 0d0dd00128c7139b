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

//! Quality-of-service descriptor and its mapping to the transport encoding.
//!
//! The mapping is pure: no state and no locking. Values the transport reports
//! outside the known enumeration surface as [`Error::UnsupportedPolicyValue`]
//! rather than being coerced, so version skew with the transport is visible.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    #[default]
    BestEffort,
    Reliable,
}

#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    #[default]
    KeepLast,
    KeepAll,
}

/// Reliability and history-retention policy pair.
///
/// `Qos::default()` is `{BestEffort, KeepLast}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Qos {
    pub reliability: Reliability,
    pub history_kind: HistoryKind,
}

impl Qos {
    pub const fn new(reliability: Reliability, history_kind: HistoryKind) -> Self {
        Self {
            reliability,
            history_kind,
        }
    }
}

/// Transport-native QoS encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawQos {
    pub reliability: i32,
    pub history_kind: i32,
}

const RAW_BEST_EFFORT: i32 = 0;
const RAW_RELIABLE: i32 = 1;
const RAW_KEEP_LAST: i32 = 0;
const RAW_KEEP_ALL: i32 = 1;

impl From<Reliability> for i32 {
    fn from(reliability: Reliability) -> Self {
        match reliability {
            Reliability::BestEffort => RAW_BEST_EFFORT,
            Reliability::Reliable => RAW_RELIABLE,
        }
    }
}

impl TryFrom<i32> for Reliability {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            RAW_BEST_EFFORT => Ok(Reliability::BestEffort),
            RAW_RELIABLE => Ok(Reliability::Reliable),
            value => Err(Error::UnsupportedPolicyValue {
                policy: "reliability",
                value,
            }),
        }
    }
}

impl From<HistoryKind> for i32 {
    fn from(history_kind: HistoryKind) -> Self {
        match history_kind {
            HistoryKind::KeepLast => RAW_KEEP_LAST,
            HistoryKind::KeepAll => RAW_KEEP_ALL,
        }
    }
}

impl TryFrom<i32> for HistoryKind {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            RAW_KEEP_LAST => Ok(HistoryKind::KeepLast),
            RAW_KEEP_ALL => Ok(HistoryKind::KeepAll),
            value => Err(Error::UnsupportedPolicyValue {
                policy: "history_kind",
                value,
            }),
        }
    }
}

impl From<Qos> for RawQos {
    fn from(qos: Qos) -> Self {
        Self {
            reliability: qos.reliability.into(),
            history_kind: qos.history_kind.into(),
        }
    }
}

impl TryFrom<RawQos> for Qos {
    type Error = Error;

    fn try_from(raw: RawQos) -> Result<Self, Self::Error> {
        Ok(Self {
            reliability: Reliability::try_from(raw.reliability)?,
            history_kind: HistoryKind::try_from(raw.history_kind)?,
        })
    }
}
