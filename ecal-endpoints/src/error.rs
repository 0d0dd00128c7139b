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

//! Error types shared by publishers, subscribers and transports.

use thiserror::Error;

/// Result type for endpoint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds reported by endpoint operations and dispatch workers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A caller-supplied parameter violates a precondition. Detected before any
    /// transport call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The endpoint has already been destroyed.
    #[error("endpoint already destroyed")]
    DestroyedEndpoint,

    /// The endpoint is not running.
    #[error("endpoint not running")]
    NotRunning,

    /// The transport could not allocate or register the endpoint, or is not
    /// initialized for the required capability.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A transport primitive reported failure.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The transport accepted fewer bytes than requested.
    #[error("partial send: {written} of {expected} bytes written")]
    PartialSend { written: usize, expected: usize },

    /// A receive reported more bytes than the pre-allocated buffer holds.
    #[error("oversized message: received {received} bytes, buffer holds {capacity}")]
    OversizedMessage { received: usize, capacity: usize },

    /// A policy value coming from the transport is outside the known set.
    #[error("unsupported {policy} value: {value}")]
    UnsupportedPolicyValue { policy: &'static str, value: i32 },
}

impl Error {
    pub(crate) fn empty_payload() -> Self {
        Error::InvalidArgument("message payload must not be empty".to_string())
    }

    /// Returns `true` for conditions a dispatch worker reports and then keeps going.
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            Error::PartialSend { .. }
                | Error::OversizedMessage { .. }
                | Error::InvalidArgument(_)
                | Error::NotRunning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display_includes_sizes() {
        let err = Error::PartialSend {
            written: 2,
            expected: 3,
        };
        assert_eq!(err.to_string(), "partial send: 2 of 3 bytes written");

        let err = Error::OversizedMessage {
            received: 10,
            capacity: 8,
        };
        assert_eq!(
            err.to_string(),
            "oversized message: received 10 bytes, buffer holds 8"
        );
    }

    #[test]
    fn destroyed_and_transport_failures_are_fatal_for_the_call() {
        assert!(!Error::DestroyedEndpoint.is_non_fatal());
        assert!(!Error::TransportError("release failed".into()).is_non_fatal());
        assert!(Error::empty_payload().is_non_fatal());
    }
}
