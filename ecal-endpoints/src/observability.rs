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

//! Stable event names and field formatting for `tracing` output.
//!
//! Every structured event emitted by this crate carries `event = <name>` with a
//! name from [`events`], so log-based checks can match on them.

pub mod events {
    pub const LIFECYCLE_CREATE: &str = "lifecycle_create";
    pub const LIFECYCLE_CREATE_FAILED: &str = "lifecycle_create_failed";
    pub const LIFECYCLE_START: &str = "lifecycle_start";
    pub const LIFECYCLE_STOP: &str = "lifecycle_stop";
    pub const LIFECYCLE_DESTROY: &str = "lifecycle_destroy";
    pub const LIFECYCLE_DESTROY_FAILED: &str = "lifecycle_destroy_failed";
    pub const LIFECYCLE_DROP_DESTROY_FAILED: &str = "lifecycle_drop_destroy_failed";

    pub const WORKER_SPAWN_FAILED: &str = "worker_spawn_failed";
    pub const WORKER_JOINED: &str = "worker_joined";
    pub const WORKER_LOST: &str = "worker_lost";
    pub const WORKER_EXIT: &str = "worker_exit";

    pub const PUBLISHER_SEND_ATTEMPT: &str = "publisher_send_attempt";
    pub const PUBLISHER_SEND_OK: &str = "publisher_send_ok";
    pub const PUBLISHER_SEND_FAILED: &str = "publisher_send_failed";
    pub const PUBLISHER_MESSAGE_CARRIED: &str = "publisher_message_carried";
    pub const PUBLISHER_INPUT_CLOSED: &str = "publisher_input_closed";

    pub const SUBSCRIBER_RECEIVE: &str = "subscriber_receive";
    pub const SUBSCRIBER_OVERSIZED: &str = "subscriber_oversized";
    pub const SUBSCRIBER_DELIVER_OK: &str = "subscriber_deliver_ok";
    pub const SUBSCRIBER_MESSAGE_CARRIED: &str = "subscriber_message_carried";
    pub const SUBSCRIBER_OUTPUT_CLOSED: &str = "subscriber_output_closed";

    pub const ACCESSOR_FAILED: &str = "accessor_failed";
}

pub mod fields {
    use crate::message::Message;

    /// Short human-readable form of a payload for debug logs.
    pub fn format_payload(message: &Message) -> String {
        const PREVIEW: usize = 16;
        let shown = &message.payload[..message.payload.len().min(PREVIEW)];
        let mut preview = String::with_capacity(shown.len() * 2);
        for byte in shown {
            preview.push_str(&format!("{byte:02x}"));
        }
        if message.payload.len() > PREVIEW {
            preview.push_str("..");
        }
        format!("{} bytes [{preview}]", message.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::fields::format_payload;
    use crate::message::Message;

    #[test]
    fn payload_preview_is_truncated() {
        let short = Message::new(vec![0xab, 0x01], 0);
        assert_eq!(format_payload(&short), "2 bytes [ab01]");

        let long = Message::new(vec![0u8; 20], 0);
        assert!(format_payload(&long).ends_with("..]"));
        assert!(format_payload(&long).starts_with("20 bytes"));
    }
}
