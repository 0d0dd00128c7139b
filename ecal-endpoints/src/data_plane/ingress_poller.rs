//! Subscriber dispatch loop: polls the transport and hands messages to the output
//! channel.

use crate::control_plane::lifecycle::DispatchEndpoint;
use crate::error::Error;
use crate::event::EndpointEvent;
use crate::message::Message;
use crate::observability::{events, fields};
use crate::runtime::worker_runtime::StopSignal;
use crate::subscriber::SubscriberEndpoint;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, trace, warn};

const COMPONENT: &str = "ingress_poller";

/// Subscriber-side channel state that survives across runs.
pub(crate) struct SubscriberOutbox {
    pub(crate) sender: Sender<Message>,
    /// A received message the previous run could not hand off before stopping.
    pub(crate) carry: Option<Message>,
    scratch: Vec<u8>,
}

impl SubscriberOutbox {
    pub(crate) fn new(sender: Sender<Message>, buffer_capacity: usize) -> Self {
        Self {
            sender,
            carry: None,
            scratch: vec![0; buffer_capacity],
        }
    }
}

pub(crate) async fn message_polling_loop(
    endpoint: Arc<SubscriberEndpoint>,
    mut outbox: SubscriberOutbox,
    mut stop: StopSignal,
    worker_id: String,
) -> SubscriberOutbox {
    let topic = endpoint.topic();
    endpoint.events().report(EndpointEvent::WorkerStarted {
        worker_id: worker_id.clone(),
    });

    loop {
        if stop.is_requested() {
            break;
        }

        let message = match outbox.carry.take() {
            Some(message) => message,
            None => match endpoint.poll(&mut outbox.scratch) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(Error::NotRunning) | Err(Error::DestroyedEndpoint) => break,
                Err(err) => {
                    warn!(
                        event = events::SUBSCRIBER_OVERSIZED,
                        component = COMPONENT,
                        topic,
                        worker_id = %worker_id,
                        err = %err,
                        "dropping received data"
                    );
                    endpoint.events().report(EndpointEvent::DispatchFailed {
                        worker_id: worker_id.clone(),
                        error: err,
                    });
                    continue;
                }
            },
        };

        trace!(
            event = events::SUBSCRIBER_RECEIVE,
            component = COMPONENT,
            topic,
            worker_id = %worker_id,
            payload = %fields::format_payload(&message),
            timestamp = message.timestamp,
            "received message"
        );

        // The poll ran without the state lock; look again before handing off.
        if !endpoint.state_lock().is_running() {
            outbox.carry = Some(message);
            break;
        }

        tokio::select! {
            biased;
            _ = stop.requested() => {
                debug!(
                    event = events::SUBSCRIBER_MESSAGE_CARRIED,
                    component = COMPONENT,
                    topic,
                    worker_id = %worker_id,
                    "stopped while waiting for the consumer, keeping message for the next run"
                );
                outbox.carry = Some(message);
                break;
            }
            permit = outbox.sender.reserve() => match permit {
                Ok(permit) => {
                    let len = message.len();
                    permit.send(message);
                    debug!(
                        event = events::SUBSCRIBER_DELIVER_OK,
                        component = COMPONENT,
                        topic,
                        worker_id = %worker_id,
                        len,
                        "message delivered"
                    );
                }
                Err(_) => {
                    info!(
                        event = events::SUBSCRIBER_OUTPUT_CLOSED,
                        component = COMPONENT,
                        topic,
                        worker_id = %worker_id,
                        "output channel closed"
                    );
                    endpoint.events().report(EndpointEvent::ChannelClosed {
                        worker_id: worker_id.clone(),
                    });
                    break;
                }
            },
        }
    }

    debug!(
        event = events::WORKER_EXIT,
        component = COMPONENT,
        topic,
        worker_id = %worker_id,
        "left polling loop"
    );
    endpoint
        .events()
        .report(EndpointEvent::WorkerStopped { worker_id });
    outbox
}
