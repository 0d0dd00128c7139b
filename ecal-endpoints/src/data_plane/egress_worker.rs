//! Publisher dispatch loop: drains the input channel into the transport.

use crate::control_plane::lifecycle::DispatchEndpoint;
use crate::error::Error;
use crate::event::EndpointEvent;
use crate::message::Message;
use crate::observability::{events, fields};
use crate::publisher::PublisherEndpoint;
use crate::runtime::worker_runtime::StopSignal;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

const COMPONENT: &str = "egress_worker";

/// Publisher-side channel state that survives across runs.
pub(crate) struct PublisherInbox {
    pub(crate) receiver: Receiver<Message>,
    /// A message taken off the channel during a run that ended before it could be
    /// forwarded. The next run forwards it first.
    pub(crate) carry: Option<Message>,
}

impl PublisherInbox {
    pub(crate) fn new(receiver: Receiver<Message>) -> Self {
        Self {
            receiver,
            carry: None,
        }
    }
}

pub(crate) async fn message_forwarding_loop(
    endpoint: Arc<PublisherEndpoint>,
    mut inbox: PublisherInbox,
    mut stop: StopSignal,
    worker_id: String,
) -> PublisherInbox {
    let topic = endpoint.topic();
    endpoint.events().report(EndpointEvent::WorkerStarted {
        worker_id: worker_id.clone(),
    });

    loop {
        if !endpoint.state_lock().is_running() {
            break;
        }

        let message = match inbox.carry.take() {
            Some(message) => message,
            None => {
                tokio::select! {
                    biased;
                    _ = stop.requested() => break,
                    next = inbox.receiver.recv() => match next {
                        Some(message) => message,
                        None => {
                            info!(
                                event = events::PUBLISHER_INPUT_CLOSED,
                                component = COMPONENT,
                                topic,
                                worker_id = %worker_id,
                                "input channel closed"
                            );
                            endpoint.events().report(EndpointEvent::ChannelClosed {
                                worker_id: worker_id.clone(),
                            });
                            break;
                        }
                    },
                }
            }
        };

        debug!(
            event = events::PUBLISHER_SEND_ATTEMPT,
            component = COMPONENT,
            topic,
            worker_id = %worker_id,
            payload = %fields::format_payload(&message),
            timestamp = message.timestamp,
            "attempting send"
        );

        match endpoint.send(&message) {
            Ok(written) => {
                debug!(
                    event = events::PUBLISHER_SEND_OK,
                    component = COMPONENT,
                    topic,
                    worker_id = %worker_id,
                    written,
                    "send succeeded"
                );
            }
            Err(Error::NotRunning) | Err(Error::DestroyedEndpoint) => {
                debug!(
                    event = events::PUBLISHER_MESSAGE_CARRIED,
                    component = COMPONENT,
                    topic,
                    worker_id = %worker_id,
                    "endpoint stopped before send, keeping message for the next run"
                );
                inbox.carry = Some(message);
                break;
            }
            Err(err) => {
                warn!(
                    event = events::PUBLISHER_SEND_FAILED,
                    component = COMPONENT,
                    topic,
                    worker_id = %worker_id,
                    err = %err,
                    "send failed"
                );
                endpoint.events().report(EndpointEvent::DispatchFailed {
                    worker_id: worker_id.clone(),
                    error: err,
                });
            }
        }
    }

    debug!(
        event = events::WORKER_EXIT,
        component = COMPONENT,
        topic,
        worker_id = %worker_id,
        "left forwarding loop"
    );
    endpoint
        .events()
        .report(EndpointEvent::WorkerStopped { worker_id });
    inbox
}
