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

use ecal_endpoints::transport::EndpointHandle;
use ecal_endpoints::{
    Capability, EndpointEvent, EndpointState, Error, HistoryKind, Lifecycle, Message, Publisher,
    PublisherConfig, Qos, RawQos, Reliability,
};
use integration_test_utils::{init_logging, wait_until, RecordingTransport};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc::Sender;

const WAIT: Duration = Duration::from_secs(5);

fn recording_transport() -> Arc<RecordingTransport> {
    init_logging();
    Arc::new(RecordingTransport::new())
}

fn create_publisher(
    transport: &Arc<RecordingTransport>,
    topic: &str,
    auto_start: bool,
) -> (Publisher, Sender<Message>) {
    Publisher::create(transport.clone(), topic, "raw", "", auto_start).expect("create publisher")
}

fn drain_events(events: &mut Receiver<EndpointEvent>) -> Vec<EndpointEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn dispatch_errors(events: &[EndpointEvent]) -> Vec<Error> {
    events
        .iter()
        .filter_map(|event| match event {
            EndpointEvent::DispatchFailed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn started_publisher_sends_payload_and_timestamp_once() {
    let transport = recording_transport();
    let (publisher, input) = create_publisher(&transport, "t1", true);

    input
        .blocking_send(Message::new("abc", 42))
        .expect("queue message");
    assert!(wait_until(WAIT, || transport.sends().len() == 1));
    publisher.stop().expect("stop");

    let sends = transport.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].payload, b"abc");
    assert_eq!(sends[0].timestamp, 42);
}

#[test]
fn double_start_consumes_each_message_once() {
    let transport = recording_transport();
    let (publisher, input) = create_publisher(&transport, "t1", false);

    publisher.start().expect("first start");
    publisher.start().expect("second start");
    assert_eq!(publisher.state(), EndpointState::Running);

    for i in 0..20u8 {
        input
            .blocking_send(Message::new(vec![i], 0))
            .expect("queue message");
    }
    assert!(wait_until(WAIT, || transport.sends().len() >= 20));
    publisher.stop().expect("stop");

    let expected: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i]).collect();
    assert_eq!(transport.sent_payloads(), expected);
}

#[test]
fn stop_then_start_resumes_in_order_without_loss() {
    let transport = recording_transport();
    let config = PublisherConfig {
        channel_capacity: 8,
        ..PublisherConfig::new("t1", "raw")
    };
    let (publisher, input) =
        Publisher::from_config(transport.clone(), &config).expect("create publisher");

    input.blocking_send(Message::new("1", 0)).expect("queue 1");
    input.blocking_send(Message::new("2", 0)).expect("queue 2");
    assert!(wait_until(WAIT, || transport.sends().len() == 2));

    publisher.stop().expect("stop");
    assert!(publisher.is_stopped());
    for payload in ["3", "4", "5"] {
        input
            .blocking_send(Message::new(payload, 0))
            .expect("queue while stopped");
    }
    thread::sleep(Duration::from_millis(50));
    assert_eq!(transport.sends().len(), 2);

    publisher.start().expect("restart");
    assert!(wait_until(WAIT, || transport.sends().len() == 5));
    assert_eq!(
        transport.sent_payloads(),
        vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec(), b"4".to_vec(), b"5".to_vec()]
    );
}

#[test]
fn empty_payload_is_reported_and_loop_keeps_going() {
    let transport = recording_transport();
    let (publisher, input) = create_publisher(&transport, "t1", false);
    let mut events = publisher.subscribe_events();
    publisher.start().expect("start");

    input
        .blocking_send(Message::new(Vec::new(), 1))
        .expect("queue empty message");
    input
        .blocking_send(Message::new("next", 2))
        .expect("queue next message");
    assert!(wait_until(WAIT, || transport.sends().len() == 1));

    assert_eq!(transport.sent_payloads(), vec![b"next".to_vec()]);
    let errors = dispatch_errors(&drain_events(&mut events));
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::InvalidArgument(_)));
    assert!(errors[0].is_non_fatal());
}

#[test]
fn partial_send_is_reported_and_loop_keeps_going() {
    let transport = recording_transport();
    transport.short_write(1);
    let (publisher, input) = create_publisher(&transport, "t1", false);
    let mut events = publisher.subscribe_events();
    publisher.start().expect("start");

    input.blocking_send(Message::new("abc", 1)).expect("queue");
    input.blocking_send(Message::new("defg", 2)).expect("queue");
    assert!(wait_until(WAIT, || transport.sends().len() == 2));
    publisher.stop().expect("stop");

    assert_eq!(
        dispatch_errors(&drain_events(&mut events)),
        vec![
            Error::PartialSend {
                written: 2,
                expected: 3
            },
            Error::PartialSend {
                written: 3,
                expected: 4
            },
        ]
    );
}

#[test]
fn destroy_right_after_start_releases_once_without_send() {
    let transport = recording_transport();
    let (publisher, input) = create_publisher(&transport, "t1", false);
    let mut events = publisher.subscribe_events();

    publisher.start().expect("start");
    publisher.destroy().expect("destroy");

    assert_eq!(transport.destroys(), 1);
    assert_eq!(transport.live_handles(), 0);
    assert!(transport.sends().is_empty());
    assert!(input.blocking_send(Message::new("late", 0)).is_err());

    let events = drain_events(&mut events);
    let started = events
        .iter()
        .filter(|event| matches!(event, EndpointEvent::WorkerStarted { .. }))
        .count();
    let stopped = events
        .iter()
        .filter(|event| matches!(event, EndpointEvent::WorkerStopped { .. }))
        .count();
    assert_eq!((started, stopped), (1, 1));
    assert!(dispatch_errors(&events).is_empty());
}

#[test]
fn destroyed_publisher_rejects_calls_without_reaching_transport() {
    let transport = recording_transport();
    let (publisher, _input) = create_publisher(&transport, "t1", true);
    publisher.destroy().expect("destroy");
    let calls = transport.calls();

    assert_eq!(publisher.state(), EndpointState::Destroyed);
    assert!(publisher.is_destroyed());
    assert!(publisher.is_stopped());
    assert_eq!(publisher.start(), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.stop(), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.destroy(), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.qos(), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.set_qos(Qos::default()), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.set_description("d"), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.set_id(1), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.set_max_bandwidth(1), Err(Error::DestroyedEndpoint));
    assert_eq!(publisher.dump(), Err(Error::DestroyedEndpoint));
    assert_eq!(transport.calls(), calls);
    assert_eq!(transport.destroys(), 1);
}

#[test]
fn stop_on_created_publisher_keeps_it_created() {
    let transport = recording_transport();
    let (publisher, _input) = create_publisher(&transport, "t1", false);

    publisher.stop().expect("stop");
    assert_eq!(publisher.state(), EndpointState::Created);
    assert!(publisher.is_stopped());
}

#[test]
fn failed_release_can_be_retried() {
    let transport = recording_transport();
    let (publisher, _input) = create_publisher(&transport, "t1", true);

    transport.fail_destroy(true);
    assert!(matches!(
        publisher.destroy(),
        Err(Error::TransportError(_))
    ));
    assert_eq!(publisher.state(), EndpointState::Stopped);
    assert!(!publisher.is_destroyed());

    transport.fail_destroy(false);
    publisher.destroy().expect("retry destroy");
    assert!(publisher.is_destroyed());
    assert_eq!(transport.destroys(), 1);
}

#[test]
fn creation_failures_are_transport_unavailable() {
    let transport = recording_transport();
    transport.uninitialize(Capability::Publisher);
    assert!(matches!(
        Publisher::create(transport.clone(), "t1", "", "", true),
        Err(Error::TransportUnavailable(_))
    ));
    assert_eq!(transport.calls(), 0);

    let transport = recording_transport();
    transport.fail_create(true);
    assert!(matches!(
        Publisher::create(transport.clone(), "t1", "", "", true),
        Err(Error::TransportUnavailable(_))
    ));
    assert_eq!(transport.creates(), 0);
}

#[test]
fn qos_round_trips_and_unknown_values_surface() {
    let transport = recording_transport();
    let (publisher, _input) = create_publisher(&transport, "t1", false);

    for reliability in [Reliability::BestEffort, Reliability::Reliable] {
        for history_kind in [HistoryKind::KeepLast, HistoryKind::KeepAll] {
            let qos = Qos::new(reliability, history_kind);
            publisher.set_qos(qos).expect("set qos");
            assert_eq!(publisher.qos(), Ok(qos));
        }
    }

    transport.set_raw_qos(
        EndpointHandle::new(1),
        RawQos {
            reliability: 3,
            history_kind: 0,
        },
    );
    assert_eq!(
        publisher.qos(),
        Err(Error::UnsupportedPolicyValue {
            policy: "reliability",
            value: 3
        })
    );
}

#[test]
fn dropping_publisher_releases_handle() {
    let transport = recording_transport();
    let (publisher, _input) = create_publisher(&transport, "t1", true);
    drop(publisher);

    assert_eq!(transport.destroys(), 1);
    assert_eq!(transport.live_handles(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_returns_while_worker_waits_for_input() {
    let transport = recording_transport();
    let (publisher, input) = create_publisher(&transport, "t1", true);

    input
        .send(Message::new("only", 0))
        .await
        .expect("queue message");
    assert!(wait_until(WAIT, || transport.sends().len() == 1));

    let started = Instant::now();
    let publisher = tokio::time::timeout(
        WAIT,
        tokio::task::spawn_blocking(move || {
            publisher.stop().expect("stop");
            publisher
        }),
    )
    .await
    .expect("stop in time")
    .expect("join stop task");

    assert!(started.elapsed() < WAIT);
    assert!(publisher.is_stopped());
    drop(input);
}
