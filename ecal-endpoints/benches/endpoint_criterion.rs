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

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ecal_endpoints::transport::loopback::LoopbackTransport;
use ecal_endpoints::{
    Capability, HistoryKind, Lifecycle, Message, Publisher, Qos, Reliability, Subscriber,
};
use integration_test_utils::RecordingTransport;
use std::sync::Arc;

fn bench_loopback_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("loopback_round_trip");

    for &size in &[16usize, 1024, 64 * 1024] {
        let transport = Arc::new(LoopbackTransport::new());
        transport
            .initialize(
                "endpoint-criterion",
                &[Capability::Publisher, Capability::Subscriber],
            )
            .expect("initialize loopback");

        let (subscriber, mut output) =
            Subscriber::create(transport.clone(), "bench", "raw", "", false, size)
                .expect("subscriber");
        subscriber
            .set_qos(Qos::new(Reliability::Reliable, HistoryKind::KeepAll))
            .expect("set qos");
        subscriber.start().expect("start subscriber");
        let (publisher, input) =
            Publisher::create(transport, "bench", "raw", "", true).expect("publisher");

        let payload = vec![0x5a; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                input
                    .blocking_send(Message::new(payload.clone(), 1))
                    .expect("queue message");
                black_box(output.blocking_recv().expect("message"));
            })
        });

        publisher.destroy().expect("destroy publisher");
        subscriber.destroy().expect("destroy subscriber");
    }
    group.finish();
}

fn bench_lifecycle_cycle(c: &mut Criterion) {
    let transport = Arc::new(RecordingTransport::new());
    let (publisher, _input) =
        Publisher::create(transport, "bench", "raw", "", false).expect("publisher");

    c.bench_function("publisher_start_stop", |b| {
        b.iter(|| {
            publisher.start().expect("start");
            publisher.stop().expect("stop");
        })
    });
}

criterion_group!(benches, bench_loopback_round_trip, bench_lifecycle_cycle);
criterion_main!(benches);
