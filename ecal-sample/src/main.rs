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

//! Sample programs exchanging messages over the in-process loopback transport.
//!
//! `minimal` sends strings on `Hello`, `person` sends protobuf-encoded
//! `pb.People.Person` values on `person`. Each run brings up one publisher and one
//! subscriber in the same process.

mod person;

use clap::{Args, Parser, Subcommand};
use ecal_endpoints::transport::loopback::LoopbackTransport;
use ecal_endpoints::{
    Capability, EndpointsConfig, Lifecycle, Message, Publisher, PublisherConfig, Subscriber,
    SubscriberConfig,
};
use person::Person;
use prost::Message as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SEND_TIMEOUT: Duration = Duration::from_secs(1);
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "ecal-sample")]
#[command(about = "Publish/subscribe sample over the loopback transport")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Exchange "Hello World" strings on topic "Hello".
    Minimal(RunArgs),
    /// Exchange protobuf-encoded persons on topic "person".
    Person(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Number of messages to send.
    #[arg(long, default_value_t = 10)]
    count: u32,
    /// Pause between two sends, in milliseconds.
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,
    /// JSON file with one publisher and one subscriber entry overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

struct SampleTopic {
    name: &'static str,
    topic: &'static str,
    type_name: &'static str,
}

const MINIMAL: SampleTopic = SampleTopic {
    name: "minimal",
    topic: "Hello",
    type_name: "base:std::string",
};

const PERSON: SampleTopic = SampleTopic {
    name: "person",
    topic: "person",
    type_name: "proto:pb.People.Person",
};

fn endpoint_configs(
    sample: &SampleTopic,
    args: &RunArgs,
) -> ecal_endpoints::Result<(PublisherConfig, SubscriberConfig)> {
    let defaults = (
        PublisherConfig::new(sample.topic, sample.type_name),
        SubscriberConfig::new(sample.topic, sample.type_name, 1024),
    );
    let Some(path) = &args.config else {
        return Ok(defaults);
    };

    let mut config = EndpointsConfig::from_json_file(path)?;
    let publisher = config.publishers.drain(..).next().unwrap_or(defaults.0);
    let subscriber = config.subscribers.drain(..).next().unwrap_or(defaults.1);
    Ok((publisher, subscriber))
}

fn encode(sample: &SampleTopic, count: u32) -> Message {
    if sample.name == PERSON.name {
        let id = i32::try_from(count).unwrap_or(i32::MAX);
        Message::now(Person::sample(id).encode_to_vec())
    } else {
        Message::now(format!("Hello World from Rust ({count})"))
    }
}

fn describe(sample: &SampleTopic, message: &Message) -> String {
    if sample.name == PERSON.name {
        match Person::decode(message.payload.clone()) {
            Ok(person) => format!("{person:?}"),
            Err(err) => format!("<undecodable person: {err}>"),
        }
    } else {
        String::from_utf8_lossy(&message.payload).into_owned()
    }
}

async fn send_loop(sample: &SampleTopic, input: Sender<Message>, args: &RunArgs) {
    for count in 0..args.count {
        let message = encode(sample, count);
        match timeout(SEND_TIMEOUT, input.send(message)).await {
            Ok(Ok(())) => info!(sample = sample.name, count, "sent message"),
            Ok(Err(_)) => {
                warn!(sample = sample.name, "publisher input closed");
                return;
            }
            Err(_) => warn!(sample = sample.name, count, "publisher busy, message skipped"),
        }
        sleep(Duration::from_millis(args.interval_ms)).await;
    }
}

async fn receive_loop(sample: &SampleTopic, mut output: Receiver<Message>, expected: u32) -> u32 {
    let mut received = 0;
    while received < expected {
        match timeout(RECEIVE_TIMEOUT, output.recv()).await {
            Ok(Some(message)) => {
                received += 1;
                info!(
                    sample = sample.name,
                    timestamp = message.timestamp,
                    "received \"{}\"",
                    describe(sample, &message)
                );
            }
            Ok(None) => break,
            Err(_) => warn!(sample = sample.name, received, "nothing received within a second"),
        }
    }
    received
}

async fn run(sample: &'static SampleTopic, args: RunArgs) -> ecal_endpoints::Result<u32> {
    let transport = Arc::new(LoopbackTransport::new());
    transport.initialize(
        &format!("ecal_sample_{}", sample.name),
        &[Capability::Publisher, Capability::Subscriber],
    )?;

    let (publisher_config, subscriber_config) = endpoint_configs(sample, &args)?;
    let (subscriber, output) = Subscriber::from_config(transport.clone(), &subscriber_config)?;
    let (publisher, input) = Publisher::from_config(transport.clone(), &publisher_config)?;
    info!(
        sample = sample.name,
        topic = publisher.topic(),
        type_name = publisher.type_name(),
        "endpoints up"
    );

    let expected = args.count;
    let receiver = tokio::spawn(receive_loop(sample, output, expected));
    tokio::select! {
        _ = send_loop(sample, input, &args) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    let received = match timeout(RECEIVE_TIMEOUT * 2, receiver).await {
        Ok(Ok(received)) => received,
        Ok(Err(err)) => {
            error!(err = %err, "receiver task failed");
            0
        }
        Err(_) => {
            warn!("receiver still waiting, shutting down");
            0
        }
    };

    tokio::task::spawn_blocking(move || -> ecal_endpoints::Result<()> {
        publisher.destroy()?;
        subscriber.destroy()?;
        transport.finalize(&[Capability::Publisher, Capability::Subscriber])
    })
    .await
    .map_err(|err| ecal_endpoints::Error::TransportError(err.to_string()))??;

    Ok(received)
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ecal_sample=info,ecal_endpoints=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let (sample, args) = match cli.mode {
        Mode::Minimal(args) => (&MINIMAL, args),
        Mode::Person(args) => (&PERSON, args),
    };
    let expected = args.count;

    match run(sample, args).await {
        Ok(received) if received == expected => ExitCode::SUCCESS,
        Ok(received) => {
            warn!(sample = sample.name, received, expected, "messages missing");
            ExitCode::from(1)
        }
        Err(err) => {
            error!(sample = sample.name, err = %err, "sample failed");
            ExitCode::from(2)
        }
    }
}
