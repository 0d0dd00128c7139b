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

//! The `pb.People.Person` sample payload.

#[derive(Clone, PartialEq, prost::Message)]
pub struct Dog {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct House {
    #[prost(int32, tag = "1")]
    pub rooms: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Person {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(message, optional, tag = "4")]
    pub dog: Option<Dog>,
    #[prost(message, optional, tag = "5")]
    pub house: Option<House>,
}

impl Person {
    pub fn sample(id: i32) -> Self {
        Self {
            id,
            name: "Max".to_string(),
            email: "max@mail.net".to_string(),
            dog: Some(Dog {
                name: "Brandy".to_string(),
            }),
            house: Some(House { rooms: 4 }),
        }
    }
}
