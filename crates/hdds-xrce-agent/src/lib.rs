// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS-XRCE agent object layer.
//!
//! Creates, reuses and destroys the middleware entities that XRCE clients
//! ask for, and serves their read requests asynchronously: a read returns
//! at once, and samples are pushed to a callback from a per-reader worker
//! until the request's delivery bounds or its max-duration timer end it.
//!
//! # Architecture
//!
//! ```text
//! protocol layer              this crate                            middleware
//!      |                           |                                     |
//!      |-- CREATE(object) ------->| ProxyClient::create_object ---------->| create_*_by_ref / _by_xml
//!      |-- WRITE_DATA ----------->| ProxyClient::write ------------------>| write_data
//!      |-- READ_DATA ------------>| DataReader::read (returns at once)    |
//!      |                           |   worker: read_data (20ms) loop ---->| read_data
//!      |<-- callback(ctx, bytes) --|<- sample                            |
//!      |                           |   MaxTimer expiry -> stop flag       |
//!      |-- DELETE --------------->| ProxyClient::delete_object (cascade)->| delete_*
//! ```
//!
//! # Key Features
//!
//! - **Middleware-agnostic**: any engine can be plugged in via [`Middleware`]
//! - **Loopback backend**: [`LocalMiddleware`] routes samples in-process by
//!   domain, topic and partition
//! - **Profiles**: entities created by reference resolve against XML
//!   profiles ([`ProfileRepository`])
//! - **Bounded reads**: sample budget, max elapsed time, pacing and
//!   bandwidth limits per request ([`DeliveryControl`])
//! - **Stop barrier**: no callback runs after [`DataReader::stop_read`]
//!   returns

pub mod client;
pub mod config;
pub mod datareader;
pub mod error;
pub mod middleware;
pub mod object;
pub mod timer;
pub mod types;

// Re-exports for convenience.
pub use client::{CreateOutcome, CreationMode, ObjectVariant, ProxyClient};
pub use config::{AgentConfig, RestartPolicy};
pub use datareader::{DataReader, ReaderSettings};
pub use error::{StatusCode, XrceError};
pub use middleware::profiles::{
    DataReaderDescriptor, DataWriterDescriptor, Descriptor, DurabilityKind, EndpointDescriptor,
    ParticipantDescriptor, PublisherDescriptor, ReliabilityKind, SubscriberDescriptor,
    TopicDescriptor,
};
pub use middleware::{LocalMiddleware, Middleware, ProfileRepository};
pub use object::{DataWriter, Participant, Publisher, Subscriber, Topic};
pub use timer::{MaxTimeoutHandler, MaxTimer, TimerService, TimerStatus};
pub use types::{
    CallbackContext, DeliveryControl, EntityId, ObjectKind, ReadCallback, Representation,
    MAX_SAMPLES_UNLIMITED,
};
