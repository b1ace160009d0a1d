// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Middleware contract - bridges the XRCE object model to a pub-sub engine.
//
// This is intentionally product-agnostic: any DDS (or DDS-like) engine can
// implement it. Entities are addressed by small per-kind ids chosen by the
// caller; the implementation owns the native entities behind them.

pub mod local;
pub mod profiles;

use std::time::Duration;

use crate::error::XrceError;
use crate::types::EntityId;

pub use local::LocalMiddleware;
pub use profiles::ProfileRepository;

/// Entity lifecycle and data transfer against a middleware backend.
///
/// Creation fails with `AlreadyExists` when the id is taken, `Unresolvable`
/// when the reference or XML cannot be turned into a description (or names a
/// topic that is missing or of another type), and `NotFound` when the parent
/// is missing.
/// Deletion never cascades: dependents must be deleted by the caller first.
/// Matching never mutates state and answers `false` for unknown ids.
pub trait Middleware: Send + Sync {
    // -- participant ------------------------------------------------------

    fn create_participant_by_ref(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        reference: &str,
    ) -> Result<(), XrceError>;

    fn create_participant_by_xml(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        xml: &str,
    ) -> Result<(), XrceError>;

    fn delete_participant(&self, participant_id: EntityId) -> Result<(), XrceError>;

    fn matched_participant_from_ref(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        reference: &str,
    ) -> bool;

    fn matched_participant_from_xml(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        xml: &str,
    ) -> bool;

    // -- topic ------------------------------------------------------------

    fn create_topic_by_ref(
        &self,
        topic_id: EntityId,
        participant_id: EntityId,
        reference: &str,
    ) -> Result<(), XrceError>;

    fn create_topic_by_xml(
        &self,
        topic_id: EntityId,
        participant_id: EntityId,
        xml: &str,
    ) -> Result<(), XrceError>;

    fn delete_topic(&self, topic_id: EntityId) -> Result<(), XrceError>;

    fn matched_topic_from_ref(&self, topic_id: EntityId, reference: &str) -> bool;

    fn matched_topic_from_xml(&self, topic_id: EntityId, xml: &str) -> bool;

    // -- publisher / subscriber -------------------------------------------

    fn create_publisher_by_ref(
        &self,
        publisher_id: EntityId,
        participant_id: EntityId,
        reference: &str,
    ) -> Result<(), XrceError>;

    fn create_publisher_by_xml(
        &self,
        publisher_id: EntityId,
        participant_id: EntityId,
        xml: &str,
    ) -> Result<(), XrceError>;

    fn delete_publisher(&self, publisher_id: EntityId) -> Result<(), XrceError>;

    fn matched_publisher_from_ref(&self, publisher_id: EntityId, reference: &str) -> bool;

    fn matched_publisher_from_xml(&self, publisher_id: EntityId, xml: &str) -> bool;

    fn create_subscriber_by_ref(
        &self,
        subscriber_id: EntityId,
        participant_id: EntityId,
        reference: &str,
    ) -> Result<(), XrceError>;

    fn create_subscriber_by_xml(
        &self,
        subscriber_id: EntityId,
        participant_id: EntityId,
        xml: &str,
    ) -> Result<(), XrceError>;

    fn delete_subscriber(&self, subscriber_id: EntityId) -> Result<(), XrceError>;

    fn matched_subscriber_from_ref(&self, subscriber_id: EntityId, reference: &str) -> bool;

    fn matched_subscriber_from_xml(&self, subscriber_id: EntityId, xml: &str) -> bool;

    // -- data writer / data reader ----------------------------------------

    /// Returns the id of the topic the new writer is bound to.
    fn create_datawriter_by_ref(
        &self,
        datawriter_id: EntityId,
        publisher_id: EntityId,
        reference: &str,
    ) -> Result<EntityId, XrceError>;

    /// Returns the id of the topic the new writer is bound to.
    fn create_datawriter_by_xml(
        &self,
        datawriter_id: EntityId,
        publisher_id: EntityId,
        xml: &str,
    ) -> Result<EntityId, XrceError>;

    fn delete_datawriter(&self, datawriter_id: EntityId) -> Result<(), XrceError>;

    fn matched_datawriter_from_ref(&self, datawriter_id: EntityId, reference: &str) -> bool;

    fn matched_datawriter_from_xml(&self, datawriter_id: EntityId, xml: &str) -> bool;

    /// Returns the id of the topic the new reader is bound to.
    fn create_datareader_by_ref(
        &self,
        datareader_id: EntityId,
        subscriber_id: EntityId,
        reference: &str,
    ) -> Result<EntityId, XrceError>;

    /// Returns the id of the topic the new reader is bound to.
    fn create_datareader_by_xml(
        &self,
        datareader_id: EntityId,
        subscriber_id: EntityId,
        xml: &str,
    ) -> Result<EntityId, XrceError>;

    fn delete_datareader(&self, datareader_id: EntityId) -> Result<(), XrceError>;

    fn matched_datareader_from_ref(&self, datareader_id: EntityId, reference: &str) -> bool;

    fn matched_datareader_from_xml(&self, datareader_id: EntityId, xml: &str) -> bool;

    // -- data -------------------------------------------------------------

    /// Publish one serialized sample through the writer.
    fn write_data(&self, datawriter_id: EntityId, data: &[u8]) -> Result<(), XrceError>;

    /// Wait up to `timeout` for one serialized sample from the reader.
    ///
    /// `XrceError::Timeout` is the normal "nothing arrived" outcome.
    fn read_data(&self, datareader_id: EntityId, timeout: Duration) -> Result<Vec<u8>, XrceError>;

    /// Whether a reader is registered under the id.
    fn has_datareader(&self, datareader_id: EntityId) -> bool;
}
