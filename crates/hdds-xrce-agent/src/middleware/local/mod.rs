// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process middleware backend.
//!
//! Holds one registry per entity kind, each behind its own `RwLock`:
//! creation and deletion take the write side, lookups (match, read, write)
//! the read side, so unrelated kinds never contend. Writers and readers
//! are routed through a per-domain loopback bus (see [`entities`]).
//!
//! Lock order when two registries are involved is always parent before
//! child: participant, topic, publisher, subscriber, datawriter, datareader.

mod entities;
mod registry;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::config::AgentConfig;
use crate::error::XrceError;
use crate::middleware::profiles::{
    from_optional_xml, DataReaderDescriptor, DataWriterDescriptor, Descriptor,
    EndpointDescriptor, ParticipantDescriptor, ProfileRepository, PublisherDescriptor,
    SubscriberDescriptor, TopicDescriptor,
};
use crate::middleware::Middleware;
use crate::types::{EntityId, ObjectKind};

use entities::{
    DomainBus, NativeDataReader, NativeDataWriter, NativeParticipant, NativePublisher,
    NativeSubscriber, NativeTopic,
};
use registry::Registry;

/// Loopback pub-sub backend: writers and readers of the same domain, topic
/// and partition exchange samples in memory.
pub struct LocalMiddleware {
    profiles: ProfileRepository,
    default_history_depth: usize,
    domains: Mutex<HashMap<i16, Weak<DomainBus>>>,
    participants: Registry<NativeParticipant>,
    topics: Registry<NativeTopic>,
    publishers: Registry<NativePublisher>,
    subscribers: Registry<NativeSubscriber>,
    datawriters: Registry<NativeDataWriter>,
    datareaders: Registry<NativeDataReader>,
}

impl Default for LocalMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalMiddleware {
    /// Backend without any pre-registered profile.
    pub fn new() -> Self {
        Self::with_profiles(ProfileRepository::new())
    }

    pub fn with_profiles(profiles: ProfileRepository) -> Self {
        Self {
            profiles,
            default_history_depth: AgentConfig::default().default_history_depth,
            domains: Mutex::new(HashMap::new()),
            participants: Registry::new(ObjectKind::Participant),
            topics: Registry::new(ObjectKind::Topic),
            publishers: Registry::new(ObjectKind::Publisher),
            subscribers: Registry::new(ObjectKind::Subscriber),
            datawriters: Registry::new(ObjectKind::DataWriter),
            datareaders: Registry::new(ObjectKind::DataReader),
        }
    }

    /// Backend configured from `config`, loading `profiles_path` when set.
    pub fn from_config(config: &AgentConfig) -> Result<Self, XrceError> {
        config.validate()?;
        let profiles = match &config.profiles_path {
            Some(path) => ProfileRepository::load_from_file(path)?,
            None => ProfileRepository::new(),
        };
        let mut middleware = Self::with_profiles(profiles);
        middleware.default_history_depth = config.default_history_depth;
        Ok(middleware)
    }

    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    /// Number of live entities of `kind`.
    pub fn entity_count(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Participant => self.participants.len(),
            ObjectKind::Topic => self.topics.len(),
            ObjectKind::Publisher => self.publishers.len(),
            ObjectKind::Subscriber => self.subscribers.len(),
            ObjectKind::DataWriter => self.datawriters.len(),
            ObjectKind::DataReader => self.datareaders.len(),
        }
    }

    /// Number of readers currently attached to the domain's bus.
    pub fn domain_reader_count(&self, domain_id: i16) -> usize {
        self.domains
            .lock()
            .get(&domain_id)
            .and_then(Weak::upgrade)
            .map_or(0, |bus| bus.live_readers())
    }

    /// Samples waiting in a reader's queue.
    pub fn pending_samples(&self, datareader_id: EntityId) -> Option<usize> {
        self.datareaders.with_entry(datareader_id, |r| r.queue.len())
    }

    fn bus(&self, domain_id: i16) -> Arc<DomainBus> {
        let mut domains = self.domains.lock();
        domains.retain(|_, bus| bus.strong_count() > 0);
        if let Some(bus) = domains.get(&domain_id).and_then(Weak::upgrade) {
            return bus;
        }
        let bus = Arc::new(DomainBus::new(domain_id));
        domains.insert(domain_id, Arc::downgrade(&bus));
        bus
    }

    // -----------------------------------------------------------------------
    // Creation (descriptor already resolved)
    // -----------------------------------------------------------------------

    fn create_participant(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        descriptor: ParticipantDescriptor,
    ) -> Result<(), XrceError> {
        self.participants.ensure_vacant(participant_id)?;
        let bus = self.bus(domain_id);
        let participant = Arc::new(NativeParticipant {
            domain_id,
            descriptor,
            bus,
        });
        self.participants.insert(participant_id, participant)?;
        log::info!(
            "[middleware] participant {:#06x} created in domain {}",
            participant_id,
            domain_id
        );
        Ok(())
    }

    fn create_topic(
        &self,
        topic_id: EntityId,
        participant_id: EntityId,
        descriptor: TopicDescriptor,
    ) -> Result<(), XrceError> {
        self.topics.ensure_vacant(topic_id)?;
        self.participants.get(participant_id)?;
        let name = descriptor.name.clone();
        let topic = Arc::new(NativeTopic {
            participant_id,
            descriptor,
        });
        self.topics
            .insert_unique_under(topic_id, topic, &self.participants, participant_id, |t| {
                t.participant_id == participant_id && t.descriptor.name == name
            })
            .inspect_err(|e| {
                if let XrceError::AlreadyExists { id, .. } = e {
                    if *id != topic_id {
                        log::warn!(
                            "[middleware] topic '{}' already registered as {:#06x}",
                            name,
                            id
                        );
                    }
                }
            })?;
        log::info!("[middleware] topic {:#06x} '{}' created", topic_id, name);
        Ok(())
    }

    fn create_publisher(
        &self,
        publisher_id: EntityId,
        participant_id: EntityId,
        descriptor: PublisherDescriptor,
    ) -> Result<(), XrceError> {
        self.publishers.ensure_vacant(publisher_id)?;
        let participant = self.participants.get(participant_id)?;
        let publisher = Arc::new(NativePublisher {
            participant_id,
            participant,
            descriptor,
        });
        self.publishers
            .insert_under(publisher_id, publisher, &self.participants, participant_id)?;
        log::info!("[middleware] publisher {:#06x} created", publisher_id);
        Ok(())
    }

    fn create_subscriber(
        &self,
        subscriber_id: EntityId,
        participant_id: EntityId,
        descriptor: SubscriberDescriptor,
    ) -> Result<(), XrceError> {
        self.subscribers.ensure_vacant(subscriber_id)?;
        let participant = self.participants.get(participant_id)?;
        let subscriber = Arc::new(NativeSubscriber {
            participant_id,
            participant,
            descriptor,
        });
        self.subscribers
            .insert_under(subscriber_id, subscriber, &self.participants, participant_id)?;
        log::info!("[middleware] subscriber {:#06x} created", subscriber_id);
        Ok(())
    }

    /// Topic named by an endpoint description, within `participant_id`.
    fn endpoint_topic(
        &self,
        participant_id: EntityId,
        endpoint: &EndpointDescriptor,
    ) -> Result<(EntityId, Arc<NativeTopic>), XrceError> {
        let (topic_id, topic) = self
            .topics
            .find(|t| {
                t.participant_id == participant_id && t.descriptor.name == endpoint.topic_name
            })
            .ok_or_else(|| {
                XrceError::Unresolvable(format!(
                    "topic '{}' is not registered in participant {:#06x}",
                    endpoint.topic_name, participant_id
                ))
            })?;
        if topic.descriptor.type_name != endpoint.type_name {
            return Err(XrceError::Unresolvable(format!(
                "topic '{}' has type '{}', endpoint expects '{}'",
                endpoint.topic_name, topic.descriptor.type_name, endpoint.type_name
            )));
        }
        Ok((topic_id, topic))
    }

    fn create_datawriter(
        &self,
        datawriter_id: EntityId,
        publisher_id: EntityId,
        descriptor: DataWriterDescriptor,
    ) -> Result<EntityId, XrceError> {
        self.datawriters.ensure_vacant(datawriter_id)?;
        let publisher = self.publishers.get(publisher_id)?;
        let (topic_id, topic) = self.endpoint_topic(publisher.participant_id, &descriptor.0)?;
        let writer = Arc::new(NativeDataWriter {
            topic,
            publisher,
            descriptor,
        });
        self.datawriters
            .insert_under(datawriter_id, writer, &self.publishers, publisher_id)?;
        log::info!(
            "[middleware] datawriter {:#06x} created on topic {:#06x}",
            datawriter_id,
            topic_id
        );
        Ok(topic_id)
    }

    fn create_datareader(
        &self,
        datareader_id: EntityId,
        subscriber_id: EntityId,
        descriptor: DataReaderDescriptor,
    ) -> Result<EntityId, XrceError> {
        self.datareaders.ensure_vacant(datareader_id)?;
        let subscriber = self.subscribers.get(subscriber_id)?;
        let (topic_id, topic) = self.endpoint_topic(subscriber.participant_id, &descriptor.0)?;
        let depth = descriptor
            .0
            .history_depth
            .unwrap_or(self.default_history_depth);
        let reader = Arc::new(NativeDataReader::attach(&topic, &subscriber, descriptor, depth));
        self.datareaders
            .insert_under(datareader_id, reader, &self.subscribers, subscriber_id)?;
        log::info!(
            "[middleware] datareader {:#06x} created on topic {:#06x} (domain {}, depth {})",
            datareader_id,
            topic_id,
            subscriber.participant.bus.domain_id(),
            depth
        );
        Ok(topic_id)
    }

    fn delete<T>(registry: &Registry<T>, id: EntityId) -> Result<(), XrceError> {
        registry.remove(id)?;
        log::info!("[middleware] {} {:#06x} deleted", registry.kind(), id);
        Ok(())
    }

    /// Compare the registered entity with a freshly resolved description.
    fn matched<T, D: Descriptor>(
        registry: &Registry<T>,
        id: EntityId,
        wanted: Result<D, XrceError>,
        same: impl FnOnce(&T, &D) -> bool,
    ) -> bool {
        match wanted {
            Ok(wanted) => registry.with_entry(id, |e| same(e, &wanted)).unwrap_or(false),
            Err(e) => {
                log::debug!("[middleware] match {} {:#06x}: {}", registry.kind(), id, e);
                false
            }
        }
    }
}

impl Middleware for LocalMiddleware {
    fn create_participant_by_ref(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        reference: &str,
    ) -> Result<(), XrceError> {
        let descriptor = self.profiles.resolve(reference)?;
        self.create_participant(participant_id, domain_id, descriptor)
    }

    fn create_participant_by_xml(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        xml: &str,
    ) -> Result<(), XrceError> {
        let descriptor = ParticipantDescriptor::from_xml(xml)?;
        self.create_participant(participant_id, domain_id, descriptor)
    }

    fn delete_participant(&self, participant_id: EntityId) -> Result<(), XrceError> {
        Self::delete(&self.participants, participant_id)
    }

    fn matched_participant_from_ref(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        reference: &str,
    ) -> bool {
        Self::matched(
            &self.participants,
            participant_id,
            self.profiles.resolve::<ParticipantDescriptor>(reference),
            |p, d| p.domain_id == domain_id && p.descriptor == *d,
        )
    }

    fn matched_participant_from_xml(
        &self,
        participant_id: EntityId,
        domain_id: i16,
        xml: &str,
    ) -> bool {
        Self::matched(
            &self.participants,
            participant_id,
            ParticipantDescriptor::from_xml(xml),
            |p, d| p.domain_id == domain_id && p.descriptor == *d,
        )
    }

    fn create_topic_by_ref(
        &self,
        topic_id: EntityId,
        participant_id: EntityId,
        reference: &str,
    ) -> Result<(), XrceError> {
        let descriptor = self.profiles.resolve(reference)?;
        self.create_topic(topic_id, participant_id, descriptor)
    }

    fn create_topic_by_xml(
        &self,
        topic_id: EntityId,
        participant_id: EntityId,
        xml: &str,
    ) -> Result<(), XrceError> {
        let descriptor = TopicDescriptor::from_xml(xml)?;
        self.create_topic(topic_id, participant_id, descriptor)
    }

    fn delete_topic(&self, topic_id: EntityId) -> Result<(), XrceError> {
        Self::delete(&self.topics, topic_id)
    }

    fn matched_topic_from_ref(&self, topic_id: EntityId, reference: &str) -> bool {
        Self::matched(
            &self.topics,
            topic_id,
            self.profiles.resolve::<TopicDescriptor>(reference),
            |t, d| t.descriptor == *d,
        )
    }

    fn matched_topic_from_xml(&self, topic_id: EntityId, xml: &str) -> bool {
        Self::matched(
            &self.topics,
            topic_id,
            TopicDescriptor::from_xml(xml),
            |t, d| t.descriptor == *d,
        )
    }

    fn create_publisher_by_ref(
        &self,
        publisher_id: EntityId,
        participant_id: EntityId,
        reference: &str,
    ) -> Result<(), XrceError> {
        let descriptor = self.profiles.resolve(reference)?;
        self.create_publisher(publisher_id, participant_id, descriptor)
    }

    fn create_publisher_by_xml(
        &self,
        publisher_id: EntityId,
        participant_id: EntityId,
        xml: &str,
    ) -> Result<(), XrceError> {
        let descriptor = from_optional_xml(xml)?;
        self.create_publisher(publisher_id, participant_id, descriptor)
    }

    fn delete_publisher(&self, publisher_id: EntityId) -> Result<(), XrceError> {
        Self::delete(&self.publishers, publisher_id)
    }

    fn matched_publisher_from_ref(&self, publisher_id: EntityId, reference: &str) -> bool {
        Self::matched(
            &self.publishers,
            publisher_id,
            self.profiles.resolve::<PublisherDescriptor>(reference),
            |p, d| p.descriptor == *d,
        )
    }

    fn matched_publisher_from_xml(&self, publisher_id: EntityId, xml: &str) -> bool {
        Self::matched(
            &self.publishers,
            publisher_id,
            from_optional_xml::<PublisherDescriptor>(xml),
            |p, d| p.descriptor == *d,
        )
    }

    fn create_subscriber_by_ref(
        &self,
        subscriber_id: EntityId,
        participant_id: EntityId,
        reference: &str,
    ) -> Result<(), XrceError> {
        let descriptor = self.profiles.resolve(reference)?;
        self.create_subscriber(subscriber_id, participant_id, descriptor)
    }

    fn create_subscriber_by_xml(
        &self,
        subscriber_id: EntityId,
        participant_id: EntityId,
        xml: &str,
    ) -> Result<(), XrceError> {
        let descriptor = from_optional_xml(xml)?;
        self.create_subscriber(subscriber_id, participant_id, descriptor)
    }

    fn delete_subscriber(&self, subscriber_id: EntityId) -> Result<(), XrceError> {
        Self::delete(&self.subscribers, subscriber_id)
    }

    fn matched_subscriber_from_ref(&self, subscriber_id: EntityId, reference: &str) -> bool {
        Self::matched(
            &self.subscribers,
            subscriber_id,
            self.profiles.resolve::<SubscriberDescriptor>(reference),
            |s, d| s.descriptor == *d,
        )
    }

    fn matched_subscriber_from_xml(&self, subscriber_id: EntityId, xml: &str) -> bool {
        Self::matched(
            &self.subscribers,
            subscriber_id,
            from_optional_xml::<SubscriberDescriptor>(xml),
            |s, d| s.descriptor == *d,
        )
    }

    fn create_datawriter_by_ref(
        &self,
        datawriter_id: EntityId,
        publisher_id: EntityId,
        reference: &str,
    ) -> Result<EntityId, XrceError> {
        let descriptor = self.profiles.resolve(reference)?;
        self.create_datawriter(datawriter_id, publisher_id, descriptor)
    }

    fn create_datawriter_by_xml(
        &self,
        datawriter_id: EntityId,
        publisher_id: EntityId,
        xml: &str,
    ) -> Result<EntityId, XrceError> {
        let descriptor = DataWriterDescriptor::from_xml(xml)?;
        self.create_datawriter(datawriter_id, publisher_id, descriptor)
    }

    fn delete_datawriter(&self, datawriter_id: EntityId) -> Result<(), XrceError> {
        Self::delete(&self.datawriters, datawriter_id)
    }

    fn matched_datawriter_from_ref(&self, datawriter_id: EntityId, reference: &str) -> bool {
        Self::matched(
            &self.datawriters,
            datawriter_id,
            self.profiles.resolve::<DataWriterDescriptor>(reference),
            |w, d| w.descriptor == *d,
        )
    }

    fn matched_datawriter_from_xml(&self, datawriter_id: EntityId, xml: &str) -> bool {
        Self::matched(
            &self.datawriters,
            datawriter_id,
            DataWriterDescriptor::from_xml(xml),
            |w, d| w.descriptor == *d,
        )
    }

    fn create_datareader_by_ref(
        &self,
        datareader_id: EntityId,
        subscriber_id: EntityId,
        reference: &str,
    ) -> Result<EntityId, XrceError> {
        let descriptor = self.profiles.resolve(reference)?;
        self.create_datareader(datareader_id, subscriber_id, descriptor)
    }

    fn create_datareader_by_xml(
        &self,
        datareader_id: EntityId,
        subscriber_id: EntityId,
        xml: &str,
    ) -> Result<EntityId, XrceError> {
        let descriptor = DataReaderDescriptor::from_xml(xml)?;
        self.create_datareader(datareader_id, subscriber_id, descriptor)
    }

    fn delete_datareader(&self, datareader_id: EntityId) -> Result<(), XrceError> {
        Self::delete(&self.datareaders, datareader_id)
    }

    fn matched_datareader_from_ref(&self, datareader_id: EntityId, reference: &str) -> bool {
        Self::matched(
            &self.datareaders,
            datareader_id,
            self.profiles.resolve::<DataReaderDescriptor>(reference),
            |r, d| r.descriptor == *d,
        )
    }

    fn matched_datareader_from_xml(&self, datareader_id: EntityId, xml: &str) -> bool {
        Self::matched(
            &self.datareaders,
            datareader_id,
            DataReaderDescriptor::from_xml(xml),
            |r, d| r.descriptor == *d,
        )
    }

    fn write_data(&self, datawriter_id: EntityId, data: &[u8]) -> Result<(), XrceError> {
        let writer = self.datawriters.get(datawriter_id)?;
        let delivered = writer.write(data);
        log::trace!(
            "[middleware] datawriter {:#06x} wrote {} bytes to {} reader(s)",
            datawriter_id,
            data.len(),
            delivered
        );
        Ok(())
    }

    fn read_data(&self, datareader_id: EntityId, timeout: Duration) -> Result<Vec<u8>, XrceError> {
        // Clone the handle so the registry lock is not held while waiting.
        let reader = self.datareaders.get(datareader_id)?;
        reader.queue.take(timeout).ok_or(XrceError::Timeout)
    }

    fn has_datareader(&self, datareader_id: EntityId) -> bool {
        self.datareaders.contains(datareader_id)
    }
}
