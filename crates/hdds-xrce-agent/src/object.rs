// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Proxy objects: the agent-side handle of each middleware entity.
//
// A proxy keeps its parent alive through an `Arc`, so a parent entity is
// never deleted from the middleware while a child still references it.
// Dropping the last handle deletes the middleware entity.
//
// The data reader lives in `datareader` since it also owns the read loop.

use std::sync::Arc;

use crate::error::XrceError;
use crate::middleware::Middleware;
use crate::types::{EntityId, ObjectKind, Representation};

/// Delete hook shared by every proxy's `Drop`.
pub(crate) fn release(kind: ObjectKind, id: EntityId, result: Result<(), XrceError>) {
    match result {
        Ok(()) => log::debug!("[object] {} {:#06x} released", kind, id),
        Err(e) => log::debug!("[object] {} {:#06x} release: {}", kind, id, e),
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

pub struct Participant {
    id: EntityId,
    domain_id: i16,
    middleware: Arc<dyn Middleware>,
}

impl Participant {
    pub fn create(
        id: EntityId,
        domain_id: i16,
        middleware: Arc<dyn Middleware>,
        representation: &Representation,
    ) -> Result<Arc<Self>, XrceError> {
        match representation {
            Representation::ByReference(r) => {
                middleware.create_participant_by_ref(id, domain_id, r)?
            }
            Representation::ByXml(xml) => middleware.create_participant_by_xml(id, domain_id, xml)?,
        }
        Ok(Arc::new(Self {
            id,
            domain_id,
            middleware,
        }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn domain_id(&self) -> i16 {
        self.domain_id
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        &self.middleware
    }

    /// Whether the entity matches the representation in `domain_id`.
    pub fn matched(&self, domain_id: i16, representation: &Representation) -> bool {
        match representation {
            Representation::ByReference(r) => {
                self.middleware
                    .matched_participant_from_ref(self.id, domain_id, r)
            }
            Representation::ByXml(xml) => {
                self.middleware
                    .matched_participant_from_xml(self.id, domain_id, xml)
            }
        }
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        release(
            ObjectKind::Participant,
            self.id,
            self.middleware.delete_participant(self.id),
        );
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

pub struct Topic {
    id: EntityId,
    participant: Arc<Participant>,
}

impl Topic {
    pub fn create(
        id: EntityId,
        participant: Arc<Participant>,
        representation: &Representation,
    ) -> Result<Arc<Self>, XrceError> {
        let middleware = participant.middleware();
        match representation {
            Representation::ByReference(r) => {
                middleware.create_topic_by_ref(id, participant.id(), r)?
            }
            Representation::ByXml(xml) => {
                middleware.create_topic_by_xml(id, participant.id(), xml)?
            }
        }
        Ok(Arc::new(Self { id, participant }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn participant(&self) -> &Arc<Participant> {
        &self.participant
    }

    pub fn matched(&self, representation: &Representation) -> bool {
        let middleware = self.participant.middleware();
        match representation {
            Representation::ByReference(r) => middleware.matched_topic_from_ref(self.id, r),
            Representation::ByXml(xml) => middleware.matched_topic_from_xml(self.id, xml),
        }
    }
}

impl Drop for Topic {
    fn drop(&mut self) {
        let result = self.participant.middleware().delete_topic(self.id);
        release(ObjectKind::Topic, self.id, result);
    }
}

// ---------------------------------------------------------------------------
// Publisher / Subscriber
// ---------------------------------------------------------------------------

pub struct Publisher {
    id: EntityId,
    participant: Arc<Participant>,
}

impl Publisher {
    pub fn create(
        id: EntityId,
        participant: Arc<Participant>,
        representation: &Representation,
    ) -> Result<Arc<Self>, XrceError> {
        let middleware = participant.middleware();
        match representation {
            Representation::ByReference(r) => {
                middleware.create_publisher_by_ref(id, participant.id(), r)?
            }
            Representation::ByXml(xml) => {
                middleware.create_publisher_by_xml(id, participant.id(), xml)?
            }
        }
        Ok(Arc::new(Self { id, participant }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn participant(&self) -> &Arc<Participant> {
        &self.participant
    }

    pub fn matched(&self, representation: &Representation) -> bool {
        let middleware = self.participant.middleware();
        match representation {
            Representation::ByReference(r) => middleware.matched_publisher_from_ref(self.id, r),
            Representation::ByXml(xml) => middleware.matched_publisher_from_xml(self.id, xml),
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        let result = self.participant.middleware().delete_publisher(self.id);
        release(ObjectKind::Publisher, self.id, result);
    }
}

pub struct Subscriber {
    id: EntityId,
    participant: Arc<Participant>,
}

impl Subscriber {
    pub fn create(
        id: EntityId,
        participant: Arc<Participant>,
        representation: &Representation,
    ) -> Result<Arc<Self>, XrceError> {
        let middleware = participant.middleware();
        match representation {
            Representation::ByReference(r) => {
                middleware.create_subscriber_by_ref(id, participant.id(), r)?
            }
            Representation::ByXml(xml) => {
                middleware.create_subscriber_by_xml(id, participant.id(), xml)?
            }
        }
        Ok(Arc::new(Self { id, participant }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn participant(&self) -> &Arc<Participant> {
        &self.participant
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        self.participant.middleware()
    }

    pub fn matched(&self, representation: &Representation) -> bool {
        let middleware = self.participant.middleware();
        match representation {
            Representation::ByReference(r) => middleware.matched_subscriber_from_ref(self.id, r),
            Representation::ByXml(xml) => middleware.matched_subscriber_from_xml(self.id, xml),
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let result = self.participant.middleware().delete_subscriber(self.id);
        release(ObjectKind::Subscriber, self.id, result);
    }
}

// ---------------------------------------------------------------------------
// DataWriter
// ---------------------------------------------------------------------------

pub struct DataWriter {
    id: EntityId,
    publisher: Arc<Publisher>,
    topic: Arc<Topic>,
}

impl DataWriter {
    /// Create the writer; `topic_lookup` maps the topic id reported by the
    /// middleware to its proxy.
    pub fn create(
        id: EntityId,
        publisher: Arc<Publisher>,
        representation: &Representation,
        topic_lookup: impl FnOnce(EntityId) -> Option<Arc<Topic>>,
    ) -> Result<Arc<Self>, XrceError> {
        let middleware = publisher.participant().middleware();
        let topic_id = match representation {
            Representation::ByReference(r) => {
                middleware.create_datawriter_by_ref(id, publisher.id(), r)?
            }
            Representation::ByXml(xml) => {
                middleware.create_datawriter_by_xml(id, publisher.id(), xml)?
            }
        };
        let Some(topic) = topic_lookup(topic_id) else {
            release(ObjectKind::DataWriter, id, middleware.delete_datawriter(id));
            return Err(XrceError::Unresolvable(format!(
                "datawriter {:#06x} is bound to unknown topic object {:#06x}",
                id, topic_id
            )));
        };
        Ok(Arc::new(Self {
            id,
            publisher,
            topic,
        }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    pub fn matched(&self, representation: &Representation) -> bool {
        let middleware = self.publisher.participant().middleware();
        match representation {
            Representation::ByReference(r) => middleware.matched_datawriter_from_ref(self.id, r),
            Representation::ByXml(xml) => middleware.matched_datawriter_from_xml(self.id, xml),
        }
    }

    /// Publish one serialized sample.
    pub fn write(&self, data: &[u8]) -> Result<(), XrceError> {
        self.publisher
            .participant()
            .middleware()
            .write_data(self.id, data)
    }
}

impl Drop for DataWriter {
    fn drop(&mut self) {
        let result = self
            .publisher
            .participant()
            .middleware()
            .delete_datawriter(self.id);
        release(ObjectKind::DataWriter, self.id, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::LocalMiddleware;

    const TOPIC_XML: &str =
        "<dds><topic><name>Square</name><dataType>ShapeType</dataType></topic></dds>";
    const WRITER_XML: &str = "<dds><data_writer><topic><name>Square</name>\
        <dataType>ShapeType</dataType></topic></data_writer></dds>";

    fn xml(s: &str) -> Representation {
        Representation::ByXml(s.to_string())
    }

    #[test]
    fn test_drop_deletes_entities_children_first() {
        let local = Arc::new(LocalMiddleware::new());
        let mw: Arc<dyn Middleware> = local.clone();

        let participant = Participant::create(1, 0, mw, &xml("<dds><participant/></dds>")).unwrap();
        let topic = Topic::create(2, Arc::clone(&participant), &xml(TOPIC_XML)).unwrap();
        let publisher = Publisher::create(3, Arc::clone(&participant), &xml("")).unwrap();
        let writer = DataWriter::create(5, Arc::clone(&publisher), &xml(WRITER_XML), |id| {
            (id == topic.id()).then(|| Arc::clone(&topic))
        })
        .unwrap();
        assert_eq!(writer.topic().id(), 2);
        writer.write(b"x").unwrap();

        // The writer still holds its parents.
        drop(participant);
        drop(topic);
        drop(publisher);
        assert_eq!(local.entity_count(ObjectKind::Participant), 1);
        assert_eq!(local.entity_count(ObjectKind::Topic), 1);

        drop(writer);
        for kind in [
            ObjectKind::Participant,
            ObjectKind::Topic,
            ObjectKind::Publisher,
            ObjectKind::DataWriter,
        ] {
            assert_eq!(local.entity_count(kind), 0, "{kind}");
        }
    }

    #[test]
    fn test_failed_create_leaves_nothing() {
        let local = Arc::new(LocalMiddleware::new());
        let mw: Arc<dyn Middleware> = local.clone();
        let participant = Participant::create(1, 0, mw, &xml("<dds><participant/></dds>")).unwrap();
        let _topic = Topic::create(2, Arc::clone(&participant), &xml(TOPIC_XML)).unwrap();
        let publisher = Publisher::create(3, Arc::clone(&participant), &xml("")).unwrap();

        assert!(matches!(
            Topic::create(2, Arc::clone(&participant), &xml(TOPIC_XML)),
            Err(XrceError::AlreadyExists { .. })
        ));
        // Topic exists in the middleware but the lookup does not know it.
        assert!(matches!(
            DataWriter::create(5, publisher, &xml(WRITER_XML), |_| None),
            Err(XrceError::Unresolvable(_))
        ));
        assert_eq!(local.entity_count(ObjectKind::DataWriter), 0);
        assert_eq!(local.entity_count(ObjectKind::Topic), 1);
    }

    #[test]
    fn test_matched_delegates() {
        let mw: Arc<dyn Middleware> = Arc::new(LocalMiddleware::new());
        let participant = Participant::create(1, 3, mw, &xml("<dds><participant/></dds>")).unwrap();
        let topic = Topic::create(2, Arc::clone(&participant), &xml(TOPIC_XML)).unwrap();

        assert!(participant.matched(3, &xml("<dds><participant/></dds>")));
        assert!(!participant.matched(4, &xml("<dds><participant/></dds>")));
        assert!(topic.matched(&xml(TOPIC_XML)));
        assert!(!topic.matched(&Representation::ByReference("nope".into())));
    }
}
