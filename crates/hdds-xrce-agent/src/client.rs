// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Per-client proxy object tables.
//
// Each connected XRCE client owns one `ProxyClient`: the objects it created,
// indexed per kind by object id, plus one timer thread shared by all of its
// readers. Creation follows the DDS-XRCE reuse/replace creation modes, and
// deletion cascades down the object tree.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::datareader::{DataReader, ReaderSettings};
use crate::error::{StatusCode, XrceError};
use crate::middleware::Middleware;
use crate::object::{DataWriter, Participant, Publisher, Subscriber, Topic};
use crate::timer::TimerService;
use crate::types::{
    CallbackContext, DeliveryControl, EntityId, ObjectKind, ReadCallback, Representation,
};

// CREATE submessage flags carrying the creation mode.
pub const FLAG_REUSE: u8 = 0x02;
pub const FLAG_REPLACE: u8 = 0x04;

/// What CREATE does when the object id is already in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreationMode {
    /// Keep the existing object if it matches the request.
    pub reuse: bool,
    /// Delete the existing object and create a new one.
    pub replace: bool,
}

impl CreationMode {
    pub const fn new(reuse: bool, replace: bool) -> Self {
        Self { reuse, replace }
    }

    pub fn from_flags(flags: u8) -> Self {
        Self {
            reuse: flags & FLAG_REUSE != 0,
            replace: flags & FLAG_REPLACE != 0,
        }
    }
}

/// Kind-specific part of a creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectVariant {
    Participant {
        domain_id: i16,
        representation: Representation,
    },
    Topic {
        participant_id: EntityId,
        representation: Representation,
    },
    Publisher {
        participant_id: EntityId,
        representation: Representation,
    },
    Subscriber {
        participant_id: EntityId,
        representation: Representation,
    },
    DataWriter {
        publisher_id: EntityId,
        representation: Representation,
    },
    DataReader {
        subscriber_id: EntityId,
        representation: Representation,
    },
}

impl ObjectVariant {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Participant { .. } => ObjectKind::Participant,
            Self::Topic { .. } => ObjectKind::Topic,
            Self::Publisher { .. } => ObjectKind::Publisher,
            Self::Subscriber { .. } => ObjectKind::Subscriber,
            Self::DataWriter { .. } => ObjectKind::DataWriter,
            Self::DataReader { .. } => ObjectKind::DataReader,
        }
    }
}

/// Successful CREATE result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new entity was created.
    Created,
    /// An existing, matching entity was kept.
    Matched,
}

impl CreateOutcome {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Created => StatusCode::Ok,
            Self::Matched => StatusCode::OkMatched,
        }
    }
}

// ---------------------------------------------------------------------------
// Object tables
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ObjectTables {
    participants: HashMap<EntityId, Arc<Participant>>,
    topics: HashMap<EntityId, Arc<Topic>>,
    publishers: HashMap<EntityId, Arc<Publisher>>,
    subscribers: HashMap<EntityId, Arc<Subscriber>>,
    datawriters: HashMap<EntityId, Arc<DataWriter>>,
    datareaders: HashMap<EntityId, Arc<DataReader>>,
}

/// Objects removed from the tables; dropped deepest first.
#[derive(Default)]
struct Detached {
    datareaders: Vec<Arc<DataReader>>,
    datawriters: Vec<Arc<DataWriter>>,
    subscribers: Vec<Arc<Subscriber>>,
    publishers: Vec<Arc<Publisher>>,
    topics: Vec<Arc<Topic>>,
    participants: Vec<Arc<Participant>>,
}

impl Detached {
    fn len(&self) -> usize {
        self.datareaders.len()
            + self.datawriters.len()
            + self.subscribers.len()
            + self.publishers.len()
            + self.topics.len()
            + self.participants.len()
    }
}

fn drain_where<T>(
    map: &mut HashMap<EntityId, Arc<T>>,
    pred: impl Fn(&T) -> bool,
) -> Vec<Arc<T>> {
    let ids: Vec<EntityId> = map
        .iter()
        .filter(|(_, v)| pred(v))
        .map(|(&id, _)| id)
        .collect();
    ids.iter().filter_map(|id| map.remove(id)).collect()
}

fn parent<T>(
    map: &HashMap<EntityId, Arc<T>>,
    kind: ObjectKind,
    id: EntityId,
) -> Result<Arc<T>, XrceError> {
    map.get(&id)
        .cloned()
        .ok_or(XrceError::NotFound { kind, id })
}

impl ObjectTables {
    fn contains(&self, kind: ObjectKind, id: EntityId) -> bool {
        match kind {
            ObjectKind::Participant => self.participants.contains_key(&id),
            ObjectKind::Topic => self.topics.contains_key(&id),
            ObjectKind::Publisher => self.publishers.contains_key(&id),
            ObjectKind::Subscriber => self.subscribers.contains_key(&id),
            ObjectKind::DataWriter => self.datawriters.contains_key(&id),
            ObjectKind::DataReader => self.datareaders.contains_key(&id),
        }
    }

    fn len(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Participant => self.participants.len(),
            ObjectKind::Topic => self.topics.len(),
            ObjectKind::Publisher => self.publishers.len(),
            ObjectKind::Subscriber => self.subscribers.len(),
            ObjectKind::DataWriter => self.datawriters.len(),
            ObjectKind::DataReader => self.datareaders.len(),
        }
    }

    /// Whether the existing object has the same parent and description.
    fn matches(&self, id: EntityId, variant: &ObjectVariant) -> bool {
        match variant {
            ObjectVariant::Participant {
                domain_id,
                representation,
            } => self
                .participants
                .get(&id)
                .is_some_and(|p| p.matched(*domain_id, representation)),
            ObjectVariant::Topic {
                participant_id,
                representation,
            } => self.topics.get(&id).is_some_and(|t| {
                t.participant().id() == *participant_id && t.matched(representation)
            }),
            ObjectVariant::Publisher {
                participant_id,
                representation,
            } => self.publishers.get(&id).is_some_and(|p| {
                p.participant().id() == *participant_id && p.matched(representation)
            }),
            ObjectVariant::Subscriber {
                participant_id,
                representation,
            } => self.subscribers.get(&id).is_some_and(|s| {
                s.participant().id() == *participant_id && s.matched(representation)
            }),
            ObjectVariant::DataWriter {
                publisher_id,
                representation,
            } => self.datawriters.get(&id).is_some_and(|w| {
                w.publisher().id() == *publisher_id && w.matched(representation)
            }),
            ObjectVariant::DataReader {
                subscriber_id,
                representation,
            } => self.datareaders.get(&id).is_some_and(|r| {
                r.subscriber().id() == *subscriber_id && r.matched(representation)
            }),
        }
    }

    /// Remove the object and everything that depends on it.
    fn detach(&mut self, kind: ObjectKind, id: EntityId) -> Detached {
        let mut out = Detached::default();
        match kind {
            ObjectKind::Participant => {
                out.datareaders =
                    drain_where(&mut self.datareaders, |r| r.subscriber().participant().id() == id);
                out.datawriters =
                    drain_where(&mut self.datawriters, |w| w.publisher().participant().id() == id);
                out.subscribers =
                    drain_where(&mut self.subscribers, |s| s.participant().id() == id);
                out.publishers = drain_where(&mut self.publishers, |p| p.participant().id() == id);
                out.topics = drain_where(&mut self.topics, |t| t.participant().id() == id);
                out.participants.extend(self.participants.remove(&id));
            }
            ObjectKind::Topic => {
                out.datareaders = drain_where(&mut self.datareaders, |r| r.topic().id() == id);
                out.datawriters = drain_where(&mut self.datawriters, |w| w.topic().id() == id);
                out.topics.extend(self.topics.remove(&id));
            }
            ObjectKind::Publisher => {
                out.datawriters = drain_where(&mut self.datawriters, |w| w.publisher().id() == id);
                out.publishers.extend(self.publishers.remove(&id));
            }
            ObjectKind::Subscriber => {
                out.datareaders = drain_where(&mut self.datareaders, |r| r.subscriber().id() == id);
                out.subscribers.extend(self.subscribers.remove(&id));
            }
            ObjectKind::DataWriter => {
                out.datawriters.extend(self.datawriters.remove(&id));
            }
            ObjectKind::DataReader => {
                out.datareaders.extend(self.datareaders.remove(&id));
            }
        }
        out
    }

    fn detach_all(&mut self) -> Detached {
        fn values<T>(map: &mut HashMap<EntityId, Arc<T>>) -> Vec<Arc<T>> {
            map.drain().map(|(_, v)| v).collect()
        }
        Detached {
            datareaders: values(&mut self.datareaders),
            datawriters: values(&mut self.datawriters),
            subscribers: values(&mut self.subscribers),
            publishers: values(&mut self.publishers),
            topics: values(&mut self.topics),
            participants: values(&mut self.participants),
        }
    }
}

// ---------------------------------------------------------------------------
// Proxy client
// ---------------------------------------------------------------------------

/// Objects of one XRCE client, backed by a shared middleware.
pub struct ProxyClient {
    client_key: [u8; 4],
    session_id: u8,
    middleware: Arc<dyn Middleware>,
    reader_settings: ReaderSettings,
    objects: Mutex<ObjectTables>,
}

impl ProxyClient {
    pub fn new(
        client_key: [u8; 4],
        session_id: u8,
        middleware: Arc<dyn Middleware>,
        config: &AgentConfig,
    ) -> Result<Self, XrceError> {
        config.validate()?;
        let timers = TimerService::spawn(&config.timer_thread_name)?;
        Ok(Self {
            client_key,
            session_id,
            middleware,
            reader_settings: ReaderSettings::from_config(config).with_timer_service(timers),
            objects: Mutex::new(ObjectTables::default()),
        })
    }

    pub fn client_key(&self) -> [u8; 4] {
        self.client_key
    }

    pub fn session_id(&self) -> u8 {
        self.session_id
    }

    /// Context for samples answering `request_id` on `stream_id`.
    pub fn callback_context(
        &self,
        datareader_id: EntityId,
        stream_id: u8,
        request_id: u16,
    ) -> CallbackContext {
        CallbackContext {
            client_key: self.client_key,
            stream_id,
            object_id: datareader_id,
            request_id,
        }
    }

    /// Create (or reuse, or replace) object `object_id`.
    pub fn create_object(
        &self,
        object_id: EntityId,
        mode: CreationMode,
        variant: ObjectVariant,
    ) -> Result<CreateOutcome, XrceError> {
        let kind = variant.kind();
        let replaced = {
            let mut objects = self.objects.lock();
            if !objects.contains(kind, object_id) {
                return self
                    .create_new(&mut objects, object_id, &variant)
                    .map(|()| CreateOutcome::Created);
            }
            if mode.reuse && objects.matches(object_id, &variant) {
                log::debug!("[client] {} {:#06x} reused", kind, object_id);
                return Ok(CreateOutcome::Matched);
            }
            if !mode.replace {
                log::warn!("[client] {} {:#06x} already exists", kind, object_id);
                return Err(if mode.reuse {
                    XrceError::Mismatch {
                        kind,
                        id: object_id,
                    }
                } else {
                    XrceError::AlreadyExists {
                        kind,
                        id: object_id,
                    }
                });
            }
            objects.detach(kind, object_id)
        };

        // Readers join their workers on drop; keep the table unlocked meanwhile.
        log::info!(
            "[client] replacing {} {:#06x} ({} object(s) removed)",
            kind,
            object_id,
            replaced.len()
        );
        drop(replaced);

        let mut objects = self.objects.lock();
        if objects.contains(kind, object_id) {
            return Err(XrceError::AlreadyExists {
                kind,
                id: object_id,
            });
        }
        self.create_new(&mut objects, object_id, &variant)
            .map(|()| CreateOutcome::Created)
    }

    fn create_new(
        &self,
        objects: &mut ObjectTables,
        id: EntityId,
        variant: &ObjectVariant,
    ) -> Result<(), XrceError> {
        match variant {
            ObjectVariant::Participant {
                domain_id,
                representation,
            } => {
                let participant = Participant::create(
                    id,
                    *domain_id,
                    Arc::clone(&self.middleware),
                    representation,
                )?;
                objects.participants.insert(id, participant);
            }
            ObjectVariant::Topic {
                participant_id,
                representation,
            } => {
                let participant =
                    parent(&objects.participants, ObjectKind::Participant, *participant_id)?;
                let topic = Topic::create(id, participant, representation)?;
                objects.topics.insert(id, topic);
            }
            ObjectVariant::Publisher {
                participant_id,
                representation,
            } => {
                let participant =
                    parent(&objects.participants, ObjectKind::Participant, *participant_id)?;
                let publisher = Publisher::create(id, participant, representation)?;
                objects.publishers.insert(id, publisher);
            }
            ObjectVariant::Subscriber {
                participant_id,
                representation,
            } => {
                let participant =
                    parent(&objects.participants, ObjectKind::Participant, *participant_id)?;
                let subscriber = Subscriber::create(id, participant, representation)?;
                objects.subscribers.insert(id, subscriber);
            }
            ObjectVariant::DataWriter {
                publisher_id,
                representation,
            } => {
                let publisher = parent(&objects.publishers, ObjectKind::Publisher, *publisher_id)?;
                let topics = &objects.topics;
                let writer = DataWriter::create(id, publisher, representation, |topic_id| {
                    topics.get(&topic_id).cloned()
                })?;
                objects.datawriters.insert(id, writer);
            }
            ObjectVariant::DataReader {
                subscriber_id,
                representation,
            } => {
                let subscriber =
                    parent(&objects.subscribers, ObjectKind::Subscriber, *subscriber_id)?;
                let topics = &objects.topics;
                let reader = DataReader::create_with_settings(
                    id,
                    subscriber,
                    representation,
                    |topic_id| topics.get(&topic_id).cloned(),
                    self.reader_settings.clone(),
                )?;
                objects.datareaders.insert(id, reader);
            }
        }
        log::info!("[client] {} {:#06x} created", variant.kind(), id);
        Ok(())
    }

    /// Delete an object and, first, everything created under it.
    pub fn delete_object(&self, kind: ObjectKind, object_id: EntityId) -> Result<(), XrceError> {
        let detached = {
            let mut objects = self.objects.lock();
            if !objects.contains(kind, object_id) {
                return Err(XrceError::NotFound {
                    kind,
                    id: object_id,
                });
            }
            objects.detach(kind, object_id)
        };
        log::info!(
            "[client] {} {:#06x} deleted ({} object(s) removed)",
            kind,
            object_id,
            detached.len()
        );
        Ok(())
    }

    pub fn contains(&self, kind: ObjectKind, object_id: EntityId) -> bool {
        self.objects.lock().contains(kind, object_id)
    }

    pub fn object_count(&self, kind: ObjectKind) -> usize {
        self.objects.lock().len(kind)
    }

    pub fn datawriter(&self, object_id: EntityId) -> Option<Arc<DataWriter>> {
        self.objects.lock().datawriters.get(&object_id).cloned()
    }

    pub fn datareader(&self, object_id: EntityId) -> Option<Arc<DataReader>> {
        self.objects.lock().datareaders.get(&object_id).cloned()
    }

    fn require_datareader(&self, object_id: EntityId) -> Result<Arc<DataReader>, XrceError> {
        self.datareader(object_id).ok_or(XrceError::NotFound {
            kind: ObjectKind::DataReader,
            id: object_id,
        })
    }

    /// Publish one serialized sample through writer `object_id`.
    pub fn write(&self, object_id: EntityId, data: &[u8]) -> Result<(), XrceError> {
        let writer = self.datawriter(object_id).ok_or(XrceError::NotFound {
            kind: ObjectKind::DataWriter,
            id: object_id,
        })?;
        writer.write(data)
    }

    /// Start a read session on reader `object_id`.
    pub fn read(
        &self,
        object_id: EntityId,
        control: DeliveryControl,
        callback: ReadCallback,
        context: CallbackContext,
    ) -> Result<(), XrceError> {
        self.require_datareader(object_id)?
            .read(control, callback, context)
    }

    /// Stop the read session of reader `object_id`; `Ok(false)` if idle.
    pub fn stop_read(&self, object_id: EntityId) -> Result<bool, XrceError> {
        Ok(self.require_datareader(object_id)?.stop_read())
    }
}

impl Drop for ProxyClient {
    fn drop(&mut self) {
        let detached = self.objects.get_mut().detach_all();
        if detached.len() > 0 {
            log::debug!(
                "[client] session {} released {} object(s)",
                self.session_id,
                detached.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::LocalMiddleware;
    use std::time::Duration;

    const TOPIC_XML: &str =
        "<dds><topic><name>Square</name><dataType>ShapeType</dataType></topic></dds>";
    const OTHER_TOPIC_XML: &str =
        "<dds><topic><name>Circle</name><dataType>ShapeType</dataType></topic></dds>";
    const WRITER_XML: &str = "<dds><data_writer><topic><name>Square</name>\
        <dataType>ShapeType</dataType></topic></data_writer></dds>";
    const READER_XML: &str = "<dds><data_reader><topic><name>Square</name>\
        <dataType>ShapeType</dataType></topic></data_reader></dds>";

    fn xml(s: &str) -> Representation {
        Representation::ByXml(s.to_string())
    }

    fn client() -> (Arc<LocalMiddleware>, ProxyClient) {
        let local = Arc::new(LocalMiddleware::new());
        let client = ProxyClient::new(
            [0x11, 0x22, 0x33, 0x44],
            0x81,
            local.clone(),
            &AgentConfig::default(),
        )
        .unwrap();
        (local, client)
    }

    fn populate(client: &ProxyClient) {
        let none = CreationMode::default();
        let requests = [
            (
                0x01,
                ObjectVariant::Participant {
                    domain_id: 0,
                    representation: xml("<dds><participant/></dds>"),
                },
            ),
            (
                0x02,
                ObjectVariant::Topic {
                    participant_id: 0x01,
                    representation: xml(TOPIC_XML),
                },
            ),
            (
                0x03,
                ObjectVariant::Publisher {
                    participant_id: 0x01,
                    representation: xml(""),
                },
            ),
            (
                0x04,
                ObjectVariant::Subscriber {
                    participant_id: 0x01,
                    representation: xml(""),
                },
            ),
            (
                0x05,
                ObjectVariant::DataWriter {
                    publisher_id: 0x03,
                    representation: xml(WRITER_XML),
                },
            ),
            (
                0x06,
                ObjectVariant::DataReader {
                    subscriber_id: 0x04,
                    representation: xml(READER_XML),
                },
            ),
        ];
        for (id, variant) in requests {
            assert_eq!(
                client.create_object(id, none, variant),
                Ok(CreateOutcome::Created)
            );
        }
    }

    fn topic(representation: &str) -> ObjectVariant {
        ObjectVariant::Topic {
            participant_id: 0x01,
            representation: xml(representation),
        }
    }

    #[test]
    fn test_creation_mode_flags() {
        assert_eq!(CreationMode::from_flags(0), CreationMode::new(false, false));
        assert_eq!(CreationMode::from_flags(FLAG_REUSE), CreationMode::new(true, false));
        assert_eq!(
            CreationMode::from_flags(FLAG_REUSE | FLAG_REPLACE | 0x01),
            CreationMode::new(true, true)
        );
        assert_eq!(CreateOutcome::Matched.status_code(), StatusCode::OkMatched);
    }

    #[test]
    fn test_create_existing_without_flags() {
        let (_local, client) = client();
        populate(&client);
        assert_eq!(
            client.create_object(0x02, CreationMode::new(false, false), topic(TOPIC_XML)),
            Err(XrceError::AlreadyExists {
                kind: ObjectKind::Topic,
                id: 0x02
            })
        );
    }

    #[test]
    fn test_reuse_matching_object() {
        let (local, client) = client();
        populate(&client);
        assert_eq!(
            client.create_object(0x02, CreationMode::new(true, false), topic(TOPIC_XML)),
            Ok(CreateOutcome::Matched)
        );
        assert_eq!(local.entity_count(ObjectKind::Topic), 1);
        // The writer bound to the topic survives.
        assert!(client.contains(ObjectKind::DataWriter, 0x05));
    }

    #[test]
    fn test_reuse_mismatch() {
        let (_local, client) = client();
        populate(&client);
        assert_eq!(
            client.create_object(0x02, CreationMode::new(true, false), topic(OTHER_TOPIC_XML)),
            Err(XrceError::Mismatch {
                kind: ObjectKind::Topic,
                id: 0x02
            })
        );
    }

    #[test]
    fn test_replace_recreates_and_cascades() {
        let (local, client) = client();
        populate(&client);
        assert_eq!(
            client.create_object(0x02, CreationMode::new(false, true), topic(OTHER_TOPIC_XML)),
            Ok(CreateOutcome::Created)
        );
        assert!(client.contains(ObjectKind::Topic, 0x02));
        assert!(!client.contains(ObjectKind::DataWriter, 0x05));
        assert!(!client.contains(ObjectKind::DataReader, 0x06));
        assert_eq!(local.entity_count(ObjectKind::DataReader), 0);

        // reuse + replace keeps a match, replaces a mismatch.
        assert_eq!(
            client.create_object(0x02, CreationMode::new(true, true), topic(OTHER_TOPIC_XML)),
            Ok(CreateOutcome::Matched)
        );
        assert_eq!(
            client.create_object(0x02, CreationMode::new(true, true), topic(TOPIC_XML)),
            Ok(CreateOutcome::Created)
        );
        assert!(local.matched_topic_from_xml(0x02, TOPIC_XML));
    }

    #[test]
    fn test_create_under_missing_parent() {
        let (_local, client) = client();
        assert_eq!(
            client.create_object(0x02, CreationMode::default(), topic(TOPIC_XML)),
            Err(XrceError::NotFound {
                kind: ObjectKind::Participant,
                id: 0x01
            })
        );
    }

    #[test]
    fn test_delete_participant_cascades() {
        let (local, client) = client();
        populate(&client);
        client.delete_object(ObjectKind::Participant, 0x01).unwrap();
        for kind in [
            ObjectKind::Participant,
            ObjectKind::Topic,
            ObjectKind::Publisher,
            ObjectKind::Subscriber,
            ObjectKind::DataWriter,
            ObjectKind::DataReader,
        ] {
            assert_eq!(client.object_count(kind), 0, "{kind}");
            assert_eq!(local.entity_count(kind), 0, "{kind}");
        }
        assert_eq!(
            client.delete_object(ObjectKind::Participant, 0x01),
            Err(XrceError::NotFound {
                kind: ObjectKind::Participant,
                id: 0x01
            })
        );
    }

    #[test]
    fn test_delete_subscriber_removes_readers_only() {
        let (local, client) = client();
        populate(&client);
        client.delete_object(ObjectKind::Subscriber, 0x04).unwrap();
        assert_eq!(local.entity_count(ObjectKind::DataReader), 0);
        assert_eq!(local.entity_count(ObjectKind::Subscriber), 0);
        assert_eq!(local.entity_count(ObjectKind::DataWriter), 1);
        assert!(matches!(
            client.stop_read(0x06),
            Err(XrceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_write_and_read_through_client() {
        let (_local, client) = client();
        populate(&client);
        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);
        let callback: ReadCallback = Arc::new(move |ctx, data| sink.lock().push((*ctx, data)));
        let context = client.callback_context(0x06, 0x80, 7);

        client
            .read(0x06, DeliveryControl::default().max_samples(2), callback, context)
            .unwrap();
        client.write(0x05, b"a").unwrap();
        client.write(0x05, b"b").unwrap();

        let reader = client.datareader(0x06).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while reader.is_reading() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        let samples = samples.lock();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].0.client_key, [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(samples[0].0.request_id, 7);
        assert_eq!(samples[0].1, b"a".to_vec());
        assert_eq!(samples[1].1, b"b".to_vec());
        assert_eq!(client.stop_read(0x06), Ok(false));
    }

    #[test]
    fn test_drop_releases_everything() {
        let (local, client) = client();
        populate(&client);
        drop(client);
        assert_eq!(local.entity_count(ObjectKind::Participant), 0);
        assert_eq!(local.entity_count(ObjectKind::DataReader), 0);
    }
}
