// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity descriptions and the profile repository.
//!
//! Entities are described in the FastDDS-style XML dialect XRCE clients
//! send in CREATE requests:
//!
//! ```xml
//! <dds>
//!   <data_writer>
//!     <topic>
//!       <kind>NO_KEY</kind>
//!       <name>HelloWorldTopic</name>
//!       <dataType>HelloWorld</dataType>
//!       <historyQos><kind>KEEP_LAST</kind><depth>5</depth></historyQos>
//!     </topic>
//!     <qos><reliability><kind>RELIABLE</kind></reliability></qos>
//!   </data_writer>
//! </dds>
//! ```
//!
//! A reference names a profile pre-registered in a [`ProfileRepository`],
//! usually loaded from a `<profiles>` document where every element carries
//! a `profile_name` attribute.

use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::XrceError;
use crate::types::ObjectKind;

// ---------------------------------------------------------------------------
// XML helpers
// ---------------------------------------------------------------------------

fn child_text<'a>(node: &Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn descendant<'a, 'i>(node: &Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

fn required(value: Option<&str>, what: &str, kind: ObjectKind) -> Result<String, XrceError> {
    value
        .map(str::to_string)
        .ok_or_else(|| XrceError::Unresolvable(format!("{} description has no <{}>", kind, what)))
}

/// Parsed description of one entity kind.
pub trait Descriptor: Sized + Clone + PartialEq + Send + Sync {
    const KIND: ObjectKind;

    /// Build from the element whose tag is `KIND.xml_tag()`.
    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError>;

    /// Parse a self-contained XML description.
    fn from_xml(xml: &str) -> Result<Self, XrceError> {
        let doc = Document::parse(xml)?;
        let tag = Self::KIND.xml_tag();
        let node = descendant(&doc.root_element(), tag).ok_or_else(|| {
            XrceError::Unresolvable(format!("no <{}> element in description", tag))
        })?;
        Self::from_node(&node)
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDescriptor {
    pub name: String,
}

impl Descriptor for ParticipantDescriptor {
    const KIND: ObjectKind = ObjectKind::Participant;

    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError> {
        // <participant><rtps><name>..</name></rtps></participant>
        let name = descendant(node, "rtps")
            .and_then(|rtps| child_text(&rtps, "name"))
            .or_else(|| child_text(node, "name"));
        Ok(Self {
            name: name.unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescriptor {
    pub name: String,
    pub type_name: String,
}

impl Descriptor for TopicDescriptor {
    const KIND: ObjectKind = ObjectKind::Topic;

    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError> {
        Ok(Self {
            name: required(child_text(node, "name"), "name", Self::KIND)?,
            type_name: required(child_text(node, "dataType"), "dataType", Self::KIND)?,
        })
    }
}

/// Publisher or subscriber description: its partition set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupDescriptor {
    pub partitions: Vec<String>,
}

impl GroupDescriptor {
    fn from_group_node(node: &Node<'_, '_>) -> Self {
        let mut partitions: Vec<String> = descendant(node, "partition")
            .map(|p| {
                p.descendants()
                    .filter(|n| n.is_element() && n.tag_name().name() == "name")
                    .filter_map(|n| n.text())
                    .map(|t| t.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        partitions.sort();
        partitions.dedup();
        Self { partitions }
    }

    /// Default partition (empty set) matches only the default partition.
    pub fn intersects(&self, other: &GroupDescriptor) -> bool {
        if self.partitions.is_empty() || other.partitions.is_empty() {
            return self.partitions.is_empty() && other.partitions.is_empty();
        }
        self.partitions.iter().any(|p| other.partitions.contains(p))
    }
}

/// Parse a description that may be an empty string (publishers and
/// subscribers), falling back to the default.
pub fn from_optional_xml<D: Descriptor + Default>(xml: &str) -> Result<D, XrceError> {
    if xml.trim().is_empty() {
        Ok(D::default())
    } else {
        D::from_xml(xml)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublisherDescriptor(pub GroupDescriptor);

impl Descriptor for PublisherDescriptor {
    const KIND: ObjectKind = ObjectKind::Publisher;

    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError> {
        Ok(Self(GroupDescriptor::from_group_node(node)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriberDescriptor(pub GroupDescriptor);

impl Descriptor for SubscriberDescriptor {
    const KIND: ObjectKind = ObjectKind::Subscriber;

    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError> {
        Ok(Self(GroupDescriptor::from_group_node(node)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReliabilityKind {
    #[default]
    BestEffort,
    Reliable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityKind {
    #[default]
    Volatile,
    TransientLocal,
}

/// Data writer or data reader description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub topic_name: String,
    pub type_name: String,
    pub reliability: ReliabilityKind,
    pub durability: DurabilityKind,
    /// KEEP_LAST depth; `None` uses the backend default.
    pub history_depth: Option<usize>,
}

impl EndpointDescriptor {
    fn from_endpoint_node(node: &Node<'_, '_>, kind: ObjectKind) -> Result<Self, XrceError> {
        let topic = descendant(node, "topic").ok_or_else(|| {
            XrceError::Unresolvable(format!("{} description has no <topic>", kind))
        })?;
        let topic_name = required(child_text(&topic, "name"), "name", kind)?;
        let type_name = required(child_text(&topic, "dataType"), "dataType", kind)?;

        let qos_kind = |policy: &str| {
            descendant(node, "qos")
                .and_then(|qos| descendant(&qos, policy))
                .and_then(|p| child_text(&p, "kind"))
        };

        let reliability = match qos_kind("reliability") {
            Some("RELIABLE") | Some("RELIABLE_RELIABILITY_QOS") => ReliabilityKind::Reliable,
            Some("BEST_EFFORT") | Some("BEST_EFFORT_RELIABILITY_QOS") | None => {
                ReliabilityKind::BestEffort
            }
            Some(other) => {
                return Err(XrceError::Unresolvable(format!(
                    "unknown reliability kind '{}'",
                    other
                )))
            }
        };

        let durability = match qos_kind("durability") {
            Some("TRANSIENT_LOCAL") | Some("TRANSIENT_LOCAL_DURABILITY_QOS") => {
                DurabilityKind::TransientLocal
            }
            Some("VOLATILE") | Some("VOLATILE_DURABILITY_QOS") | None => DurabilityKind::Volatile,
            Some(other) => {
                return Err(XrceError::Unresolvable(format!(
                    "unknown durability kind '{}'",
                    other
                )))
            }
        };

        let history_depth = match descendant(node, "historyQos")
            .and_then(|h| child_text(&h, "depth"))
        {
            Some(depth) => {
                let depth = depth.parse::<usize>().map_err(|_| {
                    XrceError::Unresolvable(format!("invalid history depth '{}'", depth))
                })?;
                if depth == 0 {
                    return Err(XrceError::Unresolvable("history depth must be > 0".into()));
                }
                Some(depth)
            }
            None => None,
        };

        Ok(Self {
            topic_name,
            type_name,
            reliability,
            durability,
            history_depth,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataWriterDescriptor(pub EndpointDescriptor);

impl Descriptor for DataWriterDescriptor {
    const KIND: ObjectKind = ObjectKind::DataWriter;

    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError> {
        EndpointDescriptor::from_endpoint_node(node, Self::KIND).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReaderDescriptor(pub EndpointDescriptor);

impl Descriptor for DataReaderDescriptor {
    const KIND: ObjectKind = ObjectKind::DataReader;

    fn from_node(node: &Node<'_, '_>) -> Result<Self, XrceError> {
        EndpointDescriptor::from_endpoint_node(node, Self::KIND).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Profile repository
// ---------------------------------------------------------------------------

/// Named entity profiles that references resolve against.
#[derive(Debug, Clone, Default)]
pub struct ProfileRepository {
    /// (kind, profile_name) -> XML of the profile element.
    profiles: HashMap<(ObjectKind, String), String>,
}

impl ProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `profile_name`-tagged entity element of a `<profiles>` file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, XrceError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_xml(&content)
    }

    pub fn from_xml(xml: &str) -> Result<Self, XrceError> {
        let mut repo = Self::new();
        repo.load_xml(xml)?;
        Ok(repo)
    }

    /// Merge the profiles of an XML document. Returns how many were added.
    ///
    /// Every profile is validated; a malformed one rejects the whole document.
    pub fn load_xml(&mut self, xml: &str) -> Result<usize, XrceError> {
        let doc = Document::parse(xml)?;
        let mut loaded = Vec::new();

        for node in doc.root_element().descendants().filter(|n| n.is_element()) {
            let Some(name) = node.attribute("profile_name") else {
                continue;
            };
            let Some(kind) = kind_for_tag(node.tag_name().name()) else {
                continue;
            };
            let text = &doc.input_text()[node.range()];
            validate_profile(kind, text).map_err(|e| {
                XrceError::Unresolvable(format!("profile '{}': {}", name, e))
            })?;
            loaded.push(((kind, name.to_string()), text.to_string()));
        }

        let count = loaded.len();
        self.profiles.extend(loaded);
        log::debug!("[profiles] loaded {} profile(s)", count);
        Ok(count)
    }

    /// Register a single profile from its XML description.
    pub fn register(&mut self, kind: ObjectKind, name: &str, xml: &str) -> Result<(), XrceError> {
        validate_profile(kind, xml)?;
        self.profiles.insert((kind, name.to_string()), xml.to_string());
        Ok(())
    }

    pub fn contains(&self, kind: ObjectKind, name: &str) -> bool {
        self.profiles.contains_key(&(kind, name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve a reference into a description.
    pub fn resolve<D: Descriptor>(&self, reference: &str) -> Result<D, XrceError> {
        let xml = self
            .profiles
            .get(&(D::KIND, reference.to_string()))
            .ok_or_else(|| {
                XrceError::Unresolvable(format!("unknown {} reference '{}'", D::KIND, reference))
            })?;
        D::from_xml(xml)
    }
}

fn kind_for_tag(tag: &str) -> Option<ObjectKind> {
    match tag {
        "participant" => Some(ObjectKind::Participant),
        "topic" => Some(ObjectKind::Topic),
        "publisher" => Some(ObjectKind::Publisher),
        "subscriber" => Some(ObjectKind::Subscriber),
        "data_writer" => Some(ObjectKind::DataWriter),
        "data_reader" => Some(ObjectKind::DataReader),
        _ => None,
    }
}

fn validate_profile(kind: ObjectKind, xml: &str) -> Result<(), XrceError> {
    match kind {
        ObjectKind::Participant => ParticipantDescriptor::from_xml(xml).map(drop),
        ObjectKind::Topic => TopicDescriptor::from_xml(xml).map(drop),
        ObjectKind::Publisher => PublisherDescriptor::from_xml(xml).map(drop),
        ObjectKind::Subscriber => SubscriberDescriptor::from_xml(xml).map(drop),
        ObjectKind::DataWriter => DataWriterDescriptor::from_xml(xml).map(drop),
        ObjectKind::DataReader => DataReaderDescriptor::from_xml(xml).map(drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROFILES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<profiles>
  <participant profile_name="default_xrce_participant">
    <rtps><name>default_xrce_participant</name></rtps>
  </participant>
  <topic profile_name="hello_topic">
    <name>HelloWorldTopic</name>
    <dataType>HelloWorld</dataType>
  </topic>
  <data_writer profile_name="hello_writer">
    <topic>
      <kind>NO_KEY</kind>
      <name>HelloWorldTopic</name>
      <dataType>HelloWorld</dataType>
    </topic>
    <qos><reliability><kind>RELIABLE</kind></reliability></qos>
  </data_writer>
  <data_reader profile_name="hello_reader">
    <topic>
      <kind>NO_KEY</kind>
      <name>HelloWorldTopic</name>
      <dataType>HelloWorld</dataType>
      <historyQos><kind>KEEP_LAST</kind><depth>4</depth></historyQos>
    </topic>
  </data_reader>
</profiles>"#;

    #[test]
    fn test_parse_topic_xml() {
        let topic = TopicDescriptor::from_xml(
            "<dds><topic><name>Square</name><dataType>ShapeType</dataType></topic></dds>",
        )
        .unwrap();
        assert_eq!(topic.name, "Square");
        assert_eq!(topic.type_name, "ShapeType");
    }

    #[test]
    fn test_topic_without_type_is_unresolvable() {
        let err = TopicDescriptor::from_xml("<dds><topic><name>Square</name></topic></dds>")
            .unwrap_err();
        assert!(matches!(err, XrceError::Unresolvable(_)));
    }

    #[test]
    fn test_malformed_xml_is_unresolvable() {
        let err = TopicDescriptor::from_xml("<dds><topic><name>Square</topic>").unwrap_err();
        assert!(matches!(err, XrceError::Unresolvable(_)));
    }

    #[test]
    fn test_parse_endpoint_qos() {
        let xml = r#"<dds><data_reader>
            <topic><name>T</name><dataType>D</dataType>
              <historyQos><kind>KEEP_LAST</kind><depth>3</depth></historyQos></topic>
            <qos>
              <reliability><kind>RELIABLE</kind></reliability>
              <durability><kind>TRANSIENT_LOCAL</kind></durability>
            </qos>
          </data_reader></dds>"#;
        let DataReaderDescriptor(ep) = DataReaderDescriptor::from_xml(xml).unwrap();
        assert_eq!(ep.topic_name, "T");
        assert_eq!(ep.reliability, ReliabilityKind::Reliable);
        assert_eq!(ep.durability, DurabilityKind::TransientLocal);
        assert_eq!(ep.history_depth, Some(3));

        let bad = xml.replace("RELIABLE<", "SOMETIMES<");
        assert!(DataReaderDescriptor::from_xml(&bad).is_err());
        let zero = xml.replace("<depth>3", "<depth>0");
        assert!(DataReaderDescriptor::from_xml(&zero).is_err());
    }

    #[test]
    fn test_group_partitions() {
        let a = PublisherDescriptor::from_xml(
            "<publisher><qos><partition><names><name>b</name><name>a</name></names></partition></qos></publisher>",
        )
        .unwrap();
        assert_eq!(a.0.partitions, vec!["a".to_string(), "b".to_string()]);

        let b = SubscriberDescriptor::from_xml(
            "<subscriber><qos><partition><names><name>a</name></names></partition></qos></subscriber>",
        )
        .unwrap();
        assert!(a.0.intersects(&b.0));
        assert!(!a.0.intersects(&GroupDescriptor::default()));
        assert!(GroupDescriptor::default().intersects(&GroupDescriptor::default()));

        let empty: PublisherDescriptor = from_optional_xml("  ").unwrap();
        assert!(empty.0.partitions.is_empty());
    }

    #[test]
    fn test_repository_resolves_references() {
        let repo = ProfileRepository::from_xml(PROFILES).unwrap();
        assert_eq!(repo.len(), 4);
        assert!(repo.contains(ObjectKind::Topic, "hello_topic"));

        let participant: ParticipantDescriptor = repo.resolve("default_xrce_participant").unwrap();
        assert_eq!(participant.name, "default_xrce_participant");

        let reader: DataReaderDescriptor = repo.resolve("hello_reader").unwrap();
        assert_eq!(reader.0.history_depth, Some(4));

        // References are per kind.
        assert!(repo.resolve::<TopicDescriptor>("hello_writer").is_err());
        assert!(repo.resolve::<TopicDescriptor>("nope").is_err());
    }

    #[test]
    fn test_repository_rejects_invalid_profile() {
        let xml = r#"<profiles><topic profile_name="broken"><name>X</name></topic></profiles>"#;
        let err = ProfileRepository::from_xml(xml).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_repository_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PROFILES.as_bytes()).unwrap();
        let repo = ProfileRepository::load_from_file(file.path()).unwrap();
        assert!(repo.contains(ObjectKind::DataWriter, "hello_writer"));

        assert!(matches!(
            ProfileRepository::load_from_file("/nonexistent/profiles.xml"),
            Err(XrceError::Io(_))
        ));
    }

    #[test]
    fn test_register_single_profile() {
        let mut repo = ProfileRepository::new();
        repo.register(
            ObjectKind::Topic,
            "t",
            "<topic><name>T</name><dataType>D</dataType></topic>",
        )
        .unwrap();
        assert!(repo.resolve::<TopicDescriptor>("t").is_ok());
        assert!(repo
            .register(ObjectKind::Topic, "bad", "<topic/>")
            .is_err());
    }
}
