// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native entities of the in-process loopback engine.
//!
//! Participants of the same domain share a [`DomainBus`]. A data writer
//! publishes into the bus, which copies the sample into the queue of every
//! live data reader with the same topic name and type whose subscriber
//! partitions intersect the publisher's.

use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::middleware::profiles::{
    DataReaderDescriptor, DataWriterDescriptor, GroupDescriptor, ParticipantDescriptor,
    PublisherDescriptor, SubscriberDescriptor, TopicDescriptor,
};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Sample queue
// ---------------------------------------------------------------------------

/// KEEP_LAST sample queue with a blocking take.
pub(crate) struct SampleQueue {
    samples: Mutex<VecDeque<Vec<u8>>>,
    available: Condvar,
    depth: usize,
}

impl SampleQueue {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(depth)),
            available: Condvar::new(),
            depth: depth.max(1),
        }
    }

    /// Enqueue, dropping the oldest sample when full.
    pub(crate) fn push(&self, sample: Vec<u8>) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.depth {
            samples.pop_front();
        }
        samples.push_back(sample);
        drop(samples);
        self.available.notify_one();
    }

    /// Oldest sample, waiting up to `timeout` for one to arrive.
    pub(crate) fn take(&self, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut samples = self.samples.lock();
        loop {
            if let Some(sample) = samples.pop_front() {
                return Some(sample);
            }
            if self.available.wait_until(&mut samples, deadline).timed_out() {
                return samples.pop_front();
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.lock().len()
    }
}

// ---------------------------------------------------------------------------
// Domain bus
// ---------------------------------------------------------------------------

struct ReaderRoute {
    topic_name: String,
    type_name: String,
    partitions: GroupDescriptor,
    queue: Weak<SampleQueue>,
}

/// Routing table shared by the participants of one domain.
pub(crate) struct DomainBus {
    domain_id: i16,
    routes: RwLock<Vec<ReaderRoute>>,
}

impl DomainBus {
    pub(crate) fn new(domain_id: i16) -> Self {
        Self {
            domain_id,
            routes: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn domain_id(&self) -> i16 {
        self.domain_id
    }

    /// Route matching samples into `queue` for as long as it is alive.
    pub(crate) fn attach_reader(
        &self,
        topic: &TopicDescriptor,
        partitions: &GroupDescriptor,
        queue: &Arc<SampleQueue>,
    ) {
        let mut routes = self.routes.write();
        routes.retain(|r| r.queue.strong_count() > 0);
        routes.push(ReaderRoute {
            topic_name: topic.name.clone(),
            type_name: topic.type_name.clone(),
            partitions: partitions.clone(),
            queue: Arc::downgrade(queue),
        });
    }

    /// Deliver a sample; returns the number of readers reached.
    pub(crate) fn publish(
        &self,
        topic: &TopicDescriptor,
        partitions: &GroupDescriptor,
        data: &[u8],
    ) -> usize {
        let routes = self.routes.read();
        let mut delivered = 0;
        for route in routes.iter() {
            if route.topic_name != topic.name
                || route.type_name != topic.type_name
                || !route.partitions.intersects(partitions)
            {
                continue;
            }
            if let Some(queue) = route.queue.upgrade() {
                queue.push(data.to_vec());
                delivered += 1;
            }
        }
        delivered
    }

    pub(crate) fn live_readers(&self) -> usize {
        self.routes
            .read()
            .iter()
            .filter(|r| r.queue.strong_count() > 0)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

pub(crate) struct NativeParticipant {
    pub domain_id: i16,
    pub descriptor: ParticipantDescriptor,
    pub bus: Arc<DomainBus>,
}

pub(crate) struct NativeTopic {
    pub participant_id: EntityId,
    pub descriptor: TopicDescriptor,
}

pub(crate) struct NativePublisher {
    pub participant_id: EntityId,
    pub participant: Arc<NativeParticipant>,
    pub descriptor: PublisherDescriptor,
}

pub(crate) struct NativeSubscriber {
    pub participant_id: EntityId,
    pub participant: Arc<NativeParticipant>,
    pub descriptor: SubscriberDescriptor,
}

pub(crate) struct NativeDataWriter {
    pub topic: Arc<NativeTopic>,
    pub publisher: Arc<NativePublisher>,
    pub descriptor: DataWriterDescriptor,
}

impl NativeDataWriter {
    pub(crate) fn write(&self, data: &[u8]) -> usize {
        self.publisher.participant.bus.publish(
            &self.topic.descriptor,
            &self.publisher.descriptor.0,
            data,
        )
    }
}

pub(crate) struct NativeDataReader {
    pub descriptor: DataReaderDescriptor,
    pub queue: Arc<SampleQueue>,
}

impl NativeDataReader {
    /// Build the reader and attach its queue to the subscriber's domain.
    /// The route lives as long as the returned reader.
    pub(crate) fn attach(
        topic: &NativeTopic,
        subscriber: &NativeSubscriber,
        descriptor: DataReaderDescriptor,
        depth: usize,
    ) -> Self {
        let queue = Arc::new(SampleQueue::new(depth));
        subscriber.participant.bus.attach_reader(
            &topic.descriptor,
            &subscriber.descriptor.0,
            &queue,
        );
        Self { descriptor, queue }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn topic(name: &str) -> TopicDescriptor {
        TopicDescriptor {
            name: name.into(),
            type_name: "T".into(),
        }
    }

    #[test]
    fn test_queue_keep_last() {
        let q = SampleQueue::new(2);
        q.push(vec![1]);
        q.push(vec![2]);
        q.push(vec![3]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.take(Duration::ZERO), Some(vec![2]));
        assert_eq!(q.take(Duration::ZERO), Some(vec![3]));
        assert_eq!(q.take(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_queue_take_wakes_on_push() {
        let q = Arc::new(SampleQueue::new(4));
        let producer = Arc::clone(&q);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push(vec![7]);
        });

        let start = Instant::now();
        assert_eq!(q.take(Duration::from_millis(500)), Some(vec![7]));
        assert!(start.elapsed() < Duration::from_millis(400));
        handle.join().unwrap();
    }

    #[test]
    fn test_bus_routes_by_topic_and_partition() {
        let bus = DomainBus::new(0);
        let square = Arc::new(SampleQueue::new(8));
        let circle = Arc::new(SampleQueue::new(8));
        let fenced = Arc::new(SampleQueue::new(8));
        let default_group = GroupDescriptor::default();
        let group_a = GroupDescriptor {
            partitions: vec!["a".into()],
        };

        bus.attach_reader(&topic("Square"), &default_group, &square);
        bus.attach_reader(&topic("Circle"), &default_group, &circle);
        bus.attach_reader(&topic("Square"), &group_a, &fenced);

        assert_eq!(bus.publish(&topic("Square"), &default_group, b"s"), 1);
        assert_eq!(square.len(), 1);
        assert_eq!(circle.len(), 0);
        assert_eq!(fenced.len(), 0);

        assert_eq!(bus.publish(&topic("Square"), &group_a, b"p"), 1);
        assert_eq!(fenced.len(), 1);

        // Dropped readers stop receiving.
        drop(square);
        assert_eq!(bus.publish(&topic("Square"), &default_group, b"s"), 0);
        assert_eq!(bus.live_readers(), 2);
        assert_eq!(bus.domain_id(), 0);
    }
}
