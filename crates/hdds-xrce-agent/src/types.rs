// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Value types shared by the middleware contract, the proxy objects and the
// read subsystem.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::XrceError;

/// 16-bit entity identifier, unique within one kind's registry.
pub type EntityId = u16;

// Object kinds (DDS-XRCE ObjectKind low nibble).
pub const OBJK_PARTICIPANT: u8 = 0x01;
pub const OBJK_TOPIC: u8 = 0x02;
pub const OBJK_PUBLISHER: u8 = 0x03;
pub const OBJK_SUBSCRIBER: u8 = 0x04;
pub const OBJK_DATAWRITER: u8 = 0x05;
pub const OBJK_DATAREADER: u8 = 0x06;

/// Kind of entity held by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObjectKind {
    Participant = OBJK_PARTICIPANT,
    Topic = OBJK_TOPIC,
    Publisher = OBJK_PUBLISHER,
    Subscriber = OBJK_SUBSCRIBER,
    DataWriter = OBJK_DATAWRITER,
    DataReader = OBJK_DATAREADER,
}

impl ObjectKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            OBJK_PARTICIPANT => Some(Self::Participant),
            OBJK_TOPIC => Some(Self::Topic),
            OBJK_PUBLISHER => Some(Self::Publisher),
            OBJK_SUBSCRIBER => Some(Self::Subscriber),
            OBJK_DATAWRITER => Some(Self::DataWriter),
            OBJK_DATAREADER => Some(Self::DataReader),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Tag name used for this kind in XML descriptions.
    pub fn xml_tag(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Topic => "topic",
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
            Self::DataWriter => "data_writer",
            Self::DataReader => "data_reader",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Participant => "participant",
            Self::Topic => "topic",
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
            Self::DataWriter => "datawriter",
            Self::DataReader => "datareader",
        };
        f.write_str(name)
    }
}

/// How a creation request describes the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    /// Name of a pre-registered profile.
    ByReference(String),
    /// Self-contained XML description.
    ByXml(String),
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Identifies the request a delivered sample answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackContext {
    pub client_key: [u8; 4],
    pub stream_id: u8,
    pub object_id: u16,
    pub request_id: u16,
}

/// Callback invoked on the reader's worker for every delivered sample.
pub type ReadCallback = Arc<dyn Fn(&CallbackContext, Vec<u8>) + Send + Sync>;

/// `max_samples` value meaning "no sample limit".
pub const MAX_SAMPLES_UNLIMITED: u16 = 0xFFFF;

/// Bounds on how much a read session delivers and how fast.
///
/// Zero disables the time-based bounds. `max_elapsed_time` arms the
/// reader's max-duration timer; the rest are enforced by the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryControl {
    pub max_samples: u16,
    /// Milliseconds.
    pub max_elapsed_time: u32,
    pub max_bytes_per_second: u32,
    /// Milliseconds between two deliveries.
    pub min_pace_period: u32,
}

impl Default for DeliveryControl {
    /// A single sample, no timer, no throttling.
    fn default() -> Self {
        Self {
            max_samples: 1,
            max_elapsed_time: 0,
            max_bytes_per_second: 0,
            min_pace_period: 0,
        }
    }
}

impl DeliveryControl {
    /// Unlimited samples for at most `max_elapsed`.
    pub fn stream_for(max_elapsed: Duration) -> Self {
        Self {
            max_samples: MAX_SAMPLES_UNLIMITED,
            max_elapsed_time: u32::try_from(max_elapsed.as_millis()).unwrap_or(u32::MAX),
            ..Self::default()
        }
    }

    pub fn max_samples(mut self, max_samples: u16) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn max_bytes_per_second(mut self, rate: u32) -> Self {
        self.max_bytes_per_second = rate;
        self
    }

    pub fn min_pace_period(mut self, period_ms: u32) -> Self {
        self.min_pace_period = period_ms;
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_samples == MAX_SAMPLES_UNLIMITED
    }

    /// Whether `delivered` samples exhaust the sample budget.
    pub fn samples_exhausted(&self, delivered: u32) -> bool {
        !self.is_unlimited() && delivered >= u32::from(self.max_samples)
    }

    /// Duration for the max-duration timer, if any.
    pub fn max_elapsed(&self) -> Option<Duration> {
        (self.max_elapsed_time > 0).then(|| Duration::from_millis(u64::from(self.max_elapsed_time)))
    }

    /// Pause required before the next delivery, given the last delivered
    /// sample size and the time elapsed since that delivery.
    pub fn throttle_delay(&self, last_size: usize, since_last: Duration) -> Duration {
        let pace = Duration::from_millis(u64::from(self.min_pace_period));
        let rate = if self.max_bytes_per_second > 0 && last_size > 0 {
            Duration::from_nanos(
                (last_size as u64).saturating_mul(1_000_000_000)
                    / u64::from(self.max_bytes_per_second),
            )
        } else {
            Duration::ZERO
        };
        pace.max(rate).saturating_sub(since_last)
    }

    /// Reject combinations that can never deliver anything.
    pub fn validate(&self) -> Result<(), XrceError> {
        if self.max_samples == 0 {
            return Err(XrceError::ConfigError(
                "delivery control max_samples must be > 0".into(),
            ));
        }
        Ok(())
    }
}
