// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Error taxonomy of the agent object layer and its DDS-XRCE status mapping.
//
// Nothing here panics: every middleware and reader operation reports
// failure through `XrceError`, and the protocol layer turns that into a
// STATUS submessage via `XrceError::status_code()`.

use thiserror::Error;

use crate::types::{EntityId, ObjectKind};

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_OK_MATCHED: u8 = 0x01;
pub const STATUS_ERR_DDS_ERROR: u8 = 0x80;
pub const STATUS_ERR_MISMATCH: u8 = 0x81;
pub const STATUS_ERR_ALREADY_EXISTS: u8 = 0x82;
pub const STATUS_ERR_DENIED: u8 = 0x83;
pub const STATUS_ERR_UNKNOWN_REFERENCE: u8 = 0x84;
pub const STATUS_ERR_INVALID_DATA: u8 = 0x85;
pub const STATUS_ERR_INCOMPATIBLE: u8 = 0x86;
pub const STATUS_ERR_RESOURCES: u8 = 0x87;

/// DDS-XRCE STATUS codes (OMG DDS-XRCE 1.0, 8.3.5.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Ok = STATUS_OK,
    OkMatched = STATUS_OK_MATCHED,
    ErrDdsError = STATUS_ERR_DDS_ERROR,
    ErrMismatch = STATUS_ERR_MISMATCH,
    ErrAlreadyExists = STATUS_ERR_ALREADY_EXISTS,
    ErrDenied = STATUS_ERR_DENIED,
    ErrUnknownReference = STATUS_ERR_UNKNOWN_REFERENCE,
    ErrInvalidData = STATUS_ERR_INVALID_DATA,
    ErrIncompatible = STATUS_ERR_INCOMPATIBLE,
    ErrResources = STATUS_ERR_RESOURCES,
}

impl StatusCode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            STATUS_OK => Some(Self::Ok),
            STATUS_OK_MATCHED => Some(Self::OkMatched),
            STATUS_ERR_DDS_ERROR => Some(Self::ErrDdsError),
            STATUS_ERR_MISMATCH => Some(Self::ErrMismatch),
            STATUS_ERR_ALREADY_EXISTS => Some(Self::ErrAlreadyExists),
            STATUS_ERR_DENIED => Some(Self::ErrDenied),
            STATUS_ERR_UNKNOWN_REFERENCE => Some(Self::ErrUnknownReference),
            STATUS_ERR_INVALID_DATA => Some(Self::ErrInvalidData),
            STATUS_ERR_INCOMPATIBLE => Some(Self::ErrIncompatible),
            STATUS_ERR_RESOURCES => Some(Self::ErrResources),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for `Ok` and `OkMatched`.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::OkMatched)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced by the agent object layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XrceError {
    /// No entity of this kind is registered under the id.
    #[error("{kind} {id:#06x} not found")]
    NotFound { kind: ObjectKind, id: EntityId },

    /// Creation collided with an existing entity of the same kind.
    #[error("{kind} {id:#06x} already exists")]
    AlreadyExists { kind: ObjectKind, id: EntityId },

    /// A reference could not be resolved, or an XML description is malformed.
    #[error("unresolvable description: {0}")]
    Unresolvable(String),

    /// No sample arrived within the read timeout.
    #[error("read timed out")]
    Timeout,

    /// A read session is already active on this reader.
    #[error("reader {0:#06x} busy: read session already active")]
    Busy(EntityId),

    /// Reuse was requested but the existing entity differs from the description.
    #[error("{kind} {id:#06x} does not match the requested description")]
    Mismatch { kind: ObjectKind, id: EntityId },

    /// Thread or timer resources could not be obtained.
    #[error("resources exhausted: {0}")]
    Resources(String),

    /// Configuration validation error.
    #[error("config error: {0}")]
    ConfigError(String),

    /// I/O error (message only, not the original error).
    #[error("I/O error: {0}")]
    Io(String),
}

impl XrceError {
    /// Status code the protocol layer reports for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::ErrUnknownReference,
            Self::AlreadyExists { .. } => StatusCode::ErrAlreadyExists,
            Self::Unresolvable(_) => StatusCode::ErrInvalidData,
            Self::Timeout => StatusCode::ErrDdsError,
            Self::Busy(_) => StatusCode::ErrDenied,
            Self::Mismatch { .. } => StatusCode::ErrMismatch,
            Self::Resources(_) => StatusCode::ErrResources,
            Self::ConfigError(_) | Self::Io(_) => StatusCode::ErrDdsError,
        }
    }
}

impl From<std::io::Error> for XrceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<roxmltree::Error> for XrceError {
    fn from(e: roxmltree::Error) -> Self {
        Self::Unresolvable(format!("malformed XML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_roundtrip() {
        for code in [
            StatusCode::Ok,
            StatusCode::OkMatched,
            StatusCode::ErrDdsError,
            StatusCode::ErrMismatch,
            StatusCode::ErrAlreadyExists,
            StatusCode::ErrDenied,
            StatusCode::ErrUnknownReference,
            StatusCode::ErrInvalidData,
            StatusCode::ErrIncompatible,
            StatusCode::ErrResources,
        ] {
            assert_eq!(StatusCode::from_u8(code.as_u8()), Some(code));
        }
        assert_eq!(StatusCode::from_u8(0x42), None);
    }

    #[test]
    fn test_error_maps_to_status() {
        let not_found = XrceError::NotFound {
            kind: ObjectKind::DataReader,
            id: 7,
        };
        assert_eq!(not_found.status_code(), StatusCode::ErrUnknownReference);
        assert_eq!(XrceError::Busy(7).status_code(), StatusCode::ErrDenied);
        assert_eq!(
            XrceError::Unresolvable("x".into()).status_code(),
            StatusCode::ErrInvalidData
        );
        assert!(!not_found.status_code().is_ok());
        assert!(StatusCode::OkMatched.is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = XrceError::AlreadyExists {
            kind: ObjectKind::Topic,
            id: 0x12,
        };
        assert_eq!(err.to_string(), "topic 0x0012 already exists");
    }
}
