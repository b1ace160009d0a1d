// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Agent configuration with validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::XrceError;

/// What `DataReader::read` does when a session is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Stop the running session (full barrier) and start the new one.
    #[default]
    Replace,
    /// Fail the new request with `XrceError::Busy`.
    Reject,
}

/// Configuration for the agent object layer.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound of a single middleware read call inside a read session
    /// (default: 20ms). Also bounds how long `stop_read` may wait.
    pub read_timeout: Duration,
    /// KEEP_LAST depth for readers whose description has no history
    /// (default: 16).
    pub default_history_depth: usize,
    /// Policy for `read` while a session is active (default: Replace).
    pub restart_policy: RestartPolicy,
    /// Optional XML profiles file loaded by the local middleware.
    pub profiles_path: Option<PathBuf>,
    /// Name of the max-duration timer thread (default: "hdds-xrce-timer").
    pub timer_thread_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(20),
            default_history_depth: 16,
            restart_policy: RestartPolicy::Replace,
            profiles_path: None,
            timer_thread_name: "hdds-xrce-timer".to_string(),
        }
    }
}

impl AgentConfig {
    /// Validate configuration. Returns Ok(()) if valid.
    pub fn validate(&self) -> Result<(), XrceError> {
        if self.read_timeout.is_zero() {
            return Err(XrceError::ConfigError(
                "read_timeout must be > 0".into(),
            ));
        }
        if self.default_history_depth == 0 {
            return Err(XrceError::ConfigError(
                "default_history_depth must be > 0".into(),
            ));
        }
        if self.timer_thread_name.is_empty() {
            return Err(XrceError::ConfigError(
                "timer_thread_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    pub fn profiles_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profiles_path = Some(path.into());
        self
    }
}
