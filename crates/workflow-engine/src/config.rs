//! Run configuration shared by every workflow.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Desired-state mode of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Create or update to match the config
    #[default]
    Merged,
    /// Remove what the config names
    Deleted,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Merged => f.write_str("merged"),
            State::Deleted => f.write_str("deleted"),
        }
    }
}

/// Number of members sent in one batched read or write, bounded to `[1, 500]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BatchSize(u16);

impl BatchSize {
    /// Smallest allowed batch
    pub const MIN: u16 = 1;
    /// Largest allowed batch
    pub const MAX: u16 = 500;

    /// Build a batch size, rejecting values outside `[1, 500]`
    pub const fn new(size: u16) -> Option<Self> {
        if size >= Self::MIN && size <= Self::MAX {
            Some(Self(size))
        } else {
            None
        }
    }

    /// Batch size as a slice chunk length
    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<u32> for BatchSize {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("batch size must be between {} and {}, got {}", Self::MIN, Self::MAX, value))
    }
}

impl From<BatchSize> for u32 {
    fn from(size: BatchSize) -> Self {
        u32::from(size.0)
    }
}

fn default_task_timeout() -> u64 {
    1200
}

fn default_poll_interval() -> u64 {
    2
}

fn default_settle_interval() -> u64 {
    10
}

/// Options accepted by every workflow entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Re-read state after applying and require it to match
    pub config_verify: bool,
    /// Seconds a single Controller task may run
    #[serde(default = "default_task_timeout")]
    pub task_timeout: u64,
    /// Seconds between task polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Seconds to wait before the verify pass
    #[serde(default = "default_settle_interval")]
    pub settle_interval: u64,
    pub device_tag_read_batch: BatchSize,
    pub device_tag_update_batch: BatchSize,
    pub interface_tag_read_batch: BatchSize,
    pub interface_tag_update_batch: BatchSize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_verify: false,
            task_timeout: default_task_timeout(),
            poll_interval: default_poll_interval(),
            settle_interval: default_settle_interval(),
            device_tag_read_batch: BatchSize::default(),
            device_tag_update_batch: BatchSize::default(),
            interface_tag_read_batch: BatchSize::default(),
            interface_tag_update_batch: BatchSize::default(),
        }
    }
}

impl RunOptions {
    /// Task timeout as a `Duration`
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout)
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Settle interval as a `Duration`
    pub fn settle_interval(&self) -> Duration {
        Duration::from_secs(self.settle_interval)
    }
}
