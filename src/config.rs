//! Runtime configuration.
//!
//! Defaults cover the in-process simulation. `DepositConfig::from_env`
//! overlays `DEPOSIT_*` environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `DEPOSIT_OUTBOX_BATCH_SIZE` | `outbox.batch_size` |
//! | `DEPOSIT_OUTBOX_MAX_ATTEMPTS` | `outbox.max_attempts` |
//! | `DEPOSIT_OUTBOX_LEASE_MS` | `outbox.lease_ms` |
//! | `DEPOSIT_OUTBOX_POLL_MS` | `outbox.poll_interval_ms` |
//! | `DEPOSIT_OUTBOX_RETENTION_SECS` | `outbox.retention_secs` |
//! | `DEPOSIT_OUTBOX_PURGE_MS` | `outbox.purge_interval_ms` |
//! | `DEPOSIT_RECORD_SENT_EVENTS` | `record_sent_events` |
//! | `DEPOSIT_LISTENER_POLL_MS` | `listener_poll_interval_ms` |
//! | `DEPOSIT_LOCK_TIMEOUT_MS` | `lock_timeout_ms` |
//! | `DEPOSIT_WITHDRAWAL_TIMEOUT_SECS` | `withdrawal_timeout_secs` |
//! | `DEPOSIT_CHANNEL_<ROLE>` | channel name for a role, e.g. `DEPOSIT_CHANNEL_NEW_DEPOSIT` |

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::events::{Channel, ChannelNames};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to parse {key}: {value}")]
    Parse { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Invalid(String),
}

/// Outbox relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Messages claimed per drain.
    pub batch_size: usize,
    /// Send attempts before a message is dead-lettered.
    pub max_attempts: u32,
    /// How long a claimed message stays reserved for one worker.
    pub lease_ms: u64,
    pub poll_interval_ms: u64,
    /// How long published messages are kept before purging.
    pub retention_secs: u64,
    pub purge_interval_ms: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_attempts: 5,
            lease_ms: 30_000,
            poll_interval_ms: 20,
            retention_secs: 60 * 60,
            purge_interval_ms: 60_000,
        }
    }
}

impl OutboxConfig {
    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    pub channels: ChannelNames,
    pub outbox: OutboxConfig,
    pub listener_poll_interval_ms: u64,
    pub lock_timeout_ms: u64,
    /// Age after which a pending withdrawal is reconciled.
    pub withdrawal_timeout_secs: u64,
    /// Keep every event sent on the in-memory bus for inspection.
    pub record_sent_events: bool,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            channels: ChannelNames::default(),
            outbox: OutboxConfig::default(),
            listener_poll_interval_ms: 20,
            lock_timeout_ms: 5_000,
            withdrawal_timeout_secs: 15 * 60,
            record_sent_events: false,
        }
    }
}

impl DepositConfig {
    /// Defaults overlaid with `DEPOSIT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, then validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        overlay(&lookup, "DEPOSIT_OUTBOX_BATCH_SIZE", &mut config.outbox.batch_size)?;
        overlay(&lookup, "DEPOSIT_OUTBOX_MAX_ATTEMPTS", &mut config.outbox.max_attempts)?;
        overlay(&lookup, "DEPOSIT_OUTBOX_LEASE_MS", &mut config.outbox.lease_ms)?;
        overlay(&lookup, "DEPOSIT_OUTBOX_POLL_MS", &mut config.outbox.poll_interval_ms)?;
        overlay(&lookup, "DEPOSIT_OUTBOX_RETENTION_SECS", &mut config.outbox.retention_secs)?;
        overlay(&lookup, "DEPOSIT_OUTBOX_PURGE_MS", &mut config.outbox.purge_interval_ms)?;
        overlay(&lookup, "DEPOSIT_RECORD_SENT_EVENTS", &mut config.record_sent_events)?;
        overlay(&lookup, "DEPOSIT_LISTENER_POLL_MS", &mut config.listener_poll_interval_ms)?;
        overlay(&lookup, "DEPOSIT_LOCK_TIMEOUT_MS", &mut config.lock_timeout_ms)?;
        overlay(
            &lookup,
            "DEPOSIT_WITHDRAWAL_TIMEOUT_SECS",
            &mut config.withdrawal_timeout_secs,
        )?;

        for channel in Channel::ALL {
            let key = format!(
                "DEPOSIT_CHANNEL_{}",
                channel.as_str().replace('-', "_").to_uppercase()
            );
            if let Some(name) = lookup(&key) {
                config.channels.set(channel, name);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbox.batch_size == 0 {
            return Err(ConfigError::Invalid("outbox batch size must be positive".into()));
        }
        if self.outbox.max_attempts == 0 {
            return Err(ConfigError::Invalid("outbox max attempts must be positive".into()));
        }
        if self.outbox.purge_interval_ms == 0 {
            return Err(ConfigError::Invalid("outbox purge interval must be positive".into()));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid("lock timeout must be positive".into()));
        }
        self.channels.validate()
    }

    pub fn listener_poll_interval(&self) -> Duration {
        Duration::from_millis(self.listener_poll_interval_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn withdrawal_timeout(&self) -> Duration {
        Duration::from_secs(self.withdrawal_timeout_secs)
    }
}

fn overlay<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::Parse {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}
