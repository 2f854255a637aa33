//! Settings type definitions.
//!
//! All types use camelCase JSON names and `#[serde(default)]`, so a partial
//! settings file only needs the keys it changes.

use serde::{Deserialize, Serialize};

/// Root settings for a directory mirror.
///
/// ```json
/// { "dedup": { "maxSize": 5000 }, "reconcile": { "windowMs": 30000 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorSettings {
    /// Event deduplication.
    pub dedup: DedupSettings,
    /// Optimistic message reconciliation.
    pub reconcile: ReconcileSettings,
    /// Change notification channel.
    pub notifications: NotificationSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Deduplicator sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupSettings {
    /// Number of recent event IDs remembered.
    pub max_size: usize,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self { max_size: 1000 }
    }
}

/// Matching rules for optimistic placeholders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileSettings {
    /// Largest gap (ms) between a placeholder's and the canonical message's
    /// creation time for the two to be considered the same message.
    pub window_ms: i64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self { window_ms: 120_000 }
    }
}

/// Broadcast channel sizing for store change notifications.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    /// Buffered notifications per subscriber before it starts lagging.
    pub channel_capacity: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset. Handed by the host
    /// to `mirror_core::logging::init_subscriber`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
