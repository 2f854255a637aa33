//! # mirror-settings
//!
//! Configuration for the directory mirror, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`MirrorSettings::default()`]
//! 2. **User file**: `~/.mirror/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `MIRROR_*` overrides (highest priority)
//!
//! There is no global instance: the host loads settings once and passes them
//! to each `DirectorySync` it builds.
//!
//! Logging is the one section the mirror never reads itself. The host installs
//! the subscriber at startup with
//! `mirror_core::logging::init_subscriber(&settings.logging.level)`, and
//! `RUST_LOG` still overrides the configured level.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
