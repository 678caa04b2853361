// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Patchbay host.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Patchbay configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to a host that
/// carries both transports and the in-memory store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatchbayConfig {
    /// Host runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Bus transport settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// In-memory storage plugin settings.
    #[serde(default)]
    pub memstore: MemstoreConfig,
}

/// Host runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory walked recursively for loadable plugin modules.
    /// Unset, the host runs its compiled-in plugins only.
    #[serde(default)]
    pub module_dir: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            module_dir: None,
        }
    }
}

/// Bus transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// How a directed send picks among transports: `first` tries only the
    /// preferred transport, `cascade` walks them in priority order.
    #[serde(default = "default_send_policy")]
    pub send_policy: String,

    /// Whether the in-process transport is loaded.
    #[serde(default = "default_enabled")]
    pub local_enabled: bool,

    /// Whether the unix socket transport is loaded.
    #[serde(default = "default_enabled")]
    pub unix_enabled: bool,

    /// Directory holding the per-endpoint listener sockets. Shared by every
    /// host that should be reachable over the unix transport.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            send_policy: default_send_policy(),
            local_enabled: default_enabled(),
            unix_enabled: default_enabled(),
            socket_dir: default_socket_dir(),
        }
    }
}

/// In-memory storage plugin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemstoreConfig {
    /// Whether the in-memory store is loaded.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for MemstoreConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_send_policy() -> String {
    "first".to_string()
}

fn default_socket_dir() -> String {
    "/tmp/patchbay".to_string()
}

fn default_enabled() -> bool {
    true
}
