// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./patchbay.toml` > `~/.config/patchbay/patchbay.toml`
//! > `/etc/patchbay/patchbay.toml`, with environment variable overrides via the
//! `PATCHBAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PatchbayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/patchbay/patchbay.toml` (system-wide)
/// 3. `~/.config/patchbay/patchbay.toml` (user XDG config)
/// 4. `./patchbay.toml` (local directory)
/// 5. `PATCHBAY_*` environment variables
pub fn load_config() -> Result<PatchbayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PatchbayConfig::default()))
        .merge(Toml::file("/etc/patchbay/patchbay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("patchbay/patchbay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("patchbay.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used in tests and anywhere the full file chain is unwanted.
pub fn load_config_from_str(toml_content: &str) -> Result<PatchbayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PatchbayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PatchbayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PatchbayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay intact: `PATCHBAY_BUS_SOCKET_DIR` must map to
/// `bus.socket_dir`, not `bus.socket.dir`.
fn env_provider() -> Env {
    Env::prefixed("PATCHBAY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: PATCHBAY_BUS_SEND_POLICY -> "bus_send_policy"
        let mapped = key
            .as_str()
            .replacen("runtime_", "runtime.", 1)
            .replacen("bus_", "bus.", 1)
            .replacen("memstore_", "memstore.", 1);
        mapped.into()
    })
}
