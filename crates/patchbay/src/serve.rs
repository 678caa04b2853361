// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `patchbay serve` command implementation.
//!
//! Wires the compiled-in plugins selected by configuration into a
//! `PluginRegistry`, starts them against a signal-driven shutdown token,
//! optionally loads dynamic modules from `runtime.module_dir`, and parks
//! until SIGINT or SIGTERM.

use std::path::Path;

use patchbay_bus::SendPolicy;
use patchbay_config::model::PatchbayConfig;
use patchbay_core::{shutdown, PatchbayError};
use patchbay_local_bus::LocalBus;
use patchbay_memstore::MemStore;
use patchbay_plugin::PluginRegistry;
use patchbay_unix_bus::UnixBus;
use tracing::info;

/// Runs the `patchbay serve` command.
///
/// Registers the local bus, unix bus, and memstore plugins according to
/// their config switches, in that order, then starts everything and waits
/// for a shutdown signal. Dynamic modules under `runtime.module_dir` are
/// loaded after the compiled-in plugins are up.
pub async fn run_serve(config: PatchbayConfig) -> Result<(), PatchbayError> {
    init_tracing(&config.runtime.log_level);

    // Validation already vetted the policy string; the parse here yields the
    // typed policy that host-constructed bus handles run with.
    let policy: SendPolicy = config.bus.send_policy.parse()?;
    info!(policy = %policy, "starting patchbay serve");

    let registry = build_registry();
    register_builtin_plugins(&registry, &config).await?;

    let cancel = shutdown::install_signal_handler();

    if let Err(e) = registry.start_all(&cancel).await {
        registry.stop_all(&cancel).await;
        return Err(e);
    }

    if let Some(dir) = &config.runtime.module_dir {
        if let Err(e) = load_modules(&registry, Path::new(dir), &cancel).await {
            registry.stop_all(&cancel).await;
            return Err(e);
        }
    }

    info!(plugins = registry.len().await, "patchbay node running");
    cancel.cancelled().await;

    registry.stop_all(&cancel).await;
    info!("patchbay serve shutdown complete");
    Ok(())
}

/// Registers the compiled-in plugins selected by configuration.
///
/// Order matters: transports first, so they hear about every endpoint
/// registered after them, then endpoints.
async fn register_builtin_plugins(
    registry: &PluginRegistry,
    config: &PatchbayConfig,
) -> Result<(), PatchbayError> {
    if config.bus.local_enabled {
        registry.register(LocalBus::new()).await;
    } else {
        info!("local bus disabled by configuration");
    }

    if config.bus.unix_enabled {
        let unix = UnixBus::new(config.bus.socket_dir.as_str())?;
        registry.register(unix).await;
    } else {
        info!("unix bus disabled by configuration");
    }

    if config.memstore.enabled {
        registry.register(MemStore::new()).await;
    } else {
        info!("memstore disabled by configuration");
    }

    Ok(())
}

#[cfg(feature = "dynload")]
fn build_registry() -> PluginRegistry {
    PluginRegistry::with_loader(std::sync::Arc::new(
        patchbay_plugin::DynamicModuleLoader::new(),
    ))
}

#[cfg(not(feature = "dynload"))]
fn build_registry() -> PluginRegistry {
    PluginRegistry::new()
}

#[cfg(feature = "dynload")]
async fn load_modules(
    registry: &PluginRegistry,
    dir: &Path,
    cancel: &tokio_util::sync::CancellationToken,
) -> Result<(), PatchbayError> {
    registry.load_all(dir, cancel).await
}

#[cfg(not(feature = "dynload"))]
async fn load_modules(
    _registry: &PluginRegistry,
    dir: &Path,
    _cancel: &tokio_util::sync::CancellationToken,
) -> Result<(), PatchbayError> {
    tracing::warn!(
        dir = %dir.display(),
        "runtime.module_dir is set but patchbay was built without dynamic module support"
    );
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("patchbay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(socket_dir: &Path) -> PatchbayConfig {
        let mut config = PatchbayConfig::default();
        config.bus.socket_dir = socket_dir.display().to_string();
        config
    }

    #[tokio::test]
    async fn default_config_wires_all_builtin_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry();
        let config = test_config(dir.path());

        register_builtin_plugins(&registry, &config).await.unwrap();

        assert_eq!(registry.len().await, 3);
        assert!(registry.get("local_bus").await.is_some());
        assert!(registry.get("unix_bus").await.is_some());
        assert!(registry.get("memstore").await.is_some());
    }

    #[tokio::test]
    async fn disabled_plugins_stay_out_of_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry();
        let mut config = test_config(dir.path());
        config.bus.unix_enabled = false;
        config.memstore.enabled = false;

        register_builtin_plugins(&registry, &config).await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert!(registry.get("local_bus").await.is_some());
        assert!(registry.get("unix_bus").await.is_none());
    }

    #[tokio::test]
    async fn wired_registry_starts_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry();
        let config = test_config(dir.path());
        register_builtin_plugins(&registry, &config).await.unwrap();

        let cancel = tokio_util::sync::CancellationToken::new();
        registry.start_all(&cancel).await.unwrap();
        registry.stop_all(&cancel).await;
        assert!(cancel.is_cancelled());
    }
}
