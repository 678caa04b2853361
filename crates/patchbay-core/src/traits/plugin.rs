// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base plugin trait and the load-notification listener capability.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PatchbayError;
use crate::traits::bus::BusService;
use crate::traits::endpoint::Endpoint;
use crate::types::Settings;

/// The base trait every Patchbay plugin implements.
///
/// Lifecycle: constructed by a module factory, registered with the plugin
/// registry, `start` invoked once, runs until the shared shutdown token is
/// cancelled, `stop` invoked once during teardown.
///
/// Optional capabilities are opted into through the `as_*` accessors rather
/// than runtime type probing: a plugin that wants to receive bus traffic
/// overrides [`as_endpoint`](Plugin::as_endpoint), a transport overrides
/// [`as_bus_service`](Plugin::as_bus_service), and anything interested in
/// other plugins' arrival overrides [`as_listener`](Plugin::as_listener).
/// The registry probes each accessor exactly once, at registration time.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns the plugin's immutable identity and metadata.
    fn settings(&self) -> &Settings;

    /// Starts the plugin. Must return promptly; long-running work is spawned
    /// internally and must observe `cancel`.
    async fn start(&self, cancel: CancellationToken) -> Result<(), PatchbayError> {
        let _ = cancel;
        Ok(())
    }

    /// Stops the plugin, releasing any held resources.
    async fn stop(&self) -> Result<(), PatchbayError> {
        Ok(())
    }

    /// Returns the load-notification listener view of this plugin, if any.
    fn as_listener(self: Arc<Self>) -> Option<Arc<dyn PluginListener>> {
        None
    }

    /// Returns the bus endpoint view of this plugin, if any.
    fn as_endpoint(self: Arc<Self>) -> Option<Arc<dyn Endpoint>> {
        None
    }

    /// Returns the bus transport view of this plugin, if any.
    fn as_bus_service(self: Arc<Self>) -> Option<Arc<dyn BusService>> {
        None
    }
}

impl std::fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("settings", self.settings())
            .finish_non_exhaustive()
    }
}

/// Capability to be told about newly registered plugins.
///
/// Listeners registered before a plugin loads are notified of it; a listener
/// registering later has every earlier plugin replayed to it first, so every
/// listener ends up with a complete view regardless of load order.
#[async_trait]
pub trait PluginListener: Send + Sync {
    /// Called once per registered plugin, in registration order.
    async fn plugin_loaded(&self, plugin: Arc<dyn Plugin>);
}
