// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process bus transport.
//!
//! The local bus delivers between plugins living in the same host process.
//! It listens for registry load notifications, keeps every plugin that
//! exposes an [`Endpoint`] in a routing table keyed by [`PluginId`], and
//! serves directed sends by calling the endpoint directly. Broadcasts are
//! delivered concurrently, one spawned task per endpoint, and are not
//! awaited by the caller.
//!
//! Priority 0, so a bus handle prefers it over any socket transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use patchbay_core::{
    BusService, Endpoint, PatchbayError, Plugin, PluginId, PluginListener, ReplyStream, Settings,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Well-known identity of the local bus plugin.
pub const LOCAL_BUS_ID: PluginId =
    PluginId::from_uuid(uuid::uuid!("b49a64d6-8f06-4053-9e30-f5a237ee208a"));

/// Priority of the local bus. Lowest wins, so local delivery is preferred.
pub const LOCAL_BUS_PRIORITY: i32 = 0;

/// The in-process transport plugin.
pub struct LocalBus {
    settings: Settings,
    endpoints: RwLock<HashMap<PluginId, Arc<dyn Endpoint>>>,
    deliveries: TaskTracker,
}

impl LocalBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            settings: Settings::new(LOCAL_BUS_ID, "local_bus", "in-process message bus"),
            endpoints: RwLock::new(HashMap::new()),
            deliveries: TaskTracker::new(),
        })
    }

    /// Wait until every broadcast delivery spawned so far has finished.
    ///
    /// Broadcasts are fire-and-forget; tests use this to observe them
    /// deterministically.
    pub async fn flush(&self) {
        self.deliveries.close();
        self.deliveries.wait().await;
        self.deliveries.reopen();
    }

    /// Number of endpoints currently routed to.
    pub async fn endpoint_count(&self) -> usize {
        self.endpoints.read().await.len()
    }
}

#[async_trait]
impl Plugin for LocalBus {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn stop(&self) -> Result<(), PatchbayError> {
        // Let in-flight broadcast deliveries finish before teardown.
        self.deliveries.close();
        self.deliveries.wait().await;
        Ok(())
    }

    fn as_listener(self: Arc<Self>) -> Option<Arc<dyn PluginListener>> {
        Some(self)
    }

    fn as_bus_service(self: Arc<Self>) -> Option<Arc<dyn BusService>> {
        Some(self)
    }
}

#[async_trait]
impl PluginListener for LocalBus {
    async fn plugin_loaded(&self, plugin: Arc<dyn Plugin>) {
        let id = plugin.settings().id;
        let Some(endpoint) = plugin.as_endpoint() else {
            return;
        };
        self.endpoints.write().await.insert(id, endpoint);
        debug!(endpoint = %id, "endpoint routed on local bus");
    }
}

#[async_trait]
impl BusService for LocalBus {
    fn priority(&self) -> i32 {
        LOCAL_BUS_PRIORITY
    }

    async fn handle_broadcast(&self, msg: Value) {
        let endpoints: Vec<Arc<dyn Endpoint>> =
            self.endpoints.read().await.values().cloned().collect();
        for endpoint in endpoints {
            let msg = msg.clone();
            self.deliveries.spawn(async move {
                endpoint.handle_broadcast(msg).await;
            });
        }
    }

    async fn handle_message(
        &self,
        target: PluginId,
        msg: Value,
    ) -> Result<ReplyStream, PatchbayError> {
        let endpoint = self
            .endpoints
            .read()
            .await
            .get(&target)
            .cloned()
            .ok_or(PatchbayError::UnknownEndpoint { id: target })?;
        Ok(endpoint.handle_message(msg).await)
    }
}
