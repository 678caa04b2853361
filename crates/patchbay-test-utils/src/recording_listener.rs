// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listener plugin that records registry load notifications.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use patchbay_core::{Plugin, PluginId, PluginListener, Settings};

/// A plugin whose only capability is listening for arrivals.
///
/// Registered with a registry, it records the name of every plugin it is
/// notified about, in notification order.
pub struct RecordingListener {
    settings: Settings,
    seen: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            settings: Settings::new(PluginId::new(), name, "recording listener"),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Names of the plugins seen so far, in notification order.
    pub async fn seen(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Plugin for RecordingListener {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn as_listener(self: Arc<Self>) -> Option<Arc<dyn PluginListener>> {
        Some(self)
    }
}

#[async_trait]
impl PluginListener for RecordingListener {
    async fn plugin_loaded(&self, plugin: Arc<dyn Plugin>) {
        self.seen.lock().await.push(plugin.settings().name.clone());
    }
}
