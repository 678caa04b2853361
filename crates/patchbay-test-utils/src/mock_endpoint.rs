// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock endpoint plugin for deterministic testing.
//!
//! `MockEndpoint` implements `Plugin` and `Endpoint` with captured traffic
//! and pre-configured replies, so bus and registry behavior can be asserted
//! without a real plugin in the loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use patchbay_core::{
    reply_stream_from_values, Endpoint, Plugin, PluginId, ReplyStream, Settings,
};

/// A mock endpoint plugin.
///
/// Captures two kinds of traffic:
/// - **broadcasts**: payloads passed to `handle_broadcast`, retrievable via `broadcasts()`
/// - **messages**: payloads passed to `handle_message`, retrievable via `messages()`
///
/// Every directed message is answered with the replies configured through
/// [`with_replies`](MockEndpoint::with_replies) (none by default).
pub struct MockEndpoint {
    settings: Settings,
    replies: Vec<Value>,
    broadcasts: Mutex<Vec<Value>>,
    messages: Mutex<Vec<Value>>,
}

impl MockEndpoint {
    /// Create a mock endpoint with a fresh identity and no canned replies.
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_replies(name, Vec::new())
    }

    /// Create a mock endpoint that answers every message with `replies`.
    pub fn with_replies(name: &str, replies: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            settings: Settings::new(PluginId::new(), name, "mock endpoint"),
            replies,
            broadcasts: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// Identity of this endpoint, for addressing sends at it.
    pub fn id(&self) -> PluginId {
        self.settings.id
    }

    /// All broadcast payloads received so far.
    pub async fn broadcasts(&self) -> Vec<Value> {
        self.broadcasts.lock().await.clone()
    }

    /// All directed payloads received so far.
    pub async fn messages(&self) -> Vec<Value> {
        self.messages.lock().await.clone()
    }

    /// Count of broadcast payloads received so far.
    pub async fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().await.len()
    }
}

#[async_trait]
impl Plugin for MockEndpoint {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn as_endpoint(self: Arc<Self>) -> Option<Arc<dyn Endpoint>> {
        Some(self)
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    async fn handle_broadcast(&self, msg: Value) {
        self.broadcasts.lock().await.push(msg);
    }

    async fn handle_message(&self, msg: Value) -> ReplyStream {
        self.messages.lock().await.push(msg);
        reply_stream_from_values(self.replies.clone())
    }
}
