// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage plugin.
//!
//! An endpoint answering [`StorageRequest`] payloads out of a process-local
//! map. Contents do not survive a restart; the plugin exists so hosts have
//! a storage endpoint to talk to before a persistent store is wired in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use patchbay_core::{
    empty_reply_stream, reply_stream_once, Endpoint, Plugin, ReplyStream, Settings,
};
use patchbay_storage::{StorageRequest, MEMSTORE_ID};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// The in-memory storage plugin.
///
/// Registered under the well-known identity [`MEMSTORE_ID`], so any
/// [`StorageClient`](patchbay_storage::client::StorageClient) built with
/// `memstore()` reaches it without configuration.
pub struct MemStore {
    settings: Settings,
    disk: RwLock<HashMap<String, Value>>,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            settings: Settings::new(MEMSTORE_ID, "memstore", "in-memory storage"),
            disk: RwLock::new(HashMap::new()),
        })
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.disk.read().await.len()
    }

    /// Returns true when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.disk.read().await.is_empty()
    }
}

#[async_trait]
impl Plugin for MemStore {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn as_endpoint(self: Arc<Self>) -> Option<Arc<dyn Endpoint>> {
        Some(self)
    }
}

#[async_trait]
impl Endpoint for MemStore {
    async fn handle_broadcast(&self, _msg: Value) {
        // Storage has no interest in broadcast traffic.
    }

    async fn handle_message(&self, msg: Value) -> ReplyStream {
        match serde_json::from_value::<StorageRequest>(msg) {
            Ok(StorageRequest::Read { path }) => {
                let value = self
                    .disk
                    .read()
                    .await
                    .get(&path)
                    .cloned()
                    .unwrap_or(Value::Null);
                debug!(path = %path, "storage read");
                reply_stream_once(value)
            }
            Ok(StorageRequest::Write { path, value }) => {
                self.disk.write().await.insert(path.clone(), value);
                debug!(path = %path, "storage write");
                empty_reply_stream()
            }
            Err(e) => {
                warn!(error = %e, "invalid storage request");
                empty_reply_stream()
            }
        }
    }
}
