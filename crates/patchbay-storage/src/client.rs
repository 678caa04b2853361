// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus-backed storage client.
//!
//! The client is what a plugin embeds to use storage. It addresses one
//! storage endpoint by identity and speaks [`StorageRequest`] payloads over
//! whatever bus handle it is given; it neither knows nor cares which
//! transport carries the request or which process serves it.

use std::sync::Arc;

use futures::StreamExt;
use patchbay_core::{empty_reply_stream, Bus, PluginId, ReplyStream};
use serde_json::Value;
use tracing::warn;

use crate::protocol::{StorageRequest, MEMSTORE_ID};

/// Client for one storage endpoint.
#[derive(Clone)]
pub struct StorageClient {
    target: PluginId,
    bus: Arc<dyn Bus>,
}

impl StorageClient {
    /// Create a client addressing the storage endpoint with identity `target`.
    pub fn new(target: PluginId, bus: Arc<dyn Bus>) -> Self {
        Self { target, bus }
    }

    /// Create a client addressing the well-known in-memory store.
    pub fn memstore(bus: Arc<dyn Bus>) -> Self {
        Self::new(MEMSTORE_ID, bus)
    }

    /// Identity of the storage endpoint this client addresses.
    pub fn target(&self) -> PluginId {
        self.target
    }

    /// Read the value stored under `path`.
    ///
    /// Yields one value, `null` when nothing is stored there. When no
    /// transport can reach the store the stream is empty and a warning is
    /// logged.
    pub async fn read(&self, path: &str) -> ReplyStream {
        let payload = StorageRequest::Read {
            path: path.to_string(),
        }
        .to_value();
        match self.bus.send(self.target, payload).await {
            Some(replies) => replies,
            None => {
                warn!(target = %self.target, path, "storage read undeliverable");
                empty_reply_stream()
            }
        }
    }

    /// Read the value stored under `path`, resolved to a single value.
    pub async fn read_value(&self, path: &str) -> Option<Value> {
        self.read(path).await.next().await
    }

    /// Store `value` under `path`, replacing any earlier value.
    ///
    /// Completion is observable: the call returns once the store has
    /// acknowledged the request by closing its reply stream.
    pub async fn write(&self, path: &str, value: Value) {
        let payload = StorageRequest::Write {
            path: path.to_string(),
            value,
        }
        .to_value();
        match self.bus.send(self.target, payload).await {
            Some(mut replies) => while replies.next().await.is_some() {},
            None => warn!(target = %self.target, path, "storage write undeliverable"),
        }
    }
}
