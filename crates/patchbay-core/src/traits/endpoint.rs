// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Endpoint capability: the minimal contract for receiving bus traffic.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::ReplyStream;

/// Capability to receive broadcast and directed bus traffic.
///
/// An endpoint has no identity of its own beyond the owning plugin's
/// [`PluginId`](crate::types::PluginId). Any plugin wanting bus connectivity
/// need only implement this pair of handlers.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Handles a broadcast. No reply is possible.
    async fn handle_broadcast(&self, msg: Value);

    /// Handles a directed message, returning a lazy reply stream.
    ///
    /// The stream may be empty. Values are delivered to the sender in the
    /// order produced.
    async fn handle_message(&self, msg: Value) -> ReplyStream;
}
