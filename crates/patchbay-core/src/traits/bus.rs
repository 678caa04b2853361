// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus transport and client-side bus capability traits.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PatchbayError;
use crate::types::{PluginId, ReplyStream};

/// One concrete delivery mechanism for bus traffic.
///
/// Transports are ranked by [`priority`](BusService::priority); the client
/// capability keeps them sorted ascending and prefers the lowest value for
/// directed sends.
#[async_trait]
pub trait BusService: Send + Sync {
    /// Returns the fixed priority of this transport.
    fn priority(&self) -> i32;

    /// Delivers a broadcast through this transport. Best-effort.
    async fn handle_broadcast(&self, msg: Value);

    /// Delivers a directed message to `target` through this transport.
    ///
    /// Fails with [`PatchbayError::UnknownEndpoint`] or
    /// [`PatchbayError::UnreachableEndpoint`] when the transport cannot
    /// resolve the identity.
    async fn handle_message(&self, target: PluginId, msg: Value)
    -> Result<ReplyStream, PatchbayError>;
}

/// Client-side bus capability: what a sending plugin holds.
///
/// Aggregates all known transports and turns a logical broadcast or send
/// into a transport call. A send that no transport delivers yields no
/// stream; callers treat `None` as "send did not happen".
#[async_trait]
pub trait Bus: Send + Sync {
    /// Broadcasts `msg` through every known transport.
    async fn broadcast(&self, msg: Value);

    /// Sends `msg` to the plugin identified by `target`.
    async fn send(&self, target: PluginId, msg: Value) -> Option<ReplyStream>;
}
