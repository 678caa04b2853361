// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Patchbay workspace.

use std::pin::Pin;
use std::str::FromStr;

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Globally unique identity of a plugin.
///
/// Stable for the plugin's lifetime. Used as the bus routing key and as the
/// socket file basename for the cross-process transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(Uuid);

impl PluginId {
    /// Generates a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID, for well-known identities.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PluginId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PluginId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Immutable identity and metadata record of a plugin.
///
/// Created once at plugin construction and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Routing identity of the plugin.
    pub id: PluginId,
    /// Registration name. Registry entries are keyed by this.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

impl Settings {
    pub fn new(id: PluginId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A lazy, possibly empty, possibly multi-valued sequence of reply payloads
/// produced by one directed send.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

/// Returns a reply stream that yields nothing.
pub fn empty_reply_stream() -> ReplyStream {
    Box::pin(futures::stream::empty())
}

/// Returns a reply stream that yields a single value.
pub fn reply_stream_once(value: Value) -> ReplyStream {
    Box::pin(futures::stream::iter([value]))
}

/// Returns a reply stream over a fixed sequence of values.
pub fn reply_stream_from_values(values: Vec<Value>) -> ReplyStream {
    Box::pin(futures::stream::iter(values))
}
