// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage request protocol.
//!
//! Storage plugins are ordinary endpoints; these are the payloads they
//! understand. Requests travel as tagged JSON objects so they survive any
//! transport the bus routes them over.

use patchbay_core::PluginId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known identity of the in-memory storage plugin.
pub const MEMSTORE_ID: PluginId =
    PluginId::from_uuid(uuid::uuid!("a700a163-bdfe-4ae4-a357-e5e28389c3e7"));

/// A request to a storage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageRequest {
    /// Fetch the value stored under `path`. Answered with one reply, the
    /// stored value or `null` when nothing is stored there.
    Read { path: String },
    /// Store `value` under `path`, replacing any earlier value. Answered
    /// with an empty reply stream.
    Write { path: String, value: Value },
}

impl StorageRequest {
    /// Serialize into the bus payload form.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("StorageRequest is always JSON-serializable")
    }
}
