// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock bus for testing sending-side code without any transport.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use patchbay_core::{
    empty_reply_stream, reply_stream_from_values, Bus, PluginId, ReplyStream,
};

/// A mock `Bus` that records traffic instead of delivering it.
///
/// Directed sends answer with queued reply sets: each call to
/// [`queue_replies`](MockBus::queue_replies) enqueues the replies for one
/// future send, consumed in order. With the queue empty a send yields an
/// empty stream, and a bus created with [`unreachable`](MockBus::unreachable)
/// yields `None`, as a handle with no transports would.
pub struct MockBus {
    reachable: bool,
    broadcasts: Mutex<Vec<Value>>,
    sent: Mutex<Vec<(PluginId, Value)>>,
    replies: Mutex<VecDeque<Vec<Value>>>,
}

impl MockBus {
    /// Create a mock bus that accepts every send.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reachable: true,
            broadcasts: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        })
    }

    /// Create a mock bus on which every send fails to route.
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            reachable: false,
            broadcasts: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        })
    }

    /// Enqueue the reply set for one future directed send.
    pub async fn queue_replies(&self, replies: Vec<Value>) {
        self.replies.lock().await.push_back(replies);
    }

    /// All broadcast payloads recorded so far.
    pub async fn broadcasts(&self) -> Vec<Value> {
        self.broadcasts.lock().await.clone()
    }

    /// All directed sends recorded so far, as `(target, payload)` pairs.
    pub async fn sent(&self) -> Vec<(PluginId, Value)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Bus for MockBus {
    async fn broadcast(&self, msg: Value) {
        self.broadcasts.lock().await.push(msg);
    }

    async fn send(&self, target: PluginId, msg: Value) -> Option<ReplyStream> {
        if !self.reachable {
            return None;
        }
        self.sent.lock().await.push((target, msg));
        match self.replies.lock().await.pop_front() {
            Some(replies) => Some(reply_stream_from_values(replies)),
            None => Some(empty_reply_stream()),
        }
    }
}
