// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-plugin bus handle.
//!
//! A `BusHandle` is what a sending plugin actually holds. Registered with
//! the plugin registry as a listener, it watches plugins arrive, keeps the
//! ones that are transports sorted by priority, and routes `broadcast` and
//! `send` calls over them. The owning plugin never learns which transports
//! exist or in which order they loaded.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use patchbay_core::{Bus, BusService, PatchbayError, Plugin, PluginId, PluginListener, ReplyStream};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// How a directed send picks among multiple transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPolicy {
    /// Try only the lowest-priority transport; a failure abandons the send.
    #[default]
    First,
    /// Walk transports in priority order until one accepts the message.
    Cascade,
}

impl FromStr for SendPolicy {
    type Err = PatchbayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(SendPolicy::First),
            "cascade" => Ok(SendPolicy::Cascade),
            other => Err(PatchbayError::Config(format!(
                "unknown send policy `{other}` (expected `first` or `cascade`)"
            ))),
        }
    }
}

impl std::fmt::Display for SendPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendPolicy::First => write!(f, "first"),
            SendPolicy::Cascade => write!(f, "cascade"),
        }
    }
}

/// Routing front end over every transport registered on the bus.
///
/// Transports are kept sorted ascending by [`BusService::priority`]; equal
/// priorities keep their registration order. Lower priority wins, so a local
/// in-process transport at priority 0 is preferred over a socket transport
/// at priority 100.
pub struct BusHandle {
    services: RwLock<Vec<Arc<dyn BusService>>>,
    policy: SendPolicy,
}

impl BusHandle {
    /// Create a handle with the default [`SendPolicy::First`].
    pub fn new() -> Arc<Self> {
        Self::with_policy(SendPolicy::default())
    }

    /// Create a handle with an explicit send policy.
    pub fn with_policy(policy: SendPolicy) -> Arc<Self> {
        Arc::new(Self {
            services: RwLock::new(Vec::new()),
            policy,
        })
    }

    /// Number of transports currently known to this handle.
    pub async fn service_count(&self) -> usize {
        self.services.read().await.len()
    }
}

#[async_trait]
impl PluginListener for BusHandle {
    async fn plugin_loaded(&self, plugin: Arc<dyn Plugin>) {
        let Some(service) = plugin.as_bus_service() else {
            return;
        };
        let mut services = self.services.write().await;
        services.push(service);
        // Stable sort, so same-priority transports stay in arrival order.
        services.sort_by_key(|s| s.priority());
        debug!(count = services.len(), "bus transport registered");
    }
}

#[async_trait]
impl Bus for BusHandle {
    async fn broadcast(&self, msg: Value) {
        let services = self.services.read().await.clone();
        for service in services {
            service.handle_broadcast(msg.clone()).await;
        }
    }

    async fn send(&self, target: PluginId, msg: Value) -> Option<ReplyStream> {
        let services = self.services.read().await.clone();
        if services.is_empty() {
            warn!(target = %target, "no bus service can deliver message");
            return None;
        }

        match self.policy {
            SendPolicy::First => {
                let service = &services[0];
                match service.handle_message(target, msg).await {
                    Ok(replies) => Some(replies),
                    Err(e) => {
                        warn!(
                            target = %target,
                            priority = service.priority(),
                            error = %e,
                            "send failed, abandoning message"
                        );
                        None
                    }
                }
            }
            SendPolicy::Cascade => {
                for service in &services {
                    match service.handle_message(target, msg.clone()).await {
                        Ok(replies) => return Some(replies),
                        Err(e) => {
                            debug!(
                                target = %target,
                                priority = service.priority(),
                                error = %e,
                                "transport declined send, trying next"
                            );
                        }
                    }
                }
                warn!(target = %target, "no transport accepted the message");
                None
            }
        }
    }
}
