// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete Patchbay stack.
//!
//! Each test assembles an isolated node (registry, transports, endpoints)
//! over a temp socket directory. Tests are independent and order-insensitive.
//! A second registry sharing the same socket directory stands in for a remote
//! process where a test needs cross-node traffic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use patchbay_bus::{BusHandle, SendPolicy};
use patchbay_core::{Bus, Endpoint, Plugin, PluginId, PluginListener, Settings};
use patchbay_local_bus::LocalBus;
use patchbay_memstore::MemStore;
use patchbay_plugin::PluginRegistry;
use patchbay_storage::{StorageClient, MEMSTORE_ID};
use patchbay_test_utils::{MockEndpoint, RecordingListener};
use patchbay_unix_bus::UnixBus;
use serde_json::{json, Value};

/// A plugin that only sends: its listener capability is its bus handle, the
/// way a real client plugin carries one.
struct BusClient {
    settings: Settings,
    bus: Arc<BusHandle>,
}

impl BusClient {
    fn new(name: &str, policy: SendPolicy) -> Arc<Self> {
        Arc::new(Self {
            settings: Settings::new(PluginId::new(), name, "bus client"),
            bus: BusHandle::with_policy(policy),
        })
    }

    fn bus(&self) -> Arc<BusHandle> {
        Arc::clone(&self.bus)
    }
}

#[async_trait]
impl Plugin for BusClient {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn as_listener(self: Arc<Self>) -> Option<Arc<dyn PluginListener>> {
        Some(Arc::clone(&self.bus) as Arc<dyn PluginListener>)
    }
}

async fn eventually<F>(mut check: F) -> bool
where
    F: AsyncFnMut() -> bool,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ---- Replay completeness ----

#[tokio::test]
async fn test_listener_sees_every_endpoint_regardless_of_load_order() {
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let registry = PluginRegistry::new();
        let watcher = RecordingListener::new("watcher");
        let alpha = MockEndpoint::new("alpha");
        let beta = MockEndpoint::new("beta");
        let plugins: Vec<Arc<dyn Plugin>> =
            vec![watcher.clone(), alpha.clone(), beta.clone()];

        for slot in order {
            registry.register(Arc::clone(&plugins[slot])).await;
        }

        let seen = watcher.seen().await;
        let count = |name: &str| seen.iter().filter(|n| n.as_str() == name).count();
        assert_eq!(count("alpha"), 1, "order {order:?}: {seen:?}");
        assert_eq!(count("beta"), 1, "order {order:?}: {seen:?}");
        assert_eq!(count("watcher"), 0, "a listener never hears about itself");
    }
}

// ---- Priority ordering ----

#[tokio::test]
async fn test_local_transport_preferred_over_unix_regardless_of_arrival() {
    let dir = tempfile::tempdir().unwrap();
    let registry = PluginRegistry::new();
    let local = LocalBus::new();
    let client = BusClient::new("client", SendPolicy::First);

    // The unix transport arrives first; the sorted handle must still put
    // the local transport ahead of it.
    registry.register(UnixBus::new(dir.path()).unwrap()).await;
    registry.register(local.clone()).await;
    registry.register(client.clone()).await;

    // Reachable in-process only: no socket file exists for this endpoint,
    // so a misordered handle would dial into nothing and abandon the send.
    let endpoint = MockEndpoint::with_replies("pong", vec![json!("pong")]);
    local
        .plugin_loaded(endpoint.clone() as Arc<dyn Plugin>)
        .await;

    let replies: Vec<Value> = client
        .bus()
        .send(endpoint.id(), json!("ping"))
        .await
        .expect("local transport should deliver")
        .collect()
        .await;
    assert_eq!(replies, vec![json!("pong")]);
}

// ---- Local round-trip ----

#[tokio::test]
async fn test_local_send_replies_in_endpoint_order() {
    let registry = PluginRegistry::new();
    registry.register(LocalBus::new()).await;
    let client = BusClient::new("client", SendPolicy::First);
    registry.register(client.clone()).await;

    let endpoint = MockEndpoint::with_replies(
        "multi",
        vec![json!(1), json!("two"), json!({"three": 3})],
    );
    registry.register(endpoint.clone()).await;

    let replies: Vec<Value> = client
        .bus()
        .send(endpoint.id(), json!("go"))
        .await
        .expect("in-process endpoint should be reachable")
        .collect()
        .await;

    assert_eq!(replies, vec![json!(1), json!("two"), json!({"three": 3})]);
    assert_eq!(endpoint.messages().await, vec![json!("go")]);
}

// ---- Socket round-trip (protocol transparency) ----

#[tokio::test]
async fn test_socket_send_matches_direct_endpoint_response() {
    let dir = tempfile::tempdir().unwrap();

    // Server node: endpoint reachable through the socket transport only.
    let server = PluginRegistry::new();
    server.register(UnixBus::new(dir.path()).unwrap()).await;
    let endpoint =
        MockEndpoint::with_replies("store", vec![json!({"status": "ok"}), json!(2)]);
    server.register(endpoint.clone()).await;

    // Client node: its own unix transport over the shared directory.
    let client_node = PluginRegistry::new();
    client_node
        .register(UnixBus::new(dir.path()).unwrap())
        .await;
    let client = BusClient::new("client", SendPolicy::First);
    client_node.register(client.clone()).await;

    let payload = json!({"kind": "read", "path": "/x"});
    let over_socket: Vec<Value> = client
        .bus()
        .send(endpoint.id(), payload.clone())
        .await
        .expect("socket transport should deliver")
        .collect()
        .await;

    let direct: Vec<Value> = endpoint.handle_message(payload).await.collect().await;
    assert_eq!(over_socket, direct);
}

// ---- Broadcast fan-out, local ----

#[tokio::test]
async fn test_local_broadcast_reaches_every_endpoint() {
    let registry = PluginRegistry::new();
    let local = LocalBus::new();
    registry.register(local.clone()).await;
    let client = BusClient::new("client", SendPolicy::First);
    registry.register(client.clone()).await;

    let endpoints: Vec<_> = (0..3)
        .map(|i| MockEndpoint::new(&format!("ep{i}")))
        .collect();
    for endpoint in &endpoints {
        registry.register(endpoint.clone()).await;
    }

    client.bus().broadcast(json!({"event": "tick"})).await;
    local.flush().await;

    for endpoint in &endpoints {
        assert_eq!(endpoint.broadcasts().await, vec![json!({"event": "tick"})]);
    }
}

// ---- Broadcast fan-out, socket ----

#[tokio::test]
async fn test_socket_broadcast_reaches_live_sockets_and_skips_strays() {
    let dir = tempfile::tempdir().unwrap();

    let server = PluginRegistry::new();
    server.register(UnixBus::new(dir.path()).unwrap()).await;
    let first = MockEndpoint::new("first");
    let second = MockEndpoint::new("second");
    server.register(first.clone()).await;
    server.register(second.clone()).await;

    // Neither of these is a dialable peer; the discovery walk must skip both.
    std::fs::write(dir.path().join("not-a-uuid.sock"), b"junk").unwrap();
    std::fs::write(dir.path().join("README.txt"), b"junk").unwrap();

    let client_node = PluginRegistry::new();
    client_node
        .register(UnixBus::new(dir.path()).unwrap())
        .await;
    let client = BusClient::new("client", SendPolicy::First);
    client_node.register(client.clone()).await;

    client.bus().broadcast(json!("fanout")).await;

    assert!(
        eventually(async || {
            first.broadcast_count().await == 1 && second.broadcast_count().await == 1
        })
        .await,
        "both live endpoints should receive the broadcast"
    );
}

// ---- Unreachable target ----

#[tokio::test]
async fn test_send_to_unknown_identity_yields_no_stream() {
    let dir = tempfile::tempdir().unwrap();
    let registry = PluginRegistry::new();
    registry.register(LocalBus::new()).await;
    registry.register(UnixBus::new(dir.path()).unwrap()).await;
    let first = BusClient::new("first", SendPolicy::First);
    let cascade = BusClient::new("cascade", SendPolicy::Cascade);
    registry.register(first.clone()).await;
    registry.register(cascade.clone()).await;

    let nobody = PluginId::new();
    assert!(first.bus().send(nobody, json!("hello")).await.is_none());
    assert!(cascade.bus().send(nobody, json!("hello")).await.is_none());
}

// ---- Send policies across transports ----

#[tokio::test]
async fn test_cascade_reaches_socket_endpoint_where_first_gives_up() {
    let dir = tempfile::tempdir().unwrap();

    // The endpoint lives behind the socket transport of another node.
    let server = PluginRegistry::new();
    server.register(UnixBus::new(dir.path()).unwrap()).await;
    let endpoint = MockEndpoint::with_replies("remote", vec![json!("from afar")]);
    server.register(endpoint.clone()).await;

    // The client node has both transports; in-process lookup fails first.
    let client_node = PluginRegistry::new();
    client_node.register(LocalBus::new()).await;
    client_node
        .register(UnixBus::new(dir.path()).unwrap())
        .await;
    let first = BusClient::new("first", SendPolicy::First);
    let cascade = BusClient::new("cascade", SendPolicy::Cascade);
    client_node.register(first.clone()).await;
    client_node.register(cascade.clone()).await;

    // First policy: the local transport does not know the endpoint, and its
    // failure abandons the send.
    assert!(first.bus().send(endpoint.id(), json!("hi")).await.is_none());

    // Cascade policy: the walk falls through to the socket transport.
    let replies: Vec<Value> = cascade
        .bus()
        .send(endpoint.id(), json!("hi"))
        .await
        .expect("cascade should fall through to the unix transport")
        .collect()
        .await;
    assert_eq!(replies, vec![json!("from afar")]);
}

// ---- Duplicate broadcast delivery ----

#[tokio::test]
async fn test_dually_reachable_endpoint_hears_broadcast_twice() {
    let dir = tempfile::tempdir().unwrap();
    let registry = PluginRegistry::new();
    let local = LocalBus::new();
    registry.register(local.clone()).await;
    registry.register(UnixBus::new(dir.path()).unwrap()).await;
    let client = BusClient::new("client", SendPolicy::First);
    registry.register(client.clone()).await;

    // Registered on both transports: in-process and behind a socket file.
    let endpoint = MockEndpoint::new("both");
    registry.register(endpoint.clone()).await;

    client.bus().broadcast(json!("ping")).await;
    local.flush().await;

    // At-least-once: one delivery per transport that can reach it.
    assert!(
        eventually(async || endpoint.broadcast_count().await == 2).await,
        "expected one local and one socket delivery"
    );
}

// ---- Graceful shutdown ----

#[tokio::test]
async fn test_stop_all_closes_sockets_and_refuses_connections() {
    let dir = tempfile::tempdir().unwrap();
    let registry = PluginRegistry::new();
    registry.register(UnixBus::new(dir.path()).unwrap()).await;
    let endpoint = MockEndpoint::new("closing");
    registry.register(endpoint.clone()).await;

    let socket_path = dir.path().join(format!("{}.sock", endpoint.id()));
    assert!(socket_path.exists());

    let cancel = tokio_util::sync::CancellationToken::new();
    registry.start_all(&cancel).await.unwrap();
    registry.stop_all(&cancel).await;

    assert!(!socket_path.exists(), "socket file should be removed on stop");
    assert!(
        tokio::net::UnixStream::connect(&socket_path).await.is_err(),
        "stopped transport should refuse connections"
    );
}

// ---- Hello World scenario ----

#[tokio::test]
async fn test_write_then_read_hello_world_in_process() {
    let registry = PluginRegistry::new();
    registry.register(LocalBus::new()).await;
    let client = BusClient::new("client", SendPolicy::First);
    registry.register(client.clone()).await;
    registry.register(MemStore::new()).await;

    let storage = StorageClient::new(MEMSTORE_ID, client.bus());
    storage.write("/path", json!("Hello World")).await;

    assert_eq!(
        storage.read_value("/path").await,
        Some(json!("Hello World"))
    );
}

#[tokio::test]
async fn test_write_then_read_hello_world_over_socket() {
    let dir = tempfile::tempdir().unwrap();

    // Storage node.
    let server = PluginRegistry::new();
    server.register(UnixBus::new(dir.path()).unwrap()).await;
    server.register(MemStore::new()).await;

    // Client node, socket transport only.
    let client_node = PluginRegistry::new();
    client_node
        .register(UnixBus::new(dir.path()).unwrap())
        .await;
    let client = BusClient::new("client", SendPolicy::First);
    client_node.register(client.clone()).await;

    let storage = StorageClient::new(MEMSTORE_ID, client.bus());
    storage.write("/path", json!("Hello World")).await;

    assert_eq!(
        storage.read_value("/path").await,
        Some(json!("Hello World"))
    );
}
