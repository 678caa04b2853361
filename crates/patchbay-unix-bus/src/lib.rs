// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unix socket bus transport.
//!
//! Bridges plugins across host processes. For every local plugin that
//! exposes an [`Endpoint`], the bus binds a listener socket named after the
//! plugin's identity, `<socket_dir>/<uuid>.sock`, and serves one request
//! envelope per inbound connection. Outbound, a directed send dials the
//! target's socket and streams the `Result` envelopes back lazily; a
//! broadcast dials every socket in the directory, fire and forget.
//!
//! Any process sharing the socket directory joins the same bus, which is
//! how a sibling host reaches plugins it never loaded itself.
//!
//! Priority 100, so in-process delivery wins whenever both transports are
//! loaded.

pub mod wire;

use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use patchbay_core::{
    BusService, Endpoint, PatchbayError, Plugin, PluginId, PluginListener, ReplyStream, Settings,
};
use serde_json::Value;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::wire::{Envelope, EnvelopeKind};

/// Well-known identity of the unix bus plugin.
pub const UNIX_BUS_ID: PluginId =
    PluginId::from_uuid(uuid::uuid!("5ab218cd-a9d1-41a6-877d-5454af9994c2"));

/// Priority of the unix bus. Higher than the local bus, so it only carries
/// traffic the in-process transport cannot.
pub const UNIX_BUS_PRIORITY: i32 = 100;

/// The cross-process transport plugin.
pub struct UnixBus {
    settings: Settings,
    socket_dir: PathBuf,
    cancel: CancellationToken,
    loops: TaskTracker,
    deliveries: TaskTracker,
}

impl UnixBus {
    /// Create the transport over the given socket directory.
    ///
    /// The directory is created mode 0700 if missing; an existing directory
    /// keeps its permissions.
    pub fn new(socket_dir: impl Into<PathBuf>) -> Result<Arc<Self>, PatchbayError> {
        let socket_dir = socket_dir.into();
        if !socket_dir.exists() {
            std::fs::create_dir_all(&socket_dir).map_err(|e| PatchbayError::Transport {
                message: format!("cannot create socket directory {}", socket_dir.display()),
                source: Some(Box::new(e)),
            })?;
            std::fs::set_permissions(&socket_dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| PatchbayError::Transport {
                    message: format!(
                        "cannot restrict permissions on {}",
                        socket_dir.display()
                    ),
                    source: Some(Box::new(e)),
                })?;
        }
        Ok(Arc::new(Self {
            settings: Settings::new(UNIX_BUS_ID, "unix_bus", "unix socket message bus"),
            socket_dir,
            cancel: CancellationToken::new(),
            loops: TaskTracker::new(),
            deliveries: TaskTracker::new(),
        }))
    }

    fn socket_path(&self, id: PluginId) -> PathBuf {
        self.socket_dir.join(format!("{id}.sock"))
    }
}

#[async_trait]
impl Plugin for UnixBus {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn stop(&self) -> Result<(), PatchbayError> {
        self.cancel.cancel();
        // Accept loops exit first and remove their socket files, then any
        // in-flight connections and dials drain.
        self.loops.close();
        self.loops.wait().await;
        self.deliveries.close();
        self.deliveries.wait().await;
        info!("unix bus stopped");
        Ok(())
    }

    fn as_listener(self: Arc<Self>) -> Option<Arc<dyn PluginListener>> {
        Some(self)
    }

    fn as_bus_service(self: Arc<Self>) -> Option<Arc<dyn BusService>> {
        Some(self)
    }
}

#[async_trait]
impl PluginListener for UnixBus {
    async fn plugin_loaded(&self, plugin: Arc<dyn Plugin>) {
        let id = plugin.settings().id;
        let Some(endpoint) = plugin.as_endpoint() else {
            return;
        };

        let path = self.socket_path(id);
        // A stale socket file from a crashed run blocks the bind. Losing the
        // socket is not survivable for the host, matching a failed bind.
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                error!(path = %path.display(), error = %e, "cannot clear stale socket file");
                std::process::exit(1);
            }
        }
        let listener = match UnixListener::bind(&path) {
            Ok(listener) => listener,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot bind endpoint socket");
                std::process::exit(1);
            }
        };
        info!(endpoint = %id, path = %path.display(), "endpoint socket bound");

        let cancel = self.cancel.clone();
        let deliveries = self.deliveries.clone();
        self.loops.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _addr)) => {
                            deliveries.spawn(serve_connection(stream, Arc::clone(&endpoint)));
                        }
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "accept failed");
                            break;
                        }
                    },
                }
            }
            drop(listener);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "cannot remove socket file");
                }
            }
        });
    }
}

#[async_trait]
impl BusService for UnixBus {
    fn priority(&self) -> i32 {
        UNIX_BUS_PRIORITY
    }

    async fn handle_broadcast(&self, msg: Value) {
        let entries = match std::fs::read_dir(&self.socket_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.socket_dir.display(), error = %e, "cannot scan socket directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            // Socket files are `<uuid>.sock`; anything else in the
            // directory is not ours to dial.
            if path.extension().is_none_or(|ext| ext != "sock") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.parse::<PluginId>().is_err() {
                continue;
            }

            let envelope = Envelope::broadcast(msg.clone());
            self.deliveries.spawn(async move {
                if let Err(e) = deliver_broadcast(&path, envelope).await {
                    debug!(path = %path.display(), error = %e, "broadcast delivery skipped");
                }
            });
        }
    }

    async fn handle_message(
        &self,
        target: PluginId,
        msg: Value,
    ) -> Result<ReplyStream, PatchbayError> {
        let path = self.socket_path(target);
        let stream = UnixStream::connect(&path).await.map_err(|e| {
            PatchbayError::UnreachableEndpoint {
                id: target,
                source: Box::new(e),
            }
        })?;
        let mut framed = Framed::new(stream, wire::codec());
        framed
            .send(wire::encode(&Envelope::send(msg))?)
            .await
            .map_err(|e| PatchbayError::Transport {
                message: format!("cannot write send envelope to {}", path.display()),
                source: Some(Box::new(e)),
            })?;

        // Replies decode lazily as the consumer polls; dropping the stream
        // closes the connection and the peer stops producing.
        Ok(Box::pin(async_stream::stream! {
            let mut framed = framed;
            while let Some(next) = framed.next().await {
                let frame = match next {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(error = %e, "reply connection lost");
                        break;
                    }
                };
                let envelope = match wire::decode(&frame) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        debug!(error = %e, "undecodable reply, ending stream");
                        break;
                    }
                };
                match envelope.kind {
                    EnvelopeKind::Result => yield envelope.payload,
                    kind => warn!(?kind, "ignoring non-result envelope in reply stream"),
                }
            }
        }))
    }
}

/// Serve one inbound connection: read the single request envelope, dispatch
/// it, and for a `Send` stream the endpoint's replies back in order.
async fn serve_connection(stream: UnixStream, endpoint: Arc<dyn Endpoint>) {
    let mut framed = Framed::new(stream, wire::codec());
    let Some(Ok(frame)) = framed.next().await else {
        return;
    };
    let envelope = match wire::decode(&frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(error = %e, "undecodable request envelope, dropping connection");
            return;
        }
    };

    match envelope.kind {
        EnvelopeKind::Broadcast => endpoint.handle_broadcast(envelope.payload).await,
        EnvelopeKind::Send => {
            let mut replies = endpoint.handle_message(envelope.payload).await;
            while let Some(value) = replies.next().await {
                let frame = match wire::encode(&Envelope::result(value)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "cannot encode reply, closing connection");
                        break;
                    }
                };
                if let Err(e) = framed.send(frame).await {
                    debug!(error = %e, "peer stopped reading replies");
                    break;
                }
            }
        }
        EnvelopeKind::Result => {
            warn!("unexpected result envelope on inbound connection, dropping");
        }
    }
}

async fn deliver_broadcast(path: &Path, envelope: Envelope) -> Result<(), PatchbayError> {
    let stream = UnixStream::connect(path)
        .await
        .map_err(|e| PatchbayError::Transport {
            message: format!("cannot dial {}", path.display()),
            source: Some(Box::new(e)),
        })?;
    let mut framed = Framed::new(stream, wire::codec());
    framed
        .send(wire::encode(&envelope)?)
        .await
        .map_err(|e| PatchbayError::Transport {
            message: format!("cannot write broadcast envelope to {}", path.display()),
            source: Some(Box::new(e)),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::{reply_stream_from_values, reply_stream_once};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct EchoPlugin {
        settings: Settings,
        broadcasts: Arc<Mutex<Vec<Value>>>,
    }

    impl EchoPlugin {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                settings: Settings::new(PluginId::new(), name, "echo test endpoint"),
                broadcasts: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    #[async_trait]
    impl Plugin for EchoPlugin {
        fn settings(&self) -> &Settings {
            &self.settings
        }

        fn as_endpoint(self: Arc<Self>) -> Option<Arc<dyn Endpoint>> {
            Some(self)
        }
    }

    #[async_trait]
    impl Endpoint for EchoPlugin {
        async fn handle_broadcast(&self, msg: Value) {
            self.broadcasts.lock().await.push(msg);
        }

        async fn handle_message(&self, msg: Value) -> ReplyStream {
            match msg {
                Value::Array(values) => reply_stream_from_values(values),
                other => reply_stream_once(json!({ "echo": other })),
            }
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

    #[tokio::test]
    async fn binding_creates_a_socket_named_after_the_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let bus = UnixBus::new(dir.path()).unwrap();
        let echo = EchoPlugin::new("echo");
        let id = echo.settings.id;
        bus.plugin_loaded(echo).await;

        assert!(dir.path().join(format!("{id}.sock")).exists());
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn send_roundtrips_and_preserves_reply_order() {
        let dir = tempfile::tempdir().unwrap();
        let bus = UnixBus::new(dir.path()).unwrap();
        let echo = EchoPlugin::new("echo");
        let id = echo.settings.id;
        bus.plugin_loaded(echo).await;

        let replies = bus.handle_message(id, json!([1, 2, 3])).await.unwrap();
        let values: Vec<Value> = replies.collect().await;
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn sending_to_an_unbound_identity_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let bus = UnixBus::new(dir.path()).unwrap();
        let err = bus.handle_message(PluginId::new(), json!("hi")).await;
        assert!(matches!(
            err,
            Err(PatchbayError::UnreachableEndpoint { .. })
        ));
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn broadcast_reaches_every_bound_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        // Stray non-socket files must not break the directory scan, even
        // when the name looks like an endpoint identity.
        std::fs::write(dir.path().join("stray.txt"), b"junk").unwrap();
        std::fs::write(
            dir.path().join(format!("{}.txt", PluginId::new())),
            b"junk",
        )
        .unwrap();

        let bus = UnixBus::new(dir.path()).unwrap();
        let a = EchoPlugin::new("a");
        let b = EchoPlugin::new("b");
        bus.plugin_loaded(a.clone()).await;
        bus.plugin_loaded(b.clone()).await;

        bus.handle_broadcast(json!("to-everyone")).await;

        assert!(
            eventually(async || {
                a.broadcasts.lock().await.len() == 1 && b.broadcasts.lock().await.len() == 1
            })
            .await
        );
        assert_eq!(a.broadcasts.lock().await[0], json!("to-everyone"));
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_removes_socket_files_and_refuses_connections() {
        let dir = tempfile::tempdir().unwrap();
        let bus = UnixBus::new(dir.path()).unwrap();
        let echo = EchoPlugin::new("echo");
        let id = echo.settings.id;
        bus.plugin_loaded(echo).await;

        let path = dir.path().join(format!("{id}.sock"));
        assert!(path.exists());

        bus.stop().await.unwrap();
        assert!(!path.exists());
        assert!(UnixStream::connect(&path).await.is_err());
    }

    #[tokio::test]
    async fn inbound_result_envelope_is_dropped_without_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let bus = UnixBus::new(dir.path()).unwrap();
        let echo = EchoPlugin::new("echo");
        let id = echo.settings.id;
        bus.plugin_loaded(echo.clone()).await;

        let stream = UnixStream::connect(dir.path().join(format!("{id}.sock")))
            .await
            .unwrap();
        let mut framed = Framed::new(stream, wire::codec());
        framed
            .send(wire::encode(&Envelope::result(json!("bogus"))).unwrap())
            .await
            .unwrap();
        // The serving side closes without dispatching anything.
        assert!(framed.next().await.is_none());
        assert!(echo.broadcasts.lock().await.is_empty());
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn undecodable_request_closes_the_connection() {
        let dir = tempfile::tempdir().unwrap();
        let bus = UnixBus::new(dir.path()).unwrap();
        let echo = EchoPlugin::new("echo");
        let id = echo.settings.id;
        bus.plugin_loaded(echo.clone()).await;

        let stream = UnixStream::connect(dir.path().join(format!("{id}.sock")))
            .await
            .unwrap();
        let mut framed = Framed::new(stream, wire::codec());
        framed
            .send(bytes::Bytes::from_static(b"not an envelope"))
            .await
            .unwrap();
        assert!(framed.next().await.is_none());
        assert!(echo.broadcasts.lock().await.is_empty());
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn socket_directory_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("endpoints");
        let _bus = UnixBus::new(&nested).unwrap();
        assert!(nested.is_dir());
        let mode = std::fs::metadata(&nested).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
