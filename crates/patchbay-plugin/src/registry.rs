// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry and the load-notification protocol.
//!
//! The `PluginRegistry` owns every loaded plugin and keeps two views of them:
//! a registration-ordered list, and a name index for directed lookup. On each
//! registration it runs the notification protocol that lets buses discover
//! endpoints and transports without any of them knowing load order:
//!
//! 1. every previously registered listener is told about the newcomer;
//! 2. if the newcomer is itself a listener, every earlier plugin is replayed
//!    to it, then it joins the listener list.
//!
//! A plugin is never notified of itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use patchbay_core::{PatchbayError, Plugin, PluginListener};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::loader::ModuleLoader;

#[derive(Default)]
struct PluginTable {
    /// Registration order, authoritative for replay and teardown.
    ordered: Vec<Arc<dyn Plugin>>,
    /// Registration-name index into `ordered`.
    by_name: HashMap<String, usize>,
}

/// Registry of loaded plugins.
///
/// All mutation goes through [`register`](PluginRegistry::register), which is
/// serialized so that listeners observe one coherent arrival at a time even
/// when plugins are loaded concurrently.
pub struct PluginRegistry {
    loader: Arc<dyn ModuleLoader>,
    table: RwLock<PluginTable>,
    listeners: RwLock<Vec<Arc<dyn PluginListener>>>,
    registration: Mutex<()>,
}

impl PluginRegistry {
    /// Create a registry that loads modules through the given loader.
    pub fn with_loader(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            table: RwLock::new(PluginTable::default()),
            listeners: RwLock::new(Vec::new()),
            registration: Mutex::new(()),
        }
    }

    /// Create a registry for directly constructed plugins.
    ///
    /// [`load`](PluginRegistry::load) and [`load_all`](PluginRegistry::load_all)
    /// fail on such a registry; wire plugins in with
    /// [`register`](PluginRegistry::register) instead.
    pub fn new() -> Self {
        Self::with_loader(Arc::new(crate::loader::StaticModuleLoader::new()))
    }

    /// Register an already constructed plugin and run the notification
    /// protocol for it.
    ///
    /// Registering a second plugin under an already taken name replaces the
    /// earlier one in place: lookups and future replays see only the
    /// newcomer, and the displaced plugin leaves the registry without being
    /// stopped.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) {
        let _guard = self.registration.lock().await;

        let name = plugin.settings().name.clone();
        let id = plugin.settings().id;

        // Tell everyone already listening about the newcomer, in the order
        // the listeners themselves registered.
        let current_listeners: Vec<Arc<dyn PluginListener>> =
            self.listeners.read().await.clone();
        for listener in current_listeners {
            listener.plugin_loaded(Arc::clone(&plugin)).await;
        }

        // If the newcomer listens, replay every earlier plugin to it before
        // it joins the listener list. The newcomer is not yet in the table,
        // so it never hears about itself.
        if let Some(listener) = Arc::clone(&plugin).as_listener() {
            let prior: Vec<Arc<dyn Plugin>> = self.table.read().await.ordered.clone();
            for earlier in prior {
                listener.plugin_loaded(earlier).await;
            }
            self.listeners.write().await.push(listener);
        }

        let mut table = self.table.write().await;
        match table.by_name.get(&name).copied() {
            Some(slot) => {
                warn!(
                    name = name.as_str(),
                    id = %id,
                    "plugin name already registered, replacing the earlier plugin"
                );
                table.ordered[slot] = plugin;
            }
            None => {
                let slot = table.ordered.len();
                table.ordered.push(plugin);
                table.by_name.insert(name.clone(), slot);
            }
        }
        drop(table);

        debug!(name = name.as_str(), id = %id, "plugin registered");
    }

    /// Load a single module through the configured loader and register it.
    pub async fn load(&self, path: &Path) -> Result<Arc<dyn Plugin>, PatchbayError> {
        let plugin = self.loader.load(path)?;
        info!(
            path = %path.display(),
            name = plugin.settings().name.as_str(),
            "module loaded"
        );
        self.register(Arc::clone(&plugin)).await;
        Ok(plugin)
    }

    /// Load and start every module found under `dir`.
    ///
    /// The directory is walked recursively; files carrying the platform
    /// dynamic-library extension are loaded in lexical path order, each one
    /// registered and then started. The started plugins share a child of the
    /// caller's shutdown token, so cancelling `cancel` reaches them too. On
    /// the first failure only that child token is cancelled, every plugin
    /// started by this walk is stopped, and the error is returned; the
    /// runtime never comes up half-wired.
    pub async fn load_all(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), PatchbayError> {
        let walk_cancel = cancel.child_token();
        let modules = collect_module_paths(dir)?;
        info!(dir = %dir.display(), count = modules.len(), "loading modules");

        let mut started: Vec<Arc<dyn Plugin>> = Vec::new();
        for path in &modules {
            let outcome = async {
                let plugin = self.load(path).await?;
                plugin.start(walk_cancel.clone()).await.map_err(|e| {
                    PatchbayError::Plugin {
                        message: format!(
                            "plugin `{}` failed to start",
                            plugin.settings().name
                        ),
                        source: Some(Box::new(e)),
                    }
                })?;
                Ok::<_, PatchbayError>(plugin)
            }
            .await;

            match outcome {
                Ok(plugin) => started.push(plugin),
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "module startup failed, aborting load"
                    );
                    walk_cancel.cancel();
                    for plugin in &started {
                        if let Err(stop_err) = plugin.stop().await {
                            warn!(
                                plugin = plugin.settings().name.as_str(),
                                error = %stop_err,
                                "plugin stop failed during aborted load"
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }

        info!(count = started.len(), "all modules loaded and started");
        Ok(())
    }

    /// Start every registered plugin, in registration order.
    ///
    /// Used when plugins were wired in with
    /// [`register`](PluginRegistry::register) rather than
    /// [`load_all`](PluginRegistry::load_all). Stops at the first failure and
    /// returns it; already started plugins keep running, so callers usually
    /// follow an error with [`stop_all`](PluginRegistry::stop_all).
    pub async fn start_all(&self, cancel: &CancellationToken) -> Result<(), PatchbayError> {
        for plugin in self.plugins().await {
            plugin.start(cancel.clone()).await.map_err(|e| {
                PatchbayError::Plugin {
                    message: format!("plugin `{}` failed to start", plugin.settings().name),
                    source: Some(Box::new(e)),
                }
            })?;
            debug!(plugin = plugin.settings().name.as_str(), "plugin started");
        }
        Ok(())
    }

    /// Cancel the shared shutdown token, then stop every plugin in
    /// registration order.
    ///
    /// A failing stop is logged and does not keep later plugins from being
    /// stopped.
    pub async fn stop_all(&self, cancel: &CancellationToken) {
        cancel.cancel();
        let plugins = self.plugins().await;
        info!(count = plugins.len(), "stopping all plugins");
        for plugin in plugins {
            if let Err(e) = plugin.stop().await {
                warn!(
                    plugin = plugin.settings().name.as_str(),
                    error = %e,
                    "plugin stop failed"
                );
            }
        }
    }

    /// Look up a plugin by its registration name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let table = self.table.read().await;
        table
            .by_name
            .get(name)
            .copied()
            .map(|slot| Arc::clone(&table.ordered[slot]))
    }

    /// Snapshot of all plugins, in registration order.
    pub async fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.table.read().await.ordered.clone()
    }

    /// Number of registered plugins.
    pub async fn len(&self) -> usize {
        self.table.read().await.ordered.len()
    }

    /// Returns true when no plugin is registered.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.ordered.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively collect loadable module paths under `dir`, sorted lexically.
///
/// Only files with the platform dynamic-library extension
/// (`std::env::consts::DLL_EXTENSION`) count as modules; everything else is
/// ignored.
fn collect_module_paths(dir: &Path) -> Result<Vec<PathBuf>, PatchbayError> {
    let mut pending = vec![dir.to_path_buf()];
    let mut modules = Vec::new();

    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| PatchbayError::ModuleOpen {
            path: current.clone(),
            source: Box::new(e),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| PatchbayError::ModuleOpen {
                path: current.clone(),
                source: Box::new(e),
            })?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
            {
                modules.push(path);
            }
        }
    }

    modules.sort();
    Ok(modules)
}
