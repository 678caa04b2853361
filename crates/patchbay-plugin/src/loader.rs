// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Module loaders: how files in the module directory become live plugins.
//!
//! Two strategies exist. [`StaticModuleLoader`] maps module file stems to
//! compiled-in factories, for hosts that link their plugins directly.
//! [`DynamicModuleLoader`] (behind the `dynload` feature) opens shared
//! libraries at runtime and calls their exported entry point, the
//! counterpart of [`export_plugin!`](crate::export_plugin).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use patchbay_core::{PatchbayError, Plugin};

/// Turns a module path into a live plugin instance.
pub trait ModuleLoader: Send + Sync {
    /// Load the module at `path` and construct its plugin.
    fn load(&self, path: &Path) -> Result<Arc<dyn Plugin>, PatchbayError>;
}

/// Constructs one plugin instance.
///
/// Implemented for free by any `Fn() -> Result<Arc<dyn Plugin>, _>` closure.
pub trait PluginFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Plugin>, PatchbayError>;
}

impl<F> PluginFactory for F
where
    F: Fn() -> Result<Arc<dyn Plugin>, PatchbayError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn Plugin>, PatchbayError> {
        (self)()
    }
}

/// Loader backed by compiled-in factories keyed by module file stem.
///
/// `load("/usr/lib/patchbay/memstore.so")` resolves the factory registered
/// under `"memstore"`. The module file itself is never opened; only its stem
/// selects the factory, so the same module directory drives both static and
/// dynamic hosts.
#[derive(Default)]
pub struct StaticModuleLoader {
    factories: HashMap<String, Box<dyn PluginFactory>>,
}

impl StaticModuleLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a module file stem.
    pub fn register(&mut self, stem: impl Into<String>, factory: impl PluginFactory + 'static) {
        self.factories.insert(stem.into(), Box::new(factory));
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Plugin>, PatchbayError> {
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
            PatchbayError::ModuleOpen {
                path: path.to_path_buf(),
                source: "module path has no usable file stem".into(),
            }
        })?;
        let factory =
            self.factories
                .get(stem)
                .ok_or_else(|| PatchbayError::ModuleOpen {
                    path: path.to_path_buf(),
                    source: format!("no compiled-in factory registered for `{stem}`").into(),
                })?;
        factory.create()
    }
}

/// Version of the in-process plugin ABI.
///
/// The entry point passes Rust trait objects across the library boundary, so
/// modules must be built by the same toolchain, against the same patchbay
/// revision, as the host. Bumped whenever [`Plugin`] or the types it exposes
/// change shape.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Symbol every loadable module exports to report its ABI version.
pub const PLUGIN_ABI_SYMBOL: &str = "patchbay_plugin_abi_version";

/// Symbol every loadable module exports as its plugin factory.
pub const PLUGIN_ENTRY_SYMBOL: &str = "patchbay_plugin_entry";

/// Signature of the exported ABI-version symbol.
pub type PluginAbiVersionFn = unsafe extern "C" fn() -> u32;

/// Signature of the exported entry-point symbol.
pub type PluginEntryFn = unsafe extern "C" fn() -> Result<Arc<dyn Plugin>, PatchbayError>;

/// Export a plugin factory from a `crate-type = ["cdylib"]` module crate.
///
/// Emits the ABI-version and entry-point symbols the
/// [`DynamicModuleLoader`] looks up:
///
/// ```rust,ignore
/// use std::sync::Arc;
///
/// patchbay_plugin::export_plugin!(|| Ok(Arc::new(MyPlugin::new())));
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($factory:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn patchbay_plugin_abi_version() -> u32 {
            $crate::loader::PLUGIN_ABI_VERSION
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn patchbay_plugin_entry() -> ::std::result::Result<
            ::std::sync::Arc<dyn $crate::Plugin>,
            $crate::PatchbayError,
        > {
            let factory = $factory;
            factory()
        }
    };
}

/// Loader that opens shared libraries and calls their exported factory.
///
/// Opened libraries stay mapped for the lifetime of the loader; unloading a
/// library while plugin vtables still point into it would be unsound.
#[cfg(feature = "dynload")]
#[derive(Default)]
pub struct DynamicModuleLoader {
    libraries: std::sync::Mutex<Vec<libloading::Library>>,
}

#[cfg(feature = "dynload")]
impl DynamicModuleLoader {
    /// Create a loader with no libraries mapped yet.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "dynload")]
impl ModuleLoader for DynamicModuleLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Plugin>, PatchbayError> {
        // SAFETY: opening a library runs its initializers. The path comes
        // from the configured module directory, which the operator controls.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            PatchbayError::ModuleOpen {
                path: path.to_path_buf(),
                source: Box::new(e),
            }
        })?;

        let version = {
            // SAFETY: the symbol is read with the fn-pointer type the
            // `export_plugin!` macro emits it with.
            let abi: libloading::Symbol<'_, PluginAbiVersionFn> =
                unsafe { library.get(PLUGIN_ABI_SYMBOL.as_bytes()) }.map_err(|_| {
                    PatchbayError::SymbolMissing {
                        path: path.to_path_buf(),
                        symbol: PLUGIN_ABI_SYMBOL.to_string(),
                    }
                })?;
            unsafe { abi() }
        };
        if version != PLUGIN_ABI_VERSION {
            return Err(PatchbayError::FactorySignature {
                path: path.to_path_buf(),
                detail: format!(
                    "module ABI version {version}, host expects {PLUGIN_ABI_VERSION}"
                ),
            });
        }

        let plugin = {
            // SAFETY: the ABI version check above established that the module
            // was built against the same entry signature as this host.
            let entry: libloading::Symbol<'_, PluginEntryFn> =
                unsafe { library.get(PLUGIN_ENTRY_SYMBOL.as_bytes()) }.map_err(|_| {
                    PatchbayError::SymbolMissing {
                        path: path.to_path_buf(),
                        symbol: PLUGIN_ENTRY_SYMBOL.to_string(),
                    }
                })?;
            unsafe { entry() }?
        };

        let mut libraries = self
            .libraries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        libraries.push(library);
        Ok(plugin)
    }
}
