// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry, load-notification protocol, and module loaders.
//!
//! The registry owns every loaded plugin and tells listening plugins about
//! each arrival, replaying earlier arrivals to late listeners so that wiring
//! never depends on load order. Modules reach the registry through a
//! [`ModuleLoader`]: a compiled-in factory table by default, or shared
//! libraries when the `dynload` feature is enabled.

pub mod loader;
pub mod registry;

pub use loader::{ModuleLoader, PluginFactory, StaticModuleLoader};
pub use registry::PluginRegistry;

#[cfg(feature = "dynload")]
pub use loader::DynamicModuleLoader;

// Re-exported for the `export_plugin!` macro expansion.
#[doc(hidden)]
pub use patchbay_core::{PatchbayError, Plugin};
