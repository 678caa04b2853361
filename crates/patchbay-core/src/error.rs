// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Patchbay plugin bus.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PluginId;

/// The primary error type used across all Patchbay crates.
#[derive(Debug, Error)]
pub enum PatchbayError {
    /// Configuration errors (invalid TOML, bad values, missing directories).
    #[error("configuration error: {0}")]
    Config(String),

    /// A loadable module could not be opened.
    #[error("cannot open module {}: {source}", .path.display())]
    ModuleOpen {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A module is missing its exported entry symbol.
    #[error("module {} does not export symbol `{symbol}`", .path.display())]
    SymbolMissing { path: PathBuf, symbol: String },

    /// A module exports an entry point incompatible with this host.
    #[error("module {} has an incompatible factory: {detail}", .path.display())]
    FactorySignature { path: PathBuf, detail: String },

    /// A plugin factory or lifecycle hook failed.
    #[error("plugin error: {message}")]
    Plugin {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Directed send to an identity no local endpoint is registered for.
    #[error("no endpoint registered for {id}")]
    UnknownEndpoint { id: PluginId },

    /// Directed send to an identity whose socket could not be dialed.
    #[error("endpoint {id} is not reachable: {source}")]
    UnreachableEndpoint {
        id: PluginId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O failure on an established bus connection.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
