// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Patchbay plugin bus.
//!
//! This crate provides the foundational trait definitions, error type, and
//! common types used throughout the Patchbay workspace. Plugins, transports,
//! and bus clients all implement or consume traits defined here.

pub mod error;
pub mod shutdown;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PatchbayError;
pub use types::{
    empty_reply_stream, reply_stream_from_values, reply_stream_once, PluginId, ReplyStream,
    Settings,
};

// Re-export all capability traits at crate root.
pub use traits::{Bus, BusService, Endpoint, Plugin, PluginListener};
