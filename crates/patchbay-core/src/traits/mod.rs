// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions for Patchbay plugins.

pub mod bus;
pub mod endpoint;
pub mod plugin;

pub use bus::{Bus, BusService};
pub use endpoint::Endpoint;
pub use plugin::{Plugin, PluginListener};
