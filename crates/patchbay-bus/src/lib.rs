// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus routing layer for sending plugins.
//!
//! Transports (the local in-process bus, the unix socket bus) implement
//! [`BusService`](patchbay_core::BusService) and register as ordinary
//! plugins. Sending plugins hold a [`BusHandle`], which discovers those
//! transports through the registry's load notifications and routes traffic
//! over them by priority.

pub mod handle;

pub use handle::{BusHandle, SendPolicy};
