// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage protocol and client for the Patchbay bus.
//!
//! Storage is not special to the runtime: a store is an endpoint plugin
//! answering [`StorageRequest`] payloads, and this crate provides the
//! request types plus the [`StorageClient`] a plugin embeds to speak them.

pub mod client;
pub mod protocol;

pub use client::StorageClient;
pub use protocol::{StorageRequest, MEMSTORE_ID};
