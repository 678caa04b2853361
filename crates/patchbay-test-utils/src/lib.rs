// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Patchbay integration tests.
//!
//! Provides mock plugins and bus stand-ins for fast, deterministic,
//! CI-runnable tests without sockets or loadable modules.
//!
//! # Components
//!
//! - [`MockEndpoint`] - Endpoint plugin with captured traffic and canned replies
//! - [`MockBus`] - `Bus` implementation that records instead of delivering
//! - [`RecordingListener`] - Listener plugin that records load notifications

pub mod mock_bus;
pub mod mock_endpoint;
pub mod recording_listener;

pub use mock_bus::MockBus;
pub use mock_endpoint::MockEndpoint;
pub use recording_listener::RecordingListener;
