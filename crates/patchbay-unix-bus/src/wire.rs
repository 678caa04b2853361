// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire format of the unix socket transport.
//!
//! Frames are length-delimited; each frame carries one JSON [`Envelope`].
//! A connection transports exactly one request envelope (`Broadcast` or
//! `Send`), followed for `Send` by any number of `Result` envelopes flowing
//! back until the serving side closes the connection.

use bytes::Bytes;
use patchbay_core::{PatchbayError, PluginId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::codec::LengthDelimitedCodec;

/// Maximum size of a single frame.
///
/// Payloads are operator-defined JSON, so the cap is generous; anything
/// larger is treated as a protocol violation and fails the connection.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Discriminant of an [`Envelope`], `u8` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EnvelopeKind {
    /// Fire-and-forget delivery to the endpoint behind the socket.
    Broadcast,
    /// Directed delivery; the peer streams `Result` envelopes back.
    Send,
    /// One reply payload of an earlier `Send`.
    Result,
}

impl From<EnvelopeKind> for u8 {
    fn from(kind: EnvelopeKind) -> Self {
        match kind {
            EnvelopeKind::Broadcast => 0,
            EnvelopeKind::Send => 1,
            EnvelopeKind::Result => 2,
        }
    }
}

impl TryFrom<u8> for EnvelopeKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EnvelopeKind::Broadcast),
            1 => Ok(EnvelopeKind::Send),
            2 => Ok(EnvelopeKind::Result),
            other => Err(format!("unknown envelope kind {other}")),
        }
    }
}

/// One framed message on a bus connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    /// Routing identity. The socket path already addresses the endpoint, so
    /// this is informational and absent on most envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PluginId>,
    pub payload: Value,
}

impl Envelope {
    pub fn broadcast(payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Broadcast,
            target: None,
            payload,
        }
    }

    pub fn send(payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Send,
            target: None,
            payload,
        }
    }

    pub fn result(payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Result,
            target: None,
            payload,
        }
    }
}

/// Codec used on every bus connection.
pub fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_SIZE)
        .new_codec()
}

/// Serialize an envelope into one frame body.
pub fn encode(envelope: &Envelope) -> Result<Bytes, PatchbayError> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(|e| PatchbayError::Transport {
            message: "cannot encode bus envelope".to_string(),
            source: Some(Box::new(e)),
        })
}

/// Deserialize one frame body into an envelope.
pub fn decode(frame: &[u8]) -> Result<Envelope, PatchbayError> {
    serde_json::from_slice(frame).map_err(|e| PatchbayError::Transport {
        message: "cannot decode bus envelope".to_string(),
        source: Some(Box::new(e)),
    })
}
