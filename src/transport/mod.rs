//! Media transport interface
//!
//! The core does not decode or move media itself. It owns session objects
//! and their lifecycle, and drives an external transport layer through the
//! narrow set of traits defined here. A real implementation wraps an RTP
//! stack; tests use the mock in [`mock`].
//!
//! Addresses are opaque `host/port[/ttl]` strings and are passed through to
//! the factory unexamined.

use std::sync::Arc;

use bytes::Bytes;

#[cfg(test)]
pub(crate) mod mock;

/// Identifier the transport assigns to one media stream within a session
/// (the RTP SSRC).
pub type StreamId = u32;

/// What a created stream's decoder can do, reported by the transport at
/// stream creation so consumers can check it by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCapability {
    /// Linear PCM audio that can feed a level meter
    LinearAudio,
    /// Decodable video
    Video,
    /// Anything this core has no use for
    Other,
}

/// Which remote identity string to query for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Protocol-assigned canonical name (RTCP CNAME)
    Canonical,
    /// Human-readable display name
    Name,
}

/// Receives decoded audio sample blocks from the transport
pub trait AudioSink: Send + Sync {
    fn push_samples(&self, samples: &[i16]);
}

/// Handle to a newly created stream's decoder, valid for the duration of
/// the stream-created callback
pub trait DecoderHandle {
    /// Capability tag of this decoder
    fn capability(&self) -> MediaCapability;

    /// Route the decoder's audio output into `sink`
    ///
    /// Only meaningful for [`MediaCapability::LinearAudio`] decoders; the
    /// transport ignores it otherwise.
    fn attach_sink(&self, sink: Arc<dyn AudioSink>);
}

/// Callbacks a transport session delivers while being iterated
///
/// All four events fire from inside [`TransportSession::iterate`], on the
/// caller's thread. Implementations use interior mutability.
pub trait SessionListener: Send + Sync {
    /// A new stream appeared in the session
    fn on_stream_created(
        &self,
        session: &dyn TransportSession,
        id: StreamId,
        payload_type: u8,
        decoder: &dyn DecoderHandle,
    );

    /// A stream went away
    fn on_stream_deleted(&self, session: &dyn TransportSession, id: StreamId, reason: &str);

    /// Control-plane metadata for a stream changed; query
    /// [`TransportSession::remote_label`] for the new values
    fn on_stream_description(&self, session: &dyn TransportSession, id: StreamId);

    /// Out-of-band application data arrived (RTCP APP), tagged with a
    /// 4-byte channel
    fn on_control_data(
        &self,
        session: &dyn TransportSession,
        id: StreamId,
        channel: [u8; 4],
        payload: Bytes,
    );
}

/// One live connection to a multicast group
///
/// Created by a [`TransportFactory`], owned by exactly one `Session`, and
/// always dropped before that session is dropped or reactivated.
pub trait TransportSession: Send {
    /// Select whether video payloads are processed
    fn enable_video(&mut self, enabled: bool);

    /// Select whether audio payloads are processed
    fn enable_audio(&mut self, enabled: bool);

    /// Join the group and negotiate; must be called once before the first
    /// [`iterate`](Self::iterate)
    fn initialise(&mut self) -> Result<(), TransportError>;

    /// Set or clear (`None`) the payload encryption key
    fn set_encryption_key(&mut self, key: Option<&str>);

    /// Pump one round of protocol I/O; `sequence` orders ticks internally
    fn iterate(&mut self, sequence: u32) -> Result<(), TransportError>;

    /// Query a remote identity string for a stream in this session
    fn remote_label(&self, id: StreamId, kind: LabelKind) -> Option<String>;
}

/// Creates transport sessions bound to a listener
pub trait TransportFactory: Send + Sync {
    fn create_session(
        &self,
        address: &str,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// Error type for transport operations
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Session object could not be created for the address
    Create(String),
    /// Joining or negotiating the session failed
    Negotiation(String),
    /// I/O failure during an iteration tick
    Io(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Create(msg) => write!(f, "session creation failed: {}", msg),
            TransportError::Negotiation(msg) => write!(f, "session negotiation failed: {}", msg),
            TransportError::Io(msg) => write!(f, "session I/O failed: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}
