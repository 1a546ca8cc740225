//! Mock transport for unit tests
//!
//! Records every handle-level call into a shared log so tests can assert on
//! ordering (e.g. key applied before the first iterate). The factory can be
//! told to fail negotiation for specific addresses.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::{
    AudioSink, DecoderHandle, LabelKind, MediaCapability, SessionListener, StreamId,
    TransportError, TransportFactory, TransportSession,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    EnableVideo(bool),
    EnableAudio(bool),
    Initialise,
    SetKey(Option<String>),
    Iterate(u32),
}

/// Per-session call log, shared between the mock session and the test
#[derive(Default)]
pub struct MockLog {
    pub calls: Mutex<Vec<MockCall>>,
}

impl MockLog {
    pub fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn snapshot(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn iterate_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Iterate(_)))
            .count()
    }
}

pub struct MockSession {
    log: Arc<MockLog>,
    fail_initialise: bool,
    // held so the listener outlives the connection, as a real transport
    // session would guarantee
    _listener: Arc<dyn SessionListener>,
}

impl TransportSession for MockSession {
    fn enable_video(&mut self, enabled: bool) {
        self.log.record(MockCall::EnableVideo(enabled));
    }

    fn enable_audio(&mut self, enabled: bool) {
        self.log.record(MockCall::EnableAudio(enabled));
    }

    fn initialise(&mut self) -> Result<(), TransportError> {
        self.log.record(MockCall::Initialise);
        if self.fail_initialise {
            Err(TransportError::Negotiation("mock failure".into()))
        } else {
            Ok(())
        }
    }

    fn set_encryption_key(&mut self, key: Option<&str>) {
        self.log.record(MockCall::SetKey(key.map(String::from)));
    }

    fn iterate(&mut self, sequence: u32) -> Result<(), TransportError> {
        self.log.record(MockCall::Iterate(sequence));
        Ok(())
    }

    fn remote_label(&self, id: StreamId, kind: LabelKind) -> Option<String> {
        match kind {
            LabelKind::Canonical => Some(format!("cname-{}", id)),
            LabelKind::Name => Some(format!("name-{}", id)),
        }
    }
}

/// Factory that hands out [`MockSession`]s and keeps their logs by address
#[derive(Default)]
pub struct MockFactory {
    fail_addresses: Mutex<HashSet<String>>,
    logs: Mutex<Vec<(String, Arc<MockLog>)>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make negotiation fail for every session created on `address`
    pub fn fail_address(&self, address: &str) {
        self.fail_addresses.lock().unwrap().insert(address.into());
    }

    /// Log of the most recently created session on `address`
    pub fn log_for(&self, address: &str) -> Option<Arc<MockLog>> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(a, _)| a == address)
            .map(|(_, log)| Arc::clone(log))
    }

    /// Total number of sessions created so far
    pub fn created_count(&self) -> usize {
        self.logs.lock().unwrap().len()
    }
}

impl TransportFactory for MockFactory {
    fn create_session(
        &self,
        address: &str,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        let log = Arc::new(MockLog::default());
        self.logs
            .lock()
            .unwrap()
            .push((address.into(), Arc::clone(&log)));
        let fail = self.fail_addresses.lock().unwrap().contains(address);
        Ok(Box::new(MockSession {
            log,
            fail_initialise: fail,
            _listener: listener,
        }))
    }
}

/// Decoder handle that captures the attached sink for the test to feed
pub struct MockDecoder {
    capability: MediaCapability,
    pub sink: Mutex<Option<Arc<dyn AudioSink>>>,
}

impl MockDecoder {
    pub fn new(capability: MediaCapability) -> Self {
        Self {
            capability,
            sink: Mutex::new(None),
        }
    }

    pub fn attached_sink(&self) -> Option<Arc<dyn AudioSink>> {
        self.sink.lock().unwrap().clone()
    }
}

impl DecoderHandle for MockDecoder {
    fn capability(&self) -> MediaCapability {
        self.capability
    }

    fn attach_sink(&self, sink: Arc<dyn AudioSink>) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}

/// Listener that ignores everything, for sessions whose callbacks are not
/// under test
pub struct NullListener;

impl SessionListener for NullListener {
    fn on_stream_created(
        &self,
        _session: &dyn TransportSession,
        _id: StreamId,
        _payload_type: u8,
        _decoder: &dyn DecoderHandle,
    ) {
    }

    fn on_stream_deleted(&self, _session: &dyn TransportSession, _id: StreamId, _reason: &str) {}

    fn on_stream_description(&self, _session: &dyn TransportSession, _id: StreamId) {}

    fn on_control_data(
        &self,
        _session: &dyn TransportSession,
        _id: StreamId,
        _channel: [u8; 4],
        _payload: bytes::Bytes,
    ) {
    }
}
