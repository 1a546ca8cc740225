//! Audio source registry
//!
//! Owns every [`AudioLevelSource`] and keeps the set in sync with the
//! transport by implementing [`SessionListener`]: sources are created on
//! stream-created, dropped on stream-deleted, and labelled as control-plane
//! metadata trickles in.

use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::transport::{
    DecoderHandle, LabelKind, MediaCapability, SessionListener, StreamId, TransportSession,
};

use super::meter::AudioMeter;

/// Returned by [`AudioRegistry::get_level`] when no source matches the
/// filter, so "no data" is distinguishable from silence (0.0)
pub const NO_MATCH_LEVEL: f32 = -2.0;

/// Which sources a level query addresses
#[derive(Debug, Clone, Copy)]
pub enum LevelFilter<'a> {
    /// Every registered source
    All,
    /// Sources whose site label matches exactly
    Site(&'a str),
    /// Sources whose canonical name matches exactly
    Canonical(&'a str),
}

impl LevelFilter<'_> {
    fn matches(&self, source: &AudioLevelSource) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Site(label) => source.site_label == *label,
            LevelFilter::Canonical(name) => source.canonical_name == *name,
        }
    }
}

/// Meter state for one audio stream
///
/// The labels stay empty until the corresponding metadata arrives from the
/// control plane, which may be well after the stream starts.
pub struct AudioLevelSource {
    pub stream_id: StreamId,
    /// Human-assigned origin label (RTCP APP "site" channel)
    pub site_label: String,
    /// Protocol-assigned origin name (RTCP CNAME)
    pub canonical_name: String,
    meter: Arc<AudioMeter>,
}

/// Registry of metered audio streams
///
/// Exclusively owns its sources; they exist from stream-created to
/// stream-deleted.
#[derive(Default)]
pub struct AudioRegistry {
    sources: Mutex<Vec<AudioLevelSource>>,
}

impl AudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of metered streams
    pub fn source_count(&self) -> usize {
        self.sources.lock().unwrap().len()
    }

    /// Average the matching sources' levels
    ///
    /// `use_average` reads (and resets, as an observable side effect) each
    /// matched meter's running average instead of its instantaneous level.
    /// Returns [`NO_MATCH_LEVEL`] when nothing matches.
    pub fn get_level(&self, filter: LevelFilter<'_>, use_average: bool) -> f32 {
        let sources = self.sources.lock().unwrap();

        let mut total = 0.0f32;
        let mut count = 0u32;
        for source in sources.iter().filter(|s| filter.matches(s)) {
            if use_average {
                total += source.meter.level_average();
                source.meter.reset_average();
            } else {
                total += source.meter.level();
            }
            count += 1;
        }

        // single match skips the divide; numerically identical to the mean
        match count {
            0 => NO_MATCH_LEVEL,
            1 => total,
            n => total / n as f32,
        }
    }

    /// Dump every source's instantaneous level to the log
    pub fn log_levels(&self) {
        let sources = self.sources.lock().unwrap();
        for source in sources.iter() {
            tracing::debug!(
                stream_id = source.stream_id,
                site = %source.site_label,
                level = source.meter.level(),
                "audio level"
            );
        }
    }
}

impl SessionListener for AudioRegistry {
    fn on_stream_created(
        &self,
        _session: &dyn TransportSession,
        id: StreamId,
        payload_type: u8,
        decoder: &dyn DecoderHandle,
    ) {
        if decoder.capability() != MediaCapability::LinearAudio {
            tracing::debug!(
                stream_id = id,
                payload_type,
                "stream decoder is not meterable audio, ignoring"
            );
            return;
        }

        let mut sources = self.sources.lock().unwrap();
        // double-registering a live stream id is a caller bug
        debug_assert!(
            sources.iter().all(|s| s.stream_id != id),
            "stream 0x{:08x} registered twice",
            id
        );

        let meter = Arc::new(AudioMeter::new());
        decoder.attach_sink(Arc::clone(&meter) as Arc<dyn crate::transport::AudioSink>);
        sources.push(AudioLevelSource {
            stream_id: id,
            site_label: String::new(),
            canonical_name: String::new(),
            meter,
        });
        tracing::info!(
            stream_id = id,
            payload_type,
            "audio source added"
        );
    }

    fn on_stream_deleted(&self, _session: &dyn TransportSession, id: StreamId, reason: &str) {
        let mut sources = self.sources.lock().unwrap();
        match sources.iter().position(|s| s.stream_id == id) {
            Some(index) => {
                sources.remove(index);
                tracing::info!(
                    stream_id = id,
                    reason,
                    "audio source removed"
                );
            }
            None => {
                tracing::debug!(
                    stream_id = id,
                    "deleted stream was not metered"
                );
            }
        }
    }

    fn on_stream_description(&self, session: &dyn TransportSession, id: StreamId) {
        if let Some(name) = session.remote_label(id, LabelKind::Canonical) {
            let mut sources = self.sources.lock().unwrap();
            if let Some(source) = sources.iter_mut().find(|s| s.stream_id == id) {
                source.canonical_name = name;
            }
        }
    }

    fn on_control_data(
        &self,
        _session: &dyn TransportSession,
        id: StreamId,
        channel: [u8; 4],
        payload: Bytes,
    ) {
        if &channel != b"site" {
            return;
        }
        let label = String::from_utf8_lossy(&payload).into_owned();
        let mut sources = self.sources.lock().unwrap();
        if let Some(source) = sources.iter_mut().find(|s| s.stream_id == id) {
            tracing::debug!(
                stream_id = id,
                site = %label,
                "site label updated"
            );
            source.site_label = label;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockDecoder, MockFactory, NullListener};
    use crate::transport::{AudioSink, TransportFactory};

    /// Registry, a transport session to hand to callbacks, and a helper to
    /// register a metered stream and get its sink back
    struct Fixture {
        registry: AudioRegistry,
        session: Box<dyn TransportSession>,
    }

    impl Fixture {
        fn new() -> Self {
            let factory = MockFactory::new();
            let session = factory
                .create_session("224.0.0.9/5006", Arc::new(NullListener))
                .unwrap();
            Self {
                registry: AudioRegistry::new(),
                session,
            }
        }

        fn add_stream(&self, id: StreamId) -> Arc<dyn AudioSink> {
            let decoder = MockDecoder::new(MediaCapability::LinearAudio);
            self.registry
                .on_stream_created(self.session.as_ref(), id, 96, &decoder);
            decoder.attached_sink().expect("sink attached")
        }
    }

    #[test]
    fn test_only_meterable_decoders_registered() {
        let fx = Fixture::new();

        let video = MockDecoder::new(MediaCapability::Video);
        fx.registry
            .on_stream_created(fx.session.as_ref(), 1, 97, &video);
        assert_eq!(fx.registry.source_count(), 0);
        assert!(video.attached_sink().is_none());

        fx.add_stream(2);
        assert_eq!(fx.registry.source_count(), 1);
    }

    #[test]
    fn test_stream_deleted_releases_source() {
        let fx = Fixture::new();
        fx.add_stream(1);

        fx.registry
            .on_stream_deleted(fx.session.as_ref(), 1, "bye");
        assert_eq!(fx.registry.source_count(), 0);

        // unknown id is a non-fatal no-op
        fx.registry
            .on_stream_deleted(fx.session.as_ref(), 42, "bye");
    }

    #[test]
    fn test_no_sources_returns_sentinel() {
        let registry = AudioRegistry::new();
        assert_eq!(registry.get_level(LevelFilter::All, false), NO_MATCH_LEVEL);
        assert_eq!(registry.get_level(LevelFilter::All, true), NO_MATCH_LEVEL);
    }

    #[test]
    fn test_single_source_level_exact() {
        let fx = Fixture::new();
        let sink = fx.add_stream(1);

        sink.push_samples(&[i16::MAX; 8]);
        let level = fx.registry.get_level(LevelFilter::All, false);
        assert!((level - 1.0).abs() < 1e-6);

        // silence reads 0.0, distinct from the no-match sentinel
        sink.push_samples(&[0; 8]);
        assert_eq!(fx.registry.get_level(LevelFilter::All, false), 0.0);
    }

    #[test]
    fn test_multiple_sources_mean() {
        let fx = Fixture::new();
        let a = fx.add_stream(1);
        let b = fx.add_stream(2);

        a.push_samples(&[i16::MAX; 8]);
        b.push_samples(&[0; 8]);
        let level = fx.registry.get_level(LevelFilter::All, false);
        assert!((level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_site_filter_via_control_data() {
        let fx = Fixture::new();
        let a = fx.add_stream(1);
        let b = fx.add_stream(2);

        fx.registry.on_control_data(
            fx.session.as_ref(),
            1,
            *b"site",
            Bytes::from_static(b"Site A"),
        );
        // non-site channels are ignored
        fx.registry.on_control_data(
            fx.session.as_ref(),
            2,
            *b"xxxx",
            Bytes::from_static(b"Site A"),
        );

        a.push_samples(&[i16::MAX; 8]);
        b.push_samples(&[i16::MAX; 8]);

        let level = fx.registry.get_level(LevelFilter::Site("Site A"), false);
        assert!((level - 1.0).abs() < 1e-6);
        assert_eq!(
            fx.registry.get_level(LevelFilter::Site("Site B"), false),
            NO_MATCH_LEVEL
        );
    }

    #[test]
    fn test_canonical_name_from_description() {
        let fx = Fixture::new();
        let sink = fx.add_stream(7);

        // mock session reports "cname-<id>"
        fx.registry.on_stream_description(fx.session.as_ref(), 7);
        sink.push_samples(&[i16::MAX; 4]);

        let level = fx.registry.get_level(LevelFilter::Canonical("cname-7"), false);
        assert!((level - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_read_resets_accumulator() {
        let fx = Fixture::new();
        let sink = fx.add_stream(1);

        sink.push_samples(&[i16::MAX; 8]);
        sink.push_samples(&[0; 8]);
        let first = fx.registry.get_level(LevelFilter::All, true);
        assert!((first - 0.5).abs() < 1e-6);

        // second read sees only samples collected after the first
        sink.push_samples(&[0; 8]);
        assert_eq!(fx.registry.get_level(LevelFilter::All, true), 0.0);
    }
}
