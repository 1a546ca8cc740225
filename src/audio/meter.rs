//! Per-stream amplitude meter
//!
//! Fed sample blocks by the transport's decoder, read by the audio
//! registry. Tracks an instantaneous level (last block) and a running
//! average that resets whenever consumed.

use std::sync::Mutex;

use crate::transport::AudioSink;

#[derive(Debug, Default)]
struct MeterState {
    /// Level of the most recent sample block, 0.0..=1.0
    level: f32,
    avg_sum: f32,
    avg_count: u32,
}

/// Amplitude meter with instantaneous and running-average readings
#[derive(Debug, Default)]
pub struct AudioMeter {
    state: Mutex<MeterState>,
}

impl AudioMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level of the most recent sample block
    pub fn level(&self) -> f32 {
        self.state.lock().unwrap().level
    }

    /// Mean level over every block since the last reset; 0.0 when no
    /// blocks have arrived
    pub fn level_average(&self) -> f32 {
        let state = self.state.lock().unwrap();
        if state.avg_count == 0 {
            0.0
        } else {
            state.avg_sum / state.avg_count as f32
        }
    }

    /// Clear the running-average accumulator; the next average is computed
    /// only from blocks arriving after this call
    pub fn reset_average(&self) {
        let mut state = self.state.lock().unwrap();
        state.avg_sum = 0.0;
        state.avg_count = 0;
    }
}

impl AudioSink for AudioMeter {
    fn push_samples(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }
        let sum: f64 = samples.iter().map(|s| (*s as f64).abs()).sum();
        let level = (sum / samples.len() as f64 / i16::MAX as f64) as f32;

        let mut state = self.state.lock().unwrap();
        state.level = level;
        state.avg_sum += level;
        state.avg_count += 1;
    }
}
