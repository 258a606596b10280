use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::stream::buffer::MAX_SAMPLE_RATE;

/// One push from the waveform socket: a burst of raw counts for a single station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveformFrame {
    #[serde(rename = "id")]
    pub station_id: u32,
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    pub precision: u8,
    #[serde(rename = "X")]
    pub samples: Vec<f64>,
}

impl WaveformFrame {
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(ScopeError::InvalidSampleRate);
        }
        Ok(())
    }

    pub fn from_json(raw: &str) -> Result<Self, ScopeError> {
        let frame: WaveformFrame =
            serde_json::from_str(raw).map_err(|err| ScopeError::Fetch(err.to_string()))?;
        frame.validate()?;
        Ok(frame)
    }
}

/// Something that can yield waveform frames on demand.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<WaveformFrame>, ScopeError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<WaveformFrame>,
}

impl ManualSource {
    pub fn new(frames: impl IntoIterator<Item = WaveformFrame>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for ManualSource {
    fn next_frame(&mut self) -> Result<Option<WaveformFrame>, ScopeError> {
        Ok(self.queue.pop_front())
    }
}

/// Per-station generator settings for [`SyntheticSource`].
#[derive(Clone, Debug)]
pub struct SyntheticStation {
    pub station_id: u32,
    pub sample_rate: u32,
    pub precision: u8,
    pub freq_hz: f64,
    pub amplitude: f64,
    pub noise: f64,
}

/// Emits half a second of sinusoid plus seeded noise per station, round robin.
pub struct SyntheticSource {
    stations: Vec<SyntheticStation>,
    cursor: usize,
    emitted: Vec<u64>, // samples produced per station
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(stations: Vec<SyntheticStation>, seed: u64) -> Self {
        let emitted = vec![0; stations.len()];
        Self {
            stations,
            cursor: 0,
            emitted,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<WaveformFrame>, ScopeError> {
        if self.stations.is_empty() {
            return Ok(None);
        }
        let idx = self.cursor % self.stations.len();
        self.cursor += 1;
        let station = &self.stations[idx];
        let count = (station.sample_rate / 2).max(1) as u64;
        let start = self.emitted[idx];
        let rate = station.sample_rate as f64;
        let samples = (start..start + count)
            .map(|n| {
                let t = n as f64 / rate;
                let base = (2.0 * PI * station.freq_hz * t).sin() * station.amplitude;
                let jitter = if station.noise > 0.0 {
                    self.rng.gen_range(-station.noise..station.noise)
                } else {
                    0.0
                };
                base + jitter
            })
            .collect();
        self.emitted[idx] += count;
        Ok(Some(WaveformFrame {
            station_id: station.station_id,
            sample_rate: station.sample_rate,
            precision: station.precision,
            samples,
        }))
    }
}
