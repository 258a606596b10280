use std::collections::VecDeque;

use log::warn;

use crate::config::Network;
use crate::dsp::BandPass;
use crate::error::ScopeError;

/// Highest per-station rate accepted; seismometers on the feed report 20 or 50 Hz.
pub const MAX_SAMPLE_RATE: u32 = 1000;

/// Station identity and format, captured from the first frame seen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StationConfig {
    pub station_id: u32,
    pub sample_rate: u32,
    pub network: Network,
}

impl StationConfig {
    pub fn scale(&self) -> f64 {
        self.network.scale()
    }
}

/// Immutable copy of one station's rolling buffer handed to renderers.
#[derive(Clone, Debug)]
pub struct StationSnapshot {
    pub config: StationConfig,
    pub samples: Vec<f64>, // oldest first, NaN marks a gap
}

/// Ingest queue plus fixed-length rolling display buffer for one station.
pub struct StationChannel {
    config: StationConfig,
    pending: Vec<f64>,
    pending_cap: usize,
    rolling: VecDeque<f64>,
    capacity: usize,
    idle_ticks: u32,
}

impl StationChannel {
    pub fn with_history_seconds(
        config: StationConfig,
        history_seconds: usize,
    ) -> Result<Self, ScopeError> {
        if config.sample_rate == 0 || config.sample_rate > MAX_SAMPLE_RATE {
            return Err(ScopeError::InvalidSampleRate);
        }
        let capacity = (config.sample_rate as usize)
            .checked_mul(history_seconds)
            .ok_or_else(|| ScopeError::Config(format!("{history_seconds} s of history is too long")))?;
        let mut rolling = VecDeque::with_capacity(capacity);
        rolling.resize(capacity, f64::NAN);
        Ok(Self {
            config,
            pending: Vec::with_capacity(config.sample_rate as usize),
            pending_cap: capacity,
            rolling,
            capacity,
            idle_ticks: 0,
        })
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rolling.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rolling.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consecutive flushes that found nothing queued.
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    /// Queues samples until the next flush. The queue never holds more than
    /// one display window; the oldest queued samples go first.
    pub fn push(&mut self, samples: &[f64]) {
        self.pending.extend_from_slice(samples);
        if self.pending.len() > self.pending_cap {
            let overflow = self.pending.len() - self.pending_cap;
            warn!(
                "station {} ingest queue overflowed, dropping {overflow} samples",
                self.config.station_id
            );
            self.pending.drain(..overflow);
        }
    }

    /// Moves everything queued into the rolling buffer, band-passing it on the
    /// way when a filter is given. An empty queue appends one second of gap.
    /// Returns the number of samples appended.
    pub fn flush(&mut self, filter: Option<&mut BandPass>) -> usize {
        let drained: Vec<f64> = if self.pending.is_empty() {
            self.idle_ticks = self.idle_ticks.saturating_add(1);
            vec![f64::NAN; self.config.sample_rate as usize]
        } else {
            self.idle_ticks = 0;
            let raw: Vec<f64> = self.pending.drain(..).collect();
            match filter {
                Some(filter) => filter.apply_buffer(&raw),
                None => raw,
            }
        };
        let appended = drained.len();
        self.rolling.extend(drained);
        while self.rolling.len() > self.capacity {
            self.rolling.pop_front();
        }
        appended
    }

    pub fn snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            config: self.config,
            samples: self.rolling.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(rate: u32) -> StationChannel {
        let config = StationConfig {
            station_id: 42,
            sample_rate: rate,
            network: Network::SeNet,
        };
        StationChannel::with_history_seconds(config, 60).unwrap()
    }

    #[test]
    fn rolling_length_is_constant() {
        let mut channel = station(20);
        assert_eq!(channel.len(), 1200);
        for tick in 0..150 {
            channel.push(&vec![tick as f64; 20]);
            assert_eq!(channel.flush(None), 20);
            assert_eq!(channel.len(), 1200);
        }
        let snap = channel.snapshot();
        assert_eq!(snap.samples[1199], 149.0);
        assert_eq!(snap.samples[0], 90.0);
    }

    #[test]
    fn starts_as_all_gap() {
        let channel = station(50);
        assert!(channel.snapshot().samples.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn empty_tick_appends_one_second_of_gap() {
        let mut channel = station(20);
        channel.push(&[1.0; 20]);
        channel.flush(None);
        assert_eq!(channel.flush(None), 20);
        assert_eq!(channel.idle_ticks(), 1);
        let snap = channel.snapshot();
        assert!(snap.samples[1180..].iter().all(|v| v.is_nan()));
        assert_eq!(snap.samples[1179], 1.0);
    }

    #[test]
    fn irregular_bursts_are_drained_in_full() {
        let mut channel = station(20);
        channel.push(&[1.0; 7]);
        channel.push(&[2.0; 31]);
        assert_eq!(channel.pending_len(), 38);
        assert_eq!(channel.flush(None), 38);
        assert_eq!(channel.pending_len(), 0);
        assert_eq!(channel.len(), 1200);
    }

    #[test]
    fn ingest_queue_is_capped() {
        let mut channel = station(20);
        channel.push(&vec![0.0; 5000]);
        assert_eq!(channel.pending_len(), 1200);
    }

    #[test]
    fn flush_applies_filter() {
        let mut channel = station(50);
        let mut bpf = BandPass::seismic().unwrap();
        channel.push(&[1.0; 50]);
        channel.flush(Some(&mut bpf));
        assert!(!bpf.is_at_rest());
        let snap = channel.snapshot();
        assert!(snap.samples[2999] != 1.0);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let config = StationConfig {
            station_id: 1,
            sample_rate: 0,
            network: Network::MsNet,
        };
        assert!(StationChannel::with_history_seconds(config, 60).is_err());
    }

    #[test]
    fn absurd_rate_is_rejected_before_allocating() {
        let config = StationConfig {
            station_id: 1,
            sample_rate: u32::MAX,
            network: Network::MsNet,
        };
        let err = StationChannel::with_history_seconds(config, 60);
        assert!(matches!(err, Err(ScopeError::InvalidSampleRate)));
    }
}
