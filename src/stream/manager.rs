use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::config::{DisplayConfig, Network};
use crate::dsp::FilterCache;
use crate::error::ScopeError;
use crate::stream::buffer::{StationChannel, StationConfig, StationSnapshot};
use crate::stream::source::{FrameSource, WaveformFrame};

/// Flushes without data after which a station's filter is dropped.
pub const FILTER_IDLE_TICKS: u32 = 5;

/// Per-flush bookkeeping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub stations: usize,
    pub appended: usize,
    pub idle_stations: usize,
    pub evicted_filters: usize,
    /// Stations flushed raw because every cached filter was already in use this tick.
    pub unfiltered: usize,
}

/// All stations' snapshots at one instant.
#[derive(Clone, Debug, Default)]
pub struct StreamSnapshot {
    pub stations: Vec<StationSnapshot>,
}

impl StreamSnapshot {
    pub fn station(&self, station_id: u32) -> Option<&StationSnapshot> {
        self.stations
            .iter()
            .find(|s| s.config.station_id == station_id)
    }
}

/// Owns every station's buffers and band-pass state; fed by frames, drained by ticks.
pub struct StreamManager {
    display: DisplayConfig,
    stations: HashMap<u32, StationChannel>,
    filters: FilterCache,
}

impl StreamManager {
    pub fn new(display: DisplayConfig) -> Self {
        let filters = FilterCache::with_capacity(display.filter_cache_capacity);
        Self {
            display,
            stations: HashMap::new(),
            filters,
        }
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn station_config(&self, station_id: u32) -> Option<StationConfig> {
        self.stations.get(&station_id).map(|s| *s.config())
    }

    pub fn filters(&self) -> &FilterCache {
        &self.filters
    }

    /// Queues a frame; the first frame of a station fixes its rate and network.
    pub fn ingest(&mut self, frame: &WaveformFrame) -> Result<(), ScopeError> {
        frame.validate()?;
        if !self.stations.contains_key(&frame.station_id) {
            let network = Network::from_precision(frame.precision);
            let config = StationConfig {
                station_id: frame.station_id,
                sample_rate: frame.sample_rate,
                network,
            };
            info!(
                "station {} active: {} Hz, {} (scale {})",
                frame.station_id,
                frame.sample_rate,
                network.label(),
                network.scale()
            );
            let channel = StationChannel::with_history_seconds(config, self.display.duration_secs)?;
            self.stations.insert(frame.station_id, channel);
        }
        if let Some(channel) = self.stations.get_mut(&frame.station_id) {
            if channel.config().sample_rate != frame.sample_rate {
                debug!(
                    "station {} sent {} Hz but is locked to {} Hz",
                    frame.station_id,
                    frame.sample_rate,
                    channel.config().sample_rate
                );
            }
            channel.push(&frame.samples);
        }
        Ok(())
    }

    /// Pulls everything a source has ready.
    pub fn pump<S: FrameSource>(&mut self, source: &mut S) -> Result<usize, ScopeError> {
        let mut frames = 0;
        while let Some(frame) = source.next_frame()? {
            self.ingest(&frame)?;
            frames += 1;
        }
        Ok(frames)
    }

    /// The once-per-second flush of every station into its rolling buffer.
    ///
    /// Stations that already hold a filter go first, and no filter used in
    /// this tick is evicted by a later station in the same tick.
    pub fn tick(&mut self) -> Result<TickReport, ScopeError> {
        let mut report = TickReport {
            stations: self.stations.len(),
            ..TickReport::default()
        };
        let mut order: Vec<u32> = self.stations.keys().copied().collect();
        order.sort_by_key(|id| (!self.filters.contains(*id), *id));

        let mut filtered = HashSet::with_capacity(order.len());
        let mut live = Vec::with_capacity(order.len());
        for id in order {
            let Some(channel) = self.stations.get_mut(&id) else {
                continue;
            };
            let has_data = channel.pending_len() > 0;
            let filter = if self.display.bandpass && has_data {
                let filter = self.filters.get_sparing(id, &filtered)?;
                if filter.is_none() {
                    report.unfiltered += 1;
                }
                filtered.insert(id);
                filter
            } else {
                None
            };
            report.appended += channel.flush(filter);
            if channel.idle_ticks() == 0 {
                live.push(id);
            } else {
                report.idle_stations += 1;
                if channel.idle_ticks() < FILTER_IDLE_TICKS {
                    live.push(id);
                }
            }
        }
        if report.unfiltered > 0 {
            warn!(
                "{} stations passed through unfiltered; filter cache holds {}",
                report.unfiltered,
                self.filters.capacity()
            );
        }
        report.evicted_filters = self.filters.evict_stale(&live);
        Ok(report)
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        let mut stations: Vec<StationSnapshot> =
            self.stations.values().map(|s| s.snapshot()).collect();
        stations.sort_by_key(|s| s.config.station_id);
        StreamSnapshot { stations }
    }

    pub fn station_snapshot(&self, station_id: u32) -> Option<StationSnapshot> {
        self.stations.get(&station_id).map(|s| s.snapshot())
    }

    pub fn clear(&mut self) {
        self.stations.clear();
        self.filters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::source::ManualSource;

    fn frame(id: u32, rate: u32, precision: u8, n: usize) -> WaveformFrame {
        WaveformFrame {
            station_id: id,
            sample_rate: rate,
            precision,
            samples: vec![1.0; n],
        }
    }

    #[test]
    fn first_frame_activates_station() {
        let mut manager = StreamManager::new(DisplayConfig::default());
        assert!(manager.station_config(7).is_none());
        manager.ingest(&frame(7, 20, 2, 5)).unwrap();
        manager.ingest(&frame(7, 100, 1, 5)).unwrap();
        let config = manager.station_config(7).unwrap();
        assert_eq!(config.sample_rate, 20);
        assert_eq!(config.network, Network::SeNet);
    }

    #[test]
    fn ticks_keep_buffers_at_capacity() {
        let mut manager = StreamManager::new(DisplayConfig::default());
        for _ in 0..90 {
            manager.ingest(&frame(1, 20, 2, 20)).unwrap();
            manager.ingest(&frame(2, 50, 1, 50)).unwrap();
            let report = manager.tick().unwrap();
            assert_eq!(report.appended, 70);
        }
        let snap = manager.snapshot();
        assert_eq!(snap.station(1).unwrap().samples.len(), 1200);
        assert_eq!(snap.station(2).unwrap().samples.len(), 3000);
        assert_eq!(manager.filters().len(), 2);
    }

    #[test]
    fn idle_station_loses_its_filter_but_keeps_its_buffer() {
        let mut manager = StreamManager::new(DisplayConfig::default());
        manager.ingest(&frame(1, 20, 2, 20)).unwrap();
        manager.tick().unwrap();
        assert!(manager.filters().contains(1));
        let mut evicted = 0;
        for _ in 0..FILTER_IDLE_TICKS {
            evicted += manager.tick().unwrap().evicted_filters;
        }
        assert_eq!(evicted, 1);
        assert!(!manager.filters().contains(1));
        assert_eq!(manager.station_count(), 1);
    }

    #[test]
    fn filters_survive_when_stations_outnumber_the_cache() {
        let display = DisplayConfig {
            filter_cache_capacity: 2,
            ..DisplayConfig::default()
        };
        let mut manager = StreamManager::new(display);
        for _ in 0..30 {
            for id in 1..=3 {
                manager.ingest(&frame(id, 50, 1, 50)).unwrap();
            }
            let report = manager.tick().unwrap();
            assert_eq!(report.unfiltered, 1);
        }
        assert!(manager.filters().contains(1) && manager.filters().contains(2));

        for id in 1..=2 {
            let snap = manager.station_snapshot(id).unwrap();
            let settled = snap.samples[2950..].iter().fold(0.0f64, |m, v| m.max(v.abs()));
            assert!(settled < 0.05, "station {id} keeps restarting: {settled}");
        }
        let raw = manager.station_snapshot(3).unwrap();
        assert_eq!(raw.samples[2999], 1.0);
    }

    #[test]
    fn pump_drains_source() {
        let mut manager = StreamManager::new(DisplayConfig::default());
        let mut source = ManualSource::new(vec![frame(1, 50, 1, 10), frame(2, 50, 1, 10)]);
        assert_eq!(manager.pump(&mut source).unwrap(), 2);
        assert_eq!(manager.station_count(), 2);
    }

    #[test]
    fn bandpass_can_be_disabled() {
        let display = DisplayConfig {
            bandpass: false,
            ..DisplayConfig::default()
        };
        let mut manager = StreamManager::new(display);
        manager.ingest(&frame(3, 50, 1, 50)).unwrap();
        manager.tick().unwrap();
        assert!(manager.filters().is_empty());
        let snap = manager.station_snapshot(3).unwrap();
        assert_eq!(snap.samples[2999], 1.0);
    }
}
