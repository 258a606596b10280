use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::window::WindowKind;
use crate::error::ScopeError;
use crate::spectrogram::colormap::Palette;

/// Seconds of history kept in every rolling display buffer.
pub const DISPLAY_DURATION_SECS: usize = 60;
/// Rate every chart channel is stretched to before drawing.
pub const DISPLAY_RATE_HZ: usize = 50;
/// Vertical chart extent in layout units; baselines live inside it.
pub const CHART_HEIGHT_UNITS: f32 = 630.0;

/// Which of the two station networks a channel belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Strong-motion network; counts are scaled by 20.
    SeNet,
    /// Velocity network; counts are scaled by 15000.
    MsNet,
}

impl Network {
    pub fn from_precision(precision: u8) -> Self {
        if precision == 2 {
            Network::SeNet
        } else {
            Network::MsNet
        }
    }

    pub fn scale(self) -> f64 {
        match self {
            Network::SeNet => 20.0,
            Network::MsNet => 15000.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Network::SeNet => "SE-Net",
            Network::MsNet => "MS-Net",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub duration_secs: usize,
    pub display_rate_hz: usize,
    pub flush_interval_ms: u64,
    pub station_ids: Vec<u32>,
    pub chart_height: f32,
    pub gap_reduction: f32,
    pub bandpass: bool,
    pub filter_cache_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            duration_secs: DISPLAY_DURATION_SECS,
            display_rate_hz: DISPLAY_RATE_HZ,
            flush_interval_ms: 1000,
            station_ids: vec![4812424, 6126556, 11336952, 11334880, 1480496],
            chart_height: CHART_HEIGHT_UNITS,
            gap_reduction: 50.0,
            bandpass: true,
            filter_cache_capacity: 32,
        }
    }
}

impl DisplayConfig {
    pub fn chart_length(&self) -> usize {
        self.display_rate_hz * self.duration_secs
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub sample_rate: f32,
    pub window_size: usize,
    pub overlap: usize,
    /// Falls back to the next power of two at or above `window_size`.
    pub fft_size: Option<usize>,
    pub window: WindowKind,
    pub min_db: f32,
    pub max_db: f32,
    pub palette: Palette,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            sample_rate: 50.0,
            window_size: 64,
            overlap: 48,
            fft_size: Some(128),
            window: WindowKind::Hann,
            min_db: -60.0,
            max_db: 0.0,
            palette: Palette::Jet,
        }
    }
}

impl SpectrogramConfig {
    pub fn hop_size(&self) -> usize {
        self.window_size.saturating_sub(self.overlap).max(1)
    }

    pub fn effective_fft_size(&self) -> usize {
        self.fft_size
            .unwrap_or_else(|| self.window_size.max(1).next_power_of_two())
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.sample_rate <= 0.0 {
            return Err(ScopeError::InvalidSampleRate);
        }
        let fft_size = self.effective_fft_size();
        if self.window_size == 0 || self.window_size > fft_size {
            return Err(ScopeError::InvalidWindow {
                window_size: self.window_size,
                fft_size,
            });
        }
        if self.max_db <= self.min_db {
            return Err(ScopeError::Config(format!(
                "max_db ({}) must exceed min_db ({})",
                self.max_db, self.min_db
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub timeout_ms: u64,
    /// 0 follows the live feed; anything else replays from that time (unix
    /// seconds), advancing by one each poll.
    pub replay_time: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            replay_time: 0,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub display: DisplayConfig,
    pub spectrogram: SpectrogramConfig,
    pub feed: FeedConfig,
}

impl ScopeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ScopeError> {
        let config: ScopeConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScopeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| ScopeError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.display.display_rate_hz == 0 || self.display.duration_secs == 0 {
            return Err(ScopeError::Config(
                "display rate and duration must be non-zero".into(),
            ));
        }
        if self.display.filter_cache_capacity == 0 {
            return Err(ScopeError::Config(
                "filter cache needs room for at least one station".into(),
            ));
        }
        self.spectrogram.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ScopeConfig::from_json_str(r#"{"spectrogram":{"palette":"viridis","overlap":32}}"#)
                .unwrap();
        assert_eq!(config.spectrogram.palette, Palette::Viridis);
        assert_eq!(config.spectrogram.hop_size(), 32);
        assert_eq!(config.display.chart_length(), 3000);
        assert_eq!(config.feed.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn fft_size_defaults_to_next_power_of_two() {
        let config = SpectrogramConfig {
            window_size: 100,
            fft_size: None,
            ..SpectrogramConfig::default()
        };
        assert_eq!(config.effective_fft_size(), 128);
    }

    #[test]
    fn hop_never_drops_below_one() {
        let config = SpectrogramConfig {
            overlap: 64,
            ..SpectrogramConfig::default()
        };
        assert_eq!(config.hop_size(), 1);
    }

    #[test]
    fn precision_selects_network_scale() {
        assert_eq!(Network::from_precision(2).scale(), 20.0);
        assert_eq!(Network::from_precision(1).scale(), 15000.0);
        assert_eq!(Network::from_precision(2).label(), "SE-Net");
    }

    #[test]
    fn rejects_inverted_db_range() {
        let raw = r#"{"spectrogram":{"min_db":0.0,"max_db":-10.0}}"#;
        assert!(ScopeConfig::from_json_str(raw).is_err());
    }
}
