use std::collections::HashMap;

use log::debug;

use crate::config::SpectrogramConfig;
use crate::error::ScopeError;
use crate::spectrogram::display::Spectrogram;
use crate::spectrogram::renderer::SpectrogramRaster;

/// Shortest signal worth running the STFT over.
pub const MIN_SAMPLES: usize = 64;

/// One spectrogram per station, rebuilt whenever the station's rate changes.
pub struct SpectrogramBank {
    template: SpectrogramConfig,
    spectrograms: HashMap<u32, Spectrogram>,
}

impl SpectrogramBank {
    pub fn new(template: SpectrogramConfig) -> Self {
        Self {
            template,
            spectrograms: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.spectrograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectrograms.is_empty()
    }

    /// Rasterizes the full buffer of one station. Missing samples are drawn as zero.
    /// Returns `None` while the station has fewer than [`MIN_SAMPLES`] samples.
    pub fn rasterize(
        &mut self,
        station_id: u32,
        sample_rate: f32,
        samples: &[f64],
    ) -> Result<Option<SpectrogramRaster>, ScopeError> {
        if samples.len() < MIN_SAMPLES {
            return Ok(None);
        }
        let spectrogram = self.ensure(station_id, sample_rate)?;
        let data: Vec<f32> = samples
            .iter()
            .map(|&v| if v.is_nan() { 0.0 } else { v as f32 })
            .collect();
        let duration = data.len() as f32 / sample_rate;
        spectrogram.set_data(data);
        Ok(spectrogram.rasterize((0.0, duration)))
    }

    pub fn remove(&mut self, station_id: u32) {
        self.spectrograms.remove(&station_id);
    }

    pub fn clear(&mut self) {
        self.spectrograms.clear();
    }

    fn ensure(&mut self, station_id: u32, sample_rate: f32) -> Result<&mut Spectrogram, ScopeError> {
        let stale = self
            .spectrograms
            .get(&station_id)
            .map(|s| s.sample_rate() != sample_rate)
            .unwrap_or(true);
        if stale {
            debug!("building spectrogram for station {station_id} at {sample_rate} Hz");
            let config = SpectrogramConfig {
                sample_rate,
                ..self.template.clone()
            };
            self.spectrograms
                .insert(station_id, Spectrogram::new(station_id, config)?);
        }
        self.spectrograms
            .get_mut(&station_id)
            .ok_or(ScopeError::InvalidSampleRate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_signals_are_skipped() {
        let mut bank = SpectrogramBank::new(SpectrogramConfig::default());
        assert!(bank.rasterize(1, 50.0, &[0.0; 63]).unwrap().is_none());
        assert!(bank.is_empty());
    }

    #[test]
    fn rate_change_rebuilds_station() {
        let mut bank = SpectrogramBank::new(SpectrogramConfig::default());
        let first = bank.rasterize(1, 50.0, &[0.0; 500]).unwrap().unwrap();
        assert_eq!(first.sample_rate, 50.0);
        let second = bank.rasterize(1, 100.0, &[0.0; 500]).unwrap().unwrap();
        assert_eq!(second.sample_rate, 100.0);
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn gaps_become_zero() {
        let mut bank = SpectrogramBank::new(SpectrogramConfig::default());
        let mut samples = vec![f64::NAN; 128];
        samples.extend(vec![0.0; 128]);
        let raster = bank.rasterize(3, 50.0, &samples).unwrap().unwrap();
        assert_eq!(raster.image.width(), 16);
    }
}
