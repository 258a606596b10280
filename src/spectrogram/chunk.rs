use image::{Rgba, RgbaImage};

use crate::config::SpectrogramConfig;
use crate::dsp::{FftExecutor, WindowKind};
use crate::error::ScopeError;
use crate::spectrogram::colormap::ColorMap;

/// Slides the analysis window over a signal and rasterizes one column per hop.
pub struct ChunkProcessor {
    fft: FftExecutor,
    window: Vec<f32>,
    window_kind: WindowKind,
    input: Vec<f32>,
}

impl ChunkProcessor {
    pub fn new(config: &SpectrogramConfig) -> Result<Self, ScopeError> {
        config.validate()?;
        let fft = FftExecutor::with_size(config.effective_fft_size())?;
        let input = vec![0.0; fft.size()];
        Ok(Self {
            fft,
            window: config.window.coefficients(config.window_size),
            window_kind: config.window,
            input,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// True when `config` can reuse this processor's FFT plan and window table.
    pub fn matches(&self, config: &SpectrogramConfig) -> bool {
        self.fft.size() == config.effective_fft_size()
            && self.window.len() == config.window_size
            && self.window_kind == config.window
    }

    /// Raster of `ceil((end - start) / hop)` columns by `fft_size / 2 + 1` rows,
    /// frequency bin 0 on the bottom row. An empty range yields a 1x1 image.
    pub fn process(
        &mut self,
        data: &[f32],
        start: usize,
        end: usize,
        config: &SpectrogramConfig,
        colormap: &ColorMap,
    ) -> RgbaImage {
        let window_size = self.window.len();
        let hop = config.hop_size();
        if end <= start {
            return RgbaImage::new(1, 1);
        }
        let width = (end - start).div_ceil(hop);
        let height = self.fft.bins();
        let mut image = RgbaImage::new(width as u32, height as u32);

        let mut dc_sum = 0.0f64;
        let mut valid = 0usize;
        for value in data.iter().skip(start).take(window_size) {
            dc_sum += *value as f64;
            valid += 1;
        }

        for x in 0..width {
            let frame_start = start + x * hop;
            let mean = if valid > 0 {
                (dc_sum / valid as f64) as f32
            } else {
                0.0
            };

            let available = window_size.min(data.len().saturating_sub(frame_start));
            for i in 0..available {
                self.input[i] = (data[frame_start + i] - mean) * self.window[i];
            }
            for slot in &mut self.input[available..] {
                *slot = 0.0;
            }

            let magnitudes = self.fft.compute(&self.input, config.min_db, config.max_db);
            for (y, &value) in magnitudes.iter().enumerate() {
                let [r, g, b] = colormap.get_rgb(value);
                let row = (height - 1 - y) as u32;
                image.put_pixel(x as u32, row, Rgba([r, g, b, 255]));
            }

            if x + 1 < width {
                // Slide the running DC sum forward by one hop instead of re-summing.
                for value in data.iter().skip(frame_start).take(hop) {
                    dc_sum -= *value as f64;
                    valid -= 1;
                }
                for value in data.iter().skip(frame_start + window_size).take(hop) {
                    dc_sum += *value as f64;
                    valid += 1;
                }
            }
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::colormap::Palette;
    use std::f32::consts::PI;

    fn config() -> SpectrogramConfig {
        SpectrogramConfig {
            sample_rate: 50.0,
            window_size: 64,
            overlap: 48,
            fft_size: Some(128),
            ..SpectrogramConfig::default()
        }
    }

    #[test]
    fn zero_signal_shape() {
        let cfg = config();
        let mut processor = ChunkProcessor::new(&cfg).unwrap();
        let image = processor.process(&[0.0; 1024], 0, 1024, &cfg, &ColorMap::default());
        assert_eq!(image.width(), 64);
        assert_eq!(image.height(), 65);
    }

    #[test]
    fn empty_range_gives_placeholder() {
        let cfg = config();
        let mut processor = ChunkProcessor::new(&cfg).unwrap();
        let image = processor.process(&[1.0; 10], 5, 5, &cfg, &ColorMap::default());
        assert_eq!(image.dimensions(), (1, 1));
    }

    #[test]
    fn tone_lights_up_its_row_from_the_bottom() {
        let cfg = SpectrogramConfig {
            window: WindowKind::Rectangular,
            min_db: -40.0,
            max_db: 40.0,
            ..config()
        };
        let colormap = ColorMap::new(Palette::Grayscale);
        let mut processor = ChunkProcessor::new(&cfg).unwrap();
        // 8 cycles per 64-sample window lands on bin 16 of the 128-point FFT.
        let signal: Vec<f32> = (0..512)
            .map(|i| (2.0 * PI * 8.0 * i as f32 / 64.0).sin())
            .collect();
        let image = processor.process(&signal, 0, 256, &cfg, &colormap);
        let height = image.height();
        let column: Vec<u8> = (0..height).map(|row| image.get_pixel(3, row)[0]).collect();
        let brightest = column
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| **v)
            .map(|(row, _)| row as u32)
            .unwrap();
        assert_eq!(brightest, height - 1 - 16);
    }

    #[test]
    fn dc_offset_is_removed_per_frame() {
        let cfg = config();
        let colormap = ColorMap::new(Palette::Grayscale);
        let mut processor = ChunkProcessor::new(&cfg).unwrap();
        let image = processor.process(&[5.0; 256], 0, 256, &cfg, &colormap);
        // Frames fully inside the signal see a flat, DC-free input.
        for x in 0..4 {
            assert_eq!(image.get_pixel(x, image.height() - 1)[0], 0);
        }
    }

    #[test]
    fn processor_reuse_tracks_config() {
        let cfg = config();
        let processor = ChunkProcessor::new(&cfg).unwrap();
        assert!(processor.matches(&cfg));
        let wider = SpectrogramConfig {
            window_size: 128,
            ..cfg
        };
        assert!(!processor.matches(&wider));
    }
}
