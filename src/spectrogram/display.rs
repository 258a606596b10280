use crate::config::SpectrogramConfig;
use crate::error::ScopeError;
use crate::spectrogram::chunk::ChunkProcessor;
use crate::spectrogram::colormap::{ColorMap, Palette};
use crate::spectrogram::model::SpectrogramModel;
use crate::spectrogram::renderer::{self, RenderOptions, SpectrogramRaster, BACKGROUND};
use crate::surface::Surface;

/// One channel's spectrogram: model, frame processor and palette together.
pub struct Spectrogram {
    station_id: u32,
    model: SpectrogramModel,
    processor: ChunkProcessor,
    colormap: ColorMap,
}

impl Spectrogram {
    pub fn new(station_id: u32, config: SpectrogramConfig) -> Result<Self, ScopeError> {
        let processor = ChunkProcessor::new(&config)?;
        let colormap = ColorMap::new(config.palette);
        Ok(Self {
            station_id,
            model: SpectrogramModel::new(config)?,
            processor,
            colormap,
        })
    }

    pub fn set_data(&mut self, data: Vec<f32>) {
        self.model.set_data(data);
    }

    pub fn update_config(&mut self, config: SpectrogramConfig) -> Result<(), ScopeError> {
        if !self.processor.matches(&config) {
            self.processor = ChunkProcessor::new(&config)?;
        }
        self.colormap.set_map(config.palette);
        self.model.update_config(config)
    }

    pub fn set_colormap(&mut self, palette: Palette) {
        self.colormap.set_map(palette);
    }

    pub fn duration_secs(&self) -> f32 {
        self.model.duration_secs()
    }

    pub fn sample_rate(&self) -> f32 {
        self.model.config().sample_rate
    }

    pub fn config(&self) -> &SpectrogramConfig {
        self.model.config()
    }

    /// Rasterizes the samples covered by `time_range` (seconds), or `None`
    /// when the range holds no samples.
    pub fn rasterize(&mut self, time_range: (f32, f32)) -> Option<SpectrogramRaster> {
        let data = self.model.data();
        if data.is_empty() {
            return None;
        }
        let sample_rate = self.sample_rate();
        let start = (time_range.0 * sample_rate).max(0.0).floor() as usize;
        let end = ((time_range.1 * sample_rate).floor().max(0.0) as usize).min(data.len());
        if end <= start {
            return None;
        }
        let image = self.processor.process(
            data,
            start,
            end,
            self.model.config(),
            &self.colormap,
        );
        Some(SpectrogramRaster {
            station_id: self.station_id,
            sample_rate,
            image,
        })
    }

    /// Draws the selected time and frequency window onto `surface`.
    pub fn render(&mut self, surface: &mut Surface, options: &RenderOptions) {
        match self.rasterize(options.time_range) {
            Some(raster) => renderer::present(surface, &raster, options),
            None => {
                surface.calibrate(options.css_width, options.css_height, options.pixel_ratio);
                surface.fill(BACKGROUND);
            }
        }
    }
}
