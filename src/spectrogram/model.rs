use crate::config::SpectrogramConfig;
use crate::error::ScopeError;

/// Configuration plus the signal currently shown. The signal is replaced
/// wholesale on every update.
#[derive(Clone, Debug)]
pub struct SpectrogramModel {
    config: SpectrogramConfig,
    data: Vec<f32>,
}

impl SpectrogramModel {
    pub fn new(config: SpectrogramConfig) -> Result<Self, ScopeError> {
        config.validate()?;
        Ok(Self {
            config,
            data: Vec::new(),
        })
    }

    pub fn config(&self) -> &SpectrogramConfig {
        &self.config
    }

    pub fn fft_size(&self) -> usize {
        self.config.effective_fft_size()
    }

    pub fn set_data(&mut self, data: Vec<f32>) {
        self.data = data;
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn update_config(&mut self, config: SpectrogramConfig) -> Result<(), ScopeError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn duration_secs(&self) -> f32 {
        self.data.len() as f32 / self.config.sample_rate
    }
}
