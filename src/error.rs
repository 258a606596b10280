use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("filter stage mismatch: {numerators} numerator rows vs {denominators} denominator rows")]
    FilterStageMismatch {
        numerators: usize,
        denominators: usize,
    },
    #[error("filter stage {stage} is malformed (needs three coefficients and a non-zero a0)")]
    MalformedSection { stage: usize },
    #[error("FFT size must be a power of two, got {0}")]
    FftSizeNotPowerOfTwo(usize),
    #[error("window size {window_size} does not fit in FFT size {fft_size}")]
    InvalidWindow { window_size: usize, fft_size: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("telemetry at {received} is not newer than {latest}")]
    StaleTelemetry { received: i64, latest: i64 },
    #[error("telemetry fetch failed: {0}")]
    Fetch(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("processing worker is no longer running")]
    WorkerGone,
    #[error("failed to render: {0}")]
    Render(String),
}

impl ScopeError {
    /// Expected transient condition that callers drop without surfacing.
    pub fn is_stale(&self) -> bool {
        matches!(self, ScopeError::StaleTelemetry { .. })
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Render(format!("{value:?}"))
    }
}

impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Render(value.to_string())
    }
}

impl From<serde_json::Error> for ScopeError {
    fn from(value: serde_json::Error) -> Self {
        ScopeError::Config(value.to_string())
    }
}
