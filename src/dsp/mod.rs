pub mod fft;
pub mod filter;
pub mod filter_cache;
pub mod window;

pub use fft::FftExecutor;
pub use filter::{BandPass, SosCascade, SosRow};
pub use filter_cache::FilterCache;
pub use window::WindowKind;
