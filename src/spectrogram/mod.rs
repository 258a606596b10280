pub mod bank;
pub mod chunk;
pub mod colormap;
pub mod display;
pub mod model;
pub mod renderer;

pub use bank::SpectrogramBank;
pub use chunk::ChunkProcessor;
pub use colormap::{ColorMap, Palette, Rgb};
pub use display::Spectrogram;
pub use model::SpectrogramModel;
pub use renderer::{present, RenderOptions, SpectrogramRaster};
