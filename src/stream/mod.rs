pub mod buffer;
pub mod decimate;
pub mod manager;
pub mod source;

pub use buffer::{StationChannel, StationConfig, StationSnapshot, MAX_SAMPLE_RATE};
pub use manager::{StreamManager, StreamSnapshot, TickReport};
pub use source::{FrameSource, ManualSource, SyntheticSource, SyntheticStation, WaveformFrame};
