pub mod board;
pub mod features;
pub mod feed;
pub mod rts;

pub use board::{AlertStation, TelemetryBoard, TelemetryUpdate};
pub use features::{box_color, box_intensities, BoxIntensity, FeatureBuffers, StationFeature};
pub use feed::{FetchWorker, ReplayFeed, TelemetryFeed, TelemetryPoller};
pub use rts::{
    intensity_color, intensity_to_int, parse_directory, RtsResponse, RtsStation, RtsTracker,
    StationDirectory, StationInfo,
};
