pub mod chart;
pub mod layout;
pub mod renderer;
pub mod view;

pub use chart::{build_chart, rank_by_deviation};
pub use layout::{channel_layouts, station_color, time_labels, ChannelLayout};
pub use renderer::{Theme, WaveformRenderer};
pub use view::{TimeLabel, WaveformChannel, WaveformRenderData};
