use crate::spectrogram::colormap::Rgb;

#[derive(Clone, Debug, PartialEq)]
pub struct WaveformChannel {
    pub station_id: u32,
    /// Vertical rest position in chart units.
    pub baseline: f32,
    pub color: Rgb,
    /// One y-value per display slot, already scaled and offset; NaN is a gap.
    pub points: Vec<f32>,
    /// Rank by peak deviation from the baseline, 0 for the quietest channel.
    pub order: usize,
    pub label: String,
}

impl WaveformChannel {
    /// Largest distance of any present point from the baseline.
    pub fn max_deviation(&self) -> f32 {
        self.points
            .iter()
            .filter(|v| !v.is_nan())
            .fold(0.0f32, |acc, v| acc.max((v - self.baseline).abs()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimeLabel {
    /// Display slot index the label sits on.
    pub x: usize,
    pub text: String,
}

/// Everything the waveform renderer needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformRenderData {
    pub length: usize,
    pub height: f32,
    pub channels: Vec<WaveformChannel>,
    pub time_labels: Vec<TimeLabel>,
}

impl WaveformRenderData {
    /// Channels in painting order: loudest first so quieter traces end up on top.
    pub fn draw_sequence(&self) -> Vec<&WaveformChannel> {
        let mut sorted: Vec<&WaveformChannel> = self.channels.iter().collect();
        sorted.sort_by(|a, b| b.order.cmp(&a.order));
        sorted
    }
}
