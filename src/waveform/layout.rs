//! Fixed chart geometry: channel baselines, per-station colors and the time axis.

use crate::spectrogram::colormap::Rgb;
use crate::waveform::view::TimeLabel;

/// Where a chart channel rests and how it is colored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelLayout {
    pub baseline: f32,
    pub color: Rgb,
}

/// Baselines from top to bottom. The outer gaps are shrunk by `gap_reduction`
/// and the difference is shared among the inner gaps.
pub fn channel_layouts(station_ids: &[u32], height: f32, gap_reduction: f32) -> Vec<ChannelLayout> {
    let n = station_ids.len();
    if n == 0 {
        return Vec::new();
    }
    let base_gap = height / (n as f32 + 1.0);
    let top_gap = base_gap - gap_reduction;
    let middle_extra = if n > 1 {
        gap_reduction * 2.0 / (n as f32 - 1.0)
    } else {
        0.0
    };
    let middle_gap = base_gap + middle_extra;
    station_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| ChannelLayout {
            baseline: height - top_gap - middle_gap * i as f32,
            color: station_color(id),
        })
        .collect()
}

/// Stable, saturated color derived from the decimal station id.
pub fn station_color(station_id: u32) -> Rgb {
    let mut hash: i32 = 0;
    for c in station_id.to_string().bytes() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(c as i32);
    }
    let hash = hash.unsigned_abs();
    let hue = (hash % 360) as f32;
    let saturation = (85 + hash % 15) as f32;
    let lightness = (50 + hash % 10) as f32;
    hsl_to_rgb(hue / 360.0, saturation / 100.0, lightness / 100.0)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = if h < 1.0 / 6.0 {
        (c, x, 0.0)
    } else if h < 2.0 / 6.0 {
        (x, c, 0.0)
    } else if h < 3.0 / 6.0 {
        (0.0, c, x)
    } else if h < 4.0 / 6.0 {
        (0.0, x, c)
    } else if h < 5.0 / 6.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b)]
}

/// Labels every ten seconds, offset by five, counted back from the newest slot.
pub fn time_labels(length: usize, display_rate: usize) -> Vec<TimeLabel> {
    let interval = display_rate * 10;
    let offset = display_rate * 5;
    if interval == 0 {
        return Vec::new();
    }
    (0..length)
        .filter_map(|i| {
            let position = length - i;
            let seconds = position as f32 / display_rate as f32;
            (position % interval == offset && seconds > 0.0 && seconds <= 60.0).then(|| TimeLabel {
                x: i,
                text: format!("{seconds}"),
            })
        })
        .collect()
}
