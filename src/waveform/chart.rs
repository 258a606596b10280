use crate::config::DisplayConfig;
use crate::stream::decimate::{fit_to_length, stretch};
use crate::stream::{StationSnapshot, StreamSnapshot};
use crate::waveform::layout::{channel_layouts, time_labels};
use crate::waveform::view::{WaveformChannel, WaveformRenderData};

/// Builds one chart frame for the configured stations, top to bottom.
/// Stations that have not reported yet get an all-gap trace.
pub fn build_chart(snapshot: &StreamSnapshot, display: &DisplayConfig) -> WaveformRenderData {
    let length = display.chart_length();
    let layouts = channel_layouts(&display.station_ids, display.chart_height, display.gap_reduction);

    let mut channels: Vec<WaveformChannel> = display
        .station_ids
        .iter()
        .zip(layouts)
        .map(|(&station_id, layout)| {
            let station = snapshot.station(station_id);
            let points = match station {
                Some(station) => {
                    channel_points(station, layout.baseline, display.display_rate_hz, length)
                }
                None => vec![f32::NAN; length],
            };
            let label = match station {
                Some(station) => format!("{station_id} {}", station.config.network.label()),
                None => station_id.to_string(),
            };
            WaveformChannel {
                station_id,
                baseline: layout.baseline,
                color: layout.color,
                points,
                order: 0,
                label,
            }
        })
        .collect();

    let ranks = rank_by_deviation(&channels.iter().map(|c| c.max_deviation()).collect::<Vec<_>>());
    for (channel, rank) in channels.iter_mut().zip(ranks) {
        channel.order = rank;
    }

    WaveformRenderData {
        length,
        height: display.chart_height,
        channels,
        time_labels: time_labels(length, display.display_rate_hz),
    }
}

fn channel_points(
    station: &StationSnapshot,
    baseline: f32,
    display_rate: usize,
    length: usize,
) -> Vec<f32> {
    let scale = station.config.scale();
    let stretched = stretch(&station.samples, station.config.sample_rate, display_rate as u32);
    let points = stretched
        .iter()
        .map(|&v| (v * scale) as f32 + baseline)
        .collect();
    fit_to_length(points, length)
}

/// Rank of each entry in an ascending, stable sort of `deviations`.
pub fn rank_by_deviation(deviations: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..deviations.len()).collect();
    indices.sort_by(|&a, &b| deviations[a].total_cmp(&deviations[b]));
    let mut ranks = vec![0; deviations.len()];
    for (rank, idx) in indices.into_iter().enumerate() {
        ranks[idx] = rank;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::stream::StationConfig;

    fn snapshot(id: u32, rate: u32, network: Network, samples: Vec<f64>) -> StationSnapshot {
        StationSnapshot {
            config: StationConfig {
                station_id: id,
                sample_rate: rate,
                network,
            },
            samples,
        }
    }

    #[test]
    fn ranks_follow_deviation() {
        assert_eq!(rank_by_deviation(&[5.0, 50.0, 1.0]), vec![1, 2, 0]);
        assert_eq!(rank_by_deviation(&[2.0, 2.0]), vec![0, 1]);
    }

    #[test]
    fn chart_channels_have_fixed_length() {
        let display = DisplayConfig {
            station_ids: vec![1, 2, 3],
            ..DisplayConfig::default()
        };
        let stream = StreamSnapshot {
            stations: vec![
                snapshot(1, 20, Network::SeNet, vec![0.1; 1200]),
                snapshot(2, 50, Network::MsNet, vec![0.0; 3000]),
            ],
        };
        let chart = build_chart(&stream, &display);
        assert_eq!(chart.length, 3000);
        assert_eq!(chart.channels.len(), 3);
        for channel in &chart.channels {
            assert_eq!(channel.points.len(), 3000);
        }
        let first = &chart.channels[0];
        assert!((first.points[2999] - (first.baseline + 2.0)).abs() < 1e-4);
        assert!(chart.channels[2].points.iter().all(|v| v.is_nan()));
        assert_eq!(chart.channels[0].label, "1 SE-Net");
        assert_eq!(chart.channels[2].label, "3");
    }

    #[test]
    fn loudest_channel_is_drawn_first() {
        let display = DisplayConfig {
            station_ids: vec![10, 20, 30],
            ..DisplayConfig::default()
        };
        let stream = StreamSnapshot {
            stations: vec![
                snapshot(10, 50, Network::SeNet, vec![0.25; 3000]),
                snapshot(20, 50, Network::SeNet, vec![2.5; 3000]),
                snapshot(30, 50, Network::SeNet, vec![0.05; 3000]),
            ],
        };
        let chart = build_chart(&stream, &display);
        let orders: Vec<usize> = chart.channels.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![1, 2, 0]);
        let sequence: Vec<u32> = chart.draw_sequence().iter().map(|c| c.station_id).collect();
        assert_eq!(sequence, vec![20, 10, 30]);
    }

    #[test]
    fn gaps_survive_into_points() {
        let display = DisplayConfig {
            station_ids: vec![5],
            ..DisplayConfig::default()
        };
        let mut samples = vec![0.0; 3000];
        samples[100] = f64::NAN;
        let stream = StreamSnapshot {
            stations: vec![snapshot(5, 50, Network::MsNet, samples)],
        };
        let chart = build_chart(&stream, &display);
        assert!(chart.channels[0].points[100].is_nan());
        assert!(!chart.channels[0].points[101].is_nan());
    }
}
