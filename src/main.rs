use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{error, info, warn};

use quakescope::config::ScopeConfig;
use quakescope::spectrogram::{present, RenderOptions};
use quakescope::stream::{FrameSource, SyntheticSource, SyntheticStation};
use quakescope::surface::Surface;
use quakescope::waveform::{Theme, WaveformRenderer};
use quakescope::{ProcessingWorker, TickMode};

const REPLY_BUDGET: Duration = Duration::from_secs(10);
const CHART_CSS: (f32, f32) = (1200.0, 630.0);
const SPECTROGRAM_CSS: (f32, f32) = (600.0, 200.0);

struct Args {
    config: Option<PathBuf>,
    seconds: u32,
    out: PathBuf,
}

fn usage() -> &'static str {
    "usage: quakescope [--config PATH] [--seconds N] [--out DIR]"
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        seconds: 90,
        out: PathBuf::from("out"),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--config" => {
                let value = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(value));
            }
            "--seconds" => {
                let value = iter.next().context("--seconds needs a number")?;
                args.seconds = value
                    .parse()
                    .with_context(|| format!("invalid --seconds value {value:?}"))?;
            }
            "--out" => {
                let value = iter.next().context("--out needs a directory")?;
                args.out = PathBuf::from(value);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}\n{}", usage()),
        }
    }
    Ok(args)
}

/// One synthetic station per configured id; every other one runs at 20 Hz
/// on the strong-motion network.
fn demo_stations(ids: &[u32]) -> Vec<SyntheticStation> {
    ids.iter()
        .enumerate()
        .map(|(i, &station_id)| {
            let strong_motion = i % 2 == 1;
            SyntheticStation {
                station_id,
                sample_rate: if strong_motion { 20 } else { 50 },
                precision: if strong_motion { 2 } else { 1 },
                freq_hz: 1.0 + i as f64 * 1.5,
                amplitude: if strong_motion { 1.0 } else { 0.002 },
                noise: if strong_motion { 0.2 } else { 0.0005 },
            }
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) if path.exists() => ScopeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        Some(path) => {
            warn!("{} not found, using defaults", path.display());
            ScopeConfig::default()
        }
        None => ScopeConfig::default(),
    };
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let station_ids = config.display.station_ids.clone();
    let worker = ProcessingWorker::spawn(config, TickMode::Manual)?;
    let faults = worker.subscribe_faults()?;
    let mut source = SyntheticSource::new(demo_stations(&station_ids), 7);

    // Two half-second frames per station make up one simulated second.
    let frames_per_second = source.station_count() * 2;
    for second in 0..args.seconds {
        for _ in 0..frames_per_second {
            if let Some(frame) = source.next_frame()? {
                worker.ingest(frame)?;
            }
        }
        let report = worker.flush()?.wait_timeout(REPLY_BUDGET)?;
        if second % 10 == 0 {
            info!(
                "t={second}s: {} stations, {} samples appended",
                report.stations, report.appended
            );
        }
    }

    let chart = worker.chart_frame()?.wait_timeout(REPLY_BUDGET)?;
    let mut surface = Surface::new(CHART_CSS.0, CHART_CSS.1, 1.0);
    WaveformRenderer::new(Theme::Dark).render(&mut surface, &chart)?;
    let chart_path = args.out.join("chart.png");
    fs::write(&chart_path, surface.encode_png()?)
        .with_context(|| format!("writing {}", chart_path.display()))?;
    info!("wrote {}", chart_path.display());

    let mut surface = Surface::new(SPECTROGRAM_CSS.0, SPECTROGRAM_CSS.1, 1.0);
    for station_id in station_ids {
        let Some(raster) = worker.spectrogram(station_id)?.wait_timeout(REPLY_BUDGET)? else {
            info!("station {station_id} has too little data for a spectrogram");
            continue;
        };
        let duration = args.seconds as f32;
        let options = RenderOptions {
            css_width: SPECTROGRAM_CSS.0,
            css_height: SPECTROGRAM_CSS.1,
            pixel_ratio: 1.0,
            time_range: (0.0, duration),
            freq_range: None,
        };
        present(&mut surface, &raster, &options);
        let path = args.out.join(format!("spectrogram_{station_id}.png"));
        fs::write(&path, surface.encode_png()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    while let Ok(fault) = faults.try_recv() {
        error!("worker fault during run: {}", fault.message);
    }
    worker.shutdown();
    Ok(())
}
