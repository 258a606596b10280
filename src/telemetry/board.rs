use log::debug;
use serde_json::Value;

use crate::error::ScopeError;
use crate::telemetry::features::{box_intensities, BoxIntensity, FeatureBuffers};
use crate::telemetry::rts::{RtsResponse, RtsTracker, StationDirectory};

/// Alerting stations called out beside the map, strongest first.
pub const MAX_ALERT_CALLOUTS: usize = 4;
/// Floor of the intensity scale, reported when no station is present.
pub const MIN_INTENSITY: f64 = -3.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AlertStation {
    pub station_id: String,
    pub code: String,
    pub intensity: f64,
    pub coordinates: [f64; 2],
}

/// What the map layer receives for one accepted snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryUpdate {
    pub time: i64,
    pub geojson: Value,
    pub boxes: Vec<BoxIntensity>,
    pub max_intensity: f64,
    pub alerts: Vec<AlertStation>,
}

/// Station directory, staleness tracking and feature buffers in one place.
#[derive(Debug, Default)]
pub struct TelemetryBoard {
    directory: StationDirectory,
    tracker: RtsTracker,
    features: FeatureBuffers,
}

impl TelemetryBoard {
    pub fn new(directory: StationDirectory) -> Self {
        Self {
            directory,
            ..Self::default()
        }
    }

    pub fn set_directory(&mut self, directory: StationDirectory) {
        debug!("station directory replaced ({} entries)", directory.len());
        self.directory = directory;
    }

    pub fn latest_time(&self) -> i64 {
        self.tracker.latest()
    }

    /// Fails with `StaleTelemetry` when the snapshot is not newer than the last one.
    pub fn ingest(&mut self, response: &RtsResponse) -> Result<TelemetryUpdate, ScopeError> {
        self.tracker.accept(response)?;
        let features = self.features.rebuild(&self.directory, response);

        let max_intensity = features
            .iter()
            .map(|f| f.properties.intensity)
            .fold(MIN_INTENSITY, f64::max);
        let mut alerts: Vec<AlertStation> = features
            .iter()
            .filter(|f| f.properties.has_alert)
            .map(|f| AlertStation {
                station_id: f.properties.id.clone(),
                code: f.properties.code.clone(),
                intensity: f.properties.intensity,
                coordinates: f.geometry.coordinates,
            })
            .collect();
        alerts.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
        alerts.truncate(MAX_ALERT_CALLOUTS);

        Ok(TelemetryUpdate {
            time: response.time,
            geojson: self.features.to_geojson()?,
            boxes: box_intensities(response),
            max_intensity,
            alerts,
        })
    }
}
