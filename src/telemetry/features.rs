use serde::Serialize;
use serde_json::Value;

use crate::error::ScopeError;
use crate::spectrogram::colormap::Rgb;
use crate::telemetry::rts::{hex_color, intensity_color, RtsResponse, StationDirectory};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationProperties {
    pub id: String,
    pub code: String,
    pub intensity: f64,
    pub color: String,
    pub sort_key: f64,
    pub has_alert: bool,
    pub pga: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: StationProperties,
}

impl StationFeature {
    pub fn new(lon: f64, lat: f64, properties: StationProperties) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [lon, lat],
            },
            properties,
        }
    }
}

#[derive(Serialize)]
struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: &'a [StationFeature],
}

/// Intensity of one alert region, keyed by region id.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxIntensity {
    pub id: String,
    pub intensity: f64,
    pub sort_key: f64,
    pub color: String,
}

/// Outline color of an alert region: green below 2, yellow below 4, red above.
pub fn box_color(intensity: f64) -> Rgb {
    if intensity < 2.0 {
        [0x00, 0xdb, 0x00]
    } else if intensity < 4.0 {
        [0xea, 0xc1, 0x00]
    } else {
        [0xff, 0x00, 0x00]
    }
}

pub fn box_intensities(response: &RtsResponse) -> Vec<BoxIntensity> {
    response
        .boxes
        .iter()
        .map(|(id, &intensity)| BoxIntensity {
            id: id.clone(),
            intensity,
            sort_key: intensity,
            color: hex_color(box_color(intensity)),
        })
        .collect()
}

/// Two feature vectors: the front one is published, the back one is rebuilt
/// from the next snapshot and then swapped in.
#[derive(Debug, Default)]
pub struct FeatureBuffers {
    front: Vec<StationFeature>,
    back: Vec<StationFeature>,
    generation: u64,
}

impl FeatureBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &[StationFeature] {
        &self.front
    }

    /// Number of swaps so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stations missing from the directory, not working, or without a known
    /// position are left out.
    pub fn rebuild(&mut self, directory: &StationDirectory, response: &RtsResponse) -> &[StationFeature] {
        self.back.clear();
        for (station_id, reading) in &response.station {
            let Some(info) = directory.get(station_id) else {
                continue;
            };
            if !info.work {
                continue;
            }
            let Some(position) = info.latest_position() else {
                continue;
            };
            let intensity = reading.display_intensity();
            self.back.push(StationFeature::new(
                position.lon,
                position.lat,
                StationProperties {
                    id: station_id.clone(),
                    code: position.code.to_string(),
                    intensity,
                    color: hex_color(intensity_color(intensity)),
                    sort_key: intensity,
                    has_alert: reading.has_alert(),
                    pga: reading.pga,
                },
            ));
        }
        std::mem::swap(&mut self.front, &mut self.back);
        self.generation += 1;
        &self.front
    }

    pub fn to_geojson(&self) -> Result<Value, ScopeError> {
        Ok(serde_json::to_value(FeatureCollection {
            kind: "FeatureCollection",
            features: &self.front,
        })?)
    }
}
