use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScopeError;
use crate::spectrogram::colormap::Rgb;

/// Per-station reading of one real-time intensity snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RtsStation {
    #[serde(default)]
    pub pga: f64,
    #[serde(default)]
    pub pgv: f64,
    /// Instrumental intensity.
    #[serde(default)]
    pub i: f64,
    /// Intensity used while the station is alerting.
    #[serde(rename = "I", default)]
    pub alert_intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<f64>,
}

impl RtsStation {
    pub fn has_alert(&self) -> bool {
        self.alert.is_some()
    }

    /// `I` while alerting, `i` otherwise.
    pub fn display_intensity(&self) -> f64 {
        match self.alert {
            Some(flag) if flag != 0.0 => self.alert_intensity,
            _ => self.i,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RtsResponse {
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub station: BTreeMap<String, RtsStation>,
    #[serde(rename = "int", default)]
    pub areas: Vec<Value>,
    #[serde(rename = "box", default)]
    pub boxes: BTreeMap<String, f64>,
}

impl RtsResponse {
    /// A missing or zero `time` is stamped with the current clock.
    pub fn from_json(raw: &str) -> Result<Self, ScopeError> {
        let mut response: Self =
            serde_json::from_str(raw).map_err(|e| ScopeError::Fetch(e.to_string()))?;
        if response.time == 0 {
            response.time = now_millis();
            debug!("snapshot without time, stamped {}", response.time);
        }
        Ok(response)
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationPosition {
    pub code: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub time: String,
}

/// Directory entry; `info` is a position history, newest last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    #[serde(default)]
    pub net: String,
    #[serde(default)]
    pub info: Vec<StationPosition>,
    #[serde(default)]
    pub work: bool,
}

impl StationInfo {
    pub fn latest_position(&self) -> Option<&StationPosition> {
        self.info.last()
    }
}

pub type StationDirectory = HashMap<String, StationInfo>;

pub fn parse_directory(raw: &str) -> Result<StationDirectory, ScopeError> {
    serde_json::from_str(raw).map_err(|e| ScopeError::Fetch(e.to_string()))
}

/// Accepts only snapshots strictly newer than the last accepted one.
#[derive(Clone, Debug, Default)]
pub struct RtsTracker {
    latest: i64,
}

impl RtsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> i64 {
        self.latest
    }

    pub fn accept(&mut self, response: &RtsResponse) -> Result<(), ScopeError> {
        if response.time <= self.latest {
            debug!(
                "dropping telemetry at {} (latest {})",
                response.time, self.latest
            );
            return Err(ScopeError::StaleTelemetry {
                received: response.time,
                latest: self.latest,
            });
        }
        self.latest = response.time;
        Ok(())
    }
}

const INTENSITY_STOPS: [(f64, Rgb); 11] = [
    (-3.0, [0x00, 0x05, 0xd0]),
    (-2.0, [0x00, 0x4b, 0xf8]),
    (-1.0, [0x00, 0x9e, 0xf8]),
    (0.0, [0x79, 0xe5, 0xfd]),
    (1.0, [0x49, 0xe9, 0xad]),
    (2.0, [0x44, 0xfa, 0x34]),
    (3.0, [0xbe, 0xff, 0x0c]),
    (4.0, [0xff, 0xf0, 0x00]),
    (5.0, [0xff, 0x93, 0x00]),
    (6.0, [0xfc, 0x52, 0x35]),
    (7.0, [0xb7, 0x20, 0xe9]),
];

/// Linear interpolation over the fixed stops from -3 to 7, clamped at both ends.
pub fn intensity_color(intensity: f64) -> Rgb {
    let (first_value, first_color) = INTENSITY_STOPS[0];
    let (last_value, last_color) = INTENSITY_STOPS[INTENSITY_STOPS.len() - 1];
    if intensity.is_nan() || intensity <= first_value {
        return first_color;
    }
    if intensity >= last_value {
        return last_color;
    }
    for pair in INTENSITY_STOPS.windows(2) {
        let (v1, c1) = pair[0];
        let (v2, c2) = pair[1];
        if intensity >= v1 && intensity <= v2 {
            let t = (intensity - v1) / (v2 - v1);
            let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
            return [lerp(c1[0], c2[0]), lerp(c1[1], c2[1]), lerp(c1[2], c2[2])];
        }
    }
    first_color
}

pub fn hex_color(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Float intensity to the 0..=9 display scale, where 5 and 6 are split
/// into lower and upper halves.
pub fn intensity_to_int(intensity: f64) -> u8 {
    if intensity < 0.0 || intensity.is_nan() {
        0
    } else if intensity < 4.5 {
        intensity.round() as u8
    } else if intensity < 5.0 {
        5
    } else if intensity < 5.5 {
        6
    } else if intensity < 6.0 {
        7
    } else if intensity < 6.5 {
        8
    } else {
        9
    }
}
