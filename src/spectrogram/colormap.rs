use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];

const LUT_SIZE: usize = 256;

const VIRIDIS: [Rgb; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

const INFERNO: [Rgb; 5] = [
    [0, 0, 4],
    [87, 16, 110],
    [187, 55, 84],
    [249, 142, 9],
    [252, 255, 164],
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Viridis,
    Inferno,
    Grayscale,
    #[default]
    Jet,
    Hot,
    Cool,
    Spring,
    Summer,
    Autumn,
    Winter,
    Bone,
}

impl Palette {
    pub const ALL: [Palette; 11] = [
        Palette::Viridis,
        Palette::Inferno,
        Palette::Grayscale,
        Palette::Jet,
        Palette::Hot,
        Palette::Cool,
        Palette::Spring,
        Palette::Summer,
        Palette::Autumn,
        Palette::Winter,
        Palette::Bone,
    ];

    /// Closed-form color at `t` in `[0, 1]`; used to fill the lookup table.
    pub fn evaluate(self, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        match self {
            Palette::Viridis => interpolate(t, &VIRIDIS),
            Palette::Inferno => interpolate(t, &INFERNO),
            Palette::Grayscale => {
                let v = channel(t);
                [v, v, v]
            }
            Palette::Jet => {
                let r = (4.0 * t - 1.5).min(-4.0 * t + 4.5);
                let g = (4.0 * t - 0.5).min(-4.0 * t + 3.5);
                let b = (4.0 * t + 0.5).min(-4.0 * t + 2.5);
                [channel(r), channel(g), channel(b)]
            }
            Palette::Hot => {
                let (r, g, b) = if t < 0.33 {
                    (t / 0.33, 0.0, 0.0)
                } else if t < 0.66 {
                    (1.0, (t - 0.33) / 0.33, 0.0)
                } else {
                    (1.0, 1.0, (t - 0.66) / 0.34)
                };
                [channel(r), channel(g), channel(b)]
            }
            Palette::Cool => [channel(t), channel(1.0 - t), 255],
            Palette::Spring => [255, channel(t), channel(1.0 - t)],
            Palette::Summer => [channel(t), channel(0.5 + 0.5 * t), channel(0.4)],
            Palette::Autumn => [255, channel(t), 0],
            Palette::Winter => [0, channel(t), channel(1.0 - 0.5 * t)],
            Palette::Bone => {
                let wobble = 0.1 * (t * PI * 2.0).sin();
                let g = if t < 0.5 { t + wobble } else { t };
                let b = if t < 0.75 { t + wobble } else { t };
                [channel(t), channel(g), channel(b)]
            }
        }
    }
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).floor() as u8
}

fn interpolate(t: f32, stops: &[Rgb]) -> Rgb {
    if t <= 0.0 {
        return stops[0];
    }
    if t >= 1.0 {
        return stops[stops.len() - 1];
    }
    let step = 1.0 / (stops.len() - 1) as f32;
    let idx = ((t / step) as usize).min(stops.len() - 2);
    let local = (t - idx as f32 * step) / step;
    let (c1, c2) = (stops[idx], stops[idx + 1]);
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * local).clamp(0.0, 255.0) as u8;
    [lerp(c1[0], c2[0]), lerp(c1[1], c2[1]), lerp(c1[2], c2[2])]
}

/// 256-entry lookup table for one palette.
#[derive(Clone, Debug)]
pub struct ColorMap {
    palette: Palette,
    lut: Vec<Rgb>,
}

impl ColorMap {
    pub fn new(palette: Palette) -> Self {
        let mut map = Self {
            palette,
            lut: Vec::with_capacity(LUT_SIZE),
        };
        map.generate_lut();
        map
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Switches palette; the table is rebuilt only when the palette actually changes.
    pub fn set_map(&mut self, palette: Palette) {
        if palette != self.palette || self.lut.len() != LUT_SIZE {
            self.palette = palette;
            self.generate_lut();
        }
    }

    pub fn get_rgb(&self, t: f32) -> Rgb {
        let idx = if t.is_nan() || t <= 0.0 {
            0
        } else if t >= 1.0 {
            LUT_SIZE - 1
        } else {
            (t * (LUT_SIZE - 1) as f32) as usize
        };
        self.lut[idx]
    }

    fn generate_lut(&mut self) {
        self.lut.clear();
        let last = (LUT_SIZE - 1) as f32;
        self.lut
            .extend((0..LUT_SIZE).map(|i| self.palette.evaluate(i as f32 / last)));
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_control_colors() {
        let viridis = ColorMap::new(Palette::Viridis);
        assert_eq!(viridis.get_rgb(0.0), VIRIDIS[0]);
        assert_eq!(viridis.get_rgb(1.0), VIRIDIS[4]);
        let inferno = ColorMap::new(Palette::Inferno);
        assert_eq!(inferno.get_rgb(0.0), INFERNO[0]);
        assert_eq!(inferno.get_rgb(1.0), INFERNO[4]);
    }

    #[test]
    fn grayscale_is_monotonic() {
        let gray = ColorMap::new(Palette::Grayscale);
        let mut prev = gray.get_rgb(0.0);
        for i in 1..=100 {
            let cur = gray.get_rgb(i as f32 / 100.0);
            assert!(cur[0] >= prev[0]);
            prev = cur;
        }
        assert_eq!(gray.get_rgb(1.0), [255, 255, 255]);
    }

    #[test]
    fn jet_runs_blue_to_red() {
        let jet = ColorMap::new(Palette::Jet);
        let low = jet.get_rgb(0.0);
        let high = jet.get_rgb(1.0);
        assert_eq!(low[0], 0);
        assert!(low[2] > 100);
        assert!(high[0] > 100);
        assert_eq!(high[2], 0);
        assert_eq!(jet.get_rgb(0.5)[1], 255);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let map = ColorMap::new(Palette::Hot);
        assert_eq!(map.get_rgb(-3.0), map.get_rgb(0.0));
        assert_eq!(map.get_rgb(7.0), map.get_rgb(1.0));
        assert_eq!(map.get_rgb(f32::NAN), map.get_rgb(0.0));
    }

    #[test]
    fn set_map_regenerates_table() {
        let mut map = ColorMap::new(Palette::Jet);
        map.set_map(Palette::Viridis);
        assert_eq!(map.palette(), Palette::Viridis);
        assert_eq!(map.get_rgb(0.0), VIRIDIS[0]);
    }

    #[test]
    fn every_palette_fills_the_table() {
        for palette in Palette::ALL {
            let map = ColorMap::new(palette);
            assert_eq!(map.lut.len(), LUT_SIZE);
        }
    }
}
