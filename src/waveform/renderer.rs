use log::warn;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::surface::Surface;
use crate::waveform::view::{WaveformChannel, WaveformRenderData};

/// Height in CSS pixels reserved under the grid for time labels.
const LABEL_STRIP: f32 = 20.0;
const LABEL_BASELINE_OFFSET: f32 = 4.0;
const LABEL_FONT_PX: f32 = 10.0;
const TRACE_WIDTH: f32 = 1.5;
const HALO_WIDTH: f32 = 0.8;
const BASELINE_WIDTH: f32 = 0.8;
const GRID_WIDTH: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

struct ThemeColors {
    background: RGBColor,
    baseline: RGBAColor,
    grid: RGBAColor,
    label: RGBColor,
}

impl Theme {
    fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                background: RGBColor(0x11, 0x18, 0x27),
                baseline: RGBColor(107, 114, 128).mix(0.4),
                grid: RGBColor(75, 85, 99).mix(0.3),
                label: RGBColor(0x9c, 0xa3, 0xaf),
            },
            Theme::Light => ThemeColors {
                background: RGBColor(0xf9, 0xfa, 0xfb),
                baseline: RGBColor(156, 163, 175).mix(0.4),
                grid: RGBColor(209, 213, 219).mix(0.4),
                label: RGBColor(0x6b, 0x72, 0x80),
            },
        }
    }
}

/// Maps chart units (x = display slot, y = layout height, up is positive)
/// onto backing-store pixels.
#[derive(Clone, Copy, Debug)]
struct Projection {
    x_scale: f32,
    y_scale: f32,
    height: f32,
    pixel_ratio: f32,
}

impl Projection {
    fn new(surface: &Surface, data: &WaveformRenderData) -> Self {
        let (css_width, css_height) = surface.css_size();
        let pixel_ratio = surface.pixel_ratio();
        let slots = data.length.max(1) as f32;
        let height = if data.height > 0.0 { data.height } else { 1.0 };
        Self {
            x_scale: css_width / slots * pixel_ratio,
            y_scale: css_height / height * pixel_ratio,
            height,
            pixel_ratio,
        }
    }

    fn point(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x * self.x_scale).round() as i32,
            ((self.height - y) * self.y_scale).round() as i32,
        )
    }

    fn css(&self, value: f32) -> i32 {
        (value * self.pixel_ratio).round() as i32
    }

    fn stroke(&self, css_width: f32) -> u32 {
        ((css_width * self.pixel_ratio).round() as u32).max(1)
    }
}

/// Paints a chart frame onto a [`Surface`] with plotters.
#[derive(Clone, Debug)]
pub struct WaveformRenderer {
    theme: Theme,
    draw_labels: bool,
}

impl Default for WaveformRenderer {
    fn default() -> Self {
        Self::new(Theme::Dark)
    }
}

impl WaveformRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            draw_labels: true,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Time labels need a system font; headless callers may switch them off.
    pub fn with_labels(mut self, draw_labels: bool) -> Self {
        self.draw_labels = draw_labels;
        self
    }

    /// Background, baselines, grid, halo+trace per channel, then labels.
    pub fn render(&self, surface: &mut Surface, data: &WaveformRenderData) -> Result<(), ScopeError> {
        let colors = self.theme.colors();
        let projection = Projection::new(surface, data);
        let (width, height) = surface.pixel_size();
        let (_, css_height) = surface.css_size();
        let root = BitMapBackend::with_buffer(surface.pixels_mut(), (width, height))
            .into_drawing_area();
        root.fill(&colors.background)?;

        let baseline_style = colors
            .baseline
            .stroke_width(projection.stroke(BASELINE_WIDTH));
        for channel in &data.channels {
            let (x0, y) = projection.point(0.0, channel.baseline);
            let (x1, _) = projection.point(data.length as f32, channel.baseline);
            root.draw(&PathElement::new(vec![(x0, y), (x1, y)], baseline_style))?;
        }

        let grid_style = colors.grid.stroke_width(projection.stroke(GRID_WIDTH));
        let grid_bottom = projection.css(css_height - LABEL_STRIP);
        for label in &data.time_labels {
            let (x, _) = projection.point(label.x as f32, 0.0);
            root.draw(&PathElement::new(vec![(x, 0), (x, grid_bottom)], grid_style))?;
        }

        let halo_style = WHITE.mix(0.3).stroke_width(projection.stroke(HALO_WIDTH));
        for channel in data.draw_sequence() {
            let [r, g, b] = channel.color;
            let trace_style = RGBColor(r, g, b).stroke_width(projection.stroke(TRACE_WIDTH));
            for segment in segments(channel, &projection) {
                root.draw(&PathElement::new(segment.clone(), halo_style))?;
                root.draw(&PathElement::new(segment, trace_style))?;
            }
        }

        if self.draw_labels {
            let font = FontDesc::new(
                FontFamily::SansSerif,
                (LABEL_FONT_PX * projection.pixel_ratio) as f64,
                FontStyle::Normal,
            )
            .color(&colors.label)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
            let y = projection.css(css_height - LABEL_BASELINE_OFFSET);
            for label in &data.time_labels {
                let (x, _) = projection.point(label.x as f32, 0.0);
                if let Err(err) = root.draw(&Text::new(label.text.clone(), (x, y), font.clone())) {
                    warn!("skipping time labels: {err:?}");
                    break;
                }
            }
        }

        root.present()?;
        Ok(())
    }
}

/// Runs of consecutive present points; a NaN ends the current run.
fn segments(channel: &WaveformChannel, projection: &Projection) -> Vec<Vec<(i32, i32)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, &y) in channel.points.iter().enumerate() {
        if y.is_nan() {
            if current.len() > 1 {
                runs.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
            continue;
        }
        current.push(projection.point(i as f32, y));
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}
