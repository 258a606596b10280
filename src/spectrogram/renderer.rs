use image::{Rgb, RgbaImage};

use crate::surface::Surface;

/// Canvas color behind spectrograms and for stations with no data yet.
pub const BACKGROUND: [u8; 3] = [0x1f, 0x29, 0x37];

/// Time x frequency raster ready to be shown, plus what is needed to crop it.
#[derive(Clone, Debug)]
pub struct SpectrogramRaster {
    pub station_id: u32,
    pub sample_rate: f32,
    pub image: RgbaImage,
}

impl SpectrogramRaster {
    pub fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }
}

/// Selected region of the signal to show; `None` frequency range means `[0, nyquist]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    pub css_width: f32,
    pub css_height: f32,
    pub pixel_ratio: f32,
    pub time_range: (f32, f32),
    pub freq_range: Option<(f32, f32)>,
}

/// Crops the raster to `freq_range` and stretches it over the whole surface
/// with nearest-neighbor sampling.
pub fn blit_frequency_window(
    surface: &mut Surface,
    raster: &RgbaImage,
    nyquist: f32,
    freq_range: (f32, f32),
) {
    let (src_w, src_h) = raster.dimensions();
    if src_w == 0 || src_h == 0 || nyquist <= 0.0 {
        return;
    }
    let f_max = freq_range.1.min(nyquist);
    let f_min = freq_range.0.max(0.0);
    let tex_h = src_h as f32;
    let sy_top = (1.0 - f_max / nyquist) * tex_h;
    let sy_bottom = (1.0 - f_min / nyquist) * tex_h;
    let sy_h = sy_bottom - sy_top;
    if sy_h <= 0.0 {
        return;
    }

    let pixels = surface.pixels_mut();
    let (dst_w, dst_h) = pixels.dimensions();
    let x_step = src_w as f32 / dst_w as f32;
    let y_step = sy_h / dst_h as f32;
    for dy in 0..dst_h {
        let sy = (sy_top + (dy as f32 + 0.5) * y_step).floor() as u32;
        let sy = sy.min(src_h - 1);
        for dx in 0..dst_w {
            let sx = (((dx as f32 + 0.5) * x_step).floor() as u32).min(src_w - 1);
            let [r, g, b, _] = raster.get_pixel(sx, sy).0;
            pixels.put_pixel(dx, dy, Rgb([r, g, b]));
        }
    }
}

/// Shows a raster on the surface, recalibrating it first.
pub fn present(surface: &mut Surface, raster: &SpectrogramRaster, options: &RenderOptions) {
    surface.calibrate(options.css_width, options.css_height, options.pixel_ratio);
    surface.fill(BACKGROUND);
    let nyquist = raster.nyquist();
    let range = options.freq_range.unwrap_or((0.0, nyquist));
    blit_frequency_window(surface, &raster.image, nyquist, range);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn striped(height: u32) -> RgbaImage {
        // Row r carries value r so the crop is easy to read back.
        RgbaImage::from_fn(4, height, |_, y| Rgba([y as u8, 0, 0, 255]))
    }

    #[test]
    fn full_range_covers_surface() {
        let mut surface = Surface::new(8.0, 10.0, 1.0);
        blit_frequency_window(&mut surface, &striped(10), 25.0, (0.0, 25.0));
        assert_eq!(surface.pixels().get_pixel(0, 0)[0], 0);
        assert_eq!(surface.pixels().get_pixel(7, 9)[0], 9);
    }

    #[test]
    fn low_band_uses_bottom_rows() {
        let mut surface = Surface::new(4.0, 5.0, 1.0);
        blit_frequency_window(&mut surface, &striped(10), 25.0, (0.0, 12.5));
        let top = surface.pixels().get_pixel(0, 0)[0];
        let bottom = surface.pixels().get_pixel(0, 4)[0];
        assert_eq!(top, 5);
        assert_eq!(bottom, 9);
    }

    #[test]
    fn inverted_range_draws_nothing() {
        let mut surface = Surface::new(4.0, 4.0, 1.0);
        surface.fill(BACKGROUND);
        blit_frequency_window(&mut surface, &striped(10), 25.0, (20.0, 10.0));
        assert_eq!(surface.pixels().get_pixel(0, 0).0, BACKGROUND);
    }

    #[test]
    fn present_scales_to_pixel_ratio() {
        let raster = SpectrogramRaster {
            station_id: 1,
            sample_rate: 50.0,
            image: striped(65),
        };
        let mut surface = Surface::new(1.0, 1.0, 1.0);
        let options = RenderOptions {
            css_width: 100.0,
            css_height: 40.0,
            pixel_ratio: 2.0,
            time_range: (0.0, 60.0),
            freq_range: None,
        };
        present(&mut surface, &raster, &options);
        assert_eq!(surface.pixel_size(), (200, 80));
        assert_eq!(surface.pixels().get_pixel(0, 79)[0], 64);
    }
}
