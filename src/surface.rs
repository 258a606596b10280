use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::error::ScopeError;

/// Opaque pixel target sized in CSS units and scaled by the device pixel ratio.
pub struct Surface {
    css_width: f32,
    css_height: f32,
    pixel_ratio: f32,
    pixels: RgbImage,
    reallocations: usize,
}

impl Surface {
    pub fn new(css_width: f32, css_height: f32, pixel_ratio: f32) -> Self {
        let mut surface = Self {
            css_width: 0.0,
            css_height: 0.0,
            pixel_ratio: 0.0,
            pixels: RgbImage::new(1, 1),
            reallocations: 0,
        };
        surface.calibrate(css_width, css_height, pixel_ratio);
        surface
    }

    /// Resizes the backing store only when the CSS size or pixel ratio changed.
    /// Returns whether a reallocation happened.
    pub fn calibrate(&mut self, css_width: f32, css_height: f32, pixel_ratio: f32) -> bool {
        let pixel_ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        if self.reallocations > 0
            && self.css_width == css_width
            && self.css_height == css_height
            && self.pixel_ratio == pixel_ratio
        {
            return false;
        }
        self.css_width = css_width;
        self.css_height = css_height;
        self.pixel_ratio = pixel_ratio;
        let width = ((css_width * pixel_ratio).round() as u32).max(1);
        let height = ((css_height * pixel_ratio).round() as u32).max(1);
        self.pixels = RgbImage::new(width, height);
        self.reallocations += 1;
        true
    }

    pub fn css_size(&self) -> (f32, f32) {
        (self.css_width, self.css_height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    pub fn fill(&mut self, color: [u8; 3]) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgb(color);
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ScopeError> {
        let mut output = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_store_scales_with_pixel_ratio() {
        let surface = Surface::new(200.0, 50.0, 2.0);
        assert_eq!(surface.pixel_size(), (400, 100));
    }

    #[test]
    fn recalibrating_with_same_size_is_free() {
        let mut surface = Surface::new(200.0, 50.0, 1.0);
        assert!(!surface.calibrate(200.0, 50.0, 1.0));
        assert_eq!(surface.reallocations(), 1);
        assert!(surface.calibrate(200.0, 50.0, 1.5));
        assert!(surface.calibrate(100.0, 50.0, 1.5));
        assert_eq!(surface.reallocations(), 3);
        assert_eq!(surface.pixel_size(), (150, 75));
    }

    #[test]
    fn encodes_png() {
        let mut surface = Surface::new(8.0, 8.0, 1.0);
        surface.fill([31, 41, 55]);
        let png = surface.encode_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
