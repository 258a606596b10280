use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl WindowKind {
    /// Symmetric analysis window of `len` points.
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        if len == 0 {
            return Vec::new();
        }
        if len == 1 || self == WindowKind::Rectangular {
            return vec![1.0; len];
        }
        let denom = (len - 1) as f32;
        (0..len)
            .map(|i| {
                let angle = 2.0 * PI * i as f32 / denom;
                match self {
                    WindowKind::Hann => 0.5 * (1.0 - angle.cos()),
                    WindowKind::Hamming => 0.54 - 0.46 * angle.cos(),
                    WindowKind::Blackman => 0.42 - 0.5 * angle.cos() + 0.08 * (2.0 * angle).cos(),
                    WindowKind::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_zero_at_edges_and_one_in_the_middle() {
        let w = WindowKind::Hann.coefficients(65);
        assert!(w[0].abs() < 1e-6);
        assert!(w[64].abs() < 1e-6);
        assert!((w[32] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hamming_and_blackman_edges() {
        let hamming = WindowKind::Hamming.coefficients(16);
        assert!((hamming[0] - 0.08).abs() < 1e-6);
        let blackman = WindowKind::Blackman.coefficients(16);
        assert!(blackman[0].abs() < 1e-6);
        assert!(blackman.iter().all(|&v| v <= 1.0 + 1e-6));
    }

    #[test]
    fn rectangular_is_flat() {
        assert_eq!(WindowKind::Rectangular.coefficients(4), vec![1.0; 4]);
        assert!(WindowKind::Hann.coefficients(0).is_empty());
    }
}
