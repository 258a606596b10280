use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

use crate::error::ScopeError;

const POWER_FLOOR: f32 = 1e-20;

/// Fixed-size forward FFT that turns a real frame into a normalized dB spectrum.
pub struct FftExecutor {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
    spectrum: Vec<f32>,
}

impl FftExecutor {
    pub fn with_size(fft_size: usize) -> Result<Self, ScopeError> {
        if !fft_size.is_power_of_two() {
            return Err(ScopeError::FftSizeNotPowerOfTwo(fft_size));
        }
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Ok(Self {
            fft_size,
            fft,
            buffer: vec![Complex32::new(0.0, 0.0); fft_size],
            scratch,
            spectrum: vec![0.0; fft_size / 2 + 1],
        })
    }

    pub fn size(&self) -> usize {
        self.fft_size
    }

    pub fn bins(&self) -> usize {
        self.spectrum.len()
    }

    /// Magnitudes for bins `0..=size/2`, mapped from `[min_db, max_db]` onto `[0, 1]`.
    ///
    /// `frame` is truncated or zero-padded to the transform size.
    pub fn compute(&mut self, frame: &[f32], min_db: f32, max_db: f32) -> &[f32] {
        for (slot, value) in self
            .buffer
            .iter_mut()
            .zip(frame.iter().copied().chain(std::iter::repeat(0.0)))
        {
            *slot = Complex32::new(value, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let inv_range = 1.0 / (max_db - min_db);
        for (out, c) in self.spectrum.iter_mut().zip(&self.buffer) {
            let power = c.re * c.re + c.im * c.im + POWER_FLOOR;
            let normalized = (10.0 * power.log10() - min_db) * inv_range;
            *out = normalized.clamp(0.0, 1.0);
        }
        &self.spectrum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn argmax(values: &[f32]) -> usize {
        values
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(
            FftExecutor::with_size(100),
            Err(ScopeError::FftSizeNotPowerOfTwo(100))
        ));
    }

    #[test]
    fn sinusoid_peaks_at_its_bin() {
        let n = 128;
        let mut fft = FftExecutor::with_size(n).unwrap();
        for k in [3usize, 10, 40] {
            let frame: Vec<f32> = (0..n)
                .map(|i| (2.0 * PI * k as f32 * i as f32 / n as f32).sin())
                .collect();
            let spectrum = fft.compute(&frame, -120.0, 60.0).to_vec();
            assert_eq!(spectrum.len(), n / 2 + 1);
            assert_eq!(argmax(&spectrum), k);
            assert!(spectrum.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn off_bin_sinusoid_lands_within_one_bin() {
        let n = 256;
        let mut fft = FftExecutor::with_size(n).unwrap();
        let frame: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 20.4 * i as f32 / n as f32).cos())
            .collect();
        let peak = argmax(fft.compute(&frame, -120.0, 60.0));
        assert!((19..=21).contains(&peak));
    }

    #[test]
    fn silence_maps_to_floor() {
        let mut fft = FftExecutor::with_size(64).unwrap();
        let spectrum = fft.compute(&[0.0; 10], -60.0, 0.0);
        assert!(spectrum.iter().all(|&v| v == 0.0));
    }
}
