//! Nearest-neighbor stretching of station buffers to the common display rate.

/// Output length of [`upsample_alternating`] for `len` input samples.
pub fn alternating_len(len: usize) -> usize {
    3 * len.div_ceil(2) + 2 * (len / 2)
}

/// Repeats even-indexed samples three times and odd-indexed ones twice,
/// stretching a 20 Hz channel to 50 Hz. Gaps stay gaps.
pub fn upsample_alternating(samples: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(alternating_len(samples.len()));
    for (i, &value) in samples.iter().enumerate() {
        let copies = if i % 2 == 0 { 3 } else { 2 };
        out.extend(std::iter::repeat(value).take(copies));
    }
    out
}

/// Brings `samples` recorded at `source_rate` to `display_rate` by repeating
/// or skipping samples; never interpolates.
pub fn stretch(samples: &[f64], source_rate: u32, display_rate: u32) -> Vec<f64> {
    if source_rate == 0 || display_rate == 0 || source_rate == display_rate {
        return samples.to_vec();
    }
    if source_rate as u64 * 5 == display_rate as u64 * 2 {
        return upsample_alternating(samples);
    }
    let out_len = (samples.len() as u64 * display_rate as u64 / source_rate as u64) as usize;
    (0..out_len)
        .map(|j| {
            let src = (j as u64 * source_rate as u64 / display_rate as u64) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

/// Left-pads with gaps or drops from the front so exactly `len` values remain.
pub fn fit_to_length(mut values: Vec<f32>, len: usize) -> Vec<f32> {
    if values.len() > len {
        values.drain(..values.len() - len);
        values
    } else {
        let mut padded = vec![f32::NAN; len - values.len()];
        padded.extend(values);
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_samples_repeat_three_times() {
        let out = upsample_alternating(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn output_length_is_deterministic() {
        for len in 0..50 {
            let input = vec![0.5; len];
            assert_eq!(upsample_alternating(&input).len(), alternating_len(len));
        }
        assert_eq!(alternating_len(20 * 60), 3000);
    }

    #[test]
    fn gaps_survive_stretching() {
        let out = stretch(&[f64::NAN, 1.0], 20, 50);
        assert_eq!(out.len(), 5);
        assert!(out[..3].iter().all(|v| v.is_nan()));
        assert_eq!(&out[3..], &[1.0, 1.0]);
    }

    #[test]
    fn matching_rate_is_a_copy_and_other_rates_resample() {
        assert_eq!(stretch(&[1.0, 2.0], 50, 50), vec![1.0, 2.0]);
        let down = stretch(&[0.0, 1.0, 2.0, 3.0], 100, 50);
        assert_eq!(down, vec![0.0, 2.0]);
        let up = stretch(&[7.0, 8.0], 25, 50);
        assert_eq!(up, vec![7.0, 7.0, 8.0, 8.0]);
    }

    #[test]
    fn huge_rates_do_not_overflow() {
        assert!(stretch(&[1.0, 2.0], 900_000_000, 50).is_empty());
        assert!(stretch(&[1.0, 2.0], u32::MAX, 50).is_empty());
    }

    #[test]
    fn fit_pads_front_and_trims_front() {
        let padded = fit_to_length(vec![1.0, 2.0], 4);
        assert!(padded[0].is_nan() && padded[1].is_nan());
        assert_eq!(&padded[2..], &[1.0, 2.0]);
        assert_eq!(fit_to_length(vec![1.0, 2.0, 3.0], 2), vec![2.0, 3.0]);
    }
}
