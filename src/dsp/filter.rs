use crate::error::ScopeError;

/// One numerator or denominator row of a second-order section: `[c0, c1, c2]`.
pub type SosRow = [f64; 3];

#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn from_rows(num: SosRow, den: SosRow, stage: usize) -> Result<Self, ScopeError> {
        let [b0, b1, b2] = num;
        let [a0, a1, a2] = den;
        if a0 == 0.0 || !a0.is_finite() {
            return Err(ScopeError::MalformedSection { stage });
        }
        if a0 == 1.0 {
            return Ok(Self { b0, b1, b2, a1, a2 });
        }
        let a0_inv = 1.0 / a0;
        Ok(Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}

/// Ordered cascade of biquads with history that persists between calls.
///
/// Coefficients are fixed once built; only the `z1`/`z2` history of each
/// section changes while streaming.
#[derive(Clone, Debug)]
pub struct SosCascade {
    sections: Vec<BiquadFilter>,
}

impl SosCascade {
    /// Build from parallel numerator/denominator tables, one row per stage.
    ///
    /// Rows whose `a0` is not 1 are normalized by it.
    pub fn from_tables(num: &[SosRow], den: &[SosRow]) -> Result<Self, ScopeError> {
        if num.len() != den.len() {
            return Err(ScopeError::FilterStageMismatch {
                numerators: num.len(),
                denominators: den.len(),
            });
        }
        let sections = num
            .iter()
            .zip(den)
            .enumerate()
            .map(|(stage, (n, d))| {
                BiquadCoeffs::from_rows(*n, *d, stage).map(|coeffs| BiquadFilter {
                    coeffs,
                    state: BiquadState::default(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sections })
    }

    /// Like [`SosCascade::from_tables`] but accepts ragged rows, e.g. parsed from JSON.
    pub fn from_rows(num: &[Vec<f64>], den: &[Vec<f64>]) -> Result<Self, ScopeError> {
        if num.len() != den.len() {
            return Err(ScopeError::FilterStageMismatch {
                numerators: num.len(),
                denominators: den.len(),
            });
        }
        let to_row = |row: &Vec<f64>, stage: usize| -> Result<SosRow, ScopeError> {
            match row.as_slice() {
                [c0, c1, c2] => Ok([*c0, *c1, *c2]),
                _ => Err(ScopeError::MalformedSection { stage }),
            }
        };
        let mut num_rows = Vec::with_capacity(num.len());
        let mut den_rows = Vec::with_capacity(den.len());
        for (stage, (n, d)) in num.iter().zip(den).enumerate() {
            num_rows.push(to_row(n, stage)?);
            den_rows.push(to_row(d, stage)?);
        }
        Self::from_tables(&num_rows, &den_rows)
    }

    pub fn stage_count(&self) -> usize {
        self.sections.len()
    }

    pub fn apply(&mut self, mut value: f64) -> f64 {
        for section in &mut self.sections {
            value = section.process(value);
        }
        value
    }

    /// Filters a block in order. Missing (NaN) samples pass through untouched
    /// and leave the history as it was.
    pub fn apply_buffer(&mut self, samples: &[f64]) -> Vec<f64> {
        samples
            .iter()
            .map(|&x| if x.is_nan() { x } else { self.apply(x) })
            .collect()
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.state = BiquadState::default();
        }
    }

    pub fn is_at_rest(&self) -> bool {
        self.sections
            .iter()
            .all(|s| s.state == BiquadState::default())
    }
}

const NUM_LPF: [SosRow; 11] = [
    [0.8063260828207, 0.0, 0.0],
    [1.0, -0.3349099821478, 1.0],
    [0.8764452158503, 0.0, 0.0],
    [1.0, -0.08269016387548, 1.0],
    [0.8131516681065, 0.0, 0.0],
    [1.0, 0.5521204464881, 1.0],
    [1.228277124762, 0.0, 0.0],
    [1.0, 1.705652561121, 1.0],
    [0.00431639855615, 0.0, 0.0],
    [1.0, -0.4218227257396, 1.0],
    [1.0, 0.0, 0.0],
];

const DEN_LPF: [SosRow; 11] = [
    [1.0, 0.0, 0.0],
    [1.0, -0.6719798550872, 0.938845023254],
    [1.0, 0.0, 0.0],
    [1.0, -0.8264759910073, 0.8561761588872],
    [1.0, 0.0, 0.0],
    [1.0, -1.10962299915, 0.7141202529829],
    [1.0, 0.0, 0.0],
    [1.0, -1.413006561919, 0.5638384962434],
    [1.0, 0.0, 0.0],
    [1.0, -0.6139497794955, 0.9834048810788],
    [1.0, 0.0, 0.0],
];

const NUM_HPF: [SosRow; 11] = [
    [0.9769037485204, 0.0, 0.0],
    [1.0, -2.0, 1.0],
    [0.9424328308459, 0.0, 0.0],
    [1.0, -2.0, 1.0],
    [0.9149691441131, 0.0, 0.0],
    [1.0, -2.0, 1.0],
    [0.8959987277275, 0.0, 0.0],
    [1.0, -2.0, 1.0],
    [0.8863374802187, 0.0, 0.0],
    [1.0, -2.0, 1.0],
    [1.0, 0.0, 0.0],
];

const DEN_HPF: [SosRow; 11] = [
    [1.0, 0.0, 0.0],
    [1.0, -1.946073828052, 0.9615411660298],
    [1.0, 0.0, 0.0],
    [1.0, -1.877404882092, 0.8923264412918],
    [1.0, 0.0, 0.0],
    [1.0, -1.822694925196, 0.837181651256],
    [1.0, 0.0, 0.0],
    [1.0, -1.78490427193, 0.7990906389804],
    [1.0, 0.0, 0.0],
    [1.0, -1.765658260281, 0.7796916605933],
    [1.0, 0.0, 0.0],
];

/// High-pass cascade followed by low-pass cascade, owned per station.
#[derive(Clone, Debug)]
pub struct BandPass {
    hpf: SosCascade,
    lpf: SosCascade,
}

impl BandPass {
    /// The fixed seismic band used for display.
    pub fn seismic() -> Result<Self, ScopeError> {
        Ok(Self {
            hpf: SosCascade::from_tables(&NUM_HPF, &DEN_HPF)?,
            lpf: SosCascade::from_tables(&NUM_LPF, &DEN_LPF)?,
        })
    }

    pub fn new(hpf: SosCascade, lpf: SosCascade) -> Self {
        Self { hpf, lpf }
    }

    pub fn apply(&mut self, sample: f64) -> f64 {
        if sample.is_nan() {
            return sample;
        }
        let high_passed = self.hpf.apply(sample);
        self.lpf.apply(high_passed)
    }

    pub fn apply_buffer(&mut self, samples: &[f64]) -> Vec<f64> {
        samples.iter().map(|&x| self.apply(x)).collect()
    }

    pub fn reset(&mut self) {
        self.hpf.reset();
        self.lpf.reset();
    }

    pub fn is_at_rest(&self) -> bool {
        self.hpf.is_at_rest() && self.lpf.is_at_rest()
    }
}
