//! Long-period ground motion: response-spectrum oscillator bank.
//!
//! A bank of 32 single-degree-of-freedom oscillators with natural periods
//! from 1.6 s to 7.8 s, stepped per sample by Nigam–Jennings transition
//! matrices (exact for linearly interpolated base excitation). The
//! per-period spectral velocity of absolute response (SVA) is the norm of
//! the horizontal relative oscillator velocity plus the integrated ground
//! velocity.

use std::f64::consts::PI;

use crate::iir::{IirFilterGroup, butterworth_highpass_2};
use crate::ops::{Vec3, VectorOps};

pub const OSCILLATOR_COUNT: usize = 32;
pub const DEFAULT_DAMPING: f64 = 0.05;
const BASE_PERIOD_S: f64 = 1.6;
const PERIOD_STEP_S: f64 = 0.2;
const BASELINE_CUTOFF_HZ: f64 = 0.05;

/// 2×2 matrix, row-major.
#[derive(Debug, Clone, Copy, Default)]
struct Mat2([[f64; 2]; 2]);

impl Mat2 {
    fn mul(self, rhs: Mat2) -> Mat2 {
        let a = self.0;
        let b = rhs.0;
        Mat2([
            [
                a[0][0] * b[0][0] + a[0][1] * b[1][0],
                a[0][0] * b[0][1] + a[0][1] * b[1][1],
            ],
            [
                a[1][0] * b[0][0] + a[1][1] * b[1][0],
                a[1][0] * b[0][1] + a[1][1] * b[1][1],
            ],
        ])
    }

    fn add(self, rhs: Mat2) -> Mat2 {
        let a = self.0;
        let b = rhs.0;
        Mat2([
            [a[0][0] + b[0][0], a[0][1] + b[0][1]],
            [a[1][0] + b[1][0], a[1][1] + b[1][1]],
        ])
    }
}

/// Precomputed step kernels of one oscillator: state transition `a` and
/// excitation input `b` (columns weight the previous and current
/// acceleration sample).
#[derive(Debug, Clone, Copy)]
struct Oscillator {
    a: Mat2,
    b: Mat2,
}

fn oscillator(period: f64, zeta: f64, dt: f64) -> Oscillator {
    let omega = 2.0 * PI / period;
    let d = (1.0 - zeta * zeta).sqrt();
    let omega_d = omega * d;
    let phi = omega_d * dt;
    let e = (-zeta * omega * dt).exp();
    let (s, c) = phi.sin_cos();
    let a1 = zeta / d * s;
    let a2 = s * e / d;
    let a = Mat2([
        [e * (a1 + c), a2 / omega],
        [-a2 * omega, e * (-a1 + c)],
    ]);

    let w2 = omega * omega;
    let t1 = (2.0 * zeta * zeta - 1.0) / (w2 * dt);
    let t2 = 2.0 * zeta / (w2 * omega * dt);
    let sd = s / omega_d;
    let cd = c - zeta / d * s;
    let vd = omega_d * s + zeta * omega * c;
    let b = Mat2([
        [
            e * ((t1 + zeta / omega) * sd + (t2 + 1.0 / w2) * c) - t2,
            -e * (t1 * sd + t2 * c) - 1.0 / w2 + t2,
        ],
        [
            e * ((t1 + zeta / omega) * cd - (t2 + 1.0 / w2) * vd) + 1.0 / (w2 * dt),
            -e * (t1 * cd - t2 * vd) - 1.0 / (w2 * dt),
        ],
    ]);
    Oscillator { a, b }
}

/// Realtime long-period ground motion calculator.
///
/// Feed three-component acceleration samples in time order; read back the
/// filtered acceleration, integrated ground velocity, the 32-entry SVA
/// array and its maximum. Only the horizontal components excite the bank;
/// the vertical passes through the baseline filter alone.
#[derive(Debug, Clone)]
pub struct LpgmCalculator {
    prefilter: IirFilterGroup<Vec3>,
    bank: [Oscillator; OSCILLATOR_COUNT],
    states: [Mat2; OSCILLATOR_COUNT],
    velocity: Vec3,
    filtered: Vec3,
    sva: [f64; OSCILLATOR_COUNT],
    max_sva: f64,
    dt: f64,
}

impl LpgmCalculator {
    /// Build a calculator with the standard 5% damping.
    pub fn new(sample_rate: f64) -> Self {
        Self::with_damping(sample_rate, DEFAULT_DAMPING)
    }

    pub fn with_damping(sample_rate: f64, damping: f64) -> Self {
        assert!(sample_rate > 0.0, "sample rate must be positive");
        assert!(
            damping > 0.0 && damping < 1.0,
            "damping must lie in (0, 1)"
        );
        let dt = 1.0 / sample_rate;
        Self {
            prefilter: IirFilterGroup::new(
                vec![butterworth_highpass_2(BASELINE_CUTOFF_HZ, sample_rate)],
                1.0,
            ),
            bank: std::array::from_fn(|k| oscillator(Self::period(k), damping, dt)),
            states: [Mat2::default(); OSCILLATOR_COUNT],
            velocity: Vec3::ZERO,
            filtered: Vec3::ZERO,
            sva: [0.0; OSCILLATOR_COUNT],
            max_sva: 0.0,
            dt,
        }
    }

    /// Natural period of oscillator `k` in seconds.
    pub fn period(k: usize) -> f64 {
        BASE_PERIOD_S + PERIOD_STEP_S * k as f64
    }

    /// Advance the bank by one acceleration sample.
    pub fn update(&mut self, accel: Vec3) {
        let prev = self.filtered;
        let filtered = self.prefilter.update(accel);
        self.velocity = Vec3::add(
            self.velocity,
            Vec3::scale(self.dt / 2.0, Vec3::add(prev, filtered)),
        );

        // Rows: previous and current sample; columns: NS, EW
        let excitation = Mat2([
            [f64::from(prev.x), f64::from(prev.y)],
            [f64::from(filtered.x), f64::from(filtered.y)],
        ]);
        let (vx, vy) = (f64::from(self.velocity.x), f64::from(self.velocity.y));

        self.max_sva = 0.0;
        for k in 0..OSCILLATOR_COUNT {
            let osc = &self.bank[k];
            let state = osc.a.mul(self.states[k]).add(osc.b.mul(excitation));
            self.states[k] = state;
            // Row 1 is the relative velocity row; absolute = relative + ground
            let sva = ((state.0[1][0] + vx).powi(2) + (state.0[1][1] + vy).powi(2)).sqrt();
            self.sva[k] = sva;
            if sva > self.max_sva {
                self.max_sva = sva;
            }
        }
        self.filtered = filtered;
    }

    /// Last baseline-filtered acceleration sample.
    pub fn filtered_acceleration(&self) -> Vec3 {
        self.filtered
    }

    /// Trapezoidally integrated ground velocity.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Spectral velocity per oscillator, index 0 = 1.6 s up to 7.8 s.
    pub fn sva(&self) -> &[f64; OSCILLATOR_COUNT] {
        &self.sva
    }

    pub fn max_sva(&self) -> f64 {
        self.max_sva
    }
}
