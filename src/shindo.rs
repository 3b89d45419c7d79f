//! Realtime JMA seismic-intensity weighting filter.
//!
//! A six-section biquad cascade approximating the JMA period-dependent
//! weighting of acceleration. The intensity scalar itself is computed from
//! the filtered magnitude envelope by [`jma_intensity`], outside the filter.

use std::f64::consts::PI;

use crate::iir::IirFilterGroup;
use crate::ops::VectorOps;

/// Gal (cm/s²) per m/s².
pub const GAL_PER_MPS2: f64 = 100.0;

/// Seismological parameters of the intensity weighting cascade.
///
/// The defaults reproduce the JMA weighting curve; override only for
/// experiments with the filter shape.
#[derive(Debug, Clone, Copy)]
pub struct ShindoParams {
    pub f0: f64,
    pub f1: f64,
    pub f2: f64,
    pub f3: f64,
    pub f4: f64,
    pub f5: f64,
    pub h2a: f64,
    pub h2b: f64,
    pub h3: f64,
    pub h4: f64,
    pub h5: f64,
    pub gain: f64,
}

impl Default for ShindoParams {
    fn default() -> Self {
        Self {
            f0: 0.45,
            f1: 7.0,
            f2: 0.5,
            f3: 12.0,
            f4: 20.0,
            f5: 30.0,
            h2a: 1.0,
            h2b: 0.75,
            h3: 0.6,
            h4: 0.6,
            h5: 0.6,
            gain: 1.262,
        }
    }
}

/// Six-section realtime approximation of the JMA intensity weighting curve.
#[derive(Debug, Clone)]
pub struct ShindoFilter<T: VectorOps> {
    group: IirFilterGroup<T>,
}

impl<T: VectorOps> ShindoFilter<T> {
    /// Build the filter for a sampling period `delta_t` (seconds) with the
    /// default seismological parameters.
    pub fn new(delta_t: f64) -> Self {
        Self::with_params(delta_t, ShindoParams::default())
    }

    pub fn with_params(delta_t: f64, params: ShindoParams) -> Self {
        assert!(delta_t > 0.0, "sampling period must be positive");
        let dt = delta_t;
        let dt2 = dt * dt;
        let omega = |f: f64| 2.0 * PI * f;
        let (w0, w1, w2) = (omega(params.f0), omega(params.f1), omega(params.f2));

        let mut sections = Vec::with_capacity(6);
        // Section 1: differentiating stage between f0 and f1
        sections.push([
            8.0 / dt2 + (4.0 * w0 + 2.0 * w1) / dt + w0 * w1,
            2.0 * w0 * w1 - 16.0 / dt2,
            8.0 / dt2 - (4.0 * w0 + 2.0 * w1) / dt + w0 * w1,
            4.0 / dt2 + 2.0 * w1 / dt,
            -8.0 / dt2,
            4.0 / dt2 - 2.0 * w1 / dt,
        ]);
        // Section 2: corner shaping around f1
        sections.push([
            16.0 / dt2 + 17.0 * w1 / dt + w1 * w1,
            2.0 * w1 * w1 - 32.0 / dt2,
            16.0 / dt2 - 17.0 * w1 / dt + w1 * w1,
            4.0 / dt2 + 8.5 * w1 / dt + w1 * w1,
            2.0 * w1 * w1 - 8.0 / dt2,
            4.0 / dt2 - 8.5 * w1 / dt + w1 * w1,
        ]);
        // Section 3: damping swap at f2, h2a over h2b
        sections.push([
            12.0 / dt2 + 12.0 * params.h2b * w2 / dt + w2 * w2,
            10.0 * w2 * w2 - 24.0 / dt2,
            12.0 / dt2 - 12.0 * params.h2b * w2 / dt + w2 * w2,
            12.0 / dt2 + 12.0 * params.h2a * w2 / dt + w2 * w2,
            10.0 * w2 * w2 - 24.0 / dt2,
            12.0 / dt2 - 12.0 * params.h2a * w2 / dt + w2 * w2,
        ]);
        // Sections 4-6: high-cut oscillator stages at f3, f4, f5
        for (f, h) in [
            (params.f3, params.h3),
            (params.f4, params.h4),
            (params.f5, params.h5),
        ] {
            let w = omega(f);
            sections.push([
                12.0 / dt2 + 12.0 * h * w / dt + w * w,
                10.0 * w * w - 24.0 / dt2,
                12.0 / dt2 - 12.0 * h * w / dt + w * w,
                w * w,
                10.0 * w * w,
                w * w,
            ]);
        }

        Self {
            group: IirFilterGroup::new(sections, params.gain),
        }
    }

    /// Feed one acceleration sample, returning the weighted sample.
    pub fn update(&mut self, x: T) -> T {
        self.group.update(x)
    }

    pub fn reset(&mut self) {
        self.group.reset()
    }
}

/// JMA instrumental intensity from a peak weighted acceleration in gal:
/// `I = 2·log10(v) + 0.94`.
///
/// Returns −∞ for non-positive input; callers gate on a positive envelope.
pub fn jma_intensity(peak_gal: f64) -> f64 {
    2.0 * peak_gal.log10() + 0.94
}
