//! Activation functions and range mappers for GRN neurons.
//!
//! Hidden neurons use ordinary nonlinearities. Sensors and outputs that mirror
//! a gene use range mappers instead: a sensor normalises the gene's declared
//! range into the network's `[-1, 1]` convention, and an output maps
//! `[-1, 1]` back onto the gene's bounds. Both wrap out-of-range values
//! cyclically before remapping, see [`cyclical_linear_remap`].

use serde::{Deserialize, Serialize};

/// Activation kinds supported by GRN neurons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    /// f(x) = x
    #[default]
    Linear,
    /// f(x) = 1 / (1 + e^(-x))
    Sigmoid,
    /// f(x) = tanh(x)
    Tanh,
    /// f(x) = max(0, x)
    ReLU,
    /// f(x) = sin(x)
    Sine,
    /// f(x) = e^(-x^2)
    Gaussian,
    /// f(x) = 1 if x > 0 else 0
    Step,
    /// Maps a gene's `[min, max]` onto `[-1, 1]`. Used by gene input sensors.
    Normalize { min: f32, max: f32 },
    /// Maps `[-1, 1]` onto a gene's `[min, max]`. Used by float and integer outputs.
    Remap { min: f32, max: f32 },
    /// f(x) = 1 if x > 0 else -1. Used by boolean outputs.
    Sign,
}

impl Activation {
    /// Activation kinds a hidden neuron may be assigned.
    pub const HIDDEN: [Self; 7] = [
        Self::Linear,
        Self::Sigmoid,
        Self::Tanh,
        Self::ReLU,
        Self::Sine,
        Self::Gaussian,
        Self::Step,
    ];

    /// Apply this activation to a summed input.
    ///
    /// NaN propagates unchanged. Infinite inputs produce finite outputs where
    /// the function has a sensible limit.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }

        match self {
            Self::Linear => x,
            Self::Sigmoid => {
                if x == f32::INFINITY {
                    return 1.0;
                }
                if x == f32::NEG_INFINITY {
                    return 0.0;
                }
                let clamped = x.clamp(-88.0, 88.0);
                1.0 / (1.0 + (-clamped).exp())
            }
            Self::Tanh => x.tanh(),
            Self::ReLU => x.max(0.0),
            Self::Sine => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.sin()
            }
            Self::Gaussian => {
                if x.abs() > 26.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Normalize { min, max } => cyclical_linear_remap(x, min, max, -1.0, 1.0),
            Self::Remap { min, max } => cyclical_linear_remap(x, -1.0, 1.0, min, max),
            Self::Sign => {
                if x > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Whether this kind rescales between a gene's range and the network range.
    #[must_use]
    pub fn is_mapper(self) -> bool {
        matches!(
            self,
            Self::Normalize { .. } | Self::Remap { .. } | Self::Sign
        )
    }
}

/// Linearly remap `v` from `[v_start, v_end]` to `[out_start, out_end]`,
/// clamping the result to the output interval.
#[must_use]
pub fn clamped_linear_remap(v: f32, v_start: f32, v_end: f32, out_start: f32, out_end: f32) -> f32 {
    let span = v_end - v_start;
    if span == 0.0 {
        return out_start;
    }
    let mapped = (v - v_start) / span * (out_end - out_start) + out_start;
    let (lo, hi) = if out_start <= out_end {
        (out_start, out_end)
    } else {
        (out_end, out_start)
    };
    mapped.clamp(lo, hi)
}

/// Remap `v` like [`clamped_linear_remap`], but first wrap a value outside
/// `[v_start, v_end]` back into that interval as if the interval were a circle.
#[must_use]
pub fn cyclical_linear_remap(
    v: f32,
    v_start: f32,
    v_end: f32,
    out_start: f32,
    out_end: f32,
) -> f32 {
    let (lo, hi) = if v_start <= v_end {
        (v_start, v_end)
    } else {
        (v_end, v_start)
    };
    let span = hi - lo;
    let wrapped = if !v.is_finite() {
        v.clamp(lo, hi)
    } else if span > 0.0 && (v < lo || v > hi) {
        lo + (v - lo).rem_euclid(span)
    } else {
        v
    };
    clamped_linear_remap(wrapped, v_start, v_end, out_start, out_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        assert!((Activation::Linear.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((Activation::Linear.apply(-2.0) - -2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid() {
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-6);
        assert!(Activation::Sigmoid.apply(10.0) > 0.99);
        assert!(Activation::Sigmoid.apply(-10.0) < 0.01);
        assert!((Activation::Sigmoid.apply(f32::INFINITY) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tanh_and_relu() {
        assert!(Activation::Tanh.apply(0.0).abs() < 1e-6);
        assert!(Activation::Tanh.apply(10.0) > 0.99);
        assert!((Activation::ReLU.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(Activation::ReLU.apply(-0.5).abs() < 1e-6);
    }

    #[test]
    fn test_gaussian_and_sine() {
        assert!((Activation::Gaussian.apply(0.0) - 1.0).abs() < 1e-6);
        assert!(Activation::Gaussian.apply(3.0) < 0.001);
        assert!(Activation::Sine.apply(0.0).abs() < 1e-6);
    }

    #[test]
    fn test_sign_threshold() {
        assert!((Activation::Sign.apply(0.01) - 1.0).abs() < 1e-6);
        assert!((Activation::Sign.apply(0.0) + 1.0).abs() < 1e-6);
        assert!((Activation::Sign.apply(-3.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_remap_endpoints() {
        let remap = Activation::Remap { min: 2.0, max: 6.0 };
        assert!((remap.apply(-1.0) - 2.0).abs() < 1e-6);
        assert!((remap.apply(0.0) - 4.0).abs() < 1e-6);
        assert!((remap.apply(1.0) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_inverts_remap() {
        let normalize = Activation::Normalize { min: 2.0, max: 6.0 };
        let remap = Activation::Remap { min: 2.0, max: 6.0 };
        for v in [2.0, 3.3, 4.0, 5.9] {
            assert!((remap.apply(normalize.apply(v)) - v).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cyclical_wrap() {
        // 1.5 lies half a unit past the end of [-1, 1] and wraps to -0.5
        let v = cyclical_linear_remap(1.5, -1.0, 1.0, -1.0, 1.0);
        assert!((v + 0.5).abs() < 1e-6);
        let v = cyclical_linear_remap(-1.5, -1.0, 1.0, 0.0, 10.0);
        assert!((v - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_remap_outputs_stay_in_bounds() {
        let remap = Activation::Remap { min: -3.0, max: 8.0 };
        for i in -100..100 {
            let out = remap.apply(i as f32 * 0.37);
            assert!((-3.0..=8.0).contains(&out), "{out} escaped bounds");
        }
        assert!((-3.0..=8.0).contains(&remap.apply(f32::INFINITY)));
    }

    #[test]
    fn test_degenerate_range() {
        assert!((clamped_linear_remap(5.0, 1.0, 1.0, 3.0, 4.0) - 3.0).abs() < 1e-6);
    }
}
