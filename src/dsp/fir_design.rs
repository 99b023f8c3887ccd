//! Channel Filter Design
//!
//! Linear-phase lowpass FIR design for carrier channel filters. Coefficients
//! are quantized to Q1.15 and are exactly symmetric, so the datapath can fold
//! the filter.

use core::f32::consts::PI;

use fixed::types::I1F15;
use heapless::Vec;
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use crate::config::MAX_TAPS_PER_CARRIER;

/// Fixed-point coefficient type (Q1.15 format)
pub type Coefficient = I1F15;

/// Coefficients of one carrier filter, raw Q1.15 bits
pub type Coefficients = Vec<i16, MAX_TAPS_PER_CARRIER>;

/// Quantize to Q1.15, saturating at the format limits
#[must_use]
pub fn quantize(value: f32) -> i16 {
    Coefficient::saturating_from_num(value).to_bits()
}

/// Single-tap pass-through filter
#[must_use]
pub fn passthrough() -> Coefficients {
    let mut taps = Vec::new();
    let _ = taps.push(Coefficient::MAX.to_bits());
    taps
}

/// Hamming-windowed sinc lowpass
///
/// `cutoff_normalized` is relative to the carrier sample rate and clamped to
/// 0..0.5. The DC gain is normalized to one before quantization. A tap count of
/// zero or one yields [`passthrough`]; counts above the per-carrier limit are
/// clamped.
#[must_use]
pub fn lowpass(taps: usize, cutoff_normalized: f32) -> Coefficients {
    let taps = taps.min(MAX_TAPS_PER_CARRIER);
    if taps <= 1 {
        return passthrough();
    }

    let m = (taps - 1) as f32;
    let fc = cutoff_normalized.clamp(0.0, 0.5);
    let half = taps.div_ceil(2);

    // Design one half, mirror for exact symmetry
    let mut proto = [0.0f32; MAX_TAPS_PER_CARRIER];
    for (i, c) in proto.iter_mut().enumerate().take(half) {
        let n = i as f32 - m / 2.0;
        let sinc = if n.abs() < 0.0001 {
            2.0 * fc
        } else {
            (2.0 * PI * fc * n).sin() / (PI * n)
        };
        let window = 0.54 - 0.46 * (2.0 * PI * i as f32 / m).cos();
        *c = sinc * window;
    }
    for i in half..taps {
        proto[i] = proto[taps - 1 - i];
    }

    let sum: f32 = proto[..taps].iter().sum();
    let scale = if sum.abs() > 0.0001 { 1.0 / sum } else { 1.0 };

    proto[..taps].iter().map(|&c| quantize(c * scale)).collect()
}

/// True when the coefficients read the same in both directions
#[must_use]
pub fn is_symmetric(coefficients: &[i16]) -> bool {
    coefficients
        .iter()
        .zip(coefficients.iter().rev())
        .all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_is_unity() {
        assert_eq!(lowpass(1, 0.25).as_slice(), &[i16::MAX]);
        assert_eq!(lowpass(0, 0.25).len(), 1);
    }

    #[test]
    fn lowpass_is_symmetric() {
        for taps in [2, 7, 31, 64, 127] {
            let c = lowpass(taps, 0.2);
            assert_eq!(c.len(), taps);
            assert!(is_symmetric(&c), "{taps} taps");
        }
    }

    #[test]
    fn lowpass_unity_dc_gain() {
        let c = lowpass(31, 0.2);
        let dc: i32 = c.iter().map(|&v| i32::from(v)).sum();
        assert!((dc - 32768).abs() < 64, "dc gain {dc}");
    }

    #[test]
    fn asymmetric_detected() {
        assert!(!is_symmetric(&[1, 2, 3]));
        assert!(is_symmetric(&[1, 2, 1]));
        assert!(is_symmetric(&[]));
    }
}
