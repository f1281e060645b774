//! Oscillator waveforms and angle helpers shared by the routine bodies.

use std::f64::consts::{PI, TAU};

/// Periodic waveform shape for magnitude/angle oscillation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    /// Rising ramp from bound1 to bound2, then snap back.
    Saw,
    /// Linear up-down sweep between the bounds.
    Triangle,
    /// bound1 for the first half period, bound2 for the second.
    Square,
    /// Sinusoid centered between the bounds.
    Sin,
    /// Cosinusoid centered between the bounds.
    Cos,
}

/// Sine of an angle in degrees.
pub fn sind(deg: f64) -> f64 {
    deg.to_radians().sin()
}

/// Cosine of an angle in degrees.
pub fn cosd(deg: f64) -> f64 {
    deg.to_radians().cos()
}

/// Wraps an angle in radians into [-π, π).
pub fn normalize_angle(rad: f64) -> f64 {
    let wrapped = (rad + PI).rem_euclid(TAU);
    wrapped - PI
}

/// Phase of `t` within one period at `freq`, in [0, 1).
///
/// Negative frequencies run the phase backwards; a zero frequency pins the
/// phase at 0.
pub fn normalize_time(t: f64, freq: f64) -> f64 {
    if freq == 0.0 {
        return 0.0;
    }
    (t * freq).rem_euclid(1.0)
}

/// Oscillates between `bound1` and `bound2` at `freq` with the given shape.
///
/// The phase starts at `bound1` (saw/triangle/square) or at the midpoint
/// (sin). Bounds are positional, not ordered: swapping them inverts the
/// waveform.
pub fn osc_between(t: f64, wave: Waveform, freq: f64, bound1: f64, bound2: f64) -> f64 {
    let phase = normalize_time(t, freq);
    let mid = 0.5 * (bound1 + bound2);
    let amp = 0.5 * (bound2 - bound1);
    match wave {
        Waveform::Saw => bound1 + (bound2 - bound1) * phase,
        Waveform::Triangle => {
            if phase < 0.5 {
                bound1 + (bound2 - bound1) * 2.0 * phase
            } else {
                bound2 - (bound2 - bound1) * 2.0 * (phase - 0.5)
            }
        }
        Waveform::Square => {
            if phase < 0.5 {
                bound1
            } else {
                bound2
            }
        }
        Waveform::Sin => mid + amp * (TAU * phase).sin(),
        Waveform::Cos => mid + amp * (TAU * phase).cos(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(0.0)).abs() < 1e-12);
        assert!((normalize_angle(TAU + 0.25) - 0.25).abs() < 1e-12);
        assert!((normalize_angle(PI) - (-PI)).abs() < 1e-12); // half-open at +π
        assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_time_phase() {
        assert_eq!(normalize_time(0.0, 2.0), 0.0);
        assert!((normalize_time(0.75, 2.0) - 0.5).abs() < 1e-12);
        assert!((normalize_time(1.0, 2.0)).abs() < 1e-12);
        // Negative frequency runs backwards but stays in [0, 1).
        let phase = normalize_time(0.25, -1.0);
        assert!((0.0..1.0).contains(&phase));
        assert!((phase - 0.75).abs() < 1e-12);
        assert_eq!(normalize_time(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_osc_between_stays_in_bounds() {
        for wave in [
            Waveform::Saw,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Sin,
            Waveform::Cos,
        ] {
            for i in 0..100 {
                let t = i as f64 * 0.013;
                let v = osc_between(t, wave, 3.0, -5.0, 10.0);
                assert!(
                    (-5.0..=10.0).contains(&v),
                    "{:?} out of bounds at t={}: {}",
                    wave,
                    t,
                    v
                );
            }
        }
    }

    #[test]
    fn test_osc_between_endpoints() {
        assert_eq!(osc_between(0.0, Waveform::Saw, 1.0, -2.0, 2.0), -2.0);
        assert_eq!(osc_between(0.5, Waveform::Saw, 1.0, -2.0, 2.0), 0.0);
        assert_eq!(osc_between(0.0, Waveform::Square, 1.0, -2.0, 2.0), -2.0);
        assert_eq!(osc_between(0.6, Waveform::Square, 1.0, -2.0, 2.0), 2.0);
        assert_eq!(osc_between(0.25, Waveform::Triangle, 1.0, 0.0, 4.0), 2.0);
        assert!((osc_between(0.0, Waveform::Sin, 1.0, -2.0, 2.0)).abs() < 1e-12);
        assert!((osc_between(0.0, Waveform::Cos, 1.0, -2.0, 2.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degree_trig() {
        assert!((sind(90.0) - 1.0).abs() < 1e-12);
        assert!((cosd(180.0) + 1.0).abs() < 1e-12);
    }
}
