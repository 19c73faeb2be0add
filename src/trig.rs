//! Integer trigonometry in whole degrees.
//!
//! Sine and cosine are returned in a signed 10 bit range where `512`
//! stands for `1.0`. The values come from a quarter wave table and quadrant
//! symmetry, which is cheap enough to run several times per PWM cycle.

/// Value of `sin(90°)`.
pub const TRIG_FULL_SCALE: i16 = 512;

/// `512 * sin(x)` for `x` in `0..=90` degrees.
const SINE_QUARTER_WAVE: [i16; 91] = [
    0, 9, 18, 27, 36, 45, 54, 62, 71, 80, 89, 98, 106, 115, 124, 133, 141, 150, 158, 167, 175,
    183, 192, 200, 208, 216, 224, 232, 240, 248, 256, 264, 271, 279, 286, 294, 301, 308, 315, 322,
    329, 336, 343, 349, 356, 362, 368, 374, 380, 386, 392, 398, 403, 409, 414, 419, 424, 429, 434,
    439, 443, 448, 452, 456, 460, 464, 468, 471, 475, 478, 481, 484, 487, 490, 492, 495, 497, 499,
    501, 503, 504, 506, 507, 508, 509, 510, 511, 511, 512, 512, 512,
];

/// Reduces an angle in degrees to `0..360`.
///
/// Negative angles are brought into range by adding whole turns, so `-1`
/// maps to `359`.
pub const fn normalize_angle(theta: i32) -> u16 {
    theta.rem_euclid(360) as u16
}

/// Sine of an angle in degrees, in `-512..=512`.
pub const fn sine(theta: i32) -> i16 {
    let theta = normalize_angle(theta) as usize;
    match theta {
        0..=90 => SINE_QUARTER_WAVE[theta],
        91..=180 => SINE_QUARTER_WAVE[180 - theta],
        181..=270 => -SINE_QUARTER_WAVE[theta - 180],
        _ => -SINE_QUARTER_WAVE[360 - theta],
    }
}

/// Cosine of an angle in degrees, in `-512..=512`.
pub const fn cosine(theta: i32) -> i16 {
    // Normalise first so that `+ 90` cannot overflow.
    sine(normalize_angle(theta) as i32 + 90)
}

/// Sine and cosine of the electrical angle at the three phase offsets.
///
/// Computed once per control cycle and handed to every transform run in
/// that cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrigTriplet {
    pub sin_0: i16,
    pub sin_120: i16,
    pub sin_240: i16,
    pub cos_0: i16,
    pub cos_120: i16,
    pub cos_240: i16,
}

impl TrigTriplet {
    /// Evaluates the triplet for an electrical angle in degrees.
    ///
    /// The angle is advanced by 90° first so that the `d` axis of the Park
    /// transform lines up with phase A at zero electrical angle.
    pub const fn new(theta_electrical: i32) -> Self {
        let theta = normalize_angle(theta_electrical) as i32 + 90;
        Self {
            sin_0: sine(theta),
            sin_120: sine(theta + 120),
            sin_240: sine(theta + 240),
            cos_0: cosine(theta),
            cos_120: cosine(theta + 120),
            cos_240: cosine(theta + 240),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixed::types::I16F16;

    #[test]
    fn normalize_is_in_range_and_periodic() {
        for theta in -2000..2000 {
            let n = normalize_angle(theta);
            assert!(n < 360, "{theta} -> {n}");
            for k in -3..=3 {
                assert_eq!(normalize_angle(theta + 360 * k), n);
            }
        }
        assert_eq!(normalize_angle(-1), 359);
        assert_eq!(normalize_angle(-360), 0);
        assert_eq!(normalize_angle(-361), 359);
        assert_eq!(normalize_angle(720), 0);
        assert!(normalize_angle(i32::MIN) < 360);
        assert!(normalize_angle(i32::MAX) < 360);
    }

    #[test]
    fn sine_landmarks() {
        assert_eq!(sine(0), 0);
        assert_eq!(sine(90), 512);
        assert_eq!(sine(180), 0);
        assert_eq!(sine(270), -512);
        assert_eq!(sine(30), 256);
        assert_eq!(sine(-90), -512);
        assert_eq!(sine(450), 512);
    }

    #[test]
    fn sine_is_odd_around_half_turn() {
        for theta in -720..720 {
            assert_eq!(sine(theta), -sine(theta + 180), "theta = {theta}");
        }
    }

    #[test]
    fn cosine_is_shifted_sine() {
        for theta in -720..720 {
            assert_eq!(cosine(theta), sine(theta + 90), "theta = {theta}");
        }
        assert_eq!(cosine(0), 512);
        assert_eq!(cosine(180), -512);
        // Large angles must not overflow when shifted.
        assert_eq!(cosine(i32::MAX), sine(normalize_angle(i32::MAX) as i32 + 90));
    }

    #[test]
    fn table_matches_cordic() {
        for degrees in 0..=90 {
            let radians = I16F16::from_num((degrees as f32).to_radians());
            let (sin, _) = cordic::sin_cos(radians);
            let expected = sin.to_num::<f32>() * 512.0;
            let actual = sine(degrees) as f32;
            assert!(
                (actual - expected).abs() <= 1.0,
                "{degrees}: {actual} vs {expected}"
            );
        }
    }

    #[test]
    fn triplet_at_zero() {
        let t = TrigTriplet::new(0);
        assert_eq!(t.sin_0, 512);
        assert_eq!(t.cos_0, 0);
        assert_eq!(t.sin_120, -256);
        assert_eq!(t.sin_240, -256);
        assert_eq!(t.cos_120, -443);
        assert_eq!(t.cos_240, 443);
    }

    #[test]
    fn triplet_phases_are_balanced() {
        for theta in 0..360 {
            let t = TrigTriplet::new(theta);
            let sin_sum = t.sin_0 as i32 + t.sin_120 as i32 + t.sin_240 as i32;
            let cos_sum = t.cos_0 as i32 + t.cos_120 as i32 + t.cos_240 as i32;
            assert!(sin_sum.abs() <= 2, "theta = {theta}: {sin_sum}");
            assert!(cos_sum.abs() <= 2, "theta = {theta}: {cos_sum}");
        }
    }

    #[test]
    fn triplet_is_periodic() {
        assert_eq!(TrigTriplet::new(37), TrigTriplet::new(37 - 720));
    }
}
