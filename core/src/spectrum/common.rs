//! Common.

use crate::pbrt::*;

/// Representative wavelengths (nanometers) for the red, green and blue
/// primaries used when a spectral distribution is reduced to RGB.
pub const RGB_WAVELENGTHS: [Float; 3] = [610.0, 550.0, 465.0];

/// Converts the given XYZ coefficients to RGB coefficients using RGB spectra
/// defined for high-definition TVs.
///
/// * `xyz` - The XYZ coefficients.
#[rustfmt::skip]
pub fn xyz_to_rgb(xyz: &[Float; 3]) -> [Float; 3] {
    [
         3.240479 * xyz[0] - 1.537150 * xyz[1] - 0.498535 * xyz[2],
        -0.969256 * xyz[0] + 1.875991 * xyz[1] + 0.041556 * xyz[2],
         0.055648 * xyz[0] - 0.204043 * xyz[1] + 1.057311 * xyz[2],
    ]
}

/// Converts the given RGB coefficients to XYZ coefficients using RGB spectra
/// defined for high-definition TVs.
///
/// * `rgb` - The RGB coefficients.
#[rustfmt::skip]
pub fn rgb_to_xyz(rgb: &[Float; 3]) -> [Float; 3] {
    [
        0.412453 * rgb[0] + 0.357580 * rgb[1] + 0.180423 * rgb[2],
        0.212671 * rgb[0] + 0.715160 * rgb[1] + 0.072169 * rgb[2],
        0.019334 * rgb[0] + 0.119193 * rgb[1] + 0.950227 * rgb[2],
    ]
}

/// Returns the emitted radiance at a given temperature and wavelengths for a
/// blackbody (perfect emitter).
///
/// * `lambda` - Wavelengths in nanometers.
/// * `t`      - Temperature in Kelvin.
pub fn blackbody(lambda: &[Float], t: Float) -> Vec<Float> {
    if t <= 0.0 {
        return vec![0.0; lambda.len()];
    }

    // Evaluate in f64; h*c / (l*kb*t) overflows f32 intermediates.
    const C: f64 = 299792458.0;
    const H: f64 = 6.62606957e-34;
    const KB: f64 = 1.3806488e-23;

    lambda
        .iter()
        .map(|&nm| {
            let l = nm as f64 * 1e-9; // nanometers -> meters.
            let lambda5 = (l * l) * (l * l) * l;
            let le = (2.0 * H * C * C) / (lambda5 * (((H * C) / (l * KB * t as f64)).exp() - 1.0));
            le as Float
        })
        .collect()
}

/// Returns the normalized emitted radiance at a given temperature and
/// wavelengths for a blackbody based on maximum blackbody radiance.
///
/// * `lambda` - Wavelengths in nanometers.
/// * `t`      - Temperature in Kelvin.
pub fn blackbody_normalized(lambda: &[Float], t: Float) -> Vec<Float> {
    let mut le = blackbody(lambda, t);

    // Wien's displacement law gives the wavelength of peak emission.
    let lambda_max = 2.8977721e-3 / t * 1e9;
    let max_l = blackbody(&[lambda_max], t)[0];
    if max_l > 0.0 {
        for v in le.iter_mut() {
            *v /= max_l;
        }
    }
    le
}

/// Returns the RGB white point of a blackbody at the given temperature,
/// scaled so the largest component is 1. Non-positive temperatures return
/// white.
///
/// * `t` - Temperature in Kelvin.
pub fn temperature_to_white_point(t: Float) -> [Float; 3] {
    if t <= 0.0 {
        return [1.0; 3];
    }

    let le = blackbody_normalized(&RGB_WAVELENGTHS, t);
    let m = le.iter().cloned().fold(0.0, Float::max);
    if m > 0.0 {
        [le[0] / m, le[1] / m, le[2] / m]
    } else {
        [1.0; 3]
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;

    #[test]
    fn xyz_rgb_round_trip() {
        let rgb = [0.25, 0.5, 0.75];
        let back = xyz_to_rgb(&rgb_to_xyz(&rgb));
        for i in 0..3 {
            assert!(approx_eq!(f32, back[i], rgb[i], epsilon = 1e-4));
        }
    }

    #[test]
    fn blackbody_zero_temperature_is_black() {
        assert_eq!(blackbody(&[500.0, 600.0], 0.0), vec![0.0, 0.0]);
    }

    #[test]
    fn normalized_blackbody_peaks_at_one() {
        let t = 5000.0;
        let peak = 2.8977721e-3 / t * 1e9;
        let le = blackbody_normalized(&[peak], t);
        assert!(approx_eq!(f32, le[0], 1.0, epsilon = 1e-4));
    }

    #[test]
    fn white_point_is_warm_at_low_temperature() {
        let wp = temperature_to_white_point(2000.0);
        assert_eq!(wp[0], 1.0);
        assert!(wp[2] < wp[1] && wp[1] < wp[0]);

        let wp = temperature_to_white_point(20000.0);
        assert_eq!(wp[2], 1.0);
        assert!(wp[0] < wp[2]);
    }
}
