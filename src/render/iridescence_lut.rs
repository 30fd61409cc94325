//! Thin-film reflectance lookup table
//!
//! Pre-computes the reflectance of an air / film / base dielectric stack
//! across film thickness and view angle, so the bubble shader can shade
//! iridescence with a single texture fetch. The table depends only on the
//! two refractive indices and is rebuilt when either changes.

use std::f32::consts::PI;

/// LUT dimensions - balance between quality and memory
pub const LUT_THICKNESS_SAMPLES: u32 = 256; // 0-1000nm range
pub const LUT_ANGLE_SAMPLES: u32 = 64; // cos_theta 0-1

/// Maximum thickness in nanometers covered by the LUT
pub const LUT_MAX_THICKNESS_NM: f32 = 1000.0;

/// 7-point spectral sampling
const WAVELENGTHS: [f32; 7] = [400.0, 450.0, 500.0, 550.0, 600.0, 650.0, 700.0];

/// Refractive indices a LUT was built for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LutKey {
    pub film_ior: f32,
    pub base_ior: f32,
}

/// Generate the reflectance table as RGBA8, thickness along X and
/// `cos_theta` along Y
pub fn generate_iridescence_lut(key: LutKey) -> Vec<u8> {
    let size = (LUT_THICKNESS_SAMPLES * LUT_ANGLE_SAMPLES) as usize;
    let mut data = Vec::with_capacity(size * 4);
    let white = spectral_to_rgb(|_| 1.0);

    for angle_idx in 0..LUT_ANGLE_SAMPLES {
        for thickness_idx in 0..LUT_THICKNESS_SAMPLES {
            let thickness_nm = (thickness_idx as f32 / (LUT_THICKNESS_SAMPLES - 1) as f32)
                * LUT_MAX_THICKNESS_NM;
            let cos_theta = angle_idx as f32 / (LUT_ANGLE_SAMPLES - 1) as f32;

            let rgb = thin_film_reflectance_with_white(
                thickness_nm,
                cos_theta,
                key.film_ior,
                key.base_ior,
                white,
            );

            data.push((rgb[0].clamp(0.0, 1.0) * 255.0).round() as u8);
            data.push((rgb[1].clamp(0.0, 1.0) * 255.0).round() as u8);
            data.push((rgb[2].clamp(0.0, 1.0) * 255.0).round() as u8);
            data.push(255);
        }
    }

    data
}

/// Linear RGB reflectance of the film stack. A wavelength-independent
/// reflectance maps to equal RGB channels.
pub fn thin_film_reflectance(
    thickness_nm: f32,
    cos_theta: f32,
    film_ior: f32,
    base_ior: f32,
) -> [f32; 3] {
    let white = spectral_to_rgb(|_| 1.0);
    thin_film_reflectance_with_white(thickness_nm, cos_theta, film_ior, base_ior, white)
}

fn thin_film_reflectance_with_white(
    thickness_nm: f32,
    cos_theta: f32,
    film_ior: f32,
    base_ior: f32,
    white: [f32; 3],
) -> [f32; 3] {
    let cos_theta = cos_theta.clamp(0.0, 1.0);
    let cos_film = snells_law(cos_theta, 1.0, film_ior);
    let cos_base = snells_law(cos_theta, 1.0, base_ior);

    let r12 = fresnel_unpolarized(cos_theta, cos_film, 1.0, film_ior);
    let r23 = fresnel_unpolarized(cos_film, cos_base, film_ior, base_ior);

    // Reflection off an optically denser medium flips the phase
    let mut phase_shift = 0.0;
    if film_ior > 1.0 {
        phase_shift += PI;
    }
    if base_ior > film_ior {
        phase_shift += PI;
    }

    let optical_path = 2.0 * film_ior * thickness_nm * cos_film;
    let rgb = spectral_to_rgb(|wavelength| {
        let phase = 2.0 * PI * optical_path / wavelength + phase_shift;
        airy_reflectance(r12, r23, phase)
    });

    [rgb[0] / white[0], rgb[1] / white[1], rgb[2] / white[2]]
}

/// Integrate a spectral function against the CIE curves and convert to
/// linear sRGB
fn spectral_to_rgb(f: impl Fn(f32) -> f32) -> [f32; 3] {
    let mut xyz = [0.0f32; 3];
    for wavelength in WAVELENGTHS {
        let value = f(wavelength);
        let cie = cie_color_matching(wavelength);
        xyz[0] += cie[0] * value;
        xyz[1] += cie[1] * value;
        xyz[2] += cie[2] * value;
    }
    xyz_to_rgb(xyz.map(|v| v / WAVELENGTHS.len() as f32))
}

/// Snell's law: cosine of the refracted angle going from `n1` into `n2`
fn snells_law(cos_theta_i: f32, n1: f32, n2: f32) -> f32 {
    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = sin_theta_i * n1 / n2;
    (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt()
}

/// Fresnel equations for unpolarized light
fn fresnel_unpolarized(cos_theta_i: f32, cos_theta_t: f32, n1: f32, n2: f32) -> f32 {
    // s-polarization
    let n1_cos_i = n1 * cos_theta_i;
    let n2_cos_t = n2 * cos_theta_t;
    let r_s = (n1_cos_i - n2_cos_t) / (n1_cos_i + n2_cos_t).max(0.0001);

    // p-polarization
    let n2_cos_i = n2 * cos_theta_i;
    let n1_cos_t = n1 * cos_theta_t;
    let r_p = (n2_cos_i - n1_cos_t) / (n2_cos_i + n1_cos_t).max(0.0001);

    (r_s * r_s + r_p * r_p) * 0.5
}

/// Two-interface Airy sum for reflectances `r12`, `r23` at total phase
/// difference `phase`
fn airy_reflectance(r12: f32, r23: f32, phase: f32) -> f32 {
    let cross = 2.0 * (r12 * r23).sqrt() * phase.cos();
    let numerator = r12 + r23 + cross;
    let denominator = 1.0 + r12 * r23 + cross;
    (numerator / denominator.max(0.0001)).clamp(0.0, 1.0)
}

/// CIE 1931 color matching functions (Gaussian approximation)
fn cie_color_matching(wavelength: f32) -> [f32; 3] {
    let x = 1.056 * gaussian(wavelength, 599.8, 37.9) + 0.362 * gaussian(wavelength, 442.0, 16.0)
        - 0.065 * gaussian(wavelength, 501.1, 20.4);

    let y = 0.821 * gaussian(wavelength, 568.8, 46.9) + 0.286 * gaussian(wavelength, 530.9, 31.1);

    let z = 1.217 * gaussian(wavelength, 437.0, 11.8) + 0.681 * gaussian(wavelength, 459.0, 26.0);

    [x.max(0.0), y.max(0.0), z.max(0.0)]
}

#[inline]
fn gaussian(x: f32, mean: f32, sigma: f32) -> f32 {
    let t = (x - mean) / sigma;
    (-0.5 * t * t).exp()
}

/// Convert XYZ to linear sRGB
fn xyz_to_rgb(xyz: [f32; 3]) -> [f32; 3] {
    let r = 3.2404542 * xyz[0] - 1.5371385 * xyz[1] - 0.4985314 * xyz[2];
    let g = -0.9692660 * xyz[0] + 1.8760108 * xyz[1] + 0.0415560 * xyz[2];
    let b = 0.0556434 * xyz[0] - 0.2040259 * xyz[1] + 1.0572252 * xyz[2];
    [r, g, b]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Normal-incidence reflectance of a bare air/base interface
    fn base_reflectance(ior: f32) -> f32 {
        ((ior - 1.0) / (ior + 1.0)).powi(2)
    }

    #[test]
    fn test_lut_size() {
        let lut = generate_iridescence_lut(LutKey {
            film_ior: 1.3,
            base_ior: 1.5,
        });
        let expected_size = (LUT_THICKNESS_SAMPLES * LUT_ANGLE_SAMPLES * 4) as usize;
        assert_eq!(lut.len(), expected_size);
        assert!(lut.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_film_matching_air_is_plain_fresnel() {
        // A film with the IOR of air vanishes: no color, just the base
        for thickness in [0.0, 250.0, 800.0] {
            let rgb = thin_film_reflectance(thickness, 1.0, 1.0, 1.5);
            for channel in rgb {
                assert!((channel - base_reflectance(1.5)).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_zero_thickness_is_plain_fresnel() {
        let rgb = thin_film_reflectance(0.0, 1.0, 1.33, 1.5);
        for channel in rgb {
            assert!((channel - base_reflectance(1.5)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_film_produces_color() {
        let rgb = thin_film_reflectance(400.0, 0.9, 1.33, 1.0);
        let spread = rgb.iter().cloned().fold(f32::MIN, f32::max)
            - rgb.iter().cloned().fold(f32::MAX, f32::min);
        assert!(spread > 0.005, "expected tinted reflectance, got {:?}", rgb);
    }

    #[test]
    fn test_grazing_angle_reflects_more() {
        let normal = thin_film_reflectance(0.0, 1.0, 1.0, 1.5);
        let grazing = thin_film_reflectance(0.0, 0.05, 1.0, 1.5);
        assert!(grazing[1] > normal[1] * 5.0);
    }

    #[test]
    fn test_snells_law() {
        // Normal incidence
        assert!((snells_law(1.0, 1.0, 1.33) - 1.0).abs() < 0.01);

        // Grazing angle
        let cos_t = snells_law(0.1, 1.0, 1.33);
        assert!(cos_t > 0.0 && cos_t < 1.0);
    }

    #[test]
    fn test_fresnel_at_normal_incidence() {
        let r = fresnel_unpolarized(1.0, 1.0, 1.0, 1.33);
        // For n1=1, n2=1.33, R0 ≈ ((0.33)/(2.33))² ≈ 0.02
        assert!(r > 0.01 && r < 0.05);
    }
}
