//! Affine transform helpers on top of `glam::Affine3A`.
//!
//! `Affine3A` is the 4x3 affine transform used for bind poses and skeleton
//! poses throughout the crate.

use glam::{Affine3A, Vec3};

/// Inverse computed through the scale/orientation/translation decomposition.
///
/// For a transform `T * R * S` this returns `S⁻¹ * R⁻¹ * T⁻¹`. Zero scale
/// components stay zero instead of producing infinities.
pub fn scale_orientation_translation_inverse(m: &Affine3A) -> Affine3A {
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    let inv_scale = Vec3::new(recip_or_zero(scale.x), recip_or_zero(scale.y), recip_or_zero(scale.z));

    Affine3A::from_scale(inv_scale)
        * Affine3A::from_quat(rotation.inverse())
        * Affine3A::from_translation(-translation)
}

/// Blend two affine transforms.
///
/// Both transforms are decomposed; scale and translation are lerped and the
/// rotation is slerped, so blending never introduces skew the way a raw
/// matrix-element lerp would.
pub fn blend(a: &Affine3A, b: &Affine3A, t: f32) -> Affine3A {
    let (scale_a, rotation_a, translation_a) = a.to_scale_rotation_translation();
    let (scale_b, rotation_b, translation_b) = b.to_scale_rotation_translation();

    Affine3A::from_scale_rotation_translation(
        scale_a.lerp(scale_b, t),
        rotation_a.slerp(rotation_b, t),
        translation_a.lerp(translation_b, t),
    )
}

/// Mirror a transform across the XY plane (`S * m * S`, `S = diag(1, 1, -1)`).
///
/// Converts between left- and right-handed source data.
pub fn invert_z(m: &Affine3A) -> Affine3A {
    let mirror = Affine3A::from_scale(Vec3::new(1.0, 1.0, -1.0));
    mirror * *m * mirror
}

fn recip_or_zero(v: f32) -> f32 {
    if v == 0.0 { 0.0 } else { v.recip() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn sample() -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            Vec3::new(2.0, 0.5, 1.5),
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, -1.1, 0.7),
            Vec3::new(3.0, -2.0, 8.0),
        )
    }

    #[test]
    fn test_sot_inverse_matches_general_inverse() {
        let m = sample();
        let inv = scale_orientation_translation_inverse(&m);
        assert!(inv.abs_diff_eq(m.inverse(), 1e-5));
        assert!((m * inv).abs_diff_eq(Affine3A::IDENTITY, 1e-5));
    }

    #[test]
    fn test_blend_endpoints() {
        let a = Affine3A::IDENTITY;
        let b = sample();
        assert!(blend(&a, &b, 0.0).abs_diff_eq(a, 1e-5));
        assert!(blend(&a, &b, 1.0).abs_diff_eq(b, 1e-5));
    }

    #[test]
    fn test_blend_halfway_translation() {
        let a = Affine3A::from_translation(Vec3::new(0.0, 0.0, 0.0));
        let b = Affine3A::from_translation(Vec3::new(4.0, -2.0, 1.0));
        let mid = blend(&a, &b, 0.5);
        assert!(mid.translation.abs_diff_eq(glam::Vec3A::new(2.0, -1.0, 0.5), 1e-6));
    }

    #[test]
    fn test_blend_rotation_stays_orthonormal() {
        let a = Affine3A::from_rotation_z(0.0);
        let b = Affine3A::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let mid = blend(&a, &b, 0.5);
        // A raw element lerp would shrink the basis vectors to ~0.707.
        assert!((mid.matrix3.x_axis.length() - 1.0).abs() < 1e-5);
        assert!(mid.abs_diff_eq(Affine3A::from_rotation_z(std::f32::consts::FRAC_PI_4), 1e-5));
    }

    #[test]
    fn test_invert_z_is_an_involution() {
        let m = sample();
        assert!(invert_z(&invert_z(&m)).abs_diff_eq(m, 1e-6));
    }

    #[test]
    fn test_invert_z_flips_translation() {
        let m = Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let flipped = invert_z(&m);
        assert!(flipped.translation.abs_diff_eq(glam::Vec3A::new(1.0, 2.0, -3.0), 1e-6));
    }
}
