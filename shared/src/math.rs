//! Bone matrix shared by GPU uploads and asset files.
//!
//! Runtime math uses `glam::Affine3A`; [`BoneMatrix3x4`] is its packed form.

use glam::{Affine3A, Mat3A, Vec3A};
use serde::{Deserialize, Serialize};

/// Affine bone transform as three rows of a 4x4 matrix (48 bytes, POD).
///
/// Row `i` is `[m_i0, m_i1, m_i2, t_i]`; the omitted fourth row is
/// `[0, 0, 0, 1]`. This is the layout of bone palettes in shader uniforms
/// and of every matrix in a keyframe file.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(C)]
pub struct BoneMatrix3x4 {
    pub row0: [f32; 4],
    pub row1: [f32; 4],
    pub row2: [f32; 4],
}

impl BoneMatrix3x4 {
    pub const SIZE: usize = 48;

    pub const IDENTITY: Self = Self::from_rows(
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    );

    pub const fn from_rows(row0: [f32; 4], row1: [f32; 4], row2: [f32; 4]) -> Self {
        Self { row0, row1, row2 }
    }

    /// The twelve elements in row-major order.
    pub fn to_array(&self) -> [f32; 12] {
        bytemuck::cast(*self)
    }

    pub fn from_array(elements: [f32; 12]) -> Self {
        bytemuck::cast(elements)
    }

    /// Little-endian encoding used by asset files.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        for (dst, value) in out.chunks_exact_mut(4).zip(self.to_array()) {
            dst.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decode the first [`SIZE`](Self::SIZE) bytes; `None` if `bytes` is shorter.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..Self::SIZE)?;
        let mut elements = [0.0f32; 12];
        for (value, src) in elements.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        }
        Some(Self::from_array(elements))
    }
}

impl From<Affine3A> for BoneMatrix3x4 {
    fn from(m: Affine3A) -> Self {
        let x = m.matrix3.x_axis;
        let y = m.matrix3.y_axis;
        let z = m.matrix3.z_axis;
        let t = m.translation;
        Self {
            row0: [x.x, y.x, z.x, t.x],
            row1: [x.y, y.y, z.y, t.y],
            row2: [x.z, y.z, z.z, t.z],
        }
    }
}

impl From<BoneMatrix3x4> for Affine3A {
    fn from(m: BoneMatrix3x4) -> Self {
        Affine3A {
            matrix3: Mat3A::from_cols(
                Vec3A::new(m.row0[0], m.row1[0], m.row2[0]),
                Vec3A::new(m.row0[1], m.row1[1], m.row2[1]),
                Vec3A::new(m.row0[2], m.row1[2], m.row2[2]),
            ),
            translation: Vec3A::new(m.row0[3], m.row1[3], m.row2[3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_identity() {
        let m = BoneMatrix3x4::IDENTITY;
        assert_eq!(m.row0, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(m.row1, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(m.row2, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(Affine3A::from(m), Affine3A::IDENTITY);
    }

    #[test]
    fn test_size_matches_pod_layout() {
        assert_eq!(std::mem::size_of::<BoneMatrix3x4>(), BoneMatrix3x4::SIZE);
    }

    #[test]
    fn test_from_array() {
        let arr = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let m = BoneMatrix3x4::from_array(arr);
        assert_eq!(m.row0, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.row1, [5.0, 6.0, 7.0, 8.0]);
        assert_eq!(m.row2, [9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_translation_lands_in_last_column() {
        let affine = Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let m = BoneMatrix3x4::from(affine);
        assert_eq!(m.row0[3], 1.0);
        assert_eq!(m.row1[3], 2.0);
        assert_eq!(m.row2[3], 3.0);
    }

    #[test]
    fn test_glam_conversion_preserves_transform() {
        let affine = Affine3A::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 0.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(-4.0, 0.25, 9.0),
        );
        let back = Affine3A::from(BoneMatrix3x4::from(affine));
        assert!(back.abs_diff_eq(affine, 1e-6));
    }

    #[test]
    fn test_bytes_short_input() {
        assert!(BoneMatrix3x4::from_bytes(&[0u8; 47]).is_none());
    }
}
