//! GPU skinning uniforms
//!
//! Packs a mesh's bind pose and a skeleton-space pose into fixed-size bone
//! palettes for the skinning vertex shader. Palette slot `i` holds bone `i`;
//! slot 0 is the identity so that the "no bone" index reads a harmless matrix.
//!
//! The shader computes `Σ weight * pose[bone] * bind_pose_inverse[bone] * p`
//! over the vertex's occupied slots. [`skin_position`] is the same sum on the CPU.

use glam::{Affine3A, Mat4, Vec3};
use tessera_shared::BoneMatrix3x4;

use crate::error::SkeletonError;
use crate::mesh::SkeletonMesh;
use crate::skeleton::{BoneHierarchy, SkeletonPose};

/// Number of palette slots, including the identity slot 0.
pub const PALETTE_SIZE: usize = 256;

/// Uniform block consumed by the skinning vertex shader.
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SkinningUniforms {
    /// Column-major world matrix.
    pub world: [f32; 16],
    pub view: [f32; 16],
    pub projection: [f32; 16],
    pub bind_pose: [BoneMatrix3x4; PALETTE_SIZE],
    pub bind_pose_inverse: [BoneMatrix3x4; PALETTE_SIZE],
    /// Skeleton-space pose of every bone.
    pub pose: [BoneMatrix3x4; PALETTE_SIZE],
    pub bones_per_vertex: u32,
    pub _pad: [u32; 3],
}

impl SkinningUniforms {
    /// Pack the uniforms for drawing `mesh` in `pose_in_skeleton_space`.
    ///
    /// The pose must have one transform per bone of the mesh.
    pub fn pack(
        world: &Affine3A,
        view: &Mat4,
        projection: &Mat4,
        mesh: &SkeletonMesh,
        pose_in_skeleton_space: &SkeletonPose,
    ) -> Result<Self, SkeletonError> {
        let bones = mesh.bones();
        if pose_in_skeleton_space.len() != bones.len() {
            return Err(SkeletonError::DimensionMismatch {
                what: "skinning pose length vs bone count",
                expected: bones.len(),
                actual: pose_in_skeleton_space.len(),
            });
        }

        let mut uniforms = Self {
            world: Mat4::from(*world).to_cols_array(),
            view: view.to_cols_array(),
            projection: projection.to_cols_array(),
            bind_pose: [BoneMatrix3x4::IDENTITY; PALETTE_SIZE],
            bind_pose_inverse: [BoneMatrix3x4::IDENTITY; PALETTE_SIZE],
            pose: [BoneMatrix3x4::IDENTITY; PALETTE_SIZE],
            bones_per_vertex: mesh.bones_per_vertex().count() as u32,
            _pad: [0; 3],
        };
        // Hierarchies hold at most 255 bones, so slot `i + 1` always fits.
        for (i, (bone, pose)) in bones.iter().zip(pose_in_skeleton_space.iter()).enumerate() {
            uniforms.bind_pose[i + 1] = bone.bind_pose.into();
            uniforms.bind_pose_inverse[i + 1] = bone.bind_pose_inverse.into();
            uniforms.pose[i + 1] = (*pose).into();
        }
        Ok(uniforms)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Skin one vertex position on the CPU.
///
/// `bones` and `weights` are the vertex's slots (see
/// [`VertexBoneWeights::vertex_attachments`](crate::skeleton::VertexBoneWeights::vertex_attachments));
/// empty slots (bone 0) are skipped. A vertex with no attachments is returned
/// unchanged.
pub fn skin_position(
    position: Vec3,
    bones: &[u8],
    weights: &[f32],
    hierarchy: &BoneHierarchy,
    pose_in_skeleton_space: &SkeletonPose,
) -> Result<Vec3, SkeletonError> {
    let mut skinned = Vec3::ZERO;
    let mut attached = false;
    for (&bone, &weight) in bones.iter().zip(weights) {
        if bone == 0 {
            continue;
        }
        let inverse = hierarchy.bone(bone)?.bind_pose_inverse;
        let pose = pose_in_skeleton_space.bone_pose(bone)?;
        skinned += weight * (*pose * inverse).transform_point3(position);
        attached = true;
    }
    Ok(if attached { skinned } else { position })
}
