//! Reading and writing animation files.

use std::path::Path;

use glam::Affine3A;
use tessera_shared::{BoneMatrix3x4, decode_keyframes, encode_keyframes};

use super::clip::SkeletonAnimation;
use super::file_info::{AnimationFormat, SkeletonAnimationFileInfo};
use crate::error::{AnimationLoadError, SkeletonError};
use crate::mesh::SkeletonMesh;
use crate::transform::invert_z;

impl SkeletonAnimation {
    /// Load the animation described by `file_info` for `mesh`.
    pub fn load(
        file_info: &SkeletonAnimationFileInfo,
        mesh: &SkeletonMesh,
    ) -> Result<Self, AnimationLoadError> {
        let bytes = std::fs::read(&file_info.path)?;
        let mut animation =
            Self::from_bytes(&bytes, file_info.format, mesh, file_info.invert_z)?;

        animation.set_file_info(SkeletonAnimationFileInfo {
            path: file_info.path.clone(),
            format: file_info.format,
            mesh_file_info: mesh.file_info().clone(),
            invert_z: file_info.invert_z,
        });
        tracing::debug!(
            path = %file_info.path.display(),
            keyframes = animation.keyframe_count(),
            "animation loaded"
        );
        Ok(animation)
    }

    /// Decode an animation for `mesh` from memory.
    ///
    /// The file's bone count must equal the mesh's.
    pub fn from_bytes(
        bytes: &[u8],
        format: AnimationFormat,
        mesh: &SkeletonMesh,
        invert_z_coordinate: bool,
    ) -> Result<Self, AnimationLoadError> {
        match format {
            AnimationFormat::Keyframes => {}
        }

        let data = decode_keyframes(bytes)?;
        if data.bone_count as usize != mesh.bone_count() {
            return Err(SkeletonError::DimensionMismatch {
                what: "animation bone count vs mesh bone count",
                expected: mesh.bone_count(),
                actual: data.bone_count as usize,
            }
            .into());
        }

        let mut animation = Self::new();
        for (keyframe, frame) in data.frames.iter().enumerate() {
            let pose = animation.get_or_add_pose(keyframe);
            for (slot, &matrix) in frame.iter().enumerate() {
                let transform = Affine3A::from(matrix);
                let transform = if invert_z_coordinate {
                    invert_z(&transform)
                } else {
                    transform
                };
                // Slot n holds bone n + 1; bone counts are capped at 255.
                pose.set_bone_pose(slot as u8 + 1, transform)?;
            }
        }
        Ok(animation)
    }

    /// Encode in the keyframe layout. Every keyframe must cover the same bones.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AnimationLoadError> {
        let bone_count = self.keyframes().first().map_or(0, |pose| pose.len());
        let frames: Vec<Vec<BoneMatrix3x4>> = self
            .keyframes()
            .iter()
            .map(|pose| pose.iter().map(|&m| BoneMatrix3x4::from(m)).collect())
            .collect();
        Ok(encode_keyframes(bone_count, &frames)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AnimationLoadError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
