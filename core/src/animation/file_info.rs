use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mesh::SkeletonMeshFileInfo;

/// Animation file formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationFormat {
    /// Engine-native keyframe layout (`.tskanim`).
    #[default]
    Keyframes,
}

/// Source of an animation and the mesh it was authored against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonAnimationFileInfo {
    pub path: PathBuf,
    pub format: AnimationFormat,
    pub mesh_file_info: SkeletonMeshFileInfo,
    /// Mirror every keyframe across the XY plane while loading.
    pub invert_z: bool,
}

impl SkeletonAnimationFileInfo {
    pub fn new(path: impl Into<PathBuf>, format: AnimationFormat) -> Self {
        Self {
            path: path.into(),
            format,
            ..Default::default()
        }
    }

    pub fn with_invert_z(mut self, invert_z: bool) -> Self {
        self.invert_z = invert_z;
        self
    }
}
