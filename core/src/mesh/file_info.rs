use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Source format of a skeleton mesh file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    Obj,
    #[default]
    Dae,
    Fbx,
    /// Engine-native binary layout.
    Native,
}

/// Where a mesh came from and how it was imported.
///
/// Kept with the mesh so it can be reloaded with the same settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonMeshFileInfo {
    pub path: PathBuf,
    pub format: MeshFormat,
    /// Index of the mesh among the meshes of a multi-mesh file.
    pub index_in_file: u32,
    pub invert_z: bool,
    pub invert_winding: bool,
    pub flip_uvs: bool,
}

impl SkeletonMeshFileInfo {
    pub fn new(path: impl Into<PathBuf>, format: MeshFormat) -> Self {
        Self {
            path: path.into(),
            format,
            ..Default::default()
        }
    }
}
