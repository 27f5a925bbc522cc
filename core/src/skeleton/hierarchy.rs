//! Bone hierarchy of a skinned mesh.

use glam::Affine3A;

use crate::error::SkeletonError;
use crate::transform::scale_orientation_translation_inverse;

/// Maximum number of bones in one hierarchy (indices are `u8`, 0 is reserved).
pub const MAX_BONES: usize = 255;

/// A single bone.
///
/// `parent_index` is 1-based; 0 means the bone is a root.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent_index: u8,
    pub bind_pose: Affine3A,
    pub bind_pose_inverse: Affine3A,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent_index: 0,
            bind_pose: Affine3A::IDENTITY,
            bind_pose_inverse: Affine3A::IDENTITY,
        }
    }
}

impl Bone {
    pub fn is_root(&self) -> bool {
        self.parent_index == 0
    }
}

/// Ordered bone list with 1-based indexing.
///
/// Every bone's parent precedes it, so walking [`BoneHierarchy::bones`] in
/// order always visits a parent before its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneHierarchy {
    bones: Vec<Bone>,
    validate_names: bool,
}

impl BoneHierarchy {
    /// Create an empty hierarchy.
    ///
    /// With `validate_names` set, [`add_or_modify_bone`](Self::add_or_modify_bone)
    /// rejects a name already used by a bone at another index.
    pub fn new(validate_names: bool) -> Self {
        Self {
            bones: Vec::new(),
            validate_names,
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn validates_names(&self) -> bool {
        self.validate_names
    }

    /// Bones in index order; `bones()[i]` is bone `i + 1`.
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Insert or overwrite the bone at 1-based `index`.
    ///
    /// Gaps below `index` are filled with unnamed identity bones. When
    /// `bind_pose_inverse` is `None` it is derived from `bind_pose`.
    pub fn add_or_modify_bone(
        &mut self,
        index: u8,
        name: impl Into<String>,
        parent_index: u8,
        bind_pose: Affine3A,
        bind_pose_inverse: Option<Affine3A>,
    ) -> Result<(), SkeletonError> {
        if index == 0 {
            return Err(SkeletonError::InvalidArgument(
                "bone index 0 is reserved for \"no bone\"".into(),
            ));
        }
        if parent_index >= index {
            return Err(SkeletonError::InvalidArgument(format!(
                "bone {index} cannot have parent {parent_index}: parents must precede children"
            )));
        }

        let name = name.into();
        if self.validate_names
            && !name.is_empty()
            && let Some(existing) = self.find_bone_index(&name)
            && existing != index
        {
            return Err(SkeletonError::DuplicateName { name, existing });
        }

        let slot = index as usize - 1;
        if self.bones.len() <= slot {
            self.bones.resize_with(slot + 1, Bone::default);
        }

        let bind_pose_inverse =
            bind_pose_inverse.unwrap_or_else(|| scale_orientation_translation_inverse(&bind_pose));
        self.bones[slot] = Bone {
            name,
            parent_index,
            bind_pose,
            bind_pose_inverse,
        };

        tracing::trace!(index, parent_index, name = %self.bones[slot].name, "bone set");
        Ok(())
    }

    /// 1-based index of the bone called `name`.
    pub fn bone_index(&self, name: &str) -> Result<u8, SkeletonError> {
        self.find_bone_index(name)
            .ok_or_else(|| SkeletonError::NotFound(name.to_string()))
    }

    /// Non-failing variant of [`bone_index`](Self::bone_index).
    pub fn find_bone_index(&self, name: &str) -> Option<u8> {
        self.bones
            .iter()
            .position(|bone| bone.name == name)
            .map(|pos| (pos + 1) as u8)
    }

    pub fn bone(&self, index: u8) -> Result<&Bone, SkeletonError> {
        let len = self.bones.len();
        index
            .checked_sub(1)
            .and_then(|slot| self.bones.get(slot as usize))
            .ok_or(SkeletonError::OutOfRange {
                what: "bone",
                index: index as usize,
                len,
            })
    }

    pub fn bone_by_name(&self, name: &str) -> Result<&Bone, SkeletonError> {
        self.bone(self.bone_index(name)?)
    }

    pub fn parent_index(&self, index: u8) -> Result<u8, SkeletonError> {
        self.bone(index).map(|bone| bone.parent_index)
    }
}
