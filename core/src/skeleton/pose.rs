//! Skeleton pose: one transform per bone.

use glam::Affine3A;

use crate::error::SkeletonError;
use crate::transform;

/// Per-bone transforms at one moment in time.
///
/// `transforms()[i]` belongs to bone `i + 1`. Whether the transforms are
/// parent-relative or skeleton-relative is tracked by the caller; see
/// [`to_skeleton_space`](super::to_skeleton_space) and
/// [`to_parent_space`](super::to_parent_space).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonPose {
    transforms: Vec<Affine3A>,
}

impl SkeletonPose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity pose for `bone_count` bones.
    pub fn identity(bone_count: usize) -> Self {
        Self {
            transforms: vec![Affine3A::IDENTITY; bone_count],
        }
    }

    pub fn from_transforms(transforms: Vec<Affine3A>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[Affine3A] {
        &self.transforms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Affine3A> {
        self.transforms.iter()
    }

    /// Transform of 1-based `bone`.
    pub fn bone_pose(&self, bone: u8) -> Result<&Affine3A, SkeletonError> {
        let len = self.transforms.len();
        bone.checked_sub(1)
            .and_then(|slot| self.transforms.get(slot as usize))
            .ok_or(SkeletonError::OutOfRange {
                what: "pose bone",
                index: bone as usize,
                len,
            })
    }

    /// Mutable transform of 1-based `bone`, growing the pose with identity
    /// transforms as needed.
    pub fn bone_pose_mut(&mut self, bone: u8) -> Result<&mut Affine3A, SkeletonError> {
        if bone == 0 {
            return Err(SkeletonError::InvalidArgument(
                "bone index 0 is reserved for \"no bone\"".into(),
            ));
        }
        let slot = bone as usize - 1;
        if self.transforms.len() <= slot {
            self.transforms.resize(slot + 1, Affine3A::IDENTITY);
        }
        Ok(&mut self.transforms[slot])
    }

    pub fn set_bone_pose(&mut self, bone: u8, transform: Affine3A) -> Result<(), SkeletonError> {
        *self.bone_pose_mut(bone)? = transform;
        Ok(())
    }

    /// Per-bone blend of two poses of equal length.
    pub fn blend(a: &Self, b: &Self, t: f32) -> Result<Self, SkeletonError> {
        if a.len() != b.len() {
            return Err(SkeletonError::DimensionMismatch {
                what: "pose length",
                expected: a.len(),
                actual: b.len(),
            });
        }
        Ok(Self {
            transforms: a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| transform::blend(x, y, t))
                .collect(),
        })
    }
}

impl From<Vec<Affine3A>> for SkeletonPose {
    fn from(transforms: Vec<Affine3A>) -> Self {
        Self::from_transforms(transforms)
    }
}
