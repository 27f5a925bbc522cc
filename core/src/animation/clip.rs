//! Keyframe sequence with normalized-time sampling.

use crate::error::SkeletonError;
use crate::skeleton::{BoneHierarchy, SkeletonPose, to_parent_space, to_skeleton_space};

use super::file_info::SkeletonAnimationFileInfo;

/// Ordered keyframe poses, all in the same space.
///
/// Like [`SkeletonPose`], the animation does not record which space its
/// keyframes are in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonAnimation {
    keyframes: Vec<SkeletonPose>,
    file_info: SkeletonAnimationFileInfo,
}

impl SkeletonAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keyframes(keyframes: Vec<SkeletonPose>) -> Self {
        Self {
            keyframes,
            file_info: SkeletonAnimationFileInfo::default(),
        }
    }

    pub fn file_info(&self) -> &SkeletonAnimationFileInfo {
        &self.file_info
    }

    pub fn set_file_info(&mut self, file_info: SkeletonAnimationFileInfo) {
        self.file_info = file_info;
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    pub fn keyframes(&self) -> &[SkeletonPose] {
        &self.keyframes
    }

    pub fn keyframe(&self, index: usize) -> Result<&SkeletonPose, SkeletonError> {
        self.keyframes.get(index).ok_or(SkeletonError::OutOfRange {
            what: "keyframe",
            index,
            len: self.keyframes.len(),
        })
    }

    pub fn add_pose(&mut self, pose: SkeletonPose) {
        self.keyframes.push(pose);
    }

    /// Keyframe `index`, appending empty poses until it exists.
    pub fn get_or_add_pose(&mut self, index: usize) -> &mut SkeletonPose {
        if self.keyframes.len() <= index {
            self.keyframes.resize_with(index + 1, SkeletonPose::default);
        }
        &mut self.keyframes[index]
    }

    /// Pose at normalized time `progress` (clamped to `[0, 1]`).
    ///
    /// Progress maps linearly onto the keyframes: 0 is the first, 1 the last.
    /// Exact keyframe positions return that keyframe unchanged; anything in
    /// between blends its two neighbours.
    pub fn interpolated_pose(&self, progress: f32) -> Result<SkeletonPose, SkeletonError> {
        let count = self.keyframes.len();
        if count == 0 {
            return Err(SkeletonError::InvalidState("animation has no keyframes"));
        }
        if progress.is_nan() {
            return Err(SkeletonError::InvalidArgument(
                "animation progress is NaN".into(),
            ));
        }

        let frame = progress.clamp(0.0, 1.0) * (count - 1) as f32;
        let prev = (frame.floor() as usize).min(count - 1);
        let next = (prev + 1).min(count - 1);
        let fraction = frame - prev as f32;

        if prev == next || fraction <= 0.0 {
            Ok(self.keyframes[prev].clone())
        } else {
            SkeletonPose::blend(&self.keyframes[prev], &self.keyframes[next], fraction)
        }
    }

    /// Copy of this parent-space animation with every keyframe in skeleton space.
    pub fn to_skeleton_space(&self, hierarchy: &BoneHierarchy) -> Result<Self, SkeletonError> {
        self.map_keyframes(|pose| to_skeleton_space(pose, hierarchy))
    }

    /// Copy of this skeleton-space animation with every keyframe in parent space.
    pub fn to_parent_space(&self, hierarchy: &BoneHierarchy) -> Result<Self, SkeletonError> {
        self.map_keyframes(|pose| to_parent_space(pose, hierarchy))
    }

    fn map_keyframes(
        &self,
        convert: impl Fn(&SkeletonPose) -> Result<SkeletonPose, SkeletonError>,
    ) -> Result<Self, SkeletonError> {
        Ok(Self {
            keyframes: self
                .keyframes
                .iter()
                .map(convert)
                .collect::<Result<_, _>>()?,
            file_info: self.file_info.clone(),
        })
    }
}
