//! Placed instance of a skeleton mesh with animation playback.

use std::sync::Arc;

use glam::Affine3A;

use super::clip::SkeletonAnimation;
use crate::error::SkeletonError;
use crate::mesh::SkeletonMesh;
use crate::skeleton::SkeletonPose;

/// Skeleton mesh placed in the world, with its current pose.
///
/// Meshes and animations are shared between actors; each actor only owns its
/// pose and playback state.
#[derive(Debug, Clone)]
pub struct SkeletonActor {
    mesh: Arc<SkeletonMesh>,
    world_pose: Affine3A,
    skeleton_pose: SkeletonPose,
    animation: Option<Arc<SkeletonAnimation>>,
    progress: f32,
    speed: f32,
}

impl SkeletonActor {
    /// New actor in the rest pose.
    pub fn new(mesh: Arc<SkeletonMesh>, world_pose: Affine3A) -> Self {
        let skeleton_pose = SkeletonPose::identity(mesh.bone_count());
        Self {
            mesh,
            world_pose,
            skeleton_pose,
            animation: None,
            progress: 0.0,
            speed: 1.0,
        }
    }

    pub fn mesh(&self) -> &Arc<SkeletonMesh> {
        &self.mesh
    }

    pub fn world_pose(&self) -> &Affine3A {
        &self.world_pose
    }

    pub fn set_world_pose(&mut self, world_pose: Affine3A) {
        self.world_pose = world_pose;
    }

    pub fn skeleton_pose(&self) -> &SkeletonPose {
        &self.skeleton_pose
    }

    /// Replace the current pose. It must cover every bone of the mesh.
    pub fn set_skeleton_pose(&mut self, pose: SkeletonPose) -> Result<(), SkeletonError> {
        if pose.len() != self.mesh.bone_count() {
            return Err(SkeletonError::DimensionMismatch {
                what: "actor pose length",
                expected: self.mesh.bone_count(),
                actual: pose.len(),
            });
        }
        self.skeleton_pose = pose;
        Ok(())
    }

    pub fn reset_skeleton_pose(&mut self) {
        self.skeleton_pose = SkeletonPose::identity(self.mesh.bone_count());
    }

    pub fn animation(&self) -> Option<&Arc<SkeletonAnimation>> {
        self.animation.as_ref()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn animation_speed(&self) -> f32 {
        self.speed
    }

    /// Playback speed in normalized progress per second.
    pub fn set_animation_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Play `animation` from its first keyframe.
    pub fn start_animation(&mut self, animation: Arc<SkeletonAnimation>) -> Result<(), SkeletonError> {
        let pose = animation.interpolated_pose(0.0)?;
        self.set_skeleton_pose(pose)?;
        self.animation = Some(animation);
        self.progress = 0.0;
        Ok(())
    }

    /// Advance playback by `dt` seconds, looping at the end of the animation.
    ///
    /// Does nothing when no animation is playing.
    pub fn update_animation(&mut self, dt: f32) -> Result<(), SkeletonError> {
        let Some(animation) = self.animation.clone() else {
            return Ok(());
        };
        let progress = (self.progress + dt * self.speed).rem_euclid(1.0);
        let pose = animation.interpolated_pose(progress)?;
        self.set_skeleton_pose(pose)?;
        self.progress = progress;
        tracing::trace!(progress, "animation advanced");
        Ok(())
    }

    /// Stop playback, keeping the current pose.
    pub fn stop_animation(&mut self) {
        self.animation = None;
        self.progress = 0.0;
    }
}
