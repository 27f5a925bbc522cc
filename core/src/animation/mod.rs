//! Keyframe animations and the actors that play them.
//!
//! An animation is a list of [`SkeletonPose`](crate::skeleton::SkeletonPose)
//! keyframes sampled by normalized progress. Files are read in the engine's
//! keyframe layout (see [`tessera_shared::formats::keyframes`]).

mod actor;
mod clip;
mod file_info;
mod loader;

pub use actor::SkeletonActor;
pub use clip::SkeletonAnimation;
pub use file_info::{AnimationFormat, SkeletonAnimationFileInfo};

#[cfg(test)]
mod tests;
