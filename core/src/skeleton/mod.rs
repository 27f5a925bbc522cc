//! Skeleton data: bone hierarchy, per-vertex bone slots, poses and the
//! conversions between parent space and skeleton space.
//!
//! Bone indices are 1-based everywhere; index 0 means "no bone", both as a
//! parent index and as an empty vertex slot.

mod binding;
mod hierarchy;
mod pose;
mod space;

pub use binding::{BonesPerVertex, VertexBoneWeights};
pub use hierarchy::{Bone, BoneHierarchy, MAX_BONES};
pub use pose::SkeletonPose;
pub use space::{to_parent_space, to_skeleton_space};
