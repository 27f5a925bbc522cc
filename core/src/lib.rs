//! Tessera Core - skeletal animation, skinning and compute post-processing
//!
//! This crate turns bone hierarchies, per-vertex bone attachments and
//! keyframe animations into GPU-ready bone palettes, and drives the
//! iterative compute passes (edge detection, value spreading, antialiasing)
//! of the post-processing pipeline.
//!
//! # Architecture
//!
//! - [`skeleton`] - Bone hierarchy, vertex bone slots, poses and space conversion
//! - [`mesh`] - [`SkeletonMesh`] with CPU/GPU residency
//! - [`animation`] - Keyframe animations, loading and [`SkeletonActor`] playback
//! - [`skinning`] - [`SkinningUniforms`] packing for the skinning shader
//! - [`compute`] - [`RenderDevice`] abstraction, ping-pong textures and renderers
//! - [`config`] - [`EngineConfig`] persisted as TOML

pub mod animation;
pub mod compute;
pub mod config;
pub mod error;
pub mod mesh;
pub mod skeleton;
pub mod skinning;
pub mod transform;

// Re-export skeleton and animation types
pub use animation::{AnimationFormat, SkeletonActor, SkeletonAnimation, SkeletonAnimationFileInfo};
pub use mesh::{BoundingBox, MeshFormat, SkeletonMesh, SkeletonMeshFileInfo};
pub use skeleton::{
    Bone, BoneHierarchy, BonesPerVertex, MAX_BONES, SkeletonPose, VertexBoneWeights,
    to_parent_space, to_skeleton_space,
};
pub use skinning::{SkinningUniforms, skin_position};

// Re-export compute types
pub use compute::{CpuBackend, Kernel, PingPong, PipelineContext, RenderDevice, WgpuBackend};

pub use config::EngineConfig;
pub use error::{AnimationLoadError, ComputeError, ConfigError, MeshError, SkeletonError};
