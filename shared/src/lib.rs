//! Shared types for the tessera engine.
//!
//! This crate provides POD types shared between:
//! - `tessera-core` (runtime)
//! - `tessera-cli` (tools)
//!
//! # Modules
//!
//! - [`math`] - POD bone matrices with `glam` conversions
//! - [`formats`] - Binary asset formats (keyframe animations)

pub mod formats;
pub mod math;

pub use formats::{
    KEYFRAMES_EXT, KeyframeData, KeyframeFileError, KeyframesHeader, decode_keyframes,
    encode_keyframes,
};
pub use math::BoneMatrix3x4;
