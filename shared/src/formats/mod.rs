//! Tessera binary asset formats
//!
//! POD formats for GPU-ready assets. No magic bytes - the format is
//! determined by context (which loader is called).

pub mod keyframes;

pub use keyframes::*;

/// File extension for keyframe animation files
pub const KEYFRAMES_EXT: &str = "tskanim";
