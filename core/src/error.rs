//! Error types for skeleton, animation and compute operations.
//!
//! Every variant is a contract violation of the calling code rather than an
//! expected runtime condition: operations fail fast and leave their inputs
//! untouched.

use tessera_shared::KeyframeFileError;

/// Errors raised by bone hierarchy, vertex binding, pose and animation operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkeletonError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("no bone named \"{0}\"")]
    NotFound(String),

    #[error("another bone (index {existing}) is already named \"{name}\"")]
    DuplicateName { name: String, existing: u8 },

    #[error(
        "vertex {vertex} has all {capacity} bone slots taken by weights >= {weight}"
    )]
    CapacityExceeded {
        vertex: usize,
        capacity: usize,
        weight: f32,
    },

    #[error("{what}: expected {expected}, found {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// Errors raised by the device abstraction and the compute pipeline drivers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    #[error("stale or unknown {kind} handle (index {index}, generation {generation})")]
    StaleHandle {
        kind: &'static str,
        index: u32,
        generation: u32,
    },

    #[error("texture {index} would be bound as both input and output")]
    AliasedBinding { index: u32 },

    #[error("kernel {kernel} requires {what} slot {slot} to be bound")]
    UnboundSlot {
        kernel: &'static str,
        what: &'static str,
        slot: u32,
    },

    #[error("kernel {0} is not supported by this backend")]
    UnsupportedKernel(&'static str),

    #[error("{what}: expected {expected:?}, found {actual:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("{0} has not been initialized")]
    NotInitialized(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors raised while loading or saving an animation file.
#[derive(Debug, thiserror::Error)]
pub enum AnimationLoadError {
    #[error("failed to read animation file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed keyframe data: {0}")]
    Format(#[from] KeyframeFileError),

    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
}

/// Errors raised while moving mesh data between memory tiers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),

    #[error("mesh upload failed: {0}")]
    Compute(#[from] ComputeError),
}

/// Errors raised while loading or saving the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
