//! Multi-pass drivers built on [`RenderDevice`](super::device::RenderDevice).

mod antialiasing;
mod edge_detection;
mod rescale;
mod utility;

pub use antialiasing::{AntialiasingRenderer, FxaaSettings};
pub use edge_detection::{
    DEFAULT_NORMAL_THRESHOLD, DEFAULT_POSITION_THRESHOLD, EdgeDetectionRenderer,
    MAX_EDGE_DISTANCE, NO_EDGE,
};
pub use rescale::TextureRescaleRenderer;
pub use utility::{UtilityRenderer, min_acceptable_value};

use super::device::RenderDevice;
use crate::error::ComputeError;

pub(crate) fn ensure_initialized<T>(value: Option<T>, what: &'static str) -> Result<T, ComputeError> {
    value.ok_or(ComputeError::NotInitialized(what))
}

/// Run `operation` against an empty binding table and unbind everything
/// afterwards, on success and on error alike.
pub(crate) fn with_clean_bindings<T>(
    device: &mut dyn RenderDevice,
    operation: impl FnOnce(&mut dyn RenderDevice) -> Result<T, ComputeError>,
) -> Result<T, ComputeError> {
    device.unbind_all();
    let result = operation(&mut *device);
    device.unbind_all();
    result
}
