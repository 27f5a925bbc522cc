//! Edge detection and distance-to-edge propagation.

use super::{ensure_initialized, with_clean_bindings};
use crate::compute::context::PipelineContext;
use crate::compute::device::{RenderDevice, TextureDesc, TextureFormat};
use crate::compute::grid::dispatch_grid;
use crate::compute::handles::TextureHandle;
use crate::compute::kernel::Kernel;
use crate::compute::params::KernelParams;
use crate::compute::ping_pong::PingPong;
use crate::error::ComputeError;

/// Value marking "no edge within range".
pub const NO_EDGE: f32 = 255.0;

/// Number of flood-fill passes needed to cover every representable distance.
pub const MAX_EDGE_DISTANCE: u32 = 255;

/// Default world-space jump between neighbouring positions that marks an edge.
pub const DEFAULT_POSITION_THRESHOLD: f32 = 0.5;

/// Default normal dot product below which neighbouring pixels form an edge.
pub const DEFAULT_NORMAL_THRESHOLD: f32 = 0.7;

/// Produces an 8-bit distance-to-nearest-edge image.
///
/// Edge pixels hold 0, pixels within 254 pixels (Chebyshev distance) hold their
/// distance and everything further stays at [`NO_EDGE`].
#[derive(Debug)]
pub struct EdgeDetectionRenderer {
    values: Option<PingPong>,
    width: u32,
    height: u32,
    passes: u32,
    position_threshold: f32,
    normal_threshold: f32,
}

impl Default for EdgeDetectionRenderer {
    fn default() -> Self {
        Self {
            values: None,
            width: 0,
            height: 0,
            passes: MAX_EDGE_DISTANCE,
            position_threshold: DEFAULT_POSITION_THRESHOLD,
            normal_threshold: DEFAULT_NORMAL_THRESHOLD,
        }
    }
}

impl EdgeDetectionRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `passes` flood-fill passes instead of 255 (clamped to 1..=255).
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes.clamp(1, MAX_EDGE_DISTANCE);
        self
    }

    pub fn with_thresholds(mut self, position_threshold: f32, normal_threshold: f32) -> Self {
        self.position_threshold = position_threshold;
        self.normal_threshold = normal_threshold;
        self
    }

    /// Create the value texture pair and prepare both kernels.
    pub fn initialize(
        &mut self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        width: u32,
        height: u32,
    ) -> Result<(), ComputeError> {
        if let Some(previous) = self.values.take() {
            for texture in previous.textures() {
                device.destroy_texture(texture)?;
            }
        }

        let desc = |label: &str| TextureDesc::new(label, width, height, TextureFormat::R8Uint);
        let first = device.create_texture(&desc("edge value 0"))?;
        let second = device.create_texture(&desc("edge value 1"))?;
        let values = PingPong::new(&*device, second, first)?;

        ctx.prepare(device, Kernel::EdgeDetection)?;
        ctx.prepare(device, Kernel::EdgeDistance)?;

        self.values = Some(values);
        self.width = width;
        self.height = height;
        tracing::debug!(width, height, passes = self.passes, "edge detection renderer initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.values.is_some()
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Mark edges from the position/normal buffers, then propagate distances.
    pub fn perform_edge_detection(
        &mut self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        positions: TextureHandle,
        normals: TextureHandle,
    ) -> Result<(), ComputeError> {
        let values = ensure_initialized(self.values.as_ref(), "edge detection renderer")?;

        device.clear_texture(values.source(), [NO_EDGE, 0.0, 0.0, 0.0])?;
        device.clear_texture(values.destination(), [NO_EDGE, 0.0, 0.0, 0.0])?;

        let params = KernelParams::EdgeDetection {
            position_threshold: self.position_threshold,
            normal_threshold: self.normal_threshold,
        };
        let groups = dispatch_grid(self.width, self.height, Kernel::EdgeDetection.tile_size());
        with_clean_bindings(device, |device| {
            device.bind_input(0, positions.into())?;
            device.bind_input(1, normals.into())?;
            device.bind_output(0, values.destination().into())?;
            device.bind_params(params)?;
            ctx.dispatch(device, Kernel::EdgeDetection, groups)
        })?;

        self.propagate_edge_distance(ctx, device)
    }

    /// Run the distance flood fill on the current destination texture.
    ///
    /// Pass `i` reads generation `i - 1` and writes `i` into every
    /// [`NO_EDGE`] pixel with a neighbour holding `i - 1`.
    pub fn propagate_edge_distance(
        &mut self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
    ) -> Result<(), ComputeError> {
        let passes = self.passes;
        let groups = dispatch_grid(self.width, self.height, Kernel::EdgeDistance.tile_size());
        let values = ensure_initialized(self.values.as_mut(), "edge detection renderer")?;
        values.reset(0);

        tracing::debug!(passes, "edge distance propagation started");
        with_clean_bindings(device, |device| {
            for pass in 1..=passes {
                // The current source is this pass's output; roles swap once
                // the pass has been dispatched.
                device.unbind_all();
                device.bind_output(0, values.source().into())?;
                device.bind_input(0, values.destination().into())?;
                device.bind_params(KernelParams::EdgeDistance { pass })?;
                ctx.dispatch(device, Kernel::EdgeDistance, groups)?;
                values.swap();
            }
            Ok(())
        })?;
        tracing::debug!(passes = values.passes(), "edge distance propagation finished");
        Ok(())
    }

    /// Texture holding the latest result.
    pub fn value_texture(&self) -> Result<TextureHandle, ComputeError> {
        ensure_initialized(self.values.as_ref(), "edge detection renderer")
            .map(|values| values.destination())
    }
}
