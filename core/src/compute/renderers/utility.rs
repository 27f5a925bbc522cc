//! Value-image utilities: replace, spread, merge, blur, sum.

use glam::Vec3;

use super::with_clean_bindings;
use crate::compute::binding::TextureBinding;
use crate::compute::context::PipelineContext;
use crate::compute::device::RenderDevice;
use crate::compute::grid::{dispatch_grid, sparse_dispatch_grid};
use crate::compute::handles::TextureHandle;
use crate::compute::kernel::Kernel;
use crate::compute::params::KernelParams;
use crate::compute::ping_pong::PingPong;
use crate::error::ComputeError;

const KERNELS: [Kernel; 10] = [
    Kernel::ReplaceValue,
    Kernel::SpreadMaxValue,
    Kernel::SpreadMinValue,
    Kernel::SpreadSparseMinValue,
    Kernel::MergeMinValue,
    Kernel::ConvertDistanceToWorldSpace,
    Kernel::BlurValue,
    Kernel::MergeMipmapsValue,
    Kernel::SumTwoValues,
    Kernel::SumThreeValues,
];

/// Soft lower bound on accepted values for spread pass `pass` (0-based).
///
/// Grows logarithmically so later passes tolerate smaller differences.
pub fn min_acceptable_value(pass: u32) -> f32 {
    (pass as f32 + 1.0).ln() * 0.01
}

/// Single- and multi-pass operations on value textures.
///
/// Every operation releases all bindings when it returns.
#[derive(Debug, Default)]
pub struct UtilityRenderer {
    initialized: bool,
}

impl UtilityRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(
        &mut self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
    ) -> Result<(), ComputeError> {
        for kernel in KERNELS {
            ctx.prepare(device, kernel)?;
        }
        self.initialized = true;
        tracing::debug!("utility renderer initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Replace every `from` value of `texture` at `mip` with `to`, in place.
    pub fn replace_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        texture: TextureHandle,
        mip: u32,
        from: f32,
        to: f32,
    ) -> Result<(), ComputeError> {
        self.check()?;
        with_clean_bindings(device, |device| {
            device.bind_output(0, TextureBinding::new(texture, mip))?;
            device.bind_params(KernelParams::ReplaceValue { from, to })?;
            let (w, h) = device.texture_size(texture, mip)?;
            ctx.dispatch(device, Kernel::ReplaceValue, dispatch_grid(w, h, 8))
        })
    }

    /// Spread the maximum of each 3x3 neighbourhood for `repeat_count` passes.
    ///
    /// Reads and writes through `values`; the result is its destination.
    pub fn spread_max_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        values: &mut PingPong,
        mip: u32,
        repeat_count: u32,
        ignore_below: f32,
    ) -> Result<(), ComputeError> {
        self.check()?;
        let (w, h) = device.texture_size(values.destination(), mip)?;
        let groups = dispatch_grid(w, h, 8);

        tracing::debug!(repeat_count, "spread max started");
        with_clean_bindings(device, |device| {
            for _ in 0..repeat_count {
                bind_pass(device, values, mip)?;
                device.bind_params(KernelParams::Spread {
                    ignore_below,
                    min_acceptable: 0.0,
                    total_spread: 0,
                    spread_distance: 0,
                    offset: 0,
                })?;
                ctx.dispatch(device, Kernel::SpreadMaxValue, groups)?;
                values.swap();
            }
            Ok(())
        })
    }

    /// Spread neighbourhood minimums for `repeat_count` passes.
    ///
    /// With `spread_distance > 0` each pass samples neighbours that many pixels
    /// away and the grid shrinks accordingly. The accumulated spread distance
    /// (starting from `total_previous_spread`) is forwarded to every pass.
    #[allow(clippy::too_many_arguments)]
    pub fn spread_min_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        values: &mut PingPong,
        mip: u32,
        repeat_count: u32,
        ignore_below: f32,
        total_previous_spread: u32,
        spread_distance: u32,
        offset: u32,
    ) -> Result<(), ComputeError> {
        self.check()?;
        let (w, h) = device.texture_size(values.destination(), mip)?;
        let groups = sparse_dispatch_grid(w, h, spread_distance, 8);
        let kernel = if spread_distance > 0 {
            Kernel::SpreadSparseMinValue
        } else {
            Kernel::SpreadMinValue
        };

        values.reset(total_previous_spread);
        tracing::debug!(repeat_count, spread_distance, kernel = kernel.label(), "spread min started");
        with_clean_bindings(device, |device| {
            for pass in 0..repeat_count {
                bind_pass(device, values, mip)?;
                device.bind_params(KernelParams::Spread {
                    ignore_below,
                    min_acceptable: min_acceptable_value(pass),
                    total_spread: values.accumulated().saturating_add(spread_distance),
                    spread_distance,
                    offset,
                })?;
                ctx.dispatch(device, kernel, groups)?;
                values.swap();
                values.accumulate(spread_distance);
            }
            Ok(())
        })
    }

    /// `texture = min(texture, other)` at `mip`.
    pub fn merge_min_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        texture: TextureHandle,
        other: TextureHandle,
        mip: u32,
    ) -> Result<(), ComputeError> {
        self.check()?;
        with_clean_bindings(device, |device| {
            device.bind_input(0, TextureBinding::new(other, mip))?;
            device.bind_output(0, TextureBinding::new(texture, mip))?;
            let (w, h) = device.texture_size(texture, mip)?;
            ctx.dispatch(device, Kernel::MergeMinValue, dispatch_grid(w, h, 8))
        })
    }

    /// Turn screen-space distances in `texture` into world-space distances
    /// using the per-pixel `positions` and the camera position.
    pub fn convert_distance_to_world_space(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        texture: TextureHandle,
        mip: u32,
        camera_position: Vec3,
        positions: TextureHandle,
    ) -> Result<(), ComputeError> {
        self.check()?;
        with_clean_bindings(device, |device| {
            device.bind_input(0, positions.into())?;
            device.bind_output(0, TextureBinding::new(texture, mip))?;
            device.bind_params(KernelParams::ConvertDistance { camera_position })?;
            let (w, h) = device.texture_size(texture, mip)?;
            ctx.dispatch(
                device,
                Kernel::ConvertDistanceToWorldSpace,
                dispatch_grid(w, h, 8),
            )
        })
    }

    pub fn blur_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        output: TextureHandle,
        output_mip: u32,
        input: TextureHandle,
        input_mip: u32,
    ) -> Result<(), ComputeError> {
        self.check()?;
        with_clean_bindings(device, |device| {
            device.bind_input(0, TextureBinding::new(input, input_mip))?;
            device.bind_output(0, TextureBinding::new(output, output_mip))?;
            let (w, h) = device.texture_size(output, output_mip)?;
            ctx.dispatch(device, Kernel::BlurValue, dispatch_grid(w, h, 8))
        })
    }

    /// Combine `base` with mips `first_mip..=last_mip` of `mipmapped` into
    /// mip 0 of `destination`.
    pub fn merge_mipmaps_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        destination: TextureHandle,
        base: TextureHandle,
        mipmapped: TextureHandle,
        first_mip: u32,
        last_mip: u32,
    ) -> Result<(), ComputeError> {
        self.check()?;
        if first_mip > last_mip {
            return Err(ComputeError::InvalidArgument(format!(
                "mip range {first_mip}..={last_mip} is empty"
            )));
        }
        // Fails for a mip the texture does not have.
        device.texture_size(mipmapped, last_mip)?;

        with_clean_bindings(device, |device| {
            device.bind_input(0, base.into())?;
            device.bind_input(1, mipmapped.into())?;
            device.bind_output(0, destination.into())?;
            device.bind_params(KernelParams::MergeMipmaps {
                first_mip,
                last_mip,
            })?;
            let (w, h) = device.texture_size(destination, 0)?;
            ctx.dispatch(device, Kernel::MergeMipmapsValue, dispatch_grid(w, h, 8))
        })
    }

    /// `output = a + b (+ c)`, saturating in 8-bit outputs.
    pub fn sum_values(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        output: TextureHandle,
        a: TextureHandle,
        b: TextureHandle,
        c: Option<TextureHandle>,
    ) -> Result<(), ComputeError> {
        self.check()?;
        with_clean_bindings(device, |device| {
            device.bind_input(0, a.into())?;
            device.bind_input(1, b.into())?;
            let kernel = match c {
                Some(c) => {
                    device.bind_input(2, c.into())?;
                    Kernel::SumThreeValues
                }
                None => Kernel::SumTwoValues,
            };
            device.bind_output(0, output.into())?;
            let (w, h) = device.texture_size(output, 0)?;
            ctx.dispatch(device, kernel, dispatch_grid(w, h, 16))
        })
    }

    fn check(&self) -> Result<(), ComputeError> {
        if self.initialized {
            Ok(())
        } else {
            Err(ComputeError::NotInitialized("utility renderer"))
        }
    }
}

/// Unbind and bind the pair for the next pass: the current source is
/// written, the current destination is read. Callers swap roles only after
/// the pass is dispatched, so a failed pass leaves the pair untouched.
fn bind_pass(
    device: &mut dyn RenderDevice,
    values: &PingPong,
    mip: u32,
) -> Result<(), ComputeError> {
    device.unbind_all();
    device.bind_output(0, TextureBinding::new(values.source(), mip))?;
    device.bind_input(0, TextureBinding::new(values.destination(), mip))
}
