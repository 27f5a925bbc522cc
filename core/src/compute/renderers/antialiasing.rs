//! Luminance pre-pass and FXAA.

use serde::{Deserialize, Serialize};

use super::with_clean_bindings;
use crate::compute::binding::TextureBinding;
use crate::compute::context::PipelineContext;
use crate::compute::device::RenderDevice;
use crate::compute::grid::dispatch_grid;
use crate::compute::handles::TextureHandle;
use crate::compute::kernel::Kernel;
use crate::compute::params::KernelParams;
use crate::error::ComputeError;

/// FXAA tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxaaSettings {
    /// Amount of sub-pixel aliasing removal (0 = off, 1 = softest).
    pub quality_subpix: f32,
    /// Minimum local contrast required to apply the filter.
    pub edge_threshold: f32,
    /// Skips processing of dark areas below this contrast.
    pub edge_threshold_min: f32,
}

impl Default for FxaaSettings {
    fn default() -> Self {
        Self {
            quality_subpix: 0.75,
            edge_threshold: 0.166,
            edge_threshold_min: 0.0833,
        }
    }
}

#[derive(Debug, Default)]
pub struct AntialiasingRenderer {
    settings: FxaaSettings,
    initialized: bool,
}

impl AntialiasingRenderer {
    pub fn new(settings: FxaaSettings) -> Self {
        Self {
            settings,
            initialized: false,
        }
    }

    pub fn settings(&self) -> FxaaSettings {
        self.settings
    }

    pub fn initialize(
        &mut self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
    ) -> Result<(), ComputeError> {
        ctx.prepare(device, Kernel::Luminance)?;
        ctx.prepare(device, Kernel::Antialiasing)?;
        self.initialized = true;
        Ok(())
    }

    /// Store the luminance of each texel's color in its alpha channel.
    pub fn calculate_luminance(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        texture: TextureHandle,
    ) -> Result<(), ComputeError> {
        self.check()?;
        with_clean_bindings(device, |device| {
            device.bind_output(0, texture.into())?;
            let (w, h) = device.texture_size(texture, 0)?;
            ctx.dispatch(device, Kernel::Luminance, dispatch_grid(w, h, 16))
        })
    }

    /// Filter `source` into `destination`. The source must carry luminance in
    /// alpha, see [`Self::calculate_luminance`].
    pub fn perform_antialiasing(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        source: TextureHandle,
        destination: TextureHandle,
    ) -> Result<(), ComputeError> {
        self.check()?;
        let (sw, sh) = device.texture_size(source, 0)?;
        let (dw, dh) = device.texture_size(destination, 0)?;
        if (sw, sh) != (dw, dh) {
            return Err(ComputeError::DimensionMismatch {
                what: "antialiasing target",
                expected: (sw, sh),
                actual: (dw, dh),
            });
        }

        let params = KernelParams::Antialiasing {
            pixel_size: glam::Vec2::new(1.0 / sw as f32, 1.0 / sh as f32),
            quality_subpix: self.settings.quality_subpix,
            edge_threshold: self.settings.edge_threshold,
            edge_threshold_min: self.settings.edge_threshold_min,
        };
        with_clean_bindings(device, |device| {
            device.bind_input(0, TextureBinding::from(source))?;
            device.bind_output(0, TextureBinding::from(destination))?;
            device.bind_params(params)?;
            ctx.dispatch(device, Kernel::Antialiasing, dispatch_grid(dw, dh, 16))
        })
    }

    fn check(&self) -> Result<(), ComputeError> {
        self.initialized
            .then_some(())
            .ok_or(ComputeError::NotInitialized("antialiasing renderer"))
    }
}
