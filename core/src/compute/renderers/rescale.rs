use super::with_clean_bindings;
use crate::compute::binding::TextureBinding;
use crate::compute::context::PipelineContext;
use crate::compute::device::RenderDevice;
use crate::compute::grid::dispatch_grid;
use crate::compute::handles::TextureHandle;
use crate::compute::kernel::Kernel;
use crate::error::ComputeError;

/// Bilinear copy of one mip level into another texture of any size.
#[derive(Debug, Default)]
pub struct TextureRescaleRenderer {
    initialized: bool,
}

impl TextureRescaleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(
        &mut self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
    ) -> Result<(), ComputeError> {
        ctx.prepare(device, Kernel::TextureRescale)?;
        self.initialized = true;
        Ok(())
    }

    pub fn rescale_texture(
        &self,
        ctx: &mut PipelineContext,
        device: &mut dyn RenderDevice,
        source: TextureHandle,
        source_mip: u32,
        destination: TextureHandle,
        destination_mip: u32,
    ) -> Result<(), ComputeError> {
        if !self.initialized {
            return Err(ComputeError::NotInitialized("texture rescale renderer"));
        }
        with_clean_bindings(device, |device| {
            device.bind_input(0, TextureBinding::new(source, source_mip))?;
            device.bind_output(0, TextureBinding::new(destination, destination_mip))?;
            let (w, h) = device.texture_size(destination, destination_mip)?;
            ctx.dispatch(device, Kernel::TextureRescale, dispatch_grid(w, h, 8))
        })
    }
}
