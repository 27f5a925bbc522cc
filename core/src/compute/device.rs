//! Device abstraction consumed by the compute pipeline and mesh upload.

use super::binding::TextureBinding;
use super::handles::{BufferHandle, TextureHandle};
use super::kernel::Kernel;
use super::params::KernelParams;
use crate::error::ComputeError;

/// Texel value as seen by the CPU: four channels, integer formats store whole
/// numbers in channel 0.
pub type Texel = [f32; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Storage,
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit unsigned value (distances, counters).
    R8Uint,
    R32Float,
    Rgba8Unorm,
    Rgba32Float,
}

impl TextureFormat {
    /// Round and clamp a texel to what the format can store.
    pub fn quantize(self, texel: Texel) -> Texel {
        match self {
            TextureFormat::R8Uint => [texel[0].round().clamp(0.0, 255.0), 0.0, 0.0, 0.0],
            TextureFormat::R32Float => [texel[0], 0.0, 0.0, 0.0],
            TextureFormat::Rgba8Unorm => {
                texel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0)
            }
            TextureFormat::Rgba32Float => texel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    pub fn new(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            mip_levels: 1,
            format,
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }
}

/// Size of mip level `mip` of a `width x height` texture.
pub fn mip_size(width: u32, height: u32, mip: u32) -> (u32, u32) {
    ((width >> mip).max(1), (height >> mip).max(1))
}

/// Resource creation, binding and dispatch.
///
/// Commands take effect in call order. `dispatch` only records or issues the
/// work; it never waits for completion.
pub trait RenderDevice {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle, ComputeError>;

    /// Copy `data` into `buffer` at `offset`.
    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ComputeError>;

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), ComputeError>;

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, ComputeError>;

    /// Replace the contents of one mip level; `texels` is row-major.
    fn write_texture(
        &mut self,
        texture: TextureHandle,
        mip: u32,
        texels: &[Texel],
    ) -> Result<(), ComputeError>;

    /// Fill every mip level with `value`.
    fn clear_texture(&mut self, texture: TextureHandle, value: Texel) -> Result<(), ComputeError>;

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), ComputeError>;

    fn texture_size(&self, texture: TextureHandle, mip: u32) -> Result<(u32, u32), ComputeError>;

    /// Compile or look up the pipeline for `kernel`.
    fn prepare_kernel(&mut self, kernel: Kernel) -> Result<(), ComputeError>;

    fn bind_input(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError>;

    fn bind_output(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError>;

    fn bind_params(&mut self, params: KernelParams) -> Result<(), ComputeError>;

    /// Release every input, output and parameter binding.
    fn unbind_all(&mut self);

    fn dispatch(&mut self, kernel: Kernel, groups: [u32; 3]) -> Result<(), ComputeError>;
}
