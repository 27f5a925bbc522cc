//! Compute post-processing: device abstraction, resource pools, kernel
//! signatures and the multi-pass renderers that drive them.
//!
//! Renderers never talk to a graphics API directly. They bind textures and
//! parameters through [`RenderDevice`] and dispatch [`Kernel`]s via a shared
//! [`PipelineContext`]. [`CpuBackend`] executes the scalar kernels for tests
//! and tools; [`WgpuBackend`] runs registered WGSL shaders on the GPU.

pub mod binding;
pub mod context;
pub mod cpu;
pub mod device;
pub mod grid;
pub mod handles;
pub mod kernel;
pub mod params;
pub mod ping_pong;
pub mod renderers;
pub mod wgpu_backend;

pub use binding::{BindingTable, TextureBinding};
pub use context::PipelineContext;
pub use cpu::{Command, CpuBackend};
pub use device::{BufferDesc, BufferUsage, RenderDevice, Texel, TextureDesc, TextureFormat};
pub use grid::{dispatch_grid, sparse_dispatch_grid};
pub use handles::{BufferHandle, PoolHandle, ResourcePool, TextureHandle};
pub use kernel::{Kernel, KernelSignature};
pub use params::{KernelParams, ParamsUniform};
pub use ping_pong::PingPong;
pub use renderers::{
    AntialiasingRenderer, EdgeDetectionRenderer, FxaaSettings, TextureRescaleRenderer,
    UtilityRenderer,
};
pub use wgpu_backend::WgpuBackend;
