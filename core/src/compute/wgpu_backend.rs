//! wgpu implementation of [`RenderDevice`].
//!
//! Kernels are compiled from WGSL supplied through [`WgpuBackend::register_kernel`].
//! Pipelines use layouts derived from the shader, so a kernel's shader must
//! declare every binding of its signature in this order at group 0:
//!
//! 1. one sampled texture per input
//! 2. one storage texture per output
//! 3. the parameter uniform ([`ParamsUniform`](super::params::ParamsUniform)), if any
//! 4. a linear clamp sampler, if any
//!
//! Dispatches are recorded into a command encoder and only reach the GPU on
//! [`WgpuBackend::submit`].

use std::borrow::Cow;

use hashbrown::HashMap;
use wgpu::util::DeviceExt;

use super::binding::{BindingTable, TextureBinding};
use super::device::{
    BufferDesc, BufferUsage, RenderDevice, Texel, TextureDesc, TextureFormat, mip_size,
};
use super::handles::{BufferHandle, ResourcePool, TextureHandle};
use super::kernel::Kernel;
use super::params::KernelParams;
use crate::error::ComputeError;

struct KernelSource {
    wgsl: String,
    entry_point: String,
}

struct GpuTexture {
    texture: wgpu::Texture,
    desc: TextureDesc,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    sources: HashMap<Kernel, KernelSource>,
    pipelines: HashMap<Kernel, wgpu::ComputePipeline>,
    buffers: ResourcePool<BufferHandle, wgpu::Buffer>,
    textures: ResourcePool<TextureHandle, GpuTexture>,
    bindings: BindingTable,
    sampler: wgpu::Sampler,
    encoder: Option<wgpu::CommandEncoder>,
    pending_dispatches: u32,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("kernels", &self.pipelines.len())
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("pending_dispatches", &self.pending_dispatches)
            .finish()
    }
}

/// Storage format used on the GPU for each value format.
fn gpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        // WGSL has no r8uint storage texel format.
        TextureFormat::R8Uint => wgpu::TextureFormat::R32Uint,
        TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
    }
}

fn bytes_per_texel(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::R8Uint | TextureFormat::R32Float | TextureFormat::Rgba8Unorm => 4,
        TextureFormat::Rgba32Float => 16,
    }
}

/// Encode texels in the GPU layout of `format`.
fn encode_texels(format: TextureFormat, texels: &[Texel]) -> Vec<u8> {
    let mut out = Vec::with_capacity(texels.len() * bytes_per_texel(format) as usize);
    for &texel in texels {
        let texel = format.quantize(texel);
        match format {
            TextureFormat::R8Uint => out.extend_from_slice(&(texel[0] as u32).to_le_bytes()),
            TextureFormat::R32Float => out.extend_from_slice(&texel[0].to_le_bytes()),
            TextureFormat::Rgba8Unorm => {
                out.extend(texel.map(|c| (c * 255.0).round() as u8));
            }
            TextureFormat::Rgba32Float => out.extend_from_slice(bytemuck::cast_slice(&texel)),
        }
    }
    out
}

/// Round `size` up to [`wgpu::COPY_BUFFER_ALIGNMENT`].
fn aligned_size(size: u64) -> u64 {
    size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

/// `data` zero-padded to a copy-aligned length.
fn aligned_data(data: &[u8]) -> Cow<'_, [u8]> {
    let len = aligned_size(data.len() as u64) as usize;
    if len == data.len() {
        Cow::Borrowed(data)
    } else {
        let mut padded = Vec::with_capacity(len);
        padded.extend_from_slice(data);
        padded.resize(len, 0);
        Cow::Owned(padded)
    }
}

fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let base = wgpu::BufferUsages::COPY_DST;
    match usage {
        BufferUsage::Vertex => base | wgpu::BufferUsages::VERTEX,
        BufferUsage::Index => base | wgpu::BufferUsages::INDEX,
        BufferUsage::Storage => base | wgpu::BufferUsages::STORAGE,
        BufferUsage::Uniform => base | wgpu::BufferUsages::UNIFORM,
    }
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Tessera Compute Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            device,
            queue,
            sources: HashMap::new(),
            pipelines: HashMap::new(),
            buffers: ResourcePool::new(),
            textures: ResourcePool::new(),
            bindings: BindingTable::new(),
            sampler,
            encoder: None,
            pending_dispatches: 0,
        }
    }

    /// Open the default adapter without a surface.
    pub fn request_headless() -> Result<Self, ComputeError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| ComputeError::Backend(format!("no suitable GPU adapter: {e}")))?;

        tracing::info!("Using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Tessera Compute Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| ComputeError::Backend(format!("failed to create GPU device: {e}")))?;

        Ok(Self::new(device, queue))
    }

    /// Supply the shader for `kernel`. Must happen before it is prepared.
    pub fn register_kernel(
        &mut self,
        kernel: Kernel,
        wgsl: impl Into<String>,
        entry_point: impl Into<String>,
    ) {
        self.pipelines.remove(&kernel);
        self.sources.insert(
            kernel,
            KernelSource {
                wgsl: wgsl.into(),
                entry_point: entry_point.into(),
            },
        );
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Underlying texture, e.g. to copy a result out.
    pub fn texture(&self, texture: TextureHandle) -> Result<&wgpu::Texture, ComputeError> {
        Ok(&self.textures.get(texture)?.texture)
    }

    pub fn buffer(&self, buffer: BufferHandle) -> Result<&wgpu::Buffer, ComputeError> {
        self.buffers.get(buffer)
    }

    /// Submit every dispatch recorded since the last submit.
    pub fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            tracing::trace!(dispatches = self.pending_dispatches, "submitting compute work");
            self.queue.submit(std::iter::once(encoder.finish()));
            self.pending_dispatches = 0;
        }
    }

    fn texture_view(
        &self,
        binding: TextureBinding,
        single_mip: bool,
    ) -> Result<wgpu::TextureView, ComputeError> {
        let gpu = self.textures.get(binding.texture)?;
        if binding.mip >= gpu.desc.mip_levels {
            return Err(ComputeError::InvalidArgument(format!(
                "mip level {} out of range ({} levels)",
                binding.mip, gpu.desc.mip_levels
            )));
        }
        Ok(gpu.texture.create_view(&wgpu::TextureViewDescriptor {
            base_mip_level: binding.mip,
            mip_level_count: single_mip.then_some(1),
            ..Default::default()
        }))
    }
}

impl RenderDevice for WgpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle, ComputeError> {
        // Padded so that the tail of an unaligned upload can still be written.
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size: aligned_size(desc.size),
            usage: buffer_usages(desc.usage),
            mapped_at_creation: false,
        });
        tracing::debug!(label = %desc.label, size = desc.size, "gpu buffer created");
        Ok(self.buffers.insert(buffer))
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ComputeError> {
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(ComputeError::InvalidArgument(format!(
                "buffer write offset {offset} is not a multiple of {}",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        // Queue writes land before the next submit; recorded work goes first.
        self.submit();
        let data = aligned_data(data);
        let target = self.buffers.get(buffer)?;
        if offset + data.len() as u64 > target.size() {
            return Err(ComputeError::InvalidArgument(format!(
                "write of {} bytes at offset {offset} overflows buffer of {} bytes",
                data.len(),
                target.size()
            )));
        }
        self.queue.write_buffer(target, offset, &data);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), ComputeError> {
        self.buffers.remove(buffer)?.destroy();
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, ComputeError> {
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            return Err(ComputeError::InvalidArgument(format!(
                "texture \"{}\" must have non-zero size and mip count",
                desc.label
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu_format(desc.format),
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        tracing::debug!(
            label = %desc.label,
            width = desc.width,
            height = desc.height,
            "gpu texture created"
        );
        Ok(self.textures.insert(GpuTexture {
            texture,
            desc: desc.clone(),
        }))
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        mip: u32,
        texels: &[Texel],
    ) -> Result<(), ComputeError> {
        // Queue writes land before the next submit; recorded work goes first.
        self.submit();
        let (width, height) = self.texture_size(texture, mip)?;
        if texels.len() != (width * height) as usize {
            return Err(ComputeError::InvalidArgument(format!(
                "mip {mip} holds {} texels, got {}",
                width * height,
                texels.len()
            )));
        }
        let gpu = self.textures.get(texture)?;
        let data = encode_texels(gpu.desc.format, texels);
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: mip,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_texel(gpu.desc.format)),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn clear_texture(&mut self, texture: TextureHandle, value: Texel) -> Result<(), ComputeError> {
        let levels = self.textures.get(texture)?.desc.mip_levels;
        for mip in 0..levels {
            let (w, h) = self.texture_size(texture, mip)?;
            self.write_texture(texture, mip, &vec![value; (w * h) as usize])?;
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), ComputeError> {
        self.textures.remove(texture)?.texture.destroy();
        Ok(())
    }

    fn texture_size(&self, texture: TextureHandle, mip: u32) -> Result<(u32, u32), ComputeError> {
        let desc = &self.textures.get(texture)?.desc;
        if mip >= desc.mip_levels {
            return Err(ComputeError::InvalidArgument(format!(
                "mip level {mip} out of range ({} levels)",
                desc.mip_levels
            )));
        }
        Ok(mip_size(desc.width, desc.height, mip))
    }

    fn prepare_kernel(&mut self, kernel: Kernel) -> Result<(), ComputeError> {
        if self.pipelines.contains_key(&kernel) {
            return Ok(());
        }
        let source = self.sources.get(&kernel).ok_or_else(|| {
            ComputeError::Backend(format!("no shader registered for kernel {kernel}"))
        })?;

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel.label()),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.as_str().into()),
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.label()),
                layout: None,
                module: &module,
                entry_point: Some(&source.entry_point),
                compilation_options: Default::default(),
                cache: None,
            });
        self.pipelines.insert(kernel, pipeline);
        tracing::debug!(kernel = kernel.label(), "compute pipeline created");
        Ok(())
    }

    fn bind_input(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError> {
        self.texture_size(binding.texture, binding.mip)?;
        self.bindings.bind_input(slot, binding)
    }

    fn bind_output(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError> {
        self.texture_size(binding.texture, binding.mip)?;
        self.bindings.bind_output(slot, binding)
    }

    fn bind_params(&mut self, params: KernelParams) -> Result<(), ComputeError> {
        self.bindings.bind_params(params);
        Ok(())
    }

    fn unbind_all(&mut self) {
        self.bindings.unbind_all();
    }

    fn dispatch(&mut self, kernel: Kernel, groups: [u32; 3]) -> Result<(), ComputeError> {
        let pipeline = self
            .pipelines
            .get(&kernel)
            .ok_or(ComputeError::NotInitialized(kernel.label()))?;
        self.bindings.validate(kernel)?;
        let signature = kernel.signature();

        let mut views = Vec::new();
        for slot in 0..signature.inputs {
            if let Some(binding) = self.bindings.input(slot) {
                views.push(self.texture_view(binding, false)?);
            }
        }
        for slot in 0..signature.outputs {
            if let Some(binding) = self.bindings.output(slot) {
                views.push(self.texture_view(binding, true)?);
            }
        }

        let params_buffer = match (signature.params, self.bindings.params()) {
            (true, Some(params)) => Some(self.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("Tessera Kernel Params"),
                    contents: bytemuck::bytes_of(&params.to_uniform()),
                    usage: wgpu::BufferUsages::UNIFORM,
                },
            )),
            _ => None,
        };

        let entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .map(|view| wgpu::BindingResource::TextureView(view))
            .chain(params_buffer.iter().map(|b| b.as_entire_binding()))
            .chain(
                signature
                    .sampler
                    .then_some(wgpu::BindingResource::Sampler(&self.sampler)),
            )
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource,
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.label()),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let encoder = self.encoder.get_or_insert_with(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Tessera Compute Encoder"),
                })
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.label()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        self.pending_dispatches += 1;
        Ok(())
    }
}
