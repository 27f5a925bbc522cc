//! CPU reference backend.
//!
//! Executes the scalar kernels on the CPU and records every command it
//! receives, so pipeline drivers can be tested without a GPU. Kernels whose
//! behaviour only exists as shader code return
//! [`ComputeError::UnsupportedKernel`] on dispatch.

use hashbrown::HashSet;

use super::binding::{BindingTable, TextureBinding};
use super::device::{
    BufferDesc, BufferUsage, RenderDevice, Texel, TextureDesc, TextureFormat, mip_size,
};
use super::handles::{BufferHandle, ResourcePool, TextureHandle};
use super::kernel::Kernel;
use super::params::KernelParams;
use crate::error::ComputeError;

/// One call made against the backend, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer {
        buffer: BufferHandle,
        size: u64,
        usage: BufferUsage,
    },
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        len: usize,
    },
    DestroyBuffer(BufferHandle),
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
        mip_levels: u32,
        format: TextureFormat,
    },
    WriteTexture {
        texture: TextureHandle,
        mip: u32,
    },
    ClearTexture {
        texture: TextureHandle,
        value: Texel,
    },
    DestroyTexture(TextureHandle),
    PrepareKernel(Kernel),
    BindInput {
        slot: u32,
        binding: TextureBinding,
    },
    BindOutput {
        slot: u32,
        binding: TextureBinding,
    },
    BindParams(KernelParams),
    UnbindAll,
    Dispatch {
        kernel: Kernel,
        groups: [u32; 3],
    },
}

#[derive(Debug)]
struct CpuBuffer {
    data: Vec<u8>,
}

#[derive(Debug)]
struct CpuTexture {
    width: u32,
    height: u32,
    format: TextureFormat,
    mips: Vec<Vec<Texel>>,
}

impl CpuTexture {
    fn level(&self, mip: u32) -> Result<Level, ComputeError> {
        let texels = self
            .mips
            .get(mip as usize)
            .ok_or_else(|| missing_mip(mip, self.mips.len()))?;
        let (width, height) = mip_size(self.width, self.height, mip);
        Ok(Level {
            width,
            height,
            texels: texels.clone(),
        })
    }
}

/// Owned snapshot of one mip level.
#[derive(Debug, Clone)]
struct Level {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl Level {
    /// Texel at `(x, y)`, clamped to the edge.
    fn at(&self, x: i64, y: i64) -> Texel {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Bilinear sample at normalized `(u, v)`, clamp addressing.
    fn sample(&self, u: f32, v: f32) -> Texel {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.at(x0, y0);
        let b = self.at(x0 + 1, y0);
        let c = self.at(x0, y0 + 1);
        let d = self.at(x0 + 1, y0 + 1);
        std::array::from_fn(|i| {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            top + (bottom - top) * ty
        })
    }
}

const NEIGHBOURS_3X3: [(i64, i64); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const NEIGHBOURS_4: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// CPU implementation of [`RenderDevice`].
#[derive(Debug, Default)]
pub struct CpuBackend {
    buffers: ResourcePool<BufferHandle, CpuBuffer>,
    textures: ResourcePool<TextureHandle, CpuTexture>,
    bindings: BindingTable,
    prepared: HashSet<Kernel>,
    commands: Vec<Command>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command received so far, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn read_buffer(&self, buffer: BufferHandle) -> Result<&[u8], ComputeError> {
        Ok(&self.buffers.get(buffer)?.data)
    }

    /// Copy of one mip level, row-major.
    pub fn read_texture(&self, texture: TextureHandle, mip: u32) -> Result<Vec<Texel>, ComputeError> {
        Ok(self.textures.get(texture)?.level(mip)?.texels)
    }

    /// Channel 0 of one mip level, row-major.
    pub fn read_values(&self, texture: TextureHandle, mip: u32) -> Result<Vec<f32>, ComputeError> {
        Ok(self
            .read_texture(texture, mip)?
            .into_iter()
            .map(|t| t[0])
            .collect())
    }

    fn input_level(&self, slot: u32, kernel: Kernel) -> Result<Level, ComputeError> {
        let binding = self
            .bindings
            .input(slot)
            .ok_or(ComputeError::UnboundSlot {
                kernel: kernel.label(),
                what: "input",
                slot,
            })?;
        self.textures.get(binding.texture)?.level(binding.mip)
    }

    fn execute(&mut self, kernel: Kernel, groups: [u32; 3]) -> Result<(), ComputeError> {
        let output = self.bindings.output(0).ok_or(ComputeError::UnboundSlot {
            kernel: kernel.label(),
            what: "output",
            slot: 0,
        })?;
        let current = self.textures.get(output.texture)?.level(output.mip)?;
        let params = self.bindings.params().copied();

        let tile = kernel.tile_size();
        let mut extent = [groups[0] * tile, groups[1] * tile];
        if let Some(KernelParams::Spread {
            spread_distance, ..
        }) = params
            && kernel == Kernel::SpreadSparseMinValue
        {
            let spread = spread_distance.max(1);
            extent = [extent[0].saturating_mul(spread), extent[1].saturating_mul(spread)];
        }
        let width = extent[0].min(current.width);
        let height = extent[1].min(current.height);

        let mut result = current.texels.clone();
        let inputs = (0..kernel.signature().inputs)
            .map(|slot| self.input_level(slot, kernel))
            .collect::<Result<Vec<_>, _>>()?;

        let texel = |x: u32, y: u32| -> Result<Texel, ComputeError> {
            shade(kernel, params.as_ref(), &inputs, &current, x as i64, y as i64)
        };
        for y in 0..height {
            for x in 0..width {
                result[(y * current.width + x) as usize] = texel(x, y)?;
            }
        }

        let target = self.textures.get_mut(output.texture)?;
        let format = target.format;
        let level = target
            .mips
            .get_mut(output.mip as usize)
            .ok_or_else(|| missing_mip(output.mip, 0))?;
        for (dst, src) in level.iter_mut().zip(result) {
            *dst = format.quantize(src);
        }
        Ok(())
    }
}

/// Value of one output texel at `(x, y)`.
fn shade(
    kernel: Kernel,
    params: Option<&KernelParams>,
    inputs: &[Level],
    current: &Level,
    x: i64,
    y: i64,
) -> Result<Texel, ComputeError> {
    let value = |t: f32| [t, 0.0, 0.0, 0.0];
    let bad_params = || ComputeError::InvalidArgument(format!("wrong parameters for {kernel}"));

    match kernel {
        Kernel::EdgeDetection => {
            let Some(&KernelParams::EdgeDetection {
                position_threshold,
                normal_threshold,
            }) = params
            else {
                return Err(bad_params());
            };
            let (positions, normals) = (&inputs[0], &inputs[1]);
            let p = xyz(positions.at(x, y));
            let n = xyz(normals.at(x, y));
            let is_edge = NEIGHBOURS_4.iter().any(|&(dx, dy)| {
                let (qx, qy) = (x + dx, y + dy);
                positions.contains(qx, qy)
                    && (p.distance(xyz(positions.at(qx, qy))) > position_threshold
                        || n.dot(xyz(normals.at(qx, qy))) < normal_threshold)
            });
            Ok(value(if is_edge { 0.0 } else { 255.0 }))
        }
        Kernel::EdgeDistance => {
            let Some(&KernelParams::EdgeDistance { pass }) = params else {
                return Err(bad_params());
            };
            let src = &inputs[0];
            let v = src.at(x, y)[0];
            let previous = pass as f32 - 1.0;
            let reached = v == 255.0
                && NEIGHBOURS_3X3.iter().any(|&(dx, dy)| {
                    src.contains(x + dx, y + dy) && src.at(x + dx, y + dy)[0] == previous
                });
            Ok(value(if reached { pass as f32 } else { v }))
        }
        Kernel::ReplaceValue => {
            let Some(&KernelParams::ReplaceValue { from, to }) = params else {
                return Err(bad_params());
            };
            let mut t = current.at(x, y);
            if t[0] == from {
                t[0] = to;
            }
            Ok(t)
        }
        Kernel::SpreadMaxValue => {
            let Some(&KernelParams::Spread { ignore_below, .. }) = params else {
                return Err(bad_params());
            };
            let src = &inputs[0];
            let best = NEIGHBOURS_3X3
                .iter()
                .filter(|&&(dx, dy)| src.contains(x + dx, y + dy))
                .map(|&(dx, dy)| src.at(x + dx, y + dy)[0])
                .filter(|&v| v >= ignore_below)
                .fold(src.at(x, y)[0], f32::max);
            Ok(value(best))
        }
        Kernel::SpreadMinValue | Kernel::SpreadSparseMinValue => {
            let Some(&KernelParams::Spread {
                ignore_below,
                min_acceptable,
                spread_distance,
                ..
            }) = params
            else {
                return Err(bad_params());
            };
            let step = match kernel {
                Kernel::SpreadSparseMinValue => spread_distance.max(1) as i64,
                _ => 1,
            };
            let threshold = ignore_below.max(min_acceptable);
            let src = &inputs[0];
            let best = NEIGHBOURS_3X3
                .iter()
                .map(|&(dx, dy)| (x + dx * step, y + dy * step))
                .filter(|&(qx, qy)| src.contains(qx, qy))
                .map(|(qx, qy)| src.at(qx, qy)[0])
                .filter(|&v| v >= threshold)
                .reduce(f32::min);
            Ok(value(best.unwrap_or(src.at(x, y)[0])))
        }
        Kernel::MergeMinValue => {
            let (a, b) = (current.at(x, y), inputs[0].at(x, y));
            Ok(std::array::from_fn(|i| a[i].min(b[i])))
        }
        Kernel::SumTwoValues | Kernel::SumThreeValues => {
            Ok(value(inputs.iter().map(|level| level.at(x, y)[0]).sum()))
        }
        Kernel::Luminance => {
            let [r, g, b, _] = current.at(x, y);
            Ok([r, g, b, 0.299 * r + 0.587 * g + 0.114 * b])
        }
        Kernel::BlurValue => {
            let src = &inputs[0];
            let (u, v) = texel_center(x, y, current);
            let cx = (u * src.width as f32) as i64;
            let cy = (v * src.height as f32) as i64;
            let mut sum = [0.0f32; 4];
            for (dx, dy) in NEIGHBOURS_3X3 {
                let t = src.at(cx + dx, cy + dy);
                for (acc, c) in sum.iter_mut().zip(t) {
                    *acc += c;
                }
            }
            Ok(sum.map(|c| c / 9.0))
        }
        Kernel::TextureRescale => {
            let (u, v) = texel_center(x, y, current);
            Ok(inputs[0].sample(u, v))
        }
        Kernel::ConvertDistanceToWorldSpace | Kernel::MergeMipmapsValue | Kernel::Antialiasing => {
            Err(ComputeError::UnsupportedKernel(kernel.label()))
        }
    }
}

fn texel_center(x: i64, y: i64, level: &Level) -> (f32, f32) {
    (
        (x as f32 + 0.5) / level.width as f32,
        (y as f32 + 0.5) / level.height as f32,
    )
}

fn xyz(t: Texel) -> glam::Vec3 {
    glam::Vec3::new(t[0], t[1], t[2])
}

fn missing_mip(mip: u32, levels: usize) -> ComputeError {
    ComputeError::InvalidArgument(format!("mip level {mip} out of range ({levels} levels)"))
}

impl RenderDevice for CpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle, ComputeError> {
        let buffer = self.buffers.insert(CpuBuffer {
            data: vec![0; desc.size as usize],
        });
        tracing::debug!(label = %desc.label, size = desc.size, "cpu buffer created");
        self.commands.push(Command::CreateBuffer {
            buffer,
            size: desc.size,
            usage: desc.usage,
        });
        Ok(buffer)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ComputeError> {
        let target = self.buffers.get_mut(buffer)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > target.data.len() {
            return Err(ComputeError::InvalidArgument(format!(
                "write of {} bytes at offset {offset} overflows buffer of {} bytes",
                data.len(),
                target.data.len()
            )));
        }
        target.data[start..end].copy_from_slice(data);
        self.commands.push(Command::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), ComputeError> {
        self.buffers.remove(buffer)?;
        self.commands.push(Command::DestroyBuffer(buffer));
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, ComputeError> {
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            return Err(ComputeError::InvalidArgument(format!(
                "texture \"{}\" must have non-zero size and mip count",
                desc.label
            )));
        }
        let mips = (0..desc.mip_levels)
            .map(|mip| {
                let (w, h) = mip_size(desc.width, desc.height, mip);
                vec![[0.0; 4]; (w * h) as usize]
            })
            .collect();
        let texture = self.textures.insert(CpuTexture {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            mips,
        });
        tracing::debug!(
            label = %desc.label,
            width = desc.width,
            height = desc.height,
            "cpu texture created"
        );
        self.commands.push(Command::CreateTexture {
            texture,
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels,
            format: desc.format,
        });
        Ok(texture)
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        mip: u32,
        texels: &[Texel],
    ) -> Result<(), ComputeError> {
        let target = self.textures.get_mut(texture)?;
        let format = target.format;
        let levels = target.mips.len();
        let level = target
            .mips
            .get_mut(mip as usize)
            .ok_or_else(|| missing_mip(mip, levels))?;
        if level.len() != texels.len() {
            return Err(ComputeError::InvalidArgument(format!(
                "mip {mip} holds {} texels, got {}",
                level.len(),
                texels.len()
            )));
        }
        for (dst, &src) in level.iter_mut().zip(texels) {
            *dst = format.quantize(src);
        }
        self.commands.push(Command::WriteTexture { texture, mip });
        Ok(())
    }

    fn clear_texture(&mut self, texture: TextureHandle, value: Texel) -> Result<(), ComputeError> {
        let target = self.textures.get_mut(texture)?;
        let value = target.format.quantize(value);
        for level in &mut target.mips {
            level.fill(value);
        }
        self.commands.push(Command::ClearTexture { texture, value });
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), ComputeError> {
        self.textures.remove(texture)?;
        self.commands.push(Command::DestroyTexture(texture));
        Ok(())
    }

    fn texture_size(&self, texture: TextureHandle, mip: u32) -> Result<(u32, u32), ComputeError> {
        let target = self.textures.get(texture)?;
        if mip as usize >= target.mips.len() {
            return Err(missing_mip(mip, target.mips.len()));
        }
        Ok(mip_size(target.width, target.height, mip))
    }

    fn prepare_kernel(&mut self, kernel: Kernel) -> Result<(), ComputeError> {
        self.prepared.insert(kernel);
        self.commands.push(Command::PrepareKernel(kernel));
        Ok(())
    }

    fn bind_input(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError> {
        self.texture_size(binding.texture, binding.mip)?;
        self.bindings.bind_input(slot, binding)?;
        self.commands.push(Command::BindInput { slot, binding });
        Ok(())
    }

    fn bind_output(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError> {
        self.texture_size(binding.texture, binding.mip)?;
        self.bindings.bind_output(slot, binding)?;
        self.commands.push(Command::BindOutput { slot, binding });
        Ok(())
    }

    fn bind_params(&mut self, params: KernelParams) -> Result<(), ComputeError> {
        self.bindings.bind_params(params);
        self.commands.push(Command::BindParams(params));
        Ok(())
    }

    fn unbind_all(&mut self) {
        self.bindings.unbind_all();
        self.commands.push(Command::UnbindAll);
    }

    fn dispatch(&mut self, kernel: Kernel, groups: [u32; 3]) -> Result<(), ComputeError> {
        if !self.prepared.contains(&kernel) {
            return Err(ComputeError::NotInitialized(kernel.label()));
        }
        self.bindings.validate(kernel)?;
        self.commands.push(Command::Dispatch { kernel, groups });
        self.execute(kernel, groups)
    }
}

#[cfg(test)]
mod tests;
