//! Kernel parameter blocks.

use glam::{Vec2, Vec3};

/// Typed parameters bound alongside a kernel dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelParams {
    EdgeDetection {
        /// World-space distance between neighbours above which an edge is marked.
        position_threshold: f32,
        /// Normal dot product below which an edge is marked.
        normal_threshold: f32,
    },
    EdgeDistance {
        /// Distance written by this pass (1..=255).
        pass: u32,
    },
    ReplaceValue {
        from: f32,
        to: f32,
    },
    Spread {
        /// Source pixels below this value are never spread.
        ignore_below: f32,
        /// Neighbour values below this are not accepted (min spreading only).
        min_acceptable: f32,
        /// Running spread distance including this pass.
        total_spread: u32,
        /// Neighbour offset in pixels; 0 for dense spreading.
        spread_distance: u32,
        offset: u32,
    },
    ConvertDistance {
        camera_position: Vec3,
    },
    MergeMipmaps {
        first_mip: u32,
        last_mip: u32,
    },
    Antialiasing {
        pixel_size: Vec2,
        quality_subpix: f32,
        edge_threshold: f32,
        edge_threshold_min: f32,
    },
}

/// GPU layout of [`KernelParams`] (48 bytes, uniform-buffer compatible).
///
/// Field use per variant:
/// - `EdgeDetection`: `floats[0..2]` = thresholds
/// - `EdgeDistance`: `uints[0]` = pass
/// - `ReplaceValue`: `floats[0..2]` = from, to
/// - `Spread`: `floats[0..2]` = ignore_below, min_acceptable;
///   `uints[0..3]` = total_spread, spread_distance, offset
/// - `ConvertDistance`: `floats[0..3]` = camera position
/// - `MergeMipmaps`: `uints[0..2]` = first, last mip
/// - `Antialiasing`: `floats[0..5]` = pixel size xy, subpix, threshold, threshold min
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ParamsUniform {
    pub floats: [f32; 8],
    pub uints: [u32; 4],
}

impl KernelParams {
    pub fn to_uniform(&self) -> ParamsUniform {
        let mut out = ParamsUniform::default();
        match *self {
            KernelParams::EdgeDetection {
                position_threshold,
                normal_threshold,
            } => {
                out.floats[0] = position_threshold;
                out.floats[1] = normal_threshold;
            }
            KernelParams::EdgeDistance { pass } => out.uints[0] = pass,
            KernelParams::ReplaceValue { from, to } => {
                out.floats[0] = from;
                out.floats[1] = to;
            }
            KernelParams::Spread {
                ignore_below,
                min_acceptable,
                total_spread,
                spread_distance,
                offset,
            } => {
                out.floats[0] = ignore_below;
                out.floats[1] = min_acceptable;
                out.uints[..3].copy_from_slice(&[total_spread, spread_distance, offset]);
            }
            KernelParams::ConvertDistance { camera_position } => {
                out.floats[..3].copy_from_slice(&camera_position.to_array());
            }
            KernelParams::MergeMipmaps {
                first_mip,
                last_mip,
            } => {
                out.uints[0] = first_mip;
                out.uints[1] = last_mip;
            }
            KernelParams::Antialiasing {
                pixel_size,
                quality_subpix,
                edge_threshold,
                edge_threshold_min,
            } => {
                out.floats[..5].copy_from_slice(&[
                    pixel_size.x,
                    pixel_size.y,
                    quality_subpix,
                    edge_threshold,
                    edge_threshold_min,
                ]);
            }
        }
        out
    }
}
