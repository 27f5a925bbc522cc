//! CPU backend tests

use super::*;
use crate::compute::grid::dispatch_grid;

fn values_texture(backend: &mut CpuBackend, w: u32, h: u32, values: &[f32]) -> TextureHandle {
    let tex = backend
        .create_texture(&TextureDesc::new("values", w, h, TextureFormat::R32Float))
        .unwrap();
    let texels: Vec<Texel> = values.iter().map(|&v| [v, 0.0, 0.0, 0.0]).collect();
    backend.write_texture(tex, 0, &texels).unwrap();
    tex
}

fn run(backend: &mut CpuBackend, kernel: Kernel, output: TextureHandle) {
    let (w, h) = backend.texture_size(output, 0).unwrap();
    backend.prepare_kernel(kernel).unwrap();
    backend
        .dispatch(kernel, dispatch_grid(w, h, kernel.tile_size()))
        .unwrap();
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_buffer_write_and_destroy() {
    let mut backend = CpuBackend::new();
    let buffer = backend
        .create_buffer(&BufferDesc {
            label: "test".into(),
            size: 8,
            usage: BufferUsage::Storage,
        })
        .unwrap();

    backend.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(backend.read_buffer(buffer).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);

    assert!(matches!(
        backend.write_buffer(buffer, 6, &[0; 4]),
        Err(ComputeError::InvalidArgument(_))
    ));

    backend.destroy_buffer(buffer).unwrap();
    assert!(matches!(
        backend.read_buffer(buffer),
        Err(ComputeError::StaleHandle { kind: "buffer", .. })
    ));
    assert_eq!(backend.live_buffers(), 0);
}

#[test]
fn test_texture_mips_and_clear() {
    let mut backend = CpuBackend::new();
    let tex = backend
        .create_texture(&TextureDesc::new("t", 16, 8, TextureFormat::R8Uint).with_mip_levels(3))
        .unwrap();

    assert_eq!(backend.texture_size(tex, 2).unwrap(), (4, 2));
    assert!(backend.texture_size(tex, 3).is_err());

    backend.clear_texture(tex, [255.0, 0.0, 0.0, 0.0]).unwrap();
    assert!(backend.read_values(tex, 1).unwrap().iter().all(|&v| v == 255.0));
}

#[test]
fn test_write_texture_size_checked() {
    let mut backend = CpuBackend::new();
    let tex = backend
        .create_texture(&TextureDesc::new("t", 4, 4, TextureFormat::R32Float))
        .unwrap();
    assert!(matches!(
        backend.write_texture(tex, 0, &[[0.0; 4]; 3]),
        Err(ComputeError::InvalidArgument(_))
    ));
}

#[test]
fn test_zero_sized_texture_rejected() {
    let mut backend = CpuBackend::new();
    assert!(
        backend
            .create_texture(&TextureDesc::new("t", 0, 4, TextureFormat::R32Float))
            .is_err()
    );
}

// ============================================================================
// Dispatch validation
// ============================================================================

#[test]
fn test_dispatch_requires_prepared_kernel() {
    let mut backend = CpuBackend::new();
    let tex = values_texture(&mut backend, 2, 2, &[0.0; 4]);
    backend.bind_output(0, tex.into()).unwrap();
    assert_eq!(
        backend.dispatch(Kernel::Luminance, [1, 1, 1]).unwrap_err(),
        ComputeError::NotInitialized("luminance")
    );
}

#[test]
fn test_dispatch_requires_bindings() {
    let mut backend = CpuBackend::new();
    backend.prepare_kernel(Kernel::MergeMinValue).unwrap();
    assert!(matches!(
        backend.dispatch(Kernel::MergeMinValue, [1, 1, 1]),
        Err(ComputeError::UnboundSlot { what: "input", .. })
    ));
}

#[test]
fn test_aliasing_rejected() {
    let mut backend = CpuBackend::new();
    let tex = values_texture(&mut backend, 2, 2, &[0.0; 4]);
    backend.bind_input(0, tex.into()).unwrap();
    assert!(matches!(
        backend.bind_output(0, tex.into()),
        Err(ComputeError::AliasedBinding { .. })
    ));
}

#[test]
fn test_unsupported_kernel() {
    let mut backend = CpuBackend::new();
    let src = values_texture(&mut backend, 2, 2, &[0.0; 4]);
    let dst = values_texture(&mut backend, 2, 2, &[0.0; 4]);
    backend.bind_input(0, src.into()).unwrap();
    backend.bind_output(0, dst.into()).unwrap();
    backend
        .bind_params(KernelParams::Antialiasing {
            pixel_size: glam::Vec2::splat(0.5),
            quality_subpix: 0.75,
            edge_threshold: 0.166,
            edge_threshold_min: 0.0833,
        })
        .unwrap();
    backend.prepare_kernel(Kernel::Antialiasing).unwrap();
    assert_eq!(
        backend.dispatch(Kernel::Antialiasing, [1, 1, 1]).unwrap_err(),
        ComputeError::UnsupportedKernel("antialiasing")
    );
}

#[test]
fn test_partial_grid_leaves_rest_untouched() {
    let mut backend = CpuBackend::new();
    let tex = values_texture(&mut backend, 16, 1, &[1.0; 16]);
    backend.bind_output(0, tex.into()).unwrap();
    backend
        .bind_params(KernelParams::ReplaceValue { from: 1.0, to: 2.0 })
        .unwrap();
    backend.prepare_kernel(Kernel::ReplaceValue).unwrap();

    // One 8x8 group covers only the first 8 columns.
    backend.dispatch(Kernel::ReplaceValue, [1, 1, 1]).unwrap();

    let values = backend.read_values(tex, 0).unwrap();
    assert!(values[..8].iter().all(|&v| v == 2.0));
    assert!(values[8..].iter().all(|&v| v == 1.0));
}

// ============================================================================
// Kernels
// ============================================================================

#[test]
fn test_edge_distance_step() {
    let mut backend = CpuBackend::new();
    #[rustfmt::skip]
    let src = values_texture(&mut backend, 4, 3, &[
        255.0, 255.0, 255.0, 255.0,
        255.0,   0.0, 255.0, 255.0,
        255.0, 255.0, 255.0, 255.0,
    ]);
    let dst = values_texture(&mut backend, 4, 3, &[0.0; 12]);
    backend.bind_input(0, src.into()).unwrap();
    backend.bind_output(0, dst.into()).unwrap();
    backend
        .bind_params(KernelParams::EdgeDistance { pass: 1 })
        .unwrap();
    run(&mut backend, Kernel::EdgeDistance, dst);

    #[rustfmt::skip]
    let expected = vec![
        1.0, 1.0, 1.0, 255.0,
        1.0, 0.0, 1.0, 255.0,
        1.0, 1.0, 1.0, 255.0,
    ];
    assert_eq!(backend.read_values(dst, 0).unwrap(), expected);
}

#[test]
fn test_edge_detection_marks_discontinuities() {
    let mut backend = CpuBackend::new();
    let positions = backend
        .create_texture(&TextureDesc::new("pos", 4, 1, TextureFormat::Rgba32Float))
        .unwrap();
    let normals = backend
        .create_texture(&TextureDesc::new("nrm", 4, 1, TextureFormat::Rgba32Float))
        .unwrap();
    let value = backend
        .create_texture(&TextureDesc::new("val", 4, 1, TextureFormat::R8Uint))
        .unwrap();

    // A depth jump between columns 1 and 2.
    backend
        .write_texture(
            positions,
            0,
            &[
                [0.0, 0.0, 1.0, 1.0],
                [0.1, 0.0, 1.0, 1.0],
                [0.2, 0.0, 9.0, 1.0],
                [0.3, 0.0, 9.0, 1.0],
            ],
        )
        .unwrap();
    backend
        .write_texture(normals, 0, &[[0.0, 0.0, 1.0, 0.0]; 4])
        .unwrap();

    backend.bind_input(0, positions.into()).unwrap();
    backend.bind_input(1, normals.into()).unwrap();
    backend.bind_output(0, value.into()).unwrap();
    backend
        .bind_params(KernelParams::EdgeDetection {
            position_threshold: 1.0,
            normal_threshold: 0.9,
        })
        .unwrap();
    run(&mut backend, Kernel::EdgeDetection, value);

    assert_eq!(
        backend.read_values(value, 0).unwrap(),
        vec![255.0, 0.0, 0.0, 255.0]
    );
}

#[test]
fn test_spread_max() {
    let mut backend = CpuBackend::new();
    let src = values_texture(&mut backend, 3, 1, &[0.2, 0.0, 0.9]);
    let dst = values_texture(&mut backend, 3, 1, &[0.0; 3]);
    backend.bind_input(0, src.into()).unwrap();
    backend.bind_output(0, dst.into()).unwrap();
    backend
        .bind_params(KernelParams::Spread {
            ignore_below: 0.5,
            min_acceptable: 0.0,
            total_spread: 0,
            spread_distance: 0,
            offset: 0,
        })
        .unwrap();
    run(&mut backend, Kernel::SpreadMaxValue, dst);

    // 0.2 is below the ignore threshold and never spreads.
    assert_eq!(backend.read_values(dst, 0).unwrap(), vec![0.2, 0.9, 0.9]);
}

#[test]
fn test_spread_min_respects_threshold() {
    let mut backend = CpuBackend::new();
    let src = values_texture(&mut backend, 4, 1, &[0.0, 0.005, 0.0, 0.7]);
    let dst = values_texture(&mut backend, 4, 1, &[0.0; 4]);
    backend.bind_input(0, src.into()).unwrap();
    backend.bind_output(0, dst.into()).unwrap();
    backend
        .bind_params(KernelParams::Spread {
            ignore_below: 0.0,
            min_acceptable: 0.01,
            total_spread: 1,
            spread_distance: 0,
            offset: 0,
        })
        .unwrap();
    run(&mut backend, Kernel::SpreadMinValue, dst);

    assert_eq!(
        backend.read_values(dst, 0).unwrap(),
        vec![0.0, 0.005, 0.7, 0.7]
    );
}

#[test]
fn test_sparse_spread_reaches_further() {
    let mut backend = CpuBackend::new();
    let mut values = vec![0.0; 9];
    values[8] = 0.5;
    let src = values_texture(&mut backend, 9, 1, &values);
    let dst = values_texture(&mut backend, 9, 1, &[0.0; 9]);
    backend.bind_input(0, src.into()).unwrap();
    backend.bind_output(0, dst.into()).unwrap();
    backend
        .bind_params(KernelParams::Spread {
            ignore_below: 0.1,
            min_acceptable: 0.0,
            total_spread: 4,
            spread_distance: 4,
            offset: 0,
        })
        .unwrap();
    backend.prepare_kernel(Kernel::SpreadSparseMinValue).unwrap();
    backend
        .dispatch(
            Kernel::SpreadSparseMinValue,
            crate::compute::grid::sparse_dispatch_grid(9, 1, 4, 8),
        )
        .unwrap();

    let out = backend.read_values(dst, 0).unwrap();
    assert_eq!(out[4], 0.5);
    assert_eq!(out[8], 0.5);
    assert_eq!(out[3], 0.0);
}

#[test]
fn test_merge_min_and_replace() {
    let mut backend = CpuBackend::new();
    let a = values_texture(&mut backend, 3, 1, &[1.0, 5.0, 3.0]);
    let b = values_texture(&mut backend, 3, 1, &[2.0, 4.0, 3.0]);
    backend.bind_input(0, b.into()).unwrap();
    backend.bind_output(0, a.into()).unwrap();
    run(&mut backend, Kernel::MergeMinValue, a);
    assert_eq!(backend.read_values(a, 0).unwrap(), vec![1.0, 4.0, 3.0]);

    backend.unbind_all();
    backend.bind_output(0, a.into()).unwrap();
    backend
        .bind_params(KernelParams::ReplaceValue { from: 3.0, to: 0.0 })
        .unwrap();
    run(&mut backend, Kernel::ReplaceValue, a);
    assert_eq!(backend.read_values(a, 0).unwrap(), vec![1.0, 4.0, 0.0]);
}

#[test]
fn test_sum_saturates_in_r8() {
    let mut backend = CpuBackend::new();
    let desc = TextureDesc::new("u8", 2, 1, TextureFormat::R8Uint);
    let inputs: Vec<_> = [[100.0, 200.0], [100.0, 50.0], [10.0, 20.0]]
        .iter()
        .map(|vals| {
            let tex = backend.create_texture(&desc).unwrap();
            let texels: Vec<Texel> = vals.iter().map(|&v| [v, 0.0, 0.0, 0.0]).collect();
            backend.write_texture(tex, 0, &texels).unwrap();
            tex
        })
        .collect();
    let out = backend.create_texture(&desc).unwrap();

    for (slot, &tex) in inputs.iter().enumerate() {
        backend.bind_input(slot as u32, tex.into()).unwrap();
    }
    backend.bind_output(0, out.into()).unwrap();
    run(&mut backend, Kernel::SumThreeValues, out);

    assert_eq!(backend.read_values(out, 0).unwrap(), vec![210.0, 255.0]);
}

#[test]
fn test_luminance_in_alpha() {
    let mut backend = CpuBackend::new();
    let tex = backend
        .create_texture(&TextureDesc::new("color", 1, 1, TextureFormat::Rgba32Float))
        .unwrap();
    backend.write_texture(tex, 0, &[[1.0, 1.0, 1.0, 0.0]]).unwrap();
    backend.bind_output(0, tex.into()).unwrap();
    run(&mut backend, Kernel::Luminance, tex);

    let [r, _, _, a] = backend.read_texture(tex, 0).unwrap()[0];
    assert_eq!(r, 1.0);
    assert!((a - 1.0).abs() < 1e-6);
}

#[test]
fn test_rescale_downsamples() {
    let mut backend = CpuBackend::new();
    let src = values_texture(&mut backend, 4, 1, &[0.0, 2.0, 4.0, 6.0]);
    let dst = values_texture(&mut backend, 2, 1, &[0.0; 2]);
    backend.bind_input(0, src.into()).unwrap();
    backend.bind_output(0, dst.into()).unwrap();
    run(&mut backend, Kernel::TextureRescale, dst);

    // Output texel centers land between source texels 0/1 and 2/3.
    assert_eq!(backend.read_values(dst, 0).unwrap(), vec![1.0, 5.0]);
}

#[test]
fn test_command_log_order() {
    let mut backend = CpuBackend::new();
    let tex = values_texture(&mut backend, 1, 1, &[0.0]);
    backend.clear_commands();

    backend.bind_output(0, tex.into()).unwrap();
    backend.prepare_kernel(Kernel::Luminance).unwrap();
    backend.dispatch(Kernel::Luminance, [1, 1, 1]).unwrap();
    backend.unbind_all();

    assert_eq!(
        backend.commands(),
        &[
            Command::BindOutput {
                slot: 0,
                binding: tex.into()
            },
            Command::PrepareKernel(Kernel::Luminance),
            Command::Dispatch {
                kernel: Kernel::Luminance,
                groups: [1, 1, 1]
            },
            Command::UnbindAll,
        ]
    );
    assert!(backend.bindings().is_empty());
}
