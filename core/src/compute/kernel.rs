//! Compute kernels and their binding signatures.

use std::fmt;

/// Every compute kernel the post-processing pipeline dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kernel {
    /// Marks geometric edges (0) from position/normal buffers, 255 elsewhere.
    EdgeDetection,
    /// One flood-fill step of the distance-to-edge field.
    EdgeDistance,
    ReplaceValue,
    SpreadMaxValue,
    SpreadMinValue,
    SpreadSparseMinValue,
    MergeMinValue,
    ConvertDistanceToWorldSpace,
    BlurValue,
    MergeMipmapsValue,
    SumTwoValues,
    SumThreeValues,
    Luminance,
    Antialiasing,
    TextureRescale,
}

/// What a kernel expects to be bound when it is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSignature {
    /// Read-only texture slots `0..inputs`.
    pub inputs: u32,
    /// Writable texture slots `0..outputs`.
    pub outputs: u32,
    /// Whether a parameter block must be bound.
    pub params: bool,
    /// Whether the kernel samples its inputs through the linear clamp sampler.
    pub sampler: bool,
}

impl KernelSignature {
    const fn new(inputs: u32, outputs: u32, params: bool, sampler: bool) -> Self {
        Self {
            inputs,
            outputs,
            params,
            sampler,
        }
    }
}

impl Kernel {
    pub const ALL: [Kernel; 15] = [
        Kernel::EdgeDetection,
        Kernel::EdgeDistance,
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
        Kernel::Luminance,
        Kernel::Antialiasing,
        Kernel::TextureRescale,
    ];

    pub const fn signature(self) -> KernelSignature {
        match self {
            // position, normal -> value
            Kernel::EdgeDetection => KernelSignature::new(2, 1, true, false),
            // previous generation -> next generation
            Kernel::EdgeDistance => KernelSignature::new(1, 1, true, false),
            // in place on output 0
            Kernel::ReplaceValue => KernelSignature::new(0, 1, true, false),
            Kernel::SpreadMaxValue | Kernel::SpreadMinValue | Kernel::SpreadSparseMinValue => {
                KernelSignature::new(1, 1, true, false)
            }
            // output 0 = min(output 0, input 0)
            Kernel::MergeMinValue => KernelSignature::new(1, 1, false, false),
            // position -> scales output 0 in place
            Kernel::ConvertDistanceToWorldSpace => KernelSignature::new(1, 1, true, false),
            Kernel::BlurValue => KernelSignature::new(1, 1, false, true),
            // base, mipmapped -> merged
            Kernel::MergeMipmapsValue => KernelSignature::new(2, 1, true, true),
            Kernel::SumTwoValues => KernelSignature::new(2, 1, false, false),
            Kernel::SumThreeValues => KernelSignature::new(3, 1, false, false),
            // in place on output 0
            Kernel::Luminance => KernelSignature::new(0, 1, false, false),
            Kernel::Antialiasing => KernelSignature::new(1, 1, true, true),
            Kernel::TextureRescale => KernelSignature::new(1, 1, false, true),
        }
    }

    /// Workgroup edge length (threads per group is `tile * tile`).
    pub const fn tile_size(self) -> u32 {
        match self {
            Kernel::EdgeDistance
            | Kernel::SumTwoValues
            | Kernel::SumThreeValues
            | Kernel::Luminance
            | Kernel::Antialiasing => 16,
            _ => 8,
        }
    }

    /// Whether output 0 is read as well as written by the kernel.
    pub const fn reads_output(self) -> bool {
        matches!(
            self,
            Kernel::ReplaceValue
                | Kernel::MergeMinValue
                | Kernel::ConvertDistanceToWorldSpace
                | Kernel::Luminance
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            Kernel::EdgeDetection => "edge_detection",
            Kernel::EdgeDistance => "edge_distance",
            Kernel::ReplaceValue => "replace_value",
            Kernel::SpreadMaxValue => "spread_max_value",
            Kernel::SpreadMinValue => "spread_min_value",
            Kernel::SpreadSparseMinValue => "spread_sparse_min_value",
            Kernel::MergeMinValue => "merge_min_value",
            Kernel::ConvertDistanceToWorldSpace => "convert_distance_to_world_space",
            Kernel::BlurValue => "blur_value",
            Kernel::MergeMipmapsValue => "merge_mipmaps_value",
            Kernel::SumTwoValues => "sum_two_values",
            Kernel::SumThreeValues => "sum_three_values",
            Kernel::Luminance => "luminance",
            Kernel::Antialiasing => "antialiasing",
            Kernel::TextureRescale => "texture_rescale",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
