//! Per-vertex bone attachments.
//!
//! Each vertex owns a fixed number of `(bone index, weight)` slots. Occupied
//! slots are packed at the front in descending weight order; bone index 0
//! marks an empty slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SkeletonError;

/// Engine-wide capacity of the per-vertex bone slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BonesPerVertex {
    Zero,
    One,
    Two,
    #[default]
    Four,
}

impl BonesPerVertex {
    pub const fn count(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }
}

impl TryFrom<u8> for BonesPerVertex {
    type Error = SkeletonError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            other => Err(SkeletonError::InvalidArgument(format!(
                "bones per vertex must be 0, 1, 2 or 4 (got {other})"
            ))),
        }
    }
}

impl From<BonesPerVertex> for u8 {
    fn from(value: BonesPerVertex) -> Self {
        value.count() as u8
    }
}

impl fmt::Display for BonesPerVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Bone slots for every vertex of a mesh, stored flat (`vertex * K + slot`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexBoneWeights {
    bones_per_vertex: BonesPerVertex,
    vertex_count: usize,
    bones: Vec<u8>,
    weights: Vec<f32>,
}

impl VertexBoneWeights {
    pub fn new(bones_per_vertex: BonesPerVertex, vertex_count: usize) -> Self {
        let slots = vertex_count * bones_per_vertex.count();
        Self {
            bones_per_vertex,
            vertex_count,
            bones: vec![0; slots],
            weights: vec![0.0; slots],
        }
    }

    pub fn bones_per_vertex(&self) -> BonesPerVertex {
        self.bones_per_vertex
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Resize to `vertex_count` vertices; new vertices start with no bones.
    pub fn resize(&mut self, vertex_count: usize) {
        let slots = vertex_count * self.bones_per_vertex.count();
        self.bones.resize(slots, 0);
        self.weights.resize(slots, 0.0);
        self.vertex_count = vertex_count;
    }

    /// Drop every attachment and every vertex.
    pub fn clear(&mut self) {
        self.bones.clear();
        self.weights.clear();
        self.vertex_count = 0;
    }

    /// Flat bone index array, `K` entries per vertex.
    pub fn bone_indices(&self) -> &[u8] {
        &self.bones
    }

    /// Flat weight array, `K` entries per vertex.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn vertex_bones(&self, vertex: usize) -> Result<&[u8], SkeletonError> {
        let range = self.slot_range(vertex)?;
        Ok(&self.bones[range])
    }

    pub fn vertex_weights(&self, vertex: usize) -> Result<&[f32], SkeletonError> {
        let range = self.slot_range(vertex)?;
        Ok(&self.weights[range])
    }

    /// Occupied `(bone, weight)` pairs of a vertex, heaviest first.
    pub fn vertex_attachments(
        &self,
        vertex: usize,
    ) -> Result<impl Iterator<Item = (u8, f32)> + '_, SkeletonError> {
        let range = self.slot_range(vertex)?;
        Ok(self.bones[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
            .take_while(|&(bone, _)| bone != 0))
    }

    /// Attach `bone` to `vertex`, evicting the lightest attachment if needed.
    ///
    /// Fails with [`SkeletonError::CapacityExceeded`] when every slot already
    /// holds a weight greater than or equal to `weight`.
    pub fn attach_vertex_to_bone(
        &mut self,
        vertex: usize,
        bone: u8,
        weight: f32,
    ) -> Result<(), SkeletonError> {
        if self.insert(vertex, bone, weight)? {
            Ok(())
        } else {
            Err(SkeletonError::CapacityExceeded {
                vertex,
                capacity: self.bones_per_vertex.count(),
                weight,
            })
        }
    }

    /// Like [`attach_vertex_to_bone`](Self::attach_vertex_to_bone) but a full
    /// vertex is not an error: the bone is dropped and `Ok(false)` returned.
    pub fn attach_vertex_to_bone_if_possible(
        &mut self,
        vertex: usize,
        bone: u8,
        weight: f32,
    ) -> Result<bool, SkeletonError> {
        let attached = self.insert(vertex, bone, weight)?;
        if !attached {
            tracing::warn!(vertex, bone, weight, "vertex bone slots full, attachment dropped");
        }
        Ok(attached)
    }

    /// Scale each vertex's weights to sum to 1. All-zero vertices are left as is.
    pub fn normalize_vertex_weights(&mut self) {
        let k = self.bones_per_vertex.count();
        if k == 0 {
            return;
        }
        for weights in self.weights.chunks_exact_mut(k) {
            let sum: f32 = weights.iter().sum();
            if sum > 0.0 && sum != 1.0 {
                for w in weights.iter_mut() {
                    *w /= sum;
                }
            }
        }
    }

    fn insert(&mut self, vertex: usize, bone: u8, weight: f32) -> Result<bool, SkeletonError> {
        if self.bones_per_vertex == BonesPerVertex::Zero {
            return Err(SkeletonError::InvalidState(
                "mesh has zero bones per vertex",
            ));
        }
        if bone == 0 {
            return Err(SkeletonError::InvalidArgument(
                "bone index 0 marks an empty slot".into(),
            ));
        }
        if weight.is_nan() || weight < 0.0 {
            return Err(SkeletonError::InvalidArgument(format!(
                "bone weight must be a non-negative number (got {weight})"
            )));
        }

        let range = self.slot_range(vertex)?;
        let bones = &mut self.bones[range.clone()];
        let weights = &mut self.weights[range];

        if bones[0] == 0 {
            bones[0] = bone;
            weights[0] = weight;
            return Ok(true);
        }

        let last = bones.len() - 1;
        if bones[last] != 0 && weights[last] >= weight {
            return Ok(false);
        }

        bones[last] = bone;
        weights[last] = weight;

        let mut i = last;
        while i > 0 && (bones[i - 1] == 0 || weights[i - 1] < weights[i]) {
            bones.swap(i - 1, i);
            weights.swap(i - 1, i);
            i -= 1;
        }
        Ok(true)
    }

    fn slot_range(&self, vertex: usize) -> Result<std::ops::Range<usize>, SkeletonError> {
        if vertex >= self.vertex_count {
            return Err(SkeletonError::OutOfRange {
                what: "vertex",
                index: vertex,
                len: self.vertex_count,
            });
        }
        let k = self.bones_per_vertex.count();
        Ok(vertex * k..(vertex + 1) * k)
    }
}
