//! Skinned mesh: geometry, bone hierarchy and per-vertex bone weights, with
//! explicit CPU and GPU residency.

mod file_info;

pub use file_info::{MeshFormat, SkeletonMeshFileInfo};

use glam::{Affine3A, Vec2, Vec3};

use crate::compute::{BufferDesc, BufferHandle, BufferUsage, RenderDevice};
use crate::error::{ComputeError, MeshError, SkeletonError};
use crate::skeleton::{Bone, BoneHierarchy, BonesPerVertex, VertexBoneWeights};

/// Axis-aligned bounds of a mesh's vertices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Bounds of `points`, or a zero box when there are none.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(&first) = points.first() else {
            return Self::default();
        };
        points.iter().fold(
            Self {
                min: first,
                max: first,
            },
            |bb, &p| Self {
                min: bb.min.min(p),
                max: bb.max.max(p),
            },
        )
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// GPU buffers of an uploaded mesh. Attributes the mesh lacks stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertices: Option<BufferHandle>,
    pub normals: Option<BufferHandle>,
    pub tangents: Option<BufferHandle>,
    pub texcoords: Vec<BufferHandle>,
    pub triangles: Option<BufferHandle>,
    pub bone_indices: Option<BufferHandle>,
    pub bone_weights: Option<BufferHandle>,
}

impl MeshBuffers {
    /// Destroy every buffer, clearing each handle as soon as it is gone.
    /// Handles not yet destroyed when an error occurs stay tracked.
    fn destroy(&mut self, device: &mut dyn RenderDevice) -> Result<(), ComputeError> {
        for slot in [
            &mut self.vertices,
            &mut self.normals,
            &mut self.tangents,
            &mut self.triangles,
            &mut self.bone_indices,
            &mut self.bone_weights,
        ] {
            if let Some(buffer) = *slot {
                device.destroy_buffer(buffer)?;
                *slot = None;
            }
        }
        while let Some(&buffer) = self.texcoords.last() {
            device.destroy_buffer(buffer)?;
            self.texcoords.pop();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkeletonMesh {
    file_info: SkeletonMeshFileInfo,
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,
    texcoords: Vec<Vec<Vec2>>,
    triangles: Vec<[u32; 3]>,
    hierarchy: BoneHierarchy,
    weights: VertexBoneWeights,
    bounding_box: BoundingBox,
    gpu: MeshBuffers,
}

const NOT_IN_CPU_MEMORY: SkeletonError = SkeletonError::InvalidState("mesh not loaded in CPU memory");

impl SkeletonMesh {
    pub fn new(bones_per_vertex: BonesPerVertex, validate_bone_names: bool) -> Self {
        Self {
            hierarchy: BoneHierarchy::new(validate_bone_names),
            weights: VertexBoneWeights::new(bones_per_vertex, 0),
            ..Default::default()
        }
    }

    pub fn file_info(&self) -> &SkeletonMeshFileInfo {
        &self.file_info
    }

    pub fn set_file_info(&mut self, file_info: SkeletonMeshFileInfo) {
        self.file_info = file_info;
    }

    /// Replace the vertex positions. Bone slots are resized to match; new
    /// vertices start unattached.
    pub fn set_vertices(&mut self, vertices: Vec<Vec3>) {
        self.weights.resize(vertices.len());
        self.vertices = vertices;
        self.recalculate_bounding_box();
    }

    pub fn set_normals(&mut self, normals: Vec<Vec3>) -> Result<(), SkeletonError> {
        self.check_attribute_len("normals", normals.len())?;
        self.normals = normals;
        Ok(())
    }

    pub fn set_tangents(&mut self, tangents: Vec<Vec3>) -> Result<(), SkeletonError> {
        self.check_attribute_len("tangents", tangents.len())?;
        self.tangents = tangents;
        Ok(())
    }

    /// Append a texcoord set; returns its set index.
    pub fn add_texcoords(&mut self, texcoords: Vec<Vec2>) -> Result<usize, SkeletonError> {
        self.check_attribute_len("texcoords", texcoords.len())?;
        self.texcoords.push(texcoords);
        Ok(self.texcoords.len() - 1)
    }

    /// Replace the triangle list. Every index must refer to a vertex.
    pub fn set_triangles(&mut self, triangles: Vec<[u32; 3]>) -> Result<(), SkeletonError> {
        let len = self.vertices.len();
        if let Some(&bad) = triangles.iter().flatten().find(|&&i| i as usize >= len) {
            return Err(SkeletonError::OutOfRange {
                what: "triangle vertex",
                index: bad as usize,
                len,
            });
        }
        self.triangles = triangles;
        Ok(())
    }

    /// Vertices, triangles and bone slots are all present.
    pub fn is_in_cpu_memory(&self) -> bool {
        !self.vertices.is_empty()
            && !self.triangles.is_empty()
            && !self.weights.bone_indices().is_empty()
            && !self.weights.weights().is_empty()
    }

    pub fn is_in_gpu_memory(&self) -> bool {
        self.gpu.vertices.is_some()
            && self.gpu.triangles.is_some()
            && self.gpu.bone_indices.is_some()
            && self.gpu.bone_weights.is_some()
    }

    pub fn vertices(&self) -> Result<&[Vec3], SkeletonError> {
        self.cpu()?;
        Ok(&self.vertices)
    }

    pub fn normals(&self) -> Result<&[Vec3], SkeletonError> {
        self.cpu()?;
        Ok(&self.normals)
    }

    pub fn tangents(&self) -> Result<&[Vec3], SkeletonError> {
        self.cpu()?;
        Ok(&self.tangents)
    }

    pub fn texcoord_set_count(&self) -> Result<usize, SkeletonError> {
        self.cpu()?;
        Ok(self.texcoords.len())
    }

    pub fn texcoords(&self, set: usize) -> Result<&[Vec2], SkeletonError> {
        self.cpu()?;
        self.texcoords
            .get(set)
            .map(Vec::as_slice)
            .ok_or(SkeletonError::OutOfRange {
                what: "texcoord set",
                index: set,
                len: self.texcoords.len(),
            })
    }

    pub fn triangles(&self) -> Result<&[[u32; 3]], SkeletonError> {
        self.cpu()?;
        Ok(&self.triangles)
    }

    pub fn bone_weights(&self) -> Result<&VertexBoneWeights, SkeletonError> {
        self.cpu()?;
        Ok(&self.weights)
    }

    pub fn bones_per_vertex(&self) -> BonesPerVertex {
        self.weights.bones_per_vertex()
    }

    pub fn hierarchy(&self) -> &BoneHierarchy {
        &self.hierarchy
    }

    pub fn bone_count(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn bones(&self) -> &[Bone] {
        self.hierarchy.bones()
    }

    /// See [`BoneHierarchy::add_or_modify_bone`].
    pub fn add_or_modify_bone(
        &mut self,
        index: u8,
        name: impl Into<String>,
        parent_index: u8,
        bind_pose: Affine3A,
        bind_pose_inverse: Option<Affine3A>,
    ) -> Result<(), SkeletonError> {
        self.hierarchy
            .add_or_modify_bone(index, name, parent_index, bind_pose, bind_pose_inverse)
    }

    pub fn bone_index(&self, name: &str) -> Result<u8, SkeletonError> {
        self.hierarchy.bone_index(name)
    }

    pub fn find_bone_index(&self, name: &str) -> Option<u8> {
        self.hierarchy.find_bone_index(name)
    }

    /// Attach `vertex` to the existing bone `bone`; see
    /// [`VertexBoneWeights::attach_vertex_to_bone`].
    pub fn attach_vertex_to_bone(
        &mut self,
        vertex: usize,
        bone: u8,
        weight: f32,
    ) -> Result<(), SkeletonError> {
        self.check_attach(bone)?;
        self.weights.attach_vertex_to_bone(vertex, bone, weight)
    }

    pub fn attach_vertex_to_bone_if_possible(
        &mut self,
        vertex: usize,
        bone: u8,
        weight: f32,
    ) -> Result<bool, SkeletonError> {
        self.check_attach(bone)?;
        self.weights
            .attach_vertex_to_bone_if_possible(vertex, bone, weight)
    }

    pub fn normalize_vertex_weights(&mut self) -> Result<(), SkeletonError> {
        self.cpu()?;
        self.weights.normalize_vertex_weights();
        Ok(())
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn recalculate_bounding_box(&mut self) {
        self.bounding_box = BoundingBox::from_points(&self.vertices);
    }

    pub fn gpu_buffers(&self) -> Result<&MeshBuffers, SkeletonError> {
        if !self.is_in_gpu_memory() {
            return Err(SkeletonError::InvalidState("mesh not loaded in GPU memory"));
        }
        Ok(&self.gpu)
    }

    /// Upload every non-empty attribute that is not on the GPU yet.
    pub fn load_cpu_to_gpu(&mut self, device: &mut dyn RenderDevice) -> Result<(), MeshError> {
        self.cpu()?;

        let gpu = &mut self.gpu;
        upload_missing(device, &mut gpu.vertices, "mesh vertices", BufferUsage::Vertex, &self.vertices)?;
        upload_missing(
            device,
            &mut gpu.bone_indices,
            "mesh vertex bones",
            BufferUsage::Vertex,
            self.weights.bone_indices(),
        )?;
        upload_missing(
            device,
            &mut gpu.bone_weights,
            "mesh vertex weights",
            BufferUsage::Vertex,
            self.weights.weights(),
        )?;
        upload_missing(device, &mut gpu.normals, "mesh normals", BufferUsage::Vertex, &self.normals)?;
        upload_missing(device, &mut gpu.tangents, "mesh tangents", BufferUsage::Vertex, &self.tangents)?;

        for (set, texcoords) in self.texcoords.iter().enumerate().skip(gpu.texcoords.len()) {
            if texcoords.is_empty() {
                return Err(SkeletonError::InvalidState("mesh texcoord set is empty").into());
            }
            let label = format!("mesh texcoords[{set}]");
            gpu.texcoords
                .push(upload(device, &label, BufferUsage::Vertex, bytemuck::cast_slice(texcoords))?);
        }

        upload_missing(device, &mut gpu.triangles, "mesh triangles", BufferUsage::Index, &self.triangles)?;

        tracing::debug!(
            vertices = self.vertices.len(),
            triangles = self.triangles.len(),
            bones = self.hierarchy.len(),
            "skeleton mesh uploaded"
        );
        Ok(())
    }

    /// Drop the CPU copies of all geometry and bone slots.
    ///
    /// The bone hierarchy stays; it is needed for posing.
    pub fn unload_from_cpu(&mut self) {
        self.vertices = Vec::new();
        self.normals = Vec::new();
        self.tangents = Vec::new();
        self.texcoords = Vec::new();
        self.triangles = Vec::new();
        self.weights.clear();
    }

    pub fn unload_from_gpu(&mut self, device: &mut dyn RenderDevice) -> Result<(), ComputeError> {
        self.gpu.destroy(device)
    }

    fn cpu(&self) -> Result<(), SkeletonError> {
        if self.is_in_cpu_memory() {
            Ok(())
        } else {
            Err(NOT_IN_CPU_MEMORY)
        }
    }

    fn check_attach(&self, bone: u8) -> Result<(), SkeletonError> {
        self.cpu()?;
        if bone as usize > self.hierarchy.len() {
            return Err(SkeletonError::OutOfRange {
                what: "bone",
                index: bone as usize,
                len: self.hierarchy.len(),
            });
        }
        Ok(())
    }

    fn check_attribute_len(&self, what: &'static str, len: usize) -> Result<(), SkeletonError> {
        if len != self.vertices.len() {
            return Err(SkeletonError::DimensionMismatch {
                what,
                expected: self.vertices.len(),
                actual: len,
            });
        }
        Ok(())
    }
}

fn upload(
    device: &mut dyn RenderDevice,
    label: &str,
    usage: BufferUsage,
    bytes: &[u8],
) -> Result<BufferHandle, ComputeError> {
    let buffer = device.create_buffer(&BufferDesc {
        label: label.to_string(),
        size: bytes.len() as u64,
        usage,
    })?;
    device.write_buffer(buffer, 0, bytes)?;
    Ok(buffer)
}

/// Upload `data` into `slot` unless it is empty or already uploaded.
fn upload_missing<T: bytemuck::Pod>(
    device: &mut dyn RenderDevice,
    slot: &mut Option<BufferHandle>,
    label: &str,
    usage: BufferUsage,
    data: &[T],
) -> Result<(), ComputeError> {
    if slot.is_none() && !data.is_empty() {
        *slot = Some(upload(device, label, usage, bytemuck::cast_slice(data))?);
    }
    Ok(())
}
