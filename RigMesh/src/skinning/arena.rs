//! Flat, position-independent storage for a compiled model.
//!
//! All records live in one 4-byte aligned word buffer addressed by offsets
//! computed in [`ArenaLayout`]. The same layout is shared by both skinning
//! kernels, and [`Arena::as_bytes`] / [`Arena::from_bytes`] move the whole
//! thing as a single blob.
//!
//! ```text
//! +--------+--------+----------+---------+--------+---------+
//! | header | meshes | vertices | weights | joints | indices |
//! +--------+--------+----------+---------+--------+---------+
//! ```
//!
//! Record indices stored in the arena are absolute: a vertex's
//! `weight_start` and every index in the index buffer already include the
//! base of their mesh.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use super::VERTEX_STRIDE;
use super::bind_pose::CompiledModel;
use crate::error::{Error, Result};
use crate::model::JointPose;

/// `"RMAR"` in little-endian byte order.
pub const ARENA_MAGIC: u32 = u32::from_le_bytes(*b"RMAR");
pub const ARENA_VERSION: u32 = 1;

/// Largest vertex count a 16-bit index buffer can address.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ArenaHeader {
    pub magic: u32,
    pub version: u32,
    pub mesh_count: u32,
    pub joint_count: u32,
    pub vertex_count: u32,
    pub weight_count: u32,
    pub index_count: u32,
    /// Length of the whole arena in 32-bit words.
    pub total_words: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshRecord {
    pub vertex_base: u32,
    pub vertex_count: u32,
    pub weight_base: u32,
    pub weight_count: u32,
    pub index_base: u32,
    pub index_count: u32,
}

impl MeshRecord {
    pub fn vertex_range(&self) -> Range<usize> {
        let base = self.vertex_base as usize;
        base..base + self.vertex_count as usize
    }

    pub fn weight_range(&self) -> Range<usize> {
        let base = self.weight_base as usize;
        base..base + self.weight_count as usize
    }

    pub fn index_range(&self) -> Range<usize> {
        let base = self.index_base as usize;
        base..base + self.index_count as usize
    }

    /// Range of this mesh's floats in a skinned vertex buffer.
    pub fn output_range(&self) -> Range<usize> {
        let range = self.vertex_range();
        range.start * VERTEX_STRIDE..range.end * VERTEX_STRIDE
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexRecord {
    pub texcoord: [f32; 2],
    /// Absolute index of the first weight.
    pub weight_start: u32,
    pub weight_count: u32,
}

impl VertexRecord {
    pub fn weight_range(&self) -> Range<usize> {
        let start = self.weight_start as usize;
        start..start + self.weight_count as usize
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WeightRecord {
    pub joint: u32,
    pub bias: f32,
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    _pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct JointRecord {
    pub position: [f32; 3],
    _pad: f32,
    /// `x, y, z, w`
    pub orientation: [f32; 4],
}

impl JointRecord {
    pub fn pose(&self) -> JointPose {
        JointPose::new(
            Vec3::from_array(self.position),
            Quat::from_array(self.orientation),
        )
    }
}

const fn words_of<T>() -> usize {
    size_of::<T>() / size_of::<u32>()
}

/// Word offsets of every arena section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaLayout {
    pub mesh_offset: usize,
    pub vertex_offset: usize,
    pub weight_offset: usize,
    pub joint_offset: usize,
    pub index_offset: usize,
    pub total_words: usize,
}

impl ArenaLayout {
    pub fn new(
        mesh_count: usize,
        vertex_count: usize,
        weight_count: usize,
        joint_count: usize,
        index_count: usize,
    ) -> Self {
        let mesh_offset = words_of::<ArenaHeader>();
        let vertex_offset = mesh_offset + mesh_count * words_of::<MeshRecord>();
        let weight_offset = vertex_offset + vertex_count * words_of::<VertexRecord>();
        let joint_offset = weight_offset + weight_count * words_of::<WeightRecord>();
        let index_offset = joint_offset + joint_count * words_of::<JointRecord>();
        // u16 indices, padded to a whole word
        let total_words = index_offset + index_count.div_ceil(2);
        Self {
            mesh_offset,
            vertex_offset,
            weight_offset,
            joint_offset,
            index_offset,
            total_words,
        }
    }

    pub fn from_header(header: &ArenaHeader) -> Self {
        Self::new(
            header.mesh_count as usize,
            header.vertex_count as usize,
            header.weight_count as usize,
            header.joint_count as usize,
            header.index_count as usize,
        )
    }

    fn meshes(&self) -> Range<usize> {
        self.mesh_offset..self.vertex_offset
    }

    fn vertices(&self) -> Range<usize> {
        self.vertex_offset..self.weight_offset
    }

    fn weights(&self) -> Range<usize> {
        self.weight_offset..self.joint_offset
    }

    fn joints(&self) -> Range<usize> {
        self.joint_offset..self.index_offset
    }

    fn indices(&self) -> Range<usize> {
        self.index_offset..self.total_words
    }
}

/// A packed, immutable model ready for skinning.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    words: Vec<u32>,
    layout: ArenaLayout,
}

impl Arena {
    pub fn header(&self) -> &ArenaHeader {
        &bytemuck::cast_slice::<u32, ArenaHeader>(&self.words[..words_of::<ArenaHeader>()])[0]
    }

    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    pub fn meshes(&self) -> &[MeshRecord] {
        bytemuck::cast_slice(&self.words[self.layout.meshes()])
    }

    pub fn vertices(&self) -> &[VertexRecord] {
        bytemuck::cast_slice(&self.words[self.layout.vertices()])
    }

    pub fn weights(&self) -> &[WeightRecord] {
        bytemuck::cast_slice(&self.words[self.layout.weights()])
    }

    pub fn joints(&self) -> &[JointRecord] {
        bytemuck::cast_slice(&self.words[self.layout.joints()])
    }

    /// The 16-bit triangle index buffer for all meshes, in mesh order.
    pub fn index_buffer(&self) -> &[u16] {
        let indices: &[u16] = bytemuck::cast_slice(&self.words[self.layout.indices()]);
        &indices[..self.header().index_count as usize]
    }

    pub fn mesh_count(&self) -> usize {
        self.header().mesh_count as usize
    }

    pub fn joint_count(&self) -> usize {
        self.header().joint_count as usize
    }

    pub fn vertex_count(&self) -> usize {
        self.header().vertex_count as usize
    }

    /// The skeleton's bind pose as stored in the arena.
    pub fn bind_pose(&self) -> Vec<JointPose> {
        self.joints().iter().map(JointRecord::pose).collect()
    }

    /// Per-mesh ranges into the skinned vertex buffer and the index buffer.
    pub fn mesh_ranges(&self) -> Vec<(Range<usize>, Range<usize>)> {
        self.meshes()
            .iter()
            .map(|m| (m.output_range(), m.index_range()))
            .collect()
    }

    /// The arena as raw bytes, native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Rebuild an arena from bytes produced by [`Arena::as_bytes`].
    ///
    /// Every record is checked, so a successful load can be skinned without
    /// bounds surprises.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % size_of::<u32>() != 0 {
            return Err(Error::invalid_arena(format!(
                "length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        if bytes.len() < size_of::<ArenaHeader>() {
            return Err(Error::invalid_arena("truncated header"));
        }
        let mut words = vec![0u32; bytes.len() / size_of::<u32>()];
        bytemuck::cast_slice_mut::<u32, u8>(&mut words).copy_from_slice(bytes);
        let header: ArenaHeader =
            bytemuck::cast_slice::<u32, ArenaHeader>(&words[..words_of::<ArenaHeader>()])[0];

        if header.magic != ARENA_MAGIC {
            return Err(Error::invalid_arena(format!(
                "bad magic {:#010x}",
                header.magic
            )));
        }
        if header.version != ARENA_VERSION {
            return Err(Error::invalid_arena(format!(
                "unsupported version {}",
                header.version
            )));
        }
        let layout = ArenaLayout::from_header(&header);
        if layout.total_words != words.len() || header.total_words as usize != words.len() {
            return Err(Error::invalid_arena(format!(
                "expected {} words, found {}",
                layout.total_words,
                words.len()
            )));
        }

        let arena = Self { words, layout };
        arena.validate()?;
        Ok(arena)
    }

    fn validate(&self) -> Result<()> {
        let header = self.header();
        let (vertex_total, weight_total, index_total, joint_total) = (
            header.vertex_count as usize,
            header.weight_count as usize,
            header.index_count as usize,
            header.joint_count as usize,
        );
        if vertex_total > MAX_VERTICES {
            return Err(Error::invalid_arena(format!(
                "{vertex_total} vertices exceed 16-bit indexing"
            )));
        }

        let (mut vertex_next, mut weight_next, mut index_next) = (0, 0, 0);
        for (i, mesh) in self.meshes().iter().enumerate() {
            if mesh.vertex_base as usize != vertex_next
                || mesh.weight_base as usize != weight_next
                || mesh.index_base as usize != index_next
            {
                return Err(Error::invalid_arena(format!("mesh {i} is not contiguous")));
            }
            if mesh.index_count % 3 != 0 {
                return Err(Error::invalid_arena(format!(
                    "mesh {i} index count {} is not a multiple of 3",
                    mesh.index_count
                )));
            }
            vertex_next = mesh.vertex_range().end;
            weight_next = mesh.weight_range().end;
            index_next = mesh.index_range().end;
            if vertex_next > vertex_total || weight_next > weight_total || index_next > index_total
            {
                return Err(Error::invalid_arena(format!("mesh {i} overruns its sections")));
            }

            let weights = mesh.weight_range();
            for (v, vertex) in self.vertices()[mesh.vertex_range()].iter().enumerate() {
                let range = vertex.weight_range();
                if range.start < weights.start || range.end > weights.end {
                    return Err(Error::invalid_arena(format!(
                        "mesh {i} vertex {v} weights {range:?} outside {weights:?}"
                    )));
                }
            }
            let vertices = mesh.vertex_range();
            if let Some(bad) = self.index_buffer()[mesh.index_range()]
                .iter()
                .find(|&&ix| !vertices.contains(&(ix as usize)))
            {
                return Err(Error::invalid_arena(format!(
                    "mesh {i} index {bad} outside {vertices:?}"
                )));
            }
        }
        if (vertex_next, weight_next, index_next) != (vertex_total, weight_total, index_total) {
            return Err(Error::invalid_arena("meshes do not cover every record"));
        }

        if let Some((w, weight)) = self
            .weights()
            .iter()
            .enumerate()
            .find(|(_, w)| w.joint as usize >= joint_total)
        {
            return Err(Error::invalid_arena(format!(
                "weight {w} references joint {} of {joint_total}",
                weight.joint
            )));
        }
        Ok(())
    }
}

/// Pack a compiled model into an [`Arena`].
///
/// Fails with [`Error::IndexBufferOverflow`] when the model has more
/// vertices than a 16-bit index can reach.
pub fn pack(model: &CompiledModel) -> Result<Arena> {
    let vertex_count = model.vertex_count();
    if vertex_count > MAX_VERTICES {
        return Err(Error::IndexBufferOverflow { vertex_count });
    }
    let meshes = model.meshes();
    let weight_count = model.weight_count();
    let index_count = model.triangle_count() * 3;
    let joints = model.joints();

    let layout = ArenaLayout::new(
        meshes.len(),
        vertex_count,
        weight_count,
        joints.len(),
        index_count,
    );
    let mut words = vec![0u32; layout.total_words];

    // Every count below is bounded by MAX_VERTICES or by data that already
    // fits in memory as u32 offsets.
    let to_u32 = |n: usize| {
        u32::try_from(n).map_err(|_| Error::invalid_arena(format!("count {n} exceeds u32")))
    };

    let header = ArenaHeader {
        magic: ARENA_MAGIC,
        version: ARENA_VERSION,
        mesh_count: to_u32(meshes.len())?,
        joint_count: to_u32(joints.len())?,
        vertex_count: to_u32(vertex_count)?,
        weight_count: to_u32(weight_count)?,
        index_count: to_u32(index_count)?,
        total_words: to_u32(layout.total_words)?,
    };
    bytemuck::cast_slice_mut::<u32, ArenaHeader>(&mut words[..layout.mesh_offset])[0] = header;

    let (mut vertex_base, mut weight_base, mut index_base) = (0usize, 0usize, 0usize);
    {
        let (head, tail) = words.split_at_mut(layout.vertex_offset);
        let mesh_records: &mut [MeshRecord] = bytemuck::cast_slice_mut(&mut head[layout.meshes()]);
        let (vertex_words, tail) = tail.split_at_mut(layout.weight_offset - layout.vertex_offset);
        let vertex_records: &mut [VertexRecord] = bytemuck::cast_slice_mut(vertex_words);
        let (weight_words, tail) = tail.split_at_mut(layout.joint_offset - layout.weight_offset);
        let weight_records: &mut [WeightRecord] = bytemuck::cast_slice_mut(weight_words);
        let (joint_words, index_words) = tail.split_at_mut(layout.index_offset - layout.joint_offset);
        let joint_records: &mut [JointRecord] = bytemuck::cast_slice_mut(joint_words);
        let index_records: &mut [u16] = bytemuck::cast_slice_mut(index_words);

        for (record, joint) in joint_records.iter_mut().zip(joints) {
            *record = JointRecord {
                position: joint.position.to_array(),
                _pad: 0.0,
                orientation: joint.orientation.to_array(),
            };
        }

        for (mesh, record) in meshes.iter().zip(mesh_records.iter_mut()) {
            *record = MeshRecord {
                vertex_base: to_u32(vertex_base)?,
                vertex_count: to_u32(mesh.vertices.len())?,
                weight_base: to_u32(weight_base)?,
                weight_count: to_u32(mesh.weights.len())?,
                index_base: to_u32(index_base)?,
                index_count: to_u32(mesh.triangles.len() * 3)?,
            };

            for (slot, vertex) in vertex_records[vertex_base..].iter_mut().zip(&mesh.vertices) {
                *slot = VertexRecord {
                    texcoord: vertex.texcoord.to_array(),
                    weight_start: to_u32(weight_base + vertex.weight_start)?,
                    weight_count: to_u32(vertex.weight_count)?,
                };
            }
            for (slot, weight) in weight_records[weight_base..].iter_mut().zip(&mesh.weights) {
                *slot = WeightRecord {
                    joint: to_u32(weight.joint)?,
                    bias: weight.bias,
                    position: weight.position.to_array(),
                    normal: weight.normal.to_array(),
                    tangent: weight.tangent.to_array(),
                    _pad: 0,
                };
            }
            let indices = mesh.triangles.iter().flatten();
            for (slot, &index) in index_records[index_base..].iter_mut().zip(indices) {
                // vertex_count <= MAX_VERTICES, so every rebased index fits
                *slot = (vertex_base + index as usize) as u16;
            }

            vertex_base += mesh.vertices.len();
            weight_base += mesh.weights.len();
            index_base += mesh.triangles.len() * 3;
        }
    }

    tracing::debug!(
        words = layout.total_words,
        meshes = meshes.len(),
        vertices = vertex_count,
        "packed arena"
    );
    Ok(Arena { words, layout })
}
