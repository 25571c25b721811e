//! Linear-blend skinning over a packed [`Arena`].
//!
//! Two kernels read the same arena records and produce the same output:
//! [`Kernel::Scalar`] walks one vertex at a time, [`Kernel::Wide`] blends
//! four vertices per step in structure-of-arrays lanes. Both write an
//! interleaved buffer of [`VERTEX_STRIDE`] floats per vertex:
//!
//! ```text
//! position.xyz | texcoord.uv | normal.xyz | tangent.xyz
//! ```

pub mod arena;
pub mod bind_pose;
mod scalar;
mod wide;

pub use arena::{Arena, ArenaLayout, pack};
pub use bind_pose::{BindVertex, CompiledModel, compile_bind_pose};

use std::fmt;
use std::str::FromStr;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::JointPose;
use arena::MeshRecord;

/// Floats per skinned vertex.
pub const VERTEX_STRIDE: usize = 11;

const POSITION: usize = 0;
const TEXCOORD: usize = 3;
const NORMAL: usize = 5;
const TANGENT: usize = 8;

/// Which skinning kernel to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    #[default]
    Scalar,
    Wide,
}

impl FromStr for Kernel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scalar" => Ok(Kernel::Scalar),
            "wide" | "simd" | "vector" => Ok(Kernel::Wide),
            _ => Err(format!("Invalid kernel '{s}'. Valid: scalar, wide")),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kernel::Scalar => "scalar",
            Kernel::Wide => "wide",
        })
    }
}

/// Options for [`skin_into`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SkinOptions {
    pub kernel: Kernel,
    /// Skin meshes on the rayon thread pool.
    pub parallel: bool,
}

impl SkinOptions {
    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Interleaved skinned vertices, [`VERTEX_STRIDE`] floats each.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexBuffer {
    data: Vec<f32>,
}

impl VertexBuffer {
    /// A zeroed buffer for `vertex_count` vertices.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            data: vec![0.0; vertex_count * VERTEX_STRIDE],
        }
    }

    /// A zeroed buffer sized for `arena`.
    pub fn for_arena(arena: &Arena) -> Self {
        Self::new(arena.vertex_count())
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / VERTEX_STRIDE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// The buffer as little-endian bytes, regardless of host order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn vertex(&self, index: usize) -> &[f32] {
        &self.data[index * VERTEX_STRIDE..(index + 1) * VERTEX_STRIDE]
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertex(index)[POSITION..])
    }

    pub fn texcoord(&self, index: usize) -> Vec2 {
        Vec2::from_slice(&self.vertex(index)[TEXCOORD..])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertex(index)[NORMAL..])
    }

    pub fn tangent(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertex(index)[TANGENT..])
    }

    /// Largest absolute component difference to `other`, or `None` when the
    /// buffers differ in length.
    pub fn max_abs_diff(&self, other: &VertexBuffer) -> Option<f32> {
        (self.data.len() == other.data.len()).then(|| {
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f32::max)
        })
    }
}

pub(crate) fn write_vertex(dst: &mut [f32], position: Vec3, texcoord: [f32; 2], normal: Vec3, tangent: Vec3) {
    position.write_to_slice(&mut dst[POSITION..TEXCOORD]);
    dst[TEXCOORD..NORMAL].copy_from_slice(&texcoord);
    normal.write_to_slice(&mut dst[NORMAL..TANGENT]);
    tangent.write_to_slice(&mut dst[TANGENT..VERTEX_STRIDE]);
}

type MeshKernel = fn(&Arena, &MeshRecord, &[JointPose], &mut [f32]);

/// Skin `arena` under `pose` into a freshly allocated buffer.
pub fn skin(arena: &Arena, pose: &[JointPose], kernel: Kernel) -> Result<VertexBuffer> {
    let mut out = VertexBuffer::for_arena(arena);
    skin_into(
        arena,
        pose,
        &SkinOptions::default().with_kernel(kernel),
        &mut out,
    )?;
    Ok(out)
}

/// Skin `arena` under `pose` into `out`, reusing its allocation.
///
/// `pose` holds one object-space transform per arena joint; `out` must be
/// sized for the arena's vertex count.
pub fn skin_into(
    arena: &Arena,
    pose: &[JointPose],
    options: &SkinOptions,
    out: &mut VertexBuffer,
) -> Result<()> {
    if pose.len() != arena.joint_count() {
        return Err(Error::PoseMismatch {
            expected: arena.joint_count(),
            found: pose.len(),
        });
    }
    let expected = arena.vertex_count() * VERTEX_STRIDE;
    if out.data.len() != expected {
        return Err(Error::VertexBufferMismatch {
            expected,
            found: out.data.len(),
        });
    }

    tracing::debug!(
        kernel = %options.kernel,
        parallel = options.parallel,
        meshes = arena.mesh_count(),
        "skinning"
    );

    let kernel: MeshKernel = match options.kernel {
        Kernel::Scalar => scalar::skin_mesh,
        Kernel::Wide => wide::skin_mesh,
    };

    // Meshes are contiguous in vertex order, so the output splits into
    // disjoint per-mesh slices.
    let mut rest = out.data.as_mut_slice();
    let mut jobs = Vec::with_capacity(arena.mesh_count());
    for mesh in arena.meshes() {
        let (head, tail) =
            std::mem::take(&mut rest).split_at_mut(mesh.vertex_count as usize * VERTEX_STRIDE);
        jobs.push((mesh, head));
        rest = tail;
    }

    if options.parallel {
        jobs.into_par_iter()
            .for_each(|(mesh, dst)| kernel(arena, mesh, pose, dst));
    } else {
        for (mesh, dst) in jobs {
            kernel(arena, mesh, pose, dst);
        }
    }
    Ok(())
}
