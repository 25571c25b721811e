//! In-memory skeletal model: joints, meshes, vertices, weights.
//!
//! Everything here is produced by the parsers in [`crate::formats::md5`]
//! and is fully validated before it is returned, so downstream stages can
//! index without re-checking.

pub mod anim;

pub use anim::{AnimationClip, BaseFrameEntry, Bounds, ChannelMask, HierarchyEntry};

use glam::{Quat, Vec2, Vec3};

/// A node of the skeleton in bind pose (object space).
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Parent joint, `None` for the root. Always lower than this joint's index.
    pub parent: Option<usize>,
    pub position: Vec3,
    pub orientation: Quat,
}

impl Joint {
    /// The rigid transform of this joint as a pose entry.
    pub fn pose(&self) -> JointPose {
        JointPose::new(self.position, self.orientation)
    }
}

/// A rigid joint transform: the unit of input to skinning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl JointPose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

impl Default for JointPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A mesh vertex: texture coordinate and a range into the mesh's weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub texcoord: Vec2,
    pub weight_start: usize,
    pub weight_count: usize,
}

impl Vertex {
    pub fn weight_range(&self) -> std::ops::Range<usize> {
        self.weight_start..self.weight_start + self.weight_count
    }
}

/// One joint's contribution to a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub joint: usize,
    pub bias: f32,
    /// Bind-pose offset in the joint's local space.
    pub position: Vec3,
    /// Vertex normal in the joint's local space, filled by bind-pose compilation.
    pub normal: Vec3,
    /// Vertex tangent in the joint's local space, filled by bind-pose compilation.
    pub tangent: Vec3,
}

/// A mesh with one material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub shader: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
    pub weights: Vec<Weight>,
}

impl Mesh {
    /// The weights belonging to vertex `index`.
    pub fn weights_of(&self, index: usize) -> &[Weight] {
        &self.weights[self.vertices[index].weight_range()]
    }
}

/// A parsed skeletal model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub(crate) commandline: Option<String>,
    pub(crate) joints: Vec<Joint>,
    pub(crate) meshes: Vec<Mesh>,
}

impl Model {
    pub fn commandline(&self) -> Option<&str> {
        self.commandline.as_deref()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }

    pub fn weight_count(&self) -> usize {
        self.meshes.iter().map(|m| m.weights.len()).sum()
    }

    /// The rest pose of the skeleton.
    pub fn bind_pose(&self) -> Vec<JointPose> {
        self.joints.iter().map(Joint::pose).collect()
    }

    /// Index of the joint called `name`.
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }
}
