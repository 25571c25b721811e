//! `md5mesh` parser.
//!
//! ```text
//! MD5Version 10
//! commandline ""
//! numJoints 2
//! numMeshes 1
//! joints {
//!     "origin" -1 ( 0 0 0 ) ( 0 0 0 )
//!     "arm"     0 ( 1 0 0 ) ( 0 0 0.7071068 )
//! }
//! mesh {
//!     shader "skin"
//!     numverts 1
//!     vert 0 ( 0 0 ) 0 1
//!     numtris 0
//!     numweights 1
//!     weight 0 1 1.0 ( 1 0 0 )
//! }
//! ```
//!
//! Parsing happens in two passes: the token stream is read into located raw
//! records, then every cross reference is checked before a [`Model`] is
//! built. Nothing is returned unless the whole document is valid.

use glam::{Vec2, Vec3};

use super::lexer::Cursor;
use crate::error::{Error, IndexKind, Location, Result};
use crate::model::{Joint, Mesh, Model, Vertex, Weight};
use crate::utils::quat_from_xyz;

/// Options controlling how strictly a mesh is validated.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Allowed deviation of a vertex's bias sum from 1.0.
    pub bias_tolerance: f32,
    /// Fail with [`Error::BiasSumMismatch`] instead of logging a warning.
    pub strict_bias: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            bias_tolerance: 1e-3,
            strict_bias: false,
        }
    }
}

impl ParseOptions {
    /// Reject vertices whose biases do not sum to one.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict_bias = true;
        self
    }

    #[must_use]
    pub fn with_bias_tolerance(mut self, tolerance: f32) -> Self {
        self.bias_tolerance = tolerance;
        self
    }
}

struct RawVertex {
    at: Location,
    texcoord: Vec2,
    start: i64,
    count: i64,
}

struct RawWeight {
    at: Location,
    joint: i64,
    bias: f32,
    position: Vec3,
}

struct RawMesh {
    at: Location,
    shader: String,
    vertices: Vec<RawVertex>,
    triangles: Vec<(Location, [i64; 3])>,
    weights: Vec<RawWeight>,
}

/// Parse `md5mesh` text with default options.
pub fn parse_mesh(text: &str) -> Result<Model> {
    parse_mesh_with(text, &ParseOptions::default())
}

/// Parse `md5mesh` text.
pub fn parse_mesh_with(text: &str, options: &ParseOptions) -> Result<Model> {
    let mut cursor = Cursor::new(text)?;
    let mut commandline = None;
    let mut declared_joints = None;
    let mut declared_meshes = None;
    let mut joints: Option<(Vec<Joint>, Vec<Location>)> = None;
    let mut meshes = Vec::new();

    while !cursor.is_at_end() {
        let at = cursor.location();
        match cursor.expect_word("section keyword")? {
            "MD5Version" => {
                cursor.begin_record();
                super::expect_version(&mut cursor, at)?;
                cursor.end_record()?;
            }
            "commandline" => {
                cursor.begin_record();
                commandline = Some(cursor.expect_string("command line")?);
                cursor.end_record()?;
            }
            "numJoints" => {
                cursor.begin_record();
                declared_joints = Some((at, cursor.expect_count("joint count")?));
                cursor.end_record()?;
            }
            "numMeshes" => {
                cursor.begin_record();
                declared_meshes = Some((at, cursor.expect_count("mesh count")?));
                cursor.end_record()?;
            }
            "joints" => {
                if joints.is_some() {
                    return Err(Error::malformed(at, "duplicate 'joints' block"));
                }
                joints = Some(parse_joints(&mut cursor, at)?);
            }
            "mesh" => meshes.push(parse_mesh_block(&mut cursor, at)?),
            other => {
                return Err(Error::malformed(at, format!("unknown section '{other}'")));
            }
        }
    }

    let (joints, joint_lines) = joints
        .ok_or_else(|| Error::malformed(Location::EndOfInput, "missing 'joints' block"))?;

    super::check_declared(declared_joints, joints.len(), "numJoints")?;
    super::check_declared(declared_meshes, meshes.len(), "numMeshes")?;
    super::check_single_root(joints.iter().map(|j| j.parent), &joint_lines)?;

    let meshes = meshes
        .into_iter()
        .map(|raw| build_mesh(raw, joints.len(), options))
        .collect::<Result<Vec<_>>>()?;

    let model = Model {
        commandline,
        joints,
        meshes,
    };
    tracing::debug!(
        joints = model.joints.len(),
        meshes = model.meshes.len(),
        vertices = model.vertex_count(),
        triangles = model.triangle_count(),
        weights = model.weight_count(),
        "parsed md5mesh"
    );
    Ok(model)
}

fn parse_joints(cursor: &mut Cursor<'_>, at: Location) -> Result<(Vec<Joint>, Vec<Location>)> {
    cursor.expect_open_brace()?;
    let mut joints = Vec::new();
    let mut lines = Vec::new();

    while !cursor.at_close_brace() {
        let line = cursor.begin_record();
        let name = cursor.expect_string("joint name")?;
        let parent = super::expect_parent(cursor, line, joints.len())?;
        let position = cursor.expect_vec3("joint position")?;
        let q = cursor.expect_vec3("joint orientation")?;
        cursor.end_record()?;

        joints.push(Joint {
            name,
            parent,
            position,
            orientation: quat_from_xyz(q.x, q.y, q.z),
        });
        lines.push(line);
    }
    cursor.expect_close_brace()?;

    if joints.is_empty() {
        return Err(Error::malformed(at, "'joints' block is empty"));
    }
    Ok((joints, lines))
}

fn parse_mesh_block(cursor: &mut Cursor<'_>, at: Location) -> Result<RawMesh> {
    cursor.expect_open_brace()?;
    let mut shader = None;
    let mut declared_verts = None;
    let mut declared_tris = None;
    let mut declared_weights = None;
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    let mut weights = Vec::new();

    while !cursor.at_close_brace() {
        let line = cursor.begin_record();
        match cursor.expect_word("mesh field")? {
            "shader" => shader = Some(cursor.expect_string("shader name")?),
            "numverts" => declared_verts = Some((line, cursor.expect_count("vertex count")?)),
            "numtris" => declared_tris = Some((line, cursor.expect_count("triangle count")?)),
            "numweights" => {
                declared_weights = Some((line, cursor.expect_count("weight count")?));
            }
            "vert" => {
                super::expect_sequence(cursor, line, "vert", vertices.len())?;
                let texcoord = cursor.expect_vec2("texture coordinate")?;
                let start = cursor.expect_int("weight start")?;
                let count = cursor.expect_int("weight count")?;
                vertices.push(RawVertex {
                    at: line,
                    texcoord,
                    start,
                    count,
                });
            }
            "tri" => {
                super::expect_sequence(cursor, line, "tri", triangles.len())?;
                let a = cursor.expect_int("vertex index")?;
                let b = cursor.expect_int("vertex index")?;
                let c = cursor.expect_int("vertex index")?;
                triangles.push((line, [a, b, c]));
            }
            "weight" => {
                super::expect_sequence(cursor, line, "weight", weights.len())?;
                let joint = cursor.expect_int("joint index")?;
                let bias = cursor.expect_f32("bias")?;
                let position = cursor.expect_vec3("weight position")?;
                weights.push(RawWeight {
                    at: line,
                    joint,
                    bias,
                    position,
                });
            }
            other => {
                return Err(Error::malformed(line, format!("unknown mesh field '{other}'")));
            }
        }
        cursor.end_record()?;
    }
    cursor.expect_close_brace()?;

    super::check_declared(declared_verts, vertices.len(), "numverts")?;
    super::check_declared(declared_tris, triangles.len(), "numtris")?;
    super::check_declared(declared_weights, weights.len(), "numweights")?;

    let shader = shader.ok_or_else(|| Error::malformed(at, "mesh block has no 'shader'"))?;
    Ok(RawMesh {
        at,
        shader,
        vertices,
        triangles,
        weights,
    })
}

fn build_mesh(raw: RawMesh, joint_count: usize, options: &ParseOptions) -> Result<Mesh> {
    let weight_total = raw.weights.len();

    let weights = raw
        .weights
        .iter()
        .map(|w| {
            Ok(Weight {
                joint: super::check_index(w.joint, joint_count, IndexKind::Joint, w.at)?,
                bias: w.bias,
                position: w.position,
                normal: Vec3::ZERO,
                tangent: Vec3::ZERO,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut vertices = Vec::with_capacity(raw.vertices.len());
    let mut off_balance = 0usize;
    for (index, v) in raw.vertices.iter().enumerate() {
        let start = super::check_index(v.start, weight_total + 1, IndexKind::Weight, v.at)?;
        let count = usize::try_from(v.count).map_err(|_| {
            Error::malformed(v.at, format!("negative weight count {}", v.count))
        })?;
        if start + count > weight_total {
            return Err(Error::IndexOutOfRange {
                at: v.at,
                kind: IndexKind::Weight,
                index: (start + count - 1) as i64,
                len: weight_total,
            });
        }

        let sum: f32 = weights[start..start + count].iter().map(|w| w.bias).sum();
        if (sum - 1.0).abs() > options.bias_tolerance {
            if options.strict_bias {
                return Err(Error::BiasSumMismatch {
                    at: v.at,
                    vertex: index,
                    sum,
                });
            }
            off_balance += 1;
        }

        vertices.push(Vertex {
            texcoord: v.texcoord,
            weight_start: start,
            weight_count: count,
        });
    }
    if off_balance > 0 {
        tracing::warn!(
            shader = %raw.shader,
            vertices = off_balance,
            "weight biases do not sum to 1.0"
        );
    }

    let triangles = raw
        .triangles
        .iter()
        .map(|(at, tri)| {
            let mut out = [0u32; 3];
            for (slot, &index) in out.iter_mut().zip(tri) {
                *slot = super::check_index(index, vertices.len(), IndexKind::Vertex, *at)? as u32;
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::trace!(at = %raw.at, shader = %raw.shader, "mesh block validated");
    Ok(Mesh {
        shader: raw.shader,
        vertices,
        triangles,
        weights,
    })
}
