//! Bind-pose compilation.
//!
//! Computes rest-pose vertex positions, per-vertex normals and tangents,
//! then stores each vertex's normal and tangent on its weights in the
//! weight's joint space. At runtime the skinning kernels only re-rotate
//! those cached vectors through the posed joints; no triangle data is
//! touched after this step.

#![allow(clippy::float_cmp)]

use glam::{Vec2, Vec3};

use crate::model::{Joint, Mesh, Model};
use crate::utils::{inverse_rotate, rotate};

/// UV-space area below which a triangle contributes no tangent.
const DEGENERATE_UV_EPSILON: f32 = 1e-12;

/// Rest-pose attributes of one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BindVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
}

/// A model whose weights carry joint-space normals and tangents.
///
/// Only a compiled model can be packed into an [`Arena`](super::Arena).
#[derive(Debug, Clone)]
pub struct CompiledModel {
    model: Model,
    bind_vertices: Vec<Vec<BindVertex>>,
}

impl CompiledModel {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Rest-pose attributes for every vertex of mesh `mesh`.
    pub fn bind_vertices(&self, mesh: usize) -> &[BindVertex] {
        &self.bind_vertices[mesh]
    }

    /// Give back the parsed model; its weights keep their joint-space vectors.
    pub fn into_model(self) -> Model {
        self.model
    }
}

impl std::ops::Deref for CompiledModel {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

/// Compute the bind pose of `model` and enrich its weights.
pub fn compile_bind_pose(mut model: Model) -> CompiledModel {
    let joints = &model.joints;
    let mut bind_vertices = Vec::with_capacity(model.meshes.len());
    let mut degenerate = 0usize;

    for mesh in &mut model.meshes {
        let positions = rest_positions(mesh, joints);
        let (normals, tangents, skipped) = vertex_frames(mesh, &positions);
        degenerate += skipped;

        for (index, vertex) in mesh.vertices.iter().enumerate() {
            let normal = normals[index];
            let tangent = tangents[index];
            for weight in &mut mesh.weights[vertex.weight_range()] {
                if weight.bias == 0.0 {
                    continue;
                }
                let orientation = joints[weight.joint].orientation;
                weight.normal = inverse_rotate(orientation, normal);
                weight.tangent = inverse_rotate(orientation, tangent);
            }
        }

        bind_vertices.push(
            positions
                .into_iter()
                .zip(normals)
                .zip(tangents)
                .map(|((position, normal), tangent)| BindVertex {
                    position,
                    normal,
                    tangent,
                })
                .collect(),
        );
    }

    if degenerate > 0 {
        tracing::warn!(
            triangles = degenerate,
            "skipped tangent contribution of triangles with degenerate texture coordinates"
        );
    }
    tracing::debug!(meshes = model.meshes.len(), "compiled bind pose");

    CompiledModel {
        model,
        bind_vertices,
    }
}

fn rest_positions(mesh: &Mesh, joints: &[Joint]) -> Vec<Vec3> {
    mesh.vertices
        .iter()
        .map(|vertex| {
            mesh.weights[vertex.weight_range()]
                .iter()
                .map(|w| {
                    let joint = &joints[w.joint];
                    (joint.position + rotate(joint.orientation, w.position)) * w.bias
                })
                .sum()
        })
        .collect()
}

/// Accumulate face normals and tangents onto vertices, then normalize.
///
/// Returns the number of triangles whose UV mapping was too degenerate to
/// yield a tangent.
fn vertex_frames(mesh: &Mesh, positions: &[Vec3]) -> (Vec<Vec3>, Vec<Vec3>, usize) {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    let mut skipped = 0;

    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| i as usize);
        let e1 = positions[b] - positions[a];
        let e2 = positions[c] - positions[a];

        // md5mesh triangles wind clockwise.
        let normal = e2.cross(e1);

        let tangent = face_tangent(
            e1,
            e2,
            mesh.vertices[b].texcoord - mesh.vertices[a].texcoord,
            mesh.vertices[c].texcoord - mesh.vertices[a].texcoord,
        );
        if tangent.is_none() {
            skipped += 1;
        }

        for i in [a, b, c] {
            normals[i] += normal;
            if let Some(t) = tangent {
                tangents[i] += t;
            }
        }
    }

    for (normal, tangent) in normals.iter_mut().zip(&mut tangents) {
        *normal = normal.normalize_or_zero();
        *tangent = tangent.normalize_or_zero();
        if *tangent == Vec3::ZERO && *normal != Vec3::ZERO {
            *tangent = normal.any_orthonormal_vector();
        }
    }

    (normals, tangents, skipped)
}

/// `(dv2 * e1 - dv1 * e2) / (du1 * dv2 - du2 * dv1)`
fn face_tangent(e1: Vec3, e2: Vec3, duv1: Vec2, duv2: Vec2) -> Option<Vec3> {
    let det = duv1.x * duv2.y - duv2.x * duv1.y;
    if det.abs() < DEGENERATE_UV_EPSILON {
        return None;
    }
    Some((e1 * duv2.y - e2 * duv1.y) / det)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::parse_mesh;

    /// A unit right triangle in the XY plane, joint rotated 90 degrees about Z.
    const QUAD_JOINT: &str = r#"
joints {
    "root" -1 ( 0 0 0 ) ( 0 0 0 )
    "turned" 0 ( 0 0 1 ) ( 0 0 0.70710678 )
}
mesh {
    shader "tri"
    vert 0 ( 0 0 ) 0 1
    vert 1 ( 1 0 ) 1 1
    vert 2 ( 0 1 ) 2 1
    tri 0 0 2 1
    weight 0 0 1.0 ( 0 0 0 )
    weight 1 0 1.0 ( 1 0 0 )
    weight 2 1 1.0 ( 1 0 -1 )
}
"#;

    fn compiled() -> CompiledModel {
        compile_bind_pose(parse_mesh(QUAD_JOINT).unwrap())
    }

    #[test]
    fn test_rest_positions() {
        let model = compiled();
        let verts = model.bind_vertices(0);
        assert!((verts[0].position - Vec3::ZERO).length() < 1e-5);
        assert!((verts[1].position - Vec3::X).length() < 1e-5);
        // joint at (0,0,1) rotated 90° about Z maps (1,0,-1) to (0,1,-1)
        assert!((verts[2].position - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_face_normal_and_tangent() {
        let model = compiled();
        for v in model.bind_vertices(0) {
            assert!((v.normal - Vec3::Z).length() < 1e-5, "normal {:?}", v.normal);
            assert!((v.tangent - Vec3::X).length() < 1e-5, "tangent {:?}", v.tangent);
        }
    }

    #[test]
    fn test_weights_store_joint_space_vectors() {
        let model = compiled();
        let mesh = &model.meshes()[0];
        // Root joint is identity: vectors unchanged.
        assert!((mesh.weights[0].normal - Vec3::Z).length() < 1e-5);
        assert!((mesh.weights[0].tangent - Vec3::X).length() < 1e-5);
        // Turned joint: world X is local -Y.
        assert!((mesh.weights[2].tangent - Vec3::NEG_Y).length() < 1e-5);
        assert!((mesh.weights[2].normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_zero_bias_weight_left_untouched() {
        let text = QUAD_JOINT
            .replace("vert 2 ( 0 1 ) 2 1", "vert 2 ( 0 1 ) 2 2")
            .replace(
                "weight 2 1 1.0 ( 1 0 -1 )",
                "weight 2 1 1.0 ( 1 0 -1 )\n    weight 3 0 0.0 ( 5 5 5 )",
            );
        let model = compile_bind_pose(parse_mesh(&text).unwrap());
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.weights[3].normal, Vec3::ZERO);
        assert_eq!(mesh.weights[3].tangent, Vec3::ZERO);
    }

    #[test]
    fn test_degenerate_uvs_fall_back_to_orthogonal_tangent() {
        let text = QUAD_JOINT
            .replace("vert 1 ( 1 0 )", "vert 1 ( 0 0 )")
            .replace("vert 2 ( 0 1 )", "vert 2 ( 0 0 )");
        let model = compile_bind_pose(parse_mesh(&text).unwrap());
        for v in model.bind_vertices(0) {
            assert!((v.tangent.length() - 1.0).abs() < 1e-5);
            assert!(v.tangent.dot(v.normal).abs() < 1e-5);
        }
    }

    #[test]
    fn test_face_tangent_formula() {
        let t = face_tangent(Vec3::X, Vec3::Y, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)).unwrap();
        assert!((t - Vec3::X).length() < 1e-6);
        assert!(face_tangent(Vec3::X, Vec3::Y, Vec2::ZERO, Vec2::ZERO).is_none());
    }
}
