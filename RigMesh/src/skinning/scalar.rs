//! Reference kernel: one vertex at a time.

use glam::Vec3;

use super::arena::{Arena, MeshRecord};
use super::{VERTEX_STRIDE, write_vertex};
use crate::model::JointPose;
use crate::utils::rotate;

pub(super) fn skin_mesh(arena: &Arena, mesh: &MeshRecord, pose: &[JointPose], out: &mut [f32]) {
    let vertices = &arena.vertices()[mesh.vertex_range()];
    let weights = arena.weights();

    for (vertex, dst) in vertices.iter().zip(out.chunks_exact_mut(VERTEX_STRIDE)) {
        let mut position = Vec3::ZERO;
        let mut normal = Vec3::ZERO;
        let mut tangent = Vec3::ZERO;

        for weight in &weights[vertex.weight_range()] {
            let joint = &pose[weight.joint as usize];
            let q = joint.orientation;
            position += (joint.position + rotate(q, Vec3::from_array(weight.position))) * weight.bias;
            normal += rotate(q, Vec3::from_array(weight.normal)) * weight.bias;
            tangent += rotate(q, Vec3::from_array(weight.tangent)) * weight.bias;
        }

        write_vertex(dst, position, vertex.texcoord, normal, tangent);
    }
}
