//! Four-lane kernel.
//!
//! Vertices are processed in groups of four with every component held in a
//! [`Vec4`], one lane per vertex. Groups loop to the deepest weight list in
//! the group; lanes that run out of weights blend with bias zero. The tail
//! group of a mesh simply leaves its unused lanes empty.

use std::ops::Add;

use glam::{Vec3, Vec4};

use super::arena::{Arena, MeshRecord, WeightRecord};
use super::{VERTEX_STRIDE, write_vertex};
use crate::model::JointPose;

const LANES: usize = 4;

#[derive(Clone, Copy)]
struct Vec3x4 {
    x: Vec4,
    y: Vec4,
    z: Vec4,
}

impl Vec3x4 {
    const ZERO: Self = Self {
        x: Vec4::ZERO,
        y: Vec4::ZERO,
        z: Vec4::ZERO,
    };

    fn add_scaled(&mut self, v: Self, s: Vec4) {
        self.x += v.x * s;
        self.y += v.y * s;
        self.z += v.z * s;
    }

    fn lane(&self, i: usize) -> Vec3 {
        Vec3::new(self.x[i], self.y[i], self.z[i])
    }
}

impl Add for Vec3x4 {
    type Output = Self;

    fn add(self, v: Self) -> Self {
        Self {
            x: self.x + v.x,
            y: self.y + v.y,
            z: self.z + v.z,
        }
    }
}

#[derive(Clone, Copy)]
struct Quatx4 {
    x: Vec4,
    y: Vec4,
    z: Vec4,
    w: Vec4,
}

impl Quatx4 {
    /// `v + w*t + q.xyz × t` with `t = 2 (q.xyz × v)`
    fn rotate(&self, v: Vec3x4) -> Vec3x4 {
        let tx = (self.y * v.z - self.z * v.y) * 2.0;
        let ty = (self.z * v.x - self.x * v.z) * 2.0;
        let tz = (self.x * v.y - self.y * v.x) * 2.0;
        Vec3x4 {
            x: v.x + self.w * tx + (self.y * tz - self.z * ty),
            y: v.y + self.w * ty + (self.z * tx - self.x * tz),
            z: v.z + self.w * tz + (self.x * ty - self.y * tx),
        }
    }
}

/// One weight slot gathered across four lanes.
#[derive(Default)]
struct Gather {
    bias: [f32; LANES],
    joint_position: [[f32; LANES]; 3],
    orientation: [[f32; LANES]; 4],
    offset: [[f32; LANES]; 3],
    normal: [[f32; LANES]; 3],
    tangent: [[f32; LANES]; 3],
}

impl Gather {
    fn set(&mut self, lane: usize, weight: &WeightRecord, joint: &JointPose) {
        self.bias[lane] = weight.bias;
        let orientation = joint.orientation.to_array();
        for c in 0..3 {
            self.joint_position[c][lane] = joint.position[c];
            self.offset[c][lane] = weight.position[c];
            self.normal[c][lane] = weight.normal[c];
            self.tangent[c][lane] = weight.tangent[c];
        }
        for (c, value) in orientation.into_iter().enumerate() {
            self.orientation[c][lane] = value;
        }
    }

    fn vec3(components: &[[f32; LANES]; 3]) -> Vec3x4 {
        Vec3x4 {
            x: Vec4::from_array(components[0]),
            y: Vec4::from_array(components[1]),
            z: Vec4::from_array(components[2]),
        }
    }

    fn quat(&self) -> Quatx4 {
        Quatx4 {
            x: Vec4::from_array(self.orientation[0]),
            y: Vec4::from_array(self.orientation[1]),
            z: Vec4::from_array(self.orientation[2]),
            w: Vec4::from_array(self.orientation[3]),
        }
    }
}

pub(super) fn skin_mesh(arena: &Arena, mesh: &MeshRecord, pose: &[JointPose], out: &mut [f32]) {
    let vertices = &arena.vertices()[mesh.vertex_range()];
    let weights = arena.weights();

    for (group, dst) in vertices
        .chunks(LANES)
        .zip(out.chunks_mut(LANES * VERTEX_STRIDE))
    {
        let depth = group.iter().map(|v| v.weight_count).max().unwrap_or(0) as usize;
        let mut position = Vec3x4::ZERO;
        let mut normal = Vec3x4::ZERO;
        let mut tangent = Vec3x4::ZERO;

        for slot in 0..depth {
            let mut gather = Gather::default();
            for (lane, vertex) in group.iter().enumerate() {
                if slot < vertex.weight_count as usize {
                    let weight = &weights[vertex.weight_start as usize + slot];
                    gather.set(lane, weight, &pose[weight.joint as usize]);
                }
            }

            let q = gather.quat();
            let bias = Vec4::from_array(gather.bias);
            let world = Gather::vec3(&gather.joint_position) + q.rotate(Gather::vec3(&gather.offset));
            position.add_scaled(world, bias);
            normal.add_scaled(q.rotate(Gather::vec3(&gather.normal)), bias);
            tangent.add_scaled(q.rotate(Gather::vec3(&gather.tangent)), bias);
        }

        for (lane, (vertex, dst)) in group
            .iter()
            .zip(dst.chunks_exact_mut(VERTEX_STRIDE))
            .enumerate()
        {
            write_vertex(
                dst,
                position.lane(lane),
                vertex.texcoord,
                normal.lane(lane),
                tangent.lane(lane),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_lane_rotate_matches_quat() {
        let rotations = [
            Quat::from_rotation_x(0.3),
            Quat::from_rotation_y(-1.2),
            Quat::from_rotation_z(2.5),
            Quat::from_axis_angle(Vec3::new(1.0, 1.0, 1.0).normalize(), 0.9),
        ];
        let vectors = [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-0.5, 0.0, 4.0),
            Vec3::X,
            Vec3::new(0.1, -0.2, 0.3),
        ];

        let q = Quatx4 {
            x: Vec4::from_array(rotations.map(|q| q.x)),
            y: Vec4::from_array(rotations.map(|q| q.y)),
            z: Vec4::from_array(rotations.map(|q| q.z)),
            w: Vec4::from_array(rotations.map(|q| q.w)),
        };
        let v = Vec3x4 {
            x: Vec4::from_array(vectors.map(|v| v.x)),
            y: Vec4::from_array(vectors.map(|v| v.y)),
            z: Vec4::from_array(vectors.map(|v| v.z)),
        };
        let rotated = q.rotate(v);

        for lane in 0..LANES {
            let expected = rotations[lane] * vectors[lane];
            assert!((rotated.lane(lane) - expected).length() < 1e-5, "lane {lane}");
        }
    }

    #[test]
    fn test_empty_lanes_stay_zero() {
        let empty = Gather::default();
        let rotated = empty.quat().rotate(Gather::vec3(&empty.normal));
        assert_eq!(rotated.lane(0), Vec3::ZERO);
    }
}
