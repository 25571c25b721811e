//! Serializable summaries of models and clips.

use serde::Serialize;

use crate::model::{AnimationClip, Model};

/// Summary of a parsed `.md5mesh`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub commandline: Option<String>,
    pub joint_count: usize,
    pub mesh_count: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub weight_count: usize,
    pub joints: Vec<JointInfo>,
    pub meshes: Vec<MeshInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JointInfo {
    pub name: String,
    pub parent: Option<usize>,
    pub position: [f32; 3],
    /// `x, y, z, w`
    pub orientation: [f32; 4],
}

#[derive(Debug, Clone, Serialize)]
pub struct MeshInfo {
    pub shader: String,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub weight_count: usize,
    pub max_weights_per_vertex: usize,
}

impl ModelInfo {
    pub fn from_model(model: &Model) -> Self {
        let joints = model
            .joints()
            .iter()
            .map(|j| JointInfo {
                name: j.name.clone(),
                parent: j.parent,
                position: j.position.to_array(),
                orientation: j.orientation.to_array(),
            })
            .collect();
        let meshes = model
            .meshes()
            .iter()
            .map(|m| MeshInfo {
                shader: m.shader.clone(),
                vertex_count: m.vertices.len(),
                triangle_count: m.triangles.len(),
                weight_count: m.weights.len(),
                max_weights_per_vertex: m
                    .vertices
                    .iter()
                    .map(|v| v.weight_count)
                    .max()
                    .unwrap_or(0),
            })
            .collect();

        Self {
            commandline: model.commandline().map(str::to_string),
            joint_count: model.joints().len(),
            mesh_count: model.meshes().len(),
            vertex_count: model.vertex_count(),
            triangle_count: model.triangle_count(),
            weight_count: model.weight_count(),
            joints,
            meshes,
        }
    }
}

/// Summary of a parsed `.md5anim`.
#[derive(Debug, Clone, Serialize)]
pub struct AnimationInfo {
    pub commandline: Option<String>,
    pub frame_count: usize,
    pub frame_rate: u32,
    pub duration_seconds: f32,
    pub components_per_frame: usize,
    pub has_bounds: bool,
    pub hierarchy: Vec<ChannelInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub parent: Option<usize>,
    /// Animated channels, e.g. `"tx ty qz"`.
    pub channels: String,
    pub offset: usize,
}

impl AnimationInfo {
    pub fn from_clip(clip: &AnimationClip) -> Self {
        const NAMES: [&str; 6] = ["tx", "ty", "tz", "qx", "qy", "qz"];

        let hierarchy = clip
            .hierarchy()
            .iter()
            .map(|h| ChannelInfo {
                name: h.name.clone(),
                parent: h.parent,
                channels: crate::model::ChannelMask::ORDER
                    .iter()
                    .zip(NAMES)
                    .filter(|(bit, _)| h.mask.contains(**bit))
                    .map(|(_, name)| name)
                    .collect::<Vec<_>>()
                    .join(" "),
                offset: h.offset,
            })
            .collect();

        Self {
            commandline: clip.commandline().map(str::to_string),
            frame_count: clip.frame_count(),
            frame_rate: clip.frame_rate(),
            duration_seconds: clip.duration(),
            components_per_frame: clip.components_per_frame(),
            has_bounds: clip.bounds(0).is_some(),
            hierarchy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{parse_anim, parse_mesh};

    #[test]
    fn test_model_info_counts() {
        let text = r#"
commandline "mesh export"
joints {
    "root" -1 ( 0 0 0 ) ( 0 0 0 )
    "tip" 0 ( 0 0 1 ) ( 0 0 0 )
}
mesh {
    shader "skin"
    vert 0 ( 0 0 ) 0 2
    vert 1 ( 1 0 ) 2 1
    vert 2 ( 0 1 ) 3 1
    tri 0 0 2 1
    weight 0 0 0.5 ( 0 0 0 )
    weight 1 1 0.5 ( 0 0 0 )
    weight 2 0 1.0 ( 1 0 0 )
    weight 3 1 1.0 ( 0 1 0 )
}
"#;
        let info = ModelInfo::from_model(&parse_mesh(text).unwrap());
        assert_eq!(info.commandline.as_deref(), Some("mesh export"));
        assert_eq!(info.joint_count, 2);
        assert_eq!(info.joints[1].parent, Some(0));
        assert_eq!(info.meshes[0].max_weights_per_vertex, 2);
        assert_eq!(info.weight_count, 4);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["meshes"][0]["shader"], "skin");
    }

    #[test]
    fn test_animation_info_channels() {
        let text = r#"
frameRate 10
hierarchy {
    "root" -1 41 0
}
baseframe {
    ( 0 0 0 ) ( 0 0 0 )
}
frame 0 { 1 2 3 }
frame 1 { 1 2 3 }
"#;
        let info = AnimationInfo::from_clip(&parse_anim(text).unwrap());
        assert_eq!(info.hierarchy[0].channels, "tx qx qz");
        assert_eq!(info.frame_count, 2);
        assert!(!info.has_bounds);
        assert!((info.duration_seconds - 0.2).abs() < 1e-6);
    }
}
