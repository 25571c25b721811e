//! A compiled, packed model ready to be posed.

use crate::animation::reconstruct_pose_into;
use crate::error::Result;
use crate::formats::{ParseOptions, parse_mesh_with};
use crate::model::{AnimationClip, JointPose, Model};
use crate::skinning::{
    Arena, CompiledModel, SkinOptions, VertexBuffer, compile_bind_pose, pack, skin_into,
};

/// Owns a [`CompiledModel`] and its [`Arena`] and skins them on demand.
///
/// ```
/// use rigmesh::rig::SkinnedModel;
///
/// let text = r#"
/// joints {
///     "root" -1 ( 0 0 0 ) ( 0 0 0 )
/// }
/// mesh {
///     shader "skin"
///     vert 0 ( 0 0 ) 0 1
///     weight 0 0 1.0 ( 1 2 3 )
/// }
/// "#;
/// let rig = SkinnedModel::from_text(text)?;
/// let mut out = rig.new_vertex_buffer();
/// rig.skin_bind_pose(&mut out)?;
/// assert!((out.position(0) - glam::Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
/// # Ok::<(), rigmesh::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SkinnedModel {
    model: CompiledModel,
    arena: Arena,
    options: SkinOptions,
}

impl SkinnedModel {
    /// Compile and pack a parsed model.
    pub fn from_model(model: Model) -> Result<Self> {
        let model = compile_bind_pose(model);
        let arena = pack(&model)?;
        Ok(Self {
            model,
            arena,
            options: SkinOptions::default(),
        })
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_text_with(text, &ParseOptions::default())
    }

    pub fn from_text_with(text: &str, options: &ParseOptions) -> Result<Self> {
        Self::from_model(parse_mesh_with(text, options)?)
    }

    #[must_use]
    pub fn with_options(mut self, options: SkinOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SkinOptions {
        &self.options
    }

    pub fn model(&self) -> &CompiledModel {
        &self.model
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn index_buffer(&self) -> &[u16] {
        self.arena.index_buffer()
    }

    /// A zeroed buffer sized for this model.
    pub fn new_vertex_buffer(&self) -> VertexBuffer {
        VertexBuffer::for_arena(&self.arena)
    }

    /// Skin with an explicit object-space pose.
    pub fn skin_pose(&self, pose: &[JointPose], out: &mut VertexBuffer) -> Result<()> {
        skin_into(&self.arena, pose, &self.options, out)
    }

    pub fn skin_bind_pose(&self, out: &mut VertexBuffer) -> Result<()> {
        self.skin_pose(&self.arena.bind_pose(), out)
    }

    /// Check that `clip` can drive this model's skeleton.
    pub fn check_clip(&self, clip: &AnimationClip) -> Result<()> {
        clip.check_compatible(&self.model)
    }

    /// Reconstruct frame `frame` of `clip` and skin it.
    ///
    /// Only the joint count is checked here; call [`check_clip`](Self::check_clip)
    /// once up front to also compare names and parents.
    pub fn skin_frame(
        &self,
        clip: &AnimationClip,
        frame: usize,
        out: &mut VertexBuffer,
    ) -> Result<()> {
        let mut pose = Vec::with_capacity(clip.joint_count());
        reconstruct_pose_into(clip, frame, &mut pose);
        self.skin_pose(&pose, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::formats::parse_anim;
    use crate::skinning::Kernel;
    use glam::Vec3;

    const ARM: &str = r#"
joints {
    "root" -1 ( 0 0 0 ) ( 0 0 0 )
    "arm" 0 ( 1 0 0 ) ( 0 0 0 )
}
mesh {
    shader "arm"
    vert 0 ( 0 0 ) 0 1
    vert 1 ( 1 0 ) 1 1
    vert 2 ( 0 1 ) 2 1
    tri 0 0 2 1
    weight 0 0 1.0 ( 0 0 0 )
    weight 1 1 1.0 ( 1 0 0 )
    weight 2 1 1.0 ( 0 1 0 )
}
"#;

    const LIFT: &str = r#"
numFrames 2
frameRate 30
hierarchy {
    "root" -1 0 0
    "arm" 0 4 0
}
baseframe {
    ( 0 0 0 ) ( 0 0 0 )
    ( 1 0 0 ) ( 0 0 0 )
}
frame 0 { 0 }
frame 1 { 2 }
"#;

    #[test]
    fn test_skin_frame_moves_arm() {
        let rig = SkinnedModel::from_text(ARM).unwrap();
        let clip = parse_anim(LIFT).unwrap();
        rig.check_clip(&clip).unwrap();

        let mut out = rig.new_vertex_buffer();
        rig.skin_frame(&clip, 1, &mut out).unwrap();
        assert!((out.position(1) - Vec3::new(2.0, 0.0, 2.0)).length() < 1e-5);
        assert!((out.position(0) - Vec3::ZERO).length() < 1e-5);
    }

    #[test]
    fn test_options_apply_to_every_call() {
        let rig = SkinnedModel::from_text(ARM)
            .unwrap()
            .with_options(SkinOptions::default().with_kernel(Kernel::Wide).parallel(true));
        assert_eq!(rig.options().kernel, Kernel::Wide);

        let mut wide = rig.new_vertex_buffer();
        rig.skin_bind_pose(&mut wide).unwrap();
        let scalar = crate::skinning::skin(rig.arena(), &rig.arena().bind_pose(), Kernel::Scalar).unwrap();
        assert!(wide.max_abs_diff(&scalar).unwrap() < 1e-5);
    }

    #[test]
    fn test_clip_for_other_skeleton() {
        let rig = SkinnedModel::from_text(ARM).unwrap();
        let clip = parse_anim(&LIFT.replace("\"arm\" 0 4 0", "\"leg\" 0 4 0")).unwrap();
        assert!(matches!(rig.check_clip(&clip), Err(Error::ClipMismatch { .. })));
    }
}
