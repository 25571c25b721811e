//! # RigMesh
//!
//! A pure-Rust loader and CPU skinner for id Tech 4 `md5mesh` / `md5anim`
//! skeletal models.
//!
//! ## Pipeline
//!
//! - **Parse** - [`parse_mesh`](formats::parse_mesh) and
//!   [`parse_anim`](formats::parse_anim) validate the text formats completely
//!   and report failures with line numbers
//! - **Compile** - [`compile_bind_pose`](skinning::compile_bind_pose) derives
//!   rest-pose normals and tangents and stores them per weight in joint space
//! - **Pack** - [`pack`](skinning::pack) lays the compiled model out in one
//!   flat [`Arena`](skinning::Arena) that can be written to disk and reloaded
//! - **Skin** - [`skin`](skinning::skin) blends vertices with the scalar or the
//!   four-lane kernel, optionally across meshes in parallel
//! - **Animate** - [`reconstruct_pose`](animation::reconstruct_pose) rebuilds
//!   the object-space pose of any clip frame
//!
//! ## Quick Start
//!
//! ```no_run
//! use rigmesh::prelude::*;
//!
//! let model = load_model("models/imp.md5mesh")?;
//! let clip = load_animation("models/imp_walk.md5anim")?;
//! clip.check_compatible(&model)?;
//!
//! let arena = pack(&compile_bind_pose(model))?;
//! let pose = reconstruct_pose(&clip, 12);
//! let vertices = skin(&arena, &pose, Kernel::Wide)?;
//! println!("{} vertices skinned", vertices.vertex_count());
//! # Ok::<(), rigmesh::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `rigmesh` command-line binary

pub mod animation;
pub mod error;
pub mod formats;
pub mod inspect;
pub mod loader;
pub mod model;
pub mod rig;
pub mod skinning;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::{ParseOptions, parse_anim, parse_mesh, parse_mesh_with};
    pub use crate::model::{
        AnimationClip, ChannelMask, HierarchyEntry, Joint, JointPose, Mesh, Model, Vertex, Weight,
    };

    pub use crate::animation::{reconstruct_pose, reconstruct_pose_into};
    pub use crate::skinning::{
        Arena, CompiledModel, Kernel, SkinOptions, VertexBuffer, compile_bind_pose, pack, skin,
        skin_into,
    };

    pub use crate::inspect::{AnimationInfo, ModelInfo};
    pub use crate::loader::{load_animation, load_model};
    pub use crate::rig::SkinnedModel;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
