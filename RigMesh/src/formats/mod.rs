//! Text format handlers
//!
//! Only the id Tech 4 skeletal formats are supported: `md5mesh` for the
//! skinned model and `md5anim` for animation clips.

pub mod md5;

pub use md5::{ParseOptions, parse_anim, parse_mesh, parse_mesh_with};
