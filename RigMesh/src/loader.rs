//! File-level entry points.

use std::path::Path;

use crate::error::Result;
use crate::formats::{ParseOptions, parse_anim, parse_mesh_with};
use crate::model::{AnimationClip, Model};
use crate::skinning::Arena;

/// Read and parse an `.md5mesh` file.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    load_model_with(path, &ParseOptions::default())
}

pub fn load_model_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Model> {
    let path = path.as_ref();
    tracing::info!("Loading mesh: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    parse_mesh_with(&text, options)
}

/// Read and parse an `.md5anim` file.
pub fn load_animation<P: AsRef<Path>>(path: P) -> Result<AnimationClip> {
    let path = path.as_ref();
    tracing::info!("Loading animation: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    parse_anim(&text)
}

/// Write an arena's bytes to `path`.
pub fn save_arena<P: AsRef<Path>>(arena: &Arena, path: P) -> Result<()> {
    let path = path.as_ref();
    tracing::info!(
        "Writing arena: {} ({} bytes)",
        path.display(),
        arena.as_bytes().len()
    );
    std::fs::write(path, arena.as_bytes())?;
    Ok(())
}

/// Read and validate an arena written by [`save_arena`].
pub fn load_arena<P: AsRef<Path>>(path: P) -> Result<Arena> {
    let path = path.as_ref();
    tracing::info!("Loading arena: {}", path.display());
    let bytes = std::fs::read(path)?;
    Arena::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::skinning::{compile_bind_pose, pack};

    const CUBE_CORNER: &str = r#"
joints {
    "root" -1 ( 0 0 0 ) ( 0 0 0 )
}
mesh {
    shader "c"
    vert 0 ( 0 0 ) 0 1
    vert 1 ( 1 0 ) 1 1
    vert 2 ( 0 1 ) 2 1
    tri 0 0 2 1
    weight 0 0 1.0 ( 0 0 0 )
    weight 1 0 1.0 ( 1 0 0 )
    weight 2 0 1.0 ( 0 1 0 )
}
"#;

    #[test]
    fn test_load_model_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corner.md5mesh");
        std::fs::write(&path, CUBE_CORNER).unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.vertex_count(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_animation(dir.path().join("missing.md5anim")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_arena_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corner.arena");
        let model = compile_bind_pose(crate::formats::parse_mesh(CUBE_CORNER).unwrap());
        let arena = pack(&model).unwrap();

        save_arena(&arena, &path).unwrap();
        assert_eq!(load_arena(&path).unwrap(), arena);
    }
}
