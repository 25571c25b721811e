//! Inspection, validation and packing commands.

use std::path::Path;

use crate::formats::ParseOptions;
use crate::inspect::{AnimationInfo, ModelInfo};
use crate::loader::{load_animation, load_model_with, save_arena};
use crate::skinning::{compile_bind_pose, pack as pack_arena};

use crate::cli::progress::print_check;

fn is_anim(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md5anim"))
}

fn parse_options(strict: bool) -> ParseOptions {
    if strict {
        ParseOptions::default().strict()
    } else {
        ParseOptions::default()
    }
}

/// Print a summary of a mesh or animation, or write it as JSON.
pub fn inspect(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    if is_anim(path) {
        let info = AnimationInfo::from_clip(&load_animation(path)?);
        if let Some(output) = output {
            return write_json(&info, output);
        }

        println!("Animation: {}", path.display());
        println!("====================");
        println!("Frames:      {}", info.frame_count);
        println!("Frame rate:  {} fps", info.frame_rate);
        println!("Duration:    {:.2}s", info.duration_seconds);
        println!("Components:  {} per frame", info.components_per_frame);
        println!("Bounds:      {}", if info.has_bounds { "yes" } else { "no" });
        println!();
        println!("Hierarchy ({}):", info.hierarchy.len());
        for (i, joint) in info.hierarchy.iter().enumerate() {
            let parent = joint.parent.map_or_else(|| "-".to_string(), |p| p.to_string());
            println!(
                "  [{i:3}] {:24} parent {parent:>3} | {:18} @ {}",
                joint.name, joint.channels, joint.offset
            );
        }
    } else {
        let info = ModelInfo::from_model(&load_model_with(path, &ParseOptions::default())?);
        if let Some(output) = output {
            return write_json(&info, output);
        }

        println!("Mesh: {}", path.display());
        println!("====================");
        println!("Joints:      {}", info.joint_count);
        println!("Meshes:      {}", info.mesh_count);
        println!("Vertices:    {}", info.vertex_count);
        println!("Triangles:   {}", info.triangle_count);
        println!("Weights:     {}", info.weight_count);
        println!();
        println!("Meshes ({}):", info.meshes.len());
        for mesh in &info.meshes {
            println!(
                "  - {} ({} vertices, {} triangles, up to {} weights per vertex)",
                mesh.shader, mesh.vertex_count, mesh.triangle_count, mesh.max_weights_per_vertex
            );
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(info: &T, output: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(info)?;
    std::fs::write(output, json)?;
    println!("Written to: {}", output.display());
    Ok(())
}

/// Parse every file and report the outcome of each.
pub fn validate(files: &[impl AsRef<Path>], strict: bool) -> anyhow::Result<()> {
    let options = parse_options(strict);
    let mut failed = 0;

    println!("Validating {} file(s)", files.len());
    for path in files {
        let path = path.as_ref();
        let outcome = if is_anim(path) {
            load_animation(path).map(|clip| {
                format!(
                    "{} joints, {} frames at {} fps",
                    clip.joint_count(),
                    clip.frame_count(),
                    clip.frame_rate()
                )
            })
        } else {
            load_model_with(path, &options).map(|model| {
                format!(
                    "{} joints, {} meshes, {} vertices",
                    model.joints().len(),
                    model.meshes().len(),
                    model.vertex_count()
                )
            })
        };

        match outcome {
            Ok(summary) => print_check(true, &format!("{}: {summary}", path.display())),
            Err(e) => {
                failed += 1;
                print_check(false, &format!("{}: {e}", path.display()));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed validation", files.len());
    }
    Ok(())
}

/// Compile a mesh and write its arena bytes.
pub fn pack(mesh: &Path, output: &Path, strict: bool) -> anyhow::Result<()> {
    let model = compile_bind_pose(load_model_with(mesh, &parse_options(strict))?);
    let arena = pack_arena(&model)?;
    save_arena(&arena, output)?;

    println!("Packed {} -> {}", mesh.display(), output.display());
    println!("  Meshes:   {}", arena.mesh_count());
    println!("  Vertices: {}", arena.vertex_count());
    println!("  Joints:   {}", arena.joint_count());
    println!("  Size:     {} bytes", arena.as_bytes().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_anim_detection() {
        assert!(is_anim(Path::new("walk.md5anim")));
        assert!(is_anim(Path::new("WALK.MD5ANIM")));
        assert!(!is_anim(Path::new("body.md5mesh")));
        assert!(!is_anim(Path::new("noext")));
    }

    #[test]
    fn test_validate_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.md5mesh");
        let bad = dir.path().join("bad.md5mesh");
        std::fs::write(&good, "joints {\n\"root\" -1 ( 0 0 0 ) ( 0 0 0 )\n}\n").unwrap();
        std::fs::write(&bad, "joints {\n\"root\" 4 ( 0 0 0 ) ( 0 0 0 )\n}\n").unwrap();

        validate(&[good.clone()], false).unwrap();
        let files: Vec<PathBuf> = vec![good, bad];
        assert!(validate(&files, false).is_err());
    }
}
