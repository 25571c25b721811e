//! Skinning commands: single pose, whole-clip bake and kernel comparison.

use std::path::Path;
use std::time::Instant;

use crate::animation::reconstruct_pose_into;
use crate::cli::progress::{DISK, GEAR, LOOKING_GLASS, PACKAGE, print_done, print_step, simple_bar};
use crate::loader::{load_animation, load_model};
use crate::model::AnimationClip;
use crate::rig::SkinnedModel;
use crate::skinning::{Kernel, SkinOptions, VertexBuffer, skin as skin_pose};

fn load_rig(mesh: &Path, options: &SkinOptions) -> anyhow::Result<SkinnedModel> {
    Ok(SkinnedModel::from_model(load_model(mesh)?)?.with_options(*options))
}

fn load_clip_for(rig: &SkinnedModel, anim: &Path) -> anyhow::Result<AnimationClip> {
    let clip = load_animation(anim)?;
    rig.check_clip(&clip)?;
    Ok(clip)
}

/// Skin one pose and write the vertex buffer.
pub fn skin(
    mesh: &Path,
    output: &Path,
    anim: Option<&Path>,
    frame: usize,
    options: &SkinOptions,
    indices: Option<&Path>,
) -> anyhow::Result<()> {
    let rig = load_rig(mesh, options)?;
    let mut out = rig.new_vertex_buffer();

    match anim {
        Some(anim) => {
            let clip = load_clip_for(&rig, anim)?;
            rig.skin_frame(&clip, frame, &mut out)?;
            println!(
                "Skinned frame {} of {} ({} kernel)",
                frame % clip.frame_count(),
                anim.display(),
                options.kernel
            );
        }
        None => {
            rig.skin_bind_pose(&mut out)?;
            println!("Skinned bind pose ({} kernel)", options.kernel);
        }
    }

    std::fs::write(output, out.to_le_bytes())?;
    println!(
        "  Vertices: {} -> {}",
        out.vertex_count(),
        output.display()
    );

    if let Some(indices) = indices {
        let bytes: Vec<u8> = rig
            .index_buffer()
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        std::fs::write(indices, bytes)?;
        println!(
            "  Indices:  {} -> {}",
            rig.index_buffer().len(),
            indices.display()
        );
    }
    Ok(())
}

/// Skin every frame of `anim` into `destination/frame_NNNN.bin`.
pub fn bake(
    mesh: &Path,
    anim: &Path,
    destination: &Path,
    options: &SkinOptions,
    quiet: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();

    print_step(1, 3, LOOKING_GLASS, "Loading mesh and animation...");
    let rig = load_rig(mesh, options)?;
    let clip = load_clip_for(&rig, anim)?;

    print_step(2, 3, PACKAGE, &format!("Packed {} vertices", rig.arena().vertex_count()));
    std::fs::create_dir_all(destination)?;

    print_step(
        3,
        3,
        GEAR,
        &format!("Skinning {} frames ({} kernel)...", clip.frame_count(), options.kernel),
    );
    let pb = (!quiet).then(|| simple_bar(clip.frame_count() as u64, "Skinning"));

    let mut pose = Vec::with_capacity(clip.joint_count());
    let mut out = rig.new_vertex_buffer();
    for frame in 0..clip.frame_count() {
        reconstruct_pose_into(&clip, frame, &mut pose);
        rig.skin_pose(&pose, &mut out)?;
        std::fs::write(destination.join(format!("frame_{frame:04}.bin")), out.to_le_bytes())?;
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    println!("{DISK}Wrote {} frames to {}", clip.frame_count(), destination.display());
    print_done(start.elapsed());
    Ok(())
}

/// Largest difference between the two kernels over one pose.
fn kernel_difference(rig: &SkinnedModel, pose: &[crate::model::JointPose]) -> anyhow::Result<f32> {
    let scalar = skin_pose(rig.arena(), pose, Kernel::Scalar)?;
    let wide: VertexBuffer = skin_pose(rig.arena(), pose, Kernel::Wide)?;
    Ok(scalar.max_abs_diff(&wide).unwrap_or(f32::INFINITY))
}

/// Run both kernels over the bind pose and every clip frame.
pub fn compare(mesh: &Path, anim: Option<&Path>, tolerance: f32) -> anyhow::Result<()> {
    let rig = load_rig(mesh, &SkinOptions::default())?;

    let mut worst = kernel_difference(&rig, &rig.arena().bind_pose())?;
    println!("Bind pose:   max difference {worst:e}");

    if let Some(anim) = anim {
        let clip = load_clip_for(&rig, anim)?;
        let mut pose = Vec::with_capacity(clip.joint_count());
        let mut clip_worst = 0.0f32;
        for frame in 0..clip.frame_count() {
            reconstruct_pose_into(&clip, frame, &mut pose);
            clip_worst = clip_worst.max(kernel_difference(&rig, &pose)?);
        }
        println!("{} frames: max difference {clip_worst:e}", clip.frame_count());
        worst = worst.max(clip_worst);
    }

    if worst > tolerance {
        anyhow::bail!("kernels differ by {worst:e}, tolerance is {tolerance:e}");
    }
    println!("Kernels agree within {tolerance:e}");
    Ok(())
}
