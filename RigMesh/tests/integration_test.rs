use std::fmt::Write;

use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;
use rigmesh::error::Location;
use rigmesh::prelude::*;
use tempfile::tempdir;

/// A chain of `joints` joints along +X, each turned a little about Z, and one
/// mesh per `mesh_sizes` entry whose vertices blend 1 to 4 joints.
fn chain_mesh(joints: usize, mesh_sizes: &[usize]) -> String {
    let mut text = String::from("MD5Version 10\ncommandline \"generated\"\n");
    writeln!(text, "numJoints {joints}\nnumMeshes {}\n", mesh_sizes.len()).unwrap();

    text.push_str("joints {\n");
    let mut orientation = Quat::IDENTITY;
    let mut position = Vec3::ZERO;
    for j in 0..joints {
        let parent = if j == 0 { -1 } else { j as i64 - 1 };
        writeln!(
            text,
            "\t\"bone{j}\" {parent} ( {} {} {} ) ( {} {} {} )",
            position.x, position.y, position.z, orientation.x, orientation.y, orientation.z
        )
        .unwrap();
        orientation = (orientation * Quat::from_rotation_z(0.2)).normalize();
        position += orientation * Vec3::X;
    }
    text.push_str("}\n\n");

    for (m, &count) in mesh_sizes.iter().enumerate() {
        writeln!(text, "mesh {{\n\tshader \"mat{m}\"\n\tnumverts {count}").unwrap();
        let mut weights = Vec::new();
        for v in 0..count {
            let influences = 1 + (v + m) % 4;
            let u = v as f32 / count as f32;
            writeln!(text, "\tvert {v} ( {u} {} ) {} {influences}", 1.0 - u * u, weights.len()).unwrap();
            for k in 0..influences {
                let joint = (v + k * 3 + m) % joints;
                let offset = Vec3::new(0.1 * k as f32, 0.3 + 0.05 * v as f32, -0.2 + 0.1 * m as f32);
                weights.push((joint, 1.0 / influences as f32, offset));
            }
        }

        let triangles: Vec<[usize; 3]> = (0..count.saturating_sub(2))
            .map(|t| if t % 2 == 0 { [t, t + 2, t + 1] } else { [t, t + 1, t + 2] })
            .collect();
        writeln!(text, "\n\tnumtris {}", triangles.len()).unwrap();
        for (t, [a, b, c]) in triangles.iter().enumerate() {
            writeln!(text, "\ttri {t} {a} {b} {c}").unwrap();
        }

        writeln!(text, "\n\tnumweights {}", weights.len()).unwrap();
        for (w, (joint, bias, p)) in weights.iter().enumerate() {
            writeln!(text, "\tweight {w} {joint} {bias} ( {} {} {} )", p.x, p.y, p.z).unwrap();
        }
        text.push_str("}\n\n");
    }
    text
}

/// Every joint of a `chain_mesh` skeleton animated on all six channels except
/// the root, which keeps its base pose.
fn chain_anim(joints: usize, frames: usize) -> String {
    let animated = joints - 1;
    let mut text = String::new();
    writeln!(
        text,
        "MD5Version 10\nnumFrames {frames}\nnumJoints {joints}\nframeRate 24\nnumAnimatedComponents {}\n",
        animated * 6
    )
    .unwrap();

    text.push_str("hierarchy {\n\t\"bone0\" -1 0 0\n");
    for j in 1..joints {
        writeln!(text, "\t\"bone{j}\" {} 63 {}", j - 1, (j - 1) * 6).unwrap();
    }
    text.push_str("}\n\nbaseframe {\n");
    for _ in 0..joints {
        text.push_str("\t( 0 0 0 ) ( 0 0 0 )\n");
    }
    text.push_str("}\n\n");

    for f in 0..frames {
        writeln!(text, "frame {f} {{").unwrap();
        for j in 1..joints {
            let t = f as f32 * 0.3 + j as f32;
            let q = Quat::from_euler(glam::EulerRot::XYZ, 0.1 * t.sin(), 0.2 * t.cos(), 0.3 * t.sin());
            // keep w positive so xyz round-trips
            let q = if q.w < 0.0 { -q } else { q };
            writeln!(text, "\t1 {} 0 {} {} {}", 0.1 * t.cos(), q.x, q.y, q.z).unwrap();
        }
        text.push_str("}\n\n");
    }
    text
}

fn single_vertex_mesh(joints: &str, joint: usize, offset: &str) -> String {
    format!(
        "joints {{\n{joints}}}\nmesh {{\n\tshader \"s\"\n\tvert 0 ( 0 0 ) 0 1\n\tweight 0 {joint} 1.0 ( {offset} )\n}}\n"
    )
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn assert_vec3_near(actual: Vec3, expected: Vec3, tolerance: f32) {
    assert!(
        (actual - expected).abs().max_element() <= tolerance,
        "expected {expected:?}, got {actual:?}"
    );
}

#[test]
fn scenario_a_single_weight_identity_joint() {
    let text = single_vertex_mesh("\t\"root\" -1 ( 0 0 0 ) ( 0 0 0 )\n", 0, "1 0 0");
    let arena = pack(&compile_bind_pose(parse_mesh(&text).unwrap())).unwrap();

    for kernel in [Kernel::Scalar, Kernel::Wide] {
        let out = skin(&arena, &arena.bind_pose(), kernel).unwrap();
        assert_vec3_near(out.position(0), Vec3::X, 1e-6);
    }
}

#[test]
fn scenario_b_child_rotated_about_z() {
    let s = std::f32::consts::FRAC_1_SQRT_2;
    let joints = format!("\t\"parent\" -1 ( 0 0 0 ) ( 0 0 0 )\n\t\"child\" 0 ( 0 0 0 ) ( 0 0 {s} )\n");
    let text = single_vertex_mesh(&joints, 1, "1 0 0");
    let arena = pack(&compile_bind_pose(parse_mesh(&text).unwrap())).unwrap();

    let out = skin(&arena, &arena.bind_pose(), Kernel::Scalar).unwrap();
    assert_vec3_near(out.position(0), Vec3::Y, 1e-5);

    // The same relation expressed as an animation: local rotation composed
    // with the parent during reconstruction.
    let anim = format!(
        "frameRate 24\nhierarchy {{\n\t\"parent\" -1 0 0\n\t\"child\" 0 0 0\n}}\n\
         baseframe {{\n\t( 0 0 0 ) ( 0 0 0 )\n\t( 0 0 0 ) ( 0 0 {s} )\n}}\nframe 0 {{ }}\n"
    );
    let clip = parse_anim(&anim).unwrap();
    let out = skin(&arena, &reconstruct_pose(&clip, 0), Kernel::Wide).unwrap();
    assert_vec3_near(out.position(0), Vec3::Y, 1e-5);
}

#[test]
fn scenario_c_unanimated_entry_keeps_base_pose() {
    let text = "frameRate 30\n\
        hierarchy {\n\t\"root\" -1 0 0\n\t\"spin\" 0 32 0\n\t\"still\" 0 0 1\n}\n\
        baseframe {\n\t( 1 2 3 ) ( 0 0.5 0 )\n\t( 0 0 1 ) ( 0 0 0 )\n\t( 4 0 0 ) ( 0.1 0 0 )\n}\n\
        frame 0 { 0.0 9 }\nframe 1 { 0.3 9 }\nframe 2 { 0.6 9 }\n";
    let clip = parse_anim(text).unwrap();

    let first = reconstruct_pose(&clip, 0);
    for frame in 0..clip.frame_count() * 2 {
        let pose = reconstruct_pose(&clip, frame);
        assert_eq!(pose[0], first[0]);
        assert_eq!(pose[2], first[2]);
    }
    assert_vec3_near(first[0].position, Vec3::new(1.0, 2.0, 3.0), 0.0);
    let spinning = reconstruct_pose(&clip, 1);
    assert!(spinning[1] != first[1]);
}

#[test]
fn scenario_d_missing_joints_block() {
    let text = "MD5Version 10\nmesh {\n\tshader \"s\"\n\tvert 0 ( 0 0 ) 0 1\n\tweight 0 0 1.0 ( 0 0 0 )\n}\n";
    match parse_mesh(text) {
        Err(Error::MalformedFormat { at, message }) => {
            assert_eq!(at, Location::EndOfInput);
            assert!(message.contains("joints"), "{message}");
        }
        other => panic!("expected malformed format, got {other:?}"),
    }
}

#[test]
fn test_index_errors_carry_line_numbers() {
    let text = single_vertex_mesh("\t\"root\" -1 ( 0 0 0 ) ( 0 0 0 )\n", 3, "0 0 0");
    match parse_mesh(&text) {
        Err(Error::IndexOutOfRange { at, index, len, .. }) => {
            assert_eq!(at, Location::Line(7));
            assert_eq!((index, len), (3, 1));
        }
        other => panic!("expected index error, got {other:?}"),
    }

    let forward = "joints {\n\t\"a\" -1 ( 0 0 0 ) ( 0 0 0 )\n\t\"b\" 2 ( 0 0 0 ) ( 0 0 0 )\n\t\"c\" 1 ( 0 0 0 ) ( 0 0 0 )\n}\n";
    assert!(matches!(
        parse_mesh(forward),
        Err(Error::IndexOutOfRange {
            at: Location::Line(3),
            ..
        })
    ));
}

#[test]
fn test_generated_model_properties() {
    let model = parse_mesh(&chain_mesh(7, &[5, 9])).unwrap();
    assert_eq!(model.commandline(), Some("generated"));

    for (i, joint) in model.joints().iter().enumerate() {
        assert!((joint.orientation.length() - 1.0).abs() < 1e-5);
        match joint.parent {
            Some(parent) => assert!(parent < i),
            None => assert_eq!(i, 0),
        }
    }
    for mesh in model.meshes() {
        for v in 0..mesh.vertices.len() {
            let sum: f32 = mesh.weights_of(v).iter().map(|w| w.bias).sum();
            assert!((sum - 1.0).abs() < 1e-4, "bias sum {sum}");
        }
    }
}

#[test]
fn test_reconstructed_poses_are_unit_and_wrap() {
    let clip = parse_anim(&chain_anim(6, 5)).unwrap();
    assert_eq!(clip.frame_count(), 5);

    for k in 0..clip.frame_count() {
        let pose = reconstruct_pose(&clip, k);
        for joint in &pose {
            assert!((joint.orientation.length() - 1.0).abs() < 1e-5);
        }
        assert_eq!(reconstruct_pose(&clip, clip.frame_count() + k), pose);
        assert_eq!(reconstruct_pose(&clip, 3 * clip.frame_count() + k), pose);
    }
}

#[test]
fn test_kernels_agree_on_animated_multi_mesh_model() {
    init_logging();
    // 1, 3, 5 and 7 vertices exercise every partial lane group.
    let model = parse_mesh(&chain_mesh(6, &[1, 3, 5, 7, 12])).unwrap();
    let clip = parse_anim(&chain_anim(6, 8)).unwrap();
    clip.check_compatible(&model).unwrap();
    let arena = pack(&compile_bind_pose(model)).unwrap();

    let mut pose = Vec::new();
    for frame in 0..clip.frame_count() {
        reconstruct_pose_into(&clip, frame, &mut pose);
        let scalar = skin(&arena, &pose, Kernel::Scalar).unwrap();
        let wide = skin(&arena, &pose, Kernel::Wide).unwrap();
        let diff = scalar.max_abs_diff(&wide).unwrap();
        assert!(diff < 1e-5, "frame {frame}: kernels differ by {diff}");
    }
}

#[test]
fn test_parallel_skinning_matches_sequential() {
    let arena = pack(&compile_bind_pose(parse_mesh(&chain_mesh(5, &[6, 11, 3, 8])).unwrap())).unwrap();
    let clip = parse_anim(&chain_anim(5, 3)).unwrap();
    let pose = reconstruct_pose(&clip, 2);

    for kernel in [Kernel::Scalar, Kernel::Wide] {
        let sequential = skin(&arena, &pose, kernel).unwrap();
        let mut parallel = VertexBuffer::for_arena(&arena);
        skin_into(
            &arena,
            &pose,
            &SkinOptions::default().with_kernel(kernel).parallel(true),
            &mut parallel,
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }
}

#[test]
fn test_bind_pose_normals_are_unit_and_survive_skinning() {
    let compiled = compile_bind_pose(parse_mesh(&chain_mesh(4, &[9])).unwrap());
    let arena = pack(&compiled).unwrap();
    let out = skin(&arena, &arena.bind_pose(), Kernel::Wide).unwrap();

    for (i, rest) in compiled.bind_vertices(0).iter().enumerate() {
        assert!((rest.normal.length() - 1.0).abs() < 1e-5);
        assert!((rest.tangent.length() - 1.0).abs() < 1e-5);
        assert_vec3_near(out.position(i), rest.position, 1e-5);
        assert_vec3_near(out.normal(i), rest.normal, 1e-5);
        assert_vec3_near(out.tangent(i), rest.tangent, 1e-5);
    }
}

#[test]
fn test_arena_reloaded_from_disk_skins_identically() {
    init_logging();
    let dir = tempdir().unwrap();
    let mesh_path = dir.path().join("chain.md5mesh");
    let arena_path = dir.path().join("chain.arena");
    std::fs::write(&mesh_path, chain_mesh(5, &[4, 7])).unwrap();

    let arena = pack(&compile_bind_pose(load_model(&mesh_path).unwrap())).unwrap();
    rigmesh::loader::save_arena(&arena, &arena_path).unwrap();
    let reloaded = rigmesh::loader::load_arena(&arena_path).unwrap();

    assert_eq!(reloaded.index_buffer(), arena.index_buffer());
    let pose = arena.bind_pose();
    assert_eq!(
        skin(&reloaded, &pose, Kernel::Scalar).unwrap(),
        skin(&arena, &pose, Kernel::Scalar).unwrap()
    );
}

#[test]
fn test_index_buffer_covers_all_meshes() {
    let arena = pack(&compile_bind_pose(parse_mesh(&chain_mesh(3, &[4, 5])).unwrap())).unwrap();
    // 2 + 3 triangles
    assert_eq!(arena.index_buffer().len(), 15);

    let ranges = arena.mesh_ranges();
    assert_eq!(ranges.len(), 2);
    let (_, second_indices) = &ranges[1];
    assert!(arena.index_buffer()[second_indices.clone()].iter().all(|&i| (4..9).contains(&i)));
}

#[test]
fn test_skinned_model_plays_clip() {
    let rig = SkinnedModel::from_text(&chain_mesh(4, &[6]))
        .unwrap()
        .with_options(SkinOptions::default().with_kernel(Kernel::Wide));
    let clip = parse_anim(&chain_anim(4, 4)).unwrap();
    rig.check_clip(&clip).unwrap();

    let mut first = rig.new_vertex_buffer();
    let mut wrapped = rig.new_vertex_buffer();
    rig.skin_frame(&clip, 1, &mut first).unwrap();
    rig.skin_frame(&clip, 5, &mut wrapped).unwrap();
    assert_eq!(first, wrapped);
    assert_eq!(clip.frame_at(1.0 / 24.0 + 1e-4), 1);
}

#[test]
fn test_version_is_set() {
    assert!(!rigmesh::VERSION.is_empty());
}
