use clap::Subcommand;
use std::path::PathBuf;

use crate::skinning::Kernel;

pub mod execute;
pub mod model;
pub mod skin;

#[derive(Subcommand)]
pub enum Commands {
    /// Show a summary of an .md5mesh or .md5anim file
    Inspect {
        /// Source file
        file: PathBuf,

        /// Write the summary as JSON instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse files and report whether they are valid
    Validate {
        /// Files to check (.md5mesh or .md5anim)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Fail on vertices whose weight biases do not sum to 1
        #[arg(long)]
        strict: bool,
    },

    /// Compile a mesh and write its packed arena
    Pack {
        /// Source .md5mesh
        mesh: PathBuf,

        /// Output arena file
        output: PathBuf,

        /// Fail on vertices whose weight biases do not sum to 1
        #[arg(long)]
        strict: bool,
    },

    /// Skin one pose into a little-endian f32 vertex buffer
    Skin {
        /// Source .md5mesh
        mesh: PathBuf,

        /// Output vertex buffer
        output: PathBuf,

        /// Animation to pose the mesh with (bind pose if omitted)
        #[arg(short, long)]
        anim: Option<PathBuf>,

        /// Frame of the animation to skin (wraps around)
        #[arg(short, long, requires = "anim")]
        frame: Option<usize>,

        /// Skinning kernel (scalar, wide)
        #[arg(short, long, default_value = "scalar")]
        kernel: Kernel,

        /// Skin meshes in parallel
        #[arg(long)]
        parallel: bool,

        /// Also write the 16-bit index buffer here
        #[arg(long)]
        indices: Option<PathBuf>,
    },

    /// Skin every frame of an animation into a directory
    Bake {
        /// Source .md5mesh
        mesh: PathBuf,

        /// Source .md5anim
        anim: PathBuf,

        /// Output directory for frame_NNNN.bin files
        destination: PathBuf,

        /// Skinning kernel (scalar, wide)
        #[arg(short, long, default_value = "scalar")]
        kernel: Kernel,

        /// Skin meshes in parallel
        #[arg(long)]
        parallel: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check that the scalar and wide kernels agree
    Compare {
        /// Source .md5mesh
        mesh: PathBuf,

        /// Also compare every frame of this animation
        #[arg(short, long)]
        anim: Option<PathBuf>,

        /// Largest accepted component difference
        #[arg(long, default_value_t = 1e-5)]
        tolerance: f32,
    },
}
