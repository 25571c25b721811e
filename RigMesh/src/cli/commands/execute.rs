//! Command execution implementations

use super::Commands;
use super::{model, skin};
use crate::skinning::SkinOptions;

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Inspect { file, output } => model::inspect(file, output.as_deref()),
            Commands::Validate { files, strict } => model::validate(files, *strict),
            Commands::Pack {
                mesh,
                output,
                strict,
            } => model::pack(mesh, output, *strict),
            Commands::Skin {
                mesh,
                output,
                anim,
                frame,
                kernel,
                parallel,
                indices,
            } => skin::skin(
                mesh,
                output,
                anim.as_deref(),
                frame.unwrap_or(0),
                &SkinOptions::default().with_kernel(*kernel).parallel(*parallel),
                indices.as_deref(),
            ),
            Commands::Bake {
                mesh,
                anim,
                destination,
                kernel,
                parallel,
                quiet,
            } => skin::bake(
                mesh,
                anim,
                destination,
                &SkinOptions::default().with_kernel(*kernel).parallel(*parallel),
                *quiet,
            ),
            Commands::Compare {
                mesh,
                anim,
                tolerance,
            } => skin::compare(mesh, anim.as_deref(), *tolerance),
        }
    }
}
