//! Mesh generation command.
//!
//! Builds options from flags or an options file, generates the mesh and
//! prints it as JSON. With an output directory, each participant's
//! `wg-quick` config is also written to its own file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use fire_wireguard::{generate_from_options, GenerateOptions, MeshPair};
use tracing::info;

use crate::cli::GenerateArgs;
use crate::error::CliError;

/// File name of the hub's config inside the output directory.
pub const HUB_FILE: &str = "hub.conf";

/// File name of the `n`th spoke's config, counting from 1.
#[must_use]
pub fn peer_file(n: usize) -> String {
    format!("peer-{n}.conf")
}

/// Generate command executor.
pub struct GenerateCommand {
    options_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    flags: GenerateOptions,
}

impl GenerateCommand {
    /// Create a new generate command from parsed arguments.
    #[must_use]
    pub fn new(args: &GenerateArgs) -> Self {
        Self {
            options_file: args.options.clone(),
            out_dir: args.out_dir.clone(),
            flags: args.to_options(),
        }
    }

    /// Resolves the options in effect: the options file if given, else the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the options file cannot be read or decoded.
    pub fn options(&self) -> Result<GenerateOptions, CliError> {
        match &self.options_file {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
                Ok(GenerateOptions::from_json(&text)?)
            }
            None => Ok(self.flags.clone()),
        }
    }

    /// Execute the generate command.
    ///
    /// Nothing is written unless the whole mesh generates and renders.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid, generation fails, or
    /// output cannot be written.
    pub fn execute<W: Write>(&self, writer: &mut W) -> Result<MeshPair, CliError> {
        let mesh = generate_from_options(&self.options()?)?;

        let files = self
            .out_dir
            .as_ref()
            .map(|_| render_files(&mesh))
            .transpose()?;

        writeln!(writer, "{}", mesh.to_json()?)?;

        if let (Some(dir), Some(files)) = (&self.out_dir, files) {
            write_files(dir, &files)?;
            info!(dir = %dir.display(), files = files.len(), "configs written");
        }

        Ok(mesh)
    }
}

fn render_files(mesh: &MeshPair) -> Result<Vec<(String, String)>, CliError> {
    let mut files = Vec::with_capacity(mesh.peers.len() + 1);
    files.push((HUB_FILE.to_string(), mesh.root.to_config_string()?));
    for (i, spoke) in mesh.peers.iter().enumerate() {
        files.push((peer_file(i + 1), spoke.to_config_string()?));
    }
    Ok(files)
}

fn write_files(dir: &Path, files: &[(String, String)]) -> Result<(), CliError> {
    fs::create_dir_all(dir).map_err(|e| CliError::file(dir, e))?;
    for (name, contents) in files {
        let path = dir.join(name);
        fs::write(&path, contents).map_err(|e| CliError::file(&path, e))?;
    }
    Ok(())
}
