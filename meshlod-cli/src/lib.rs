//! # meshlod CLI
//!
//! Drives the viewer headlessly: load a model, simplify it with given
//! parameters and export the displayed result.
//!
//! ## Commands
//! - `info` - List the sub-meshes of an OBJ file
//! - `simplify` - Simplify an OBJ file and export it
//! - `knot` - Simplify the built-in torus knot and export it

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use meshlod_simplification::SimplificationParameters;
use meshlod_viewer::{DirectorySink, HeadlessBackend, Viewer, ViewerConfig};
use tracing::info;

const LOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// meshlod mesh simplification CLI
#[derive(Parser, Debug)]
#[command(name = "meshlod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Viewer configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Simplification parameters shared by the commands
#[derive(Args, Debug, Clone)]
pub struct ParamArgs {
    /// Fraction of indices to keep
    #[arg(short, long, default_value_t = 1.0)]
    pub ratio: f32,

    /// Error tolerance relative to the mesh extent
    #[arg(short, long, default_value_t = 0.01)]
    pub error: f32,

    /// Let border vertices move
    #[arg(long)]
    pub unlock_border: bool,
}

impl ParamArgs {
    pub fn parameters(&self) -> SimplificationParameters {
        SimplificationParameters::new(self.ratio, self.error, !self.unlock_border)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the sub-meshes of an OBJ file
    Info {
        input: PathBuf,
    },

    /// Simplify an OBJ file and export the result
    Simplify {
        input: PathBuf,

        /// Output file; the extension picks the format (.stl, .obj, .gltf)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// Write binary STL
        #[arg(long)]
        binary_stl: bool,
    },

    /// Simplify the built-in torus knot and export the result
    Knot {
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// Write binary STL
        #[arg(long)]
        binary_stl: bool,
    },
}

pub fn execute(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::from_path(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    // No window, so no background to show
    config.background.initial = None;

    match cli.command {
        Commands::Info { input } => info_command(&input),
        Commands::Simplify {
            input,
            output,
            params,
            binary_stl,
        } => {
            config.export.stl_binary |= binary_stl;
            let bytes = std::fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
            simplify_command(config, Some(&bytes), &output, params.parameters())
        }
        Commands::Knot {
            output,
            params,
            binary_stl,
        } => {
            config.export.stl_binary |= binary_stl;
            simplify_command(config, None, &output, params.parameters())
        }
    }
}

fn info_command(input: &Path) -> Result<()> {
    let meshes = meshlod_io::read_meshes(input).with_context(|| format!("failed to load {}", input.display()))?;
    println!("{}: {} sub-meshes", input.display(), meshes.len());
    for mesh in &meshes {
        println!(
            "  {:<24} {:>8} triangles {:>8} vertices",
            mesh.name,
            mesh.geometry.triangle_count(),
            mesh.geometry.vertex_count()
        );
    }
    Ok(())
}

/// Split `output` into the directory, base name and extension the download
/// entry point expects
fn split_output(output: &Path) -> Result<(PathBuf, String, String)> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("output {} has no file name", output.display()))?;
    let ext = output
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("output {} has no extension", output.display()))?;
    Ok((dir, stem.to_string(), format!(".{}", ext)))
}

/// `bytes` of `None` loads the built-in knot
fn simplify_command(
    config: ViewerConfig,
    bytes: Option<&[u8]>,
    output: &Path,
    params: SimplificationParameters,
) -> Result<()> {
    let (dir, name, ext) = split_output(output)?;
    let backend = HeadlessBackend::new(config.width, config.height);
    let mut viewer = Viewer::register(config, backend, DirectorySink::new(&dir))?;
    viewer.set_parameters(params)?;

    match bytes {
        Some(bytes) => {
            viewer.load_model_for_simplification(bytes)?;
            if !viewer.wait_for_pending_load(LOAD_TIMEOUT)? {
                bail!("model load timed out");
            }
        }
        None => {
            viewer.load_model_for_simplification_test(&[])?;
        }
    }

    if let Some(report) = viewer.last_report() {
        for pair in &report.pairs {
            println!(
                "  {:<24} {:>8} -> {:>8} indices (target {}, error {:.6})",
                pair.name, pair.source_count, pair.count, pair.target_count, pair.error
            );
        }
        info!(
            count = report.total_count(),
            source_count = report.total_source_count(),
            error = report.max_error(),
            "simplification done"
        );
    }

    if !viewer.download_model(&name, &ext)? {
        bail!("unsupported output format {}", ext);
    }
    println!("wrote {}", dir.join(format!("{}{}", name, ext)).display());
    viewer.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_output() {
        let (dir, name, ext) = split_output(Path::new("out/model.stl")).unwrap();
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(name, "model");
        assert_eq!(ext, ".stl");

        let (dir, _, _) = split_output(Path::new("model.obj")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert!(split_output(Path::new("model")).is_err());
    }

    #[test]
    fn test_cli_parses_parameters() {
        let cli = Cli::try_parse_from([
            "meshlod", "simplify", "in.obj", "-o", "out.stl", "--ratio", "0.5", "--unlock-border",
        ])
        .unwrap();
        match cli.command {
            Commands::Simplify { params, .. } => {
                let p = params.parameters();
                assert_eq!(p.ratio, 0.5);
                assert_eq!(p.error, 0.01);
                assert!(!p.lock_border);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_knot_command_writes_file() {
        let dir = std::env::temp_dir().join(format!("meshlod-cli-{}", std::process::id()));
        let output = dir.join("knot.obj");
        simplify_command(
            ViewerConfig::headless(),
            None,
            &output,
            SimplificationParameters::new(0.5, 0.05, true),
        )
        .unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("o torus_knot"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
