//! tablecast CLI: offline surface detection and template capture on still images.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tablecast::offline::{calibrate_from_images, capture_from_image};
use tablecast::{CaptureRequest, PipelineConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "tablecast")]
#[command(about = "Projector-camera tabletop perception on still images")]
#[command(version)]
struct Cli {
    /// Pipeline configuration (JSON); defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON tracing output (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the projected screen quad and print corners and rectification.
    Surface {
        /// Camera image showing the projected white rectangle.
        image: PathBuf,
    },

    /// Capture an object template from a single frame.
    Capture(CaptureArgs),
}

#[derive(Debug, Clone, Args)]
struct CaptureArgs {
    /// Camera image of the empty surface.
    #[arg(long)]
    base: PathBuf,

    /// Camera image with the object placed.
    #[arg(long)]
    frame: PathBuf,

    /// Camera image showing the projected white rectangle.
    #[arg(long)]
    surface: PathBuf,

    /// Template name.
    #[arg(long, default_value = "object")]
    name: String,

    /// Skip the hue check when matching this template.
    #[arg(long)]
    no_color_check: bool,

    /// Write the template JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn init_logging(_json: bool) {
    #[cfg(feature = "tracing")]
    tablecast::init_tracing(_json);
    #[cfg(not(feature = "tracing"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn load_rgb(path: &Path) -> CliResult<image::RgbImage> {
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("failed to open image {}: {e}", path.display()).into() })?;
    Ok(img.to_rgb8())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = match &cli.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Surface { image } => run_surface(&config, &image),
        Commands::Capture(args) => run_capture(&config, &args),
    }
}

fn run_surface(config: &PipelineConfig, path: &Path) -> CliResult<()> {
    let frame = load_rgb(path)?;
    log::info!("image size: {}x{}", frame.width(), frame.height());
    let corners = tablecast::calib::detect_surface_corners(&frame, &config.calibration.surface)?;
    let rectifier = tablecast::core::compute_rectification(
        &corners,
        config.calibration.rotation_mode,
        config.calibration.canvas_width,
        config.calibration.canvas_height,
    )?;

    let report = serde_json::json!({
        "corners": corners.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
        "rotation_mode": config.calibration.rotation_mode,
        "canvas": [rectifier.width, rectifier.height],
        "rectification_matrix": rectifier.matrix(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_capture(config: &PipelineConfig, args: &CaptureArgs) -> CliResult<()> {
    let surface = load_rgb(&args.surface)?;
    let base = load_rgb(&args.base)?;
    let frame = load_rgb(&args.frame)?;

    let profile = calibrate_from_images(&config.calibration, &surface, &base)?;
    let request = CaptureRequest::new(args.name.clone()).with_color_check(!args.no_color_check);
    let template = capture_from_image(&profile, &frame, request, &config.template)?;

    let json = serde_json::to_string_pretty(&template)?;
    match &args.out {
        Some(out) => {
            std::fs::write(out, json)?;
            println!("wrote template '{}' to {}", template.name, out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
