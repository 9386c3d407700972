use anyhow::{bail, Context};
use clap::Parser;
use markit::config::Config;
use markit::service::WatermarkService;
use markit::source::FileSource;
use markit::watermark::{apply_definitions, WatermarkPosition};
use std::path::PathBuf;

/// Markit - stamp text and image watermarks onto PDF documents and images
#[derive(Parser, Debug)]
#[command(name = "markit")]
#[command(version, about, long_about = None)]
struct Args {
    /// Document or image to watermark
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the watermarked result
    #[arg(short, long)]
    output: PathBuf,

    /// Target format (pdf, png, jpeg, tiff, bmp); sniffed from the input when omitted
    #[arg(short, long)]
    format: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Add a text watermark after the configured ones
    #[arg(long)]
    text: Option<String>,

    /// Anchor for --text (top-left, center, bottom-right, tiled, "custom: {x: 10, y: 20}")
    #[arg(long, default_value = "center", value_parser = parse_position)]
    position: WatermarkPosition,

    /// Opacity percent for --text
    #[arg(long, default_value_t = 50)]
    opacity: i32,

    /// Font size in points for --text
    #[arg(long)]
    size: Option<i32>,

    /// Counter-clockwise rotation in degrees for --text
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    rotation: i32,
}

fn parse_position(value: &str) -> Result<WatermarkPosition, String> {
    value
        .parse()
        .map_err(|_| format!("unknown position '{}'", value))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path).map_err(anyhow::Error::msg)?,
        None => Config::default(),
    };
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    markit::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging subsystem")?;

    if config.watermarks.is_empty() && args.text.is_none() {
        bail!("Nothing to apply: pass --text or a --config with watermarks");
    }

    tracing::info!(
        input = %args.input.display(),
        configured_watermarks = config.watermarks.len(),
        worker_threads = config.worker_threads,
        "Configuration loaded successfully"
    );

    let service = WatermarkService::from_config(&config)?;
    let mut builder = match &args.format {
        Some(tag) => {
            let source = FileSource::open(&args.input)
                .with_context(|| format!("Failed to open '{}'", args.input.display()))?;
            service.select_target_format(Box::new(source), tag)?
        }
        None => service.watermark_detected_file(&args.input)?,
    };

    apply_definitions(&config.watermarks, &mut builder)?;

    if let Some(text) = args.text {
        builder
            .with_text(text)?
            .opacity(args.opacity)
            .rotation(args.rotation);
        if let Some(size) = args.size {
            builder.size(size);
        }
        builder.position(args.position).end();
    }

    let format = builder.format();
    let written = builder
        .apply_to_path(&args.output)
        .with_context(|| format!("Failed to watermark '{}'", args.input.display()))?;

    tracing::info!(
        output = %written.display(),
        format = %format,
        "Watermarking complete"
    );

    Ok(())
}
