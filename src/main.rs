use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cmvr_render::{OutputFormat, RenderConfig, Renderer, ReportKind};

/// Render a CMVR or attendance report JSON to PDF or DOCX.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Report JSON file
    input: PathBuf,

    /// Output file (.pdf or .docx)
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "cmvr")]
    kind: ReportKind,

    /// Output format; inferred from the output extension when omitted
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Renderer config JSON (fonts, image timeout, fixed timestamp)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn format_for(args: &Args) -> OutputFormat {
    if let Some(format) = args.format {
        return format;
    }
    match args.output.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("docx") => OutputFormat::Docx,
        _ => OutputFormat::Pdf,
    }
}

async fn run(args: Args) -> Result<(), cmvr_render::Error> {
    let config = match &args.config {
        Some(path) => RenderConfig::from_json_file(path)?.with_env_overrides()?,
        None => RenderConfig::from_env()?,
    };
    let json = std::fs::read(&args.input)?;
    let renderer = Renderer::new(config)?;
    let bytes = renderer.generate(args.kind, &json, format_for(&args)).await?;
    std::fs::write(&args.output, &bytes)?;
    log::info!("Wrote {} ({} bytes)", args.output.display(), bytes.len());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let input = args.input.clone();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error rendering {}: {e}", input.display());
            ExitCode::FAILURE
        }
    }
}
