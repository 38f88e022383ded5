use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use corroscan::{AnalysisOrchestrator, AnalysisStatus, AppError, DataType, Settings, Upload};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Image,
    Cscan,
}

impl From<Kind> for DataType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Image => DataType::Image,
            Kind::Cscan => DataType::CScan,
        }
    }
}

/// Estimate surface corrosion from a photograph or a C-scan thickness grid.
#[derive(Debug, Parser)]
#[command(name = "corroscan", version)]
struct Cli {
    /// Kind of dataset in the file
    #[arg(value_enum)]
    kind: Kind,

    /// Image (jpg, png, bmp, tiff, gif) or grid (csv, txt, dat, xlsx) file
    path: PathBuf,

    /// Configuration file layered over the defaults
    #[arg(long, env = "CORROSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// MIME type reported by the uploader, if any
    #[arg(long)]
    mime: Option<String>,
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(settings.logging.level()?);

    let data_type = DataType::from(cli.kind);
    info!("{}", data_type.description());

    let bytes = tokio::fs::read(&cli.path).await?;
    let file_name = cli
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut upload = Upload::new(file_name, bytes);
    if let Some(mime) = cli.mime {
        upload = upload.with_mime(mime);
    }

    let orchestrator = AnalysisOrchestrator::from_settings(&settings);
    // rejected uploads still leave an Error record to print
    let _ = orchestrator.submit_upload(upload, data_type);
    let result = orchestrator.wait_for_settled().await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(match result.status {
        AnalysisStatus::Complete => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
