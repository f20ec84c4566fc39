use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pageocr::ocr::renderer::ensure_pdf_exists;
use pageocr::ocr::{
    BridgeCommand, BridgeEngine, EngineConfig, PageRange, PageRasterizer, PageSource,
};
use pageocr::pipeline::{build_report, save, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "pageocr")]
#[command(version, about = "Render PDF pages and collect OCR text boxes into a JSON report", long_about = None)]
struct Cli {
    /// Input PDF file path
    #[arg(long)]
    pdf: PathBuf,

    /// Output directory
    #[arg(long, default_value = "output_ocr")]
    out: PathBuf,

    /// Rendering DPI
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// OCR language hint
    #[arg(long, default_value = "en")]
    lang: String,

    /// First page (0-indexed)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    start: i64,

    /// End page (exclusive); -1 means through the last page
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    end: i64,

    /// Python interpreter that runs the OCR bridge
    #[arg(long, default_value = "python3")]
    python: PathBuf,

    /// OCR bridge helper script
    #[arg(long, default_value = "ocr/bridge/paddle_bridge.py")]
    bridge_script: PathBuf,

    /// Directory containing the PDFium shared library
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Thread cap for the OCR engine's numeric libraries
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    threads: u32,

    /// Where the OCR engine fetches its models from
    #[arg(long, default_value = "HF")]
    model_source: String,

    /// Let the OCR engine check its model source at start-up
    #[arg(long)]
    model_source_check: bool,

    /// Enable document orientation classification
    #[arg(long)]
    doc_orientation_classify: bool,

    /// Enable document unwarping
    #[arg(long)]
    doc_unwarping: bool,

    /// Enable text line orientation classification
    #[arg(long)]
    textline_orientation: bool,
}

impl Cli {
    fn page_range(&self) -> PageRange {
        if self.end == -1 {
            PageRange::from_start(self.start)
        } else {
            PageRange::new(self.start, self.end)
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.pdf.clone(), self.out.clone(), self.dpi)
            .with_range(Some(self.page_range()))
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            lang: self.lang.clone(),
            model_source_check: self.model_source_check,
            model_source: self.model_source.clone(),
            num_threads: self.threads as usize,
            doc_orientation_classify: self.doc_orientation_classify,
            doc_unwarping: self.doc_unwarping,
            textline_orientation: self.textline_orientation,
        }
    }

    fn bridge_command(&self) -> BridgeCommand {
        BridgeCommand {
            program: self.python.clone(),
            script: self.bridge_script.clone(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config();

    ensure_pdf_exists(&config.input)?;

    let mut engine = BridgeEngine::spawn(&cli.bridge_command(), &cli.engine_config())
        .context("Failed to start OCR engine")?;

    let rasterizer = PageRasterizer::new(cli.pdfium_lib.as_deref())?;
    let document = rasterizer
        .open(&config.input)
        .with_context(|| format!("Failed to open PDF: {}", config.input.display()))?;
    tracing::info!(pages = document.page_count(), dpi = config.dpi, "PDF opened");

    let report = build_report(&document, &config, &mut engine)
        .with_context(|| format!("OCR failed for: {}", config.input.display()))?;

    let path = save(&report, &config.output)
        .with_context(|| format!("Failed to write results to: {}", config.output.display()))?;
    println!("Saved: {}", path.display());

    Ok(())
}
