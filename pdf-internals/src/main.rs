use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

mod analysis;
mod backend;
mod config;
mod error;
mod export;
mod fonts;
mod images;
mod report;

use crate::backend::pdfium::{PdfiumBackend, create_pdfium};
use crate::backend::validate_source;
use crate::config::{AppConfig, load_config, load_config_file};
use crate::error::{InspectError, InspectResult};
use crate::export::{TableFormat, export_text, extract_tables, render_tables, write_export};
use crate::images::naming::{document_base_name, output_directory};
use crate::images::{OutputFormat, check_dpi, deduplicate_images_at, write_unique_images};
use crate::report::{ExportSummary, ExtractionSummary};

/// Inspect PDF internals and extract images, text and tables
#[derive(Debug, Parser)]
#[command(name = "pdf-internals", version, about)]
struct Cli {
    /// Configuration file (defaults to ./pdf-internals.{toml,yaml,json} if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report fonts, images, tables, text, annotations, form fields and
    /// compression
    Analyze {
        pdf: PathBuf,

        /// Emit JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Write every distinct image once, tagging images seen more than once
    ExtractImages {
        pdf: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        /// Render resolution
        #[arg(long, value_parser = parse_dpi)]
        dpi: Option<f64>,

        /// Destination directory (defaults to the PDF's directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Write every page's text and tables to one plain text file
    ExtractText {
        pdf: PathBuf,

        /// Destination file (defaults to the PDF's name with a .txt extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Write the detected tables to a text or HTML file
    ExtractTables {
        pdf: PathBuf,

        #[command(flatten)]
        format: TableFormatArgs,

        /// Destination directory (defaults to the PDF's directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Show the document information dictionary
    Metadata {
        pdf: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct FormatArgs {
    /// Write PNG images
    #[arg(short = 'p', long)]
    png: bool,

    /// Write JPEG images
    #[arg(short = 'j', long)]
    jpeg: bool,
}

impl FormatArgs {
    fn output_format(&self) -> OutputFormat {
        if self.jpeg {
            OutputFormat::Jpeg
        } else {
            OutputFormat::Png
        }
    }
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct TableFormatArgs {
    /// Plain text tables
    #[arg(short = 't', long)]
    txt: bool,

    /// An HTML page of tables
    #[arg(long)]
    html: bool,
}

impl TableFormatArgs {
    fn table_format(&self) -> TableFormat {
        if self.html {
            TableFormat::Html
        } else {
            TableFormat::Txt
        }
    }
}

fn parse_dpi(value: &str) -> Result<f64, String> {
    let dpi: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    check_dpi(dpi)
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Command failed");
            eprintln!("Error: {}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> InspectResult<()> {
    let config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Analyze { pdf, json } => analyze(&config, &pdf, json),
        Command::ExtractImages {
            pdf,
            format,
            dpi,
            output_dir,
            json,
        } => extract_images(
            &config,
            &pdf,
            format.output_format(),
            dpi,
            output_dir.as_deref(),
            json,
        ),
        Command::ExtractText { pdf, output, json } => {
            extract_text(&config, &pdf, output.as_deref(), json)
        }
        Command::ExtractTables {
            pdf,
            format,
            output_dir,
            json,
        } => extract_tables_to_file(
            &config,
            &pdf,
            format.table_format(),
            output_dir.as_deref(),
            json,
        ),
        Command::Metadata { pdf, json } => metadata(&config, &pdf, json),
    }
}

fn analyze(config: &AppConfig, pdf: &Path, json: bool) -> InspectResult<()> {
    validate_source(pdf)?;
    let pdfium = create_pdfium(&config.pdfium)?;
    let document = PdfiumBackend::open(&pdfium, pdf, config.fonts.native_enumeration)?;

    let mut report = analysis::analyze(&document);
    report.metadata.file_size = file_size(pdf);

    if json {
        println!("{}", report::to_json(&report)?);
    } else {
        print!("{}", report::render_analysis(pdf, &report, &config.report));
    }
    Ok(())
}

fn extract_images(
    config: &AppConfig,
    pdf: &Path,
    format: OutputFormat,
    dpi: Option<f64>,
    output_dir: Option<&Path>,
    json: bool,
) -> InspectResult<()> {
    validate_source(pdf)?;
    let pdfium = create_pdfium(&config.pdfium)?;
    let document = PdfiumBackend::open(&pdfium, pdf, config.fonts.native_enumeration)?;

    let dpi = dpi.unwrap_or(config.images.dpi);
    let output_dir = output_directory(pdf, output_dir.or(config.images.output_dir.as_deref()));
    std::fs::create_dir_all(&output_dir).map_err(InspectError::Io)?;

    info!(
        pdf = %pdf.display(),
        output_dir = %output_dir.display(),
        %format,
        dpi,
        "Extracting images"
    );

    let result = deduplicate_images_at(&document, format, dpi);
    let emission = write_unique_images(
        &result,
        &document_base_name(pdf),
        &output_dir,
        format,
        config.images.jpeg_quality,
    );

    let summary = ExtractionSummary::new(&result, &emission);
    if json {
        println!("{}", report::to_json(&summary)?);
    } else {
        print!("{}", report::render_extraction(&summary));
    }
    Ok(())
}

fn text_output_path(pdf: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => output_directory(pdf, None).join(format!("{}.txt", document_base_name(pdf))),
    }
}

fn extract_text(
    config: &AppConfig,
    pdf: &Path,
    output: Option<&Path>,
    json: bool,
) -> InspectResult<()> {
    validate_source(pdf)?;
    let pdfium = create_pdfium(&config.pdfium)?;
    let document = PdfiumBackend::open(&pdfium, pdf, false)?;

    let output = text_output_path(pdf, output);
    info!(pdf = %pdf.display(), output = %output.display(), "Extracting text");

    let export = export_text(&document);
    write_export(&output, &export.content)?;

    if json {
        let summary = ExportSummary {
            output: Some(&output),
            result: &export,
        };
        println!("{}", report::to_json(&summary)?);
    } else {
        print!("{}", report::render_text_export(&export, &output));
    }
    Ok(())
}

fn extract_tables_to_file(
    config: &AppConfig,
    pdf: &Path,
    format: TableFormat,
    output_dir: Option<&Path>,
    json: bool,
) -> InspectResult<()> {
    validate_source(pdf)?;
    let pdfium = create_pdfium(&config.pdfium)?;
    let document = PdfiumBackend::open(&pdfium, pdf, false)?;

    info!(pdf = %pdf.display(), %format, "Extracting tables");
    let extraction = extract_tables(&document);

    // Nothing is written for a document without tables
    let output = if extraction.tables.is_empty() {
        None
    } else {
        let dir = output_directory(pdf, output_dir);
        std::fs::create_dir_all(&dir).map_err(InspectError::Io)?;
        let path = dir.join(format.file_name(&document_base_name(pdf)));
        write_export(&path, &render_tables(&extraction.tables, format))?;
        Some(path)
    };

    if json {
        let summary = ExportSummary {
            output: output.as_deref(),
            result: &extraction,
        };
        println!("{}", report::to_json(&summary)?);
    } else {
        print!(
            "{}",
            report::render_table_export(&extraction, output.as_deref())
        );
    }
    Ok(())
}

fn metadata(config: &AppConfig, pdf: &Path, json: bool) -> InspectResult<()> {
    validate_source(pdf)?;
    let pdfium = create_pdfium(&config.pdfium)?;
    let document = PdfiumBackend::open(&pdfium, pdf, false)?;

    let mut metadata = analysis::collect_metadata(&document)?;
    metadata.file_size = file_size(pdf);

    if json {
        println!("{}", report::to_json(&metadata)?);
    } else {
        print!("{}", report::render_metadata(pdf, &metadata));
    }
    Ok(())
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).map(|m| m.len()).ok()
}

/// `outer: inner: root` from an error and its sources.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    message
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format().with_target(true).compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdf_internals=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
