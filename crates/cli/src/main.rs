use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use coversheet_core::application::{
    CoversheetService, GenerationOptions, MissingStudentPolicy, ARCHIVE_FILE_NAME,
    ARCHIVE_MIME_TYPE,
};
use coversheet_core::domain::{GenerationReport, IdentifierList};
use coversheet_core::error::CoversheetError;
use coversheet_core::ports::{DocumentRenderer, StudentRepository};
use coversheet_core::style::{
    validate_font_size, BorderStyle, ColumnWidthPolicy, OutputFormat, RenderStyle, Rgb,
};
use coversheet_core::utils::parse_identifier_list;
use pdf_adapter::PdfRenderer;
use postgres_adapter::{DatabaseConfig, PostgresStudentRepository};
use sqlite_adapter::SqliteStudentRepository;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use xlsx_adapter::XlsxRenderer;
use zip_adapter::ZipArchiveWriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    Postgres,
    Sqlite,
}

/// CLI tool to generate exam result coversheets for a batch of students
#[derive(Parser, Debug)]
#[command(name = "coversheet")]
#[command(about = "Generates one exam coversheet per student and bundles them into a zip archive")]
struct Cli {
    /// Student identifiers separated by commas, e.g. "151596, 156756"
    #[arg(long, required_unless_present = "ids_file", conflicts_with = "ids_file")]
    ids: Option<String>,

    /// File holding identifiers separated by commas or newlines
    #[arg(long = "ids-file")]
    ids_file: Option<PathBuf>,

    /// Document format: pdf or xlsx
    #[arg(short = 'f', long, default_value = "pdf")]
    format: OutputFormat,

    /// Where the exam results live
    #[arg(long, value_enum, default_value_t = Backend::Postgres)]
    backend: Backend,

    /// Path to a SQLite database with the exam schema
    #[arg(long = "sqlite-db", required_if_eq("backend", "sqlite"))]
    sqlite_db: Option<PathBuf>,

    #[arg(long = "db-host", env = "COVERSHEET_DB_HOST", default_value = "localhost")]
    db_host: String,

    #[arg(long = "db-port", env = "COVERSHEET_DB_PORT", default_value_t = postgres_adapter::DEFAULT_PORT)]
    db_port: u16,

    #[arg(long = "db-name", env = "COVERSHEET_DB_NAME", default_value = "postgres")]
    db_name: String,

    #[arg(long = "db-user", env = "COVERSHEET_DB_USER", default_value = "postgres")]
    db_user: String,

    #[arg(
        long = "db-password",
        env = "COVERSHEET_DB_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    db_password: String,

    /// Upper bound in seconds for connecting and querying
    #[arg(long = "db-timeout-secs", env = "COVERSHEET_DB_TIMEOUT_SECS", default_value_t = 30)]
    db_timeout_secs: u64,

    /// Table header fill as hex RGB
    #[arg(long = "fill-color", default_value = "D9E1F2")]
    fill_color: Rgb,

    /// Cell borders: none, thin, medium or thick
    #[arg(long, default_value = "thin")]
    border: BorderStyle,

    /// Column widths: fixed or auto
    #[arg(long = "column-width", default_value = "fixed")]
    column_width: ColumnWidthPolicy,

    /// Body font size in points, 6 to 36
    #[arg(long = "font-size", default_value_t = 10.0, value_parser = parse_font_size)]
    font_size: f32,

    /// Password protecting spreadsheet coversheets against edits
    #[arg(long = "protect-password", env = "COVERSHEET_PROTECTION_PASSWORD", hide_env_values = true)]
    protect_password: Option<String>,

    /// What to do with identifiers that have no results: skip or abort
    #[arg(long = "on-missing", default_value = "skip")]
    on_missing: MissingStudentPolicy,

    /// Path where the zip archive will be written
    #[arg(short = 'o', long = "output", default_value = ARCHIVE_FILE_NAME)]
    output: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn parse_font_size(raw: &str) -> std::result::Result<f32, String> {
    let size: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    validate_font_size(size).map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_identifiers(cli: &Cli) -> Result<IdentifierList> {
    let text = match (&cli.ids, &cli.ids_file) {
        (Some(ids), _) => ids.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read identifier file {}", path.to_string_lossy()))?,
        (None, None) => String::new(),
    };
    Ok(parse_identifier_list(&text)?)
}

fn build_repository(cli: &Cli) -> Result<Box<dyn StudentRepository>> {
    let timeout = Duration::from_secs(cli.db_timeout_secs);
    match cli.backend {
        Backend::Sqlite => {
            let path = cli
                .sqlite_db
                .clone()
                .context("--sqlite-db is required with --backend sqlite")?;
            Ok(Box::new(
                SqliteStudentRepository::new(path).with_busy_timeout(timeout),
            ))
        }
        Backend::Postgres => Ok(Box::new(PostgresStudentRepository::new(DatabaseConfig {
            host: cli.db_host.clone(),
            port: cli.db_port,
            database: cli.db_name.clone(),
            user: cli.db_user.clone(),
            password: cli.db_password.clone(),
            timeout,
        }))),
    }
}

fn build_renderer(cli: &Cli) -> Box<dyn DocumentRenderer> {
    let style = RenderStyle {
        fill_color: cli.fill_color,
        border_style: cli.border,
        column_width_policy: cli.column_width,
        font_size: cli.font_size,
    };
    match cli.format {
        OutputFormat::Pdf => {
            if cli.protect_password.is_some() {
                warn!("--protect-password only applies to xlsx coversheets; ignoring it");
            }
            Box::new(PdfRenderer::new(style))
        }
        OutputFormat::Spreadsheet => {
            let renderer = XlsxRenderer::new(style);
            match &cli.protect_password {
                Some(password) if !password.is_empty() => {
                    Box::new(renderer.protect_with_password(password.as_str()))
                }
                _ => Box::new(renderer),
            }
        }
    }
}

fn run(cli: &Cli) -> Result<GenerationReport> {
    let identifiers = read_identifiers(cli)?;

    // Instantiate concrete implementations of secondary adapters
    let service = CoversheetService::new(
        build_repository(cli)?,
        build_renderer(cli),
        Box::new(ZipArchiveWriter::new()),
        GenerationOptions {
            missing_policy: cli.on_missing,
        },
    );

    let report = service.generate(&identifiers)?;
    std::fs::write(&cli.output, &report.archive).with_context(|| {
        format!(
            "failed to write archive {}",
            cli.output.to_string_lossy()
        )
    })?;
    info!(path = %cli.output.to_string_lossy(), mime = ARCHIVE_MIME_TYPE, "archive written");
    Ok(report)
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            for skipped in &report.skipped {
                eprintln!(
                    "skipped {} [{}]: {}",
                    skipped.external_id,
                    skipped.error.kind(),
                    skipped.error
                );
            }
            println!(
                "Successfully wrote {} coversheet(s) to {}",
                report.entries.len(),
                cli.output.to_string_lossy()
            );
        }
        Err(e) => {
            match e.downcast_ref::<CoversheetError>() {
                Some(err) => eprintln!("error[{}]: {}", err.kind(), err),
                None => eprintln!("error: {:#}", e),
            }
            std::process::exit(1);
        }
    }
}
