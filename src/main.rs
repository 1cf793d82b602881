use clap::{Parser, Subcommand};
use folio::resource::{FilesystemResourceProvider, LayeredResourceProvider, bundled};
use folio::{ExportConfig, ExportPipelineBuilder, FoFormatter, LogDiagnostics, TableModel, XsltEngine};
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use thiserror::Error;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Render tables to PDF through XSLT and XSL-FO")]
struct Cli {
    /// Log at debug level and dump the generated XSL-FO.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a table (JSON) to PDF.
    Export(ExportArgs),
    /// Apply a stylesheet to an XML document and print the result.
    Transform {
        data: PathBuf,
        stylesheet: PathBuf,
    },
    /// Render an XSL-FO document to PDF.
    Render {
        fo: PathBuf,
        out: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Table model JSON.
    table: PathBuf,

    /// Output PDF path.
    out: PathBuf,

    /// JSON object of configuration properties, applied over the table's own.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stylesheet file used instead of the configured one.
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    /// Directory searched for `stylesheet-path` before the bundled resources.
    #[arg(long)]
    resource_dir: Option<PathBuf>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Cannot access '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Export(#[from] folio::ExportError),

    #[error(transparent)]
    Xslt(#[from] folio_xslt::XsltError),

    #[error(transparent)]
    Render(#[from] folio_render_lopdf::RenderError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CliError + '_ {
    move |source| CliError::Io { path: path.display().to_string(), source }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(io_error(path))
}

/// Writes `path` through a temporary file in the same directory that is
/// renamed into place only once `write` succeeds. On failure `path` is left
/// as it was.
fn write_atomically(path: &Path, write: impl FnOnce(&mut dyn Write) -> Result<(), CliError>) -> Result<(), CliError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(io_error(path))?;
    {
        let mut out = BufWriter::new(temp.as_file_mut());
        write(&mut out)?;
        out.flush().map_err(io_error(path))?;
    }
    temp.persist(path).map_err(|e| io_error(path)(e.error))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.cmd {
        Command::Export(args) => export(args, cli.verbose),
        Command::Transform { data, stylesheet } => transform(&data, &stylesheet),
        Command::Render { fo, out } => render(&fo, &out),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn export(args: ExportArgs, verbose: bool) -> Result<(), CliError> {
    let start = Instant::now();
    let mut model = TableModel::from_json_str(&read(&args.table)?)?;
    if let Some(path) = &args.config {
        let overrides: BTreeMap<String, String> = serde_json::from_str(&read(path)?)?;
        for (key, value) in overrides {
            model.config.set(key, value);
        }
    }
    if let Some(path) = &args.stylesheet {
        model.config.set(ExportConfig::STYLESHEET_BODY, read(path)?);
    }

    let mut resources = LayeredResourceProvider::new();
    if let Some(dir) = &args.resource_dir {
        resources = resources.with_layer(Arc::new(FilesystemResourceProvider::new(dir)));
    }
    let pipeline = ExportPipelineBuilder::new()
        .with_resources(Arc::new(resources.with_layer(Arc::new(bundled()))))
        .with_diagnostics(Arc::new(LogDiagnostics::new().with_verbose(verbose)))
        .build();

    write_atomically(&args.out, |out| Ok(pipeline.export(&model, out)?))?;
    info!("Wrote {} in {:.2?}", args.out.display(), start.elapsed());
    Ok(())
}

fn transform(data: &Path, stylesheet: &Path) -> Result<(), CliError> {
    let transform = XsltEngine::new().compile_str(&read(stylesheet)?)?;
    let text = transform.transform_to_string(&read(data)?)?;
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    writeln!(lock, "{}", text).map_err(io_error(Path::new("<stdout>")))
}

fn render(fo: &Path, out: &Path) -> Result<(), CliError> {
    let source = read(fo)?;
    write_atomically(out, |writer| Ok(FoFormatter::new().format_markup(&source, writer)?))?;
    info!("Wrote {}", out.display());
    Ok(())
}
