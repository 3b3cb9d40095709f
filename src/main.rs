use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use flipbook::panic_handler::initialize_panic_handler;
use flipbook::pdf::{
    DocumentSource, MuPdfBackend, OpenOptions, PdfBackend, RenderParams, render_page,
};
use flipbook::settings::default_config_path;
use flipbook::{BaseSize, HeadlessViewer, ReadySignal, ViewerConfig, ViewerError, Viewport};

/// How long a command waits for outstanding renders
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "flipbook", version)]
#[command(about = "Page-flipping PDF viewer core")]
struct Cli {
    /// YAML configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct Geometry {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Viewport height in pixels
    #[arg(long, default_value_t = 800)]
    height: u32,
    /// Width of the element hosting the viewer; defaults to the viewport width
    #[arg(long)]
    container: Option<u32>,
    #[arg(long, default_value_t = BaseSize::DEFAULT.width)]
    base_width: u32,
    #[arg(long, default_value_t = BaseSize::DEFAULT.height)]
    base_height: u32,
}

impl Geometry {
    fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height).with_container(self.container.unwrap_or(self.width))
    }

    fn base(&self) -> BaseSize {
        BaseSize::new(self.base_width, self.base_height)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Lay out the book, optionally navigate, and print the viewer state as JSON
    Inspect {
        /// PDF path or http(s)/file URL
        source: String,
        #[command(flatten)]
        geometry: Geometry,
        /// Go to these 1-based pages in order before printing
        #[arg(long = "goto", value_name = "PAGE")]
        goto: Vec<i64>,
    },
    /// Render one page to a JPEG file, or print it as a data URL
    Render {
        source: String,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Output file; without it the image is printed as a `data:` URL
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = 900)]
        width: u32,
        #[arg(long, default_value_t = 1200)]
        height: u32,
        /// JPEG quality between 0 and 1
        #[arg(long, default_value_t = 0.88)]
        quality: f32,
    },
    /// Render every thumbnail into a directory
    Thumbnails {
        source: String,
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[command(flatten)]
        geometry: Geometry,
    },
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            WriteLogger::init(level, Config::default(), file)?;
        }
        None => WriteLogger::init(level, Config::default(), std::io::stderr())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    initialize_panic_handler();

    let config_path = cli.config.clone().or_else(default_config_path);
    let config = ViewerConfig::load_or_default(config_path.as_deref());
    let backend: Arc<dyn PdfBackend> = Arc::new(MuPdfBackend::new());

    info!("Starting flipbook {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Inspect {
            source,
            geometry,
            goto,
        } => run_inspect(backend, &source, &geometry, &goto, config),
        Commands::Render {
            source,
            page,
            out,
            width,
            height,
            quality,
        } => run_render(
            backend.as_ref(),
            &source,
            page,
            out.as_deref(),
            RenderParams::new(width, height, quality),
        ),
        Commands::Thumbnails {
            source,
            out,
            geometry,
        } => run_thumbnails(backend, &source, &out, &geometry, config),
    }
}

fn open_viewer(
    backend: Arc<dyn PdfBackend>,
    source: &str,
    geometry: &Geometry,
    config: ViewerConfig,
) -> Result<HeadlessViewer> {
    HeadlessViewer::open(
        backend,
        DocumentSource::parse(source),
        geometry.base(),
        geometry.viewport(),
        config,
        ReadySignal::ready(),
    )
    .map_err(|e: ViewerError| {
        let screen = e.error_screen();
        eprintln!("{}\n{}", screen.message, screen.hint);
        anyhow::Error::new(e)
    })
    .with_context(|| format!("Failed to open {source}"))
}

fn run_inspect(
    backend: Arc<dyn PdfBackend>,
    source: &str,
    geometry: &Geometry,
    goto: &[i64],
    config: ViewerConfig,
) -> Result<()> {
    let mut viewer = open_viewer(backend, source, geometry, config)?;
    for &page in goto {
        viewer.go_to_page(page);
    }
    if !viewer.settle(SETTLE_TIMEOUT) {
        error!(
            "{} renders still outstanding after {SETTLE_TIMEOUT:?}",
            viewer.pending_renders()
        );
    }

    let json = serde_json::to_string_pretty(&viewer.snapshot())?;
    println!("{json}");
    Ok(())
}

fn run_render(
    backend: &dyn PdfBackend,
    source: &str,
    page: usize,
    out: Option<&Path>,
    params: RenderParams,
) -> Result<()> {
    if page == 0 {
        bail!("Page numbers start at 1");
    }
    let doc = backend
        .open(&DocumentSource::parse(source), &OpenOptions::default())
        .with_context(|| format!("Failed to open {source}"))?;
    if page > doc.page_count() {
        bail!("Page {page} out of range, document has {} pages", doc.page_count());
    }

    let image = render_page(doc.as_ref(), page - 1, &params)
        .with_context(|| format!("Failed to render page {page}"))?;
    match out {
        Some(out) => {
            fs::write(out, &image.bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("{} ({}x{})", out.display(), image.width, image.height);
        }
        None => println!("{}", image.data_url()),
    }
    Ok(())
}

fn run_thumbnails(
    backend: Arc<dyn PdfBackend>,
    source: &str,
    out: &Path,
    geometry: &Geometry,
    config: ViewerConfig,
) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let mut viewer = open_viewer(backend, source, geometry, config)?;
    let count = viewer.page_count();
    viewer.toggle_thumbnails();
    viewer.thumbnails_visible(0..count);
    if !viewer.settle(SETTLE_TIMEOUT) {
        error!(
            "{} thumbnails still outstanding after {SETTLE_TIMEOUT:?}",
            viewer.pending_renders()
        );
    }

    let mut written = 0;
    for page in 0..count {
        let Some(image) = viewer.thumbnails().image(page) else {
            error!("No thumbnail for page {}", page + 1);
            continue;
        };
        let path = out.join(format!("page-{:03}.jpg", page + 1));
        fs::write(&path, &image.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }

    println!("{written} of {count} thumbnails written to {}", out.display());
    Ok(())
}
