//! CLI binary for vlm-ocr.
//!
//! A thin shim over the library crate that maps CLI flags onto
//! `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vlm_ocr::{
    process_batch, process_dataset, process_file, BatchProgressCallback, DatasetConfig,
    DatasetExporter, DatasetReport, LocalParquet, ManifestStore, NoopProgressCallback, OcrClient,
    PipelineConfig, ProceedingMetadata, ProcessingStatus, Resolution, ResourceRecord, ResourceType,
    SourceType, StatusUpdate, VllmServer,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the input files plus a log line
/// per file.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            errors: AtomicUsize::new(0),
        }
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_files as u64);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} file(s) to process"))
        ));
    }

    fn on_file_start(&self, path: &Path, _index: usize, _total: usize) {
        self.bar.set_message(dim(&path.display().to_string()));
    }

    fn on_page_complete(&self, _path: &Path, page_num: u32, total_pages: usize) {
        self.bar.set_message(dim(&format!("page {page_num}/{total_pages}")));
    }

    fn on_file_complete(&self, path: &Path, _index: usize, _total: usize, pages: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{pages} page(s)"))
        ));
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, path: &Path, _index: usize, _total: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            dim("–"),
            path.display(),
            dim("exists, skipped")
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, path: &Path, _index: usize, _total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), path.display(), red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} file(s) processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) processed  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the model server (separate terminal)
  ocr server

  # One image to stdout, one PDF to per-page markdown
  ocr process scan.png
  ocr process report.pdf -o out/

  # A whole tree, resumable
  ocr batch ./scans -o ./output

  # Images of a Hugging Face dataset (or a local copy of its parquet files)
  ocr dataset dataset.yaml
  ocr dataset dataset.yaml --local ./parquet -o ./output

  # Parquet dataset with 250 MB shards and a dataset card
  ocr export ./output --dataset-name hearings-ocr --max-shard-size 250 --card

  # Track a collection run
  ocr manifest init ./run --url https://www.congress.gov/event/118/house/115000 \
      --id hrg-115000 --title "Oversight Hearing"
  ocr manifest add ./run https://www.govinfo.gov/x.pdf --type pdf --source govinfo-api
  ocr manifest update ./run https://www.govinfo.gov/x.pdf --download downloaded
  ocr manifest stats ./run

ENVIRONMENT VARIABLES:
  OCR_SERVER_URL    Base URL of the OpenAI-compatible API (default http://127.0.0.1:8000/v1)
  OCR_MODEL         Model name sent with each request
  OCR_CONFIG        YAML configuration file
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Overrides --verbose / --quiet
"#;

/// OCR images and PDFs with a local vision model, track collection runs and
/// export the results as a parquet dataset.
#[derive(Parser, Debug)]
#[command(
    name = "ocr",
    version,
    about = "OCR images and PDFs with a local vision model and export parquet datasets",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// YAML configuration file (`ocr:` and `export:` sections).
    #[arg(long, global = true, env = "OCR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OCR_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "OCR_NO_PROGRESS")]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR one image or PDF. PDFs produce one markdown file per page.
    Process {
        input: PathBuf,
        /// Output file or directory (default: next to the input; stdout for images).
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// OCR every image and PDF under a directory, mirroring its structure.
    Batch {
        input_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// OCR the images of a Hugging Face dataset described by a YAML file.
    Dataset {
        /// Dataset configuration (name, subsets, splits, columns).
        dataset_config: PathBuf,
        /// Read `<dir>/<subset>/<split>/*.parquet` instead of the Hub.
        #[arg(long)]
        local: Option<PathBuf>,
        /// Overrides `output_dir` from the dataset configuration.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Export a markdown output tree to parquet under `<dir>/dataset/`.
    Export {
        output_dir: PathBuf,
        #[arg(short = 'n', long)]
        dataset_name: Option<String>,
        /// Export only this subset.
        #[arg(short, long)]
        subset: Option<String>,
        /// With --subset, export only this split.
        #[arg(long, requires = "subset")]
        split: Option<String>,
        /// Maximum estimated shard size in MB.
        #[arg(long)]
        max_shard_size: Option<f64>,
        /// OCR model recorded in the dataset card.
        #[arg(long)]
        ocr_model: Option<String>,
        #[arg(long, value_enum)]
        resolution: Option<ResolutionArg>,
        /// Also write `dataset/README.md`.
        #[arg(long)]
        card: bool,
    },
    /// Inspect and edit a collection manifest.
    #[command(subcommand)]
    Manifest(ManifestCommand),
    /// Check whether the OCR server answers on /health.
    Health {
        #[arg(long, env = "OCR_SERVER_URL")]
        server_url: Option<String>,
    },
    /// Run the vLLM OpenAI-compatible server in the foreground.
    Server(ServerArgs),
}

#[derive(Subcommand, Debug)]
enum ManifestCommand {
    /// Create `<dir>/manifest.json` (or resume it with --resume).
    Init {
        dir: PathBuf,
        #[arg(long)]
        url: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        committee: Option<String>,
        #[arg(long)]
        chamber: Option<String>,
        #[arg(long)]
        congress: Option<u32>,
        /// Keep an existing manifest instead of failing.
        #[arg(long)]
        resume: bool,
    },
    /// Add (or replace) a resource.
    Add {
        dir: PathBuf,
        url: String,
        #[arg(long = "type", value_enum)]
        resource_type: ResourceTypeArg,
        #[arg(long = "source", value_enum)]
        source_type: SourceTypeArg,
        /// Defaults to the last URL path segment.
        #[arg(long)]
        filename: Option<String>,
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// Update the status of a resource.
    Update {
        dir: PathBuf,
        url: String,
        #[arg(long, value_enum)]
        download: Option<StatusArg>,
        #[arg(long, value_enum)]
        ocr: Option<StatusArg>,
        #[arg(long, value_enum)]
        transcription: Option<StatusArg>,
        #[arg(long)]
        error: Option<String>,
        #[arg(long)]
        local_path: Option<PathBuf>,
        #[arg(long)]
        ocr_output: Option<PathBuf>,
        #[arg(long)]
        transcription_output: Option<PathBuf>,
        /// Increment the retry counter.
        #[arg(long)]
        retry: bool,
    },
    /// Print the aggregate counters.
    Stats {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List resources whose download is still pending.
    Pending {
        dir: PathBuf,
        #[arg(long = "type", value_enum)]
        resource_type: Option<ResourceTypeArg>,
    },
    /// Mark the run completed.
    Complete { dir: PathBuf },
}

/// OCR settings that override the configuration file.
#[derive(Args, Debug)]
struct OcrArgs {
    #[arg(long, env = "OCR_SERVER_URL")]
    server_url: Option<String>,
    #[arg(long, env = "OCR_MODEL")]
    model: Option<String>,
    #[arg(short, long, value_enum)]
    resolution: Option<ResolutionArg>,
    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: Option<u32>,
    /// Attempts per page.
    #[arg(long)]
    max_retries: Option<u32>,
    /// Max output tokens per page.
    #[arg(long)]
    max_tokens: Option<usize>,
    /// Text file with a custom prompt.
    #[arg(long)]
    prompt_file: Option<PathBuf>,
    /// Replace markdown files that already exist.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args, Debug)]
struct ServerArgs {
    #[arg(long, default_value = vlm_ocr::config::DEFAULT_MODEL)]
    model: String,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8000)]
    port: u16,
    #[arg(long, default_value_t = 0.9)]
    gpu_memory_utilization: f32,
    #[arg(long, default_value_t = 1)]
    tensor_parallel_size: u32,
    #[arg(long)]
    max_model_len: Option<u32>,
    /// Python interpreter with vLLM installed.
    #[arg(long, env = "OCR_PYTHON", default_value = "python")]
    python: String,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ResolutionArg {
    Tiny,
    Small,
    Base,
    Large,
    Gundam,
}

impl From<ResolutionArg> for Resolution {
    fn from(v: ResolutionArg) -> Self {
        match v {
            ResolutionArg::Tiny => Resolution::Tiny,
            ResolutionArg::Small => Resolution::Small,
            ResolutionArg::Base => Resolution::Base,
            ResolutionArg::Large => Resolution::Large,
            ResolutionArg::Gundam => Resolution::Gundam,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ResourceTypeArg {
    Pdf,
    Video,
    Audio,
    Text,
    Html,
}

impl From<ResourceTypeArg> for ResourceType {
    fn from(v: ResourceTypeArg) -> Self {
        match v {
            ResourceTypeArg::Pdf => ResourceType::Pdf,
            ResourceTypeArg::Video => ResourceType::Video,
            ResourceTypeArg::Audio => ResourceType::Audio,
            ResourceTypeArg::Text => ResourceType::Text,
            ResourceTypeArg::Html => ResourceType::Html,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SourceTypeArg {
    GovinfoApi,
    CongressGov,
    Youtube,
}

impl From<SourceTypeArg> for SourceType {
    fn from(v: SourceTypeArg) -> Self {
        match v {
            SourceTypeArg::GovinfoApi => SourceType::GovinfoApi,
            SourceTypeArg::CongressGov => SourceType::CongressGov,
            SourceTypeArg::Youtube => SourceType::Youtube,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Pending,
    Downloading,
    Downloaded,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl From<StatusArg> for ProcessingStatus {
    fn from(v: StatusArg) -> Self {
        match v {
            StatusArg::Pending => ProcessingStatus::Pending,
            StatusArg::Downloading => ProcessingStatus::Downloading,
            StatusArg::Downloaded => ProcessingStatus::Downloaded,
            StatusArg::Processing => ProcessingStatus::Processing,
            StatusArg::Completed => ProcessingStatus::Completed,
            StatusArg::Failed => ProcessingStatus::Failed,
            StatusArg::Skipped => ProcessingStatus::Skipped,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are suppressed while the batch progress bar is
    // active; the bar carries the per-file feedback.
    let show_progress =
        !cli.quiet && !cli.no_progress && matches!(cli.command, Command::Batch { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Process { input, output, ocr } => {
            apply_ocr_args(&mut config, &ocr).await?;
            let client = OcrClient::new(config.ocr.clone()).context("Invalid configuration")?;
            let result = process_file(&client, &input, output.as_deref(), &NoopProgressCallback)
                .await
                .with_context(|| format!("Failed to process {}", input.display()))?;

            if let Some(text) = result.text {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
            if !cli.quiet {
                for out in &result.outputs {
                    eprintln!("  {} {}", green("✓"), out.display());
                }
                if result.skipped_pages > 0 {
                    eprintln!(
                        "  {} output(s) already existed and were kept (use --overwrite)",
                        result.skipped_pages
                    );
                }
            }
        }

        Command::Batch {
            input_dir,
            output,
            ocr,
        } => {
            apply_ocr_args(&mut config, &ocr).await?;
            let client = OcrClient::new(config.ocr.clone()).context("Invalid configuration")?;

            let report = if show_progress {
                let cb = CliProgressCallback::new();
                process_batch(&client, &input_dir, &output, &cb).await
            } else {
                process_batch(&client, &input_dir, &output, &NoopProgressCallback).await
            }
            .context("Batch processing failed")?;

            if !cli.quiet {
                let s = &report.stats;
                eprintln!(
                    "{}  {} processed, {} skipped, {} failed  ({} PDF page(s), {}ms)",
                    if report.is_success() {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    s.processed_files,
                    s.skipped_files,
                    s.failed_files,
                    s.pdf_pages,
                    s.duration_ms
                );
                if let Some(path) = &report.error_report {
                    eprintln!("   Error details saved to: {}", bold(&path.display().to_string()));
                }
            }
        }

        Command::Dataset {
            dataset_config,
            local,
            output,
            ocr,
        } => {
            apply_ocr_args(&mut config, &ocr).await?;
            let mut dataset = DatasetConfig::from_yaml(&dataset_config).with_context(|| {
                format!("Failed to load dataset configuration {}", dataset_config.display())
            })?;
            if let Some(dir) = output {
                dataset.output_dir = dir;
            }
            if ocr.overwrite {
                dataset.overwrite = true;
            }
            let client = OcrClient::new(config.ocr.clone()).context("Invalid configuration")?;

            let report = match local {
                Some(root) => process_dataset(&client, &dataset, &LocalParquet::new(root))
                    .await
                    .map_err(anyhow::Error::from),
                None => process_from_hub(&client, &dataset).await,
            }
            .context("Dataset processing failed")?;

            if !cli.quiet {
                for (subset, s) in &report.subsets {
                    eprintln!(
                        "{} {}: {} processed, {} skipped, {} failed",
                        if s.error == 0 { green("✓") } else { cyan("⚠") },
                        bold(subset),
                        s.success,
                        s.skipped,
                        s.error
                    );
                }
                if let Some(path) = &report.error_report {
                    eprintln!("   Error details saved to: {}", bold(&path.display().to_string()));
                }
            }
        }

        Command::Export {
            output_dir,
            dataset_name,
            subset,
            split,
            max_shard_size,
            ocr_model,
            resolution,
            card,
        } => {
            if let Some(name) = dataset_name {
                config.export.dataset_name = name;
            }
            if let Some(mb) = max_shard_size {
                config.export.max_shard_size_mb = mb;
            }
            if let Some(model) = ocr_model {
                config.export.ocr_model = model;
            }
            if let Some(r) = resolution {
                config.export.resolution = r.into();
            }
            config.export.validate().context("Invalid configuration")?;

            let max_mb = config.export.max_shard_size_mb;
            let exporter = DatasetExporter::new(&output_dir, config.export.clone());

            let mut failed = 0;
            if let Some(subset) = subset {
                let path = exporter
                    .export_subset(&subset, split.as_deref())
                    .with_context(|| format!("Failed to export subset '{subset}'"))?;
                println!("{}", path.display());
            } else {
                let summary = exporter.export_all(max_mb).context("Export failed")?;
                for (subset, files) in &summary.files {
                    eprintln!("{} {}: {} file(s)", green("✓"), bold(subset), files.len());
                    for f in files {
                        println!("{}", f.display());
                    }
                }
                for failure in &summary.failures {
                    eprintln!("{} {}", red("✗"), failure);
                }
                failed = summary.failures.len();
            }

            if card {
                let path = exporter.dataset_dir().join("README.md");
                exporter
                    .create_dataset_card(Some(&path))
                    .context("Failed to write dataset card")?;
                eprintln!("{} {}", green("✓"), path.display());
            }

            if failed > 0 {
                anyhow::bail!("{failed} subset/split export(s) failed");
            }
        }

        Command::Manifest(cmd) => run_manifest(cmd, &config)?,

        Command::Health { server_url } => {
            if let Some(url) = server_url {
                config.ocr.server_url = url;
            }
            let client = OcrClient::new(config.ocr.clone()).context("Invalid configuration")?;
            if client.health_check().await {
                println!("{} server is healthy at {}", green("✔"), config.ocr.server_url);
            } else {
                anyhow::bail!(
                    "server is not available at {} (start it with `ocr server`)",
                    config.ocr.server_url
                );
            }
        }

        Command::Server(args) => {
            let server = VllmServer {
                python: args.python,
                model: args.model,
                host: args.host,
                port: args.port,
                gpu_memory_utilization: args.gpu_memory_utilization,
                tensor_parallel_size: args.tensor_parallel_size,
                max_model_len: args.max_model_len,
            };
            server.run().await.context("vLLM server stopped")?;
        }
    }

    Ok(())
}

#[cfg(feature = "hub")]
async fn process_from_hub(client: &OcrClient, dataset: &DatasetConfig) -> Result<DatasetReport> {
    let hub = vlm_ocr::dataset::HubDataset::new(&dataset.name)?;
    Ok(process_dataset(client, dataset, &hub).await?)
}

#[cfg(not(feature = "hub"))]
async fn process_from_hub(_client: &OcrClient, _dataset: &DatasetConfig) -> Result<DatasetReport> {
    anyhow::bail!("built without the `hub` feature; pass --local <dir>")
}

/// Apply `OcrArgs` on top of the loaded configuration.
async fn apply_ocr_args(config: &mut PipelineConfig, args: &OcrArgs) -> Result<()> {
    let ocr = &mut config.ocr;
    if let Some(url) = &args.server_url {
        ocr.server_url = url.clone();
    }
    if let Some(model) = &args.model {
        ocr.model = model.clone();
    }
    if let Some(r) = args.resolution {
        ocr.resolution = r.into();
    }
    if let Some(dpi) = args.dpi {
        ocr.dpi = dpi;
    }
    if let Some(n) = args.max_retries {
        ocr.max_retries = n;
    }
    if let Some(n) = args.max_tokens {
        ocr.max_tokens = n;
    }
    if let Some(path) = &args.prompt_file {
        ocr.prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
    }
    if args.overwrite {
        ocr.overwrite = true;
    }
    ocr.validate().context("Invalid configuration")?;
    Ok(())
}

fn run_manifest(cmd: ManifestCommand, config: &PipelineConfig) -> Result<()> {
    match cmd {
        ManifestCommand::Init {
            dir,
            url,
            id,
            title,
            committee,
            chamber,
            congress,
            resume,
        } => {
            let store = ManifestStore::new(&dir);
            let mut metadata =
                ProceedingMetadata::new(&url, id, title).context("Invalid proceeding URL")?;
            metadata.committee = committee;
            metadata.chamber = chamber;
            metadata.congress_number = congress;

            let manifest = if resume {
                store.load_or_create(metadata, config.snapshot())?
            } else {
                if store.exists() {
                    anyhow::bail!(
                        "{} already exists (use --resume to keep it)",
                        store.manifest_path().display()
                    );
                }
                store.create(metadata, config.snapshot())?
            };
            println!(
                "{} {} ({} resources)",
                green("✔"),
                store.manifest_path().display(),
                manifest.total_resources
            );
        }

        ManifestCommand::Add {
            dir,
            url,
            resource_type,
            source_type,
            filename,
            priority,
        } => {
            let store = ManifestStore::new(&dir);
            let mut manifest = store.load()?;
            let filename = filename.unwrap_or_else(|| {
                url.trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            });
            let record = ResourceRecord::new(
                &url,
                resource_type.into(),
                source_type.into(),
                filename,
                priority,
            )?;
            store.add_resource(&mut manifest, record)?;
            println!("{} added ({} resources)", green("✔"), manifest.total_resources);
        }

        ManifestCommand::Update {
            dir,
            url,
            download,
            ocr,
            transcription,
            error,
            local_path,
            ocr_output,
            transcription_output,
            retry,
        } => {
            let store = ManifestStore::new(&dir);
            let mut manifest = store.load()?;
            let update = StatusUpdate {
                download: download.map(Into::into),
                ocr: ocr.map(Into::into),
                transcription: transcription.map(Into::into),
                error_message: error,
                local_path,
                ocr_output_path: ocr_output,
                transcription_output_path: transcription_output,
                increment_retry: retry,
            };
            store.update_status(&mut manifest, &url, update)?;
            println!("{} updated {}", green("✔"), url);
        }

        ManifestCommand::Stats { dir, json } => {
            let manifest = ManifestStore::new(&dir).load()?;
            let stats = manifest.statistics();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
                );
            } else {
                println!("Proceeding:     {}", manifest.metadata.title);
                println!("Started:        {}", manifest.started_at.to_rfc3339());
                if let Some(done) = manifest.completed_at {
                    println!("Completed:      {}", done.to_rfc3339());
                }
                println!("Resources:      {}", stats.total_resources);
                println!("Downloaded:     {}", stats.downloaded);
                println!("OCR completed:  {}", stats.ocr_completed);
                println!("Transcribed:    {}", stats.transcription_completed);
                println!("Failed:         {}", stats.failed);
                println!("Pending:        {}", stats.pending);
            }
        }

        ManifestCommand::Pending { dir, resource_type } => {
            let manifest = ManifestStore::new(&dir).load()?;
            for r in manifest.pending(resource_type.map(Into::into)) {
                println!("{}\t{}\t{}", r.resource_type, r.priority, r.url);
            }
        }

        ManifestCommand::Complete { dir } => {
            let store = ManifestStore::new(&dir);
            let mut manifest = store.load()?;
            store.mark_completed(&mut manifest)?;
            println!("{} collection marked completed", green("✔"));
        }
    }
    Ok(())
}
