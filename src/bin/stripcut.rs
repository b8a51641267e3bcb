//! CLI binary for stripcut.
//!
//! A thin shim over the library crate that maps CLI flags to `StripConfig`
//! and an `Operation`, writes the zip archive, and prints a summary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stripcut::{
    process_to_file, AlphaPolicy, ErrorPayload, ImageSource, InputImage, NamingScheme,
    Operation, OrderingKey, OutputFormat, ProcessOutput, ProgressCallback, RemainderPolicy,
    ResizeSpec, SplitMode, Stage, StripConfig, StripError, StripProgressCallback,
};
use tracing_subscriber::EnvFilter;

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while images load, then a bar over
/// the output images with one log line per written strip.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Loading");
        bar.set_message("Decoding images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once the output count is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Encoding");
    }
}

impl StripProgressCallback for CliProgressCallback {
    fn on_load_complete(&self, images: usize, skipped: usize) {
        let note = if skipped > 0 {
            format!("  ({} skipped)", red(&skipped.to_string()))
        } else {
            String::new()
        };
        self.bar.println(format!(
            "{} {}{}",
            cyan("◆"),
            bold(&format!("Loaded {images} images")),
            note
        ));
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_file_skipped(&self, name: &str, error: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        let msg = if error.len() > 80 {
            let cut = error
                .char_indices()
                .nth(79)
                .map(|(i, _)| i)
                .unwrap_or(error.len());
            format!("{}\u{2026}", &error[..cut])
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), name, dim(&msg)));
    }

    fn on_transform_start(&self, total_outputs: usize) {
        self.activate_bar(total_outputs);
    }

    fn on_output_complete(&self, index: usize, total: usize, name: &str, bytes: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<28}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            dim(&format!("{:>8} bytes", bytes)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, outputs: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!("{} {} images written", green("✔"), bold(&outputs.to_string()));
        } else {
            eprintln!(
                "{} {} images written  ({} input files skipped)",
                cyan("⚠"),
                bold(&outputs.to_string()),
                red(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split one tall image into 3 strips
  stripcut --action split --parts 3 long_page.png

  # Split into strips of at least 1200px
  stripcut --action split --min-height 1200 long_page.png -o strips.zip

  # Merge a chapter folder, 2 images per output (folder files are consumed)
  stripcut --action merge --parts 2 chapter_01/

  # Keep the folder untouched, emit merged_N.png
  stripcut -a merge -p 4 --keep-sources --naming sequential --format png chapter_01/

  # Resize to 800px wide before merging
  stripcut -a merge -p 2 --width 800 *.jpg

INPUT MODES:
  A single folder       every .png/.jpg/.jpeg/.webp directly inside it is used;
                        consumed files are deleted unless --keep-sources is set.
  One or more files     files are read into memory; nothing on disk changes.

OUTPUT NAMES:
  source       split: {id}_{n}.jpg   merge: {id}_group_{n}.jpg   (default)
  sequential   split: part_{n}.jpg   merge: merged_{n}.jpg
  {id} is the folder name (folder input), the file stem (single file), the
  parent folder name (several files), or --prefix.
"#;

/// Split tall images into strips or merge strips into pages.
#[derive(Parser, Debug)]
#[command(
    name = "stripcut",
    version,
    about = "Split tall images into strips or merge strips into pages, packaged as a zip",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// A folder of images, or one or more image files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Operation to run.
    #[arg(short, long, env = "STRIPCUT_ACTION", value_enum)]
    action: ActionArg,

    /// Strips per image (split) or images per group (merge).
    #[arg(short, long, env = "STRIPCUT_PARTS", default_value_t = 2)]
    parts: u32,

    /// Split by minimum strip height in pixels instead of --parts.
    #[arg(long, env = "STRIPCUT_MIN_HEIGHT")]
    min_height: Option<u32>,

    /// Resize every image to this width before the transform.
    #[arg(long, env = "STRIPCUT_WIDTH")]
    width: Option<u32>,

    /// Resize every image to this height before the transform.
    #[arg(long, env = "STRIPCUT_HEIGHT")]
    height: Option<u32>,

    /// Zip archive to write.
    #[arg(short, long, env = "STRIPCUT_OUTPUT", default_value = "processed_images.zip")]
    output: PathBuf,

    /// Output image format.
    #[arg(long, env = "STRIPCUT_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// JPEG quality (1–100).
    #[arg(long, env = "STRIPCUT_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Output naming scheme.
    #[arg(long, env = "STRIPCUT_NAMING", value_enum, default_value = "source")]
    naming: NamingArg,

    /// Identifier used in output names instead of the source name.
    #[arg(long, env = "STRIPCUT_PREFIX")]
    prefix: Option<String>,

    /// What to do with rows that do not divide evenly on split.
    #[arg(long, env = "STRIPCUT_REMAINDER", value_enum, default_value = "drop")]
    remainder: RemainderArg,

    /// File-name key that decides reading order.
    #[arg(long, env = "STRIPCUT_ORDERING", value_enum, default_value = "first-number")]
    ordering: OrderingArg,

    /// Composite transparent images over this colour (hex RRGGBB) instead of
    /// dropping the alpha channel.
    #[arg(long, env = "STRIPCUT_BACKGROUND")]
    background: Option<String>,

    /// Abort on the first undecodable file instead of skipping it.
    #[arg(long, env = "STRIPCUT_STRICT")]
    strict: bool,

    /// Do not delete consumed files in folder mode.
    #[arg(long, env = "STRIPCUT_KEEP_SOURCES")]
    keep_sources: bool,

    /// Print a JSON summary (or `{"error": ...}`) on stdout.
    #[arg(long, env = "STRIPCUT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "STRIPCUT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STRIPCUT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STRIPCUT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Split,
    Merge,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NamingArg {
    Source,
    Sequential,
}

impl From<NamingArg> for NamingScheme {
    fn from(v: NamingArg) -> Self {
        match v {
            NamingArg::Source => NamingScheme::Source,
            NamingArg::Sequential => NamingScheme::Sequential,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RemainderArg {
    Drop,
    Extend,
}

impl From<RemainderArg> for RemainderPolicy {
    fn from(v: RemainderArg) -> Self {
        match v {
            RemainderArg::Drop => RemainderPolicy::Drop,
            RemainderArg::Extend => RemainderPolicy::Extend,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderingArg {
    FirstNumber,
    TwoPart,
}

impl From<OrderingArg> for OrderingKey {
    fn from(v: OrderingArg) -> Self {
        match v {
            OrderingArg::FirstNumber => OrderingKey::FirstNumber,
            OrderingArg::TwoPart => OrderingKey::TwoPart,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config + operation ─────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn StripProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let operation = build_operation(&cli);
    let source = build_source(&cli.inputs).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = process_to_file(source, operation, &config, &cli.output).await;

    if cli.json {
        return print_json(result, &cli.output);
    }

    let output = result.with_context(|| format!("{} failed", operation.name()))?;
    if !cli.quiet {
        print_summary(&output, &cli.output, show_progress);
    }

    Ok(())
}

/// Map CLI args to `StripConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StripConfig> {
    let format = match cli.format {
        FormatArg::Jpeg => OutputFormat::Jpeg {
            quality: cli.quality,
        },
        FormatArg::Png => OutputFormat::Png,
    };
    let alpha = match cli.background {
        Some(ref hex) => AlphaPolicy::Background(parse_hex_colour(hex)?),
        None => AlphaPolicy::Discard,
    };

    let mut builder = StripConfig::builder()
        .output_format(format)
        .naming(cli.naming.into())
        .remainder(cli.remainder.into())
        .ordering(cli.ordering.into())
        .alpha(alpha)
        .resize(ResizeSpec::new(cli.width, cli.height))
        .strict_decode(cli.strict)
        .consume_sources(!cli.keep_sources);

    if let Some(ref prefix) = cli.prefix {
        builder = builder.output_prefix(prefix.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_operation(cli: &Cli) -> Operation {
    match cli.action {
        ActionArg::Split => match cli.min_height {
            Some(h) => Operation::Split(SplitMode::MinHeight(h)),
            None => Operation::Split(SplitMode::Parts(cli.parts)),
        },
        ActionArg::Merge => Operation::Merge {
            group_size: cli.parts as usize,
        },
    }
}

/// A single folder is an on-disk source; anything else is read into memory.
async fn build_source(inputs: &[PathBuf]) -> Result<ImageSource> {
    if let [single] = inputs {
        if single.is_dir() {
            return Ok(ImageSource::on_disk(single));
        }
    }

    let mut images = Vec::with_capacity(inputs.len());
    for path in inputs {
        if path.is_dir() {
            bail!(
                "'{}' is a folder; pass a single folder or only image files",
                path.display()
            );
        }
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' has no file name", path.display()))?;
        images.push(InputImage::new(name, bytes));
    }

    Ok(ImageSource::in_memory(memory_label(inputs), images))
}

/// File stem for one file, otherwise the first file's parent folder name.
fn memory_label(inputs: &[PathBuf]) -> String {
    let from_parent = |p: &Path| {
        p.canonicalize()
            .ok()
            .and_then(|c| c.parent().and_then(|d| d.file_name()).map(|n| n.to_os_string()))
    };
    let label = match inputs {
        [single] => single.file_stem().map(|s| s.to_os_string()),
        [first, ..] => from_parent(first),
        [] => None,
    };
    label
        .map(|l| l.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string())
}

/// Parse `RRGGBB` or `#RRGGBB`.
fn parse_hex_colour(s: &str) -> Result<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("Invalid colour '{s}': expected RRGGBB");
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .with_context(|| format!("Invalid colour '{s}': expected RRGGBB"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn print_json(result: Result<ProcessOutput, StripError>, archive: &Path) -> Result<()> {
    match result {
        Ok(output) => {
            let mut value =
                serde_json::to_value(&output).context("Failed to serialise output")?;
            value["archive"] = serde_json::Value::String(archive.display().to_string());
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to serialise output")?
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ErrorPayload::from(&e))
                    .context("Failed to serialise error")?
            );
            std::process::exit(1);
        }
    }
}

fn print_summary(output: &ProcessOutput, archive: &Path, show_progress: bool) {
    let stats = &output.stats;
    if !show_progress {
        for skipped in &output.skipped {
            eprintln!("  {} {}", red("✗"), skipped);
        }
    }
    eprintln!(
        "{}  {} {} → {} images  {}ms  →  {}",
        if output.skipped.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.operation,
        stats.input_images,
        stats.output_images,
        stats.total_duration_ms,
        bold(&archive.display().to_string()),
    );
    if stats.dropped_rows > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} trailing rows dropped (use --remainder extend to keep them)",
                stats.dropped_rows
            ))
        );
    }
    if stats.consumed_sources > 0 {
        eprintln!(
            "   {}",
            dim(&format!("{} source files removed", stats.consumed_sources))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colour_parsing() {
        assert_eq!(parse_hex_colour("#ffffff").unwrap(), [255, 255, 255]);
        assert_eq!(parse_hex_colour("102030").unwrap(), [16, 32, 48]);
        assert!(parse_hex_colour("fff").is_err());
        assert!(parse_hex_colour("gg0000").is_err());
    }

    #[test]
    fn merge_uses_parts_as_group_size() {
        let cli = Cli::parse_from(["stripcut", "-a", "merge", "-p", "4", "x.png"]);
        assert_eq!(build_operation(&cli), Operation::Merge { group_size: 4 });
    }

    #[test]
    fn min_height_overrides_parts() {
        let cli = Cli::parse_from(["stripcut", "-a", "split", "--min-height", "900", "x.png"]);
        assert_eq!(
            build_operation(&cli),
            Operation::Split(SplitMode::MinHeight(900))
        );
    }

    #[test]
    fn single_file_label_is_stem() {
        assert_eq!(memory_label(&[PathBuf::from("dir/long_page.png")]), "long_page");
    }
}
