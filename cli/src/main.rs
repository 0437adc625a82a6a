//! docport CLI - multi-format document export tool

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docport::{
    check_file, load_file, run, BatchObserver, BatchOptions, ExportFormat, ExportOptions,
    ExportResult, JsonFormat, LoadOptions, PageSize, RenderOptions, RunOptions, RunOutcome,
    Severity,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "docport")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Export documents to HTML, Markdown, DOCX, PDF, and JSON", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a file or glob pattern to one or more formats
    Export(ExportArgs),

    /// Validate a document and list what will be clamped or replaced
    Check {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show document information
    Info {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List supported output formats
    Formats,

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Input file or glob pattern (relative to --root)
    #[arg(value_name = "INPUT|GLOB")]
    input: String,

    /// Output formats, comma separated
    #[arg(short, long = "format", value_name = "FORMATS", value_delimiter = ',', default_value = "html")]
    formats: Vec<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", env = "DOCPORT_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Inputs must resolve inside this directory
    #[arg(long, value_name = "DIR", env = "DOCPORT_ROOT", default_value = ".")]
    root: PathBuf,

    /// Show what would be written without reading or writing anything
    #[arg(long)]
    dry_run: bool,

    /// Number of parallel workers (default: available CPUs)
    #[arg(short, long, value_name = "N", env = "DOCPORT_JOBS")]
    jobs: Option<usize>,

    /// Omit YAML front matter from Markdown output
    #[arg(long)]
    no_frontmatter: bool,

    /// Page size for paginated output (a4, letter, or WxH in points)
    #[arg(long, value_name = "SIZE", default_value = "a4")]
    page_size: String,

    /// Write compact JSON
    #[arg(long)]
    compact_json: bool,

    /// Fail on unparseable input instead of treating it as plain text
    #[arg(long)]
    strict: bool,

    /// Print the export report as JSON
    #[arg(long)]
    json: bool,
}

impl ExportArgs {
    fn run_options(&self) -> CliResult<RunOptions> {
        let page_size = PageSize::parse(&self.page_size)?;
        let json_format = if self.compact_json {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        };
        let render = RenderOptions::new()
            .with_frontmatter(!self.no_frontmatter)
            .with_page_size(page_size)
            .with_json_format(json_format);
        let load = if self.strict {
            LoadOptions::new().strict()
        } else {
            LoadOptions::new()
        };

        let mut batch = BatchOptions::new().with_dry_run(self.dry_run);
        if let Some(jobs) = self.jobs {
            batch = batch.with_concurrency(jobs);
        }

        Ok(RunOptions::new(self.input.clone(), self.formats.iter().cloned())
            .with_export_options(
                ExportOptions::new()
                    .with_output_dir(&self.output)
                    .with_root(&self.root)
                    .with_render_options(render)
                    .with_load_options(load),
            )
            .with_batch_options(batch))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Export(args) => cmd_export(&args, cli.quiet),
        Commands::Check { input } => cmd_check(&input),
        Commands::Info { input } => cmd_info(&input).map(|()| true),
        Commands::Formats => {
            cmd_formats();
            Ok(true)
        }
        Commands::Version => {
            cmd_version();
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` overrides the level derived from the flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Drives a progress bar from batch events.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> CliResult<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl BatchObserver for ProgressObserver {
    fn on_files(&self, files: &[PathBuf], formats: usize) {
        self.bar.set_length((files.len() * formats) as u64);
    }

    fn on_result(&self, result: &ExportResult) {
        if let Some(input) = &result.input {
            let name = input.file_name().unwrap_or_default().to_string_lossy();
            self.bar.set_message(format!("{} [{}]", name, result.format));
        }
        self.bar.inc(1);
    }
}

fn cmd_export(args: &ExportArgs, quiet: bool) -> CliResult<bool> {
    let mut options = args.run_options()?;

    let progress = if quiet || args.json || args.dry_run || !docport::is_glob(&args.input) {
        None
    } else {
        Some(Arc::new(ProgressObserver::new()?))
    };
    if let Some(observer) = &progress {
        options = options.with_observer(observer.clone());
    }

    log::debug!("Run options: {:?}", options);
    let outcome = run(&options)?;
    if let Some(observer) = &progress {
        observer.bar.finish_and_clear();
    }

    if args.json {
        let json = match &outcome {
            RunOutcome::Plan(_) => serde_json::to_string_pretty(&outcome)?,
            _ => outcome.report().to_json()?,
        };
        println!("{}", json);
        return Ok(!outcome.has_failures());
    }

    match &outcome {
        RunOutcome::Plan(plan) => {
            println!("{}", "Dry run: nothing was written".cyan().bold());
            for pair in &plan.pairs {
                println!(
                    "  {} {} {}",
                    pair.input.display(),
                    "->".dimmed(),
                    pair.output_path.display()
                );
            }
            for format in &plan.rejected_formats {
                println!("  {} unsupported format '{}'", "skip".yellow(), format);
            }
            for input in &plan.rejected_inputs {
                println!("  {} {} is outside the allowed root", "skip".yellow(), input.display());
            }
            println!(
                "\n{} files, {} pairs planned",
                plan.files.len(),
                plan.pairs.len()
            );
        }
        _ => {
            for result in outcome.results() {
                print_result(result);
            }
            let report = outcome.report();
            println!();
            print!("{}", report.summary());
        }
    }

    Ok(!outcome.has_failures())
}

fn print_result(result: &ExportResult) {
    if result.success {
        let path = result
            .output_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "  {} {} ({} bytes)",
            "ok".green(),
            path,
            result.size.unwrap_or(0)
        );
        for warning in &result.warnings {
            println!("     {} {}", "warning".yellow(), warning.message);
        }
    } else {
        let input = result
            .input
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "  {} {} [{}]: {}",
            "failed".red(),
            input,
            result.format,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn cmd_check(input: &Path) -> CliResult<bool> {
    let report = check_file(input)?;

    if report.is_empty() {
        println!("{} {}", "No issues found in".green(), input.display());
        return Ok(true);
    }

    for diagnostic in &report.diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow(),
            Severity::Info => "info".dimmed(),
        };
        let location = diagnostic
            .section
            .map(|i| format!("section {}", i))
            .unwrap_or_else(|| "document".to_string());
        println!(
            "{} [{}] {}: {}",
            severity, diagnostic.rule, location, diagnostic.message
        );
    }

    println!(
        "\n{} errors, {} warnings, {} notes",
        report.count(Severity::Error),
        report.count(Severity::Warning),
        report.count(Severity::Info)
    );
    Ok(report.is_valid())
}

fn cmd_info(input: &Path) -> CliResult<()> {
    let doc = load_file(input, &LoadOptions::default())?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!(
        "{}: {}",
        "Source".bold(),
        docport::SourceKind::from_path(input).as_str()
    );
    if let Some(title) = doc.title() {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(author) = doc.metadata.author() {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(date) = doc.metadata.date() {
        println!("{}: {}", "Date".bold(), date);
    }
    let keywords = doc.metadata.keywords();
    if !keywords.is_empty() {
        println!("{}: {}", "Keywords".bold(), keywords.join(", "));
    }
    println!("{}: {}", "Metadata keys".bold(), doc.metadata.len());

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for section in &doc.sections {
        *kinds.entry(section.kind()).or_default() += 1;
    }
    let text = doc.plain_text();

    println!("{}: {}", "Sections".bold(), doc.len());
    for (kind, count) in &kinds {
        println!("  {} {}: {}", "─".dimmed(), kind, count);
    }
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());

    Ok(())
}

fn cmd_formats() {
    println!("{}", "Supported formats".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for format in ExportFormat::ALL {
        let kind = if format.is_binary() { "binary" } else { "text" };
        println!(
            "  {:<9} .{:<5} {:<6} {}",
            format.as_str().bold(),
            format.extension(),
            kind,
            format.mime_type().dimmed()
        );
    }
}

fn cmd_version() {
    println!("{} {}", "docport".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Multi-format document export tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/docport".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_args(args: &[&str]) -> ExportArgs {
        let cli = Cli::try_parse_from(["docport", "export"].iter().chain(args)).unwrap();
        match cli.command {
            Commands::Export(args) => args,
            _ => panic!("expected the export command"),
        }
    }

    #[test]
    fn test_format_list_is_split() {
        let args = export_args(&["a.md", "-f", "html,markdown"]);
        assert_eq!(args.formats, vec!["html", "markdown"]);
    }

    #[test]
    fn test_bad_page_size() {
        let args = export_args(&["a.md", "--page-size", "napkin"]);
        assert!(args.run_options().is_err());
    }

    #[test]
    fn test_export_smoke() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# T\n\n- a\n- b\n").unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let out = dir.path().join("out").to_string_lossy().into_owned();

        let args = export_args(&["a.md", "-f", "html,markdown", "--root", &root, "-o", &out]);
        assert!(cmd_export(&args, true).unwrap());
        assert!(dir.path().join("out/a.html").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/a.md")).unwrap(),
            "# T\n\n- a\n- b\n"
        );
    }

    #[test]
    fn test_export_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# T\n").unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let out = dir.path().join("out").to_string_lossy().into_owned();

        let args = export_args(&["a.md", "-f", "evil", "--root", &root, "-o", &out]);
        assert!(!cmd_export(&args, true).unwrap());
    }
}
