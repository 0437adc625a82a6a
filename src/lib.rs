//! # docport
//!
//! Multi-format document export engine for Rust.
//!
//! One format-agnostic document model (metadata plus ordered, typed sections)
//! is rendered into HTML, Markdown, a flow document (DOCX), a paginated
//! document (PDF), or a JSON dump of the model.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docport::{load_file, render, LoadOptions};
//!
//! fn main() -> docport::Result<()> {
//!     // Load a Markdown file
//!     let doc = load_file("guide.md", &LoadOptions::default())?;
//!
//!     // Convert to HTML
//!     let options = render::RenderOptions::default();
//!     let html = render::to_html(&doc, &options)?;
//!     println!("{}", html);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Multiple output formats**: HTML, Markdown, DOCX, PDF, JSON
//! - **Multiple inputs**: JSON documents, Markdown, CSV, plain text
//! - **Path confinement**: inputs must resolve inside an allowed root
//! - **Batch export**: glob patterns, dry runs, bounded parallelism via Rayon
//! - **Failure isolation**: one bad section or pair never stops the others
//! - **Pluggable encoders**: binary formats are produced by [`render::BinaryEncoder`]s

pub mod batch;
pub mod error;
pub mod export;
pub mod format;
pub mod loader;
pub mod model;
pub mod render;
pub mod report;
pub mod security;
pub mod validate;

// Re-export commonly used types
pub use batch::{
    BatchObserver, BatchOptions, BatchOutcome, BatchPlan, BatchResult, BatchRunner, BatchState,
    CancellationToken, PlannedPair,
};
pub use error::{Error, ErrorKind, Result};
pub use export::{ExportOptions, ExportResult, Exporter};
pub use format::ExportFormat;
pub use loader::{load_file, load_str, ErrorMode, LoadOptions, SourceKind};
pub use model::{Document, MetaValue, Metadata, Section, TableData};
pub use render::{JsonFormat, PageSize, RenderOptions, Renderer};
pub use report::ExportReport;
pub use security::{PathResolver, ResolvedPath};
pub use validate::{Severity, ValidationReport, Validator};

use std::path::Path;
use std::sync::Arc;

/// Convert a source string to one output format.
///
/// # Example
///
/// ```
/// use docport::{convert_str, ExportFormat, RenderOptions, SourceKind};
///
/// let md = convert_str("# T\n\n- a\n- b\n", SourceKind::Markdown, ExportFormat::Markdown, &RenderOptions::default())?;
/// assert_eq!(md, "# T\n\n- a\n- b\n");
/// # Ok::<(), docport::Error>(())
/// ```
pub fn convert_str(
    source: &str,
    kind: SourceKind,
    format: ExportFormat,
    options: &RenderOptions,
) -> Result<String> {
    let doc = load_str(source, kind)?;
    let output = render::render(&doc, format, options)?;
    match output.artifact {
        render::RenderedArtifact::Text(text) => Ok(text),
        render::RenderedArtifact::Instructions(instructions) => {
            Ok(serde_json::to_string_pretty(&instructions)?)
        }
    }
}

/// Load a file and check it with the built-in validation rules.
///
/// # Example
///
/// ```no_run
/// use docport::check_file;
///
/// let report = check_file("guide.md").unwrap();
/// for diagnostic in &report.diagnostics {
///     println!("{}", diagnostic);
/// }
/// ```
pub fn check_file<P: AsRef<Path>>(path: P) -> Result<ValidationReport> {
    let doc = load_file(path, &LoadOptions::default())?;
    Ok(Validator::with_defaults().validate(&doc))
}

/// Inputs with any of these characters are treated as glob patterns.
const GLOB_METACHARACTERS: [char; 3] = ['*', '?', '['];

/// Whether an input string is a glob pattern rather than a single path.
pub fn is_glob(input: &str) -> bool {
    input.contains(GLOB_METACHARACTERS)
}

/// Options for [`run`].
#[derive(Clone)]
pub struct RunOptions {
    /// Input path or glob pattern
    pub input: String,

    /// Requested format ids
    pub formats: Vec<String>,

    /// Output and path options
    pub export: ExportOptions,

    /// Batch options (also used for dry runs of a single input)
    pub batch: BatchOptions,

    /// Progress observer for batch runs
    pub observer: Option<Arc<dyn BatchObserver>>,
}

impl RunOptions {
    /// Create run options for an input and a list of format ids.
    pub fn new<S: Into<String>>(input: impl Into<String>, formats: impl IntoIterator<Item = S>) -> Self {
        Self {
            input: input.into(),
            formats: formats.into_iter().map(Into::into).collect(),
            export: ExportOptions::default(),
            batch: BatchOptions::default(),
            observer: None,
        }
    }

    /// Set export options.
    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export = options;
        self
    }

    /// Set batch options.
    pub fn with_batch_options(mut self, options: BatchOptions) -> Self {
        self.batch = options;
        self
    }

    /// Plan only.
    pub fn dry_run(mut self) -> Self {
        self.batch.dry_run = true;
        self
    }

    /// Attach a batch progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("input", &self.input)
            .field("formats", &self.formats)
            .field("export", &self.export)
            .field("batch", &self.batch)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// What [`run`] did.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunOutcome {
    /// One input, one result per format
    Single { results: Vec<ExportResult> },
    /// A glob pattern
    Batch(BatchResult),
    /// A dry run
    Plan(BatchPlan),
}

impl RunOutcome {
    /// Pair results; empty for a plan.
    pub fn results(&self) -> &[ExportResult] {
        match self {
            RunOutcome::Single { results } => results,
            RunOutcome::Batch(batch) => &batch.results,
            RunOutcome::Plan(_) => &[],
        }
    }

    /// Whether any pair failed.
    pub fn has_failures(&self) -> bool {
        self.results().iter().any(|r| !r.success)
    }

    /// Aggregate report over the pair results.
    pub fn report(&self) -> ExportReport {
        ExportReport::from_results(self.results())
    }
}

/// Export an input path or glob pattern to every requested format.
///
/// Only contract violations (empty input, empty format list, invalid glob
/// pattern) are returned as errors. Per-pair failures are recorded in the
/// outcome.
///
/// # Example
///
/// ```no_run
/// use docport::{run, ExportOptions, RunOptions};
///
/// let options = RunOptions::new("docs/**/*.md", ["html", "pdf"])
///     .with_export_options(ExportOptions::new().with_output_dir("out"));
/// let outcome = run(&options)?;
/// println!("{}", outcome.report().summary());
/// # Ok::<(), docport::Error>(())
/// ```
pub fn run(options: &RunOptions) -> Result<RunOutcome> {
    if options.input.trim().is_empty() {
        return Err(Error::InvalidArgument("no input given".into()));
    }
    if options.formats.iter().all(|f| f.trim().is_empty()) {
        return Err(Error::InvalidArgument("no output formats requested".into()));
    }

    let exporter = Exporter::new(options.export.clone());
    if !is_glob(&options.input) && !options.batch.dry_run {
        log::debug!("Exporting single input {}", options.input);
        return Ok(RunOutcome::Single {
            results: exporter.export_file(&options.input, &options.formats),
        });
    }

    let mut runner = BatchRunner::new(exporter);
    if let Some(observer) = &options.observer {
        runner = runner.with_observer(Arc::clone(observer));
    }
    Ok(
        match runner.run(&options.input, &options.formats, &options.batch)? {
            BatchOutcome::Completed(result) => RunOutcome::Batch(result),
            BatchOutcome::Planned(plan) => RunOutcome::Plan(plan),
        },
    )
}
