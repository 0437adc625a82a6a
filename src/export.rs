//! Single-input export pipeline.
//!
//! One input file fans out to one `(input, format)` pair per requested format:
//! Resolve → Load → Render → Encode → Write → Record. Every pair produces an
//! [`ExportResult`]; a failing pair never affects its siblings.
//!
//! # Example
//!
//! ```no_run
//! use docport::export::{ExportOptions, Exporter};
//!
//! let exporter = Exporter::new(ExportOptions::new().with_root("docs").with_output_dir("out"));
//! for result in exporter.export_file("guide.md", &["html".into(), "pdf".into()]) {
//!     println!("{}: {}", result.format, result.success);
//! }
//! ```

use crate::batch::BatchState;
use crate::error::{Error, ErrorKind, Result};
use crate::format::ExportFormat;
use crate::loader::{self, LoadOptions};
use crate::model::Document;
use crate::render::{renderer_for, EncoderRegistry, RenderOptions, RenderOutput, RenderedArtifact, SectionWarning};
use crate::security::{PathResolver, ResolvedPath};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Options for exporting documents.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory outputs are written into
    pub output_dir: PathBuf,

    /// Inputs must resolve inside this directory
    pub allowed_root: PathBuf,

    /// Rendering options
    pub render: RenderOptions,

    /// Loading options
    pub load: LoadOptions,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the allowed input root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.allowed_root = root.into();
        self
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Set loading options.
    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load = options;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            allowed_root: PathBuf::from("."),
            render: RenderOptions::default(),
            load: LoadOptions::default(),
        }
    }
}

/// Outcome of one `(input, format)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    /// Input file, absent for in-memory documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    /// Requested format id
    pub format: String,

    /// Whether the output was written
    pub success: bool,

    /// Written file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Bytes written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Wall time spent on this pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Sections replaced by placeholders
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SectionWarning>,
}

impl ExportResult {
    /// A written output.
    pub fn succeeded(
        input: Option<PathBuf>,
        format: ExportFormat,
        output_path: PathBuf,
        size: u64,
        duration: Duration,
    ) -> Self {
        Self {
            input,
            format: format.to_string(),
            success: true,
            output_path: Some(output_path),
            size: Some(size),
            duration_ms: Some(millis(duration)),
            error: None,
            error_kind: None,
            warnings: Vec::new(),
        }
    }

    /// A failed pair.
    pub fn failed(
        input: Option<PathBuf>,
        format: impl Into<String>,
        err: &Error,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            input,
            format: format.into(),
            success: false,
            output_path: None,
            size: None,
            duration_ms: duration.map(millis),
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            warnings: Vec::new(),
        }
    }

    /// Attach section warnings.
    pub fn with_warnings(mut self, warnings: Vec<SectionWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A requested format id checked against the allow-list.
#[derive(Debug)]
pub(crate) struct Requested<'a> {
    pub(crate) id: &'a str,
    pub(crate) format: Result<ExportFormat>,
}

impl<'a> Requested<'a> {
    /// Check every id up front so rejected ones cost nothing.
    pub(crate) fn parse_all(formats: &'a [String]) -> Vec<Self> {
        formats
            .iter()
            .map(|id| {
                let format = ExportFormat::parse(id);
                if let Err(err) = &format {
                    log::warn!("{}", err);
                }
                Self { id, format }
            })
            .collect()
    }

    /// Whether no id survived the allow-list.
    pub(crate) fn none_allowed(requested: &[Self]) -> bool {
        requested.iter().all(|r| r.format.is_err())
    }

    /// The failed result of an id off the allow-list.
    pub(crate) fn rejection(&self, input: Option<&Path>) -> Option<ExportResult> {
        let err = self.format.as_ref().err()?;
        Some(ExportResult::failed(input.map(Path::to_path_buf), self.id, err, None))
    }
}

/// Where the outputs of one input go.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) input: Option<PathBuf>,
    /// Output location relative to the output directory, without extension
    pub(crate) relative: PathBuf,
}

impl Target {
    pub(crate) fn from_resolved(resolved: &ResolvedPath) -> Self {
        Self {
            input: Some(resolved.path.clone()),
            relative: resolved.relative.clone(),
        }
    }
}

/// Runs the export pipeline for single inputs.
#[derive(Debug, Clone)]
pub struct Exporter {
    options: ExportOptions,
    resolver: PathResolver,
    encoders: EncoderRegistry,
}

impl Exporter {
    /// Create an exporter with the default encoders.
    pub fn new(options: ExportOptions) -> Self {
        let resolver = PathResolver::new(&options.allowed_root);
        Self {
            options,
            resolver,
            encoders: EncoderRegistry::with_defaults(),
        }
    }

    /// Replace the binary encoders.
    pub fn with_encoders(mut self, encoders: EncoderRegistry) -> Self {
        self.encoders = encoders;
        self
    }

    /// Export options.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Input path resolver.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Output path for an input: `<output_dir>/<relative parent>/<stem>.<ext>`.
    pub fn output_path(&self, resolved: &ResolvedPath, format: ExportFormat) -> PathBuf {
        self.output_path_for(&Target::from_resolved(resolved), format)
    }

    pub(crate) fn output_path_for(&self, target: &Target, format: ExportFormat) -> PathBuf {
        let stem = target
            .relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let dir = match target.relative.parent() {
            Some(parent) => self.options.output_dir.join(parent),
            None => self.options.output_dir.clone(),
        };
        dir.join(format!("{}.{}", stem, format.extension()))
    }

    /// Export one input file to every requested format.
    ///
    /// Format ids off the allow-list fail before the input is resolved; when
    /// none is left the input is never touched.
    pub fn export_file(&self, input: impl AsRef<Path>, formats: &[String]) -> Vec<ExportResult> {
        let input = input.as_ref();
        let requested = Requested::parse_all(formats);
        if Requested::none_allowed(&requested) {
            return requested.iter().filter_map(|r| r.rejection(Some(input))).collect();
        }

        let start = Instant::now();
        match self.prepare(input) {
            Ok((target, doc)) => requested
                .iter()
                .map(|r| match &r.format {
                    Ok(format) => self.export_pair(&doc, &target, *format),
                    Err(err) => ExportResult::failed(Some(input.to_path_buf()), r.id, err, None),
                })
                .collect(),
            Err(err) => self.fail_all(Some(input.to_path_buf()), &requested, &err, Some(start.elapsed())),
        }
    }

    /// Export an in-memory document; outputs are named `<name>.<ext>`.
    pub fn export_document(&self, doc: &Document, name: &str, formats: &[String]) -> Vec<ExportResult> {
        let mut components = Path::new(name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(std::path::Component::Normal(_)), None)
        );
        let requested = Requested::parse_all(formats);
        if !single {
            let err = Error::InvalidArgument(format!("output name must be a plain file name: {}", name));
            return self.fail_all(None, &requested, &err, None);
        }

        let target = Target {
            input: None,
            relative: PathBuf::from(name),
        };
        requested
            .iter()
            .map(|r| match &r.format {
                Ok(format) => self.export_pair(doc, &target, *format),
                Err(err) => ExportResult::failed(None, r.id, err, None),
            })
            .collect()
    }

    /// Render a document to output bytes.
    pub fn render_bytes(&self, doc: &Document, format: ExportFormat) -> Result<(Vec<u8>, RenderOutput)> {
        let output = renderer_for(format, &self.options.render).render(doc)?;
        let bytes = match &output.artifact {
            RenderedArtifact::Text(text) => text.as_bytes().to_vec(),
            RenderedArtifact::Instructions(instructions) => self.encoders.encode(format, instructions)?,
        };
        Ok((bytes, output))
    }

    /// Resolve and load one input.
    pub(crate) fn prepare(&self, input: &Path) -> Result<(Target, Document)> {
        let resolved = self.resolver.resolve(input)?;
        let doc = loader::load_file(&resolved.path, &self.options.load)?;
        log::debug!(
            "Loaded {} ({} sections)",
            resolved.relative.display(),
            doc.len()
        );
        Ok((Target::from_resolved(&resolved), doc))
    }

    /// Run one pair and record the outcome.
    pub(crate) fn export_pair(&self, doc: &Document, target: &Target, format: ExportFormat) -> ExportResult {
        self.export_pair_observed(doc, target, format, &|_| {})
    }

    /// Like `export_pair`, reporting the render and write phases.
    pub(crate) fn export_pair_observed(
        &self,
        doc: &Document,
        target: &Target,
        format: ExportFormat,
        stage: &dyn Fn(BatchState),
    ) -> ExportResult {
        let start = Instant::now();
        match self.try_export_pair(doc, target, format, stage) {
            Ok((path, size, warnings)) => {
                log::debug!("Wrote {} ({} bytes)", path.display(), size);
                ExportResult::succeeded(target.input.clone(), format, path, size, start.elapsed())
                    .with_warnings(warnings)
            }
            Err(err) => {
                log::warn!(
                    "Export of {} to '{}' failed: {}",
                    target.relative.display(),
                    format,
                    err
                );
                ExportResult::failed(target.input.clone(), format.as_str(), &err, Some(start.elapsed()))
            }
        }
    }

    fn try_export_pair(
        &self,
        doc: &Document,
        target: &Target,
        format: ExportFormat,
        stage: &dyn Fn(BatchState),
    ) -> Result<(PathBuf, u64, Vec<SectionWarning>)> {
        let path = self.output_path_for(target, format);
        if target.input.as_deref() == Some(path.as_path()) {
            return Err(Error::InvalidArgument(format!(
                "output would overwrite its input: {}",
                path.display()
            )));
        }

        stage(BatchState::Rendering);
        let (bytes, output) = self.render_bytes(doc, format)?;
        stage(BatchState::Writing);
        write_atomic(&path, &bytes)?;
        Ok((path, bytes.len() as u64, output.warnings))
    }

    /// Fail every requested pair: allowed formats with `err`, rejected ids
    /// with their own allow-list error.
    pub(crate) fn fail_all(
        &self,
        input: Option<PathBuf>,
        requested: &[Requested<'_>],
        err: &Error,
        duration: Option<Duration>,
    ) -> Vec<ExportResult> {
        log::warn!(
            "Skipping {}: {}",
            input.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
            err
        );
        requested
            .iter()
            .map(|r| match &r.format {
                Ok(_) => ExportResult::failed(input.clone(), r.id, err, duration),
                Err(rejected) => ExportResult::failed(input.clone(), r.id, rejected, None),
            })
            .collect()
    }
}

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Write through a sibling temp file so readers never see a partial output.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = std::fs::write(&temp, bytes).and_then(|()| std::fs::rename(&temp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;
    use crate::render::{BinaryEncoder, InstructionDocument};
    use std::sync::Arc;

    fn exporter(dir: &Path) -> Exporter {
        Exporter::new(
            ExportOptions::new()
                .with_root(dir)
                .with_output_dir(dir.join("out")),
        )
    }

    fn formats(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_output_path_mirrors_input_tree() {
        let exporter = Exporter::new(ExportOptions::new().with_root("/r").with_output_dir("/o"));
        let resolved = exporter.resolver().resolve("guides/intro.v2.md").unwrap();
        assert_eq!(
            exporter.output_path(&resolved, ExportFormat::Markdown),
            PathBuf::from("/o/guides/intro.v2.md")
        );
        assert_eq!(
            exporter.output_path(&resolved, ExportFormat::Html),
            PathBuf::from("/o/guides/intro.v2.html")
        );
    }

    #[test]
    fn test_export_document_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::with_sections(vec![Section::title("T"), Section::paragraph("body")]);
        let results = exporter(dir.path()).export_document(
            &doc,
            "report",
            &formats(&["html", "markdown", "docx", "pdf", "json"]),
        );

        assert_eq!(results.len(), 5);
        for result in &results {
            assert!(result.success, "{:?}", result);
            let path = result.output_path.as_ref().unwrap();
            assert_eq!(std::fs::metadata(path).unwrap().len(), result.size.unwrap());
        }
        assert!(dir.path().join("out/report.docx").exists());
    }

    #[test]
    fn test_unsupported_format_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::with_sections(vec![Section::paragraph("x")]);
        let results = exporter(dir.path()).export_document(&doc, "doc", &formats(&["evil"]));

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].error_kind, Some(ErrorKind::UnsupportedFormat));
        assert!(results[0].size.is_none());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_bad_document_name() {
        let dir = tempfile::tempdir().unwrap();
        let results = exporter(dir.path()).export_document(&Document::new(), "../x", &formats(&["html"]));
        assert_eq!(results[0].error_kind, Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_encoder_failure_recorded() {
        struct Broken;
        impl BinaryEncoder for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn encode(&self, _doc: &InstructionDocument) -> Result<Vec<u8>> {
                Err(Error::Render("no fonts".into()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut encoders = EncoderRegistry::with_defaults();
        encoders.register(ExportFormat::Pdf, Arc::new(Broken));
        let exporter = exporter(dir.path()).with_encoders(encoders);

        let results =
            exporter.export_document(&Document::new(), "doc", &formats(&["pdf", "docx"]));
        assert_eq!(results[0].error_kind, Some(ErrorKind::Render));
        assert!(results[1].success);
        assert!(!dir.path().join("out/doc.pdf").exists());
    }

    #[test]
    fn test_export_file_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let results = exporter(dir.path()).export_file("missing.json", &formats(&["html", "markdown"]));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error_kind == Some(ErrorKind::Io)));
    }

    #[test]
    fn test_rejected_formats_never_touch_input() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(dir.path());

        let results = exporter.export_file("missing.json", &formats(&["evil", "pdf;"]));
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.error_kind == Some(ErrorKind::UnsupportedFormat)));

        std::fs::write(dir.path().join("broken.json"), [0xff, 0xfe]).unwrap();
        let results = exporter.export_file("broken.json", &formats(&["evil", "html"]));
        assert_eq!(results[0].error_kind, Some(ErrorKind::UnsupportedFormat));
        assert_eq!(results[1].error_kind, Some(ErrorKind::MalformedInput));
        assert_eq!(results[1].format, "html");
    }

    #[test]
    fn test_no_temp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        exporter(dir.path()).export_document(&Document::new(), "doc", &formats(&["html"]));
        let names: Vec<_> = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("doc.html")]);
    }
}
