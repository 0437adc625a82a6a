//! Glob-driven batch export.
//!
//! A pattern expands to a sorted file list; each file is loaded once and
//! exported to every requested format. Pairs run on a bounded `rayon` pool
//! and every pair is recorded, whether it succeeded, failed, or was skipped.
//!
//! # Example
//!
//! ```no_run
//! use docport::batch::{BatchOptions, BatchOutcome, BatchRunner};
//! use docport::export::{ExportOptions, Exporter};
//!
//! fn main() -> docport::Result<()> {
//!     let runner = BatchRunner::new(Exporter::new(ExportOptions::new().with_root("docs")));
//!     let formats = vec!["html".to_string(), "markdown".to_string()];
//!     if let BatchOutcome::Completed(result) = runner.run("**/*.json", &formats, &BatchOptions::new())? {
//!         println!("{}/{} succeeded", result.successful, result.total);
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::export::{millis, ExportResult, Exporter, Requested, Target};
use crate::format::ExportFormat;
use crate::model::Document;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared between the caller and a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; pairs that have not started are skipped.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Plan only: no reads, renders, or writes
    pub dry_run: bool,

    /// Maximum number of pairs in flight (1 = sequential)
    pub concurrency: usize,

    /// Pairs not started by this instant are skipped
    pub deadline: Option<Instant>,

    /// Cancellation flag checked before each pair
    pub cancellation: Option<CancellationToken>,
}

impl BatchOptions {
    /// Create new batch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the worker count (0 is treated as 1).
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Skip pairs that have not started by `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Skip pairs that have not started within `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Error for a pair that must not start, if any.
    fn stop_reason(&self) -> Option<Error> {
        if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(Error::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Error::DeadlineExceeded);
        }
        None
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: std::thread::available_parallelism().map_or(1, |n| n.get()),
            deadline: None,
            cancellation: None,
        }
    }
}

/// Phase of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Not started
    Idle,
    /// Expanding the glob pattern
    Expanding,
    /// Resolving and loading an input
    Resolving,
    /// Rendering a pair
    Rendering,
    /// Writing a pair's output
    Writing,
    /// Recording a pair's result
    Recording,
    /// Building the batch summary
    Aggregating,
    /// Finished
    Done,
}

impl BatchState {
    /// State name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Idle => "idle",
            BatchState::Expanding => "expanding",
            BatchState::Resolving => "resolving",
            BatchState::Rendering => "rendering",
            BatchState::Writing => "writing",
            BatchState::Recording => "recording",
            BatchState::Aggregating => "aggregating",
            BatchState::Done => "done",
        }
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives batch progress. Called from worker threads.
///
/// All methods have empty default implementations.
pub trait BatchObserver: Send + Sync {
    /// Batch-level phase change.
    fn on_state(&self, _state: BatchState) {}

    /// The expanded file list, before any file is processed.
    fn on_files(&self, _files: &[PathBuf], _formats: usize) {}

    /// Phase change of one pair (`Resolving` is reported once per input).
    fn on_pair_state(&self, _input: &Path, _format: &str, _state: BatchState) {}

    /// A pair finished, failed, or was skipped.
    fn on_result(&self, _result: &ExportResult) {}
}

/// One pair of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPair {
    /// Input file
    pub input: PathBuf,
    /// Output format
    pub format: ExportFormat,
    /// Where the output would be written
    pub output_path: PathBuf,
}

/// What a batch would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    /// The pattern as given
    pub pattern: String,
    /// Matched files, sorted
    pub files: Vec<PathBuf>,
    /// Valid requested formats
    pub formats: Vec<ExportFormat>,
    /// Planned pairs
    pub pairs: Vec<PlannedPair>,
    /// Requested format ids not on the allow-list
    pub rejected_formats: Vec<String>,
    /// Matched files outside the allowed root
    pub rejected_inputs: Vec<PathBuf>,
}

/// Outcome of a completed batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// Number of pairs
    pub total: usize,
    /// Pairs that wrote output
    pub successful: usize,
    /// Pairs that failed or were skipped
    pub failed: usize,
    /// Wall time of the whole batch
    pub duration_ms: u64,
    /// One result per pair, in file then format order
    pub results: Vec<ExportResult>,
}

impl BatchResult {
    /// Aggregate pair results.
    pub fn from_results(results: Vec<ExportResult>, duration: Duration) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            duration_ms: millis(duration),
            results,
        }
    }
}

/// What [`BatchRunner::run`] returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Normal run
    Completed(BatchResult),
    /// Dry run
    Planned(BatchPlan),
}

/// Runs exports over a glob pattern.
pub struct BatchRunner {
    exporter: Exporter,
    observer: Option<Arc<dyn BatchObserver>>,
}

impl BatchRunner {
    /// Create a batch runner.
    pub fn new(exporter: Exporter) -> Self {
        Self {
            exporter,
            observer: None,
        }
    }

    /// Attach a progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The exporter used for each input.
    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Expand a pattern into a sorted list of files.
    ///
    /// Relative patterns are taken from the allowed root. A pattern that
    /// leaves the root is rejected before anything is listed, and files under
    /// the output directory are never picked up as inputs.
    pub fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        if pattern.trim().is_empty() {
            return Err(Error::InvalidArgument("empty input pattern".into()));
        }
        let resolver = self.exporter.resolver();
        let root = resolver.root();
        let confined = resolver.confine_pattern(pattern)?;
        let mut full = glob::Pattern::escape(&root.to_string_lossy());
        if let Ok(rest) = confined.strip_prefix(root) {
            if !rest.as_os_str().is_empty() {
                full.push('/');
                full.push_str(&rest.to_string_lossy());
            }
        }

        let output_dir = self.output_dir();
        let mut files = Vec::new();
        for entry in glob::glob(&full)? {
            match entry {
                Ok(path) if !path.starts_with(root) => {
                    log::debug!("Dropping match outside the root");
                }
                Ok(path) if output_dir.as_deref().is_some_and(|out| path.starts_with(out)) => {
                    log::debug!("Skipping output {}", path.display());
                }
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(err) => log::warn!("Skipping {}: {}", err.path().display(), err.error()),
            }
        }
        files.sort();
        files.dedup();
        log::debug!("Pattern '{}' matched {} files", pattern, files.len());
        Ok(files)
    }

    /// The output directory when it sits strictly inside the root.
    fn output_dir(&self) -> Option<PathBuf> {
        let dir = &self.exporter.options().output_dir;
        let absolute = if dir.is_absolute() {
            dir.clone()
        } else {
            std::env::current_dir().ok()?.join(dir)
        };
        let root = self.exporter.resolver().root();
        crate::security::normalize_lexically(&absolute)
            .filter(|out| out.starts_with(root) && out.as_path() != root)
    }

    /// Plan a batch without reading, rendering, or writing anything.
    pub fn plan(&self, pattern: &str, formats: &[String]) -> Result<BatchPlan> {
        check_formats(formats)?;
        let files = self.expand(pattern)?;

        let mut valid = Vec::new();
        let mut rejected_formats = Vec::new();
        for id in formats {
            match ExportFormat::parse(id) {
                Ok(format) if !valid.contains(&format) => valid.push(format),
                Ok(_) => {}
                Err(_) => rejected_formats.push(id.clone()),
            }
        }

        let mut pairs = Vec::new();
        let mut rejected_inputs = Vec::new();
        for file in &files {
            match self.exporter.resolver().resolve(file) {
                Ok(resolved) => pairs.extend(valid.iter().map(|&format| PlannedPair {
                    input: file.clone(),
                    format,
                    output_path: self.exporter.output_path(&resolved, format),
                })),
                Err(err) => {
                    log::warn!("Not planning {}: {}", file.display(), err);
                    rejected_inputs.push(file.clone());
                }
            }
        }
        for pair in &pairs {
            log::debug!(
                "Plan: {} -> {}",
                pair.input.display(),
                pair.output_path.display()
            );
        }

        Ok(BatchPlan {
            pattern: pattern.to_string(),
            files,
            formats: valid,
            pairs,
            rejected_formats,
            rejected_inputs,
        })
    }

    /// Run a batch, or plan it when `options.dry_run` is set.
    ///
    /// Only contract violations (empty pattern or format list, invalid
    /// pattern, worker pool failure) are returned as errors; everything else
    /// is recorded per pair.
    pub fn run(&self, pattern: &str, formats: &[String], options: &BatchOptions) -> Result<BatchOutcome> {
        if options.dry_run {
            return self.plan(pattern, formats).map(BatchOutcome::Planned);
        }
        check_formats(formats)?;

        let start = Instant::now();
        self.transition(BatchState::Idle);
        self.transition(BatchState::Expanding);
        let files = self.expand(pattern)?;
        if files.is_empty() {
            log::warn!("Pattern '{}' matched no files", pattern);
        }
        if let Some(observer) = &self.observer {
            observer.on_files(&files, formats.len());
        }

        self.transition(BatchState::Resolving);
        let results = self.run_files(&files, formats, options)?;

        self.transition(BatchState::Aggregating);
        let result = BatchResult::from_results(results, start.elapsed());
        log::info!(
            "Batch finished: {}/{} pairs succeeded in {} ms",
            result.successful,
            result.total,
            result.duration_ms
        );
        self.transition(BatchState::Done);
        Ok(BatchOutcome::Completed(result))
    }

    /// Export a known file list.
    pub fn run_files(&self, files: &[PathBuf], formats: &[String], options: &BatchOptions) -> Result<Vec<ExportResult>> {
        let requested = Requested::parse_all(formats);
        let requested = requested.as_slice();
        let per_file: Vec<Vec<ExportResult>> = if options.concurrency <= 1 {
            files
                .iter()
                .map(|file| self.process_file(file, requested, options, false))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.concurrency)
                .build()
                .map_err(|e| Error::InvalidArgument(format!("cannot start worker pool: {}", e)))?;
            pool.install(|| {
                files
                    .par_iter()
                    .map(|file| self.process_file(file, requested, options, true))
                    .collect()
            })
        };
        Ok(per_file.into_iter().flatten().collect())
    }

    fn process_file(
        &self,
        file: &Path,
        requested: &[Requested<'_>],
        options: &BatchOptions,
        parallel: bool,
    ) -> Vec<ExportResult> {
        if let Some(reason) = options.stop_reason() {
            return self.skip_all(file, requested, &reason);
        }
        if Requested::none_allowed(requested) {
            let results: Vec<ExportResult> = requested
                .iter()
                .filter_map(|r| r.rejection(Some(file)))
                .collect();
            results.iter().for_each(|r| self.record(file, r));
            return results;
        }

        self.pair_state(file, "*", BatchState::Resolving);
        let start = Instant::now();
        let (target, doc) = match self.exporter.prepare(file) {
            Ok(prepared) => prepared,
            Err(err) => {
                let results = self.exporter.fail_all(
                    Some(file.to_path_buf()),
                    requested,
                    &err,
                    Some(start.elapsed()),
                );
                results.iter().for_each(|r| self.record(file, r));
                return results;
            }
        };

        let run_pair = |r: &Requested<'_>| self.process_pair(file, &doc, &target, r, options);
        if parallel {
            requested.par_iter().map(run_pair).collect()
        } else {
            requested.iter().map(run_pair).collect()
        }
    }

    fn process_pair(
        &self,
        file: &Path,
        doc: &Document,
        target: &Target,
        requested: &Requested<'_>,
        options: &BatchOptions,
    ) -> ExportResult {
        let input = Some(file.to_path_buf());
        let result = match (&requested.format, options.stop_reason()) {
            (Err(rejected), _) => ExportResult::failed(input, requested.id, rejected, None),
            (Ok(_), Some(reason)) => ExportResult::failed(input, requested.id, &reason, None),
            (Ok(format), None) => self.exporter.export_pair_observed(doc, target, *format, &|state| {
                self.pair_state(file, format.as_str(), state)
            }),
        };
        self.record(file, &result);
        result
    }

    fn skip_all(&self, file: &Path, requested: &[Requested<'_>], reason: &Error) -> Vec<ExportResult> {
        log::debug!("Skipping {}: {}", file.display(), reason);
        requested
            .iter()
            .map(|r| {
                let err = r.format.as_ref().err().unwrap_or(reason);
                let result = ExportResult::failed(Some(file.to_path_buf()), r.id, err, None);
                self.record(file, &result);
                result
            })
            .collect()
    }

    fn record(&self, file: &Path, result: &ExportResult) {
        self.pair_state(file, &result.format, BatchState::Recording);
        if let Some(observer) = &self.observer {
            observer.on_result(result);
        }
    }

    fn transition(&self, state: BatchState) {
        log::debug!("Batch state: {}", state);
        if let Some(observer) = &self.observer {
            observer.on_state(state);
        }
    }

    fn pair_state(&self, file: &Path, format: &str, state: BatchState) {
        log::trace!("{} [{}]: {}", file.display(), format, state);
        if let Some(observer) = &self.observer {
            observer.on_pair_state(file, format, state);
        }
    }
}

fn check_formats(formats: &[String]) -> Result<()> {
    if formats.iter().all(|f| f.trim().is_empty()) {
        return Err(Error::InvalidArgument("no output formats requested".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::export::ExportOptions;
    use std::sync::Mutex;

    fn runner(root: &Path) -> BatchRunner {
        BatchRunner::new(Exporter::new(
            ExportOptions::new()
                .with_root(root)
                .with_output_dir(root.join("out")),
        ))
    }

    fn write_inputs(root: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(
                root.join(name),
                r#"{"sections":[{"type":"paragraph","content":"hi"}]}"#,
            )
            .unwrap();
        }
    }

    #[test]
    fn test_expand_sorted_and_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &["b.json", "a.json", "c.txt"]);
        std::fs::create_dir(dir.path().join("d.json")).unwrap();

        let files = runner(dir.path()).expand("*.json").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_invalid_pattern_is_contract_violation() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(dir.path()).expand("[").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Pattern);
    }

    #[test]
    fn test_empty_formats_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(dir.path())
            .run("*.json", &[], &BatchOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_cancelled_batch_records_skipped_pairs() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &["a.json", "b.json"]);
        let token = CancellationToken::new();
        token.cancel();

        let options = BatchOptions::new().with_cancellation(token);
        let formats = vec!["html".to_string(), "markdown".to_string()];
        let outcome = runner(dir.path()).run("*.json", &formats, &options).unwrap();
        let BatchOutcome::Completed(result) = outcome else {
            panic!("expected a completed batch");
        };

        assert_eq!(result.total, 4);
        assert_eq!(result.failed, 4);
        assert!(result
            .results
            .iter()
            .all(|r| r.error_kind == Some(ErrorKind::Cancelled)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_expired_deadline() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &["a.json"]);
        let options = BatchOptions::new().with_deadline(Instant::now());
        let outcome = runner(dir.path())
            .run("*.json", &["html".to_string()], &options)
            .unwrap();
        let BatchOutcome::Completed(result) = outcome else {
            panic!("expected a completed batch");
        };
        assert_eq!(result.results[0].error_kind, Some(ErrorKind::DeadlineExceeded));

        let options = BatchOptions::new().with_timeout(Duration::ZERO);
        assert!(matches!(options.stop_reason(), Some(Error::DeadlineExceeded)));
        assert!(BatchOptions::new()
            .with_timeout(Duration::from_secs(3600))
            .stop_reason()
            .is_none());
    }

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<BatchState>>,
        results: Mutex<usize>,
    }

    impl BatchObserver for Recorder {
        fn on_state(&self, state: BatchState) {
            self.states.lock().unwrap().push(state);
        }

        fn on_result(&self, _result: &ExportResult) {
            *self.results.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_observer_sees_states_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &["a.json", "b.json"]);
        let recorder = Arc::new(Recorder::default());
        let runner = runner(dir.path()).with_observer(recorder.clone());

        let options = BatchOptions::new().with_concurrency(2);
        runner
            .run("*.json", &["html".to_string(), "pdf".to_string()], &options)
            .unwrap();

        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![
                BatchState::Idle,
                BatchState::Expanding,
                BatchState::Resolving,
                BatchState::Aggregating,
                BatchState::Done,
            ]
        );
        assert_eq!(*recorder.results.lock().unwrap(), 4);
    }

    #[test]
    fn test_plan_splits_formats() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &["a.json"]);
        let formats = vec!["html".to_string(), "evil".to_string(), "html".to_string()];
        let plan = runner(dir.path()).plan("*.json", &formats).unwrap();

        assert_eq!(plan.formats, vec![ExportFormat::Html]);
        assert_eq!(plan.rejected_formats, vec!["evil".to_string()]);
        assert_eq!(plan.pairs.len(), 1);
        assert!(plan.pairs[0].output_path.ends_with("out/a.html"));
    }
}
