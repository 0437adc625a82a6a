//! Aggregate reporting over export results.

use crate::error::ErrorKind;
use crate::export::ExportResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outputs larger than this trigger a recommendation.
pub const LARGE_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Pairs slower than this trigger a recommendation.
pub const SLOW_PAIR_MS: u64 = 5_000;

/// Per-format tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatCounts {
    /// Pairs for this format
    pub total: usize,
    /// Pairs that wrote output
    pub successful: usize,
    /// Pairs that failed
    pub failed: usize,
}

/// One failed pair, condensed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedError {
    /// Input file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    /// Requested format id
    pub format: String,
    /// Failure category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Failure message
    pub message: String,
}

/// Summary of a set of export results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Successful pairs over total, 0.0 to 1.0 (1.0 when empty)
    pub success_rate: f64,
    pub total_bytes: u64,
    pub total_duration_ms: u64,
    pub by_format: BTreeMap<String, FormatCounts>,
    pub results: Vec<ExportResult>,
    pub errors: Vec<ReportedError>,
    pub recommendations: Vec<String>,
}

impl ExportReport {
    /// Build a report from pair results.
    pub fn from_results(results: &[ExportResult]) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = total - successful;
        let success_rate = if total == 0 {
            1.0
        } else {
            successful as f64 / total as f64
        };

        let mut by_format: BTreeMap<String, FormatCounts> = BTreeMap::new();
        for result in results {
            let counts = by_format.entry(result.format.clone()).or_default();
            counts.total += 1;
            if result.success {
                counts.successful += 1;
            } else {
                counts.failed += 1;
            }
        }

        let errors: Vec<ReportedError> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| ReportedError {
                input: r.input.clone(),
                format: r.format.clone(),
                kind: r.error_kind,
                message: r.error.clone().unwrap_or_default(),
            })
            .collect();

        let mut report = Self {
            total,
            successful,
            failed,
            success_rate,
            total_bytes: results.iter().filter_map(|r| r.size).sum(),
            total_duration_ms: results.iter().filter_map(|r| r.duration_ms).sum(),
            by_format,
            results: results.to_vec(),
            errors,
            recommendations: Vec::new(),
        };
        report.recommendations = report.recommend();
        report
    }

    fn count_kind(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == Some(kind)).count()
    }

    fn recommend(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.failed > 0 {
            out.push(format!(
                "{} of {} exports failed; see the errors list for details",
                self.failed, self.total
            ));
        }
        if self.total > 0 && self.success_rate < 0.5 {
            out.push(
                "Most exports failed; check the input files and the requested formats".to_string(),
            );
        }
        let traversal = self.count_kind(ErrorKind::PathTraversal);
        if traversal > 0 {
            out.push(format!(
                "{} input(s) were outside the allowed root; adjust --root or the input paths",
                traversal
            ));
        }
        let unsupported = self.count_kind(ErrorKind::UnsupportedFormat);
        if unsupported > 0 {
            out.push(format!(
                "{} export(s) requested an unknown format; supported formats: html, markdown, docx, pdf, json",
                unsupported
            ));
        }
        let large = self
            .results
            .iter()
            .filter(|r| r.size.is_some_and(|s| s > LARGE_OUTPUT_BYTES))
            .count();
        if large > 0 {
            out.push(format!(
                "{} output(s) exceed 10 MiB; consider splitting the source documents",
                large
            ));
        }
        let slow = self
            .results
            .iter()
            .filter(|r| r.duration_ms.is_some_and(|d| d > SLOW_PAIR_MS))
            .count();
        if slow > 0 {
            out.push(format!(
                "{} export(s) took longer than 5 s; consider raising concurrency",
                slow
            ));
        }
        out
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Exported {}/{} ({:.1}%), {} bytes in {} ms\n",
            self.successful,
            self.total,
            self.success_rate * 100.0,
            self.total_bytes,
            self.total_duration_ms
        );
        for (format, counts) in &self.by_format {
            out.push_str(&format!(
                "  {:<9} {} ok, {} failed\n",
                format, counts.successful, counts.failed
            ));
        }
        for error in &self.errors {
            let input = error
                .input
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<document>".to_string());
            out.push_str(&format!("  error: {} [{}]: {}\n", input, error.format, error.message));
        }
        for rec in &self.recommendations {
            out.push_str(&format!("  hint: {}\n", rec));
        }
        out
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
