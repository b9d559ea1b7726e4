//! Core domain models for rule evaluations and analysis results
//!
//! Architecture: Rich Domain Models - Evaluations keep their pass/fail state consistent
//! - An evaluation fails exactly when its result tree holds a failing location
//! - Result trees mirror the nesting of the resources a rule inspected
//! - AnalysisReport acts as an aggregate root over one template's evaluations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Line reported when a location cannot be resolved in the original document
pub const DEFAULT_LINE_NUMBER: u32 = 1;

/// Severity levels for rule findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational findings and suggestions
    Info,
    /// Findings that should be addressed but don't block deployment
    Warning,
    /// Findings that block deployment pipelines
    Error,
}

impl Severity {
    /// Whether this severity level should fail an analysis run
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One node of an evaluation's result tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Whether this location satisfied the rule
    pub passed: bool,
    /// 1-based line in the original template
    pub line_number: u32,
    /// Results for nested resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EvaluationResult>,
}

impl EvaluationResult {
    /// A failing location
    pub fn failed(line_number: u32) -> Self {
        Self { passed: false, line_number, children: Vec::new() }
    }

    /// A passing location
    pub fn passed(line_number: u32) -> Self {
        Self { passed: true, line_number, children: Vec::new() }
    }

    /// Attach nested results
    pub fn with_children(mut self, children: Vec<EvaluationResult>) -> Self {
        self.children = children;
        self
    }

    /// Whether this node or any descendant failed
    pub fn has_failure(&self) -> bool {
        !self.passed || self.children.iter().any(EvaluationResult::has_failure)
    }

    /// Line of the first failing node in pre-order
    pub fn first_failing_line(&self) -> Option<u32> {
        if !self.passed {
            return Some(self.line_number);
        }
        self.children.iter().find_map(EvaluationResult::first_failing_line)
    }

    /// Lines of every failing node in pre-order
    pub fn failing_lines(&self) -> Vec<u32> {
        let mut lines = Vec::new();
        self.collect_failing_lines(&mut lines);
        lines
    }

    fn collect_failing_lines(&self, lines: &mut Vec<u32>) {
        if !self.passed {
            lines.push(self.line_number);
        }
        for child in &self.children {
            child.collect_failing_lines(lines);
        }
    }
}

/// The outcome of running one rule against one template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Identifier of the rule, e.g. `AZR-000081`
    pub rule_id: String,
    /// Readable rule name, e.g. `Azure.AppService.RemoteDebug`
    pub rule_name: String,
    /// What the rule checks
    pub rule_description: String,
    /// Where to read more about the rule
    pub help_uri: String,
    /// How to fix a failure
    pub recommendation: String,
    /// Severity of a failure
    pub severity: Severity,
    /// Template the rule ran against
    pub template_identifier: String,
    /// True iff no location violated the rule
    pub passed: bool,
    /// True iff at least one location was reported
    pub has_results: bool,
    /// Root of the per-location result tree
    pub result: EvaluationResult,
    /// Detail about a rule that could not be executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl Evaluation {
    /// Create a passing evaluation with no results
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        template_identifier: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: String::new(),
            rule_description: String::new(),
            help_uri: String::new(),
            recommendation: String::new(),
            severity,
            template_identifier: template_identifier.into(),
            passed: true,
            has_results: false,
            result: EvaluationResult::passed(DEFAULT_LINE_NUMBER),
            diagnostic: None,
        }
    }

    /// Set the readable rule name
    pub fn with_rule_name(mut self, name: impl Into<String>) -> Self {
        self.rule_name = name.into();
        self
    }

    /// Set the descriptive fields shown to users
    pub fn with_description(
        mut self,
        description: impl Into<String>,
        help_uri: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        self.rule_description = description.into();
        self.help_uri = help_uri.into();
        self.recommendation = recommendation.into();
        self
    }

    /// Attach the per-location results reported for this rule.
    ///
    /// Locations without a failure anywhere in their subtree are dropped, so
    /// `passed` and `has_results` always stay each other's negation.
    pub fn with_results(mut self, results: Vec<EvaluationResult>) -> Self {
        let children: Vec<_> = results.into_iter().filter(EvaluationResult::has_failure).collect();
        self.has_results = !children.is_empty();
        self.passed = !self.has_results;

        let root = if self.passed {
            EvaluationResult::passed(DEFAULT_LINE_NUMBER)
        } else {
            EvaluationResult::failed(DEFAULT_LINE_NUMBER)
        }
        .with_children(children);

        let line_number = root
            .children
            .iter()
            .find_map(EvaluationResult::first_failing_line)
            .unwrap_or(DEFAULT_LINE_NUMBER);

        self.result = EvaluationResult { line_number, ..root };
        self
    }

    /// Mark this evaluation as failed because the rule could not be executed
    pub fn with_fault(mut self, diagnostic: impl Into<String>) -> Self {
        self.passed = false;
        self.has_results = true;
        self.result = EvaluationResult::failed(DEFAULT_LINE_NUMBER)
            .with_children(vec![EvaluationResult::failed(DEFAULT_LINE_NUMBER)]);
        self.diagnostic = Some(diagnostic.into());
        self
    }

    /// Whether this evaluation failed with a blocking severity
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity.is_blocking()
    }

    /// Format evaluation for display
    pub fn format_display(&self) -> String {
        let status = if self.passed { "passed" } else { "failed" };
        format!(
            "{}:{} [{}] {} {}: {}",
            self.template_identifier,
            self.result.line_number,
            self.severity.as_str(),
            self.rule_id,
            status,
            self.rule_description
        )
    }
}

/// Count of failed evaluations by severity level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    /// Total number of failures across all severities
    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }

    /// Add a failure to the counts
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Summary statistics for an analysis report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Number of rule evaluations in the report
    pub rules_evaluated: usize,
    /// Number of evaluations that passed
    pub passed: usize,
    /// Failed evaluations by severity level
    pub failures_by_severity: SeverityCounts,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when analysis was performed
    pub analyzed_at: DateTime<Utc>,
}

/// All evaluations for one template plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Template that was analyzed
    pub template_identifier: String,
    /// Evaluations for every rule that ran and was not suppressed
    pub evaluations: Vec<Evaluation>,
    /// Summary statistics
    pub summary: AnalysisSummary,
}

impl AnalysisReport {
    /// Create a new empty report for a template
    pub fn new(template_identifier: impl Into<String>) -> Self {
        Self {
            template_identifier: template_identifier.into(),
            evaluations: Vec::new(),
            summary: AnalysisSummary { analyzed_at: Utc::now(), ..Default::default() },
        }
    }

    /// Add an evaluation to the report
    pub fn add_evaluation(&mut self, evaluation: Evaluation) {
        self.summary.rules_evaluated += 1;
        if evaluation.passed {
            self.summary.passed += 1;
        } else {
            self.summary.failures_by_severity.add(evaluation.severity);
        }
        self.evaluations.push(evaluation);
    }

    /// Evaluations that found at least one violation
    pub fn failed_evaluations(&self) -> impl Iterator<Item = &Evaluation> {
        self.evaluations.iter().filter(|e| !e.passed)
    }

    /// Whether any rule failed
    pub fn has_failures(&self) -> bool {
        self.summary.failures_by_severity.total() > 0
    }

    /// Whether any rule failed with a blocking severity
    pub fn has_errors(&self) -> bool {
        self.summary.failures_by_severity.error > 0
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Sort evaluations for consistent output: failures first, then by line and rule id
    pub fn sort_evaluations(&mut self) {
        self.evaluations.sort_by(|a, b| {
            a.passed
                .cmp(&b.passed)
                .then_with(|| a.result.line_number.cmp(&b.result.line_number))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
    }
}

/// Error types that can occur during analysis
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// A required input was missing or malformed when an operation started
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A rule engine failed to execute a rule
    #[error("Rule '{rule_id}' failed to execute: {message}")]
    Engine { rule_id: String, message: String },

    /// A report could not be produced
    #[error("Report error: {message}")]
    Report { message: String },
}

impl AnalyzerError {
    /// Create an argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a rule engine error
    pub fn engine(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine { rule_id: rule_id.into(), message: message.into() }
    }

    /// Create a report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report { message: message.into() }
    }

    /// Whether this error aborted an operation at construction or call entry
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

/// Result type for analyzer operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
