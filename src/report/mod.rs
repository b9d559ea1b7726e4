//! Report generation for analysis results
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - AnalysisReport (domain) is rendered for terminals or for tools
//! - Each format encapsulates its own presentation rules
//! - Domain logic stays unaware of how results are displayed

use crate::domain::evaluation::{AnalysisReport, AnalyzerError, AnalyzerResult, Evaluation, Severity};
use std::io::Write;

/// Supported output formats for analysis reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format with optional colors
    Human,
    /// JSON format for programmatic consumption
    Json,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Whether to include passing evaluations
    pub show_passed: bool,
    /// Whether to show recommendations and help links
    pub show_recommendations: bool,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, show_passed: false, show_recommendations: true, min_severity: None }
    }
}

/// Report formatter that dispatches on output format
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format an analysis report in the specified format
    pub fn format_report(
        &self,
        report: &AnalysisReport,
        format: OutputFormat,
    ) -> AnalyzerResult<String> {
        let evaluations = self.filter_evaluations(&report.evaluations);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, &evaluations)),
            OutputFormat::Json => self.format_json(report, &evaluations),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &AnalysisReport,
        format: OutputFormat,
        mut writer: W,
    ) -> AnalyzerResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn filter_evaluations<'a>(&self, evaluations: &'a [Evaluation]) -> Vec<&'a Evaluation> {
        evaluations
            .iter()
            .filter(|e| self.options.show_passed || !e.passed)
            .filter(|e| self.options.min_severity.map_or(true, |min| e.severity >= min))
            .collect()
    }

    fn format_human(&self, report: &AnalysisReport, evaluations: &[&Evaluation]) -> String {
        let mut output = String::new();

        if !report.has_failures() {
            output.push_str(&self.paint("32", "No rule violations found"));
            output.push('\n');
        } else {
            let color = if report.has_errors() { "31" } else { "33" };
            output.push_str(&self.paint(color, "Rule Violations Found"));
            output.push_str("\n\n");
        }

        output.push_str(&format!("{}\n", report.template_identifier));

        for evaluation in evaluations {
            let severity_color = match evaluation.severity {
                Severity::Error => "31",
                Severity::Warning => "33",
                Severity::Info => "36",
            };
            let status = if evaluation.passed { "pass" } else { "fail" };

            output.push_str(&format!(
                "  {}:{} [{}] {} ({}) {}\n",
                self.paint("2", &format!("line {}", evaluation.result.line_number)),
                status,
                self.paint(severity_color, evaluation.severity.as_str()),
                evaluation.rule_id,
                evaluation.rule_name,
                evaluation.rule_description
            ));

            let extra_lines: Vec<u32> = evaluation
                .result
                .children
                .iter()
                .flat_map(|child| child.failing_lines())
                .filter(|line| *line != evaluation.result.line_number)
                .collect();
            if !extra_lines.is_empty() {
                let lines: Vec<String> = extra_lines.iter().map(u32::to_string).collect();
                output.push_str(&format!("    also at lines {}\n", lines.join(", ")));
            }

            if let Some(diagnostic) = &evaluation.diagnostic {
                output.push_str(&format!("    {}\n", self.paint("31", diagnostic)));
            }

            if self.options.show_recommendations && !evaluation.passed {
                output.push_str(&format!("    {}\n", self.paint("32", &evaluation.recommendation)));
                output.push_str(&format!("    {}\n", evaluation.help_uri));
            }
        }

        output.push('\n');
        output.push_str(&self.format_summary(report));
        output
    }

    fn format_json(
        &self,
        report: &AnalysisReport,
        evaluations: &[&Evaluation],
    ) -> AnalyzerResult<String> {
        let json_report = serde_json::json!({
            "template": report.template_identifier,
            "evaluations": evaluations,
            "summary": report.summary,
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| AnalyzerError::report(format!("JSON serialization failed: {e}")))
    }

    fn format_summary(&self, report: &AnalysisReport) -> String {
        let counts = &report.summary.failures_by_severity;
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        let mut parts = Vec::new();
        if counts.error > 0 {
            let text = format!("{} error{}", counts.error, if counts.error == 1 { "" } else { "s" });
            parts.push(self.paint("31", &text));
        }
        if counts.warning > 0 {
            let text =
                format!("{} warning{}", counts.warning, if counts.warning == 1 { "" } else { "s" });
            parts.push(self.paint("33", &text));
        }
        if counts.info > 0 {
            parts.push(self.paint("36", &format!("{} info", counts.info)));
        }
        if parts.is_empty() {
            parts.push("no failures".to_string());
        }

        format!(
            "Summary: {} across {} rules, {} passed ({:.1}s)\n",
            parts.join(", "),
            report.summary.rules_evaluated,
            report.summary.passed,
            execution_time
        )
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.options.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}
