//! Template Analyzer - Rule analysis for compiled infrastructure templates
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Domain models stay free of file system and terminal concerns
//! - Line resolution maps findings back to the template the author wrote
//! - TemplateAnalyzer wires loading, orchestration and reporting together

pub mod analyzer;
pub mod baseline;
pub mod config;
pub mod domain;
pub mod engine;
pub mod location;
pub mod report;

// Re-export main types for convenient access
pub use domain::evaluation::{
    AnalysisReport, AnalysisSummary, AnalyzerError, AnalyzerResult, Evaluation, EvaluationResult,
    Severity,
};
pub use domain::template::{FileSourceMap, LineMapping, SourceMap, TemplateContext};

pub use config::{AnalyzerConfig, Condition, ConfigBuilder, RuleCategory, RuleCheck, RuleDefinition};

pub use analyzer::{RuleOrchestrator, RuleSelection, RuleStats};

pub use baseline::BaselineRegistry;

pub use engine::{DeclarativeEngine, Finding, RuleEngine};

pub use location::{JsonLineResolver, LineNumberResolver, SourceMapIndex, SourceMappedResolver};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Main entry point: analyzes compiled templates from disk or memory
pub struct TemplateAnalyzer {
    orchestrator: RuleOrchestrator,
    report_formatter: ReportFormatter,
}

impl TemplateAnalyzer {
    /// Create an analyzer for a configuration and rule selection
    pub fn new(config: AnalyzerConfig, selection: RuleSelection) -> AnalyzerResult<Self> {
        let orchestrator = RuleOrchestrator::new(&config, selection)?;
        Ok(Self { orchestrator, report_formatter: ReportFormatter::default() })
    }

    /// Create an analyzer with the built-in rule set
    pub fn with_defaults(selection: RuleSelection) -> AnalyzerResult<Self> {
        Self::new(AnalyzerConfig::default(), selection)
    }

    /// Create an analyzer loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(
        path: P,
        selection: RuleSelection,
    ) -> AnalyzerResult<Self> {
        Self::new(AnalyzerConfig::load_from_file(path)?, selection)
    }

    /// Replace the orchestrator, e.g. to inject a different engine or baseline
    pub fn with_orchestrator(mut self, orchestrator: RuleOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    /// Build a template context from files on disk.
    ///
    /// The compiled template and source map must be JSON. The compiled
    /// template's text is kept so lines are reported as the file lays them out.
    /// The original template is kept as JSON when it parses as JSON and as raw
    /// text otherwise.
    pub fn load_context<P: AsRef<Path>>(
        template_path: P,
        source_map_path: Option<&Path>,
        original_path: Option<&Path>,
    ) -> AnalyzerResult<TemplateContext> {
        let template_path = template_path.as_ref();
        let text = fs::read_to_string(template_path)?;
        let expanded = parse_template(template_path, &text)?;

        let mut context = TemplateContext::new(template_path.display().to_string(), expanded)?
            .with_expanded_text(text);

        if let Some(path) = original_path {
            let contents = fs::read_to_string(path)?;
            let original = serde_json::from_str(&contents).unwrap_or(Value::String(contents));
            context = context.with_original_template(original);
        }

        if let Some(path) = source_map_path {
            let contents = fs::read_to_string(path)?;
            context = context.with_source_map(SourceMap::from_json(&contents)?);
        }

        tracing::debug!(
            "Loaded template context '{}' (source mapped: {})",
            context.template_identifier,
            context.is_source_mapped()
        );
        Ok(context)
    }

    /// Analyze a template context and collect the results into a sorted report
    pub fn analyze_context(&self, context: &TemplateContext) -> AnalyzerResult<AnalysisReport> {
        let start_time = Instant::now();
        let evaluations = self.orchestrator.analyze_template(context)?;

        let mut report = AnalysisReport::new(&context.template_identifier);
        for evaluation in evaluations {
            report.add_evaluation(evaluation);
        }
        report.sort_evaluations();
        report.set_execution_time(start_time.elapsed().as_millis() as u64);

        Ok(report)
    }

    /// Load and analyze a compiled template file
    pub fn analyze_file<P: AsRef<Path>>(
        &self,
        template_path: P,
        source_map_path: Option<&Path>,
        original_path: Option<&Path>,
    ) -> AnalyzerResult<AnalysisReport> {
        let context = Self::load_context(template_path, source_map_path, original_path)?;
        self.analyze_context(&context)
    }

    /// Format an analysis report for output
    pub fn format_report(
        &self,
        report: &AnalysisReport,
        format: OutputFormat,
    ) -> AnalyzerResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// Get statistics about the selected rules
    pub fn rule_stats(&self) -> RuleStats {
        self.orchestrator.rule_stats()
    }

    pub fn orchestrator(&self) -> &RuleOrchestrator {
        &self.orchestrator
    }
}

fn parse_template(path: &Path, text: &str) -> AnalyzerResult<Value> {
    serde_json::from_str(text).map_err(|e| {
        AnalyzerError::invalid_argument(format!(
            "'{}' is not a valid JSON template: {}",
            path.display(),
            e
        ))
    })
}
