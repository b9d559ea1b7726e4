//! Rule orchestration for Template Analyzer
//!
//! CDD Principle: Domain Services - RuleOrchestrator runs a rule set against one template
//! - Selects the full rule set or the curated security subset
//! - Resolves every reported location to a line in the authored template
//! - Suppresses baseline rules in full runs and isolates failures of individual rules

use crate::baseline::BaselineRegistry;
use crate::config::{AnalyzerConfig, RuleCategory, RuleDefinition};
use crate::domain::evaluation::{AnalyzerError, AnalyzerResult, Evaluation, EvaluationResult};
use crate::domain::template::TemplateContext;
use crate::engine::{DeclarativeEngine, Finding, RuleEngine};
use crate::location::{self, LineNumberResolver};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Which rules an orchestrator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleSelection {
    /// Every enabled rule, with baseline suppression
    Full,
    /// Only rules in the security category, without baseline suppression
    SecurityOnly,
}

impl RuleSelection {
    /// Selection from an "include all rules" flag
    pub fn from_all_rules(all_rules: bool) -> Self {
        if all_rules { Self::Full } else { Self::SecurityOnly }
    }

    /// Whether a rule belongs to this selection
    pub fn includes(self, rule: &RuleDefinition) -> bool {
        match self {
            Self::Full => true,
            Self::SecurityOnly => rule.category == RuleCategory::Security,
        }
    }

    /// Whether baseline rules are suppressed under this selection
    pub fn applies_baseline(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Runs a fixed rule selection against template contexts
pub struct RuleOrchestrator {
    /// Rule subset chosen at construction
    selection: RuleSelection,
    /// Enabled rules in the selection
    rules: Vec<RuleDefinition>,
    /// Executes individual rules
    engine: Arc<dyn RuleEngine>,
    /// Rules suppressed in full runs
    baseline: BaselineRegistry,
    /// Number of enabled rules outside the selection
    unselected_rules: usize,
    /// Number of disabled rules in the configuration
    disabled_rules: usize,
}

impl RuleOrchestrator {
    /// Create an orchestrator for a configuration and rule selection
    pub fn new(config: &AnalyzerConfig, selection: RuleSelection) -> AnalyzerResult<Self> {
        config.validate()?;

        let (rules, unselected): (Vec<_>, Vec<_>) =
            config.enabled_rules().cloned().partition(|rule| selection.includes(rule));
        let disabled_rules = config.rules.len() - rules.len() - unselected.len();

        let engine: Arc<dyn RuleEngine> = Arc::new(DeclarativeEngine::for_rules(&rules));
        let baseline = BaselineRegistry::from_file(config.baseline_path());
        tracing::debug!(
            "Created {:?} orchestrator with {} rules, baseline at {}",
            selection,
            rules.len(),
            config.baseline_path().display()
        );

        Ok(Self {
            selection,
            rules,
            engine,
            baseline,
            unselected_rules: unselected.len(),
            disabled_rules,
        })
    }

    /// Create an orchestrator with default configuration
    pub fn with_defaults(selection: RuleSelection) -> AnalyzerResult<Self> {
        Self::new(&AnalyzerConfig::default(), selection)
    }

    /// Replace the rule engine
    pub fn with_engine(mut self, engine: Arc<dyn RuleEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the baseline registry
    pub fn with_baseline(mut self, baseline: BaselineRegistry) -> Self {
        self.baseline = baseline;
        self
    }

    /// Run the selected rules against a template.
    ///
    /// Fails only when the context is unusable; a rule that cannot be
    /// executed yields a failed evaluation carrying a diagnostic instead.
    /// The order of the returned evaluations is unspecified.
    pub fn analyze_template(&self, context: &TemplateContext) -> AnalyzerResult<Vec<Evaluation>> {
        context.validate()?;
        let resolver = location::resolver_for(context)?;
        let start_time = Instant::now();

        let suppressed = self.rules.iter().filter(|rule| self.is_suppressed(rule)).count();

        let evaluations: Vec<Evaluation> = self
            .rules
            .par_iter()
            .filter(|rule| !self.is_suppressed(rule))
            .map(|rule| self.evaluate_rule(rule, context, &*resolver))
            .collect();

        tracing::info!(
            "Analyzed '{}' with {} rules in {}ms: {} failed, {} suppressed by baseline",
            context.template_identifier,
            evaluations.len(),
            start_time.elapsed().as_millis(),
            evaluations.iter().filter(|e| !e.passed).count(),
            suppressed
        );

        Ok(evaluations)
    }

    /// Whether a rule is excluded from this orchestrator's results
    pub fn is_suppressed(&self, rule: &RuleDefinition) -> bool {
        self.selection.applies_baseline() && self.baseline.contains(&rule.id)
    }

    /// Run one rule, converting engine errors and panics into failed evaluations
    fn evaluate_rule(
        &self,
        rule: &RuleDefinition,
        context: &TemplateContext,
        resolver: &dyn LineNumberResolver,
    ) -> Evaluation {
        tracing::debug!("Evaluating rule '{}' against '{}'", rule.id, context.template_identifier);

        let evaluation = Evaluation::new(&rule.id, rule.severity, &context.template_identifier)
            .with_rule_name(&rule.name)
            .with_description(&rule.description, &rule.help_uri, &rule.recommendation);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.evaluate(rule, context).map(|findings| {
                findings.iter().map(|finding| resolve_finding(finding, resolver)).collect::<Vec<_>>()
            })
        }));

        match outcome {
            Ok(Ok(results)) => evaluation.with_results(results),
            Ok(Err(e)) => {
                tracing::warn!("Rule '{}' could not be evaluated: {}", rule.id, e);
                evaluation.with_fault(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let error = AnalyzerError::engine(
                    &rule.id,
                    format!("{} engine panicked: {}", self.engine.name(), message),
                );
                tracing::warn!("{}", error);
                evaluation.with_fault(error.to_string())
            }
        }
    }

    /// Rule selection fixed at construction
    pub fn selection(&self) -> RuleSelection {
        self.selection
    }

    /// Rules this orchestrator runs, before baseline suppression
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    /// Baseline consulted in full runs
    pub fn baseline(&self) -> &BaselineRegistry {
        &self.baseline
    }

    /// Get statistics about the selected rules
    pub fn rule_stats(&self) -> RuleStats {
        let security_rules =
            self.rules.iter().filter(|rule| rule.category == RuleCategory::Security).count();

        RuleStats {
            selected_rules: self.rules.len(),
            security_rules,
            general_rules: self.rules.len() - security_rules,
            unselected_rules: self.unselected_rules,
            disabled_rules: self.disabled_rules,
        }
    }
}

/// Statistics about configured rules
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleStats {
    pub selected_rules: usize,
    pub security_rules: usize,
    pub general_rules: usize,
    pub unselected_rules: usize,
    pub disabled_rules: usize,
}

impl RuleStats {
    pub fn total_rules(&self) -> usize {
        self.selected_rules + self.unselected_rules + self.disabled_rules
    }
}

/// Translate an engine finding tree into a line-resolved result tree
fn resolve_finding(finding: &Finding, resolver: &dyn LineNumberResolver) -> EvaluationResult {
    EvaluationResult {
        passed: finding.passed,
        line_number: resolver.resolve_line_number(&finding.path),
        children: finding.children.iter().map(|child| resolve_finding(child, resolver)).collect(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{BASELINE_DIR, BASELINE_FILE_NAME};
    use crate::config::{Condition, ConfigBuilder, RuleCheck};
    use crate::domain::evaluation::Severity;
    use crate::domain::template::{FileSourceMap, LineMapping, SourceMap};
    use rstest::rstest;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Template violating five of the default rules, three of them security rules
    fn mixed_template() -> Value {
        json!({
            "contentVersion": "1.0.0.0",
            "resources": [
                {
                    "name": "Bad_Storage",
                    "properties": { "supportsHttpsTrafficOnly": false },
                    "type": "Microsoft.Storage/storageAccounts"
                },
                {
                    "name": "site",
                    "properties": {
                        "httpsOnly": false,
                        "siteConfig": { "remoteDebuggingEnabled": true }
                    },
                    "type": "Microsoft.Web/sites"
                }
            ]
        })
    }

    /// Compiled template whose failing properties sit on expanded lines 9 and 15
    fn compiled_template() -> Value {
        json!({
            "contentVersion": "1.0.0.0",
            "parameters": {},
            "resources": [
                {
                    "location": "westus",
                    "name": "site-a",
                    "properties": { "httpsOnly": false },
                    "type": "Microsoft.Web/sites"
                },
                {
                    "properties": { "httpsOnly": false },
                    "type": "Microsoft.Web/sites"
                }
            ]
        })
    }

    fn compiled_context() -> TemplateContext {
        let source_map = SourceMap::new("main.bicep").with_file(FileSourceMap::new(
            "main.bicep",
            vec![LineMapping::new(8, 13), LineMapping::new(14, 16)],
        ));

        TemplateContext::new("main.bicep", compiled_template())
            .unwrap()
            .with_source_map(source_map)
    }

    fn config_in(rules_dir: &Path) -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.rules_dir = Some(rules_dir.to_path_buf());
        config
    }

    fn write_baseline(rules_dir: &Path, content: &str) {
        let dir = rules_dir.join(BASELINE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(BASELINE_FILE_NAME), content).unwrap();
    }

    fn https_rule(id: &str) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            name: format!("Test.{id}"),
            description: "Sites must only accept HTTPS".to_string(),
            help_uri: "https://example.com/https".to_string(),
            recommendation: "Set httpsOnly to true".to_string(),
            severity: Severity::Error,
            category: RuleCategory::Security,
            enabled: true,
            resource_type: Some("Microsoft.Web/sites".to_string()),
            check: RuleCheck {
                path: "properties.httpsOnly".to_string(),
                condition: Condition::Equals(json!(true)),
                default: None,
            },
        }
    }

    /// Check the invariants every returned evaluation must satisfy
    fn assert_well_formed(evaluations: &[Evaluation]) {
        for evaluation in evaluations {
            assert!(!evaluation.rule_id.trim().is_empty());
            assert!(!evaluation.rule_description.trim().is_empty());
            assert!(!evaluation.help_uri.trim().is_empty());
            assert!(!evaluation.recommendation.trim().is_empty());
            assert!(evaluation.result.line_number >= 1);

            if evaluation.passed {
                assert!(!evaluation.has_results, "{} passed with results", evaluation.rule_id);
            } else {
                assert!(evaluation.has_results, "{} failed without results", evaluation.rule_id);
                assert!(!evaluation.result.passed);
                assert!(evaluation.result.has_failure());
            }
        }
    }

    fn failing_lines(evaluations: &[Evaluation]) -> Vec<u32> {
        let mut lines: Vec<u32> = evaluations
            .iter()
            .filter(|e| !e.passed)
            .map(|e| e.result.line_number)
            .collect();
        lines.sort_unstable();
        lines
    }

    /// Engine reporting one fixed path per rule id
    struct FixedPathEngine;

    impl RuleEngine for FixedPathEngine {
        fn evaluate(
            &self,
            rule: &RuleDefinition,
            _context: &TemplateContext,
        ) -> AnalyzerResult<Vec<Finding>> {
            let path = match rule.id.as_str() {
                "FIRST" => "resources[0].properties.httpsOnly",
                "SECOND" => "resources[1].properties.httpsOnly",
                _ => return Ok(Vec::new()),
            };
            Ok(vec![Finding::failed(path)])
        }
    }

    /// Engine that fails for selected rules and defers to the declarative engine otherwise
    struct FaultyEngine;

    impl RuleEngine for FaultyEngine {
        fn evaluate(
            &self,
            rule: &RuleDefinition,
            context: &TemplateContext,
        ) -> AnalyzerResult<Vec<Finding>> {
            match rule.id.as_str() {
                "AZR-000081" => panic!("rule body crashed"),
                "AZR-000075" => Err(AnalyzerError::engine(&rule.id, "timed out")),
                _ => DeclarativeEngine::new().evaluate(rule, context),
            }
        }

        fn name(&self) -> &str {
            "faulty"
        }
    }

    /// Engine reporting the expanded path that declares a rule's id in the resource mappings
    struct MappingEngine;

    impl RuleEngine for MappingEngine {
        fn evaluate(
            &self,
            rule: &RuleDefinition,
            context: &TemplateContext,
        ) -> AnalyzerResult<Vec<Finding>> {
            Ok(context
                .resource_mappings
                .iter()
                .filter(|(_, declaration)| declaration.as_str() == rule.id)
                .map(|(path, _)| Finding::failed(path.clone()))
                .collect())
        }
    }

    #[test]
    fn test_source_mapped_lines_per_rule() {
        let config = ConfigBuilder::empty()
            .add_rule(https_rule("FIRST"))
            .add_rule(https_rule("SECOND"))
            .build()
            .unwrap();
        let orchestrator = RuleOrchestrator::new(&config, RuleSelection::Full)
            .unwrap()
            .with_baseline(BaselineRegistry::empty())
            .with_engine(Arc::new(FixedPathEngine));

        let evaluations = orchestrator.analyze_template(&compiled_context()).unwrap();

        assert_well_formed(&evaluations);
        assert_eq!(failing_lines(&evaluations), vec![14, 17]);
    }

    #[test]
    fn test_source_mapped_lines_with_declarative_engine() {
        let config = ConfigBuilder::empty().add_rule(https_rule("AZR-000075")).build().unwrap();
        let orchestrator = RuleOrchestrator::new(&config, RuleSelection::Full)
            .unwrap()
            .with_baseline(BaselineRegistry::empty());

        let evaluations = orchestrator.analyze_template(&compiled_context()).unwrap();

        assert_eq!(evaluations.len(), 1);
        let evaluation = &evaluations[0];
        assert!(!evaluation.passed);
        assert_eq!(evaluation.result.line_number, 14);
        let lines: Vec<u32> = evaluation.result.children.iter().map(|c| c.line_number).collect();
        assert_eq!(lines, vec![14, 17]);
    }

    #[test]
    fn test_unmapped_lines_fall_back_to_first_line() {
        let mut context = compiled_context();
        context.source_map = Some(SourceMap::new("main.bicep").with_file(FileSourceMap::new(
            "main.bicep",
            vec![LineMapping::new(0, 0)],
        )));
        let config = ConfigBuilder::empty().add_rule(https_rule("AZR-000075")).build().unwrap();
        let orchestrator = RuleOrchestrator::new(&config, RuleSelection::Full)
            .unwrap()
            .with_baseline(BaselineRegistry::empty());

        let evaluations = orchestrator.analyze_template(&context).unwrap();

        assert_eq!(evaluations[0].result.line_number, 1);
        assert!(evaluations[0].result.children.iter().all(|c| c.line_number == 1));
    }

    #[rstest]
    #[case(RuleSelection::Full, vec![1, 5, 7, 14, 16])]
    #[case(RuleSelection::SecurityOnly, vec![7, 14, 16])]
    fn test_analyze_template_reports_expected_lines(
        #[case] selection: RuleSelection,
        #[case] expected_lines: Vec<u32>,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = RuleOrchestrator::new(&config_in(temp_dir.path()), selection).unwrap();
        let context = TemplateContext::new("templates/mixed.json", mixed_template()).unwrap();

        let evaluations = orchestrator.analyze_template(&context).unwrap();

        assert_well_formed(&evaluations);
        assert_eq!(evaluations.len(), orchestrator.rules().len());
        assert_eq!(failing_lines(&evaluations), expected_lines);
    }

    #[test]
    fn test_security_rules_are_subset_of_full_rules() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let context = TemplateContext::new("templates/mixed.json", mixed_template()).unwrap();

        let ids = |selection| -> HashSet<String> {
            RuleOrchestrator::new(&config, selection)
                .unwrap()
                .analyze_template(&context)
                .unwrap()
                .into_iter()
                .map(|e| e.rule_id)
                .collect()
        };

        let full = ids(RuleSelection::Full);
        let security = ids(RuleSelection::SecurityOnly);

        assert!(security.is_subset(&full));
        assert!(security.len() < full.len());
    }

    #[test]
    fn test_baseline_suppresses_rules_in_full_runs() {
        let temp_dir = TempDir::new().unwrap();
        write_baseline(temp_dir.path(), r#"["AZR-000081"]"#);
        let context = TemplateContext::new("templates/mixed.json", mixed_template()).unwrap();

        let full = RuleOrchestrator::new(&config_in(temp_dir.path()), RuleSelection::Full)
            .unwrap()
            .analyze_template(&context)
            .unwrap();
        assert!(!full.iter().any(|e| e.rule_id == "AZR-000081"));

        let security =
            RuleOrchestrator::new(&config_in(temp_dir.path()), RuleSelection::SecurityOnly)
                .unwrap()
                .analyze_template(&context)
                .unwrap();
        assert!(security.iter().any(|e| e.rule_id == "AZR-000081" && !e.passed));
    }

    #[test]
    fn test_empty_baseline_restores_suppressed_rule() {
        let temp_dir = TempDir::new().unwrap();
        let context = TemplateContext::new("templates/mixed.json", mixed_template()).unwrap();

        write_baseline(temp_dir.path(), r#"["AZR-000081"]"#);
        let suppressed = RuleOrchestrator::new(&config_in(temp_dir.path()), RuleSelection::Full)
            .unwrap()
            .analyze_template(&context)
            .unwrap();
        assert!(!suppressed.iter().any(|e| e.rule_id == "AZR-000081"));

        write_baseline(temp_dir.path(), "");
        let restored = RuleOrchestrator::new(&config_in(temp_dir.path()), RuleSelection::Full)
            .unwrap()
            .analyze_template(&context)
            .unwrap();
        assert!(restored.iter().any(|e| e.rule_id == "AZR-000081" && !e.passed));
    }

    #[test]
    fn test_injected_baseline() {
        let orchestrator = RuleOrchestrator::with_defaults(RuleSelection::Full)
            .unwrap()
            .with_baseline(BaselineRegistry::from_rule_ids(["AZR-000075", "AZR-000199"]));
        let context = TemplateContext::new("templates/mixed.json", mixed_template()).unwrap();

        let evaluations = orchestrator.analyze_template(&context).unwrap();

        assert_eq!(evaluations.len(), orchestrator.rules().len() - 2);
        assert_eq!(failing_lines(&evaluations), vec![1, 5, 16]);
    }

    #[test]
    fn test_rule_faults_are_isolated() {
        let orchestrator = RuleOrchestrator::with_defaults(RuleSelection::SecurityOnly)
            .unwrap()
            .with_engine(Arc::new(FaultyEngine));
        let context = TemplateContext::new("templates/mixed.json", mixed_template()).unwrap();

        let evaluations = orchestrator.analyze_template(&context).unwrap();

        assert_well_formed(&evaluations);
        assert_eq!(evaluations.len(), orchestrator.rules().len());

        let panicked = evaluations.iter().find(|e| e.rule_id == "AZR-000081").unwrap();
        assert!(!panicked.passed);
        assert!(panicked.diagnostic.as_deref().unwrap().contains("rule body crashed"));

        let errored = evaluations.iter().find(|e| e.rule_id == "AZR-000075").unwrap();
        assert!(!errored.passed);
        assert!(errored.diagnostic.as_deref().unwrap().contains("timed out"));

        let healthy = evaluations.iter().find(|e| e.rule_id == "AZR-000199").unwrap();
        assert!(!healthy.passed);
        assert!(healthy.diagnostic.is_none());
        assert_eq!(healthy.result.line_number, 7);
    }

    #[test]
    fn test_missing_identifier_is_argument_error() {
        let orchestrator = RuleOrchestrator::with_defaults(RuleSelection::Full).unwrap();

        let err = orchestrator.analyze_template(&TemplateContext::default()).unwrap_err();
        assert!(err.is_argument_error());

        let context = TemplateContext { expanded_template: mixed_template(), ..Default::default() };
        assert!(orchestrator.analyze_template(&context).unwrap_err().is_argument_error());
    }

    #[test]
    fn test_missing_expanded_template_is_argument_error() {
        let orchestrator = RuleOrchestrator::with_defaults(RuleSelection::Full).unwrap();
        let context =
            TemplateContext { template_identifier: "main.json".to_string(), ..Default::default() };

        assert!(orchestrator.analyze_template(&context).unwrap_err().is_argument_error());
    }

    #[test]
    fn test_source_map_without_entrypoint_is_argument_error() {
        let orchestrator = RuleOrchestrator::with_defaults(RuleSelection::Full).unwrap();
        let mut context = compiled_context();
        context.source_map = Some(SourceMap::new("other.bicep"));

        assert!(orchestrator.analyze_template(&context).unwrap_err().is_argument_error());
    }

    #[test]
    fn test_concurrent_analyses() {
        let orchestrator = Arc::new(
            RuleOrchestrator::with_defaults(RuleSelection::Full)
                .unwrap()
                .with_baseline(BaselineRegistry::empty()),
        );

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let orchestrator = Arc::clone(&orchestrator);
                std::thread::spawn(move || {
                    let context =
                        TemplateContext::new(format!("templates/mixed-{i}.json"), mixed_template())
                            .unwrap();
                    orchestrator.analyze_template(&context).unwrap()
                })
            })
            .collect();

        for handle in handles {
            let evaluations = handle.join().unwrap();
            assert_well_formed(&evaluations);
            assert_eq!(failing_lines(&evaluations), vec![1, 5, 7, 14, 16]);
        }
    }

    #[test]
    fn test_rule_stats() {
        let mut config = AnalyzerConfig::default();
        config.rules[0].enabled = false;
        let total = config.rules.len();

        let full = RuleOrchestrator::new(&config, RuleSelection::Full).unwrap().rule_stats();
        assert_eq!(full.disabled_rules, 1);
        assert_eq!(full.unselected_rules, 0);
        assert_eq!(full.total_rules(), total);

        let security =
            RuleOrchestrator::new(&config, RuleSelection::SecurityOnly).unwrap().rule_stats();
        assert_eq!(security.general_rules, 0);
        assert_eq!(security.selected_rules, security.security_rules);
        assert_eq!(security.total_rules(), total);
    }

    #[test]
    fn test_selection_from_flag() {
        assert_eq!(RuleSelection::from_all_rules(true), RuleSelection::Full);
        assert_eq!(RuleSelection::from_all_rules(false), RuleSelection::SecurityOnly);
        assert!(RuleSelection::Full.applies_baseline());
        assert!(!RuleSelection::SecurityOnly.applies_baseline());
    }

    #[test]
    fn test_engine_receives_resource_mappings() {
        let config = ConfigBuilder::empty()
            .add_rule(https_rule("FIRST"))
            .add_rule(https_rule("SECOND"))
            .build()
            .unwrap();
        let orchestrator = RuleOrchestrator::new(&config, RuleSelection::Full)
            .unwrap()
            .with_baseline(BaselineRegistry::empty())
            .with_engine(Arc::new(MappingEngine));
        let mappings = [("resources[1].properties.httpsOnly".to_string(), "SECOND".to_string())];
        let context = compiled_context().with_resource_mappings(mappings.into_iter().collect());

        let evaluations = orchestrator.analyze_template(&context).unwrap();

        let first = evaluations.iter().find(|e| e.rule_id == "FIRST").unwrap();
        assert!(first.passed);
        let second = evaluations.iter().find(|e| e.rule_id == "SECOND").unwrap();
        assert!(!second.passed);
        assert_eq!(second.result.line_number, 17);
    }

    #[test]
    fn test_out_of_range_source_line_does_not_abort_analysis() {
        let mut context = compiled_context();
        context.source_map = Some(SourceMap::new("main.bicep").with_file(FileSourceMap::new(
            "main.bicep",
            vec![LineMapping::new(8, u32::MAX), LineMapping::new(14, 16)],
        )));
        let config = ConfigBuilder::empty().add_rule(https_rule("AZR-000075")).build().unwrap();
        let orchestrator = RuleOrchestrator::new(&config, RuleSelection::Full)
            .unwrap()
            .with_baseline(BaselineRegistry::empty());

        let evaluations = orchestrator.analyze_template(&context).unwrap();

        let lines: Vec<u32> = evaluations[0].result.children.iter().map(|c| c.line_number).collect();
        assert_eq!(lines, vec![1, 17]);
        assert!(evaluations[0].diagnostic.is_none());
    }
}
