//! Rule execution against expanded templates
//!
//! Architectural Principle: Service Layer - Rule engines are pluggable behind the RuleEngine trait
//! - Engines report failing locations as structural paths, never as lines
//! - Finding trees mirror the nesting of the resources a rule inspected
//! - DeclarativeEngine evaluates the property checks carried by rule definitions

pub mod declarative;

use crate::config::RuleDefinition;
use crate::domain::evaluation::AnalyzerResult;
use crate::domain::template::TemplateContext;
use serde::{Deserialize, Serialize};

pub use declarative::DeclarativeEngine;

/// A location reported by a rule engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Whether this location satisfied the rule
    pub passed: bool,
    /// Structural path into the expanded template
    pub path: String,
    /// Findings for nested resources
    #[serde(default)]
    pub children: Vec<Finding>,
}

impl Finding {
    /// A violated location
    pub fn failed(path: impl Into<String>) -> Self {
        Self { passed: false, path: path.into(), children: Vec::new() }
    }

    /// A satisfied location
    pub fn passed(path: impl Into<String>) -> Self {
        Self { passed: true, path: path.into(), children: Vec::new() }
    }

    /// Attach nested findings
    pub fn with_children(mut self, children: Vec<Finding>) -> Self {
        self.children = children;
        self
    }
}

/// Executes a single rule against an expanded template
pub trait RuleEngine: Send + Sync {
    /// Evaluate a rule against a template, returning the locations it reports.
    ///
    /// Rules read the expanded template and may consult the context's
    /// resource mappings. An empty result means the rule passed or did not apply.
    fn evaluate(
        &self,
        rule: &RuleDefinition,
        context: &TemplateContext,
    ) -> AnalyzerResult<Vec<Finding>>;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        "rule-engine"
    }
}
