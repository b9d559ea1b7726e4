//! Built-in engine for declarative property checks

use crate::config::{Condition, RuleDefinition};
use crate::domain::evaluation::{AnalyzerError, AnalyzerResult};
use crate::domain::template::TemplateContext;
use crate::engine::{Finding, RuleEngine};
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Evaluates a rule's `check` against the template root or against every
/// resource of the rule's type, including nested child resources.
#[derive(Debug, Default, Clone)]
pub struct DeclarativeEngine {
    /// `matches` patterns compiled up front, keyed by pattern text
    patterns: HashMap<String, Regex>,
}

impl DeclarativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with the `matches` patterns of `rules` compiled once.
    ///
    /// Patterns that don't compile are skipped here and reported as an
    /// engine error when their rule is evaluated.
    pub fn for_rules<'r>(rules: impl IntoIterator<Item = &'r RuleDefinition>) -> Self {
        let mut patterns = HashMap::new();

        for rule in rules {
            let Condition::Matches(pattern) = &rule.check.condition else {
                continue;
            };
            if patterns.contains_key(pattern) {
                continue;
            }
            match Regex::new(pattern) {
                Ok(regex) => {
                    patterns.insert(pattern.clone(), regex);
                }
                Err(e) => tracing::warn!("Rule '{}' has an invalid pattern: {}", rule.id, e),
            }
        }

        tracing::debug!("Compiled {} rule patterns", patterns.len());
        Self { patterns }
    }

    /// Number of precompiled patterns
    pub fn compiled_patterns(&self) -> usize {
        self.patterns.len()
    }
}

impl RuleEngine for DeclarativeEngine {
    fn evaluate(
        &self,
        rule: &RuleDefinition,
        context: &TemplateContext,
    ) -> AnalyzerResult<Vec<Finding>> {
        let check = CompiledCheck::new(rule, &self.patterns)?;
        let template = &context.expanded_template;

        let findings = match &rule.resource_type {
            None => check.check_at(template, "").into_iter().collect(),
            Some(resource_type) => visit_resources(template, "", resource_type, &check),
        };

        tracing::debug!("Rule '{}' reported {} locations", rule.id, findings.len());
        Ok(findings)
    }

    fn name(&self) -> &str {
        "declarative"
    }
}

/// A rule check with its regex resolved
struct CompiledCheck<'a> {
    path: &'a str,
    condition: &'a Condition,
    default: Option<&'a Value>,
    regex: Option<Cow<'a, Regex>>,
}

impl<'a> CompiledCheck<'a> {
    fn new(rule: &'a RuleDefinition, patterns: &'a HashMap<String, Regex>) -> AnalyzerResult<Self> {
        let regex = match &rule.check.condition {
            Condition::Matches(pattern) => Some(match patterns.get(pattern) {
                Some(regex) => Cow::Borrowed(regex),
                None => Cow::Owned(Regex::new(pattern).map_err(|e| {
                    AnalyzerError::engine(&rule.id, format!("invalid pattern '{pattern}': {e}"))
                })?),
            }),
            _ => None,
        };

        Ok(Self {
            path: rule.check.path.trim(),
            condition: &rule.check.condition,
            default: rule.check.default.as_ref(),
            regex,
        })
    }

    /// Check the property under `target`; a failing finding if violated
    fn check_at(&self, target: &Value, base_path: &str) -> Option<Finding> {
        let found = lookup(target, self.path);
        if self.is_satisfied(found.as_ref().map(|(value, _)| *value)) {
            return None;
        }

        // Absent properties are reported at the object that should declare them
        let path = match found {
            Some((_, property_path)) => join_path(base_path, &property_path),
            None => base_path.to_string(),
        };
        Some(Finding::failed(path))
    }

    fn is_satisfied(&self, value: Option<&Value>) -> bool {
        let effective = value.or(self.default);

        match self.condition {
            Condition::Equals(expected) => effective == Some(expected),
            Condition::NotEquals(unexpected) => effective != Some(unexpected),
            Condition::Exists(expected) => value.is_some() == *expected,
            Condition::OneOf(allowed) => effective.is_some_and(|v| allowed.contains(v)),
            Condition::Matches(_) => effective
                .and_then(Value::as_str)
                .is_some_and(|s| self.regex.as_ref().is_some_and(|re| re.is_match(s))),
            Condition::Min(bound) => effective.and_then(Value::as_f64).is_some_and(|n| n >= *bound),
        }
    }
}

/// Visit `resources` under `container`, returning findings for violating
/// resources and for resources whose children violate the rule.
fn visit_resources(
    container: &Value,
    container_path: &str,
    resource_type: &str,
    check: &CompiledCheck<'_>,
) -> Vec<Finding> {
    let resources: Vec<(String, &Value)> = match container.get("resources") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (join_path(container_path, &format!("resources[{index}]")), item))
            .collect(),
        Some(Value::Object(named)) => named
            .iter()
            .map(|(name, item)| (join_path(container_path, &format!("resources.{name}")), item))
            .collect(),
        _ => return Vec::new(),
    };

    let mut findings = Vec::new();
    for (path, resource) in resources {
        let children = visit_resources(resource, &path, resource_type, check);

        let own = if is_resource_type(resource, resource_type) {
            check.check_at(resource, &path)
        } else {
            None
        };

        match own {
            Some(finding) => findings.push(finding.with_children(children)),
            None if !children.is_empty() => {
                findings.push(Finding::passed(path).with_children(children))
            }
            None => {}
        }
    }

    findings
}

fn is_resource_type(resource: &Value, resource_type: &str) -> bool {
    resource
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case(resource_type))
}

/// Case-insensitive property lookup along a dotted path.
///
/// Returns the value with the path it was found at, array positions
/// rendered as `[index]`.
fn lookup<'v>(target: &'v Value, path: &str) -> Option<(&'v Value, String)> {
    path.split('.').filter(|segment| !segment.is_empty()).try_fold(
        (target, String::new()),
        |(current, found_path), segment| match current {
            Value::Object(map) => {
                let (key, value) = map
                    .get(segment)
                    .map(|value| (segment, value))
                    .or_else(|| {
                        map.iter()
                            .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                            .map(|(key, value)| (key.as_str(), value))
                    })?;
                Some((value, join_path(&found_path, key)))
            }
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                Some((items.get(index)?, format!("{found_path}[{index}]")))
            }
            _ => None,
        },
    )
}

fn join_path(base: &str, path: &str) -> String {
    if base.is_empty() { path.to_string() } else { format!("{base}.{path}") }
}
