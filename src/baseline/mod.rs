//! Baseline of repeated rules suppressed in full-rule runs
//!
//! Architecture: Infrastructure Layer - The baseline is read from rule content without affecting domain logic
//! - The file is read once, on first use, and never reloaded by the same registry
//! - Missing, empty, or unreadable baselines suppress nothing
//! - The registry is immutable after load and safe to share across analyses

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Directory under the rule-content location holding baselines
pub const BASELINE_DIR: &str = "baselines";

/// File name of the repeated-rules baseline
pub const BASELINE_FILE_NAME: &str = "RepeatedRulesBaseline.Rule.json";

/// Rule ids whose findings are known to repeat other rules' findings
#[derive(Debug)]
pub struct BaselineRegistry {
    /// Where the baseline is read from, if anywhere
    source: Option<PathBuf>,
    /// Rule ids, populated on first use
    rule_ids: OnceLock<HashSet<String>>,
}

/// Baseline documents as written by rule-content authors
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BaselineFile {
    /// A plain list of rule ids
    RuleIds(Vec<String>),
    /// A single baseline document
    Document(BaselineDocument),
    /// Several baseline documents in one file
    Documents(Vec<BaselineDocument>),
}

#[derive(Debug, Deserialize)]
struct BaselineDocument {
    spec: BaselineSpec,
}

#[derive(Debug, Deserialize)]
struct BaselineSpec {
    rule: BaselineRuleFilter,
}

#[derive(Debug, Deserialize)]
struct BaselineRuleFilter {
    #[serde(default)]
    exclude: Vec<String>,
}

impl BaselineRegistry {
    /// Registry that reads the given file on first use
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        Self { source: Some(path.as_ref().to_path_buf()), rule_ids: OnceLock::new() }
    }

    /// Registry reading the repeated-rules baseline under a rule-content directory
    pub fn from_rules_dir<P: AsRef<Path>>(rules_dir: P) -> Self {
        Self::from_file(rules_dir.as_ref().join(BASELINE_DIR).join(BASELINE_FILE_NAME))
    }

    /// Registry that suppresses nothing
    pub fn empty() -> Self {
        Self::from_rule_ids(Vec::<String>::new())
    }

    /// Registry with an explicit set of rule ids
    pub fn from_rule_ids<I, S>(rule_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule_ids: HashSet<String> = rule_ids.into_iter().map(Into::into).collect();
        Self { source: None, rule_ids: OnceLock::from(rule_ids) }
    }

    /// Whether a rule id is in the baseline
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rule_ids().contains(rule_id)
    }

    /// Number of rule ids in the baseline
    pub fn len(&self) -> usize {
        self.rule_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_ids().is_empty()
    }

    /// File the baseline is read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn rule_ids(&self) -> &HashSet<String> {
        self.rule_ids.get_or_init(|| match &self.source {
            Some(path) => load_rule_ids(path),
            None => HashSet::new(),
        })
    }
}

impl Default for BaselineRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read a baseline file, treating any failure as an empty baseline
fn load_rule_ids(path: &Path) -> HashSet<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("No baseline loaded from {}: {}", path.display(), e);
            return HashSet::new();
        }
    };

    if content.trim().is_empty() {
        tracing::debug!("Baseline {} is empty", path.display());
        return HashSet::new();
    }

    match serde_yaml::from_str::<BaselineFile>(&content) {
        Ok(file) => {
            let rule_ids = file.into_rule_ids();
            tracing::debug!("Loaded {} baseline rules from {}", rule_ids.len(), path.display());
            rule_ids
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable baseline {}: {}", path.display(), e);
            HashSet::new()
        }
    }
}

impl BaselineFile {
    fn into_rule_ids(self) -> HashSet<String> {
        let ids: Vec<String> = match self {
            Self::RuleIds(ids) => ids,
            Self::Document(document) => document.spec.rule.exclude,
            Self::Documents(documents) => {
                documents.into_iter().flat_map(|d| d.spec.rule.exclude).collect()
            }
        };

        ids.into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}
