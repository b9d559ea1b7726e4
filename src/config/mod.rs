//! Configuration loading and management for Template Analyzer
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to rule definitions
//! - A default rule set is embedded so analysis works without a config file
//! - Configuration locates the rule content that baselines are read from

use crate::baseline::{BASELINE_DIR, BASELINE_FILE_NAME};
use crate::domain::evaluation::{AnalyzerError, AnalyzerResult, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for Template Analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Configuration format version
    pub version: String,
    /// Rule-content location; baselines are read relative to it
    #[serde(default)]
    pub rules_dir: Option<PathBuf>,
    /// Rule definitions
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Whether a rule belongs to the curated security subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Security,
    General,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::General => "general",
        }
    }
}

/// Individual rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique identifier for this rule, e.g. `AZR-000081`
    pub id: String,
    /// Readable name, e.g. `Azure.AppService.RemoteDebug`
    pub name: String,
    /// What the rule checks
    pub description: String,
    /// Where to read more about the rule
    pub help_uri: String,
    /// How to fix a failure
    pub recommendation: String,
    /// Severity of a failure
    pub severity: Severity,
    /// Security or general rule
    pub category: RuleCategory,
    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Resource type the rule applies to; template-level when absent
    #[serde(default)]
    pub resource_type: Option<String>,
    /// The property check to perform
    pub check: RuleCheck,
}

/// A property check relative to a resource (or the template root)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheck {
    /// Path of the property, e.g. `properties.siteConfig.remoteDebuggingEnabled`
    pub path: String,
    /// Condition the property value must satisfy
    pub condition: Condition,
    /// Value assumed when the property is absent
    #[serde(default)]
    pub default: Option<Value>,
}

/// Conditions a property value must satisfy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Value must equal the given value
    Equals(Value),
    /// Value must differ from the given value
    NotEquals(Value),
    /// Property must be present (`true`) or absent (`false`)
    Exists(bool),
    /// Value must be one of the given values
    OneOf(Vec<Value>),
    /// String value must match the regex
    Matches(String),
    /// Numeric value must be at least the given bound
    Min(f64),
}

impl AnalyzerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AnalyzerResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            AnalyzerError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            AnalyzerError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> AnalyzerResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| AnalyzerError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Get default configuration with built-in rules
    pub fn with_defaults() -> Self {
        Self { version: "1.0".to_string(), rules_dir: None, rules: default_rules() }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> AnalyzerResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(AnalyzerError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(AnalyzerError::config(format!("Duplicate rule ID '{}'", rule.id)));
            }

            let descriptive = [
                ("id", &rule.id),
                ("name", &rule.name),
                ("description", &rule.description),
                ("help_uri", &rule.help_uri),
                ("recommendation", &rule.recommendation),
            ];
            if let Some((field, _)) = descriptive.iter().find(|(_, value)| value.trim().is_empty())
            {
                return Err(AnalyzerError::config(format!(
                    "Rule '{}' has an empty '{}'",
                    rule.id, field
                )));
            }

            if let Condition::Matches(pattern) = &rule.check.condition {
                regex::Regex::new(pattern).map_err(|e| {
                    AnalyzerError::config(format!(
                        "Invalid regex pattern in rule '{}': {}",
                        rule.id, e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// All enabled rules
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().filter(|rule| rule.enabled)
    }

    /// Find a rule by id or name
    pub fn find_rule(&self, id_or_name: &str) -> Option<&RuleDefinition> {
        self.rules
            .iter()
            .find(|rule| rule.id == id_or_name || rule.name.eq_ignore_ascii_case(id_or_name))
    }

    /// Rule-content directory, defaulting to the running executable's directory
    pub fn rules_dir(&self) -> PathBuf {
        self.rules_dir.clone().unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Location of the repeated-rules baseline
    pub fn baseline_path(&self) -> PathBuf {
        self.rules_dir().join(BASELINE_DIR).join(BASELINE_FILE_NAME)
    }

    /// Convert to YAML for display
    pub fn to_yaml(&self) -> AnalyzerResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AnalyzerError::config(format!("Failed to serialize config: {e}")))
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_true() -> bool {
    true
}

/// Built-in rules covering common web and storage misconfigurations
fn default_rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition {
            id: "AZR-000081".to_string(),
            name: "Azure.AppService.RemoteDebug".to_string(),
            description: "Disable remote debugging on App Service apps".to_string(),
            help_uri: "https://azure.github.io/PSRule.Rules.Azure/en/rules/Azure.AppService.RemoteDebug/".to_string(),
            recommendation: "Set properties.siteConfig.remoteDebuggingEnabled to false".to_string(),
            severity: Severity::Error,
            category: RuleCategory::Security,
            enabled: true,
            resource_type: Some("Microsoft.Web/sites".to_string()),
            check: RuleCheck {
                path: "properties.siteConfig.remoteDebuggingEnabled".to_string(),
                condition: Condition::Equals(json!(false)),
                default: Some(json!(false)),
            },
        },
        RuleDefinition {
            id: "AZR-000075".to_string(),
            name: "Azure.AppService.UseHTTPS".to_string(),
            description: "App Service apps should only accept encrypted connections".to_string(),
            help_uri: "https://azure.github.io/PSRule.Rules.Azure/en/rules/Azure.AppService.UseHTTPS/".to_string(),
            recommendation: "Set properties.httpsOnly to true".to_string(),
            severity: Severity::Error,
            category: RuleCategory::Security,
            enabled: true,
            resource_type: Some("Microsoft.Web/sites".to_string()),
            check: RuleCheck {
                path: "properties.httpsOnly".to_string(),
                condition: Condition::Equals(json!(true)),
                default: Some(json!(false)),
            },
        },
        RuleDefinition {
            id: "AZR-000073".to_string(),
            name: "Azure.AppService.MinTLS".to_string(),
            description: "App Service apps should reject TLS versions older than 1.2".to_string(),
            help_uri: "https://azure.github.io/PSRule.Rules.Azure/en/rules/Azure.AppService.MinTLS/".to_string(),
            recommendation: "Set properties.siteConfig.minTlsVersion to 1.2".to_string(),
            severity: Severity::Error,
            category: RuleCategory::Security,
            enabled: true,
            resource_type: Some("Microsoft.Web/sites".to_string()),
            check: RuleCheck {
                path: "properties.siteConfig.minTlsVersion".to_string(),
                condition: Condition::OneOf(vec![json!("1.2"), json!("1.3")]),
                default: Some(json!("1.2")),
            },
        },
        RuleDefinition {
            id: "AZR-000199".to_string(),
            name: "Azure.Storage.SecureTransfer".to_string(),
            description: "Storage accounts should only accept encrypted connections".to_string(),
            help_uri: "https://azure.github.io/PSRule.Rules.Azure/en/rules/Azure.Storage.SecureTransfer/".to_string(),
            recommendation: "Set properties.supportsHttpsTrafficOnly to true".to_string(),
            severity: Severity::Error,
            category: RuleCategory::Security,
            enabled: true,
            resource_type: Some("Microsoft.Storage/storageAccounts".to_string()),
            check: RuleCheck {
                path: "properties.supportsHttpsTrafficOnly".to_string(),
                condition: Condition::Equals(json!(true)),
                default: Some(json!(true)),
            },
        },
        RuleDefinition {
            id: "AZR-000190".to_string(),
            name: "Azure.Storage.Name".to_string(),
            description: "Storage account names should meet naming requirements".to_string(),
            help_uri: "https://azure.github.io/PSRule.Rules.Azure/en/rules/Azure.Storage.Name/".to_string(),
            recommendation: "Use 3-24 lowercase letters and numbers for storage account names".to_string(),
            severity: Severity::Warning,
            category: RuleCategory::General,
            enabled: true,
            resource_type: Some("Microsoft.Storage/storageAccounts".to_string()),
            check: RuleCheck {
                path: "name".to_string(),
                condition: Condition::Matches("^[a-z0-9]{3,24}$".to_string()),
                default: None,
            },
        },
        RuleDefinition {
            id: "AZR-000222".to_string(),
            name: "Azure.Template.TemplateSchema".to_string(),
            description: "Templates should declare a deployment template schema".to_string(),
            help_uri: "https://azure.github.io/PSRule.Rules.Azure/en/rules/Azure.Template.TemplateSchema/".to_string(),
            recommendation: "Add a $schema property referencing a deployment template schema".to_string(),
            severity: Severity::Info,
            category: RuleCategory::General,
            enabled: true,
            resource_type: None,
            check: RuleCheck {
                path: "$schema".to_string(),
                condition: Condition::Exists(true),
                default: None,
            },
        },
    ]
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: AnalyzerConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self { config: AnalyzerConfig::default() }
    }

    /// Create a builder with no rules
    pub fn empty() -> Self {
        Self { config: AnalyzerConfig { rules: Vec::new(), ..AnalyzerConfig::default() } }
    }

    /// Set the rule-content directory
    pub fn rules_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.rules_dir = Some(dir.into());
        self
    }

    /// Add a rule
    pub fn add_rule(mut self, rule: RuleDefinition) -> Self {
        self.config.rules.push(rule);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> AnalyzerResult<AnalyzerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
