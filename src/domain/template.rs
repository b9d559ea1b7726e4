//! Template contexts and compiler source maps
//!
//! Architecture: Value Objects - Built once per document by the template compiler
//! - A context carries both the authored and the expanded document
//! - Source maps link expanded-document lines back to authored lines
//! - Nothing here is mutated after it is handed to the analyzer

use crate::domain::evaluation::{AnalyzerError, AnalyzerResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Everything known about one template being analyzed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext {
    /// File path or logical name of the template
    #[serde(default)]
    pub template_identifier: String,
    /// The document as authored, when available
    #[serde(default)]
    pub original_template: Option<Value>,
    /// The compiled document rules execute against
    #[serde(default)]
    pub expanded_template: Value,
    /// Text the expanded template was parsed from; lines are read from it when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_text: Option<String>,
    /// Present only when the authored document needed compilation
    #[serde(default)]
    pub source_map: Option<SourceMap>,
    /// Expanded resource path to authored declaration path
    #[serde(default)]
    pub resource_mappings: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a validated context for an expanded template
    pub fn new(
        template_identifier: impl Into<String>,
        expanded_template: Value,
    ) -> AnalyzerResult<Self> {
        let context = Self {
            template_identifier: template_identifier.into(),
            expanded_template,
            ..Default::default()
        };
        context.validate()?;
        Ok(context)
    }

    /// Attach the authored document
    pub fn with_original_template(mut self, original: Value) -> Self {
        self.original_template = Some(original);
        self
    }

    /// Attach the text the expanded template was parsed from
    pub fn with_expanded_text(mut self, text: impl Into<String>) -> Self {
        self.expanded_text = Some(text.into());
        self
    }

    /// Attach the compiler's source map
    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// Attach resource declaration mappings
    pub fn with_resource_mappings(mut self, mappings: HashMap<String, String>) -> Self {
        self.resource_mappings = mappings;
        self
    }

    /// Check the fields every analysis requires
    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.template_identifier.trim().is_empty() {
            return Err(AnalyzerError::invalid_argument(
                "template context is missing a template identifier",
            ));
        }

        let expanded_is_empty = match &self.expanded_template {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(text) => text.is_empty(),
            _ => false,
        };
        if expanded_is_empty {
            return Err(AnalyzerError::invalid_argument(format!(
                "template context '{}' has no expanded template",
                self.template_identifier
            )));
        }

        Ok(())
    }

    /// Whether locations must be translated through a source map
    pub fn is_source_mapped(&self) -> bool {
        self.source_map.is_some()
    }
}

/// Compiler-emitted table from expanded lines to authored lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// File path of the root source file among the compiled inputs
    #[serde(alias = "Entrypoint")]
    pub entrypoint: String,
    /// One entry per compiled source file
    #[serde(default, alias = "Entries")]
    pub entries: Vec<FileSourceMap>,
}

impl SourceMap {
    /// Create a source map for an entrypoint file
    pub fn new(entrypoint: impl Into<String>) -> Self {
        Self { entrypoint: entrypoint.into(), entries: Vec::new() }
    }

    /// Add the mappings of one source file
    pub fn with_file(mut self, file: FileSourceMap) -> Self {
        self.entries.push(file);
        self
    }

    /// Parse a source map from the compiler's JSON output
    pub fn from_json(content: &str) -> AnalyzerResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| AnalyzerError::invalid_argument(format!("Failed to parse source map: {e}")))
    }

    /// Mappings for a given source file
    pub fn file(&self, file_path: &str) -> Option<&FileSourceMap> {
        self.entries.iter().find(|entry| entry.file_path == file_path)
    }
}

/// Line mappings for a single source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSourceMap {
    /// Path of the source file
    #[serde(alias = "FilePath")]
    pub file_path: String,
    /// Mappings in compiler emission order
    #[serde(default, alias = "sourceMap", alias = "SourceMap", alias = "Mappings")]
    pub mappings: Vec<LineMapping>,
}

impl FileSourceMap {
    /// Create a file entry from `(target_line, source_line)` pairs
    pub fn new(file_path: impl Into<String>, mappings: Vec<LineMapping>) -> Self {
        Self { file_path: file_path.into(), mappings }
    }
}

/// A single expanded-line to source-line pair, both 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMapping {
    #[serde(alias = "TargetLine")]
    pub target_line: u32,
    #[serde(alias = "SourceLine")]
    pub source_line: u32,
}

impl LineMapping {
    pub fn new(target_line: u32, source_line: u32) -> Self {
        Self { target_line, source_line }
    }
}
