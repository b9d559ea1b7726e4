//! Exact-match lookup over a compiler source map

use crate::domain::evaluation::{AnalyzerError, AnalyzerResult};
use crate::domain::template::{LineMapping, SourceMap, TemplateContext};

/// Read-only view over the entrypoint file's line mappings.
///
/// Only the entrypoint file is consulted; mappings into other compiled
/// files or modules are ignored.
#[derive(Debug, Clone, Copy)]
pub struct SourceMapIndex<'a> {
    entrypoint: &'a str,
    mappings: &'a [LineMapping],
}

impl<'a> SourceMapIndex<'a> {
    /// Index the entrypoint file of a source map
    pub fn new(source_map: &'a SourceMap) -> AnalyzerResult<Self> {
        let file = source_map.file(&source_map.entrypoint).ok_or_else(|| {
            AnalyzerError::invalid_argument(format!(
                "source map has no entry for entrypoint '{}'",
                source_map.entrypoint
            ))
        })?;

        Ok(Self { entrypoint: &source_map.entrypoint, mappings: &file.mappings })
    }

    /// Index the source map carried by a template context
    pub fn from_context(context: &'a TemplateContext) -> AnalyzerResult<Self> {
        let source_map = context.source_map.as_ref().ok_or_else(|| {
            AnalyzerError::invalid_argument(format!(
                "template context '{}' has no source map",
                context.template_identifier
            ))
        })?;
        Self::new(source_map)
    }

    /// 0-based source line for a 0-based expanded line.
    ///
    /// The first mapping in emission order wins when several share a target line.
    pub fn lookup(&self, target_line: u32) -> Option<u32> {
        self.mappings
            .iter()
            .find(|mapping| mapping.target_line == target_line)
            .map(|mapping| mapping.source_line)
    }

    /// Path of the entrypoint file
    pub fn entrypoint(&self) -> &str {
        self.entrypoint
    }
}
