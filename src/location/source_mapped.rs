//! Line resolution from compiled templates back to their authored source

use crate::domain::evaluation::{AnalyzerResult, DEFAULT_LINE_NUMBER};
use crate::domain::template::TemplateContext;
use crate::location::json_lines::JsonLineResolver;
use crate::location::source_map::SourceMapIndex;
use crate::location::LineNumberResolver;

/// Maps paths in an expanded template to lines in the authored template.
///
/// The path is first resolved to a line of the expanded document, then
/// translated through the entrypoint file's source map. Unmapped lines
/// resolve to line 1.
#[derive(Debug, Clone)]
pub struct SourceMappedResolver<'a> {
    expanded_lines: JsonLineResolver,
    source_map: SourceMapIndex<'a>,
}

impl<'a> SourceMappedResolver<'a> {
    /// Create a resolver for a context that carries a source map
    pub fn new(context: &'a TemplateContext) -> AnalyzerResult<Self> {
        let source_map = SourceMapIndex::from_context(context)?;
        let expanded_lines = JsonLineResolver::for_context(context);
        Ok(Self { expanded_lines, source_map })
    }
}

impl LineNumberResolver for SourceMappedResolver<'_> {
    fn resolve_line_number(&self, path: &str) -> u32 {
        let expanded_line = self.expanded_lines.resolve_line_number(path);

        // Source map lines are 0-based
        let target_line = expanded_line.saturating_sub(1);

        match self.source_map.lookup(target_line).and_then(|line| line.checked_add(1)) {
            Some(source_line) => source_line,
            None => {
                tracing::debug!(
                    "No source mapping for expanded line {} of '{}' in {}",
                    expanded_line,
                    path,
                    self.source_map.entrypoint()
                );
                DEFAULT_LINE_NUMBER
            }
        }
    }
}
