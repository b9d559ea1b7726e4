//! Location resolution for rule findings
//!
//! Architectural Principle: Service Layer - Findings are reported against the authored document
//! - Rules report structural paths into the expanded template
//! - Unmapped templates resolve paths directly against the expanded document
//! - Compiled templates translate expanded lines through the compiler's source map

pub mod json_lines;
pub mod source_map;
pub mod source_mapped;

use crate::domain::evaluation::AnalyzerResult;
use crate::domain::template::TemplateContext;

pub use json_lines::JsonLineResolver;
pub use source_map::SourceMapIndex;
pub use source_mapped::SourceMappedResolver;

/// Turns a structural path in the expanded template into a 1-based line
pub trait LineNumberResolver: Send + Sync {
    /// Resolve a path, returning line 1 when no better line is known
    fn resolve_line_number(&self, path: &str) -> u32;
}

/// Build the resolver appropriate for a context.
///
/// Contexts without a source map resolve against the expanded document,
/// since it is also the authored one.
pub fn resolver_for<'a>(
    context: &'a TemplateContext,
) -> AnalyzerResult<Box<dyn LineNumberResolver + 'a>> {
    if context.is_source_mapped() {
        Ok(Box::new(SourceMappedResolver::new(context)?))
    } else {
        Ok(Box::new(JsonLineResolver::for_context(context)))
    }
}
