//! Domain layer for Template Analyzer
//!
//! Architecture: Domain Model - Pure types for template analysis
//! - Template contexts and source maps are produced by the template compiler and never mutated
//! - Evaluations are produced fresh for every analysis and owned by the caller
//! - Independent of file systems, rule content, and report formats

pub mod evaluation;
pub mod template;

// Re-export main domain types for convenience
pub use evaluation::*;
pub use template::*;
