//! Structural path to line resolution over expanded JSON templates
//!
//! Architectural Principle: Service Layer - Lines come from the expanded document as written
//! - Each member key or array element is assigned the line it starts on in the source text
//! - Contexts built in memory fall back to the two-space pretty-printed layout
//! - Paths use `resources[0].properties.name` syntax, match keys case-insensitively and
//!   resolve to their nearest existing ancestor when they don't exist

use crate::domain::evaluation::DEFAULT_LINE_NUMBER;
use crate::domain::template::TemplateContext;
use crate::location::LineNumberResolver;
use serde_json::Value;
use std::collections::HashMap;

/// Resolves structural paths to 1-based lines in an expanded template
#[derive(Debug, Clone)]
pub struct JsonLineResolver {
    /// Canonical lowercase path to 1-based line
    lines: HashMap<String, u32>,
}

/// One step of a structural path
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Nesting deeper than this is rejected, matching serde_json's parser limit
const MAX_DEPTH: usize = 128;

impl JsonLineResolver {
    /// Index every node of an expanded template as laid out by the pretty printer
    pub fn new(template: &Value) -> Self {
        let mut lines = HashMap::new();
        lines.insert(String::new(), DEFAULT_LINE_NUMBER);
        index_value(template, "", DEFAULT_LINE_NUMBER, &mut lines);
        Self { lines }
    }

    /// Index every node of a JSON document at the line it starts on in `text`.
    ///
    /// Returns `None` when `text` is not a single well-formed JSON value.
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut scanner = TextScanner { text, bytes: text.as_bytes(), pos: 0, line: 1 };

        let mut lines = HashMap::new();
        lines.insert(String::new(), DEFAULT_LINE_NUMBER);
        scanner.scan_value("", 0, &mut lines)?;

        scanner.skip_whitespace();
        (scanner.pos == scanner.bytes.len()).then_some(Self { lines })
    }

    /// Resolver for a context: its source text when known, else the pretty layout
    pub fn for_context(context: &TemplateContext) -> Self {
        let from_text = context.expanded_text.as_deref().and_then(|text| {
            let resolver = Self::from_text(text);
            if resolver.is_none() {
                tracing::warn!(
                    "Expanded text of '{}' could not be scanned, using pretty-printed layout",
                    context.template_identifier
                );
            }
            resolver
        });

        from_text.unwrap_or_else(|| Self::new(&context.expanded_template))
    }

    /// Line of an exact path, without ancestor fallback
    pub fn exact_line(&self, path: &str) -> Option<u32> {
        let segments = parse_path(path)?;
        self.lines.get(&render_path(&segments)).copied()
    }

    /// Number of indexed nodes, including the root
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineNumberResolver for JsonLineResolver {
    fn resolve_line_number(&self, path: &str) -> u32 {
        let Some(mut segments) = parse_path(path) else {
            tracing::debug!("Unparseable template path '{}'", path);
            return DEFAULT_LINE_NUMBER;
        };

        loop {
            if let Some(line) = self.lines.get(&render_path(&segments)) {
                return *line;
            }
            if segments.pop().is_none() {
                return DEFAULT_LINE_NUMBER;
            }
        }
    }
}

/// Record lines for `value` (starting at `line`) and return the last line it occupies
fn index_value(value: &Value, path: &str, line: u32, lines: &mut HashMap<String, u32>) -> u32 {
    match value {
        Value::Object(map) if !map.is_empty() => {
            let mut current = line;
            for (key, child) in map {
                let child_path = join_key(path, key);
                let child_line = current + 1;
                lines.insert(child_path.clone(), child_line);
                current = index_value(child, &child_path, child_line, lines);
            }
            current + 1
        }
        Value::Array(items) if !items.is_empty() => {
            let mut current = line;
            for (index, child) in items.iter().enumerate() {
                let child_path = format!("{path}[{index}]");
                let child_line = current + 1;
                lines.insert(child_path.clone(), child_line);
                current = index_value(child, &child_path, child_line, lines);
            }
            current + 1
        }
        _ => line,
    }
}

/// Position-tracking walk over JSON text
struct TextScanner<'t> {
    text: &'t str,
    bytes: &'t [u8],
    pos: usize,
    line: u32,
}

impl TextScanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b'\n' => self.line += 1,
                b' ' | b'\t' | b'\r' => {}
                _ => break,
            }
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        self.skip_whitespace();
        (self.peek()? == byte).then(|| self.pos += 1)
    }

    fn scan_value(
        &mut self,
        path: &str,
        depth: usize,
        lines: &mut HashMap<String, u32>,
    ) -> Option<()> {
        if depth > MAX_DEPTH {
            return None;
        }

        self.skip_whitespace();
        match self.peek()? {
            b'{' => self.scan_object(path, depth, lines),
            b'[' => self.scan_array(path, depth, lines),
            b'"' => self.scan_string().map(|_| ()),
            _ => self.scan_scalar(),
        }
    }

    fn scan_object(
        &mut self,
        path: &str,
        depth: usize,
        lines: &mut HashMap<String, u32>,
    ) -> Option<()> {
        self.pos += 1;
        self.skip_whitespace();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Some(());
        }

        loop {
            self.skip_whitespace();
            let line = self.line;
            let key = self.scan_string()?;
            let child_path = join_key(path, &key);
            lines.insert(child_path.clone(), line);

            self.expect(b':')?;
            self.scan_value(&child_path, depth + 1, lines)?;

            self.skip_whitespace();
            match self.peek()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Some(());
                }
                _ => return None,
            }
        }
    }

    fn scan_array(
        &mut self,
        path: &str,
        depth: usize,
        lines: &mut HashMap<String, u32>,
    ) -> Option<()> {
        self.pos += 1;
        self.skip_whitespace();
        if self.peek()? == b']' {
            self.pos += 1;
            return Some(());
        }

        let mut index = 0;
        loop {
            self.skip_whitespace();
            let child_path = format!("{path}[{index}]");
            lines.insert(child_path.clone(), self.line);
            self.scan_value(&child_path, depth + 1, lines)?;

            self.skip_whitespace();
            match self.peek()? {
                b',' => self.pos += 1,
                b']' => {
                    self.pos += 1;
                    return Some(());
                }
                _ => return None,
            }
            index += 1;
        }
    }

    /// Consume a string literal and return its decoded value
    fn scan_string(&mut self) -> Option<String> {
        let start = self.pos;
        if self.peek()? != b'"' {
            return None;
        }
        self.pos += 1;

        loop {
            match self.peek()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }

        serde_json::from_str(self.text.get(start..self.pos)?).ok()
    }

    /// Consume a number or literal
    fn scan_scalar(&mut self) -> Option<()> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b',' | b'}' | b']') || byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        (self.pos > start).then_some(())
    }
}

fn join_key(path: &str, key: &str) -> String {
    let key = key.to_lowercase();
    if path.is_empty() { key } else { format!("{path}.{key}") }
}

/// Split `a.b[0][1].c` into segments; `None` for malformed indices
fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let path = path.trim();
    let path = if path == "$" { "" } else { path.strip_prefix("$.").unwrap_or(path) };

    for part in path.split('.').filter(|part| !part.is_empty()) {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_lowercase()));
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']')?;
            let index = stripped[..end].trim().parse().ok()?;
            segments.push(PathSegment::Index(index));
            rest = &stripped[end + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }

    Some(segments)
}

fn render_path(segments: &[PathSegment]) -> String {
    let mut rendered = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(key) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(key);
            }
            PathSegment::Index(index) => rendered.push_str(&format!("[{index}]")),
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Value {
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

    /// 1-based line of the first pretty-printed line containing `needle` after `skip` matches
    fn pretty_line(value: &Value, needle: &str, skip: usize) -> u32 {
        let text = serde_json::to_string_pretty(value).unwrap();
        let index = text
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains(needle))
            .nth(skip)
            .map(|(index, _)| index)
            .unwrap();
        index as u32 + 1
    }

    #[test]
    fn test_lines_follow_pretty_layout() {
        let resolver = JsonLineResolver::new(&template());

        assert_eq!(resolver.resolve_line_number("contentVersion"), 2);
        assert_eq!(resolver.resolve_line_number("parameters"), 3);
        assert_eq!(resolver.resolve_line_number("resources"), 4);
        assert_eq!(resolver.resolve_line_number("resources[0]"), 5);
        assert_eq!(resolver.resolve_line_number("resources[0].properties.httpsOnly"), 9);
        assert_eq!(resolver.resolve_line_number("resources[1].properties.httpsOnly"), 15);
        assert_eq!(resolver.resolve_line_number("resources[1].type"), 17);
    }

    #[test]
    fn test_lines_match_serde_pretty_printer() {
        let template = template();
        let resolver = JsonLineResolver::new(&template);

        assert_eq!(
            resolver.resolve_line_number("resources[0].properties.httpsOnly"),
            pretty_line(&template, "\"httpsOnly\"", 0)
        );
        assert_eq!(
            resolver.resolve_line_number("resources[1].properties.httpsOnly"),
            pretty_line(&template, "\"httpsOnly\"", 1)
        );
        assert_eq!(
            resolver.resolve_line_number("resources[1].type"),
            pretty_line(&template, "\"type\"", 1)
        );
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let resolver = JsonLineResolver::new(&template());
        assert_eq!(resolver.resolve_line_number("RESOURCES[0].Properties.HTTPSONLY"), 9);
    }

    #[test]
    fn test_missing_path_falls_back_to_ancestor() {
        let resolver = JsonLineResolver::new(&template());

        assert_eq!(resolver.resolve_line_number("resources[0].properties.siteConfig"), 8);
        assert_eq!(resolver.resolve_line_number("resources[7]"), 4);
        assert_eq!(resolver.exact_line("resources[0].properties.siteConfig"), None);
    }

    #[test]
    fn test_root_and_unknown_paths_resolve_to_default() {
        let resolver = JsonLineResolver::new(&template());

        assert_eq!(resolver.resolve_line_number(""), DEFAULT_LINE_NUMBER);
        assert_eq!(resolver.resolve_line_number("outputs.id"), DEFAULT_LINE_NUMBER);
        assert_eq!(resolver.resolve_line_number("resources[x]"), DEFAULT_LINE_NUMBER);
    }

    #[test]
    fn test_parse_path_variants() {
        assert_eq!(
            parse_path("$.resources[0][1].name"),
            Some(vec![
                PathSegment::Key("resources".to_string()),
                PathSegment::Index(0),
                PathSegment::Index(1),
                PathSegment::Key("name".to_string()),
            ])
        );
        assert_eq!(parse_path("$schema"), Some(vec![PathSegment::Key("$schema".to_string())]));
        assert_eq!(parse_path("$"), Some(Vec::new()));
        assert_eq!(parse_path("a[1]b"), None);
        assert_eq!(parse_path("a[1"), None);
    }

    #[test]
    fn test_text_lines_follow_compact_layout() {
        let text = "{\n \"resources\": [\n { \"type\": \"Microsoft.Web/sites\", \"name\": \"s\",\n \"properties\": { \"httpsOnly\": false } }\n ]\n}";
        let resolver = JsonLineResolver::from_text(text).unwrap();

        assert_eq!(resolver.resolve_line_number("resources"), 2);
        assert_eq!(resolver.resolve_line_number("resources[0]"), 3);
        assert_eq!(resolver.resolve_line_number("resources[0].name"), 3);
        assert_eq!(resolver.resolve_line_number("resources[0].properties"), 4);
        assert_eq!(resolver.resolve_line_number("resources[0].properties.httpsOnly"), 4);
        assert_eq!(resolver.resolve_line_number("resources[0].properties.missing"), 4);
    }

    #[test]
    fn test_text_lines_with_escapes_and_blank_lines() {
        let text = "{ \"a\\\"b\": {},\n  \"C\": [\n 1,\n\n 2 ], \"d\": \"x,}]\" }";
        let resolver = JsonLineResolver::from_text(text).unwrap();

        assert_eq!(resolver.exact_line("a\"b"), Some(1));
        assert_eq!(resolver.resolve_line_number("c"), 2);
        assert_eq!(resolver.resolve_line_number("c[0]"), 3);
        assert_eq!(resolver.resolve_line_number("c[1]"), 5);
        assert_eq!(resolver.resolve_line_number("d"), 5);
    }

    #[test]
    fn test_text_matches_pretty_layout_for_pretty_text() {
        let template = template();
        let text = serde_json::to_string_pretty(&template).unwrap();

        let from_text = JsonLineResolver::from_text(&text).unwrap();
        let from_value = JsonLineResolver::new(&template);

        assert_eq!(from_text.lines, from_value.lines);
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        assert!(JsonLineResolver::from_text("{ \"a\": }").is_none());
        assert!(JsonLineResolver::from_text("{ \"a\": 1 } trailing").is_none());
        assert!(JsonLineResolver::from_text("[1, 2").is_none());
        assert!(JsonLineResolver::from_text(&"[".repeat(MAX_DEPTH + 2)).is_none());
    }

    #[test]
    fn test_context_prefers_source_text() {
        let text = "{ \"resources\": [ { \"name\": \"a\" } ] }";
        let template: Value = serde_json::from_str(text).unwrap();
        let context = TemplateContext::new("main.json", template.clone())
            .unwrap()
            .with_expanded_text(text);

        let resolver = JsonLineResolver::for_context(&context);
        assert_eq!(resolver.resolve_line_number("resources[0].name"), 1);

        let fallback = JsonLineResolver::for_context(&context.clone().with_expanded_text("{ broken"));
        assert_eq!(fallback.resolve_line_number("resources[0].name"), 4);

        let in_memory = JsonLineResolver::for_context(&TemplateContext::new("main.json", template).unwrap());
        assert_eq!(in_memory.resolve_line_number("resources[0].name"), 4);
    }
}
