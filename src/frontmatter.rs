//! Front matter blocks.
//!
//! Markdown sources and templates may carry metadata as JSON wrapped in
//! marker lines:
//!
//! ```text
//! @frontmatter
//! { "title": "Hello", "date": "2024-03-01" }
//! @endfrontmatter
//! ```
//!
//! A file may hold several blocks; they merge in document order with later
//! keys winning. The blocks never reach the output: they are removed from
//! markdown before conversion, from templates when the engine loads them, and
//! once more from rendered HTML, where the converter may have wrapped a block
//! in `<p>` tags.

use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::SourceError;

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)@frontmatter\s*(.*?)\s*@endfrontmatter").expect("front matter pattern")
});

static WRAPPED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<p>@frontmatter\s*.*?\s*@endfrontmatter</p>").expect("wrapped front matter pattern")
});

/// Parse every front matter block in `content` and merge them.
///
/// Returns an empty map when there are no blocks. `path` is only used to
/// name the file in errors.
pub fn extract(path: &Path, content: &str) -> Result<Map<String, Value>, SourceError> {
    let mut merged = Map::new();
    for caps in BLOCK.captures_iter(content) {
        let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let value: Value = serde_json::from_str(body)
            .map_err(|e| SourceError::new(path, format!("invalid front matter: {e}")))?;
        match value {
            Value::Object(map) => merged.extend(map),
            _ => {
                return Err(SourceError::new(
                    path,
                    "front matter must be a JSON object",
                ));
            }
        }
    }
    Ok(merged)
}

/// Remove every front matter block from a source text.
pub fn strip(content: &str) -> String {
    if !content.contains("@frontmatter") {
        return content.to_string();
    }
    BLOCK.replace_all(content, "").into_owned()
}

/// Remove front matter from rendered HTML, including `<p>`-wrapped blocks.
pub fn strip_html(html: &str) -> String {
    if !html.contains("@frontmatter") {
        return html.to_string();
    }
    let unwrapped = WRAPPED_BLOCK.replace_all(html, "");
    strip(&unwrapped)
}
