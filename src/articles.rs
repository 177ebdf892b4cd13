//! Article entries.
//!
//! One [`ArticleEntry`] per markdown file under the articles content root.
//! Loading reads the file, pulls its front matter, validates dates, and
//! converts the remaining markdown to HTML. The layout is filled in later by
//! the layout pass; everything else is final once loaded.
//!
//! ## Front Matter Fields
//!
//! | Key | Format | Used for |
//! |-----|--------|----------|
//! | `title` | string | feed item title, `<title>` |
//! | `date` | `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SSZ` | feed ordering, queries |
//! | `published_datetime` | `YYYY-MM-DDTHH:MM:SSZ` | feed fallback date |
//! | `modified_datetime` | `YYYY-MM-DDTHH:MM:SSZ` | record only |
//! | `draft` | `true`, `"true"` or `"1"` | excluded from routes, feed, queries |
//! | `summary` / `description` | string | feed item description |
//!
//! Any other key is carried through untouched and reaches the layout via
//! the `front_matter` binding.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use regex::Regex;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::data::DataMapping;
use crate::error::SourceError;
use crate::frontmatter;
use crate::markdown::MarkdownConverter;
use crate::naming;
use crate::query::parse_date;
use crate::scan::SourceFile;

/// Excerpt length used when an article has no summary of its own.
pub const DEFAULT_EXCERPT_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct ArticleEntry {
    pub source: PathBuf,
    /// Path relative to the articles content root (`blog/first.md`).
    pub rel: String,
    /// Directory relative to the content root (`blog`, or `""` at the root).
    pub directory: String,
    /// Base name without extension (`first`).
    pub name: String,
    pub route: String,
    pub body_html: String,
    pub front_matter: DataMapping,
    /// `date`, falling back to `published_datetime`.
    pub date: Option<NaiveDateTime>,
    pub draft: bool,
    /// Layout template identifier, set by the layout pass.
    pub layout: Option<String>,
}

impl ArticleEntry {
    pub fn load(file: &SourceFile, converter: &dyn MarkdownConverter) -> Result<Self, SourceError> {
        let source = fs::read_to_string(&file.path).map_err(|e| SourceError::io(&file.path, e))?;
        let front_matter = frontmatter::extract(&file.path, &source)?;
        let body_html = converter.to_html(&frontmatter::strip(&source));

        let date = match date_field(&file.path, &front_matter, "date", false)? {
            Some(d) => Some(d),
            None => date_field(&file.path, &front_matter, "published_datetime", true)?,
        };
        date_field(&file.path, &front_matter, "modified_datetime", true)?;

        Ok(Self {
            source: file.path.clone(),
            rel: file.rel.clone(),
            directory: naming::parent_dir(&file.rel).to_string(),
            name: naming::base_name(&file.rel).to_string(),
            route: naming::route_for(&file.rel),
            body_html,
            draft: is_draft(&front_matter),
            front_matter,
            date,
            layout: None,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.front_matter.get("title").and_then(Value::as_str)
    }

    /// Feed/listing summary: `summary`, then `description`, then an excerpt.
    pub fn summary(&self) -> String {
        ["summary", "description"]
            .iter()
            .filter_map(|k| self.front_matter.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| excerpt(&self.body_html, DEFAULT_EXCERPT_LENGTH))
    }

    /// Template-facing record, as returned by `get_articles`.
    pub fn record(&self, url_origin: Option<&str>) -> Value {
        let fm = |key: &str, default: Value| self.front_matter.get(key).cloned().unwrap_or(default);
        let link = match url_origin.filter(|o| !o.is_empty()) {
            Some(origin) => format!(
                "{}{}",
                origin.trim_end_matches('/'),
                naming::url_path(&self.route)
            ),
            None => String::new(),
        };
        json!({
            "file_name": self.name,
            "directory": self.directory,
            "path": self.route,
            "title": fm("title", json!("")),
            "description": fm("description", json!("")),
            "summary": fm("summary", json!("")),
            "keywords": fm("keywords", json!([])),
            "author": fm("author", json!("")),
            "category": fm("category", json!("")),
            "tags": fm("tags", json!([])),
            "date": fm("date", Value::Null),
            "published_datetime": fm("published_datetime", Value::Null),
            "modified_datetime": fm("modified_datetime", Value::Null),
            "draft": self.draft,
            "image": fm("image", json!("")),
            "image_alt": fm("image_alt", json!("")),
            "content": self.body_html,
            "extra": fm("extra", json!({})),
            "link": link,
        })
    }
}

/// Load every article source, in parallel, keeping the input order.
pub fn load_all(
    files: &[SourceFile],
    converter: &dyn MarkdownConverter,
) -> Result<Vec<ArticleEntry>, SourceError> {
    files
        .par_iter()
        .map(|f| ArticleEntry::load(f, converter))
        .collect()
}

/// Whether front matter marks a draft.
pub fn is_draft(front_matter: &DataMapping) -> bool {
    match front_matter.get("draft") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true" || s == "1",
        _ => false,
    }
}

fn date_field(
    path: &Path,
    front_matter: &DataMapping,
    key: &str,
    timestamp_only: bool,
) -> Result<Option<NaiveDateTime>, SourceError> {
    let raw = match front_matter.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::String(s)) => s,
        Some(_) => return Err(SourceError::new(path, format!("`{key}` must be a string"))),
    };
    let parsed = if timestamp_only {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ").ok()
    } else {
        parse_date(raw)
    };
    let expected = if timestamp_only {
        "YYYY-MM-DDTHH:MM:SSZ"
    } else {
        "YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ"
    };
    parsed
        .map(Some)
        .ok_or_else(|| SourceError::new(path, format!("invalid `{key}` {raw:?}, expected {expected}")))
}

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p>(.*?)</p>").expect("paragraph pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").expect("tag pattern"));

/// Plain-text excerpt of an HTML fragment.
///
/// Only paragraph contents are considered (the whole fragment when there are
/// none). Tags are removed and text longer than `length` characters is cut
/// at the last space before the limit, followed by `...`.
pub fn excerpt(html: &str, length: usize) -> String {
    let html = frontmatter::strip_html(html);
    let paragraphs: Vec<&str> = PARAGRAPH
        .captures_iter(&html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let joined = if paragraphs.is_empty() {
        html.clone()
    } else {
        paragraphs.join(" ")
    };
    let text = TAG.replace_all(&joined, "");

    if text.chars().count() <= length {
        return text.trim().to_string();
    }
    let cut = text
        .char_indices()
        .nth(length)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];
    let truncated = match head.rfind(' ') {
        Some(space) => &head[..space],
        None => head,
    };
    format!("{truncated}...").trim().to_string()
}
