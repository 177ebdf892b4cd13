//! Templating engine boundary.
//!
//! The build talks to templates only through [`TemplateEngine::render`]:
//! an identifier plus a [`DataMapping`] in, text out. [`JinjaEngine`] is the
//! MiniJinja implementation used by the binary.
//!
//! ## Template Identifiers
//!
//! A template's identifier is its path relative to the first search root
//! containing it (`pages/about.jinja`, `articles/blog/layout.jinja`). Files
//! outside every search root (a home template configured elsewhere) are
//! identified by their full path.
//!
//! ## Lookup
//!
//! Each search root is expanded to itself plus every subdirectory. A name
//! used in `{% include %}`, `{% import %}` or `{% extends %}` is tried against
//! each expanded directory in turn, so `{% include "footer.jinja" %}` finds
//! `views/partials/footer.jinja` from any template. Front matter blocks are
//! removed as sources are loaded.
//!
//! ## Functions
//!
//! | Function | Returns |
//! |----------|---------|
//! | `get_articles(filters)` | published article records, queried |
//! | `query_store(filters)` | items of `filters.collection` in the data store, queried |
//! | `excerpt(html, length=100)` | plain-text excerpt of an HTML fragment |
//! | `rfc822(date)` | `Fri, 01 Mar 2024 00:00:00 +0000` |
//! | `rel_to_abs(html, origin)` | HTML with root-relative `href`/`src` made absolute |
//! | `now()` | current UTC time, `YYYY-MM-DDTHH:MM:SSZ` |

use chrono::Utc;
use minijinja::value::{Kwargs, Value};
use minijinja::{AutoEscape, Environment, ErrorKind};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::warn;

use crate::articles::{self, DEFAULT_EXCERPT_LENGTH};
use crate::data::{DataError, DataMapping};
use crate::frontmatter;
use crate::naming;
use crate::query::{Catalog, parse_date};
use crate::scan;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template `{id}` failed to render: {message}")]
    Render { id: String, message: String },
}

/// Renders a template identifier with a set of bindings.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template_id: &str, context: &DataMapping) -> Result<String, TemplateError>;
}

/// Maps template files to the identifiers the engine knows them by.
#[derive(Debug, Clone)]
pub struct TemplateIds {
    roots: Vec<PathBuf>,
}

impl TemplateIds {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn id_for(&self, path: &Path) -> String {
        self.roots
            .iter()
            .find_map(|root| naming::relative_slash_path(root, path))
            .filter(|rel| !rel.is_empty())
            .unwrap_or_else(|| path.to_string_lossy().to_string())
    }
}

// =============================================================================
// MiniJinja engine
// =============================================================================

pub struct JinjaEngine {
    env: Environment<'static>,
}

impl JinjaEngine {
    /// Engine reading templates below `search_roots`, with the catalog
    /// functions bound to `catalog`.
    pub fn new(search_roots: &[PathBuf], catalog: Arc<Catalog>, url_origin: Option<String>) -> Self {
        let dirs: Vec<PathBuf> = search_roots.iter().flat_map(|r| scan::expand_dirs(r)).collect();

        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_loader(move |name: &str| load_template(&dirs, name));

        let articles_catalog = Arc::clone(&catalog);
        env.add_function(
            "get_articles",
            move |filters: Option<Value>, kwargs: Kwargs| -> Result<Value, minijinja::Error> {
                let filters = filter_argument(filters, &kwargs)?;
                let items = articles_catalog.get_articles(&filters).map_err(function_error)?;
                Ok(Value::from_serialize(&items))
            },
        );

        let store_catalog = catalog;
        env.add_function(
            "query_store",
            move |filters: Option<Value>, kwargs: Kwargs| -> Result<Value, minijinja::Error> {
                let filters = filter_argument(filters, &kwargs)?;
                let items = store_catalog.query_store(&filters).map_err(function_error)?;
                Ok(Value::from_serialize(&items))
            },
        );

        env.add_function(
            "excerpt",
            |html: String, length: Option<usize>, kwargs: Kwargs| -> Result<String, minijinja::Error> {
                let length = match kwargs.get::<Option<usize>>("length")? {
                    Some(n) => n,
                    None => length.unwrap_or(DEFAULT_EXCERPT_LENGTH),
                };
                kwargs.assert_all_used()?;
                Ok(articles::excerpt(&html, length))
            },
        );

        env.add_function("rfc822", |date: Option<String>| -> String {
            date.as_deref().and_then(rfc822).unwrap_or_else(|| {
                warn!(date = ?date, "rfc822 needs a YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ date");
                String::new()
            })
        });

        env.add_function("rel_to_abs", move |html: String, origin: Option<String>| -> String {
            match origin.or_else(|| url_origin.clone()) {
                Some(origin) => rel_to_abs(&html, &origin),
                None => html,
            }
        });

        env.add_function("now", now_utc);

        Self { env }
    }
}

impl TemplateEngine for JinjaEngine {
    fn render(&self, template_id: &str, context: &DataMapping) -> Result<String, TemplateError> {
        let render_error = |e: minijinja::Error| TemplateError::Render {
            id: template_id.to_string(),
            message: error_chain(&e),
        };
        let template = self.env.get_template(template_id).map_err(render_error)?;
        template.render(context).map_err(render_error)
    }
}

fn load_template(dirs: &[PathBuf], name: &str) -> Result<Option<String>, minijinja::Error> {
    let direct = Path::new(name);
    let candidates = std::iter::once(direct.to_path_buf())
        .filter(|p| p.is_absolute())
        .chain(dirs.iter().map(|d| d.join(name)));
    for candidate in candidates {
        if candidate.is_file() {
            let source = fs::read_to_string(&candidate).map_err(|e| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("cannot read {}", candidate.display()),
                )
                .with_source(e)
            })?;
            return Ok(Some(frontmatter::strip(&source)));
        }
    }
    Ok(None)
}

fn filter_argument(positional: Option<Value>, kwargs: &Kwargs) -> Result<serde_json::Value, minijinja::Error> {
    let named: Option<Value> = kwargs.get("filters")?;
    kwargs.assert_all_used()?;
    match positional.or(named) {
        Some(v) if !v.is_undefined() && !v.is_none() => serde_json::to_value(&v).map_err(|e| {
            minijinja::Error::new(ErrorKind::InvalidOperation, "filters are not serializable")
                .with_source(e)
        }),
        _ => Ok(serde_json::Value::Null),
    }
}

fn function_error(e: DataError) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string())
}

fn error_chain(e: &minijinja::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message.push_str(&format!(": {inner}"));
        source = inner.source();
    }
    message
}

// =============================================================================
// Helpers exposed as template functions
// =============================================================================

/// Format a date string as RFC 822, the date format of RSS.
pub fn rfc822(date: &str) -> Option<String> {
    parse_date(date).map(|dt| dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string())
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

static PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<pre[^>]*>.*?</pre>|<code[^>]*>.*?</code>").expect("protected span pattern")
});

static ROOT_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(href|src)=["'](/[^"']*)["']"#).expect("root-relative url pattern")
});

/// Prefix root-relative `href`/`src` values with `origin`.
///
/// Content of `<pre>` and `<code>` elements and protocol-relative URLs
/// (`//cdn…`) are left alone.
pub fn rel_to_abs(html: &str, origin: &str) -> String {
    if origin.is_empty() {
        return html.to_string();
    }
    let origin = origin.trim_end_matches('/');
    let rewrite = |text: &str| {
        ROOT_RELATIVE
            .replace_all(text, |caps: &Captures| {
                let url = &caps[2];
                if url.starts_with("//") {
                    caps[0].to_string()
                } else {
                    format!("{}=\"{origin}{url}\"", &caps[1])
                }
            })
            .into_owned()
    };

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for span in PROTECTED.find_iter(html) {
        out.push_str(&rewrite(&html[last..span.start()]));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&rewrite(&html[last..]));
    out
}
