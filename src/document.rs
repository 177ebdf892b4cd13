//! Document chrome.
//!
//! Templates render page bodies; this module wraps each body in a complete
//! HTML document. The `<head>` is described by the global `metadata` data
//! key, overridden field by field by the page's own front matter:
//!
//! ```json
//! { "metadata": { "title": "My Site", "lang": "en", "stylesheets": ["/x.css"] } }
//! ```
//!
//! Recognized fields: `title`, `lang`, `charset`, `description`, `keywords`,
//! `author`, `theme_color`, `og_image`, `og_image_alt`, `og_title`,
//! `og_description`, `og_url`, `og_type`, `og_site_name`, `og_locale`,
//! `canonical`, `google_font_link`, `preconnects`, `stylesheets`, `robots`,
//! `head_extra` (raw HTML), `body_id` and `body_class`. Empty values are
//! omitted from the output.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde_json::Value;

use crate::config::DocumentConfig;
use crate::data::DataMapping;

/// Head fields after merging global metadata and front matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadMeta {
    pub title: Option<String>,
    pub lang: String,
    pub charset: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub author: Option<String>,
    pub theme_color: Option<String>,
    /// `(property suffix, content)` pairs, e.g. `("image", "/og.png")`.
    pub open_graph: Vec<(&'static str, String)>,
    pub canonical: Option<String>,
    pub google_font_link: Option<String>,
    pub preconnects: Vec<String>,
    pub stylesheets: Vec<String>,
    pub robots: Option<String>,
    pub head_extra: Vec<String>,
    pub body_id: Option<String>,
    pub body_class: Option<String>,
}

const OPEN_GRAPH: &[(&str, &str)] = &[
    ("og_image", "image"),
    ("og_image_alt", "image:alt"),
    ("og_title", "title"),
    ("og_description", "description"),
    ("og_url", "url"),
    ("og_type", "type"),
    ("og_site_name", "site_name"),
    ("og_locale", "locale"),
];

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn field<'a>(
    front_matter: &'a DataMapping,
    metadata: Option<&'a DataMapping>,
    key: &str,
) -> Option<&'a Value> {
    front_matter
        .get(key)
        .or_else(|| metadata.and_then(|m| m.get(key)))
}

impl HeadMeta {
    /// Merge `front_matter` over the `metadata` mapping of the data store.
    pub fn resolve(global: &DataMapping, front_matter: &DataMapping) -> Self {
        let metadata = global.get("metadata").and_then(Value::as_object);
        let text = |key: &str| field(front_matter, metadata, key).and_then(scalar_text);
        let list = |key: &str| -> Vec<String> {
            match field(front_matter, metadata, key) {
                Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
                Some(other) => scalar_text(other).into_iter().collect(),
                None => Vec::new(),
            }
        };

        Self {
            title: text("title"),
            lang: text("lang").unwrap_or_else(|| "en".to_string()),
            charset: text("charset").unwrap_or_else(|| "UTF-8".to_string()),
            description: text("description"),
            keywords: list("keywords"),
            author: text("author"),
            theme_color: text("theme_color"),
            open_graph: OPEN_GRAPH
                .iter()
                .filter_map(|(key, property)| text(key).map(|v| (*property, v)))
                .collect(),
            canonical: text("canonical"),
            google_font_link: text("google_font_link"),
            preconnects: list("preconnects"),
            stylesheets: list("stylesheets"),
            robots: text("robots"),
            head_extra: list("head_extra"),
            body_id: text("body_id"),
            body_class: text("body_class"),
        }
    }
}

fn head(meta: &HeadMeta, config: &DocumentConfig) -> Markup {
    html! {
        head {
            meta charset=(meta.charset);
            meta name="viewport" content="width=device-width, initial-scale=1.0";
            @if let Some(title) = &meta.title {
                title { (title) }
            }
            @if let Some(description) = &meta.description {
                meta name="description" content=(description);
            }
            @if !meta.keywords.is_empty() {
                meta name="keywords" content=(meta.keywords.join(","));
            }
            @if let Some(author) = &meta.author {
                meta name="author" content=(author);
            }
            @if let Some(color) = &meta.theme_color {
                meta name="theme-color" content=(color);
            }
            @for (property, content) in &meta.open_graph {
                meta property={ "og:" (property) } content=(content);
            }
            @if let Some(canonical) = &meta.canonical {
                link rel="canonical" href=(canonical);
            }
            @if let Some(font) = &meta.google_font_link {
                link rel="preconnect" href="https://fonts.googleapis.com";
                link rel="preconnect" href="https://fonts.gstatic.com" crossorigin;
                link href=(font) rel="stylesheet";
            }
            @for href in &meta.preconnects {
                link rel="preconnect" href=(href);
            }
            @for href in &meta.stylesheets {
                link rel="stylesheet" href=(href);
            }
            @if let Some(robots) = &meta.robots {
                meta name="robots" content=(robots);
            }
            @for extra in &meta.head_extra {
                (PreEscaped(extra))
            }
            link rel="icon" type="image/x-icon" href=(config.favicon_link);
            link href=(config.styles_link) rel="stylesheet";
        }
    }
}

/// Wrap a rendered body in a full HTML document.
pub fn wrap(body: &str, meta: &HeadMeta, config: &DocumentConfig) -> String {
    html! {
        (DOCTYPE)
        html lang=(meta.lang) {
            (head(meta, config))
            body id=[meta.body_id.as_deref()] class=[meta.body_class.as_deref()] {
                "\n"
                (PreEscaped(body))
                "\n"
                script type="module" src=(config.script_link) {}
            }
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> DataMapping {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn front_matter_overrides_global_metadata() {
        let global = map(json!({"metadata": {"title": "Site", "author": "Ann", "lang": "fr"}}));
        let fm = map(json!({"title": "Post"}));
        let meta = HeadMeta::resolve(&global, &fm);
        assert_eq!(meta.title.as_deref(), Some("Post"));
        assert_eq!(meta.author.as_deref(), Some("Ann"));
        assert_eq!(meta.lang, "fr");
        assert_eq!(meta.charset, "UTF-8");
    }

    #[test]
    fn lists_accept_single_strings() {
        let meta = HeadMeta::resolve(
            &DataMapping::new(),
            &map(json!({"keywords": "rust", "stylesheets": ["/a.css", "/b.css"]})),
        );
        assert_eq!(meta.keywords, vec!["rust"]);
        assert_eq!(meta.stylesheets.len(), 2);
    }

    #[test]
    fn open_graph_fields_collected() {
        let meta = HeadMeta::resolve(
            &DataMapping::new(),
            &map(json!({"og_title": "T", "og_image_alt": "", "og_type": "article"})),
        );
        assert_eq!(meta.open_graph, vec![("title", "T".to_string()), ("type", "article".to_string())]);
    }

    #[test]
    fn wrap_builds_document() {
        let meta = HeadMeta::resolve(
            &DataMapping::new(),
            &map(json!({"title": "Hi", "description": "D", "body_class": "post"})),
        );
        let doc = wrap("<main>x</main>", &meta, &DocumentConfig::default());
        assert!(doc.starts_with("<!DOCTYPE html><html lang=\"en\"><head>"));
        assert!(doc.contains("<title>Hi</title>"));
        assert!(doc.contains("<meta name=\"description\" content=\"D\">"));
        assert!(doc.contains("<body class=\"post\">\n<main>x</main>\n"));
        assert!(doc.contains("href=\"/static/styles/main.css\""));
        assert!(doc.ends_with("<script type=\"module\" src=\"/static/scripts/main.js\"></script></body></html>"));
        assert!(!doc.contains("id="));
    }

    #[test]
    fn attribute_values_escaped() {
        let meta = HeadMeta::resolve(&DataMapping::new(), &map(json!({"description": "a \"b\""})));
        let doc = wrap("", &meta, &DocumentConfig::default());
        assert!(doc.contains("content=\"a &quot;b&quot;\""));
    }

    #[test]
    fn head_extra_is_raw() {
        let meta = HeadMeta::resolve(
            &DataMapping::new(),
            &map(json!({"head_extra": ["<meta name=\"x\" content=\"y\">"]})),
        );
        let doc = wrap("", &meta, &DocumentConfig::default());
        assert!(doc.contains("<meta name=\"x\" content=\"y\">"));
    }
}
