//! HTML site generation.
//!
//! Final stage of the build. Takes the planned routes and writes the
//! rendered site.
//!
//! ## Per-Route Rendering
//!
//! ```text
//! PageRoute ──► context (global + partials + bindings)
//!           ──► template engine
//!           ──► document chrome (optional)
//!           ──► strip leftover @frontmatter blocks
//!           ──► <staging>/<route>/index.html
//! ```
//!
//! Routes render in parallel; each one reads only shared immutable inputs
//! and owns its context snapshot.
//!
//! ## Atomic Publish
//!
//! ```text
//! site/
//! ├── .dist.staging/     # written during the build
//! └── dist/              # replaced only after every route succeeded
//! ```
//!
//! A failure removes the staging directory and leaves the previous output
//! untouched.

use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DocumentConfig;
use crate::context::ContextBase;
use crate::data::DataMapping;
use crate::document::{self, HeadMeta};
use crate::frontmatter;
use crate::template::{TemplateEngine, TemplateError};
use crate::types::PageRoute;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One file written to the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Path relative to the output root.
    pub output: PathBuf,
    /// SHA-256 of the written bytes.
    pub digest: String,
}

/// A feed document ready to be written.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    /// Path relative to the output root.
    pub output: PathBuf,
    pub xml: String,
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct Generated {
    /// One entry per route, in route order.
    pub pages: Vec<WrittenFile>,
    pub feed: Option<WrittenFile>,
}

/// Renders routes to HTML strings.
pub struct Renderer<'a> {
    pub engine: &'a dyn TemplateEngine,
    pub base: &'a ContextBase,
    /// Data store, read for the `metadata` key of the document head.
    pub global: &'a DataMapping,
    pub document: &'a DocumentConfig,
}

impl Renderer<'_> {
    pub fn render(&self, route: &PageRoute) -> Result<String, GenerateError> {
        let context = self.base.assemble(route);
        let body = self.engine.render(&route.template, &context)?;
        let html = if self.document.wrap {
            let meta = HeadMeta::resolve(self.global, &route.front_matter);
            document::wrap(&body, &meta, self.document)
        } else {
            body
        };
        Ok(frontmatter::strip_html(&html))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Staging directory used while building `output_dir`.
pub fn staging_dir(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let staging = format!(".{name}.staging");
    match output_dir.parent() {
        Some(parent) => parent.join(staging),
        None => PathBuf::from(staging),
    }
}

/// Render every route and the feed, then publish them to `output_dir`.
pub fn generate(
    routes: &[PageRoute],
    renderer: &Renderer,
    feed: Option<&FeedDocument>,
    output_dir: &Path,
) -> Result<Generated, GenerateError> {
    let staging = staging_dir(output_dir);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let generated = write_all(routes, renderer, feed, &staging)
        .and_then(|generated| publish(&staging, output_dir).map(|()| generated));

    if generated.is_err() && staging.exists() {
        if let Err(e) = fs::remove_dir_all(&staging) {
            warn!(path = %staging.display(), error = %e, "could not remove staging directory");
        }
    }
    generated
}

fn write_all(
    routes: &[PageRoute],
    renderer: &Renderer,
    feed: Option<&FeedDocument>,
    staging: &Path,
) -> Result<Generated, GenerateError> {
    let pages = routes
        .par_iter()
        .map(|route| {
            let html = renderer.render(route)?;
            let output = route.output_file();
            write_file(staging, &output, html.as_bytes())
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = pages.len(), "rendered routes");

    let feed = feed
        .map(|doc| write_file(staging, &doc.output, doc.xml.as_bytes()))
        .transpose()?;

    Ok(Generated { pages, feed })
}

fn write_file(root: &Path, rel: &Path, bytes: &[u8]) -> Result<WrittenFile, GenerateError> {
    let path = root.join(rel);
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)
    };
    write().map_err(|source| GenerateError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(WrittenFile {
        output: rel.to_path_buf(),
        digest: sha256_hex(bytes),
    })
}

/// Swap the staging directory into place.
fn publish(staging: &Path, output_dir: &Path) -> Result<(), GenerateError> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)?;
    }
    if let Some(parent) = output_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(staging, output_dir)?;
    Ok(())
}

/// Write `value` as pretty JSON to `path`.
pub fn write_manifest<T: Serialize>(value: &T, path: &Path) -> Result<(), GenerateError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json).map_err(|source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RouteKind;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    /// Renders `<template>|<article binding>` so tests can see what was passed.
    struct EchoEngine;

    impl TemplateEngine for EchoEngine {
        fn render(&self, template_id: &str, context: &DataMapping) -> Result<String, TemplateError> {
            if template_id == "broken" {
                return Err(TemplateError::Render {
                    id: template_id.to_string(),
                    message: "boom".into(),
                });
            }
            let article = context.get("article").and_then(Value::as_str).unwrap_or("");
            let footer = context.get("footer").and_then(Value::as_str).unwrap_or("");
            Ok(format!("{template_id}|{article}|{footer}"))
        }
    }

    fn route(route: &str, template: &str) -> PageRoute {
        let mut bindings = DataMapping::new();
        bindings.insert("article".into(), json!(format!("<p>{route}</p>")));
        PageRoute {
            route: route.into(),
            source: PathBuf::from(format!("{template}.src")),
            template: template.into(),
            kind: RouteKind::Page,
            bindings,
            front_matter: DataMapping::new(),
        }
    }

    fn unwrapped() -> DocumentConfig {
        DocumentConfig {
            wrap: false,
            ..Default::default()
        }
    }

    fn partials() -> DataMapping {
        serde_json::from_value(json!({"footer": "f"})).unwrap()
    }

    #[test]
    fn staging_dir_is_hidden_sibling() {
        assert_eq!(
            staging_dir(Path::new("/site/dist")),
            PathBuf::from("/site/.dist.staging")
        );
    }

    #[test]
    fn renders_routes_to_index_files() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let base = ContextBase::new(&DataMapping::new(), &partials());
        let doc = unwrapped();
        let renderer = Renderer {
            engine: &EchoEngine,
            base: &base,
            global: &DataMapping::new(),
            document: &doc,
        };
        let routes = vec![route("", "home"), route("blog/first", "layout")];

        let generated = generate(&routes, &renderer, None, &out).unwrap();

        assert_eq!(
            fs::read_to_string(out.join("index.html")).unwrap(),
            "home|<p></p>|f"
        );
        assert_eq!(
            fs::read_to_string(out.join("blog/first/index.html")).unwrap(),
            "layout|<p>blog/first</p>|f"
        );
        assert_eq!(generated.pages.len(), 2);
        assert_eq!(generated.pages[1].output, PathBuf::from("blog/first/index.html"));
        assert_eq!(
            generated.pages[1].digest,
            sha256_hex(b"layout|<p>blog/first</p>|f")
        );
        assert!(!staging_dir(&out).exists());
    }

    #[test]
    fn wraps_in_document_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let base = ContextBase::default();
        let doc = DocumentConfig::default();
        let global: DataMapping =
            serde_json::from_value(json!({"metadata": {"title": "Site"}})).unwrap();
        let renderer = Renderer {
            engine: &EchoEngine,
            base: &base,
            global: &global,
            document: &doc,
        };
        generate(&[route("about", "page")], &renderer, None, &out).unwrap();
        let html = fs::read_to_string(out.join("about/index.html")).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Site</title>"));
        assert!(html.contains("page|<p>about</p>|"));
    }

    #[test]
    fn writes_feed_beside_pages() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let base = ContextBase::default();
        let doc = unwrapped();
        let renderer = Renderer {
            engine: &EchoEngine,
            base: &base,
            global: &DataMapping::new(),
            document: &doc,
        };
        let feed = FeedDocument {
            output: PathBuf::from("feed.xml"),
            xml: "<rss/>".into(),
        };
        let generated = generate(&[], &renderer, Some(&feed), &out).unwrap();
        assert_eq!(fs::read_to_string(out.join("feed.xml")).unwrap(), "<rss/>");
        assert_eq!(generated.feed.unwrap().digest, sha256_hex(b"<rss/>"));
    }

    #[test]
    fn failure_keeps_previous_output() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("index.html"), "old").unwrap();

        let base = ContextBase::default();
        let doc = unwrapped();
        let renderer = Renderer {
            engine: &EchoEngine,
            base: &base,
            global: &DataMapping::new(),
            document: &doc,
        };
        let routes = vec![route("", "home"), route("bad", "broken")];

        let err = generate(&routes, &renderer, None, &out).unwrap_err();
        assert!(matches!(err, GenerateError::Template(_)));
        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "old");
        assert!(!staging_dir(&out).exists());
    }

    #[test]
    fn rebuild_replaces_stale_files() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        fs::create_dir_all(out.join("gone")).unwrap();
        fs::write(out.join("gone/index.html"), "stale").unwrap();

        let base = ContextBase::default();
        let doc = unwrapped();
        let renderer = Renderer {
            engine: &EchoEngine,
            base: &base,
            global: &DataMapping::new(),
            document: &doc,
        };
        generate(&[route("", "home")], &renderer, None, &out).unwrap();
        assert!(!out.join("gone").exists());
        assert!(out.join("index.html").exists());
    }

    #[test]
    fn leftover_front_matter_is_stripped() {
        struct Leaky;
        impl TemplateEngine for Leaky {
            fn render(&self, _: &str, _: &DataMapping) -> Result<String, TemplateError> {
                Ok("<p>@frontmatter {\"a\": 1} @endfrontmatter</p>body".into())
            }
        }
        let base = ContextBase::default();
        let doc = unwrapped();
        let renderer = Renderer {
            engine: &Leaky,
            base: &base,
            global: &DataMapping::new(),
            document: &doc,
        };
        assert_eq!(renderer.render(&route("x", "t")).unwrap(), "body");
    }

    #[test]
    fn manifest_written_as_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/manifest.json");
        write_manifest(&json!({"routes": 2}), &path).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back["routes"], json!(2));
    }
}
