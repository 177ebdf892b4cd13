//! Centralized path naming rules.
//!
//! Every stage names things by the source file's path relative to its root,
//! always with `/` separators regardless of platform:
//!
//! - **Routes**: relative path with the extension stripped
//!   (`blog/updates/new-post.md` → `blog/updates/new-post`)
//! - **Partial keys**: the same segments joined with `.`
//!   (`collections/quotes/my_quote.md` → `collections.quotes.my_quote`)
//! - **Output files**: `<route>/index.html`, or `index.html` for the root route
//!
//! Keeping this in one module means the classification pass, the planner and
//! the writer can never disagree about what a file is called.

use std::path::{Component, Path, PathBuf};

/// Extensions recognized as Jinja templates.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["jinja", "j2", "jinja2"];

/// Extensions recognized as markdown sources.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md"];

/// Extensions recognized as structured data files.
pub const DATA_EXTENSIONS: &[&str] = &["json", "toml"];

/// File stem that marks a layout template in the articles views tree.
pub const LAYOUT_STEM: &str = "layout";

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| allowed.contains(&ext.as_str()))
}

pub fn is_template(path: &Path) -> bool {
    has_extension(path, TEMPLATE_EXTENSIONS)
}

pub fn is_markdown(path: &Path) -> bool {
    has_extension(path, MARKDOWN_EXTENSIONS)
}

pub fn is_data(path: &Path) -> bool {
    has_extension(path, DATA_EXTENSIONS)
}

/// A template named `layout.<ext>`.
pub fn is_layout(path: &Path) -> bool {
    is_template(path) && path.file_stem().is_some_and(|s| s == LAYOUT_STEM)
}

/// Dotfiles and dot-directories are never part of a site.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Path of `path` relative to `root`, joined with `/`.
///
/// Returns `None` when `path` is not below `root`.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    Some(segments.join("/"))
}

/// Drop the final extension from a slash path: `a/b.md` → `a/b`.
pub fn strip_extension(rel: &str) -> &str {
    let name_start = rel.rfind('/').map(|i| i + 1).unwrap_or(0);
    match rel[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &rel[..name_start + dot],
        _ => rel,
    }
}

/// Route for a source file given its root-relative slash path.
pub fn route_for(rel: &str) -> String {
    strip_extension(rel).to_string()
}

/// Dot-notation namespace key for a source file's root-relative slash path.
///
/// ```text
/// footer.md                       → footer
/// collections/quotes/my_quote.md  → collections.quotes.my_quote
/// ```
pub fn dot_key(rel: &str) -> String {
    strip_extension(rel).replace('/', ".")
}

/// Directory part of a slash path (`""` for files at the root).
pub fn parent_dir(rel: &str) -> &str {
    rel.rfind('/').map(|i| &rel[..i]).unwrap_or("")
}

/// Final segment of a slash path, extension stripped.
pub fn base_name(rel: &str) -> &str {
    let stem = strip_extension(rel);
    stem.rfind('/').map(|i| &stem[i + 1..]).unwrap_or(stem)
}

/// Join two route fragments, ignoring empty ones.
pub fn join_route(base: &str, tail: &str) -> String {
    match (base.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{tail}"),
    }
}

/// Output file for a route, relative to the output root.
pub fn output_file(route: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in route.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push("index.html");
    path
}

/// Public URL path for a route, with leading and trailing slashes.
pub fn url_path(route: &str) -> String {
    if route.is_empty() {
        "/".to_string()
    } else {
        format!("/{route}/")
    }
}
