//! Source discovery and classification.
//!
//! Stage 1 of the build. Walks every configured source root once and tags
//! each file it finds with a [`SourceKind`]. Later stages only ever ask the
//! resulting [`SourceTree`] for files of a given kind; nothing downstream
//! re-derives a file's role from the shape of its path.
//!
//! ## Roots and Kinds
//!
//! | Root | Accepted files | Kind |
//! |------|----------------|------|
//! | `pages_root` | `*.jinja`, `*.j2`, `*.jinja2` | [`SourceKind::PageTemplate`] |
//! | `articles_content_root` | `*.md` | [`SourceKind::ArticleSource`] |
//! | `articles_views_root` | `layout.<template ext>` | [`SourceKind::LayoutTemplate`] |
//! | `partials_root` | `*.md` | [`SourceKind::PartialSource`] |
//! | `data_root` | `*.json`, `*.toml` | [`SourceKind::DataSource`] |
//!
//! Hidden entries (names starting with `.`) are skipped at every depth. A
//! root that does not exist contributes no files; it is not an error.
//!
//! The roots are independent subtrees, so they are walked in parallel. Each
//! walk returns its own sorted list and the lists are concatenated afterwards.

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::SourceRoots;
use crate::error::SourceError;
use crate::naming;

/// The role a discovered file plays in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    PageTemplate,
    ArticleSource,
    LayoutTemplate,
    PartialSource,
    DataSource,
}

impl SourceKind {
    /// Whether a file found under this kind's root belongs to it.
    fn accepts(self, path: &Path) -> bool {
        match self {
            SourceKind::PageTemplate => naming::is_template(path),
            SourceKind::ArticleSource | SourceKind::PartialSource => naming::is_markdown(path),
            SourceKind::LayoutTemplate => naming::is_layout(path),
            SourceKind::DataSource => naming::is_data(path),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::PageTemplate => "page",
            SourceKind::ArticleSource => "article",
            SourceKind::LayoutTemplate => "layout",
            SourceKind::PartialSource => "partial",
            SourceKind::DataSource => "data",
        }
    }
}

/// One classified source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub kind: SourceKind,
    /// Full path (project root joined).
    pub path: PathBuf,
    /// Path relative to the root it was found under, `/`-separated.
    pub rel: String,
}

/// Every classified source file of a project.
#[derive(Debug, Default, Clone)]
pub struct SourceTree {
    files: Vec<SourceFile>,
}

impl SourceTree {
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self { files }
    }

    /// Files of one kind, in lexicographic order of their relative path.
    pub fn of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn count(&self, kind: SourceKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Walk all source roots and classify their files.
pub fn scan(roots: &SourceRoots) -> Result<SourceTree, SourceError> {
    let plan = [
        (roots.pages.as_path(), SourceKind::PageTemplate),
        (roots.articles_content.as_path(), SourceKind::ArticleSource),
        (roots.articles_views.as_path(), SourceKind::LayoutTemplate),
        (roots.partials.as_path(), SourceKind::PartialSource),
        (roots.data.as_path(), SourceKind::DataSource),
    ];

    let walked: Vec<Vec<SourceFile>> = plan
        .par_iter()
        .map(|(root, kind)| scan_root(root, *kind))
        .collect::<Result<_, _>>()?;

    let files: Vec<SourceFile> = walked.into_iter().flatten().collect();
    debug!(count = files.len(), "classified source files");
    Ok(SourceTree::new(files))
}

/// Walk one root and keep the files `kind` accepts, sorted by relative path.
pub fn scan_root(root: &Path, kind: SourceKind) -> Result<Vec<SourceFile>, SourceError> {
    if !root.is_dir() {
        debug!(root = %root.display(), kind = kind.label(), "source root absent");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        e.depth() == 0 || !naming::is_hidden(&e.file_name().to_string_lossy())
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            SourceError::new(path, e.to_string())
        })?;
        if !entry.file_type().is_file() || !kind.accepts(entry.path()) {
            continue;
        }
        let Some(rel) = naming::relative_slash_path(root, entry.path()) else {
            continue;
        };
        files.push(SourceFile {
            kind,
            path: entry.path().to_path_buf(),
            rel,
        });
    }

    files.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(files)
}

/// Every directory below `root` (root first, then descendants in name order).
///
/// Used to expand template search roots. Hidden directories are skipped.
pub fn expand_dirs(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !naming::is_hidden(&e.file_name().to_string_lossy()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}
