//! Partial namespace building.
//!
//! Every markdown file under the partials root is converted to HTML and
//! stored in a nested mapping keyed by its directory segments, so templates
//! can write `{{ collections.quotes.my_quote }}`:
//!
//! ```text
//! partials/
//! ├── footer.md                     → footer
//! └── collections/
//!     └── quotes/
//!         └── my_quote.md           → collections.quotes.my_quote
//! ```
//!
//! Two files may never claim the same key, and a key cannot be both a
//! fragment and a namespace (`quotes.md` next to `quotes/`). Either case is
//! a [`NamespaceError::Collision`] naming both files.

use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::DataMapping;
use crate::error::SourceError;
use crate::frontmatter;
use crate::markdown::MarkdownConverter;
use crate::naming;
use crate::scan::{self, SourceFile, SourceKind};

/// Nested mapping whose leaves are rendered HTML fragments.
pub type PartialNamespace = DataMapping;

#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(
        "partial key `{key}` is claimed by both {} and {}",
        first.display(),
        second.display()
    )]
    Collision {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Scan `dir` and build its namespace.
pub fn build(
    dir: &Path,
    converter: &dyn MarkdownConverter,
) -> Result<PartialNamespace, NamespaceError> {
    let files = scan::scan_root(dir, SourceKind::PartialSource)?;
    from_sources(&files, converter)
}

/// Build the namespace from already classified partial sources.
pub fn from_sources(
    files: &[SourceFile],
    converter: &dyn MarkdownConverter,
) -> Result<PartialNamespace, NamespaceError> {
    let rendered: Vec<String> = files
        .par_iter()
        .map(|f| render(&f.path, converter))
        .collect::<Result<_, _>>()?;

    let mut builder = Builder::default();
    for (file, html) in files.iter().zip(rendered) {
        builder.insert(file, html)?;
    }
    Ok(builder.namespace)
}

fn render(path: &Path, converter: &dyn MarkdownConverter) -> Result<String, SourceError> {
    let source = fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    Ok(converter.to_html(&frontmatter::strip(&source)))
}

/// Key segments of a partial: its directories, then its base name.
fn segments(rel: &str) -> Vec<&str> {
    let dir = naming::parent_dir(rel);
    dir.split('/')
        .filter(|s| !s.is_empty())
        .chain(std::iter::once(naming::base_name(rel)))
        .collect()
}

#[derive(Default)]
struct Builder {
    namespace: PartialNamespace,
    /// First file to claim each fragment key.
    leaves: BTreeMap<String, PathBuf>,
    /// First file to open each namespace key.
    branches: BTreeMap<String, PathBuf>,
}

impl Builder {
    fn insert(&mut self, file: &SourceFile, html: String) -> Result<(), NamespaceError> {
        let segs = segments(&file.rel);
        let collision = |key: String, first: &PathBuf| NamespaceError::Collision {
            key,
            first: first.clone(),
            second: file.path.clone(),
        };

        let key = segs.join(".");
        if let Some(first) = self.leaves.get(&key).or_else(|| self.branches.get(&key)) {
            return Err(collision(key, first));
        }
        for depth in 1..segs.len() {
            let prefix = segs[..depth].join(".");
            if let Some(first) = self.leaves.get(&prefix) {
                return Err(collision(prefix, first));
            }
            self.branches
                .entry(prefix)
                .or_insert_with(|| file.path.clone());
        }

        let (last, parents) = match segs.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };
        let mut table = &mut self.namespace;
        for seg in parents {
            let slot = table
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(DataMapping::new()));
            table = match slot {
                Value::Object(map) => map,
                _ => return Err(collision(key, &file.path)),
            };
        }
        table.insert(last.to_string(), Value::String(html));
        self.leaves.insert(key, file.path.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::CmarkConverter;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn nested_key_from_directories() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "collections/quotes/my_quote.md", "Be *bold*.");
        write(tmp.path(), "footer.md", "Footer");

        let ns = build(tmp.path(), &CmarkConverter).unwrap();
        assert_eq!(
            ns["collections"]["quotes"]["my_quote"],
            json!("<p>Be <em>bold</em>.</p>\n")
        );
        assert_eq!(ns["footer"], json!("<p>Footer</p>\n"));
    }

    #[test]
    fn siblings_share_namespace() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "quotes/a.md", "A");
        write(tmp.path(), "quotes/b.md", "B");

        let ns = build(tmp.path(), &CmarkConverter).unwrap();
        let quotes = ns["quotes"].as_object().unwrap();
        assert_eq!(quotes.len(), 2);
    }

    #[test]
    fn front_matter_not_rendered() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "note.md", "@frontmatter {\"a\": 1} @endfrontmatter\nHello");
        let ns = build(tmp.path(), &CmarkConverter).unwrap();
        assert_eq!(ns["note"], json!("<p>Hello</p>\n"));
    }

    #[test]
    fn leaf_and_namespace_collide() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "quotes.md", "leaf");
        write(tmp.path(), "quotes/a.md", "nested");

        let err = build(tmp.path(), &CmarkConverter).unwrap_err();
        match err {
            NamespaceError::Collision { key, first, second } => {
                assert_eq!(key, "quotes");
                assert!(first.ends_with("quotes.md"));
                assert!(second.ends_with("quotes/a.md"));
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn same_key_from_two_files_collides() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "footer.md", "a");
        write(tmp.path(), "footer.MD", "b");

        let err = build(tmp.path(), &CmarkConverter).unwrap_err();
        assert!(matches!(err, NamespaceError::Collision { ref key, .. } if key == "footer"));
    }

    #[test]
    fn empty_root_is_empty_namespace() {
        let tmp = TempDir::new().unwrap();
        assert!(build(tmp.path(), &CmarkConverter).unwrap().is_empty());
    }
}
