//! Layout resolution.
//!
//! Layouts live in a tree that mirrors the articles content tree. An article
//! is rendered through the `layout.jinja` of its own directory or, failing
//! that, of the nearest ancestor directory up to the views root:
//!
//! ```text
//! views/articles/                     markdown/articles/
//! ├── layout.jinja        ◀───────────┬── intro.md
//! └── blog/                           └── blog/
//!     └── layout.jinja    ◀───────────────┬── first.md
//!                                         └── updates/
//!                         (blog wins) ◀───────└── new-post.md
//! ```
//!
//! The rules are loaded once into a trie keyed by directory segment; each
//! lookup walks the article's directory segments down from the root and keeps
//! the deepest layout it passes. No filesystem access happens per article.

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::articles::ArticleEntry;
use crate::naming;
use crate::scan::SourceFile;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error(
        "no layout for {} (searched `{directory}` and every parent up to the articles views root)",
        article.display()
    )]
    Missing { article: PathBuf, directory: String },
    #[error(
        "directory `{directory}` has two layouts: {} and {}",
        first.display(),
        second.display()
    )]
    Duplicate {
        directory: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A directory (relative to the articles views root) and its layout template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRule {
    pub directory: String,
    pub template: String,
    pub source: PathBuf,
}

#[derive(Debug, Default)]
struct LayoutNode {
    rule: Option<LayoutRule>,
    children: BTreeMap<String, LayoutNode>,
}

#[derive(Debug, Default)]
pub struct LayoutResolver {
    root: LayoutNode,
}

impl LayoutResolver {
    pub fn from_rules(rules: impl IntoIterator<Item = LayoutRule>) -> Result<Self, LayoutError> {
        let mut resolver = Self::default();
        for rule in rules {
            let mut node = &mut resolver.root;
            for seg in rule.directory.split('/').filter(|s| !s.is_empty()) {
                node = node.children.entry(seg.to_string()).or_default();
            }
            if let Some(existing) = &node.rule {
                return Err(LayoutError::Duplicate {
                    directory: rule.directory,
                    first: existing.source.clone(),
                    second: rule.source,
                });
            }
            node.rule = Some(rule);
        }
        Ok(resolver)
    }

    /// Build from classified layout templates; `template_id` names each for the engine.
    pub fn from_sources(
        files: &[SourceFile],
        template_id: impl Fn(&SourceFile) -> String,
    ) -> Result<Self, LayoutError> {
        Self::from_rules(files.iter().map(|f| LayoutRule {
            directory: naming::parent_dir(&f.rel).to_string(),
            template: template_id(f),
            source: f.path.clone(),
        }))
    }

    /// Nearest rule at or above `directory`.
    pub fn lookup(&self, directory: &str) -> Option<&LayoutRule> {
        let mut node = &self.root;
        let mut best = node.rule.as_ref();
        for seg in directory.split('/').filter(|s| !s.is_empty()) {
            match node.children.get(seg) {
                Some(child) => {
                    node = child;
                    if node.rule.is_some() {
                        best = node.rule.as_ref();
                    }
                }
                None => break,
            }
        }
        best
    }

    /// Layout template identifier for an article.
    pub fn resolve(&self, article: &ArticleEntry) -> Result<&str, LayoutError> {
        self.lookup(&article.directory)
            .map(|rule| rule.template.as_str())
            .ok_or_else(|| LayoutError::Missing {
                article: article.source.clone(),
                directory: article.directory.clone(),
            })
    }

    /// Fill in the layout of every article.
    pub fn assign(&self, articles: &mut [ArticleEntry]) -> Result<(), LayoutError> {
        for article in articles.iter_mut() {
            let layout = self.resolve(article)?.to_string();
            article.layout = Some(layout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataMapping;

    fn rule(directory: &str) -> LayoutRule {
        let template = format!("{}/layout.jinja", naming::join_route("articles", directory));
        LayoutRule {
            directory: directory.to_string(),
            template,
            source: PathBuf::from(format!("views/articles/{directory}/layout.jinja")),
        }
    }

    fn entry(directory: &str) -> ArticleEntry {
        ArticleEntry {
            source: PathBuf::from(format!("{directory}/post.md")),
            rel: naming::join_route(directory, "post.md"),
            directory: directory.to_string(),
            name: "post".into(),
            route: naming::join_route(directory, "post"),
            body_html: String::new(),
            front_matter: DataMapping::new(),
            date: None,
            draft: false,
            layout: None,
        }
    }

    fn resolver() -> LayoutResolver {
        LayoutResolver::from_rules([rule(""), rule("blog")]).unwrap()
    }

    #[test]
    fn nearest_ancestor_wins() {
        let r = resolver();
        assert_eq!(
            r.resolve(&entry("blog/updates")).unwrap(),
            "articles/blog/layout.jinja"
        );
    }

    #[test]
    fn own_directory_wins() {
        assert_eq!(
            resolver().resolve(&entry("blog")).unwrap(),
            "articles/blog/layout.jinja"
        );
    }

    #[test]
    fn falls_back_to_root() {
        let r = resolver();
        assert_eq!(r.resolve(&entry("")).unwrap(), "articles/layout.jinja");
        assert_eq!(r.resolve(&entry("notes/deep")).unwrap(), "articles/layout.jinja");
    }

    #[test]
    fn deeper_layout_below_gap() {
        let r = LayoutResolver::from_rules([rule(""), rule("a/b/c")]).unwrap();
        assert_eq!(r.resolve(&entry("a/b")).unwrap(), "articles/layout.jinja");
        assert_eq!(r.resolve(&entry("a/b/c/d")).unwrap(), "articles/a/b/c/layout.jinja");
    }

    #[test]
    fn missing_layout_is_error() {
        let r = LayoutResolver::from_rules([rule("blog")]).unwrap();
        let err = r.resolve(&entry("notes")).unwrap_err();
        assert!(matches!(err, LayoutError::Missing { ref directory, .. } if directory == "notes"));
        assert!(err.to_string().contains("notes/post.md"));
    }

    #[test]
    fn sibling_names_do_not_partially_match() {
        let r = LayoutResolver::from_rules([rule("blog")]).unwrap();
        assert!(r.resolve(&entry("blogroll")).is_err());
    }

    #[test]
    fn duplicate_layouts_rejected() {
        let err = LayoutResolver::from_rules([rule("blog"), rule("blog")]).unwrap_err();
        assert!(matches!(err, LayoutError::Duplicate { .. }));
    }

    #[test]
    fn assign_fills_every_article() {
        let mut articles = vec![entry(""), entry("blog/updates")];
        resolver().assign(&mut articles).unwrap();
        assert_eq!(articles[0].layout.as_deref(), Some("articles/layout.jinja"));
        assert_eq!(articles[1].layout.as_deref(), Some("articles/blog/layout.jinja"));
    }
}
