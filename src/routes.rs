//! Route planning.
//!
//! Turns the classified sources into the complete, ordered list of
//! [`PageRoute`]s. Three families are planned and then unioned:
//!
//! ```text
//! home.jinja                    → ""                 (home)
//! pages/about.jinja             → about              (page)
//! pages/blog.jinja  [paginate]  → blog, blog/page/2  (listing)
//! pages/blog/archive.jinja      → blog/archive       (page, nested under blog)
//! articles/blog/first.md        → blog/first         (article, via layout)
//! ```
//!
//! ## Nested Pages
//!
//! A pages subdirectory `X/` is the nested-route namespace of its sibling
//! template `X.<ext>`. A directory that holds templates (at any depth) but
//! has no such sibling is an orphan: with `orphan_directories = "error"`
//! the build fails naming the directory, with `"descend"` its routes are
//! emitted without an index page.
//!
//! ## Listings
//!
//! A page or home template whose front matter sets `paginate` becomes a
//! listing:
//!
//! ```json
//! { "paginate": "get_articles", "per_page": 10,
//!   "query": { "where": { "category": "blog" }, "order_by": { "desc": "date" } } }
//! ```
//!
//! The query's `offset`/`limit` are ignored; the listing covers every match.
//!
//! ## Collisions
//!
//! Every route string must be unique across all families. A duplicate is
//! fatal and names both sources.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::articles::ArticleEntry;
use crate::config::OrphanPolicy;
use crate::data::{DataError, DataMapping};
use crate::error::SourceError;
use crate::frontmatter;
use crate::layout::LayoutError;
use crate::naming;
use crate::pagination;
use crate::query::{self, Catalog};
use crate::scan::SourceFile;
use crate::template::TemplateIds;
use crate::types::{PageRoute, RouteKind};

#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(
        "pages directory {} has no sibling template `{name}.jinja` to act as its index",
        directory.display()
    )]
    Ambiguous { directory: PathBuf, name: String },
    #[error(
        "route `{}` is produced by both {} and {}",
        naming::url_path(route),
        first.display(),
        second.display()
    )]
    Collision {
        route: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("invalid pagination in {}: {message}", path.display())]
    Pagination { path: PathBuf, message: String },
}

/// Everything the planner reads.
pub struct PlanInput<'a> {
    /// Page templates, sorted by path relative to `pages_root`.
    pub pages: &'a [SourceFile],
    pub pages_root: &'a Path,
    /// Home template, when configured and present.
    pub home: Option<&'a Path>,
    /// Articles to publish, layouts assigned.
    pub articles: &'a [ArticleEntry],
    pub catalog: &'a Catalog,
    pub ids: &'a TemplateIds,
    pub orphan_policy: OrphanPolicy,
}

/// Plan every route of the site, sorted by route.
pub fn plan(input: &PlanInput) -> Result<Vec<PageRoute>, RouteError> {
    let mut routes = Vec::new();

    if let Some(home) = input.home {
        routes.extend(template_routes(home, "", RouteKind::Home, input)?);
    }

    check_orphans(input.pages, input.pages_root, input.orphan_policy)?;
    for page in input.pages {
        let route = naming::route_for(&page.rel);
        routes.extend(template_routes(&page.path, &route, RouteKind::Page, input)?);
    }

    for article in input.articles {
        routes.push(article_route(article)?);
    }

    check_collisions(&routes)?;
    routes.sort_by(|a, b| a.route.cmp(&b.route));
    debug!(count = routes.len(), "planned routes");
    Ok(routes)
}

/// Routes for one template: a single page, or one route per listing page.
fn template_routes(
    path: &Path,
    route: &str,
    kind: RouteKind,
    input: &PlanInput,
) -> Result<Vec<PageRoute>, RouteError> {
    let source = fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    let front_matter = frontmatter::extract(path, &source)?;
    let template = input.ids.id_for(path);

    if front_matter.contains_key("paginate") {
        return listing_routes(path, route, &template, front_matter, input.catalog);
    }

    let mut bindings = DataMapping::new();
    bindings.insert("front_matter".into(), Value::Object(front_matter.clone()));
    Ok(vec![PageRoute {
        route: route.to_string(),
        source: path.to_path_buf(),
        template,
        kind,
        bindings,
        front_matter,
    }])
}

fn listing_routes(
    path: &Path,
    base: &str,
    template: &str,
    front_matter: DataMapping,
    catalog: &Catalog,
) -> Result<Vec<PageRoute>, RouteError> {
    let invalid = |message: String| RouteError::Pagination {
        path: path.to_path_buf(),
        message,
    };

    let source = front_matter
        .get("paginate")
        .and_then(Value::as_str)
        .and_then(query::Source::parse)
        .ok_or_else(|| invalid("`paginate` must be \"get_articles\" or \"query_store\"".into()))?;
    let per_page = front_matter
        .get("per_page")
        .and_then(pagination::parse_per_page)
        .ok_or_else(|| invalid("`per_page` must be a positive integer".into()))?;
    let filters = front_matter.get("query").cloned().unwrap_or(Value::Null);

    let items = catalog.listing_items(source, &filters)?;
    let pages = pagination::paginate(base, &items, per_page);
    debug!(route = base, items = items.len(), pages = pages.len(), "planned listing");

    pages
        .into_iter()
        .map(|info| {
            let page = info.current_page;
            let info = serde_json::to_value(&info)
                .map_err(|e| invalid(format!("cannot encode pagination: {e}")))?;
            let mut bindings = DataMapping::new();
            bindings.insert("front_matter".into(), Value::Object(front_matter.clone()));
            bindings.insert("pagination".into(), info);
            Ok(PageRoute {
                route: pagination::page_route(base, page),
                source: path.to_path_buf(),
                template: template.to_string(),
                kind: RouteKind::Listing { page },
                bindings,
                front_matter: front_matter.clone(),
            })
        })
        .collect()
}

fn article_route(article: &ArticleEntry) -> Result<PageRoute, RouteError> {
    let template = article.layout.clone().ok_or_else(|| LayoutError::Missing {
        article: article.source.clone(),
        directory: article.directory.clone(),
    })?;
    let mut bindings = DataMapping::new();
    bindings.insert("article".into(), Value::String(article.body_html.clone()));
    bindings.insert(
        "front_matter".into(),
        Value::Object(article.front_matter.clone()),
    );
    Ok(PageRoute {
        route: article.route.clone(),
        source: article.source.clone(),
        template,
        kind: RouteKind::Article,
        bindings,
        front_matter: article.front_matter.clone(),
    })
}

/// Directories under the pages root that hold templates but lack an index.
pub fn orphan_directories(pages: &[SourceFile]) -> Vec<String> {
    let page_routes: BTreeSet<String> = pages.iter().map(|p| naming::route_for(&p.rel)).collect();
    let mut orphans = BTreeSet::new();
    for page in pages {
        let mut dir = naming::parent_dir(&page.rel);
        while !dir.is_empty() {
            if !page_routes.contains(dir) {
                orphans.insert(dir.to_string());
            }
            dir = naming::parent_dir(dir);
        }
    }
    orphans.into_iter().collect()
}

fn check_orphans(
    pages: &[SourceFile],
    pages_root: &Path,
    policy: OrphanPolicy,
) -> Result<(), RouteError> {
    let orphans = orphan_directories(pages);
    match (policy, orphans.first()) {
        (OrphanPolicy::Error, Some(dir)) => Err(RouteError::Ambiguous {
            directory: pages_root.join(dir),
            name: naming::base_name(dir).to_string(),
        }),
        _ => {
            for dir in &orphans {
                debug!(directory = %dir, "descending into pages directory without index");
            }
            Ok(())
        }
    }
}

fn check_collisions(routes: &[PageRoute]) -> Result<(), RouteError> {
    let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
    for route in routes {
        if let Some(first) = seen.insert(&route.route, &route.source) {
            return Err(RouteError::Collision {
                route: route.route.clone(),
                first: first.to_path_buf(),
                second: route.source.clone(),
            });
        }
    }
    Ok(())
}
