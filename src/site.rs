//! Build orchestration.
//!
//! ```text
//! config.toml ──► scan (classify) ──┬─► data store      ─┐
//!                                   ├─► partials        ─┼─► catalog + engine
//!                                   └─► articles ► layouts┘
//!                                                   │
//!                                   plan routes ◄───┘
//!                                        │
//!                          render + feed ► staging ► publish
//! ```
//!
//! The three loaders are independent and run in parallel. Everything they
//! produce is immutable once [`Site::load`] returns; planning and rendering
//! only read it.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::articles::{self, ArticleEntry};
use crate::config::{self, BuildSettings, ConfigError, SourceRoots};
use crate::context::ContextBase;
use crate::data::{self, DataMapping};
use crate::error::BuildError;
use crate::feed;
use crate::generate::{self, FeedDocument, Renderer};
use crate::layout::LayoutResolver;
use crate::markdown::CmarkConverter;
use crate::partials::{self, PartialNamespace};
use crate::query::Catalog;
use crate::routes::{self, PlanInput};
use crate::scan::{self, SourceFile, SourceKind, SourceTree};
use crate::template::{JinjaEngine, TemplateIds};
use crate::types::{PageRoute, RouteKind};

/// Everything loaded from a project, ready to plan and render.
pub struct Site {
    pub settings: BuildSettings,
    pub roots: SourceRoots,
    pub tree: SourceTree,
    pub data: DataMapping,
    pub partials: PartialNamespace,
    /// Articles to publish, layouts assigned, in source order.
    pub articles: Vec<ArticleEntry>,
    pub catalog: Arc<Catalog>,
    pub ids: TemplateIds,
    engine: JinjaEngine,
}

/// One rendered route in a [`BuildReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RouteRecord {
    pub route: String,
    pub url: String,
    pub kind: RouteKind,
    pub source: PathBuf,
    pub template: String,
    /// Relative to the output directory.
    pub output: PathBuf,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub output: PathBuf,
    pub routes: Vec<RouteRecord>,
    pub feed: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// Result of `check`: the routes a build would produce.
#[derive(Debug, Clone)]
pub struct SitePlan {
    pub routes: Vec<PageRoute>,
    pub feed: Option<PathBuf>,
    pub warnings: Vec<String>,
    pub source_counts: Vec<(SourceKind, usize)>,
}

fn collect(tree: &SourceTree, kind: SourceKind) -> Vec<SourceFile> {
    tree.of_kind(kind).cloned().collect()
}

impl Site {
    /// Scan and load every source under `project_root`.
    pub fn load(project_root: &Path, settings: BuildSettings) -> Result<Self, BuildError> {
        let roots = settings.roots(project_root);
        let canonical = std::fs::canonicalize(project_root).map_err(ConfigError::Io)?;
        settings.roots(&canonical).check_output()?;
        let tree = scan::scan(&roots)?;
        info!(files = tree.len(), "scanned sources");

        let data_files = collect(&tree, SourceKind::DataSource);
        let partial_files = collect(&tree, SourceKind::PartialSource);
        let article_files = collect(&tree, SourceKind::ArticleSource);
        let converter = CmarkConverter;

        let (data, (partials, articles)) = rayon::join(
            || data::merge_sources(&data_files),
            || {
                rayon::join(
                    || partials::from_sources(&partial_files, &converter),
                    || articles::load_all(&article_files, &converter),
                )
            },
        );
        let data = data?;
        let partials = partials?;
        let mut articles = articles?;

        if !settings.include_drafts {
            let before = articles.len();
            articles.retain(|a| !a.draft);
            debug!(skipped = before - articles.len(), "dropped draft articles");
        }

        let ids = TemplateIds::new(roots.template_search.clone());
        let layouts = collect(&tree, SourceKind::LayoutTemplate);
        let resolver = LayoutResolver::from_sources(&layouts, |f| ids.id_for(&f.path))?;
        resolver.assign(&mut articles)?;

        let url_origin = settings.url_origin.clone().filter(|o| !o.is_empty());
        let records = articles
            .iter()
            .map(|a| a.record(url_origin.as_deref()))
            .collect();
        let catalog = Arc::new(Catalog::new(records, data.clone()));
        let engine = JinjaEngine::new(&roots.template_search, Arc::clone(&catalog), url_origin);

        info!(
            data_keys = data.len(),
            partials = partials.len(),
            articles = articles.len(),
            "loaded site"
        );

        Ok(Self {
            settings,
            roots,
            tree,
            data,
            partials,
            articles,
            catalog,
            ids,
            engine,
        })
    }

    /// Plan every route of the site.
    pub fn routes(&self) -> Result<Vec<PageRoute>, BuildError> {
        let pages = collect(&self.tree, SourceKind::PageTemplate);
        let home = self.roots.home.as_deref().filter(|p| p.is_file());
        let routes = routes::plan(&PlanInput {
            pages: &pages,
            pages_root: &self.roots.pages,
            home,
            articles: &self.articles,
            catalog: &self.catalog,
            ids: &self.ids,
            orphan_policy: self.settings.orphan_directories,
        })?;
        Ok(routes)
    }

    /// The feed document, when enabled.
    pub fn feed(&self) -> Result<Option<FeedDocument>, BuildError> {
        if !self.settings.feed.enabled {
            return Ok(None);
        }
        let xml = feed::generate(&self.articles, &self.settings.feed)?;
        Ok(Some(FeedDocument {
            output: PathBuf::from(&self.settings.feed.output),
            xml,
        }))
    }

    pub fn context_base(&self) -> ContextBase {
        ContextBase::new(&self.data, &self.partials)
    }

    /// Load and plan without writing anything.
    pub fn plan(&self) -> Result<SitePlan, BuildError> {
        let routes = self.routes()?;
        let feed = self.feed()?.map(|f| f.output);
        let source_counts = [
            SourceKind::PageTemplate,
            SourceKind::ArticleSource,
            SourceKind::LayoutTemplate,
            SourceKind::PartialSource,
            SourceKind::DataSource,
        ]
        .into_iter()
        .map(|kind| (kind, self.tree.count(kind)))
        .collect();
        Ok(SitePlan {
            routes,
            feed,
            warnings: self.context_base().warnings().to_vec(),
            source_counts,
        })
    }

    /// Plan, render and publish the site.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let routes = self.routes()?;
        let feed = self.feed()?;
        let base = self.context_base();
        let renderer = Renderer {
            engine: &self.engine,
            base: &base,
            global: &self.data,
            document: &self.settings.document,
        };

        let generated = generate::generate(&routes, &renderer, feed.as_ref(), &self.roots.output)?;
        info!(routes = routes.len(), output = %self.roots.output.display(), "published site");

        let records = routes
            .iter()
            .zip(generated.pages)
            .map(|(route, written)| RouteRecord {
                route: route.route.clone(),
                url: route.url(),
                kind: route.kind,
                source: route.source.clone(),
                template: route.template.clone(),
                output: written.output,
                digest: written.digest,
            })
            .collect();

        Ok(BuildReport {
            output: self.roots.output.clone(),
            routes: records,
            feed: generated.feed.map(|f| f.output),
            warnings: base.warnings().to_vec(),
        })
    }
}

/// Load `config.toml` under `project_root` and the site it describes.
pub fn load(project_root: &Path) -> Result<Site, BuildError> {
    let settings = config::load_config(project_root)?;
    Site::load(project_root, settings)
}

/// Load and plan the project under `project_root` without writing output.
pub fn check(project_root: &Path) -> Result<SitePlan, BuildError> {
    load(project_root)?.plan()
}

/// Build the project under `project_root`.
pub fn build(project_root: &Path) -> Result<BuildReport, BuildError> {
    load(project_root)?.build()
}
