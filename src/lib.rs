//! # Quire
//!
//! A static site assembler. Jinja templates, markdown articles and JSON/TOML
//! data are laid out in a fixed directory convention; quire works out what
//! route every source becomes, what data it can see, and what layout wraps
//! it, then renders the lot and publishes it in one step.
//!
//! # Architecture: Load, Plan, Render
//!
//! ```text
//! 1. Load    sources  →  Site          (classified files, data, partials, articles)
//! 2. Plan    Site     →  Vec<PageRoute> (static pages, listings, articles)
//! 3. Render  routes   →  dist/          (staged, then swapped into place)
//! ```
//!
//! Everything produced by the load stage is immutable. Planning is a pure
//! function of it, which keeps route derivation deterministic: an unchanged
//! source tree plans the same routes and renders byte-identical files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, stock defaults, merging and validation |
//! | [`scan`] | Walks the source roots and tags every file with its role once |
//! | [`naming`] | Path conventions: routes, dot keys, output files |
//! | [`frontmatter`] | `@frontmatter { … } @endfrontmatter` header blocks |
//! | [`markdown`] | Markdown converter interface and its pulldown-cmark implementation |
//! | [`data`] | Data store loader: merges every data file into one mapping |
//! | [`query`] | Filtering, ordering and windowing of data and article sequences |
//! | [`partials`] | Markdown partials exposed to templates by dot-notation key |
//! | [`articles`] | Article entries: front matter, dates, drafts, excerpts, records |
//! | [`layout`] | Nearest-ancestor layout resolution over a segment trie |
//! | [`pagination`] | Listing page slicing, metadata and page link markup |
//! | [`routes`] | Route planner with nested pages, listings and collision checks |
//! | [`context`] | Layered template context per route |
//! | [`template`] | Template engine interface and its MiniJinja implementation |
//! | [`document`] | HTML document chrome around rendered bodies, using Maud |
//! | [`feed`] | RSS 2.0 feed of dated articles |
//! | [`generate`] | Parallel rendering to a staging directory and atomic publish |
//! | [`site`] | Orchestration of the whole build and the build report |
//! | [`types`] | Planned routes shared by planner and renderer |
//! | [`error`] | Source read errors and the aggregate build error |
//! | [`output`] | CLI output formatting of plans and build reports |
//!
//! # Design Decisions
//!
//! ## Classify Once
//!
//! [`scan`] tags each discovered file as a page template, article, layout,
//! partial or data source before any resolution runs. Later stages take the
//! files of the kind they need and never guess a role from a path again.
//!
//! ## Fail Whole, Publish Whole
//!
//! Every error is fatal to the build and names the offending file. Output is
//! rendered into `.<output>.staging` next to the output directory and only
//! renamed into place after every route and the feed were written, so a
//! failed build never leaves a half-updated site behind.
//!
//! ## One Exception: Shadowed Partials
//!
//! A partial whose top-level key is also defined by the data store is kept
//! out of the template scope and reported as a warning. The data store wins.

pub mod articles;
pub mod config;
pub mod context;
pub mod data;
pub mod document;
pub mod error;
pub mod feed;
pub mod frontmatter;
pub mod generate;
pub mod layout;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod pagination;
pub mod partials;
pub mod query;
pub mod routes;
pub mod scan;
pub mod site;
pub mod template;
pub mod types;

pub use error::BuildError;

#[cfg(test)]
pub(crate) mod test_helpers;
