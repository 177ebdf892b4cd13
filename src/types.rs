//! Shared types passed from the route planner to the renderer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::DataMapping;
use crate::naming;

/// What produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// The configured home template, rendered at the site root.
    Home,
    /// A template under the pages root.
    Page,
    /// A markdown article rendered through its layout.
    Article,
    /// One page of a paginated listing template (1-based).
    Listing { page: usize },
}

impl RouteKind {
    pub fn label(&self) -> String {
        match self {
            RouteKind::Home => "home".to_string(),
            RouteKind::Page => "page".to_string(),
            RouteKind::Article => "article".to_string(),
            RouteKind::Listing { page } => format!("listing p{page}"),
        }
    }
}

/// One planned output page.
///
/// `bindings` holds only the route-specific values (`article`, `pagination`,
/// `front_matter`); global data and partials are layered underneath when
/// the context is assembled.
#[derive(Debug, Clone)]
pub struct PageRoute {
    /// Slash-separated URL path without leading/trailing slash (`""` is the root).
    pub route: String,
    /// File that caused the route to exist.
    pub source: PathBuf,
    /// Template identifier rendered for this route.
    pub template: String,
    pub kind: RouteKind,
    pub bindings: DataMapping,
    /// Front matter of the source, feeding the document head.
    pub front_matter: DataMapping,
}

impl PageRoute {
    /// Output file relative to the output root.
    pub fn output_file(&self) -> PathBuf {
        naming::output_file(&self.route)
    }

    pub fn url(&self) -> String {
        naming::url_path(&self.route)
    }
}
