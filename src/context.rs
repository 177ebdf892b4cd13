//! Page context assembly.
//!
//! The bindings a template sees are layered in a fixed order:
//!
//! ```text
//! 1. global data        (data store)
//! 2. partial namespace  (skipped for keys the data store already defines)
//! 3. route bindings     (article / pagination / front_matter; always win)
//! ```
//!
//! Layers 1 and 2 are identical for every route, so they are merged once
//! into a [`ContextBase`]. Each route then gets its own owned snapshot with
//! its bindings on top; no route can observe another route's bindings.
//!
//! A partial whose top-level key is already defined by the data store is a
//! warning, not an error: the data store value is kept.

use tracing::warn;

use crate::data::DataMapping;
use crate::partials::PartialNamespace;
use crate::types::PageRoute;

#[derive(Debug, Clone, Default)]
pub struct ContextBase {
    base: DataMapping,
    warnings: Vec<String>,
}

impl ContextBase {
    pub fn new(global: &DataMapping, partials: &PartialNamespace) -> Self {
        let mut base = global.clone();
        let mut warnings = Vec::new();
        for (key, fragment) in partials {
            if base.contains_key(key) {
                warn!(key = %key, "partial shadowed by data store key of the same name");
                warnings.push(format!(
                    "partial `{key}` is shadowed by the data store key `{key}`"
                ));
                continue;
            }
            base.insert(key.clone(), fragment.clone());
        }
        Self { base, warnings }
    }

    /// Context for one route: the shared base with the route's bindings on top.
    pub fn assemble(&self, route: &PageRoute) -> DataMapping {
        self.layer(&route.bindings)
    }

    pub fn layer(&self, bindings: &DataMapping) -> DataMapping {
        let mut context = self.base.clone();
        for (key, value) in bindings {
            context.insert(key.clone(), value.clone());
        }
        context
    }

    /// Global/partial key collisions found while merging.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Assemble the context of a single route from scratch.
pub fn assemble(
    global: &DataMapping,
    partials: &PartialNamespace,
    route: &PageRoute,
) -> DataMapping {
    ContextBase::new(global, partials).assemble(route)
}
