//! Shared test utilities for the quire test suite.
//!
//! Provides a fixture project copied to a temp directory, plus lookup
//! helpers over planned routes, build reports and loaded articles that
//! panic with the available names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = crate::site::build(tmp.path()).unwrap();
//!
//! let record = find_record(&report, "blog/first");
//! assert_eq!(record.kind, RouteKind::Article);
//! assert!(read_route(tmp.path(), "blog/first").contains("First post"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::articles::ArticleEntry;
use crate::site::{BuildReport, RouteRecord};
use crate::types::PageRoute;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `content` to `rel` below `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Rendered HTML of `route` in the default `dist` output.
pub fn read_route(root: &Path, route: &str) -> String {
    let path = root.join("dist").join(crate::naming::output_file(route));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a planned route. Panics if not found.
pub fn find_route<'a>(routes: &'a [PageRoute], route: &str) -> &'a PageRoute {
    routes.iter().find(|r| r.route == route).unwrap_or_else(|| {
        let names = route_names(routes);
        panic!("route '{route}' not found. Available: {names:?}")
    })
}

/// Find a route in a build report. Panics if not found.
pub fn find_record<'a>(report: &'a BuildReport, route: &str) -> &'a RouteRecord {
    report
        .routes
        .iter()
        .find(|r| r.route == route)
        .unwrap_or_else(|| {
            let names: Vec<&str> = report.routes.iter().map(|r| r.route.as_str()).collect();
            panic!("route '{route}' not in build report. Available: {names:?}")
        })
}

/// Find a loaded article by route. Panics if not found.
pub fn find_article<'a>(articles: &'a [ArticleEntry], route: &str) -> &'a ArticleEntry {
    articles.iter().find(|a| a.route == route).unwrap_or_else(|| {
        let names: Vec<&str> = articles.iter().map(|a| a.route.as_str()).collect();
        panic!("article '{route}' not found. Available: {names:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All route strings in planned order.
pub fn route_names(routes: &[PageRoute]) -> Vec<&str> {
    routes.iter().map(|r| r.route.as_str()).collect()
}
