//! CLI output formatting.
//!
//! Output is route-centric: every line leads with the URL a page is served
//! at, with the file that produced it shown as indented context. Paths are
//! shown relative to the project root.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Sources
//!     3 page, 4 article, 2 layout, 3 partial, 2 data
//!
//! Routes
//! 001 / (home)
//!     Source: src/theme/views/home.jinja
//! 002 /about/ (page)
//!     Source: src/theme/views/pages/about.jinja
//! 003 /blog/page/2/ (listing p2)
//!     Source: src/theme/views/pages/blog.jinja
//!
//! Feed → feed.xml
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 / → index.html
//! 002 /about/ → about/index.html
//! 003 /blog/first/ → blog/first/index.html
//! Feed → feed.xml
//!
//! Generated 3 routes (1 home, 1 page, 1 article) into dist
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use std::collections::BTreeMap;
use std::path::Path;

use crate::site::{BuildReport, SitePlan};
use crate::types::RouteKind;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Show `path` relative to `root` when it lives below it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn kind_group(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Home => "home",
        RouteKind::Page => "page",
        RouteKind::Article => "article",
        RouteKind::Listing { .. } => "listing page",
    }
}

/// `"1 home, 2 pages, 3 articles"` style summary, in first-seen order.
fn kind_summary(kinds: impl Iterator<Item = RouteKind>) -> String {
    let mut order: Vec<&'static str> = Vec::new();
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for kind in kinds {
        let group = kind_group(kind);
        let count = counts.entry(group).or_insert(0);
        if *count == 0 {
            order.push(group);
        }
        *count += 1;
    }
    order
        .iter()
        .map(|group| {
            let n = counts[group];
            let plural = if n == 1 || *group == "home" { "" } else { "s" };
            format!("{n} {group}{plural}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn warning_lines(warnings: &[String]) -> Vec<String> {
    if warnings.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "Warnings".to_string()];
    lines.extend(warnings.iter().map(|w| format!("{}{}", indent(1), w)));
    lines
}

// ============================================================================
// Check
// ============================================================================

pub fn format_plan(plan: &SitePlan, project_root: &Path) -> Vec<String> {
    let mut lines = vec!["Sources".to_string()];
    let counts = plan
        .source_counts
        .iter()
        .map(|(kind, n)| format!("{} {}", n, kind.label()))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("{}{}", indent(1), counts));

    lines.push(String::new());
    lines.push("Routes".to_string());
    for (i, route) in plan.routes.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            route.url(),
            route.kind.label()
        ));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_path(&route.source, project_root)
        ));
    }

    if let Some(feed) = &plan.feed {
        lines.push(String::new());
        lines.push(format!("Feed → {}", feed.display()));
    }
    lines.extend(warning_lines(&plan.warnings));
    lines
}

pub fn print_plan(plan: &SitePlan, project_root: &Path) {
    for line in format_plan(plan, project_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport, project_root: &Path) -> Vec<String> {
    let mut lines: Vec<String> = report
        .routes
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{} {} → {}", format_index(i + 1), r.url, r.output.display()))
        .collect();

    if let Some(feed) = &report.feed {
        lines.push(format!("Feed → {}", feed.display()));
    }
    lines.extend(warning_lines(&report.warnings));

    lines.push(String::new());
    let summary = kind_summary(report.routes.iter().map(|r| r.kind));
    let output = display_path(&report.output, project_root);
    if summary.is_empty() {
        lines.push(format!("Generated 0 routes into {}", output));
    } else {
        lines.push(format!(
            "Generated {} routes ({}) into {}",
            report.routes.len(),
            summary,
            output
        ));
    }
    lines
}

pub fn print_build_report(report: &BuildReport, project_root: &Path) {
    for line in format_build_report(report, project_root) {
        println!("{}", line);
    }
}
