//! Listing pagination.
//!
//! A listing template is rendered once per page of its query result. The
//! first page keeps the template's own route; later pages live below it:
//!
//! ```text
//! blog            page 1
//! blog/page/2     page 2
//! blog/page/3     page 3
//! ```
//!
//! An empty result still produces one (empty) page so the listing route
//! always exists. Each page receives a [`PaginationInfo`] with its slice of
//! items plus navigation metadata and ready-made link markup.

use maud::{Markup, html};
use serde::Serialize;
use serde_json::Value;

use crate::naming;

/// Above this many pages the numbered links are truncated with ellipses.
pub const MAX_FULL_PAGE_LINKS: usize = 10;

/// Pages shown on each side of the current page in truncated link lists.
const LINK_WINDOW: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaginationInfo {
    pub items: Vec<Value>,
    pub total_items: usize,
    pub current_page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
    pub previous_page_url: Option<String>,
    pub next_page_url: Option<String>,
    /// `<nav class="pagination">` markup, empty for single-page listings.
    pub page_links: String,
}

/// Number of pages needed for `total_items`; never less than one.
pub fn total_pages(total_items: usize, per_page: usize) -> usize {
    total_items.div_ceil(per_page.max(1)).max(1)
}

/// Route of page `page` (1-based) of the listing at `base`.
pub fn page_route(base: &str, page: usize) -> String {
    if page <= 1 {
        base.to_string()
    } else {
        naming::join_route(base, &format!("page/{page}"))
    }
}

/// Public URL of page `page` of the listing at `base`.
pub fn page_url(base: &str, page: usize) -> String {
    naming::url_path(&page_route(base, page))
}

/// Interpret a `per_page` front matter value: a positive integer or a
/// string holding one.
pub fn parse_per_page(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n as usize)
}

/// Split `items` into pages of `per_page` and describe each one.
pub fn paginate(base: &str, items: &[Value], per_page: usize) -> Vec<PaginationInfo> {
    let per_page = per_page.max(1);
    let total = total_pages(items.len(), per_page);
    let mut chunks = items.chunks(per_page);

    (1..=total)
        .map(|page| {
            let slice = chunks.next().unwrap_or_default();
            let has_previous = page > 1;
            let has_next = page < total;
            PaginationInfo {
                items: slice.to_vec(),
                total_items: items.len(),
                current_page: page,
                per_page,
                total_pages: total,
                has_previous,
                has_next,
                previous_page: has_previous.then(|| page - 1),
                next_page: has_next.then(|| page + 1),
                previous_page_url: has_previous.then(|| page_url(base, page - 1)),
                next_page_url: has_next.then(|| page_url(base, page + 1)),
                page_links: page_links(base, page, total),
            }
        })
        .collect()
}

#[derive(Debug, PartialEq)]
enum Slot {
    Page(usize),
    Ellipsis,
}

/// Numbered link slots for the current page.
fn slots(current: usize, total: usize) -> Vec<Slot> {
    if total <= MAX_FULL_PAGE_LINKS {
        return (1..=total).map(Slot::Page).collect();
    }
    let start = current.saturating_sub(LINK_WINDOW).max(1);
    let end = (current + LINK_WINDOW).min(total);

    let mut out = Vec::new();
    if start > 1 {
        out.push(Slot::Page(1));
        if start > 2 {
            out.push(Slot::Ellipsis);
        }
    }
    out.extend((start..=end).map(Slot::Page));
    if end < total {
        if end + 1 < total {
            out.push(Slot::Ellipsis);
        }
        out.push(Slot::Page(total));
    }
    out
}

fn nav(base: &str, current: usize, total: usize) -> Markup {
    html! {
        nav.pagination {
            ul.pagination-list {
                @if current > 1 {
                    li.pagination-previous {
                        a href=(page_url(base, current - 1)) { span { "Previous" } }
                    }
                }
                @for slot in slots(current, total) {
                    @match slot {
                        Slot::Page(n) => {
                            @if n == current {
                                li.pagination-item.active { (n) }
                            } @else {
                                li.pagination-item { a href=(page_url(base, n)) { (n) } }
                            }
                        }
                        Slot::Ellipsis => {
                            li.pagination-ellipsis { "…" }
                        }
                    }
                }
                @if current < total {
                    li.pagination-next {
                        a href=(page_url(base, current + 1)) { span { "Next" } }
                    }
                }
            }
        }
    }
}

/// Pagination link markup; empty when there is only one page.
pub fn page_links(base: &str, current: usize, total: usize) -> String {
    if total <= 1 {
        return String::new();
    }
    nav(base, current, total).into_string()
}
