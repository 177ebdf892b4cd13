//! Querying sequences in the data store and the article list.
//!
//! Templates call `get_articles(...)` and `query_store(...)` with a filter
//! object; listing pages name the same object in their front matter. Both
//! paths parse it into [`QueryOptions`] and run it with [`run`]:
//!
//! ```text
//! items ─▶ where (and) ─▶ where.or ─▶ order_by ─▶ offset/limit ─▶ page
//! ```
//!
//! ## Filter Object
//!
//! ```json
//! {
//!   "collection": "products",
//!   "where": {
//!     "category": "tools",
//!     "price": {"lt": 20},
//!     "or": [{"tags": {"contains": "new"}}, {"featured": true}]
//!   },
//!   "order_by": {"desc": "date"},
//!   "offset": 0,
//!   "limit": 10
//! }
//! ```
//!
//! A plain value is an equality test. An operator object may name several
//! operators; an item must satisfy all of them. Entries under `and` join the
//! top-level conditions; entries under `or` form a group of which at least
//! one must hold.
//!
//! ## Comparisons
//!
//! Strings shaped like `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SSZ` compare as
//! dates, numbers compare numerically, and a missing or null field sorts
//! before everything else. Sorting is stable, so ties keep their input order.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

use crate::data::{self, DataError, DataMapping};

/// Parse `YYYY-MM-DDTHH:MM:SSZ` or `YYYY-MM-DD` (midnight).
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub enum Condition {
    Equals(Value),
    NotEquals(Value),
    Contains(Value),
    NotContains(Value),
    StartsWith(String),
    EndsWith(String),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Regex(Regex),
}

/// One field test.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: String,
    pub conditions: Vec<Condition>,
}

/// Conjunction of `all` plus, when non-empty, a disjunction over `any`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub all: Vec<Predicate>,
    pub any: Vec<Predicate>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Filter,
    pub sort_by: Option<String>,
    pub order: Order,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// 1-based page number; only applied together with `page_size`.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

// =============================================================================
// Parsing
// =============================================================================

impl QueryOptions {
    /// Parse a filter object. `null` means "no filtering".
    pub fn from_value(value: &Value) -> Result<Self, DataError> {
        let obj = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            other => {
                return Err(DataError::Query(format!(
                    "filters must be a mapping, found {}",
                    data::kind_name(other)
                )));
            }
        };

        let mut opts = Self::default();
        if let Some(where_clause) = obj.get("where") {
            opts.filter = parse_where(where_clause)?;
        }
        if let Some(order_by) = obj.get("order_by") {
            let (order, field) = parse_order_by(order_by)?;
            opts.order = order;
            opts.sort_by = Some(field);
        }
        opts.offset = parse_count(obj.get("offset"), "offset")?;
        opts.limit = parse_count(obj.get("limit"), "limit")?;
        opts.page = parse_count(obj.get("page"), "page")?;
        opts.page_size = parse_count(obj.get("page_size"), "page_size")?;
        Ok(opts)
    }

    /// The same query with its `offset`/`limit` window removed.
    pub fn without_window(mut self) -> Self {
        self.offset = None;
        self.limit = None;
        self
    }
}

fn parse_where(value: &Value) -> Result<Filter, DataError> {
    let Value::Object(obj) = value else {
        return Err(DataError::Query("`where` must be a mapping".into()));
    };
    let mut filter = Filter::default();
    for (key, cond) in obj {
        match key.as_str() {
            "and" => filter.all.extend(parse_group(cond, "and")?),
            "or" => filter.any.extend(parse_group(cond, "or")?),
            field => filter.all.push(parse_predicate(field, cond)?),
        }
    }
    Ok(filter)
}

fn parse_group(value: &Value, name: &str) -> Result<Vec<Predicate>, DataError> {
    let Value::Array(entries) = value else {
        return Err(DataError::Query(format!("`{name}` must be a sequence")));
    };
    let mut predicates = Vec::new();
    for entry in entries {
        let Value::Object(obj) = entry else {
            return Err(DataError::Query(format!("`{name}` entries must be mappings")));
        };
        for (field, cond) in obj {
            predicates.push(parse_predicate(field, cond)?);
        }
    }
    Ok(predicates)
}

fn parse_predicate(field: &str, cond: &Value) -> Result<Predicate, DataError> {
    let conditions = match cond {
        Value::Object(ops) => ops
            .iter()
            .map(|(op, arg)| parse_condition(field, op, arg))
            .collect::<Result<Vec<_>, _>>()?,
        plain => vec![Condition::Equals(plain.clone())],
    };
    Ok(Predicate {
        field: field.to_string(),
        conditions,
    })
}

fn parse_condition(field: &str, op: &str, arg: &Value) -> Result<Condition, DataError> {
    let text = |arg: &Value| -> Result<String, DataError> {
        arg.as_str()
            .map(str::to_string)
            .ok_or_else(|| DataError::Query(format!("`{field}.{op}` expects a string")))
    };
    let list = |arg: &Value| -> Result<Vec<Value>, DataError> {
        arg.as_array()
            .cloned()
            .ok_or_else(|| DataError::Query(format!("`{field}.{op}` expects a sequence")))
    };
    Ok(match op {
        "equals" => Condition::Equals(arg.clone()),
        "not_equals" => Condition::NotEquals(arg.clone()),
        "contains" => Condition::Contains(arg.clone()),
        "not_contains" => Condition::NotContains(arg.clone()),
        "starts_with" => Condition::StartsWith(text(arg)?),
        "ends_with" => Condition::EndsWith(text(arg)?),
        "gt" => Condition::Gt(arg.clone()),
        "gte" => Condition::Gte(arg.clone()),
        "lt" => Condition::Lt(arg.clone()),
        "lte" => Condition::Lte(arg.clone()),
        "in" => Condition::In(list(arg)?),
        "not_in" => Condition::NotIn(list(arg)?),
        "regex" => {
            let pattern = text(arg)?;
            Condition::Regex(
                Regex::new(&pattern)
                    .map_err(|e| DataError::Query(format!("`{field}.regex`: {e}")))?,
            )
        }
        other => {
            return Err(DataError::Query(format!(
                "unknown operator `{other}` on `{field}`"
            )));
        }
    })
}

fn parse_order_by(value: &Value) -> Result<(Order, String), DataError> {
    let field = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
    if let Some(f) = field(value.get("asc")) {
        return Ok((Order::Asc, f));
    }
    if let Some(f) = field(value.get("desc")) {
        return Ok((Order::Desc, f));
    }
    Err(DataError::Query(
        "`order_by` must be {\"asc\": field} or {\"desc\": field}".into(),
    ))
}

fn parse_count(value: Option<&Value>, name: &str) -> Result<Option<usize>, DataError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(usize::try_from(n).unwrap_or(usize::MAX)))
            .ok_or_else(|| DataError::Query(format!("`{name}` must be a non-negative integer"))),
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Rank of a value's type, for ordering values of different types.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two scalars of compatible kinds; `None` when incomparable.
fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_date(x), parse_date(y)) {
            (Some(dx), Some(dy)) => Some(dx.cmp(&dy)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order used for sorting: null/missing first, then by type rank.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    compare_scalars(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b)))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            compare_scalars(a, b) == Some(Ordering::Equal)
        }
        _ => a == b,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Array(items), _) => items.iter().any(|i| values_equal(i, needle)),
        (Value::String(s), Value::String(n)) => s.contains(n.as_str()),
        (Value::Object(map), Value::String(k)) => map.contains_key(k),
        _ => false,
    }
}

fn ordered(field: &Value, arg: &Value, accept: fn(Ordering) -> bool) -> bool {
    !field.is_null() && compare_scalars(field, arg).is_some_and(accept)
}

impl Condition {
    fn holds(&self, field: &Value) -> bool {
        match self {
            Condition::Equals(v) => values_equal(field, v),
            Condition::NotEquals(v) => !values_equal(field, v),
            Condition::Contains(v) => contains(field, v),
            Condition::NotContains(v) => !contains(field, v),
            Condition::StartsWith(p) => field.as_str().is_some_and(|s| s.starts_with(p.as_str())),
            Condition::EndsWith(p) => field.as_str().is_some_and(|s| s.ends_with(p.as_str())),
            Condition::Gt(v) => ordered(field, v, Ordering::is_gt),
            Condition::Gte(v) => ordered(field, v, Ordering::is_ge),
            Condition::Lt(v) => ordered(field, v, Ordering::is_lt),
            Condition::Lte(v) => ordered(field, v, Ordering::is_le),
            Condition::In(list) => list.iter().any(|v| values_equal(field, v)),
            Condition::NotIn(list) => !list.iter().any(|v| values_equal(field, v)),
            Condition::Regex(re) => field.as_str().is_some_and(|s| re.is_match(s)),
        }
    }
}

static NULL: Value = Value::Null;

fn field_of<'a>(item: &'a Value, field: &str) -> &'a Value {
    item.get(field).unwrap_or(&NULL)
}

impl Predicate {
    pub fn matches(&self, item: &Value) -> bool {
        let value = field_of(item, &self.field);
        self.conditions.iter().all(|c| c.holds(value))
    }
}

impl Filter {
    pub fn matches(&self, item: &Value) -> bool {
        self.all.iter().all(|p| p.matches(item))
            && (self.any.is_empty() || self.any.iter().any(|p| p.matches(item)))
    }
}

/// Filter, order and window `items`.
pub fn run(items: &[Value], opts: &QueryOptions) -> Vec<Value> {
    let mut selected: Vec<Value> = items
        .iter()
        .filter(|item| opts.filter.matches(item))
        .cloned()
        .collect();

    if let Some(field) = &opts.sort_by {
        selected.sort_by(|a, b| {
            let ord = sort_order(field_of(a, field), field_of(b, field));
            match opts.order {
                Order::Asc => ord,
                Order::Desc => ord.reverse(),
            }
        });
    }

    let mut window: Box<dyn Iterator<Item = Value>> = Box::new(selected.into_iter());
    if let Some(offset) = opts.offset {
        window = Box::new(window.skip(offset));
    }
    if let Some(limit) = opts.limit {
        window = Box::new(window.take(limit));
    }
    if let (Some(page), Some(size)) = (opts.page, opts.page_size) {
        window = Box::new(window.skip(page.saturating_sub(1).saturating_mul(size)).take(size));
    }
    window.collect()
}

/// Run a query against the sequence at `path` in a data mapping.
pub fn query(
    mapping: &DataMapping,
    path: &str,
    opts: &QueryOptions,
) -> Result<Vec<Value>, DataError> {
    match data::lookup(mapping, path) {
        Some(Value::Array(items)) => Ok(run(items, opts)),
        Some(other) => Err(DataError::Path {
            path: path.to_string(),
            found: data::kind_name(other),
        }),
        None => Err(DataError::Path {
            path: path.to_string(),
            found: "nothing",
        }),
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Which catalog function feeds a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Articles,
    Store,
}

impl Source {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get_articles" => Some(Source::Articles),
            "query_store" => Some(Source::Store),
            _ => None,
        }
    }
}

/// Everything templates can query: published article records and the data store.
#[derive(Debug, Default)]
pub struct Catalog {
    articles: Vec<Value>,
    data: DataMapping,
}

impl Catalog {
    pub fn new(articles: Vec<Value>, data: DataMapping) -> Self {
        Self { articles, data }
    }

    pub fn data(&self) -> &DataMapping {
        &self.data
    }

    pub fn articles(&self) -> &[Value] {
        &self.articles
    }

    pub fn get_articles(&self, filters: &Value) -> Result<Vec<Value>, DataError> {
        let opts = QueryOptions::from_value(filters)?;
        Ok(run(&self.articles, &opts))
    }

    /// Query the data store sequence named by `filters.collection`.
    pub fn query_store(&self, filters: &Value) -> Result<Vec<Value>, DataError> {
        let collection = filters
            .get("collection")
            .and_then(Value::as_str)
            .ok_or_else(|| DataError::Query("query_store requires a `collection` name".into()))?;
        let opts = QueryOptions::from_value(filters)?;
        query(&self.data, collection, &opts)
    }

    /// Every item a listing page paginates over; `offset`/`limit` are ignored.
    pub fn listing_items(&self, source: Source, filters: &Value) -> Result<Vec<Value>, DataError> {
        let opts = QueryOptions::from_value(filters)?.without_window();
        match source {
            Source::Articles => Ok(run(&self.articles, &opts)),
            Source::Store => {
                let collection = filters
                    .get("collection")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        DataError::Query("query_store listing requires a `collection` name".into())
                    })?;
                query(&self.data, collection, &opts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<Value> {
        vec![
            json!({"name": "hammer", "price": 12, "tags": ["tools"], "date": "2024-02-01"}),
            json!({"name": "saw", "price": 30, "tags": ["tools", "new"], "date": "2024-03-01"}),
            json!({"name": "glue", "price": 4, "tags": [], "date": "2024-01-15T10:00:00Z"}),
            json!({"name": "tape", "price": 4}),
        ]
    }

    fn names(values: &[Value]) -> Vec<&str> {
        values.iter().map(|v| v["name"].as_str().unwrap()).collect()
    }

    fn q(filters: Value) -> Vec<Value> {
        run(&items(), &QueryOptions::from_value(&filters).unwrap())
    }

    #[test]
    fn null_filters_return_everything() {
        assert_eq!(q(Value::Null).len(), 4);
    }

    #[test]
    fn plain_value_is_equality() {
        assert_eq!(names(&q(json!({"where": {"price": 4}}))), vec!["glue", "tape"]);
    }

    #[test]
    fn contains_on_sequences() {
        let r = q(json!({"where": {"tags": {"contains": "new"}}}));
        assert_eq!(names(&r), vec!["saw"]);
        let r = q(json!({"where": {"tags": {"not_contains": "tools"}}}));
        assert_eq!(names(&r), vec!["glue", "tape"]);
    }

    #[test]
    fn numeric_ranges_skip_missing_fields() {
        let r = q(json!({"where": {"price": {"gte": 5, "lt": 31}}}));
        assert_eq!(names(&r), vec!["hammer", "saw"]);
    }

    #[test]
    fn date_strings_compare_chronologically() {
        let r = q(json!({"where": {"date": {"gt": "2024-01-31"}}}));
        assert_eq!(names(&r), vec!["hammer", "saw"]);
    }

    #[test]
    fn string_operators() {
        assert_eq!(names(&q(json!({"where": {"name": {"starts_with": "ha"}}}))), vec!["hammer"]);
        assert_eq!(names(&q(json!({"where": {"name": {"ends_with": "e"}}}))), vec!["glue", "tape"]);
        assert_eq!(names(&q(json!({"where": {"name": {"regex": "^s.w$"}}}))), vec!["saw"]);
    }

    #[test]
    fn in_and_not_in() {
        let r = q(json!({"where": {"name": {"in": ["saw", "tape"]}}}));
        assert_eq!(names(&r), vec!["saw", "tape"]);
        let r = q(json!({"where": {"name": {"not_in": ["saw", "tape"]}}}));
        assert_eq!(names(&r), vec!["hammer", "glue"]);
    }

    #[test]
    fn or_group_requires_one_match() {
        let r = q(json!({"where": {
            "price": {"lt": 20},
            "or": [{"name": "glue"}, {"name": "hammer"}]
        }}));
        assert_eq!(names(&r), vec!["hammer", "glue"]);
    }

    #[test]
    fn and_group_joins_top_level() {
        let r = q(json!({"where": {"and": [{"price": 4}, {"name": {"not_equals": "glue"}}]}}));
        assert_eq!(names(&r), vec!["tape"]);
    }

    #[test]
    fn order_desc_by_date_puts_missing_last() {
        let r = q(json!({"order_by": {"desc": "date"}}));
        assert_eq!(names(&r), vec!["saw", "hammer", "glue", "tape"]);
    }

    #[test]
    fn order_asc_is_stable_for_ties() {
        let r = q(json!({"order_by": {"asc": "price"}}));
        assert_eq!(names(&r), vec!["glue", "tape", "hammer", "saw"]);
    }

    #[test]
    fn offset_and_limit_window() {
        let r = q(json!({"order_by": {"asc": "name"}, "offset": 1, "limit": 2}));
        assert_eq!(names(&r), vec!["hammer", "saw"]);
    }

    #[test]
    fn page_slices_after_sorting() {
        let r = q(json!({"order_by": {"asc": "name"}, "page": 2, "page_size": 3}));
        assert_eq!(names(&r), vec!["tape"]);
    }

    #[test]
    fn page_past_end_is_empty() {
        let opts = QueryOptions::from_value(&json!({"page": u64::MAX, "page_size": 2})).unwrap();
        assert!(run(&items(), &opts).is_empty());

        let opts = QueryOptions::from_value(&json!({"page": 3, "page_size": u64::MAX})).unwrap();
        assert!(run(&items(), &opts).is_empty());
    }

    #[test]
    fn unknown_operator_is_error() {
        let err = QueryOptions::from_value(&json!({"where": {"a": {"like": "x"}}})).unwrap_err();
        assert!(err.to_string().contains("like"));
    }

    #[test]
    fn query_non_sequence_is_path_error() {
        let data: DataMapping =
            serde_json::from_value(json!({"metadata": {"title": "x"}})).unwrap();
        let err = query(&data, "metadata", &QueryOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::Path { found: "mapping", .. }));
        let err = query(&data, "missing", &QueryOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::Path { .. }));
    }

    #[test]
    fn query_nested_path() {
        let data: DataMapping =
            serde_json::from_value(json!({"shop": {"items": [{"name": "a"}, {"name": "b"}]}}))
                .unwrap();
        let r = query(&data, "shop.items", &QueryOptions::default()).unwrap();
        assert_eq!(names(&r), vec!["a", "b"]);
    }

    #[test]
    fn catalog_query_store_needs_collection() {
        let catalog = Catalog::new(vec![], DataMapping::new());
        assert!(matches!(
            catalog.query_store(&json!({})),
            Err(DataError::Query(_))
        ));
    }

    #[test]
    fn listing_items_ignore_window() {
        let catalog = Catalog::new(items(), DataMapping::new());
        let all = catalog
            .listing_items(Source::Articles, &json!({"limit": 1, "offset": 1}))
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn parse_date_formats() {
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("2024-03-01T12:30:00Z").is_some());
        assert!(parse_date("March 1").is_none());
    }
}
