//! Query engine over the live window
//!
//! Clients send a flat set of optional string parameters. They are
//! compiled once into a [`QueryFilter`] and evaluated against every
//! retained sale; all given fields must hold (AND), an absent field does
//! not constrain. The result keeps arrival order.
//!
//! A numeric parameter that does not parse compiles to a predicate that
//! matches nothing, so a malformed query returns fewer sales rather than
//! an error. The same holds for a parameter given more than once.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant as StdInstant;

use sale_types::sale::Sale;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::WindowMetrics;
use crate::record::EventRecord;
use crate::window::SharedWindow;

/// Raw query parameters as received from the HTTP adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    /// Comma-separated substrings; any may match (case-insensitive).
    pub market_name: Option<String>,
    /// Exact category (case-insensitive).
    pub category: Option<String>,
    /// Comma-separated pattern indexes; any may match.
    pub pattern: Option<String>,
    /// Upper wear bound, inclusive.
    pub wear: Option<String>,
    /// Exact exterior grade (case-insensitive).
    pub exterior: Option<String>,
    /// Lower wear bound, inclusive.
    pub min_wear: Option<String>,
    /// Lower price bound in cents, inclusive.
    pub min_price: Option<String>,
    /// Upper price bound in cents, inclusive.
    pub max_price: Option<String>,
    /// Recognized keys that were given more than once.
    #[serde(skip)]
    pub repeated: BTreeSet<String>,
}

impl QueryParams {
    /// Collect parameters from raw key/value pairs in request order.
    ///
    /// Unknown keys are ignored. A known key seen twice is recorded in
    /// `repeated` and its predicate compiles to one that matches nothing.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let slot = match key {
                "marketName" => &mut params.market_name,
                "category" => &mut params.category,
                "pattern" => &mut params.pattern,
                "wear" => &mut params.wear,
                "exterior" => &mut params.exterior,
                "minWear" => &mut params.min_wear,
                "minPrice" => &mut params.min_price,
                "maxPrice" => &mut params.max_price,
                _ => continue,
            };
            if slot.is_some() {
                params.repeated.insert(key.to_string());
            } else {
                *slot = Some(value.into());
            }
        }
        params
    }

    fn is_repeated(&self, key: &str) -> bool {
        self.repeated.contains(key)
    }
}

/// A single compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint<T> {
    /// Parameter absent or blank.
    Unset,
    /// Parameter present and valid.
    Require(T),
    /// Parameter present but unparseable; never matches.
    Invalid,
}

impl<T> Constraint<T> {
    fn check(&self, f: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Constraint::Unset => true,
            Constraint::Require(value) => f(value),
            Constraint::Invalid => false,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Constraint::Unset)
    }
}

/// Compiled multi-field predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub market_names: Constraint<Vec<String>>,
    pub category: Constraint<String>,
    pub patterns: Constraint<Vec<i64>>,
    pub max_wear: Constraint<f64>,
    pub min_wear: Constraint<f64>,
    pub exterior: Constraint<String>,
    pub min_price: Constraint<u64>,
    pub max_price: Constraint<u64>,
}

impl QueryFilter {
    /// Compile raw parameters into a filter.
    pub fn compile(params: &QueryParams) -> Self {
        let filter = Self {
            market_names: match present(&params.market_name) {
                None => Constraint::Unset,
                Some(raw) => {
                    let terms: Vec<String> = split_terms(raw).map(str::to_lowercase).collect();
                    if terms.is_empty() {
                        Constraint::Unset
                    } else {
                        Constraint::Require(terms)
                    }
                }
            },
            category: exact(&params.category),
            patterns: match present(&params.pattern) {
                None => Constraint::Unset,
                Some(raw) => {
                    let parsed: Result<Vec<i64>, _> = split_terms(raw).map(str::parse::<i64>).collect();
                    match parsed {
                        Ok(list) if list.is_empty() => Constraint::Unset,
                        Ok(list) => Constraint::Require(list),
                        Err(_) => Constraint::Invalid,
                    }
                }
            },
            max_wear: float_bound(&params.wear),
            min_wear: float_bound(&params.min_wear),
            exterior: exact(&params.exterior),
            min_price: integer_bound(&params.min_price),
            max_price: integer_bound(&params.max_price),
        };
        filter.reject_repeated(params)
    }

    fn reject_repeated(mut self, params: &QueryParams) -> Self {
        if params.is_repeated("marketName") {
            self.market_names = Constraint::Invalid;
        }
        if params.is_repeated("category") {
            self.category = Constraint::Invalid;
        }
        if params.is_repeated("pattern") {
            self.patterns = Constraint::Invalid;
        }
        if params.is_repeated("wear") {
            self.max_wear = Constraint::Invalid;
        }
        if params.is_repeated("minWear") {
            self.min_wear = Constraint::Invalid;
        }
        if params.is_repeated("exterior") {
            self.exterior = Constraint::Invalid;
        }
        if params.is_repeated("minPrice") {
            self.min_price = Constraint::Invalid;
        }
        if params.is_repeated("maxPrice") {
            self.max_price = Constraint::Invalid;
        }
        self
    }

    /// Whether no field constrains the result.
    pub fn is_unconstrained(&self) -> bool {
        self.market_names.is_unset()
            && self.category.is_unset()
            && self.patterns.is_unset()
            && self.max_wear.is_unset()
            && self.min_wear.is_unset()
            && self.exterior.is_unset()
            && self.min_price.is_unset()
            && self.max_price.is_unset()
    }

    /// Evaluate the filter against one sale.
    pub fn matches(&self, sale: &Sale) -> bool {
        let wear = sale.wear_in_range();

        self.market_names.check(|terms| {
            let name = sale.market_name.to_lowercase();
            terms.iter().any(|term| name.contains(term.as_str()))
        }) && self.category.check(|c| sale.category.to_lowercase() == *c)
            && self.patterns.check(|ps| sale.pattern.is_some_and(|p| ps.contains(&p)))
            && self.max_wear.check(|bound| wear.is_some_and(|w| w <= *bound))
            && self.min_wear.check(|bound| wear.is_some_and(|w| w >= *bound))
            && self.exterior.check(|e| {
                sale.exterior
                    .as_deref()
                    .is_some_and(|x| x.to_lowercase() == *e)
            })
            && self.min_price.check(|bound| sale.sale_price.is_some_and(|p| p >= *bound))
            && self.max_price.check(|bound| sale.sale_price.is_some_and(|p| p <= *bound))
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn split_terms(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn exact(raw: &Option<String>) -> Constraint<String> {
    match present(raw) {
        None => Constraint::Unset,
        Some(value) => Constraint::Require(value.to_lowercase()),
    }
}

fn float_bound(raw: &Option<String>) -> Constraint<f64> {
    match present(raw).map(str::parse::<f64>) {
        None => Constraint::Unset,
        Some(Ok(bound)) if bound.is_finite() => Constraint::Require(bound),
        Some(_) => Constraint::Invalid,
    }
}

fn integer_bound(raw: &Option<String>) -> Constraint<u64> {
    match present(raw).map(str::parse::<u64>) {
        None => Constraint::Unset,
        Some(Ok(bound)) => Constraint::Require(bound),
        Some(Err(_)) => Constraint::Invalid,
    }
}

/// Read side of the engine: filters the shared window on demand.
#[derive(Clone)]
pub struct QueryEngine {
    window: SharedWindow,
    metrics: Arc<WindowMetrics>,
}

impl QueryEngine {
    pub fn new(window: SharedWindow, metrics: Arc<WindowMetrics>) -> Self {
        Self { window, metrics }
    }

    /// Matching records, oldest first.
    pub fn query(&self, params: &QueryParams) -> Vec<EventRecord> {
        let started = StdInstant::now();
        let filter = QueryFilter::compile(params);

        let results = if filter.is_unconstrained() {
            self.window.snapshot()
        } else {
            self.window.query(&filter)
        };

        let latency_ns = started.elapsed().as_nanos() as u64;
        self.metrics.record_query(latency_ns);
        debug!(matched = results.len(), latency_ns, "Query served");
        results
    }
}
