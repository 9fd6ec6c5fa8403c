use crate::report::descriptor::{SortDirection, VersionSelector};
use crate::store::document::{ElementKind, InstanceState};

/// One read-only request to the analytics store. The definition scope is
/// kept apart from the user filters so the store can report hit counts with
/// and without them in the same round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub definition_filter: FilterExpr,
    pub user_filter: FilterExpr,
    pub aggregation: Option<Aggregation>,
    /// Return the matching documents themselves (raw-data views).
    pub fetch_documents: bool,
}

impl StoreQuery {
    pub fn combined_filter(&self) -> FilterExpr {
        FilterExpr::And(vec![
            self.definition_filter.clone(),
            self.user_filter.clone(),
        ])
    }
}

/// Boolean filter tree over instance documents. The `Element*` variants are
/// only meaningful inside a `Nested` aggregation scope, where they predicate
/// on the nested element instead of the owning instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    MatchAll,
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    DefinitionKey(String),
    DefinitionVersions(VersionSelector),
    TenantIn(Vec<String>),
    State(InstanceState),
    DateRange {
        field: DateField,
        range: NumericRange,
    },
    /// Range over the derived instance duration at the pinned instant.
    DurationRange {
        now_millis: i64,
        range: NumericRange,
    },
    Variable {
        name: String,
        matches: VariableMatch,
    },
    /// Instance executed at least one flow node with one of these ids.
    ExecutedFlowNode {
        ids: Vec<String>,
    },
    ElementIdIn(Vec<String>),
    ElementDurationRange {
        now_millis: i64,
        range: NumericRange,
    },
}

impl FilterExpr {
    /// Flattens trivial conjunctions.
    pub fn and(clauses: Vec<FilterExpr>) -> FilterExpr {
        let mut flat: Vec<FilterExpr> = Vec::with_capacity(clauses.len());
        for clause in clauses {
            match clause {
                FilterExpr::MatchAll => {}
                FilterExpr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => FilterExpr::MatchAll,
            1 => flat.into_iter().next().unwrap(),
            _ => FilterExpr::And(flat),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    InstanceStart,
    InstanceEnd,
    ElementStart,
    ElementEnd,
}

impl DateField {
    pub fn is_element_field(&self) -> bool {
        matches!(self, DateField::ElementStart | DateField::ElementEnd)
    }
}

/// Half-open/closed numeric window; unset bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericRange {
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
}

impl NumericRange {
    pub fn greater_than(value: f64) -> Self {
        Self {
            gt: Some(value),
            ..Default::default()
        }
    }

    pub fn at_least(value: f64) -> Self {
        Self {
            gte: Some(value),
            ..Default::default()
        }
    }

    pub fn less_than(value: f64) -> Self {
        Self {
            lt: Some(value),
            ..Default::default()
        }
    }

    pub fn at_most(value: f64) -> Self {
        Self {
            lte: Some(value),
            ..Default::default()
        }
    }

    /// `(start, end]` window, the semantics of fixed date filters.
    pub fn exclusive_inclusive(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            gt: start,
            lte: end,
            ..Default::default()
        }
    }

    /// `[start, end]` window.
    pub fn closed(start: f64, end: f64) -> Self {
        Self {
            gte: Some(start),
            lte: Some(end),
            ..Default::default()
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(b) = self.gt {
            if value <= b {
                return false;
            }
        }
        if let Some(b) = self.gte {
            if value < b {
                return false;
            }
        }
        if let Some(b) = self.lt {
            if value >= b {
                return false;
            }
        }
        if let Some(b) = self.lte {
            if value > b {
                return false;
            }
        }
        true
    }

    /// Lower bound in milliseconds when one exists.
    pub fn lower_millis(&self) -> Option<i64> {
        self.gt.or(self.gte).map(|v| v as i64)
    }

    /// Upper bound in milliseconds when one exists.
    pub fn upper_millis(&self) -> Option<i64> {
        self.lt.or(self.lte).map(|v| v as i64)
    }
}

/// Resolved variable predicate as the store matches it.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableMatch {
    StringIn { values: Vec<String>, negate: bool },
    BooleanIs(bool),
    NumberIn { values: Vec<f64>, negate: bool },
    NumberRange(NumericRange),
    DateRange(NumericRange),
}

/// Composable aggregation request. Wrappers narrow scope (`Filtered`),
/// descend into nested element documents (`Nested`), or attach a
/// key-enumeration side aggregation (`WithSibling`).
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Metrics(Vec<MetricAgg>),
    DateHistogram {
        field: DateField,
        interval: HistogramInterval,
        /// Calendar truncation happens store-side in the evaluation
        /// timezone so bucket starts line up with the rendered keys.
        timezone: chrono_tz::Tz,
        order: SortDirection,
        /// When set, the store emits every bucket across this span, gap
        /// buckets included, and nothing outside it.
        bounds: Option<TimeSpan>,
        sub: Box<Aggregation>,
    },
    Terms {
        source: TermsSource,
        order: TermsOrder,
        sub: Box<Aggregation>,
    },
    Nested {
        kind: ElementKind,
        sub: Box<Aggregation>,
    },
    Filtered {
        filter: FilterExpr,
        sub: Box<Aggregation>,
    },
    WithSibling {
        main: Box<Aggregation>,
        sibling: Box<Aggregation>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramInterval {
    Calendar(crate::report::descriptor::DateUnit),
    Fixed { millis: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub min_millis: i64,
    pub max_millis: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermsSource {
    /// Groups instances by the value they carry for this variable;
    /// instances without it fall out of the aggregation.
    VariableValue { name: String },
    /// Element id, inside a `Nested` scope.
    ElementId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsOrder {
    CountDesc,
    CountAsc,
    KeyAsc,
    KeyDesc,
}

/// Leaf metric over the documents in scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricAgg {
    Count,
    Min(MetricField),
    Max(MetricField),
    Avg(MetricField),
    Percentile { field: MetricField, pct: f64 },
}

/// Duration fields carry the pinned evaluation instant so the store derives
/// `max(0, now − start)` for documents that have not ended before any
/// aggregation runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricField {
    InstanceDuration { now_millis: i64 },
    ElementDuration { now_millis: i64 },
}
