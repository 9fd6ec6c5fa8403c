use crate::engine::errors::ConfigError;
use crate::engine::result::{DurationStats, ViewValue};
use crate::report::descriptor::{ViewDef, ViewEntity, ViewProperty};
use crate::store::document::ElementKind;
use crate::store::query::{MetricAgg, MetricField};

/// What a report measures per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPart {
    Frequency,
    Duration,
    RawData,
}

/// Which documents the measurement runs over: instances, or the nested
/// flow-node/user-task documents inside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    Instances,
    Elements(ElementKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedView {
    pub part: ViewPart,
    pub scope: ViewScope,
}

impl ResolvedView {
    /// Closed `{entity, property}` matrix; anything outside it is a
    /// configuration error.
    pub fn resolve(view: &ViewDef) -> Result<Self, ConfigError> {
        let scope = match view.entity {
            ViewEntity::ProcessInstance => ViewScope::Instances,
            ViewEntity::FlowNode => ViewScope::Elements(ElementKind::FlowNode),
            ViewEntity::UserTask => ViewScope::Elements(ElementKind::UserTask),
        };
        let part = match view.property {
            ViewProperty::Frequency => ViewPart::Frequency,
            ViewProperty::Duration => ViewPart::Duration,
            ViewProperty::RawData => {
                if scope != ViewScope::Instances {
                    return Err(ConfigError::UnsupportedView(
                        "raw data is only available for process instances".into(),
                    ));
                }
                ViewPart::RawData
            }
        };
        Ok(Self { part, scope })
    }

    /// Leaf metric aggregations for this view. Duration metrics carry the
    /// pinned instant so the store derives running durations before
    /// aggregating.
    pub fn metrics(&self, now_millis: i64) -> Vec<MetricAgg> {
        match self.part {
            ViewPart::Frequency | ViewPart::RawData => vec![MetricAgg::Count],
            ViewPart::Duration => {
                let field = self.duration_field(now_millis);
                vec![
                    MetricAgg::Count,
                    MetricAgg::Min(field),
                    MetricAgg::Max(field),
                    MetricAgg::Avg(field),
                    MetricAgg::Percentile { field, pct: 50.0 },
                ]
            }
        }
    }

    /// Decodes the metric values of one bucket, index-aligned with
    /// `metrics()`. Absent values decode to zero, never null.
    pub fn decode(&self, values: &[Option<f64>]) -> ViewValue {
        let at = |i: usize| values.get(i).copied().flatten().unwrap_or(0.0);
        match self.part {
            ViewPart::Frequency => ViewValue::Count(at(0) as u64),
            ViewPart::Duration => ViewValue::Duration(DurationStats {
                min: at(1),
                max: at(2),
                avg: at(3),
                median: at(4),
            }),
            ViewPart::RawData => ViewValue::Raw(Vec::new()),
        }
    }

    /// Value materialized for keys the data never produced.
    pub fn empty_value(&self) -> ViewValue {
        match self.part {
            ViewPart::Frequency => ViewValue::Count(0),
            ViewPart::Duration => ViewValue::Duration(DurationStats::zero()),
            ViewPart::RawData => ViewValue::Raw(Vec::new()),
        }
    }

    pub fn is_frequency(&self) -> bool {
        self.part == ViewPart::Frequency
    }

    fn duration_field(&self, now_millis: i64) -> MetricField {
        match self.scope {
            ViewScope::Instances => MetricField::InstanceDuration { now_millis },
            ViewScope::Elements(_) => MetricField::ElementDuration { now_millis },
        }
    }
}
