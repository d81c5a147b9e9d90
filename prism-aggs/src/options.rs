//! Option tables and descriptions offered to a query editor

use crate::model::metric::{MetricAggregation, MetricAggregationType};
use crate::model::settings::{ExtendedStat, MovingAverageModel};
use crate::registry::CapabilityRegistry;
use serde::Serialize;
use serde_json::{json, Value};

/// Text/value pair for a select input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
}

impl SelectOption {
    fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }
}

fn table(rows: &[(&str, &str)]) -> Vec<SelectOption> {
    rows.iter().map(|(t, v)| SelectOption::new(*t, *v)).collect()
}

pub fn order_options() -> Vec<SelectOption> {
    table(&[("Top", "desc"), ("Bottom", "asc")])
}

pub fn size_options() -> Vec<SelectOption> {
    let mut options = table(&[("No limit", "0")]);
    options.extend(
        ["1", "2", "3", "5", "10", "15", "20"]
            .iter()
            .map(|n| SelectOption::new(*n, *n)),
    );
    options
}

pub fn interval_options() -> Vec<SelectOption> {
    ["auto", "10s", "1m", "5m", "10m", "20m", "1h", "1d"]
        .iter()
        .map(|i| SelectOption::new(*i, *i))
        .collect()
}

pub fn moving_avg_model_options() -> Vec<SelectOption> {
    MovingAverageModel::ALL
        .iter()
        .map(|m| SelectOption::new(m.label(), m.as_str()))
        .collect()
}

pub fn extended_stat_options() -> Vec<SelectOption> {
    ExtendedStat::ALL
        .iter()
        .map(|s| {
            let value = serde_json::to_value(s)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            SelectOption::new(s.label(), value)
        })
        .collect()
}

/// A pipeline option with its initial value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOption {
    pub text: &'static str,
    pub default: Option<Value>,
}

/// Options of a pipeline type; empty for every other type
pub fn pipeline_options(
    registry: &CapabilityRegistry,
    agg_type: MetricAggregationType,
) -> Vec<PipelineOption> {
    if !registry.lookup(agg_type).is_pipeline_agg {
        return Vec::new();
    }
    let option = |text, default| PipelineOption { text, default };
    match agg_type {
        MetricAggregationType::MovingAvg => vec![
            option("window", Some(json!(5))),
            option("model", Some(json!("simple"))),
            option("predict", None),
            option("minimize", Some(json!(false))),
        ],
        MetricAggregationType::Derivative => vec![option("unit", None)],
        MetricAggregationType::CumulativeSum => vec![option("format", None)],
        _ => Vec::new(),
    }
}

/// Human-readable name of a metric: its label, plus the field or referenced
/// metric id when the type has one
pub fn describe_metric(registry: &CapabilityRegistry, metric: &MetricAggregation) -> String {
    let record = registry.lookup(metric.agg_type);
    if !record.requires_field && !record.is_pipeline_agg {
        return record.label.to_string();
    }
    match metric.field.as_deref() {
        Some(field) if !field.is_empty() => format!("{} {}", record.label, field),
        _ => record.label.to_string(),
    }
}

/// Terms ordering choices: document count, term value, then every basic metric
pub fn order_by_options(
    registry: &CapabilityRegistry,
    metrics: &[MetricAggregation],
) -> Vec<SelectOption> {
    let mut options = table(&[("Doc Count", "_count"), ("Term value", "_term")]);
    options.extend(
        metrics
            .iter()
            .filter(|m| registry.is_basic_aggregation(m))
            .map(|m| SelectOption::new(describe_metric(registry, m), m.id.clone())),
    );
    options
}

/// Text for a terms ordering value, resolving metric ids against `metrics`
pub fn describe_order_by(
    registry: &CapabilityRegistry,
    order_by: &str,
    metrics: &[MetricAggregation],
) -> String {
    match order_by {
        "_count" => "Doc Count".to_string(),
        "_term" => "Term value".to_string(),
        id => find_metric_by_id(metrics, id)
            .map(|m| describe_metric(registry, m))
            .unwrap_or_else(|| "metric not found".to_string()),
    }
}

pub fn find_metric_by_id<'a>(metrics: &'a [MetricAggregation], id: &str) -> Option<&'a MetricAggregation> {
    crate::model::find_by_id(metrics, id)
}

pub fn has_metric_of_type(metrics: &[MetricAggregation], agg_type: MetricAggregationType) -> bool {
    metrics.iter().any(|m| m.agg_type == agg_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use MetricAggregationType::*;

    fn reg() -> CapabilityRegistry {
        CapabilityRegistry::standard()
    }

    #[test]
    fn test_describe_metric() {
        let r = reg();
        assert_eq!(describe_metric(&r, &MetricAggregation::new("1", Count)), "Count");
        assert_eq!(
            describe_metric(&r, &MetricAggregation::new("2", Avg).with_field("latency")),
            "Average latency"
        );
        assert_eq!(
            describe_metric(&r, &MetricAggregation::new("3", Derivative).with_field("2")),
            "Derivative 2"
        );
        assert_eq!(describe_metric(&r, &MetricAggregation::new("4", Max)), "Max");
    }

    #[test]
    fn test_order_by_options_skip_count_and_pipelines() {
        let r = reg();
        let metrics = vec![
            MetricAggregation::new("1", Count),
            MetricAggregation::new("2", Sum).with_field("bytes"),
            MetricAggregation::new("3", CumulativeSum).with_field("2"),
        ];
        let options = order_by_options(&r, &metrics);
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["_count", "_term", "2"]);
        assert_eq!(options[2].text, "Sum bytes");
    }

    #[test]
    fn test_describe_order_by() {
        let r = reg();
        let metrics = vec![MetricAggregation::new("2", Min).with_field("price")];
        assert_eq!(describe_order_by(&r, "_term", &metrics), "Term value");
        assert_eq!(describe_order_by(&r, "2", &metrics), "Min price");
        assert_eq!(describe_order_by(&r, "9", &metrics), "metric not found");
    }

    #[test]
    fn test_pipeline_options() {
        let r = reg();
        assert!(pipeline_options(&r, Avg).is_empty());
        assert!(pipeline_options(&r, BucketScript).is_empty());
        let moving = pipeline_options(&r, MovingAvg);
        assert_eq!(moving.len(), 4);
        assert_eq!(moving[0].default, Some(json!(5)));
    }

    #[test]
    fn test_static_tables() {
        assert_eq!(size_options().len(), 8);
        assert_eq!(interval_options()[0].value, "auto");
        assert_eq!(order_options()[1].value, "asc");
        assert_eq!(moving_avg_model_options()[2].text, "Exponentially Weighted");
        assert_eq!(extended_stat_options()[5].value, "std_deviation");
    }

    #[test]
    fn test_has_metric_of_type() {
        let metrics = vec![MetricAggregation::new("1", Logs)];
        assert!(has_metric_of_type(&metrics, Logs));
        assert!(!has_metric_of_type(&metrics, RawData));
    }
}
