//! Metric aggregations
//!
//! Every metric variant shares one representation. What a value may carry
//! (a field, settings, meta flags, pipeline variables) is decided by its type
//! tag through the [`CapabilityRegistry`](crate::registry::CapabilityRegistry),
//! never by looking at which optional members happen to be populated.

use crate::error::Error;
use crate::model::settings::{ExtendedStat, Meta, Settings};
use crate::model::Aggregation;
use crate::registry::CapabilityRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Metric aggregation type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricAggregationType {
    Count,
    Avg,
    Sum,
    Min,
    Max,
    ExtendedStats,
    Percentiles,
    Cardinality,
    RawDocument,
    RawData,
    Logs,
    MovingAvg,
    Derivative,
    CumulativeSum,
    BucketScript,
}

impl MetricAggregationType {
    /// Every declared metric type, in discriminant order
    pub const ALL: [MetricAggregationType; 15] = [
        Self::Count,
        Self::Avg,
        Self::Sum,
        Self::Min,
        Self::Max,
        Self::ExtendedStats,
        Self::Percentiles,
        Self::Cardinality,
        Self::RawDocument,
        Self::RawData,
        Self::Logs,
        Self::MovingAvg,
        Self::Derivative,
        Self::CumulativeSum,
        Self::BucketScript,
    ];

    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::ExtendedStats => "extended_stats",
            Self::Percentiles => "percentiles",
            Self::Cardinality => "cardinality",
            Self::RawDocument => "raw_document",
            Self::RawData => "raw_data",
            Self::Logs => "logs",
            Self::MovingAvg => "moving_avg",
            Self::Derivative => "derivative",
            Self::CumulativeSum => "cumulative_sum",
            Self::BucketScript => "bucket_script",
        }
    }

    /// Dense slot index used by registries
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MetricAggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricAggregationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownAggregationType(s.to_string()))
    }
}

impl TryFrom<String> for MetricAggregationType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetricAggregationType> for String {
    fn from(value: MetricAggregationType) -> Self {
        value.as_str().to_string()
    }
}

/// Named reference from a multi-path pipeline aggregation to an earlier metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineVariable {
    pub name: String,
    /// Id of the referenced metric; empty while unset
    #[serde(default)]
    pub pipeline_agg: String,
}

impl PipelineVariable {
    pub fn new(name: impl Into<String>, pipeline_agg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pipeline_agg: pipeline_agg.into(),
        }
    }
}

/// A metric aggregation as stored in a query's metric list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAggregation {
    pub id: String,

    #[serde(rename = "type")]
    pub agg_type: MetricAggregationType,

    #[serde(default)]
    pub hide: bool,

    /// Document field, or for pipeline types the id of the referenced metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_variables: Option<Vec<PipelineVariable>>,
}

impl MetricAggregation {
    pub fn new(id: impl Into<String>, agg_type: MetricAggregationType) -> Self {
        Self {
            id: id.into(),
            agg_type,
            hide: false,
            field: None,
            settings: None,
            meta: None,
            pipeline_variables: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings
            .get_or_insert_with(Settings::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_meta(mut self, stat: ExtendedStat, enabled: bool) -> Self {
        self.meta.get_or_insert_with(Meta::new).insert(stat, enabled);
        self
    }

    pub fn with_pipeline_variables(mut self, variables: Vec<PipelineVariable>) -> Self {
        self.pipeline_variables = Some(variables);
        self
    }

    /// Metric ids this value points at through `field` and its pipeline
    /// variables, whatever its current type; empty members are skipped
    pub fn referenced_ids(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.field.as_deref().filter(|f| !f.is_empty()).into_iter().collect();
        for pv in self.pipeline_variables.as_deref().unwrap_or(&[]) {
            if !pv.pipeline_agg.is_empty() && !refs.contains(&pv.pipeline_agg.as_str()) {
                refs.push(&pv.pipeline_agg);
            }
        }
        refs
    }

    pub fn hidden(mut self) -> Self {
        self.hide = true;
        self
    }
}

impl Aggregation for MetricAggregation {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        self.agg_type.as_str()
    }

    fn is_hidden(&self) -> bool {
        self.hide
    }
}

/// Default metric appended to a query: a visible `count`
pub fn default_metric(id: impl Into<String>) -> MetricAggregation {
    MetricAggregation::new(id, MetricAggregationType::Count)
}

/// A metric narrowed to a pipeline aggregation
#[derive(Debug, Clone, Copy)]
pub struct PipelineAggregation<'a> {
    agg: &'a MetricAggregation,
    multiple_bucket_paths: bool,
}

impl<'a> PipelineAggregation<'a> {
    pub(crate) fn new(agg: &'a MetricAggregation, record: &CapabilityRecord) -> Self {
        Self {
            agg,
            multiple_bucket_paths: record.supports_multiple_bucket_paths,
        }
    }

    pub fn aggregation(&self) -> &'a MetricAggregation {
        self.agg
    }

    /// Single upstream reference held in `field`
    pub fn bucket_path(&self) -> Option<&'a str> {
        self.agg.field.as_deref().filter(|f| !f.is_empty())
    }

    /// Named upstream references; empty unless the type supports several
    pub fn variables(&self) -> &'a [PipelineVariable] {
        if self.multiple_bucket_paths {
            self.agg.pipeline_variables.as_deref().unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn supports_multiple_bucket_paths(&self) -> bool {
        self.multiple_bucket_paths
    }

    /// Every metric id this aggregation consumes, in declaration order
    ///
    /// Both the bucket path and any pipeline variables count as edges, so a
    /// value still holding a stale `field` after a type change keeps its
    /// dependency visible.
    pub fn references(&self) -> Vec<&'a str> {
        self.agg.referenced_ids()
    }

    pub fn references_id(&self, id: &str) -> bool {
        self.references().contains(&id)
    }
}

/// A metric narrowed to a type that carries settings
#[derive(Debug, Clone, Copy)]
pub struct WithSettings<'a> {
    agg: &'a MetricAggregation,
    record: &'a CapabilityRecord,
}

impl<'a> WithSettings<'a> {
    pub(crate) fn new(agg: &'a MetricAggregation, record: &'a CapabilityRecord) -> Self {
        Self { agg, record }
    }

    /// Setting keys legal for this type
    pub fn keys(&self) -> &'static [&'static str] {
        self.record.settings
    }

    /// Read a setting; keys not legal for the type read as absent
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        if !self.record.allows_setting(key) {
            return None;
        }
        self.agg.settings.as_ref()?.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn script(&self) -> Option<&'a str> {
        if self.record.supports_inline_script {
            self.get_str("script")
        } else {
            None
        }
    }

    pub fn missing(&self) -> Option<&'a str> {
        if self.record.supports_missing {
            self.get_str("missing")
        } else {
            None
        }
    }

    /// Settings present on the value that its type does not allow
    pub fn illegal_keys(&self) -> Vec<&'a str> {
        self.agg
            .settings
            .iter()
            .flat_map(|s| s.keys())
            .filter(|k| !self.record.allows_setting(k))
            .map(String::as_str)
            .collect()
    }
}

/// A metric narrowed to `extended_stats`-style meta flags
#[derive(Debug, Clone, Copy)]
pub struct WithMeta<'a> {
    agg: &'a MetricAggregation,
}

impl<'a> WithMeta<'a> {
    pub(crate) fn new(agg: &'a MetricAggregation) -> Self {
        Self { agg }
    }

    /// Whether a stat is enabled, falling back to its default
    pub fn is_enabled(&self, stat: ExtendedStat) -> bool {
        self.agg
            .meta
            .as_ref()
            .and_then(|m| m.get(&stat).copied())
            .unwrap_or_else(|| stat.default_enabled())
    }

    /// Enabled stats in display order
    pub fn enabled(&self) -> Vec<ExtendedStat> {
        ExtendedStat::ALL
            .iter()
            .copied()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_parse_and_display() {
        for t in MetricAggregationType::ALL {
            assert_eq!(t.as_str().parse::<MetricAggregationType>().unwrap(), t);
            assert_eq!(t.to_string(), t.as_str());
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = "stats".parse::<MetricAggregationType>().unwrap_err();
        assert!(matches!(err, Error::UnknownAggregationType(t) if t == "stats"));
    }

    #[test]
    fn test_deserialize_unknown_type_fails() {
        let res: Result<MetricAggregation, _> =
            serde_json::from_value(json!({"id": "1", "type": "top_hits"}));
        let err = res.unwrap_err();
        assert!(err.to_string().contains("Unknown aggregation type: top_hits"));
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, t) in MetricAggregationType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let agg: MetricAggregation = serde_json::from_value(json!({
            "id": "4",
            "type": "bucket_script",
            "pipelineVariables": [{"name": "var1", "pipelineAgg": "2"}],
            "settings": {"script": "params.var1 * 2"}
        }))
        .unwrap();
        assert_eq!(agg.agg_type, MetricAggregationType::BucketScript);
        assert!(!agg.hide);
        assert_eq!(
            agg.pipeline_variables.as_deref(),
            Some(&[PipelineVariable::new("var1", "2")][..])
        );
    }

    #[test]
    fn test_serialize_omits_absent_members() {
        let value = serde_json::to_value(default_metric("1")).unwrap();
        assert_eq!(value, json!({"id": "1", "type": "count", "hide": false}));
    }

    #[test]
    fn test_pipeline_variable_without_target() {
        let pv: PipelineVariable = serde_json::from_value(json!({"name": "var1"})).unwrap();
        assert!(pv.pipeline_agg.is_empty());
    }
}
