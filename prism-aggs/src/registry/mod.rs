//! Capability registry
//!
//! The registry is the single table declaring what each metric aggregation
//! type may carry and how it behaves. Every capability predicate in the crate
//! is a pure function of this table and a value's type tag.
//!
//! Registries are plain values: build [`CapabilityRegistry::standard`] once at
//! startup (or inject a fixture through [`CapabilityRegistry::new`]) and pass
//! it to the resolver and engines.

mod bucket;

pub use bucket::{BucketCapability, BucketRegistry};

use crate::error::Error;
use crate::model::metric::{
    MetricAggregation, MetricAggregationType, PipelineAggregation, WithMeta, WithSettings,
};
use crate::Result;
use serde::Serialize;

/// Capabilities of one metric aggregation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityRecord {
    pub label: &'static str,
    pub requires_field: bool,
    pub supports_inline_script: bool,
    pub supports_missing: bool,
    pub is_pipeline_agg: bool,
    pub supports_multiple_bucket_paths: bool,
    /// Lowest backend version offering the type; `None` means always available
    pub min_version: Option<u32>,
    pub is_single_metric: bool,
    pub has_settings: bool,
    pub has_meta: bool,
    /// Setting keys legal for the type
    pub settings: &'static [&'static str],
}

impl CapabilityRecord {
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            requires_field: false,
            supports_inline_script: false,
            supports_missing: false,
            is_pipeline_agg: false,
            supports_multiple_bucket_paths: false,
            min_version: None,
            is_single_metric: false,
            has_settings: false,
            has_meta: false,
            settings: &[],
        }
    }

    pub const fn requires_field(mut self) -> Self {
        self.requires_field = true;
        self
    }

    pub const fn inline_script(mut self) -> Self {
        self.supports_inline_script = true;
        self
    }

    pub const fn missing(mut self) -> Self {
        self.supports_missing = true;
        self
    }

    pub const fn pipeline(mut self) -> Self {
        self.is_pipeline_agg = true;
        self
    }

    pub const fn multiple_bucket_paths(mut self) -> Self {
        self.supports_multiple_bucket_paths = true;
        self
    }

    pub const fn min_version(mut self, version: u32) -> Self {
        self.min_version = Some(version);
        self
    }

    pub const fn single_metric(mut self) -> Self {
        self.is_single_metric = true;
        self
    }

    pub const fn meta(mut self) -> Self {
        self.has_meta = true;
        self
    }

    pub const fn settings(mut self, keys: &'static [&'static str]) -> Self {
        self.has_settings = !keys.is_empty();
        self.settings = keys;
        self
    }

    pub fn allows_setting(&self, key: &str) -> bool {
        self.has_settings && self.settings.contains(&key)
    }

    /// Offered by a backend running `version`
    pub fn is_available_in(&self, version: u32) -> bool {
        self.min_version.map_or(true, |min| min <= version)
    }
}

/// Capabilities of the built-in metric types
fn standard_record(agg_type: MetricAggregationType) -> CapabilityRecord {
    use MetricAggregationType::*;

    const FIELD_STATS: &[&str] = &["script", "missing"];

    match agg_type {
        Count => CapabilityRecord::new("Count"),
        Avg => CapabilityRecord::new("Average")
            .requires_field()
            .inline_script()
            .missing()
            .settings(FIELD_STATS),
        Sum => CapabilityRecord::new("Sum")
            .requires_field()
            .inline_script()
            .missing()
            .settings(FIELD_STATS),
        Max => CapabilityRecord::new("Max")
            .requires_field()
            .inline_script()
            .missing()
            .settings(FIELD_STATS),
        Min => CapabilityRecord::new("Min")
            .requires_field()
            .inline_script()
            .missing()
            .settings(FIELD_STATS),
        ExtendedStats => CapabilityRecord::new("Extended Stats")
            .requires_field()
            .inline_script()
            .missing()
            .meta()
            .settings(&["script", "missing", "sigma"]),
        Percentiles => CapabilityRecord::new("Percentiles")
            .requires_field()
            .inline_script()
            .missing()
            .settings(&["percents", "script", "missing"]),
        Cardinality => CapabilityRecord::new("Unique Count")
            .requires_field()
            .missing()
            .settings(&["precision_threshold", "missing"]),
        MovingAvg => CapabilityRecord::new("Moving Average")
            .pipeline()
            .min_version(2)
            .settings(&[
                "model", "window", "predict", "minimize", "alpha", "beta", "gamma", "period",
                "pad",
            ]),
        Derivative => CapabilityRecord::new("Derivative")
            .pipeline()
            .min_version(2)
            .settings(&["unit"]),
        CumulativeSum => CapabilityRecord::new("Cumulative Sum")
            .pipeline()
            .min_version(2)
            .settings(&["format"]),
        BucketScript => CapabilityRecord::new("Bucket Script")
            .pipeline()
            .multiple_bucket_paths()
            .min_version(2)
            .settings(&["script"]),
        RawDocument => CapabilityRecord::new("Raw Document (legacy)")
            .single_metric()
            .settings(&["size"]),
        RawData => CapabilityRecord::new("Raw Data")
            .single_metric()
            .settings(&["size"]),
        Logs => CapabilityRecord::new("Logs"),
    }
}

/// Order in which the built-in types are offered to a picker
const STANDARD_ORDER: [MetricAggregationType; 15] = {
    use MetricAggregationType::*;
    [
        Count,
        Avg,
        Sum,
        Max,
        Min,
        ExtendedStats,
        Percentiles,
        Cardinality,
        MovingAvg,
        Derivative,
        CumulativeSum,
        BucketScript,
        RawDocument,
        RawData,
        Logs,
    ]
};

/// Label/value pair for a type picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeOption {
    pub label: &'static str,
    pub value: MetricAggregationType,
}

/// Metric capability table
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityRegistry {
    /// Declaration order
    order: Vec<MetricAggregationType>,
    /// Indexed by `MetricAggregationType::index`
    records: Vec<CapabilityRecord>,
}

impl CapabilityRegistry {
    /// Build a registry from declared rows
    ///
    /// Row order becomes the declaration order. Every metric type must be
    /// declared exactly once, and a record's `has_settings` flag must agree
    /// with its list of setting keys.
    pub fn new<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (MetricAggregationType, CapabilityRecord)>,
    {
        let mut slots: Vec<Option<CapabilityRecord>> =
            vec![None; MetricAggregationType::ALL.len()];
        let mut order = Vec::with_capacity(slots.len());

        for (agg_type, record) in rows {
            if record.has_settings == record.settings.is_empty() {
                return Err(Error::InconsistentRegistryEntry(agg_type.to_string()));
            }
            let slot = &mut slots[agg_type.index()];
            if slot.is_some() {
                return Err(Error::DuplicateRegistryEntry(agg_type.to_string()));
            }
            *slot = Some(record);
            order.push(agg_type);
        }

        let records = slots
            .into_iter()
            .zip(MetricAggregationType::ALL)
            .map(|(slot, agg_type)| {
                slot.ok_or_else(|| Error::IncompleteRegistry(agg_type.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { order, records })
    }

    /// The built-in table
    pub fn standard() -> Self {
        Self {
            order: STANDARD_ORDER.to_vec(),
            records: MetricAggregationType::ALL
                .iter()
                .map(|t| standard_record(*t))
                .collect(),
        }
    }

    /// Record for `agg_type`; total over every declared type
    pub fn lookup(&self, agg_type: MetricAggregationType) -> &CapabilityRecord {
        &self.records[agg_type.index()]
    }

    /// Rows in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (MetricAggregationType, &CapabilityRecord)> + '_ {
        self.order.iter().map(move |t| (*t, self.lookup(*t)))
    }

    pub fn label(&self, agg_type: MetricAggregationType) -> &'static str {
        self.lookup(agg_type).label
    }

    // Predicates over values. Each reads only the type tag.

    pub fn has_field(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).requires_field
    }

    pub fn is_pipeline(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).is_pipeline_agg
    }

    pub fn has_multiple_bucket_paths(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).supports_multiple_bucket_paths
    }

    pub fn supports_missing(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).supports_missing
    }

    pub fn has_settings(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).has_settings
    }

    pub fn has_meta(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).has_meta
    }

    pub fn supports_inline_script(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).supports_inline_script
    }

    pub fn is_single_metric(&self, agg: &MetricAggregation) -> bool {
        self.lookup(agg.agg_type).is_single_metric
    }

    /// Computed from documents rather than from other aggregations, and not `count`
    pub fn is_basic_aggregation(&self, agg: &MetricAggregation) -> bool {
        agg.agg_type != MetricAggregationType::Count && !self.is_pipeline(agg)
    }

    // Narrowing guards. `Some` exactly when the matching predicate holds.

    pub fn as_pipeline<'a>(&self, agg: &'a MetricAggregation) -> Option<PipelineAggregation<'a>> {
        let record = self.lookup(agg.agg_type);
        record
            .is_pipeline_agg
            .then(|| PipelineAggregation::new(agg, record))
    }

    pub fn as_with_settings<'a>(&'a self, agg: &'a MetricAggregation) -> Option<WithSettings<'a>> {
        let record = self.lookup(agg.agg_type);
        record.has_settings.then(|| WithSettings::new(agg, record))
    }

    pub fn as_with_meta<'a>(&self, agg: &'a MetricAggregation) -> Option<WithMeta<'a>> {
        self.has_meta(agg).then(|| WithMeta::new(agg))
    }

    /// Types a picker may offer after `previous`, in declaration order
    ///
    /// Types newer than `backend_version` are dropped. Pipeline types are
    /// offered only once some earlier metric is a basic aggregation.
    pub fn available_types(
        &self,
        previous: &[MetricAggregation],
        backend_version: u32,
    ) -> Vec<MetricAggregationType> {
        let include_pipeline = previous.iter().any(|m| self.is_basic_aggregation(m));

        self.iter()
            .filter(|(_, record)| record.is_available_in(backend_version))
            .filter(|(_, record)| include_pipeline || !record.is_pipeline_agg)
            .map(|(agg_type, _)| agg_type)
            .collect()
    }

    /// [`available_types`](Self::available_types) with labels attached
    pub fn type_options(
        &self,
        previous: &[MetricAggregation],
        backend_version: u32,
    ) -> Vec<TypeOption> {
        self.available_types(previous, backend_version)
            .into_iter()
            .map(|value| TypeOption {
                label: self.label(value),
                value,
            })
            .collect()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
