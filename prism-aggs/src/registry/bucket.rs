//! Bucket capability table

use crate::model::bucket::{BucketAggregation, BucketAggregationType};
use crate::model::settings::Settings;
use serde::Serialize;
use serde_json::{json, Value};

/// Capabilities of one bucket aggregation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCapability {
    pub label: &'static str,
    pub requires_field: bool,
    pub settings: &'static [&'static str],
}

impl BucketCapability {
    pub fn has_settings(&self) -> bool {
        !self.settings.is_empty()
    }

    pub fn allows_setting(&self, key: &str) -> bool {
        self.settings.contains(&key)
    }
}

fn standard_capability(agg_type: BucketAggregationType) -> BucketCapability {
    use BucketAggregationType::*;

    match agg_type {
        Terms => BucketCapability {
            label: "Terms",
            requires_field: true,
            settings: &["order", "size", "min_doc_count", "orderBy", "missing"],
        },
        Filters => BucketCapability {
            label: "Filters",
            requires_field: false,
            settings: &["filters"],
        },
        GeohashGrid => BucketCapability {
            label: "Geo Hash Grid",
            requires_field: true,
            settings: &["precision"],
        },
        DateHistogram => BucketCapability {
            label: "Date Histogram",
            requires_field: true,
            settings: &["interval", "min_doc_count", "trimEdges", "offset"],
        },
        Histogram => BucketCapability {
            label: "Histogram",
            requires_field: true,
            settings: &["interval", "min_doc_count"],
        },
    }
}

/// Settings a freshly created bucket of `agg_type` starts with
fn standard_defaults(agg_type: BucketAggregationType) -> Vec<(&'static str, Value)> {
    use BucketAggregationType::*;

    match agg_type {
        Terms => vec![
            ("size", json!("10")),
            ("order", json!("desc")),
            ("orderBy", json!("_term")),
            ("min_doc_count", json!("0")),
        ],
        Filters => vec![("filters", json!([{"query": "*", "label": ""}]))],
        GeohashGrid => vec![("precision", json!("3"))],
        DateHistogram => vec![("interval", json!("auto"))],
        Histogram => vec![("interval", json!("1000")), ("min_doc_count", json!("0"))],
    }
}

/// Bucket capability table
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRegistry {
    records: Vec<BucketCapability>,
}

impl BucketRegistry {
    pub fn standard() -> Self {
        Self {
            records: BucketAggregationType::ALL
                .iter()
                .map(|t| standard_capability(*t))
                .collect(),
        }
    }

    pub fn lookup(&self, agg_type: BucketAggregationType) -> &BucketCapability {
        &self.records[agg_type.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (BucketAggregationType, &BucketCapability)> + '_ {
        BucketAggregationType::ALL
            .iter()
            .map(move |t| (*t, self.lookup(*t)))
    }

    pub fn has_field(&self, agg: &BucketAggregation) -> bool {
        self.lookup(agg.agg_type).requires_field
    }

    pub fn has_settings(&self, agg: &BucketAggregation) -> bool {
        self.lookup(agg.agg_type).has_settings()
    }

    /// Default settings for a new bucket of `agg_type`
    pub fn default_settings(&self, agg_type: BucketAggregationType) -> Settings {
        standard_defaults(agg_type)
            .into_iter()
            .filter(|(k, _)| self.lookup(agg_type).allows_setting(k))
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
