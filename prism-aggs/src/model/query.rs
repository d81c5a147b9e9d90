//! Query document holding the metric and bucket lists
//!
//! Values carry no derived or cached members: what is serialized is exactly
//! what is held in memory, so a query round-trips through JSON unchanged.

use crate::model::bucket::{default_bucket, BucketAggregation};
use crate::model::metric::{default_metric, MetricAggregation};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Elasticsearch query target as persisted inside a dashboard document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Lucene query string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default)]
    pub metrics: Vec<MetricAggregation>,

    #[serde(default)]
    pub bucket_aggs: Vec<BucketAggregation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_logs_query: Option<bool>,
}

impl Default for ElasticsearchQuery {
    /// A fresh query seeded with one `count` metric and one date histogram
    fn default() -> Self {
        Self {
            ref_id: None,
            alias: None,
            query: None,
            metrics: vec![default_metric("1")],
            bucket_aggs: vec![default_bucket("2")],
            time_field: None,
            is_logs_query: None,
        }
    }
}

impl ElasticsearchQuery {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
