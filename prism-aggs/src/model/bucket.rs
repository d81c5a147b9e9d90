//! Bucket aggregations
//!
//! Buckets partition matched documents; they never reference each other, so
//! their list has no dependency graph.

use crate::error::Error;
use crate::model::settings::Settings;
use crate::model::Aggregation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Bucket aggregation type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BucketAggregationType {
    Terms,
    Filters,
    GeohashGrid,
    DateHistogram,
    Histogram,
}

impl BucketAggregationType {
    pub const ALL: [BucketAggregationType; 5] = [
        Self::Terms,
        Self::Filters,
        Self::GeohashGrid,
        Self::DateHistogram,
        Self::Histogram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terms => "terms",
            Self::Filters => "filters",
            Self::GeohashGrid => "geohash_grid",
            Self::DateHistogram => "date_histogram",
            Self::Histogram => "histogram",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BucketAggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketAggregationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownAggregationType(s.to_string()))
    }
}

impl TryFrom<String> for BucketAggregationType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BucketAggregationType> for String {
    fn from(value: BucketAggregationType) -> Self {
        value.as_str().to_string()
    }
}

/// A bucket aggregation as stored in a query's bucket list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAggregation {
    pub id: String,

    #[serde(rename = "type")]
    pub agg_type: BucketAggregationType,

    #[serde(default)]
    pub hide: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl BucketAggregation {
    pub fn new(id: impl Into<String>, agg_type: BucketAggregationType) -> Self {
        Self {
            id: id.into(),
            agg_type,
            hide: false,
            field: None,
            settings: None,
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
}

impl Aggregation for BucketAggregation {
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

/// Default bucket appended to a query: an auto-interval `date_histogram`
pub fn default_bucket(id: impl Into<String>) -> BucketAggregation {
    BucketAggregation::new(id, BucketAggregationType::DateHistogram)
        .with_setting("interval", json!("auto"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bucket() {
        let b = default_bucket("2");
        assert_eq!(b.agg_type, BucketAggregationType::DateHistogram);
        assert_eq!(
            serde_json::to_value(&b).unwrap(),
            json!({"id": "2", "type": "date_histogram", "hide": false, "settings": {"interval": "auto"}})
        );
    }

    #[test]
    fn test_bucket_type_parse() {
        assert_eq!(
            "geohash_grid".parse::<BucketAggregationType>().unwrap(),
            BucketAggregationType::GeohashGrid
        );
        assert!(matches!(
            "range".parse::<BucketAggregationType>(),
            Err(Error::UnknownAggregationType(_))
        ));
    }
}
