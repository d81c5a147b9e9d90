//! Aggregation query model for Prism's Elasticsearch query editor
//!
//! A query holds an ordered list of metric aggregations and an ordered list
//! of bucket aggregations. This crate models those lists and the edits made
//! to them:
//!
//! - [`registry`] - capability tables declaring, per aggregation type, which
//!   members and behaviours are legal, and which backend versions offer it
//! - [`model`] - the aggregation values themselves, their wire shape, and
//!   typed narrowing views obtained through the registry
//! - [`resolver`] - dependency resolution for pipeline aggregations:
//!   blocked references, cascading descendants, cycle detection
//! - [`engine`] - pure state transitions (`(list, action) -> list`)
//! - [`options`] - option tables and metric descriptions for pickers
//!
//! ```
//! use prism_aggs::engine::{MetricAction, MetricsEngine};
//! use prism_aggs::model::{default_metric, MetricAggregationType};
//! use prism_aggs::registry::CapabilityRegistry;
//! use std::sync::Arc;
//!
//! let engine = MetricsEngine::new(Arc::new(CapabilityRegistry::standard()));
//! let metrics = engine.reduce(&[default_metric("1")], MetricAction::Add);
//! let metrics = engine.reduce(
//!     &metrics,
//!     MetricAction::ChangeType { id: "2".into(), agg_type: MetricAggregationType::Avg },
//! );
//! assert_eq!(metrics[1].agg_type, MetricAggregationType::Avg);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod options;
pub mod registry;
pub mod resolver;

pub use config::Config;
pub use engine::{BucketAction, BucketsEngine, MetricAction, MetricsEngine, TypeChangePolicy};
pub use error::Error;
pub use model::{
    BucketAggregation, BucketAggregationType, ElasticsearchQuery, MetricAggregation,
    MetricAggregationType, PipelineVariable,
};
pub use registry::{BucketRegistry, CapabilityRecord, CapabilityRegistry};
pub use resolver::{ancestors_of, descendants_of, reference_options, Ancestors};

/// Result type for aggregation model operations
pub type Result<T> = std::result::Result<T, Error>;
