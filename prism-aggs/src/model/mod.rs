//! Aggregation data model

pub mod bucket;
pub mod metric;
pub mod query;
pub mod settings;

pub use bucket::{default_bucket, BucketAggregation, BucketAggregationType};
pub use metric::{
    default_metric, MetricAggregation, MetricAggregationType, PipelineAggregation,
    PipelineVariable, WithMeta, WithSettings,
};
pub use query::ElasticsearchQuery;
pub use settings::{merge_setting, ExtendedStat, Meta, ModelSetting, MovingAverageModel, Settings};

use std::collections::HashSet;

/// Members shared by metric and bucket aggregations
pub trait Aggregation {
    /// Id, unique within the aggregation's own list
    fn id(&self) -> &str;

    /// Wire name of the type tag
    fn type_name(&self) -> &'static str;

    fn is_hidden(&self) -> bool;
}

/// Id for the next aggregation appended to `list`
///
/// One past the largest numeric id present. Non-numeric ids are ignored and
/// an empty list starts at `1`. When the largest id is `u64::MAX`, the
/// smallest unused positive id is taken instead.
pub fn next_id<A: Aggregation>(list: &[A]) -> String {
    let used: HashSet<u64> = list
        .iter()
        .filter_map(|a| a.id().parse::<u64>().ok())
        .collect();
    let max = used.iter().copied().max().unwrap_or(0);
    match max.checked_add(1) {
        Some(next) => next.to_string(),
        None => (1..=u64::MAX)
            .find(|n| !used.contains(n))
            .unwrap_or_default()
            .to_string(),
    }
}

/// Position of the aggregation with `id`
pub fn position_of<A: Aggregation>(list: &[A], id: &str) -> Option<usize> {
    list.iter().position(|a| a.id() == id)
}

pub fn find_by_id<'a, A: Aggregation>(list: &'a [A], id: &str) -> Option<&'a A> {
    list.iter().find(|a| a.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_empty_starts_at_one() {
        let list: Vec<MetricAggregation> = vec![];
        assert_eq!(next_id(&list), "1");
    }

    #[test]
    fn test_next_id_uses_max_not_last() {
        let list = vec![default_metric("7"), default_metric("3")];
        assert_eq!(next_id(&list), "8");
    }

    #[test]
    fn test_next_id_ignores_non_numeric() {
        let list = vec![default_metric("a"), default_metric("2")];
        assert_eq!(next_id(&list), "3");
        let only_text = vec![default_metric("x")];
        assert_eq!(next_id(&only_text), "1");
    }

    #[test]
    fn test_next_id_at_u64_max_reuses_a_gap() {
        let list = vec![default_metric(u64::MAX.to_string())];
        assert_eq!(next_id(&list), "1");

        let list = vec![
            default_metric("1"),
            default_metric(u64::MAX.to_string()),
            default_metric("2"),
        ];
        assert_eq!(next_id(&list), "3");
    }

    #[test]
    fn test_position_and_find() {
        let list = vec![default_bucket("2"), default_bucket("5")];
        assert_eq!(position_of(&list, "5"), Some(1));
        assert_eq!(position_of(&list, "9"), None);
        assert_eq!(find_by_id(&list, "2").map(|b| b.id.as_str()), Some("2"));
    }
}
