//! State transitions for a query's aggregation lists
//!
//! Every operation takes the current list by reference and returns a new
//! one; the input is never touched, so an earlier list stays valid for any
//! consumer still holding it. Operations are total: misuse that the editor
//! should already have prevented (a setting on a type without settings, an
//! unknown id) leaves the list unchanged instead of failing.

mod bucket;

pub use bucket::{BucketAction, BucketsEngine};

use crate::config::EditorConfig;
use crate::model::metric::{default_metric, MetricAggregation, MetricAggregationType};
use crate::model::settings::{merge_setting, ExtendedStat, Meta, Settings};
use crate::model::{next_id, position_of};
use crate::registry::CapabilityRegistry;
use crate::resolver::descendants_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// What happens to members that stop being legal when a type changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeChangePolicy {
    /// Keep `field`, settings, meta and pipeline variables as they were.
    /// Readers must expect stale members on a value mid-edit.
    #[default]
    Preserve,
    /// Drop whatever the new type's capabilities do not allow
    Prune,
}

impl From<&EditorConfig> for TypeChangePolicy {
    fn from(config: &EditorConfig) -> Self {
        if config.prune_on_type_change {
            Self::Prune
        } else {
            Self::Preserve
        }
    }
}

/// Edit dispatched against a metric list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricAction {
    Add,
    Remove {
        id: String,
    },
    ChangeType {
        id: String,
        #[serde(rename = "type")]
        agg_type: MetricAggregationType,
    },
    ChangeField {
        id: String,
        field: String,
    },
    ToggleVisibility {
        id: String,
    },
    ChangeSetting {
        id: String,
        setting: String,
        value: Value,
    },
    ChangeMeta {
        id: String,
        meta: ExtendedStat,
        value: bool,
    },
}

/// Applies [`MetricAction`]s to metric lists
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    registry: Arc<CapabilityRegistry>,
    policy: TypeChangePolicy,
}

impl MetricsEngine {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            policy: TypeChangePolicy::default(),
        }
    }

    pub fn from_config(registry: Arc<CapabilityRegistry>, config: &EditorConfig) -> Self {
        Self::new(registry).with_policy(config.into())
    }

    pub fn with_policy(mut self, policy: TypeChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn policy(&self) -> TypeChangePolicy {
        self.policy
    }

    /// Apply one action
    pub fn reduce(&self, state: &[MetricAggregation], action: MetricAction) -> Vec<MetricAggregation> {
        match action {
            MetricAction::Add => self.add(state),
            MetricAction::Remove { id } => self.remove(state, &id),
            MetricAction::ChangeType { id, agg_type } => self.change_type(state, &id, agg_type),
            MetricAction::ChangeField { id, field } => self.change_field(state, &id, field),
            MetricAction::ToggleVisibility { id } => self.toggle_visibility(state, &id),
            MetricAction::ChangeSetting { id, setting, value } => {
                self.change_setting(state, &id, &setting, value)
            }
            MetricAction::ChangeMeta { id, meta, value } => self.change_meta(state, &id, meta, value),
        }
    }

    /// Append a default `count` with the next numeric id
    pub fn add(&self, state: &[MetricAggregation]) -> Vec<MetricAggregation> {
        let mut next = state.to_vec();
        next.push(default_metric(next_id(state)));
        next
    }

    /// Remove `id` together with every metric depending on it
    pub fn remove(&self, state: &[MetricAggregation], id: &str) -> Vec<MetricAggregation> {
        if position_of(state, id).is_none() {
            debug!(id, "remove: no such metric");
            return state.to_vec();
        }

        let descendants = descendants_of(state, id);
        let doomed: HashSet<&str> = descendants
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(id))
            .collect();

        if !descendants.is_empty() {
            debug!(id, cascade = ?descendants, "removing dependent metrics");
        }
        state
            .iter()
            .filter(|m| !doomed.contains(m.id.as_str()))
            .cloned()
            .collect()
    }

    pub fn change_type(
        &self,
        state: &[MetricAggregation],
        id: &str,
        agg_type: MetricAggregationType,
    ) -> Vec<MetricAggregation> {
        self.update(state, id, |metric| {
            metric.agg_type = agg_type;
            if self.policy == TypeChangePolicy::Prune {
                prune(&self.registry, metric);
            }
        })
    }

    /// Set the document field, or for pipeline types the referenced metric id
    pub fn change_field(
        &self,
        state: &[MetricAggregation],
        id: &str,
        field: String,
    ) -> Vec<MetricAggregation> {
        self.update(state, id, |metric| metric.field = Some(field))
    }

    pub fn toggle_visibility(&self, state: &[MetricAggregation], id: &str) -> Vec<MetricAggregation> {
        self.update(state, id, |metric| metric.hide = !metric.hide)
    }

    /// Merge one setting; ignored unless the type allows that key
    pub fn change_setting(
        &self,
        state: &[MetricAggregation],
        id: &str,
        setting: &str,
        value: Value,
    ) -> Vec<MetricAggregation> {
        self.update(state, id, |metric| {
            let record = self.registry.lookup(metric.agg_type);
            if !record.allows_setting(setting) {
                debug!(id, setting, agg_type = %metric.agg_type, "setting not supported, ignoring");
                return;
            }
            merge_setting(metric.settings.get_or_insert_with(Settings::new), setting, value);
        })
    }

    /// Set one meta flag; ignored unless the type carries meta
    pub fn change_meta(
        &self,
        state: &[MetricAggregation],
        id: &str,
        stat: ExtendedStat,
        value: bool,
    ) -> Vec<MetricAggregation> {
        self.update(state, id, |metric| {
            if !self.registry.has_meta(metric) {
                debug!(id, agg_type = %metric.agg_type, "meta not supported, ignoring");
                return;
            }
            metric.meta.get_or_insert_with(Meta::new).insert(stat, value);
        })
    }

    /// Copy `state`, applying `edit` to the metric with `id`
    fn update<F>(&self, state: &[MetricAggregation], id: &str, edit: F) -> Vec<MetricAggregation>
    where
        F: FnOnce(&mut MetricAggregation),
    {
        let mut next = state.to_vec();
        match next.iter_mut().find(|m| m.id == id) {
            Some(metric) => edit(metric),
            None => debug!(id, "no such metric, ignoring edit"),
        }
        next
    }
}

/// Drop members the metric's current type does not allow
fn prune(registry: &CapabilityRegistry, metric: &mut MetricAggregation) {
    let record = registry.lookup(metric.agg_type);

    if !record.requires_field && !record.is_pipeline_agg {
        metric.field = None;
    }
    if !record.supports_multiple_bucket_paths {
        metric.pipeline_variables = None;
    }
    if !record.has_meta {
        metric.meta = None;
    }
    if let Some(settings) = metric.settings.as_mut() {
        settings.retain(|k, _| record.allows_setting(k));
    }
    if metric.settings.as_ref().is_some_and(|s| s.is_empty()) {
        metric.settings = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metric::MetricAggregationType::*;
    use crate::model::metric::PipelineVariable;
    use serde_json::json;

    fn engine() -> MetricsEngine {
        MetricsEngine::new(Arc::new(CapabilityRegistry::standard()))
    }

    #[test]
    fn test_add_appends_count_with_next_id() {
        let state = vec![default_metric("1")];
        let next = engine().add(&state);
        assert_eq!(next.len(), 2);
        assert_eq!(next[1], default_metric("2"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_add_on_empty_list_starts_at_one() {
        let next = engine().add(&[]);
        assert_eq!(next, vec![default_metric("1")]);
    }

    #[test]
    fn test_add_after_largest_possible_id() {
        let state = vec![default_metric(u64::MAX.to_string())];
        let next = engine().add(&state);
        assert_eq!(next[1], default_metric("1"));
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let state = vec![default_metric("1")];
        assert_eq!(engine().remove(&state, "9"), state);
    }

    #[test]
    fn test_remove_cascades() {
        let state = vec![
            default_metric("1"),
            MetricAggregation::new("2", Avg).with_field("value"),
            MetricAggregation::new("3", Derivative).with_field("2"),
            MetricAggregation::new("4", Max).with_field("value"),
            MetricAggregation::new("5", BucketScript)
                .with_pipeline_variables(vec![PipelineVariable::new("var1", "3")]),
        ];
        let next = engine().remove(&state, "2");
        let ids: Vec<_> = next.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_remove_cascades_through_stale_reference() {
        let e = engine();
        let state = vec![
            MetricAggregation::new("1", Avg).with_field("value"),
            MetricAggregation::new("2", MovingAvg).with_field("1"),
        ];
        let state = e.change_type(&state, "2", Sum);
        assert_eq!(state[1].field.as_deref(), Some("1"));

        let next = e.remove(&state, "1");
        assert!(next.is_empty());
    }

    #[test]
    fn test_change_type_preserves_stale_members() {
        let state = vec![MetricAggregation::new("1", Avg)
            .with_field("value")
            .with_setting("script", json!("_value * 2"))];
        let next = engine().change_type(&state, "1", Count);
        assert_eq!(next[0].agg_type, Count);
        assert_eq!(next[0].field.as_deref(), Some("value"));
        assert!(next[0].settings.is_some());
    }

    #[test]
    fn test_change_type_prune_policy() {
        let state = vec![MetricAggregation::new("1", ExtendedStats)
            .with_field("value")
            .with_setting("script", json!("_value"))
            .with_setting("sigma", json!("3"))
            .with_meta(ExtendedStat::Sum, true)];
        let engine = engine().with_policy(TypeChangePolicy::Prune);

        let avg = engine.change_type(&state, "1", Avg);
        assert_eq!(avg[0].field.as_deref(), Some("value"));
        assert_eq!(avg[0].meta, None);
        let settings = avg[0].settings.as_ref().unwrap();
        assert!(settings.contains_key("script"));
        assert!(!settings.contains_key("sigma"));

        let count = engine.change_type(&state, "1", Count);
        assert_eq!(count[0], MetricAggregation::new("1", Count));
    }

    #[test]
    fn test_change_field_and_toggle() {
        let e = engine();
        let state = vec![MetricAggregation::new("1", Avg)];
        let next = e.change_field(&state, "1", "latency".to_string());
        assert_eq!(next[0].field.as_deref(), Some("latency"));
        let hidden = e.toggle_visibility(&next, "1");
        assert!(hidden[0].hide);
        assert!(!e.toggle_visibility(&hidden, "1")[0].hide);
    }

    #[test]
    fn test_change_setting_merges() {
        let e = engine();
        let state = vec![MetricAggregation::new("1", MovingAvg).with_field("2")];
        let next = e.change_setting(&state, "1", "window", json!("5"));
        let next = e.change_setting(&next, "1", "model", json!("holt"));
        let settings = next[0].settings.as_ref().unwrap();
        assert_eq!(settings.get("window"), Some(&json!("5")));
        assert_eq!(settings.get("model"), Some(&json!("holt")));
    }

    #[test]
    fn test_change_setting_on_type_without_settings_is_noop() {
        let state = vec![default_metric("1")];
        assert_eq!(engine().change_setting(&state, "1", "script", json!("x")), state);
    }

    #[test]
    fn test_change_setting_rejects_foreign_key() {
        let state = vec![MetricAggregation::new("1", Cardinality)];
        assert_eq!(engine().change_setting(&state, "1", "sigma", json!("2")), state);
    }

    #[test]
    fn test_change_meta() {
        let e = engine();
        let stats = vec![MetricAggregation::new("1", ExtendedStats)];
        let next = e.change_meta(&stats, "1", ExtendedStat::StdDeviation, false);
        assert_eq!(
            next[0].meta.as_ref().unwrap().get(&ExtendedStat::StdDeviation),
            Some(&false)
        );

        let avg = vec![MetricAggregation::new("1", Avg)];
        assert_eq!(e.change_meta(&avg, "1", ExtendedStat::Avg, false), avg);
    }

    #[test]
    fn test_action_wire_shape() {
        let action: MetricAction = serde_json::from_value(json!({
            "type": "change_type",
            "payload": {"id": "2", "type": "percentiles"}
        }))
        .unwrap();
        assert_eq!(
            action,
            MetricAction::ChangeType {
                id: "2".to_string(),
                agg_type: Percentiles
            }
        );
        let add: MetricAction = serde_json::from_value(json!({"type": "add"})).unwrap();
        assert_eq!(add, MetricAction::Add);
    }

    #[test]
    fn test_policy_from_config() {
        let config = EditorConfig {
            prune_on_type_change: true,
        };
        let e = MetricsEngine::from_config(Arc::new(CapabilityRegistry::standard()), &config);
        assert_eq!(e.policy(), TypeChangePolicy::Prune);
    }
}
