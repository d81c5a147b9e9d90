//! State transitions for bucket lists
//!
//! Same contract as the metric engine, without dependency tracking: buckets
//! never reference each other, so removal does not cascade.

use super::TypeChangePolicy;
use crate::config::EditorConfig;
use crate::model::bucket::{BucketAggregation, BucketAggregationType};
use crate::model::settings::{merge_setting, Settings};
use crate::model::{next_id, position_of};
use crate::registry::BucketRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Edit dispatched against a bucket list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BucketAction {
    Add,
    Remove {
        id: String,
    },
    ChangeType {
        id: String,
        #[serde(rename = "type")]
        agg_type: BucketAggregationType,
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
}

/// Applies [`BucketAction`]s to bucket lists
#[derive(Debug, Clone)]
pub struct BucketsEngine {
    registry: Arc<BucketRegistry>,
    policy: TypeChangePolicy,
}

impl BucketsEngine {
    pub fn new(registry: Arc<BucketRegistry>) -> Self {
        Self {
            registry,
            policy: TypeChangePolicy::default(),
        }
    }

    pub fn from_config(registry: Arc<BucketRegistry>, config: &EditorConfig) -> Self {
        Self::new(registry).with_policy(config.into())
    }

    pub fn with_policy(mut self, policy: TypeChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reduce(&self, state: &[BucketAggregation], action: BucketAction) -> Vec<BucketAggregation> {
        match action {
            BucketAction::Add => self.add(state),
            BucketAction::Remove { id } => self.remove(state, &id),
            BucketAction::ChangeType { id, agg_type } => self.change_type(state, &id, agg_type),
            BucketAction::ChangeField { id, field } => self.change_field(state, &id, field),
            BucketAction::ToggleVisibility { id } => self.toggle_visibility(state, &id),
            BucketAction::ChangeSetting { id, setting, value } => {
                self.change_setting(state, &id, &setting, value)
            }
        }
    }

    /// Append a default date histogram with the next numeric id
    pub fn add(&self, state: &[BucketAggregation]) -> Vec<BucketAggregation> {
        let agg_type = BucketAggregationType::DateHistogram;
        let mut bucket = BucketAggregation::new(next_id(state), agg_type);
        bucket.settings = Some(self.registry.default_settings(agg_type));

        let mut next = state.to_vec();
        next.push(bucket);
        next
    }

    pub fn remove(&self, state: &[BucketAggregation], id: &str) -> Vec<BucketAggregation> {
        if position_of(state, id).is_none() {
            debug!(id, "remove: no such bucket");
        }
        state.iter().filter(|b| b.id != id).cloned().collect()
    }

    pub fn change_type(
        &self,
        state: &[BucketAggregation],
        id: &str,
        agg_type: BucketAggregationType,
    ) -> Vec<BucketAggregation> {
        self.update(state, id, |bucket| {
            bucket.agg_type = agg_type;
            if self.policy == TypeChangePolicy::Prune {
                let capability = self.registry.lookup(agg_type);
                if !capability.requires_field {
                    bucket.field = None;
                }
                if let Some(settings) = bucket.settings.as_mut() {
                    settings.retain(|k, _| capability.allows_setting(k));
                }
                if bucket.settings.as_ref().is_some_and(|s| s.is_empty()) {
                    bucket.settings = None;
                }
            }
        })
    }

    pub fn change_field(&self, state: &[BucketAggregation], id: &str, field: String) -> Vec<BucketAggregation> {
        self.update(state, id, |bucket| bucket.field = Some(field))
    }

    pub fn toggle_visibility(&self, state: &[BucketAggregation], id: &str) -> Vec<BucketAggregation> {
        self.update(state, id, |bucket| bucket.hide = !bucket.hide)
    }

    /// Merge one setting; ignored unless the type allows that key
    pub fn change_setting(
        &self,
        state: &[BucketAggregation],
        id: &str,
        setting: &str,
        value: Value,
    ) -> Vec<BucketAggregation> {
        self.update(state, id, |bucket| {
            if !self.registry.lookup(bucket.agg_type).allows_setting(setting) {
                debug!(id, setting, agg_type = %bucket.agg_type, "setting not supported, ignoring");
                return;
            }
            merge_setting(bucket.settings.get_or_insert_with(Settings::new), setting, value);
        })
    }

    fn update<F>(&self, state: &[BucketAggregation], id: &str, edit: F) -> Vec<BucketAggregation>
    where
        F: FnOnce(&mut BucketAggregation),
    {
        let mut next = state.to_vec();
        match next.iter_mut().find(|b| b.id == id) {
            Some(bucket) => edit(bucket),
            None => debug!(id, "no such bucket, ignoring edit"),
        }
        next
    }
}
