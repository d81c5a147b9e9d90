//! Aggregation settings, meta flags and their option tables

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form settings record; legal keys are declared per type by the registry
pub type Settings = serde_json::Map<String, Value>;

/// Per-stat visibility flags of an `extended_stats` metric
pub type Meta = BTreeMap<ExtendedStat, bool>;

/// Insert `value` under `key`, merging nested objects instead of replacing them
pub fn merge_setting(settings: &mut Settings, key: &str, value: Value) {
    let incoming = match value {
        Value::Object(incoming) => incoming,
        scalar => {
            settings.insert(key.to_string(), scalar);
            return;
        }
    };
    if let Some(Value::Object(existing)) = settings.get_mut(key) {
        for (k, v) in incoming {
            merge_setting(existing, &k, v);
        }
        return;
    }
    settings.insert(key.to_string(), Value::Object(incoming));
}

/// Statistics an `extended_stats` metric can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedStat {
    Avg,
    Min,
    Max,
    Sum,
    Count,
    StdDeviation,
    StdDeviationBoundsUpper,
    StdDeviationBoundsLower,
}

impl ExtendedStat {
    pub const ALL: [ExtendedStat; 8] = [
        Self::Avg,
        Self::Min,
        Self::Max,
        Self::Sum,
        Self::Count,
        Self::StdDeviation,
        Self::StdDeviationBoundsUpper,
        Self::StdDeviationBoundsLower,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Avg => "Avg",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Sum => "Sum",
            Self::Count => "Count",
            Self::StdDeviation => "Std Dev",
            Self::StdDeviationBoundsUpper => "Std Dev Upper",
            Self::StdDeviationBoundsLower => "Std Dev Lower",
        }
    }

    /// Whether the stat is shown when the meta record does not mention it
    pub fn default_enabled(&self) -> bool {
        !matches!(self, Self::Sum | Self::Count)
    }
}

/// Moving average models accepted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverageModel {
    #[default]
    Simple,
    Linear,
    Ewma,
    Holt,
    HoltWinters,
}

/// One tunable of a moving average model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSetting {
    pub label: &'static str,
    pub key: &'static str,
    /// Rendered as a toggle rather than a text input
    pub is_checkbox: bool,
}

const fn input(label: &'static str, key: &'static str) -> ModelSetting {
    ModelSetting {
        label,
        key,
        is_checkbox: false,
    }
}

const ALPHA: ModelSetting = input("Alpha", "alpha");
const BETA: ModelSetting = input("Beta", "beta");
const GAMMA: ModelSetting = input("Gamma", "gamma");
const PERIOD: ModelSetting = input("Period", "period");
const PAD: ModelSetting = ModelSetting {
    label: "Pad",
    key: "pad",
    is_checkbox: true,
};

impl MovingAverageModel {
    pub const ALL: [MovingAverageModel; 5] = [
        Self::Simple,
        Self::Linear,
        Self::Ewma,
        Self::Holt,
        Self::HoltWinters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Linear => "linear",
            Self::Ewma => "ewma",
            Self::Holt => "holt",
            Self::HoltWinters => "holt_winters",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::Linear => "Linear",
            Self::Ewma => "Exponentially Weighted",
            Self::Holt => "Holt Linear",
            Self::HoltWinters => "Holt Winters",
        }
    }

    /// Model-specific settings, checkboxes included
    pub fn settings(&self) -> &'static [ModelSetting] {
        match self {
            Self::Simple | Self::Linear => &[],
            Self::Ewma => &[ALPHA],
            Self::Holt => &[ALPHA, BETA],
            Self::HoltWinters => &[ALPHA, BETA, GAMMA, PERIOD, PAD],
        }
    }

    /// Model-specific settings without the checkbox ones
    pub fn input_settings(&self) -> Vec<ModelSetting> {
        self.settings()
            .iter()
            .copied()
            .filter(|s| !s.is_checkbox)
            .collect()
    }

    /// Read the model out of a settings record, defaulting to `simple`
    pub fn from_settings(settings: Option<&Settings>) -> Self {
        settings
            .and_then(|s| s.get("model"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}
