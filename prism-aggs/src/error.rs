//! Error types for the aggregation model

use thiserror::Error;

/// Aggregation model errors
///
/// State transitions never produce these; they are reserved for data
/// integrity problems (unknown type tags, broken reference graphs, invalid
/// registry tables) and for decoding wire data.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown aggregation type: {0}")]
    UnknownAggregationType(String),

    #[error("Malformed reference graph: cycle through {}", .ids.join(" -> "))]
    MalformedReferenceGraph { ids: Vec<String> },

    #[error("Aggregation {id} references {target}, which is not positioned before it")]
    ForwardReference { id: String, target: String },

    #[error("Aggregation {id} references unknown aggregation {target}")]
    DanglingReference { id: String, target: String },

    #[error("Capability registry has no entry for: {0}")]
    IncompleteRegistry(String),

    #[error("Capability registry declares {0} more than once")]
    DuplicateRegistryEntry(String),

    #[error("Capability registry entry {0}: has_settings disagrees with its settings keys")]
    InconsistentRegistryEntry(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable kind, in the style of backend error types
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAggregationType(_) => "unknown_aggregation_type",
            Self::MalformedReferenceGraph { .. } => "malformed_reference_graph",
            Self::ForwardReference { .. } => "forward_reference",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::IncompleteRegistry(_)
            | Self::DuplicateRegistryEntry(_)
            | Self::InconsistentRegistryEntry(_) => "invalid_registry",
            Self::Json(_) => "parse_exception",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_ids() {
        let err = Error::MalformedReferenceGraph {
            ids: vec!["2".to_string(), "3".to_string()],
        };
        assert_eq!(err.to_string(), "Malformed reference graph: cycle through 2 -> 3");
        assert_eq!(err.kind(), "malformed_reference_graph");
    }

    #[test]
    fn test_unknown_type_kind() {
        let err = Error::UnknownAggregationType("stats".to_string());
        assert_eq!(err.to_string(), "Unknown aggregation type: stats");
        assert_eq!(err.kind(), "unknown_aggregation_type");
    }
}
