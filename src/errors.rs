//! Typed error hierarchy for the campaign orchestrator.
//!
//! Two top-level enums cover the two failure domains:
//! - `GraphError` - structural/configuration failures; fatal, propagate to
//!   the workflow caller
//! - `ServiceError` - upstream completion/image service failures; absorbed
//!   inside stage execution and never escape a stage

use thiserror::Error;

/// Structural failures in the workflow graph. These indicate programming
/// or configuration bugs, not runtime conditions, and abort the run.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate node '{node}' in workflow graph")]
    DuplicateNode { node: String },

    #[error("Edge from '{from}' references unknown node '{to}'")]
    UnknownEdgeTarget { from: String, to: String },

    #[error("Node '{node}' referenced by {role} does not exist")]
    UnknownNode { node: String, role: &'static str },

    #[error("Node '{node}' has no outgoing edge and is not a terminal node")]
    MissingSuccessor { node: String },

    #[error("Node '{node}' has both a static edge and conditional routing")]
    ConflictingEdges { node: String },

    #[error("Workflow graph has no decision node")]
    MissingDecisionNode,

    #[error("Router chose '{target}' which is not in the whitelist of decision node '{node}'")]
    RouteNotAllowed { node: String, target: String },

    #[error("Step ceiling ({limit}) exceeded; termination logic is broken")]
    StepCeilingExceeded { limit: u32 },
}

/// Failures talking to the upstream text-completion or image-generation
/// services. Recovered locally (retry, then degrade) inside each stage.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("Circuit breaker is open after {failures} consecutive failures")]
    CircuitOpen { failures: u32 },

    #[error("All {attempts} attempts failed; last error: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_route_not_allowed_names_both_nodes() {
        let err = GraphError::RouteNotAllowed {
            node: "coordinator".into(),
            target: "designer".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("coordinator"));
        assert!(msg.contains("designer"));
    }

    #[test]
    fn graph_error_step_ceiling_carries_limit() {
        let err = GraphError::StepCeilingExceeded { limit: 150 };
        match &err {
            GraphError::StepCeilingExceeded { limit } => assert_eq!(*limit, 150),
            _ => panic!("Expected StepCeilingExceeded"),
        }
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn service_error_exhausted_carries_attempt_count() {
        let err = ServiceError::Exhausted {
            attempts: 2,
            last: "timeout".into(),
        };
        assert!(err.to_string().contains('2'));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&GraphError::MissingDecisionNode);
        assert_std_error(&ServiceError::CircuitOpen { failures: 5 });
    }
}
