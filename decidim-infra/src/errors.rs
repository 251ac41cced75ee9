//! Error types for the synthesizer.
//!
//! Every failure a synthesis can hit is enumerated here; there is no
//! partial-success path. Either the full resource graph renders or
//! synthesis aborts with one of these before anything is emitted.

use thiserror::Error;

/// The main error type for synthesis operations.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The stage selector is not in the enumerated set.
    #[error("unknown stage '{0}'; expected one of: dev, staging, prd-v0264, prd-v0283, prd-v0292")]
    UnknownStage(String),

    /// No configuration bundle is registered for the stage.
    #[error("no configuration bundle for stage '{stage}'")]
    ConfigurationNotFound {
        /// The stage selector.
        stage: String,
    },

    /// The stage's configuration bundle failed to parse or validate.
    #[error("malformed configuration for stage '{stage}': {message}")]
    MalformedConfiguration {
        /// The stage selector.
        stage: String,
        /// What was wrong with the bundle.
        message: String,
    },

    /// A cycle was detected in the stack graph.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A builder was registered twice under the same name.
    #[error("duplicate builder '{0}'")]
    DuplicateBuilder(String),

    /// A dependency edge names a builder that was never registered.
    #[error("unknown builder '{0}' named in a dependency edge")]
    UnknownBuilder(String),

    /// A stack consumed a handle no earlier stack produced.
    #[error("stack '{stack}' consumes '{output}' which no earlier stack provides")]
    UnresolvedReference {
        /// The consuming stack.
        stack: String,
        /// The missing handle key.
        output: String,
    },

    /// A builder declared a handle in `provides()` but never exported it.
    #[error("stack '{stack}' declared output '{output}' but did not export it")]
    MissingProvidedOutput {
        /// The producing stack.
        stack: String,
        /// The declared but absent handle key.
        output: String,
    },

    /// A rendered template refers to a logical id its stack never declared.
    #[error("stack '{stack}' references undeclared logical id '{id}'")]
    DanglingReference {
        /// The stack name.
        stack: String,
        /// The missing logical id.
        id: String,
    },

    /// Two resources in one stack share a logical id.
    #[error("duplicate logical id '{id}' in stack '{stack}'")]
    DuplicateLogicalId {
        /// The stack name.
        stack: String,
        /// The colliding logical id.
        id: String,
    },

    /// Two WAF rules carry the same priority.
    #[error("duplicate WAF rule priority {priority}: '{first}' and '{second}'")]
    DuplicateRulePriority {
        /// The colliding priority.
        priority: u32,
        /// The rule declared first.
        first: String,
        /// The rule declared second.
        second: String,
    },

    /// IO error while writing emitted templates.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while rendering templates.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error raised when the stack graph contains a dependency cycle.
#[derive(Debug, Clone, Error)]
#[error("cycle detected in stack graph: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stacks forming the cycle.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_lists_path() {
        let err = CycleDetectedError::new(vec![
            "network".to_string(),
            "service".to_string(),
            "network".to_string(),
        ]);
        assert!(err.to_string().contains("network -> service -> network"));
    }

    #[test]
    fn test_unknown_stage_names_candidates() {
        let err = SynthError::UnknownStage("qa".to_string());
        assert!(err.to_string().contains("staging"));
        assert!(err.to_string().contains("qa"));
    }

    #[test]
    fn test_unresolved_reference_message() {
        let err = SynthError::UnresolvedReference {
            stack: "service".to_string(),
            output: "cache/endpoint".to_string(),
        };
        assert!(err.to_string().contains("cache/endpoint"));
    }
}
