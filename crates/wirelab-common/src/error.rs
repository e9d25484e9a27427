//! Error taxonomy for wirelab operations.
//!
//! Configuration and precondition errors are fatal and detected before any
//! kernel or runtime side effect; stage-execution errors are local to the
//! failing node.

use std::io;
use thiserror::Error;

/// Result type alias for wirelab operations.
pub type LabResult<T> = Result<T, LabError>;

/// Errors that can occur while resolving, validating or deploying a lab.
#[derive(Debug, Error)]
pub enum LabError {
    /// Failed to spawn a shell command.
    #[error("failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned a non-zero exit code.
    #[error("shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Topology validation failed (fatal configuration error).
    #[error("invalid topology: {message}")]
    Validation {
        /// What is wrong with the topology.
        message: String,
    },

    /// The same `node:iface` endpoint appeared more than once.
    #[error("endpoints {endpoints:?} appeared more than once in the links section of the topology file")]
    DuplicateEndpoints {
        /// Every duplicated endpoint string.
        endpoints: Vec<String>,
    },

    /// A node references a kind that is not registered.
    #[error("node '{node}' refers to a kind '{kind}' which is not supported, supported kinds are {registered:?}")]
    UnknownKind {
        /// The offending node.
        node: String,
        /// The unknown kind name.
        kind: String,
        /// All registered kind names.
        registered: Vec<String>,
    },

    /// The same kind name was registered twice.
    #[error("node kind '{kind}' is already registered")]
    DuplicateKind {
        /// The kind name.
        kind: String,
    },

    /// The wait-for graph contains a cycle.
    #[error("wait-for dependencies form a cycle: {cycle}")]
    CyclicDependency {
        /// The cycle rendered as `a@stage -> b@stage -> a@stage`.
        cycle: String,
    },

    /// A file referenced by the topology does not exist.
    #[error("node '{node}' {role} file not found at path {path}")]
    MissingFile {
        /// The node referencing the file.
        node: String,
        /// The file's role, e.g. `startup-config` or `license`.
        role: String,
        /// The resolved path that was checked.
        path: String,
    },

    /// A referenced Linux bridge does not exist in the root namespace.
    #[error("bridge '{bridge}' is referenced in the endpoints section but was not found in the root network namespace")]
    BridgeMissing {
        /// The bridge name.
        bridge: String,
    },

    /// A container-runtime call failed.
    #[error("runtime operation '{operation}' failed: {message}")]
    Runtime {
        /// The operation that failed (e.g. "create", "start", "exec").
        operation: String,
        /// Error message from the runtime.
        message: String,
    },

    /// Virtual link wiring failed.
    #[error("failed to wire link '{link}': {message}")]
    Wiring {
        /// The link rendered as `a:iface <--> b:iface`.
        link: String,
        /// Error message.
        message: String,
    },

    /// A node this node waits for has failed.
    #[error("node '{node}' depends on '{dependency}' which failed to deploy")]
    DependencyFailed {
        /// The waiting node.
        node: String,
        /// The failed dependency rendered as `node@stage`.
        dependency: String,
    },

    /// A per-stage deadline was exceeded.
    #[error("node '{node}' exceeded the deadline in stage '{stage}'")]
    StageTimeout {
        /// The node that timed out.
        node: String,
        /// The stage being executed.
        stage: String,
    },

    /// Internal error (unexpected state).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl LabError {
    /// Creates a topology validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a runtime error.
    pub fn runtime(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a wiring error.
    pub fn wiring(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Wiring {
            link: link.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error is a fatal configuration or precondition
    /// error that must abort the whole deployment before any side effect.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            LabError::Validation { .. }
                | LabError::DuplicateEndpoints { .. }
                | LabError::UnknownKind { .. }
                | LabError::DuplicateKind { .. }
                | LabError::CyclicDependency { .. }
                | LabError::MissingFile { .. }
                | LabError::BridgeMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LabError::UnknownKind {
            node: "r1".to_string(),
            kind: "frobnicator".to_string(),
            registered: vec!["linux".to_string(), "srl".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("frobnicator"));
        assert!(msg.contains("linux"));
        assert!(msg.contains("srl"));
    }

    #[test]
    fn test_duplicate_endpoints_lists_all() {
        let err = LabError::DuplicateEndpoints {
            endpoints: vec!["a:eth1".to_string(), "b:eth2".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("a:eth1"));
        assert!(msg.contains("b:eth2"));
    }

    #[test]
    fn test_is_config() {
        assert!(LabError::validation("bad").is_config());
        assert!(LabError::CyclicDependency {
            cycle: "a@create -> a@create".to_string()
        }
        .is_config());
        assert!(!LabError::runtime("create", "boom").is_config());
        assert!(!LabError::wiring("a:e1 <--> b:e1", "boom").is_config());
    }
}
