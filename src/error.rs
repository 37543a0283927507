use thiserror::Error;

use crate::{module::ClassId, Name, ResourceUrn};

/// A string that could not be parsed as a [`ResourceUrn`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed urn '{input}': {reason}")]
pub struct UrnError {
    pub input: String,
    pub reason: &'static str,
}

/// A string that could not be parsed as a [`Version`](crate::Version)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{input}': {reason}")]
pub struct VersionError {
    pub input: String,
    pub reason: String,
}

/// Failures of the asset registries and the manager routing to them
#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    MalformedUrn(#[from] UrnError),

    #[error("no asset type is registered for {0}")]
    UnknownAssetClass(&'static str),

    #[error("'{name}' is ambiguous, candidates are: {}", display_list(.candidates))]
    AmbiguousResource {
        name: String,
        candidates: Vec<ResourceUrn>,
    },

    #[error("{0} is already registered")]
    DuplicateRegistration(ResourceUrn),

    #[error("{0} has been disposed")]
    Disposed(ResourceUrn),

    #[error("expected asset data of type {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid data for {urn}: {reason}")]
    InvalidData { urn: ResourceUrn, reason: String },

    #[error("{format} could not parse asset data: {reason}")]
    Format {
        format: &'static str,
        reason: String,
    },
}

/// Failures while resolving and merging modules into an environment
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("conflicting requirements on module {module}: {}", .constraints.join(", "))]
    DependencyConflict {
        module: Name,
        constraints: Vec<String>,
    },

    #[error("module {module} required by {required_by} is not available")]
    MissingDependency { module: Name, required_by: String },

    #[error("class {class} is declared differently by {first} and {second}")]
    ModuleConflict {
        class: ClassId,
        first: Name,
        second: Name,
    },
}

fn display_list(urns: &[ResourceUrn]) -> String {
    urns.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
