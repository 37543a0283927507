//! Modules and the environment built from them
//!
//! A [`Module`] is a named, versioned content package that knows only its own classes. The
//! [`DependencyResolver`] picks one version of every module needed by a set of roots, and a
//! [`ModuleEnvironment`] merges the class indices of that selection so subtype queries see
//! across module boundaries.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{Name, Version, VersionRange};

mod environment;
mod index;
mod resolver;

pub use environment::*;
pub use index::*;
pub use resolver::*;

/// A dependency of one module on another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub id: Name,
    pub min_version: Version,
    /// Exclusive upper bound, the next major version when absent
    #[serde(default)]
    pub max_version: Option<Version>,
    /// Optional dependencies never pull a module in, they only constrain it when present
    #[serde(default)]
    pub optional: bool,
}

impl DependencyInfo {
    pub fn new(id: impl Into<Name>, min_version: Version) -> Self {
        Self {
            id: id.into(),
            min_version,
            max_version: None,
            optional: false,
        }
    }

    pub fn up_to(mut self, max_version: Version) -> Self {
        self.max_version = Some(max_version);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn range(&self) -> VersionRange {
        match &self.max_version {
            Some(max) => VersionRange::new(self.min_version.clone(), max.clone()),
            None => VersionRange::compatible_with(self.min_version.clone()),
        }
    }
}

impl Display for DependencyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.range())
    }
}

/// The descriptive part of a module, what a package manifest deserializes into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub id: Name,
    pub version: Version,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyInfo>,
}

impl ModuleMetadata {
    pub fn new(id: impl Into<Name>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            display_name: None,
            description: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: DependencyInfo) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// A content package: its metadata and the index of its own classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    metadata: ModuleMetadata,
    classes: ClassIndex,
}

impl Module {
    pub fn new(metadata: ModuleMetadata, classes: ClassIndex) -> Self {
        Self { metadata, classes }
    }

    pub fn id(&self) -> &Name {
        &self.metadata.id
    }

    pub fn version(&self) -> &Version {
        &self.metadata.version
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn dependencies(&self) -> &[DependencyInfo] {
        &self.metadata.dependencies
    }

    /// This module's classes seen in isolation
    pub fn classes(&self) -> &ClassIndex {
        &self.classes
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id(), self.version())
    }
}

/// Every module version available for resolution
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<Name, BTreeMap<Version, Arc<Module>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `module`, returning the module with the same id and version it replaces
    pub fn add(&mut self, module: Module) -> Option<Arc<Module>> {
        self.modules
            .entry(module.id().clone())
            .or_default()
            .insert(module.version().clone(), Arc::new(module))
    }

    pub fn get(&self, id: &Name, version: &Version) -> Option<&Arc<Module>> {
        self.modules.get(id)?.get(version)
    }

    pub fn latest(&self, id: &Name) -> Option<&Arc<Module>> {
        self.modules.get(id)?.values().next_back()
    }

    /// Versions of `id`, newest first
    pub fn versions(&self, id: &Name) -> impl Iterator<Item = &Arc<Module>> {
        self.modules
            .get(id)
            .into_iter()
            .flat_map(|versions| versions.values().rev())
    }

    pub fn contains(&self, id: &Name) -> bool {
        self.modules.contains_key(id)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &Name> {
        self.modules.keys()
    }
}

impl Extend<Module> for ModuleRegistry {
    fn extend<I: IntoIterator<Item = Module>>(&mut self, iter: I) {
        for module in iter {
            self.add(module);
        }
    }
}
