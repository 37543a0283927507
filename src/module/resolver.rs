use std::{collections::BTreeMap, sync::Arc};

use log::{debug, trace};

use crate::{error::ModuleError, Name};

use super::{DependencyInfo, Module, ModuleRegistry};

/// Picks one version of every module a set of root modules needs
///
/// The newest version that satisfies every requirement placed on a module by the modules
/// already picked is tried first; when that choice leads to a dead end the search backs up and
/// tries older versions. If nothing fits, the first conflict met is reported instead of
/// guessing.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// The selected modules for `roots` and all their required dependencies, ordered by id
    pub fn resolve(&self, roots: &[Name]) -> Result<Vec<Arc<Module>>, ModuleError> {
        let mut search = Search {
            registry: self.registry,
            selected: BTreeMap::new(),
            conflict: None,
        };

        if search.solve(roots.to_vec()) {
            debug!(
                "resolved {} modules for roots {:?}",
                search.selected.len(),
                roots
            );
            Ok(search.selected.into_values().collect())
        } else {
            Err(search.conflict.unwrap_or_else(|| ModuleError::DependencyConflict {
                module: roots.first().cloned().unwrap_or_else(|| Name::new("")),
                constraints: vec!["no consistent selection exists".to_string()],
            }))
        }
    }
}

struct Search<'a> {
    registry: &'a ModuleRegistry,
    selected: BTreeMap<Name, Arc<Module>>,
    conflict: Option<ModuleError>,
}

impl Search<'_> {
    fn solve(&mut self, mut pending: Vec<Name>) -> bool {
        pending.retain(|id| !self.selected.contains_key(id));
        if pending.is_empty() {
            return true;
        }
        let id = pending.remove(0);

        let requirements = self.requirements_on(&id);
        let mut clash = None;
        let candidates: Vec<Arc<Module>> = self
            .registry
            .versions(&id)
            .filter(|module| {
                requirements
                    .iter()
                    .all(|(_, dependency)| dependency.range().contains(module.version()))
            })
            .filter(|module| match self.first_clash(module) {
                Some(found) => {
                    clash.get_or_insert(found);
                    false
                }
                None => true,
            })
            .cloned()
            .collect();

        if candidates.is_empty() {
            let error = if !self.registry.contains(&id) {
                ModuleError::MissingDependency {
                    module: id.clone(),
                    required_by: requirements
                        .first()
                        .map_or_else(|| "the environment roots".to_string(), |(by, _)| by.clone()),
                }
            } else if let Some(clash) = clash {
                clash
            } else {
                ModuleError::DependencyConflict {
                    module: id.clone(),
                    constraints: requirements
                        .iter()
                        .map(|(by, dependency)| format!("{by} requires {dependency}"))
                        .collect(),
                }
            };
            self.conflict.get_or_insert(error);
            return false;
        }

        for candidate in candidates {
            trace!("trying {}", candidate);
            self.selected.insert(id.clone(), candidate.clone());
            let mut next = pending.clone();
            next.extend(
                candidate
                    .dependencies()
                    .iter()
                    .filter(|dependency| !dependency.optional)
                    .map(|dependency| dependency.id.clone()),
            );
            if self.solve(next) {
                return true;
            }
            self.selected.remove(&id);
        }
        false
    }

    /// What the selected modules demand of `id`, with a description of who demands it
    fn requirements_on(&self, id: &Name) -> Vec<(String, DependencyInfo)> {
        self.selected
            .values()
            .flat_map(|module| {
                module
                    .dependencies()
                    .iter()
                    .filter(|dependency| &dependency.id == id)
                    .map(|dependency| (module.to_string(), dependency.clone()))
            })
            .collect()
    }

    /// A dependency of `candidate` that the current selection already violates
    fn first_clash(&self, candidate: &Module) -> Option<ModuleError> {
        candidate.dependencies().iter().find_map(|dependency| {
            let chosen = self.selected.get(&dependency.id)?;
            if dependency.range().contains(chosen.version()) {
                return None;
            }
            let mut constraints: Vec<String> = self
                .requirements_on(&dependency.id)
                .iter()
                .map(|(by, required)| format!("{by} requires {required}"))
                .collect();
            constraints.push(format!("{candidate} requires {dependency}"));
            Some(ModuleError::DependencyConflict {
                module: dependency.id.clone(),
                constraints,
            })
        })
    }
}
