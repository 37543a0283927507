use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use log::{info, trace, warn};

use crate::{error::ModuleError, Name};

use super::{index, ClassId, ClassInfo, DependencyResolver, Module, ModuleRegistry};

/// The merged class index of a selection of modules
///
/// Built once and never changed; to move to another selection build a new environment. Classes
/// whose superclass chain leaves the selection are kept out of every query, even though their
/// own module's index still lists them.
pub struct ModuleEnvironment {
    modules: BTreeMap<Name, Arc<Module>>,
    classes: BTreeMap<ClassId, ClassInfo>,
    owners: BTreeMap<ClassId, Name>,
    excluded: BTreeSet<ClassId>,
}

impl ModuleEnvironment {
    /// Resolve `roots` against `registry` and build the environment of the result
    pub fn resolve(registry: &ModuleRegistry, roots: &[Name]) -> Result<Self, ModuleError> {
        Self::new(DependencyResolver::new(registry).resolve(roots)?)
    }

    /// Merge an already selected set of modules, at most one version per module id
    pub fn new(modules: impl IntoIterator<Item = Arc<Module>>) -> Result<Self, ModuleError> {
        let mut selected: BTreeMap<Name, Arc<Module>> = BTreeMap::new();
        for module in modules {
            match selected.entry(module.id().clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(module);
                }
                Entry::Occupied(slot) if slot.get().version() == module.version() => {}
                Entry::Occupied(slot) => {
                    return Err(ModuleError::DependencyConflict {
                        module: module.id().clone(),
                        constraints: vec![
                            format!("{} selected", slot.get()),
                            format!("{module} selected"),
                        ],
                    })
                }
            }
        }

        let mut merged: BTreeMap<ClassId, (ClassInfo, Name)> = BTreeMap::new();
        for module in selected.values() {
            for class in module.classes().iter() {
                match merged.entry(class.id.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert((class.clone(), module.id().clone()));
                    }
                    Entry::Occupied(mut slot) if slot.get().0 == *class => {
                        // the class belongs to the module the re-exporter depends on
                        let holder = &slot.get().1;
                        if depends_on(&selected, holder, module.id()) {
                            trace!("{} re-exports {} from {}", holder, class.id, module);
                            slot.get_mut().1 = module.id().clone();
                        } else {
                            trace!("{} re-exports {}", module, class.id);
                        }
                    }
                    Entry::Occupied(slot) => {
                        return Err(ModuleError::ModuleConflict {
                            class: class.id.clone(),
                            first: slot.get().1.clone(),
                            second: module.id().clone(),
                        })
                    }
                }
            }
        }

        let mut rooted = BTreeMap::new();
        for id in merged.keys() {
            is_rooted(&merged, id, &mut rooted, &mut BTreeSet::new());
        }

        let mut classes = BTreeMap::new();
        let mut owners = BTreeMap::new();
        let mut excluded = BTreeSet::new();
        for (id, (class, owner)) in merged {
            if rooted.get(&id).copied().unwrap_or(false) {
                owners.insert(id.clone(), owner);
                classes.insert(id, class);
            } else {
                warn!(
                    "{} from module {} is unreachable, an ancestor is missing from the environment",
                    id, owner
                );
                excluded.insert(id);
            }
        }

        info!(
            "built module environment: {} modules, {} classes, {} excluded",
            selected.len(),
            classes.len(),
            excluded.len()
        );
        Ok(Self {
            modules: selected,
            classes,
            owners,
            excluded,
        })
    }

    /// Concrete classes anywhere in the environment that extend or implement `capability`
    pub fn get_subtypes_of(&self, capability: &ClassId) -> BTreeSet<ClassId> {
        index::subtypes_of(&self.classes, capability)
    }

    pub fn get_module(&self, id: &Name) -> Option<&Arc<Module>> {
        self.modules.get(id)
    }

    pub fn contains_module(&self, id: &Name) -> bool {
        self.modules.contains_key(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values()
    }

    pub fn class(&self, id: &ClassId) -> Option<&ClassInfo> {
        self.classes.get(id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// The module that declared `class`, if the class is visible
    ///
    /// When several modules list the same class, the one the others depend on owns it. Between
    /// modules with no dependency on each other the first by id wins.
    pub fn module_of(&self, class: &ClassId) -> Option<&Arc<Module>> {
        self.modules.get(self.owners.get(class)?)
    }

    /// Classes left out because their superclass chain leaves the environment
    pub fn excluded_classes(&self) -> &BTreeSet<ClassId> {
        &self.excluded
    }
}

fn depends_on(selected: &BTreeMap<Name, Arc<Module>>, module: &Name, dependency: &Name) -> bool {
    selected.get(module).is_some_and(|module| {
        module
            .dependencies()
            .iter()
            .any(|info| &info.id == dependency)
    })
}

/// Whether every superclass above `id` is present. Cycles count as not rooted.
fn is_rooted(
    merged: &BTreeMap<ClassId, (ClassInfo, Name)>,
    id: &ClassId,
    memo: &mut BTreeMap<ClassId, bool>,
    visiting: &mut BTreeSet<ClassId>,
) -> bool {
    if let Some(&known) = memo.get(id) {
        return known;
    }
    if !visiting.insert(id.clone()) {
        return false;
    }
    let rooted = match merged.get(id) {
        None => false,
        Some((class, _)) => match &class.superclass {
            None => true,
            Some(superclass) => is_rooted(merged, superclass, memo, visiting),
        },
    };
    visiting.remove(id);
    memo.insert(id.clone(), rooted);
    rooted
}

impl fmt::Debug for ModuleEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEnvironment")
            .field("modules", &self.modules.values().map(ToString::to_string).collect::<Vec<_>>())
            .field("classes", &self.classes.len())
            .field("excluded", &self.excluded)
            .finish()
    }
}
