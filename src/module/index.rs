use std::{
    collections::{BTreeMap, BTreeSet, HashSet, VecDeque},
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};

/// Fully qualified identity of a class, e.g. `core::render::Texture`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(String);

impl ClassId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a module declares about one of its classes
///
/// `capabilities` are the interfaces or tags the class implements directly; they may name
/// classes from other modules or plain tags that are not classes at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: ClassId,
    #[serde(default)]
    pub superclass: Option<ClassId>,
    #[serde(default)]
    pub capabilities: Vec<ClassId>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl ClassInfo {
    pub fn concrete(id: impl Into<ClassId>) -> Self {
        Self {
            id: id.into(),
            superclass: None,
            capabilities: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn abstract_class(id: impl Into<ClassId>) -> Self {
        Self {
            is_abstract: true,
            ..Self::concrete(id)
        }
    }

    pub fn extends(mut self, superclass: impl Into<ClassId>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, capability: impl Into<ClassId>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    fn parents(&self) -> impl Iterator<Item = &ClassId> {
        self.superclass.iter().chain(&self.capabilities)
    }
}

/// The classes of a single module, registered explicitly when the module is put together
///
/// On its own an index only sees its module's classes, so it can answer subtype queries for
/// relationships declared inside the module but not for ones that go through another module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassIndex {
    classes: BTreeMap<ClassId, ClassInfo>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class: ClassInfo) -> Self {
        self.insert(class);
        self
    }

    /// Add `class`, returning the declaration it replaces
    pub fn insert(&mut self, class: ClassInfo) -> Option<ClassInfo> {
        self.classes.insert(class.id.clone(), class)
    }

    pub fn get(&self, id: &ClassId) -> Option<&ClassInfo> {
        self.classes.get(id)
    }

    pub fn contains(&self, id: &ClassId) -> bool {
        self.classes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Concrete classes of this module that extend or implement `capability`
    pub fn subtypes_of(&self, capability: &ClassId) -> BTreeSet<ClassId> {
        subtypes_of(&self.classes, capability)
    }
}

impl FromIterator<ClassInfo> for ClassIndex {
    fn from_iter<I: IntoIterator<Item = ClassInfo>>(iter: I) -> Self {
        let mut index = ClassIndex::new();
        for class in iter {
            index.insert(class);
        }
        index
    }
}

pub(crate) fn subtypes_of(
    classes: &BTreeMap<ClassId, ClassInfo>,
    capability: &ClassId,
) -> BTreeSet<ClassId> {
    classes
        .values()
        .filter(|class| !class.is_abstract && &class.id != capability)
        .filter(|class| inherits(classes, class, capability))
        .map(|class| class.id.clone())
        .collect()
}

/// Walk superclasses and capabilities of `class` that are visible in `classes`. A parent that
/// is not in the table still counts as a match by name, it just cannot be walked further.
fn inherits(classes: &BTreeMap<ClassId, ClassInfo>, class: &ClassInfo, capability: &ClassId) -> bool {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([class]);
    while let Some(current) = queue.pop_front() {
        for parent in current.parents() {
            if parent == capability {
                return true;
            }
            if seen.insert(parent) {
                if let Some(info) = classes.get(parent) {
                    queue.push_back(info);
                }
            }
        }
    }
    false
}
