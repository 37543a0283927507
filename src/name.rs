use std::{
    cmp::Ordering,
    collections::HashSet,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lowercase keys of every name ever built. Entries are never removed, so the table grows with
/// the number of distinct names a process sees, not with how many `Name`s are alive.
static NAME_TABLE: Lazy<RwLock<HashSet<Arc<str>>>> = Lazy::new(|| RwLock::new(HashSet::new()));

/// Fetch the shared copy of `s`, inserting it on first sight
fn intern(s: &str) -> Arc<str> {
    if let Some(existing) = NAME_TABLE.read().get(s) {
        return existing.clone();
    }
    let mut table = NAME_TABLE.write();
    // another thread may have inserted it between the two locks
    if let Some(existing) = table.get(s) {
        return existing.clone();
    }
    let interned: Arc<str> = Arc::from(s);
    table.insert(interned.clone());
    interned
}

/// A case-insensitive identifier segment, used for module and resource names
///
/// The original spelling is kept for display while comparison, ordering and hashing all go
/// through an interned lowercase key. `Name::new("Engine") == Name::new("engine")`.
#[derive(Clone)]
pub struct Name {
    original: Arc<str>,
    key: Arc<str>,
}

impl Name {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self {
            original: Arc::from(name),
            key: intern(&name.to_lowercase()),
        }
    }

    /// The name as it was written
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// The lowercase form used for comparisons
    pub fn normalized(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        // keys are interned so identity is equality
        Arc::ptr_eq(&self.key, &other.key)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.original)
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Name::new(name))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{hash_map::DefaultHasher, HashSet};

    use super::*;

    fn hash_of(name: &Name) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equality_ignores_case() {
        assert_eq!(Name::new("Foo"), Name::new("foo"));
        assert_eq!(Name::new("ENGINE"), Name::new("engine"));
        assert_ne!(Name::new("foo"), Name::new("bar"));
    }

    #[test]
    fn hash_agrees_with_equality() {
        assert_eq!(hash_of(&Name::new("Shader")), hash_of(&Name::new("sHADER")));

        let set: HashSet<Name> = ["Core", "core", "CORE"].into_iter().map(Name::new).collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn preserves_original_spelling() {
        let name = Name::new("MyModule");
        assert_eq!(name.as_str(), "MyModule");
        assert_eq!(name.normalized(), "mymodule");
        assert_eq!(name.to_string(), "MyModule");
    }

    #[test]
    fn only_lowercase_keys_are_interned() {
        let names = ["InternedOnce", "INTERNEDONCE", "internedOnce"].map(Name::new);
        let table = NAME_TABLE.read();
        assert!(table.contains("internedonce"));
        assert!(!table.contains("InternedOnce"));
        assert!(!table.contains("INTERNEDONCE"));
        assert_eq!(names[1].as_str(), "INTERNEDONCE");
    }

    #[test]
    fn orders_by_lowercase() {
        let mut names = vec![Name::new("beta"), Name::new("Alpha"), Name::new("gamma")];
        names.sort();
        let sorted: Vec<_> = names.iter().map(Name::as_str).collect();
        assert_eq!(sorted, ["Alpha", "beta", "gamma"]);
    }
}
