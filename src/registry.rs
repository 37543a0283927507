use std::{
    any::{type_name, Any},
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Weak},
};

use dashmap::DashMap;
use log::{info, trace};
use parking_lot::{Mutex, RwLock};

use crate::{
    asset::AsAny,
    error::AssetError,
    factory::{AssetFactory, DefaultFactory},
    Asset, AssetData, ResourceUrn,
};

struct Shared<D: AssetData> {
    factory: Box<dyn AssetFactory<D>>,
    live: RwLock<HashMap<ResourceUrn, Arc<Asset<D>>>>,
    // one mutex per urn serializes construction, reload and disposal of that urn only
    urn_locks: DashMap<ResourceUrn, Arc<Mutex<()>>>,
}

/// Back reference from an [`Asset`] to the registry that owns it
pub struct AssetOwner<D: AssetData>(Weak<Shared<D>>);

impl<D: AssetData> AssetOwner<D> {
    pub(crate) fn upgrade(&self) -> Option<AssetType<D>> {
        self.0.upgrade().map(|shared| AssetType { shared })
    }

    fn points_to(&self, shared: &Arc<Shared<D>>) -> bool {
        Weak::ptr_eq(&self.0, &Arc::downgrade(shared))
    }
}

impl<D: AssetData> Clone for AssetOwner<D> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Registry of every live asset of one data type
///
/// There is at most one live [`Asset`] per urn. Loading a urn that is already live reloads
/// that asset in place instead of building a second one. All mutations of a urn go through a
/// per-urn lock, so two threads racing on the same urn see one linear outcome while work on
/// other urns carries on.
///
/// Cloning an `AssetType` gives another handle to the same registry.
pub struct AssetType<D: AssetData> {
    shared: Arc<Shared<D>>,
}

impl<D: AssetData> Clone for AssetType<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D: AssetData> Default for AssetType<D> {
    fn default() -> Self {
        Self::new(DefaultFactory)
    }
}

impl<D: AssetData> AssetType<D> {
    pub fn new(factory: impl AssetFactory<D> + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                factory: Box::new(factory),
                live: RwLock::new(HashMap::new()),
                urn_locks: DashMap::new(),
            }),
        }
    }

    /// The live asset for `urn`, if any. Never loads anything.
    pub fn get_asset(&self, urn: &ResourceUrn) -> Option<Arc<Asset<D>>> {
        self.shared
            .live
            .read()
            .get(urn)
            .filter(|asset| !asset.is_disposed())
            .cloned()
    }

    /// Load `data` under `urn`
    ///
    /// Reloads the live asset if there is one and returns that same asset, otherwise asks the
    /// factory for a new one and registers it.
    pub fn load_asset(&self, urn: ResourceUrn, data: D) -> Result<Arc<Asset<D>>, AssetError> {
        self.with_urn_lock(&urn, || {
            if let Some(existing) = self.live_under_lock(&urn) {
                trace!("reloading asset {}", urn);
                existing.swap_data(data)?;
                return Ok(existing);
            }
            self.construct(urn.clone(), data)
        })
    }

    /// Build and register a new asset, failing if `urn` is already live
    pub fn create_asset(&self, urn: ResourceUrn, data: D) -> Result<Arc<Asset<D>>, AssetError> {
        self.with_urn_lock(&urn, || {
            if self.live_under_lock(&urn).is_some() {
                return Err(AssetError::DuplicateRegistration(urn.clone()));
            }
            self.construct(urn.clone(), data)
        })
    }

    /// Add an already built asset to the live set
    ///
    /// The asset has to be built with this registry's [`owner`](Self::owner). Assets of another
    /// registry are refused with [`AssetError::InvalidData`].
    pub fn register_asset(&self, asset: Arc<Asset<D>>) -> Result<(), AssetError> {
        let urn = asset.urn().clone();
        self.with_urn_lock(&urn, || self.insert_live(asset))
    }

    /// Drop `urn` from the live set and mark its asset disposed. Unknown urns are ignored.
    pub fn dispose(&self, urn: &ResourceUrn) {
        self.with_urn_lock(urn, || {
            if let Some(asset) = self.shared.live.write().remove(urn) {
                trace!("disposing asset {}", urn);
                asset.mark_disposed();
            }
        })
    }

    pub fn dispose_all(&self) {
        for urn in self.get_available_urns() {
            self.dispose(&urn);
        }
    }

    /// Point in time copy of the live urns
    pub fn get_available_urns(&self) -> HashSet<ResourceUrn> {
        self.shared.live.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.live.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn reload_instance(&self, asset: &Asset<D>, data: D) -> Result<(), AssetError> {
        self.with_urn_lock(asset.urn(), || asset.swap_data(data))
    }

    pub(crate) fn dispose_instance(&self, asset: &Asset<D>) {
        let urn = asset.urn();
        self.with_urn_lock(urn, || {
            let mut live = self.shared.live.write();
            if live
                .get(urn)
                .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), asset))
            {
                live.remove(urn);
            }
            asset.mark_disposed();
        })
    }

    /// Owner handle to build assets for [`register_asset`](Self::register_asset) with
    pub fn owner(&self) -> AssetOwner<D> {
        AssetOwner(Arc::downgrade(&self.shared))
    }

    /// The live asset for `urn`, dropping an entry that was disposed behind the registry's
    /// back. Caller must hold the urn lock.
    fn live_under_lock(&self, urn: &ResourceUrn) -> Option<Arc<Asset<D>>> {
        let mut live = self.shared.live.write();
        if live.get(urn).is_some_and(|asset| asset.is_disposed()) {
            trace!("dropping disposed entry {}", urn);
            live.remove(urn);
        }
        live.get(urn).cloned()
    }

    /// Caller must hold the urn lock
    fn construct(&self, urn: ResourceUrn, data: D) -> Result<Arc<Asset<D>>, AssetError> {
        info!("Loading asset: {}", urn);
        let asset = Arc::new(self.shared.factory.build(urn.clone(), self.owner(), data)?);
        if asset.urn() != &urn {
            return Err(AssetError::InvalidData {
                urn,
                reason: format!("factory built an asset for {}", asset.urn()),
            });
        }
        self.insert_live(asset.clone())?;
        Ok(asset)
    }

    /// Caller must hold the urn lock
    fn insert_live(&self, asset: Arc<Asset<D>>) -> Result<(), AssetError> {
        if asset.is_disposed() {
            return Err(AssetError::Disposed(asset.urn().clone()));
        }
        if !asset.owner().points_to(&self.shared) {
            return Err(AssetError::InvalidData {
                urn: asset.urn().clone(),
                reason: "asset is owned by another registry".into(),
            });
        }
        let mut live = self.shared.live.write();
        if live.get(asset.urn()).is_some_and(|current| !current.is_disposed()) {
            return Err(AssetError::DuplicateRegistration(asset.urn().clone()));
        }
        live.insert(asset.urn().clone(), asset);
        Ok(())
    }

    fn with_urn_lock<R>(&self, urn: &ResourceUrn, f: impl FnOnce() -> R) -> R {
        // clone the mutex out so the map shard is not held while waiting on it
        let lock = self
            .shared
            .urn_locks
            .entry(urn.clone())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        // forget the lock once nobody but the map and this call hold it
        self.shared
            .urn_locks
            .remove_if(urn, |_, lock| Arc::strong_count(lock) <= 2);
        result
    }
}

impl<D: AssetData> fmt::Debug for AssetType<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetType")
            .field("data", &type_name::<D>())
            .field("live", &self.len())
            .finish()
    }
}

/// An [`AssetType`] with its data type erased, as stored by the manager
pub(crate) trait ErasedAssetType: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn data_type_name(&self) -> &'static str;
    fn get_available_urns(&self) -> HashSet<ResourceUrn>;
    fn load_boxed(
        &self,
        urn: ResourceUrn,
        data: Box<dyn AssetData>,
    ) -> Result<Arc<dyn Any + Send + Sync>, AssetError>;
    fn dispose(&self, urn: &ResourceUrn);
}

impl<D: AssetData> ErasedAssetType for AssetType<D> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_type_name(&self) -> &'static str {
        type_name::<D>()
    }

    fn get_available_urns(&self) -> HashSet<ResourceUrn> {
        AssetType::get_available_urns(self)
    }

    fn load_boxed(
        &self,
        urn: ResourceUrn,
        data: Box<dyn AssetData>,
    ) -> Result<Arc<dyn Any + Send + Sync>, AssetError> {
        let found = AsAny::data_type_name(&*data);
        let data = AsAny::into_any(data)
            .downcast::<D>()
            .map_err(|_| AssetError::TypeMismatch {
                expected: type_name::<D>(),
                found,
            })?;
        let asset: Arc<dyn Any + Send + Sync> = self.load_asset(urn, *data)?;
        Ok(asset)
    }

    fn dispose(&self, urn: &ResourceUrn) {
        AssetType::dispose(self, urn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory_fn;

    fn urn(s: &str) -> ResourceUrn {
        s.parse().unwrap()
    }

    #[test]
    fn reload_keeps_identity() {
        let strings = AssetType::<String>::default();
        let first = strings.load_asset(urn("core:greeting"), "hello".into()).unwrap();
        let second = strings.load_asset(urn("core:greeting"), "bonjour".into()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first.data().unwrap(), "bonjour");
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn dispose_then_load_builds_fresh() {
        let strings = AssetType::<String>::default();
        let old = strings.load_asset(urn("core:a"), "1".into()).unwrap();
        strings.dispose(&urn("core:a"));

        assert!(strings.get_asset(&urn("core:a")).is_none());
        assert!(old.is_disposed());
        assert!(matches!(old.data(), Err(AssetError::Disposed(_))));
        assert!(matches!(old.reload("2".into()), Err(AssetError::Disposed(_))));

        let new = strings.load_asset(urn("core:a"), "3".into()).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(*new.data().unwrap(), "3");
    }

    #[test]
    fn dispose_is_idempotent() {
        let strings = AssetType::<String>::default();
        strings.dispose(&urn("core:never"));
        let asset = strings.load_asset(urn("core:once"), "x".into()).unwrap();
        asset.dispose();
        asset.dispose();
        strings.dispose(&urn("core:once"));
        assert!(strings.is_empty());
    }

    #[test]
    fn stale_asset_dispose_leaves_replacement_alone() {
        let strings = AssetType::<String>::default();
        let old = strings.load_asset(urn("core:a"), "1".into()).unwrap();
        strings.dispose(&urn("core:a"));
        let new = strings.load_asset(urn("core:a"), "2".into()).unwrap();

        old.dispose();
        assert!(Arc::ptr_eq(&strings.get_asset(&urn("core:a")).unwrap(), &new));
        assert!(!new.is_disposed());
    }

    #[test]
    fn create_and_register_reject_duplicates() {
        let strings = AssetType::<String>::default();
        strings.create_asset(urn("core:a"), "1".into()).unwrap();
        assert!(matches!(
            strings.create_asset(urn("core:A"), "2".into()),
            Err(AssetError::DuplicateRegistration(_))
        ));

        let built = Arc::new(Asset::new(urn("core:a"), strings.owner(), "3".to_string()));
        assert!(matches!(
            strings.register_asset(built),
            Err(AssetError::DuplicateRegistration(_))
        ));

        let fresh = Arc::new(Asset::new(urn("core:b"), strings.owner(), "4".to_string()));
        strings.register_asset(fresh.clone()).unwrap();
        assert!(Arc::ptr_eq(&strings.get_asset(&urn("core:b")).unwrap(), &fresh));
    }

    #[test]
    fn register_refuses_assets_of_another_registry() {
        let strings = AssetType::<String>::default();
        let other = AssetType::<String>::default();
        let foreign = other.load_asset(urn("core:a"), "theirs".into()).unwrap();

        assert!(matches!(
            strings.register_asset(foreign.clone()),
            Err(AssetError::InvalidData { .. })
        ));
        assert!(strings.get_asset(&urn("core:a")).is_none());

        // disposing through the other registry leaves this one usable
        foreign.dispose();
        let ours = strings.load_asset(urn("core:a"), "ours".into()).unwrap();
        assert_eq!(*ours.data().unwrap(), "ours");
        assert!(Arc::ptr_eq(&strings.get_asset(&urn("core:a")).unwrap(), &ours));
    }

    #[test]
    fn disposed_entry_counts_as_absent() {
        let strings = AssetType::<String>::default();
        let old = strings.load_asset(urn("core:a"), "1".into()).unwrap();
        // marked disposed without going through the registry
        old.mark_disposed();

        assert!(strings.get_asset(&urn("core:a")).is_none());
        let new = strings.load_asset(urn("core:a"), "2".into()).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(*new.data().unwrap(), "2");
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn factory_errors_leave_nothing_registered() {
        let strings = AssetType::new(factory_fn(|urn, owner, data: String| {
            if data.is_empty() {
                return Err(AssetError::InvalidData {
                    urn,
                    reason: "empty".into(),
                });
            }
            Ok(Asset::new(urn, owner, data))
        }));

        assert!(matches!(
            strings.load_asset(urn("core:a"), String::new()),
            Err(AssetError::InvalidData { .. })
        ));
        assert!(strings.get_asset(&urn("core:a")).is_none());
        assert!(strings.load_asset(urn("core:a"), "ok".into()).is_ok());
    }

    #[test]
    fn erased_load_checks_type() {
        let strings = AssetType::<String>::default();
        let err = strings
            .load_boxed(urn("core:a"), Box::new(vec![1u8, 2, 3]))
            .unwrap_err();
        match err {
            AssetError::TypeMismatch { expected, found } => {
                assert_eq!(expected, type_name::<String>());
                assert_eq!(found, type_name::<Vec<u8>>());
            }
            other => panic!("unexpected error {other}"),
        }

        let asset = strings
            .load_boxed(urn("core:a"), Box::new(String::from("hi")))
            .unwrap();
        let asset = asset.downcast::<Asset<String>>().unwrap();
        assert_eq!(*asset.data().unwrap(), "hi");
    }
}
