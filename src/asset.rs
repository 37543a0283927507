use std::{
    any::{type_name, Any},
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;

use crate::{error::AssetError, registry::AssetOwner, ResourceUrn};

/// Type erasure helpers every [`AssetData`] gets for free
pub trait AsAny: Send + Sync {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    /// Name of the concrete type behind a `dyn AssetData`
    fn data_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn data_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Marker for an immutable snapshot of loaded resource content
///
/// The registries never look inside the data, they only check that it is of the type the
/// asset class expects.
pub trait AssetData: AsAny + 'static {}

impl AssetData for String {}
impl AssetData for Vec<u8> {}

/// A live resource, addressed by its urn
///
/// An asset keeps its identity for as long as it is registered: reloading swaps the data
/// snapshot in place so every holder of the `Arc` sees the new content. Once disposed the
/// asset refuses any further use.
pub struct Asset<D: AssetData> {
    urn: ResourceUrn,
    owner: AssetOwner<D>,
    data: RwLock<Arc<D>>,
    disposed: AtomicBool,
}

impl<D: AssetData> Asset<D> {
    /// Build an unregistered asset, this is what factories do
    pub fn new(urn: ResourceUrn, owner: AssetOwner<D>, data: D) -> Self {
        Self {
            urn,
            owner,
            data: RwLock::new(Arc::new(data)),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn urn(&self) -> &ResourceUrn {
        &self.urn
    }

    pub(crate) fn owner(&self) -> &AssetOwner<D> {
        &self.owner
    }

    /// The current data snapshot
    pub fn data(&self) -> Result<Arc<D>, AssetError> {
        if self.is_disposed() {
            return Err(AssetError::Disposed(self.urn.clone()));
        }
        Ok(self.data.read().clone())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Replace the data of this asset, keeping its identity
    pub fn reload(&self, data: D) -> Result<(), AssetError> {
        match self.owner.upgrade() {
            Some(owner) => owner.reload_instance(self, data),
            None => self.swap_data(data),
        }
    }

    /// Remove this asset from its registry. Disposing twice does nothing.
    pub fn dispose(&self) {
        match self.owner.upgrade() {
            Some(owner) => owner.dispose_instance(self),
            None => self.mark_disposed(),
        }
    }

    pub(crate) fn swap_data(&self, data: D) -> Result<(), AssetError> {
        if self.is_disposed() {
            return Err(AssetError::Disposed(self.urn.clone()));
        }
        *self.data.write() = Arc::new(data);
        Ok(())
    }

    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

impl<D: AssetData> fmt::Debug for Asset<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("urn", &self.urn)
            .field("data", &type_name::<D>())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
