use std::{
    any::{type_name, Any, TypeId},
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use arc_swap::ArcSwapOption;
use log::{info, trace};

use crate::{
    error::AssetError,
    formats::Format,
    module::ModuleEnvironment,
    registry::ErasedAssetType,
    urn::ResourceRef,
    Asset, AssetData, AssetType, ResourceUrn,
};

/// Runtime tag for an asset class, for callers that do not know the data type statically
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetClass {
    id: TypeId,
    name: &'static str,
}

impl AssetClass {
    pub fn of<D: AssetData>() -> Self {
        Self {
            id: TypeId::of::<D>(),
            name: type_name::<D>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetClass({})", self.name)
    }
}

/// Lists the asset types a manager routes to
///
/// ```
/// # use tomb_assets::{AssetManager, AssetType};
/// let manager = AssetManager::builder()
///     .with_asset_type(AssetType::<String>::default())
///     .with_asset_type(AssetType::<Vec<u8>>::default())
///     .build();
/// # let _ = manager;
/// ```
#[derive(Default)]
pub struct AssetManagerBuilder {
    types: HashMap<TypeId, Box<dyn ErasedAssetType>>,
    environment: Option<Arc<ModuleEnvironment>>,
}

impl AssetManagerBuilder {
    /// Route requests for `D` to `asset_type`. A second registry for the same `D` replaces
    /// the first.
    pub fn with_asset_type<D: AssetData>(mut self, asset_type: AssetType<D>) -> Self {
        self.types.insert(TypeId::of::<D>(), Box::new(asset_type));
        self
    }

    /// Scope bare name lookups to the modules of `environment`
    pub fn with_environment(mut self, environment: Arc<ModuleEnvironment>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn build(self) -> AssetManager {
        info!("asset manager routing {} asset types", self.types.len());
        AssetManager {
            types: self.types,
            environment: ArcSwapOption::new(self.environment),
        }
    }
}

/// Entry point for asset access, routing each request to the [`AssetType`] of its class
///
/// The set of asset types is fixed when the manager is built. The module environment used to
/// scope bare name lookups can be swapped at any time.
pub struct AssetManager {
    types: HashMap<TypeId, Box<dyn ErasedAssetType>>,
    environment: ArcSwapOption<ModuleEnvironment>,
}

impl AssetManager {
    pub fn builder() -> AssetManagerBuilder {
        AssetManagerBuilder::default()
    }

    /// The registry bound to `D`
    pub fn asset_type<D: AssetData>(&self) -> Result<AssetType<D>, AssetError> {
        self.types
            .get(&TypeId::of::<D>())
            .and_then(|erased| erased.as_any().downcast_ref::<AssetType<D>>())
            .cloned()
            .ok_or(AssetError::UnknownAssetClass(type_name::<D>()))
    }

    pub fn get_asset<D: AssetData>(
        &self,
        urn: &ResourceUrn,
    ) -> Result<Option<Arc<Asset<D>>>, AssetError> {
        Ok(self.asset_type::<D>()?.get_asset(urn))
    }

    /// Look up a live asset by full urn or bare resource name
    ///
    /// A bare name has to match exactly one live urn of the class, see [`Self::resolve`].
    pub fn find_asset<D: AssetData>(
        &self,
        reference: &str,
    ) -> Result<Option<Arc<Asset<D>>>, AssetError> {
        let asset_type = self.asset_type::<D>()?;
        Ok(self
            .resolve::<D>(reference)?
            .and_then(|urn| asset_type.get_asset(&urn)))
    }

    /// Turn `reference` into a urn of class `D`
    ///
    /// A full urn is returned as is. A bare name is matched against the live urns of the
    /// class, limited to the modules of the current environment when there is one. No match
    /// gives `None`; more than one is an [`AssetError::AmbiguousResource`].
    pub fn resolve<D: AssetData>(&self, reference: &str) -> Result<Option<ResourceUrn>, AssetError> {
        let asset_type = self.asset_type::<D>()?;
        let reference: ResourceRef = reference.parse()?;
        if let ResourceRef::Urn(urn) = reference {
            return Ok(Some(urn));
        }

        let environment = self.environment.load_full();
        let mut candidates: Vec<ResourceUrn> = asset_type
            .get_available_urns()
            .into_iter()
            .filter(|urn| reference.matches(urn))
            .filter(|urn| {
                environment
                    .as_ref()
                    .map_or(true, |env| env.contains_module(urn.module()))
            })
            .collect();

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => {
                candidates.sort();
                Err(AssetError::AmbiguousResource {
                    name: reference.to_string(),
                    candidates,
                })
            }
        }
    }

    pub fn load_asset<D: AssetData>(
        &self,
        urn: ResourceUrn,
        data: D,
    ) -> Result<Arc<Asset<D>>, AssetError> {
        self.asset_type::<D>()?.load_asset(urn, data)
    }

    /// Load data whose type is only known at runtime into the registry of `class`
    ///
    /// The returned value is an `Arc<Asset<D>>` for the class's data type.
    pub fn load_boxed(
        &self,
        class: AssetClass,
        urn: ResourceUrn,
        data: Box<dyn AssetData>,
    ) -> Result<Arc<dyn Any + Send + Sync>, AssetError> {
        self.erased(class)?.load_boxed(urn, data)
    }

    /// Parse `bytes` with `format` and load the result
    pub fn load_bytes<F: Format>(
        &self,
        urn: ResourceUrn,
        bytes: &[u8],
        format: &F,
    ) -> Result<Arc<Asset<F::Output>>, AssetError> {
        let asset_type = self.asset_type::<F::Output>()?;
        trace!("parsing {} with {}", urn, type_name::<F>());
        let data = format.parse(bytes)?;
        asset_type.load_asset(urn, data)
    }

    pub fn dispose<D: AssetData>(&self, urn: &ResourceUrn) -> Result<(), AssetError> {
        self.asset_type::<D>()?.dispose(urn);
        Ok(())
    }

    pub fn dispose_of(&self, class: AssetClass, urn: &ResourceUrn) -> Result<(), AssetError> {
        self.erased(class)?.dispose(urn);
        Ok(())
    }

    pub fn get_available_assets<D: AssetData>(&self) -> Result<HashSet<ResourceUrn>, AssetError> {
        Ok(self.asset_type::<D>()?.get_available_urns())
    }

    pub fn get_available_assets_of(
        &self,
        class: AssetClass,
    ) -> Result<HashSet<ResourceUrn>, AssetError> {
        Ok(self.erased(class)?.get_available_urns())
    }

    /// Names of the data types this manager routes, in no particular order
    pub fn asset_classes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.values().map(|erased| erased.data_type_name())
    }

    /// Replace the environment used for bare name lookups. Lookups already running keep the
    /// environment they started with.
    pub fn switch_environment(&self, environment: Arc<ModuleEnvironment>) {
        info!(
            "switching asset environment to {} modules",
            environment.modules().count()
        );
        self.environment.store(Some(environment));
    }

    pub fn environment(&self) -> Option<Arc<ModuleEnvironment>> {
        self.environment.load_full()
    }

    fn erased(&self, class: AssetClass) -> Result<&dyn ErasedAssetType, AssetError> {
        self.types
            .get(&class.id)
            .map(|erased| &**erased)
            .ok_or(AssetError::UnknownAssetClass(class.name))
    }
}

impl fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetManager")
            .field("asset_classes", &self.asset_classes().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
