use crate::{error::AssetError, registry::AssetOwner, Asset, AssetData, ResourceUrn};

/// Builds the asset instance for newly loaded data
///
/// Factories only construct. Registration is done by the [`AssetType`](crate::AssetType)
/// that called the factory, so a factory never touches registry state.
pub trait AssetFactory<D: AssetData>: Send + Sync {
    fn build(
        &self,
        urn: ResourceUrn,
        owner: AssetOwner<D>,
        data: D,
    ) -> Result<Asset<D>, AssetError>;
}

/// Wraps the data as is
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl<D: AssetData> AssetFactory<D> for DefaultFactory {
    fn build(
        &self,
        urn: ResourceUrn,
        owner: AssetOwner<D>,
        data: D,
    ) -> Result<Asset<D>, AssetError> {
        Ok(Asset::new(urn, owner, data))
    }
}

/// A factory made from a closure, see [`factory_fn`]
#[derive(Debug, Clone, Copy)]
pub struct FnFactory<F>(F);

/// Use a closure as an [`AssetFactory`]
///
/// ```
/// # use tomb_assets::{factory_fn, Asset, AssetError, AssetType};
/// let strings = AssetType::new(factory_fn(|urn, owner, data: String| {
///     if data.is_empty() {
///         return Err(AssetError::InvalidData { urn, reason: "empty".into() });
///     }
///     Ok(Asset::new(urn, owner, data))
/// }));
/// # let _ = strings;
/// ```
pub fn factory_fn<D, F>(f: F) -> FnFactory<F>
where
    D: AssetData,
    F: Fn(ResourceUrn, AssetOwner<D>, D) -> Result<Asset<D>, AssetError> + Send + Sync,
{
    FnFactory(f)
}

impl<D, F> AssetFactory<D> for FnFactory<F>
where
    D: AssetData,
    F: Fn(ResourceUrn, AssetOwner<D>, D) -> Result<Asset<D>, AssetError> + Send + Sync,
{
    fn build(
        &self,
        urn: ResourceUrn,
        owner: AssetOwner<D>,
        data: D,
    ) -> Result<Asset<D>, AssetError> {
        (self.0)(urn, owner, data)
    }
}
