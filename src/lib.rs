//! Tomb asset core
//!
//! Keeps one live instance per resource urn and per asset class, and reloads those instances
//! in place so anything holding an asset sees new data without fetching it again. Requests go
//! through an [`AssetManager`] that routes them to the [`AssetType`] registry of the requested
//! data type. Registries are safe to share across threads; work on one urn is serialized while
//! different urns load independently.
//!
//! Resources are addressed by urns of the form `module:resource[#fragment]`. The modules those
//! resources come from are described in [`module`], which also merges the class indices of a
//! module selection into a [`ModuleEnvironment`](module::ModuleEnvironment).
//!
//! # Usage
//!
//! ```
//! # use tomb_assets::{AssetManager, AssetType, formats::misc::Txt};
//! let manager = AssetManager::builder()
//!     .with_asset_type(AssetType::<String>::default())
//!     .build();
//!
//! let urn = "core:greeting".parse().unwrap();
//! let greeting = manager.load_bytes(urn, b"hello", &Txt).unwrap();
//! assert_eq!(*greeting.data().unwrap(), "hello");
//!
//! // a bare name is enough while only one module provides it
//! let found = manager.find_asset::<String>("greeting").unwrap().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&greeting, &found));
//! ```

mod asset;
mod error;
mod factory;
mod mgr;
pub mod module;
mod name;
mod registry;
mod urn;
mod version;

pub use asset::{AsAny, Asset, AssetData};
pub use error::*;
pub use factory::*;
pub use formats::Format;
pub use mgr::*;
pub use name::Name;
pub use registry::{AssetOwner, AssetType};
pub use urn::{ResourceRef, ResourceUrn};
pub use version::{Version, VersionRange};

/// Formats that turn raw bytes handed over by a loader into asset data
pub mod formats {
    use crate::{AssetData, AssetError};

    /// The `format` trait provides an interface for parsing a block of bytes into asset data
    pub trait Format {
        type Output: AssetData;

        /// Parse the bytes of a resource
        fn parse(&self, bytes: &[u8]) -> Result<Self::Output, AssetError>;
    }

    pub mod misc {
        mod bin;
        mod txt;
        pub use bin::*;
        pub use txt::*;
    }
}
