//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteCatalog`] - Remote inspection API (snapshots, trees, downloads)
//! - [`ICatalogStore`] - Persistent storage for the entity catalog
//! - [`IAssetStore`] - Persistent storage for asset records and ownership
//! - [`IContentStore`] - On-disk asset content cache

pub mod asset_store;
pub mod catalog_store;
pub mod content_store;
pub mod remote_catalog;

pub use asset_store::{AssetCounts, IAssetStore, PurgedAssets};
pub use catalog_store::{CatalogCounts, ICatalogStore, PurgedCatalog};
pub use content_store::IContentStore;
pub use remote_catalog::IRemoteCatalog;
