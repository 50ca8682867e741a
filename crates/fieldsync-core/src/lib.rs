//! FieldSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Project`, `Defect`, `InspectionEvent`, `AssetRecord`
//! - **Download state machine** - per-asset `DownloadStatus` transitions
//! - **Port definitions** - Traits for adapters: `ICatalogStore`, `IAssetStore`,
//!   `IRemoteCatalog`, `IContentStore`
//! - **Configuration** - YAML-backed settings with validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement. The sync engine
//! in `fieldsync-engine` orchestrates domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
