//! Common utilities and shared types for roadwatch.
//!
//! This crate provides foundational components used across all roadwatch crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Geodesy**: Validated coordinates and distances via [`GeoPoint`]
//! - **Localisation**: Caller-facing messages via [`Locale`] and [`MessageKey`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: The attachment file store ([`StorageBackend`])
//!
//! # Example
//!
//! ```no_run
//! use roadwatch_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{id} on port {}", config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod i18n;
pub mod id;
pub mod storage;

pub use config::{Config, TransitionPolicy};
pub use error::{AppError, AppResult, ErrorReport};
pub use geo::{BoundingBox, GeoPoint, MAX_SURFACE_DISTANCE_METERS};
pub use i18n::{Locale, MessageKey};
pub use id::IdGenerator;
pub use storage::{LocalStorage, StorageBackend, UploadedFile, generate_storage_key};
