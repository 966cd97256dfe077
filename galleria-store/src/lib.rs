// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Galleria Store
//!
//! Orchestration and state for Galleria.
//!
//! This crate provides:
//!
//! - **ResultCache**: TTL + LRU cache of successful extractions
//! - **Orchestrator**: identity, cache, in-flight sharing and the chain
//! - **MediaService**: the public extraction entry point
//! - **EngineSettings**: tunables with JSON persistence
//!
//! ## Usage
//!
//! ```ignore
//! use galleria_store::{EngineSettings, MediaService};
//!
//! let settings = EngineSettings::load(&default_settings_path()).await;
//! let service = MediaService::from_settings(&settings)?;
//!
//! let result = service.extract_from_clicked_element(&element, None).await;
//! if result.success {
//!     println!("{} items, clicked {}", result.media_items.len(), result.clicked_index);
//! }
//! ```

pub mod cache;
pub mod error;
pub mod orchestrator;
pub mod persistence;
pub mod service;
pub mod settings;

pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use error::StoreError;
pub use orchestrator::{MetricsSummary, Orchestrator, OrchestratorMetrics};
pub use persistence::{
    default_config_dir, default_settings_path, ensure_dir, load_json, load_json_or_default,
    save_json,
};
pub use service::MediaService;
pub use settings::{ApiSettings, CacheSettings, EngineSettings, ExtractionConfig, LogLevel};
