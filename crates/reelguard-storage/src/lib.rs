//! ReelGuard Storage - SQLite persistence layer.
//!
//! This crate provides local storage for ReelGuard. It handles:
//!
//! - Timestamp files keyed by IMDb id (validated on save)
//! - Viewer filter settings as key-value configuration
//!
//! The [`Database`] also acts as a [`reelguard_core::SegmentSource`], so the
//! loading policy can read cached titles directly from it.
//!
//! # Example
//!
//! ```no_run
//! use reelguard_storage::{Database, SettingKey};
//!
//! let db = Database::in_memory().unwrap();
//!
//! // Persist a setting and get the change to forward to a running monitor
//! let change = db.set_setting(SettingKey::FilterMode, "mute").unwrap();
//! assert!(change.filter_mode.is_some());
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{SettingKey, StoredTitle};
pub use pool::ConnectionPool;
pub use repository::{SettingsRepo, TimestampsRepo};
