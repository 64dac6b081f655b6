//! Database repositories for each table.

pub mod settings;
pub mod timestamps;

pub use settings::SettingsRepo;
pub use timestamps::TimestampsRepo;
