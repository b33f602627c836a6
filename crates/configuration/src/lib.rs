use crate::error::ConfigError;
use crate::settings::Settings;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{DatabaseSettings, ServerSettings, TableSettings};

/// Loads the application configuration.
///
/// Every setting has a hard-coded default suitable for local development;
/// any of them can be overridden by a `BRAWLHUB_`-prefixed environment
/// variable (`__` separates nesting levels, e.g. `BRAWLHUB_DATABASE__HOST`).
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .set_default("database.host", "localhost")?
        .set_default("database.port", 3306)?
        .set_default("database.user", "root")?
        .set_default("database.password", "")?
        .set_default("database.name", "brawlhub")?
        .set_default("database.max_connections", 10)?
        .set_default("database.min_connections", 2)?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 6969)?
        .set_default("tables.users", "users")?
        .set_default("tables.sessions", "sessions")?
        .set_default("tables.trades", "trades")?
        .set_default("tables.challenges", "challenges")?
        .set_default("tables.cosmetics", "cosmetics")?
        .set_default("tables.game_reports", "game_reports")?
        .add_source(
            config::Environment::with_prefix("BRAWLHUB")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;

    Ok(settings)
}
