use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub tables: TableSettings,
}

/// Connection parameters for the MySQL database and its pool.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// The database (schema) name to connect to.
    pub name: String,
    /// Upper bound on concurrently open connections in the pool.
    pub max_connections: u32,
    /// Connections kept open while the pool is idle.
    pub min_connections: u32,
}

impl DatabaseSettings {
    /// Builds the connection URL consumed by the pool.
    pub fn connection_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

/// Bind address for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Per-entity table names. Overridable so deployments can share one
/// database schema between staging and production copies of the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSettings {
    pub users: String,
    pub sessions: String,
    pub trades: String,
    pub challenges: String,
    pub cosmetics: String,
    pub game_reports: String,
}
