use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which database engine a connection targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Mysql,
    Sqlite,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Mysql => f.write_str("mysql"),
            Driver::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Connection descriptor for the catalog being read.
///
/// For SQLite only `database` is used, as the path of the database file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub charset: String,
}

impl ConnectionConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            database: path.into(),
            ..Self::default()
        }
    }

    /// Human-readable target for log lines and errors; never includes the password
    pub fn target(&self) -> String {
        match self.driver {
            Driver::Mysql => format!(
                "mysql://{}@{}:{}/{}",
                self.username, self.host, self.port, self.database
            ),
            Driver::Sqlite => format!("sqlite://{}", self.database),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Mysql,
            host: "127.0.0.1".to_string(),
            port: 3306,
            database: String::new(),
            username: "root".to_string(),
            password: String::new(),
            charset: "utf8mb4".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("charset", &self.charset)
            .finish()
    }
}

/// Options for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Tables to process; empty means every table
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Namespace the generated classes live in
    pub namespace: String,
    pub output_dir: PathBuf,
    /// Build everything but write nothing
    pub dry_run: bool,
    /// Abort the run at the first table that fails
    pub fail_fast: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            namespace: "App\\Entity".to_string(),
            output_dir: PathBuf::from("generated"),
            dry_run: false,
            fail_fast: false,
        }
    }
}
