mod error;
mod mysql;
mod registry;
mod sqlite;

use crate::config::{ConnectionConfig, Driver};
use crate::types::{DescribeRow, ForeignKeyInfo, IndexInfo, IndexRow, KeyUsageRow};

pub use error::CatalogError;
pub use mysql::MySqlCatalog;
pub use registry::TypeRegistry;
pub use sqlite::SqliteCatalog;

/// A column as the structured introspection facility reports it, before its
/// type is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    pub native_type: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub comment: String,
}

/// Read access to a database catalog.
///
/// The structured facilities (`columns`, `primary_key`, `indexes`,
/// `foreign_keys`) return normalized data. The raw facilities
/// (`describe_columns`, `key_usage`, `index_rows`) return rows in the shape of
/// MySQL's descriptive statements so one fallback path can serve every
/// backend.
pub trait Catalog {
    fn driver(&self) -> Driver;

    fn ping(&mut self) -> Result<(), CatalogError>;

    /// Every base table in the target schema, system tables included
    fn table_names(&mut self) -> Result<Vec<String>, CatalogError>;

    fn columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, CatalogError>;

    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, CatalogError>;

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, CatalogError>;

    fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyInfo>, CatalogError>;

    fn describe_columns(&mut self, table: &str) -> Result<Vec<DescribeRow>, CatalogError>;

    fn key_usage(&mut self, table: &str) -> Result<Vec<KeyUsageRow>, CatalogError>;

    fn index_rows(&mut self, table: &str) -> Result<Vec<IndexRow>, CatalogError>;
}

/// Open a catalog connection for `config`
pub fn connect(config: &ConnectionConfig) -> Result<Box<dyn Catalog>, CatalogError> {
    let catalog: Box<dyn Catalog> = match config.driver {
        Driver::Mysql => Box::new(MySqlCatalog::connect(config)?),
        Driver::Sqlite => Box::new(SqliteCatalog::open(&config.database)?),
    };
    tracing::debug!(database = %config.target(), "catalog connection established");
    Ok(catalog)
}

/// Normalize a column default as reported by a catalog.
///
/// SQL `NULL` becomes `None`, quoted literals lose their quotes and every
/// spelling of the current-timestamp function becomes `CURRENT_TIMESTAMP`.
pub(crate) fn normalize_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();

    if lowered == "null" {
        return None;
    }
    if lowered.starts_with("current_timestamp") || lowered == "now()" {
        return Some(CURRENT_TIMESTAMP.to_string());
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        return Some(inner.replace("''", "'"));
    }
    Some(raw)
}

/// Default marker for columns the server fills with the current time
pub const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
