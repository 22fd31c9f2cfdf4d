//! Schema analysis: which tables exist and what each one looks like.

mod strategy;

pub use strategy::{CatalogQueryStrategy, DetailStrategy, IntrospectionStrategy};

use crate::config::ConnectionConfig;
use crate::db::{self, Catalog, CatalogError, TypeRegistry};
use crate::error::DatabaseConnectionError;
use crate::types::TableDetail;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Table name prefixes that belong to the database engine itself
const SYSTEM_TABLE_PREFIXES: [&str; 5] = [
    "information_schema",
    "performance_schema",
    "pg_catalog",
    "pg_toast",
    "sqlite_",
];

/// Failure reading one table's detail
#[derive(Debug, Error)]
pub enum IntrospectError {
    /// A column's native type is not one the reading strategy can represent
    #[error("Unknown type {type_name}{}", .column.as_ref().map(|c| format!(" for column `{c}`")).unwrap_or_default())]
    UnknownType {
        column: Option<String>,
        type_name: String,
    },
    #[error("Table `{0}` does not exist")]
    MissingTable(String),
    #[error(transparent)]
    Catalog(CatalogError),
}

impl From<CatalogError> for IntrospectError {
    fn from(err: CatalogError) -> Self {
        match err.unknown_vendor_type() {
            Some(type_name) => Self::UnknownType {
                column: None,
                type_name: type_name.to_string(),
            },
            None => Self::Catalog(err),
        }
    }
}

/// Reads table listings and table details from one database.
///
/// The catalog connection is opened on first use and kept for the lifetime
/// of the analyzer.
pub struct SchemaAnalyzer {
    config: ConnectionConfig,
    registry: TypeRegistry,
    catalog: Option<Box<dyn Catalog>>,
}

impl SchemaAnalyzer {
    pub fn new(config: ConnectionConfig, registry: TypeRegistry) -> Self {
        Self {
            config,
            registry,
            catalog: None,
        }
    }

    /// Analyzer over an already open catalog
    pub fn with_catalog(catalog: Box<dyn Catalog>, registry: TypeRegistry) -> Self {
        let config = ConnectionConfig {
            driver: catalog.driver(),
            ..ConnectionConfig::default()
        };
        Self {
            config,
            registry,
            catalog: Some(catalog),
        }
    }

    /// Open the connection if needed and check that it answers
    pub fn test_connection(&mut self) -> Result<bool, DatabaseConnectionError> {
        self.catalog()?
            .ping()
            .map_err(DatabaseConnectionError::Ping)?;
        Ok(true)
    }

    /// Every user table, in catalog order. Engine-owned tables are left out.
    pub fn list_tables(&mut self) -> Result<Vec<String>, DatabaseConnectionError> {
        let names = self
            .catalog()?
            .table_names()
            .map_err(DatabaseConnectionError::ListTables)?;
        Ok(names.into_iter().filter(|name| !is_system_table(name)).collect())
    }

    /// Tables to process: [`list_tables`](Self::list_tables) narrowed to
    /// `include` (when it is non-empty) with `exclude` removed.
    pub fn analyze_tables(
        &mut self,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<String>, DatabaseConnectionError> {
        let tables = filter_tables(self.list_tables()?, include, exclude);
        debug!(count = tables.len(), "tables selected for analysis");
        Ok(tables)
    }

    /// Full detail of one table.
    ///
    /// The structured introspection facility is tried first. If it cannot
    /// represent a column type, the table is read again with the catalog's
    /// descriptive statements instead.
    pub fn get_table_details(&mut self, table: &str) -> Result<TableDetail, DatabaseConnectionError> {
        let registry = &self.registry;
        let catalog = connected(&mut self.catalog, &self.config)?;

        let structured = IntrospectionStrategy::new(registry);
        let result = match structured.table_details(catalog, table) {
            Err(IntrospectError::UnknownType { column, type_name }) => {
                warn!(
                    table,
                    column = column.as_deref().unwrap_or("?"),
                    type_name = %type_name,
                    "unknown column type, falling back to {}",
                    CatalogQueryStrategy.name()
                );
                CatalogQueryStrategy.table_details(catalog, table)
            }
            other => other,
        };

        result.map_err(|source| DatabaseConnectionError::Table {
            table: table.to_string(),
            source,
        })
    }

    fn catalog(&mut self) -> Result<&mut dyn Catalog, DatabaseConnectionError> {
        connected(&mut self.catalog, &self.config)
    }
}

fn connected<'a>(
    slot: &'a mut Option<Box<dyn Catalog>>,
    config: &ConnectionConfig,
) -> Result<&'a mut dyn Catalog, DatabaseConnectionError> {
    let catalog = match slot.take() {
        Some(catalog) => catalog,
        None => {
            let catalog = db::connect(config).map_err(|source| DatabaseConnectionError::Connect {
                target: config.target(),
                source,
            })?;
            info!(database = %config.target(), "connected");
            catalog
        }
    };
    Ok(&mut **slot.insert(catalog))
}

fn is_system_table(name: &str) -> bool {
    SYSTEM_TABLE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn filter_tables(tables: Vec<String>, include: &[String], exclude: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::with_capacity(tables.len());
    for table in tables {
        if !include.is_empty() && !include.contains(&table) {
            continue;
        }
        if exclude.contains(&table) || selected.contains(&table) {
            continue;
        }
        selected.push(table);
    }
    selected
}
