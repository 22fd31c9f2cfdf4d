use crate::analyzer::IntrospectError;
use crate::db::CatalogError;
use crate::extractor::ExtractError;
use crate::generator::GenerateError;
use std::path::PathBuf;
use thiserror::Error;

/// Catalog unreachable, or a table could not be read from it
#[derive(Debug, Error)]
pub enum DatabaseConnectionError {
    #[error("Could not connect to {target}")]
    Connect {
        target: String,
        #[source]
        source: CatalogError,
    },
    #[error("Connection check failed")]
    Ping(#[source] CatalogError),
    #[error("Could not list tables")]
    ListTables(#[source] CatalogError),
    #[error("Could not read table `{table}`")]
    Table {
        table: String,
        #[source]
        source: IntrospectError,
    },
}

impl DatabaseConnectionError {
    /// Table the failure is scoped to, when there is one
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Table { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// A table's detail could not be turned into metadata
#[derive(Debug, Error)]
#[error("Could not extract metadata for table `{table}`")]
pub struct MetadataExtractionError {
    pub table: String,
    #[source]
    pub source: ExtractError,
}

/// Top-level failure of a generation run
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Connection(#[from] DatabaseConnectionError),
    #[error("No tables to process after applying the include and exclude lists")]
    NoTables,
    #[error(transparent)]
    Extraction(#[from] MetadataExtractionError),
    #[error("Could not generate artifacts for table `{table}`")]
    Generate {
        table: String,
        #[source]
        source: GenerateError,
    },
    #[error("Could not write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Table `{table}` maps to entity `{entity}`, already generated from table `{existing}`")]
    EntityCollision {
        table: String,
        entity: String,
        existing: String,
    },
    #[error("All {count} tables failed")]
    AllTablesFailed {
        count: usize,
        #[source]
        first: Box<GenerationError>,
    },
}
