use thiserror::Error;

/// Failure talking to a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database file not found: {0}")]
    NotFound(String),
    #[error("Invalid SQLite file: {0}")]
    InvalidFile(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),
    #[error("Failed to start MySQL runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("Malformed catalog data for table `{table}`: {message}")]
    Malformed { table: String, message: String },
}

impl CatalogError {
    pub fn malformed(table: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// Vendor enumeration type named by an opaque driver message, if any.
    ///
    /// Drivers that cannot represent `ENUM`/`SET` only say so in their error
    /// text, so this is matched on the message.
    pub fn unknown_vendor_type(&self) -> Option<&'static str> {
        unknown_vendor_type(&self.to_string())
    }
}

fn unknown_vendor_type(message: &str) -> Option<&'static str> {
    let message = message.to_ascii_lowercase();
    ["enum", "set"].into_iter().find(|ty| {
        message.contains(&format!("unknown type {ty}"))
            || message.contains(&format!("unknown database type {ty}"))
    })
}
