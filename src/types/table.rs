use crate::mapper::PersistenceType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Information about a table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    /// Raw catalog type, e.g. `enum('G','PG')` or `decimal(5,2) unsigned`
    pub native_type: String,
    /// Persistence type resolved by whichever catalog strategy produced the column
    pub persistence_type: PersistenceType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_values: Option<Vec<String>>,
}

/// Information about an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub is_primary: bool,
}

/// Information about a foreign key constraint
///
/// `local_columns` and `foreign_columns` are paired by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    pub name: String,
    pub local_columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

/// Everything the analyzer knows about one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetail {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub primary_key: Vec<String>,
}

impl TableDetail {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `column` takes part in any foreign key of this table
    pub fn is_foreign_key_column(&self, column: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.local_columns.iter().any(|c| c == column))
    }
}

/// Action taken on the referencing rows when the referenced row changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "NO ACTION")]
    NoAction,
}

impl ReferentialAction {
    /// Parse a catalog rule string. Missing or unrecognized rules read as `RESTRICT`.
    pub fn parse(rule: Option<&str>) -> Self {
        let Some(rule) = rule else {
            return Self::Restrict;
        };
        match rule.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "NO ACTION" => Self::NoAction,
            _ => Self::Restrict,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
