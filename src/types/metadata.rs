use crate::mapper::{LanguageType, PersistenceType};
use crate::types::{IndexInfo, ReferentialAction};
use serde::{Serialize, Serializer};
use std::fmt;

/// Generation-ready description of one table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub table_name: String,
    pub entity_name: String,
    pub repository_name: String,
    pub properties: Vec<PropertyMetadata>,
    pub relations: Vec<RelationMetadata>,
    /// Non-primary indexes only
    pub indexes: Vec<IndexInfo>,
    pub primary_key: Vec<String>,
}

impl TableMetadata {
    pub fn property(&self, column_name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.column_name == column_name)
    }

    pub fn relation(&self, property_name: &str) -> Option<&RelationMetadata> {
        self.relations
            .iter()
            .find(|r| r.property_name == property_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMetadata {
    pub column_name: String,
    pub property_name: String,
    pub language_type: PropertyType,
    pub persistence_type: PersistenceType,
    pub nullable: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<String>,
    pub is_primary: bool,
    pub auto_increment: bool,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_values: Option<Vec<String>>,
    /// The entity must assign this field itself before its first save
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub needs_lifecycle_default: bool,
}

/// A language type, optionally qualified as nullable (`?string`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyType {
    pub base: LanguageType,
    pub nullable: bool,
}

impl PropertyType {
    pub fn new(base: LanguageType, nullable: bool) -> Self {
        Self { base, nullable }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            f.write_str("?")?;
        }
        f.write_str(self.base.as_str())
    }
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ManyToOne,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationMetadata {
    pub kind: RelationKind,
    pub property_name: String,
    pub target_entity: String,
    pub target_table: String,
    pub local_columns: Vec<String>,
    pub foreign_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
    pub nullable: bool,
}
