//! In-memory catalog for tests, seeded from raw catalog rows

use crate::config::Driver;
use crate::db::{normalize_default, Catalog, CatalogColumn, CatalogError};
use crate::mapper;
use crate::types::{DescribeRow, ForeignKeyInfo, IndexInfo, IndexRow, KeyUsageRow};
use indexmap::IndexMap;
use std::collections::HashSet;

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn column(field: &str, native_type: &str, null: bool, key: &str) -> DescribeRow {
    DescribeRow {
        field: field.to_string(),
        native_type: native_type.to_string(),
        null: if null { "YES" } else { "NO" }.to_string(),
        key: key.to_string(),
        default: None,
        extra: String::new(),
        comment: String::new(),
    }
}

pub fn auto_increment(mut row: DescribeRow) -> DescribeRow {
    row.extra = "auto_increment".to_string();
    row
}

pub fn with_default(mut row: DescribeRow, default: &str) -> DescribeRow {
    row.default = Some(default.to_string());
    row
}

pub fn with_comment(mut row: DescribeRow, comment: &str) -> DescribeRow {
    row.comment = comment.to_string();
    row
}

pub fn last_update() -> DescribeRow {
    let mut row = with_default(column("last_update", "timestamp", false, ""), "CURRENT_TIMESTAMP");
    row.extra = "DEFAULT_GENERATED on update CURRENT_TIMESTAMP".to_string();
    row
}

pub fn foreign_key(
    name: &str,
    pairs: &[(&str, &str)],
    target: &str,
    update_rule: &str,
    delete_rule: &str,
) -> Vec<KeyUsageRow> {
    pairs
        .iter()
        .zip(1..)
        .map(|((local, foreign), position)| KeyUsageRow {
            constraint_name: name.to_string(),
            column_name: local.to_string(),
            ordinal_position: position,
            referenced_table: target.to_string(),
            referenced_column: foreign.to_string(),
            update_rule: Some(update_rule.to_string()),
            delete_rule: Some(delete_rule.to_string()),
        })
        .collect()
}

pub fn index(name: &str, columns: &[&str], unique: bool) -> Vec<IndexRow> {
    columns
        .iter()
        .zip(1..)
        .map(|(column, position)| IndexRow {
            key_name: name.to_string(),
            non_unique: !unique,
            seq_in_index: position,
            column_name: column.to_string(),
            primary: name == "PRIMARY",
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub columns: Vec<DescribeRow>,
    pub key_usage: Vec<KeyUsageRow>,
    pub index_rows: Vec<IndexRow>,
}

/// Catalog backed by canned rows.
///
/// The structured facilities are derived from the raw rows, so both read
/// paths see the same schema.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    tables: IndexMap<String, FakeTable>,
    listed_only: Vec<String>,
    failing: HashSet<String>,
    structured_keys: bool,
    pub ping_fails: bool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            structured_keys: true,
            ..Self::default()
        }
    }

    pub fn with_table(mut self, name: &str, table: FakeTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// A name that shows up in the table listing but has no detail
    pub fn with_listed(mut self, name: &str) -> Self {
        self.listed_only.push(name.to_string());
        self
    }

    /// Every read of `name` fails with a driver-style error
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Structured index and foreign key reads come back empty
    pub fn without_structured_keys(mut self) -> Self {
        self.structured_keys = false;
        self
    }

    pub fn sakila() -> Self {
        let actor = FakeTable {
            columns: vec![
                auto_increment(column("actor_id", "smallint unsigned", false, "PRI")),
                column("first_name", "varchar(45)", false, ""),
                column("last_name", "varchar(45)", false, "MUL"),
                last_update(),
            ],
            key_usage: Vec::new(),
            index_rows: [
                index("PRIMARY", &["actor_id"], true),
                index("idx_actor_last_name", &["last_name"], false),
            ]
            .concat(),
        };

        let film = FakeTable {
            columns: vec![
                auto_increment(column("film_id", "smallint unsigned", false, "PRI")),
                column("title", "varchar(128)", false, "MUL"),
                column("description", "text", true, ""),
                column("language_id", "tinyint unsigned", false, "MUL"),
                with_default(column("rental_rate", "decimal(4,2)", false, ""), "4.99"),
                with_comment(
                    with_default(
                        column("rating", "enum('G','PG','PG-13','R','NC-17')", true, ""),
                        "G",
                    ),
                    "MPAA rating",
                ),
                column(
                    "special_features",
                    "set('Trailers','Commentaries','Deleted Scenes','Behind the Scenes')",
                    true,
                    "",
                ),
                last_update(),
            ],
            key_usage: foreign_key(
                "fk_film_language",
                &[("language_id", "language_id")],
                "language",
                "CASCADE",
                "RESTRICT",
            ),
            index_rows: [
                index("PRIMARY", &["film_id"], true),
                index("idx_title", &["title"], false),
                index("idx_fk_language_id", &["language_id"], false),
            ]
            .concat(),
        };

        let film_actor = FakeTable {
            columns: vec![
                column("actor_id", "smallint unsigned", false, "PRI"),
                column("film_id", "smallint unsigned", false, "PRI"),
                last_update(),
            ],
            key_usage: [
                foreign_key(
                    "fk_film_actor_actor",
                    &[("actor_id", "actor_id")],
                    "actor",
                    "CASCADE",
                    "RESTRICT",
                ),
                foreign_key(
                    "fk_film_actor_film",
                    &[("film_id", "film_id")],
                    "film",
                    "CASCADE",
                    "RESTRICT",
                ),
            ]
            .concat(),
            index_rows: [
                index("PRIMARY", &["actor_id", "film_id"], true),
                index("idx_fk_film_id", &["film_id"], false),
            ]
            .concat(),
        };

        let language = FakeTable {
            columns: vec![
                auto_increment(column("language_id", "tinyint unsigned", false, "PRI")),
                column("name", "char(20)", false, ""),
                last_update(),
            ],
            key_usage: Vec::new(),
            index_rows: index("PRIMARY", &["language_id"], true),
        };

        Self::new()
            .with_table("actor", actor)
            .with_table("film", film)
            .with_table("film_actor", film_actor)
            .with_table("language", language)
    }

    fn table(&self, name: &str) -> Result<Option<&FakeTable>, CatalogError> {
        if self.failing.contains(name) {
            return Err(CatalogError::malformed(name, "lost connection during query"));
        }
        Ok(self.tables.get(name))
    }
}

impl Catalog for FakeCatalog {
    fn driver(&self) -> Driver {
        Driver::Mysql
    }

    fn ping(&mut self) -> Result<(), CatalogError> {
        if self.ping_fails {
            return Err(CatalogError::NotFound("fake server".to_string()));
        }
        Ok(())
    }

    fn table_names(&mut self) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .tables
            .keys()
            .chain(self.listed_only.iter())
            .cloned()
            .collect())
    }

    fn columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, CatalogError> {
        let Some(found) = self.table(table)? else {
            return Ok(Vec::new());
        };
        Ok(found
            .columns
            .iter()
            .map(|row| {
                let dimensions = mapper::type_dimensions(&row.native_type);
                CatalogColumn {
                    name: row.field.clone(),
                    native_type: row.native_type.clone(),
                    length: dimensions.length,
                    precision: dimensions.precision,
                    scale: dimensions.scale,
                    nullable: row.is_nullable(),
                    default: normalize_default(row.default.clone()),
                    auto_increment: row.is_auto_increment(),
                    comment: row.comment.clone(),
                }
            })
            .collect())
    }

    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .describe_columns(table)?
            .into_iter()
            .filter(|row| row.is_primary())
            .map(|row| row.field)
            .collect())
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, CatalogError> {
        if !self.structured_keys {
            return Ok(Vec::new());
        }
        Ok(IndexRow::group(self.index_rows(table)?))
    }

    fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyInfo>, CatalogError> {
        if !self.structured_keys {
            return Ok(Vec::new());
        }
        Ok(KeyUsageRow::group(self.key_usage(table)?))
    }

    fn describe_columns(&mut self, table: &str) -> Result<Vec<DescribeRow>, CatalogError> {
        Ok(self
            .table(table)?
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    fn key_usage(&mut self, table: &str) -> Result<Vec<KeyUsageRow>, CatalogError> {
        Ok(self
            .table(table)?
            .map(|t| t.key_usage.clone())
            .unwrap_or_default())
    }

    fn index_rows(&mut self, table: &str) -> Result<Vec<IndexRow>, CatalogError> {
        Ok(self
            .table(table)?
            .map(|t| t.index_rows.clone())
            .unwrap_or_default())
    }
}
