use super::{normalize_default, quote_identifier, Catalog, CatalogColumn, CatalogError};
use crate::config::Driver;
use crate::mapper;
use crate::types::{DescribeRow, ForeignKeyInfo, IndexInfo, IndexRow, KeyUsageRow, ReferentialAction};
use indexmap::IndexMap;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// SQLite catalog backed by a single `rusqlite` connection
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open a database file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            return Err(CatalogError::NotFound(path_str));
        }

        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // rusqlite opens lazily; the first read is what rejects a non-database file
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("not a database") || message.contains("file is encrypted") {
                CatalogError::InvalidFile(path_str.clone())
            } else {
                CatalogError::from(e)
            }
        })?;

        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self { conn })
    }

    /// Wrap an already-open connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn table_sql(&self, table: &str) -> Result<Option<String>, CatalogError> {
        let sql = self
            .conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |row| row.get::<_, Option<String>>(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(sql)
    }

    // Heuristic: INTEGER PRIMARY KEY declared with AUTOINCREMENT
    fn has_autoincrement(&self, table: &str) -> Result<bool, CatalogError> {
        Ok(self
            .table_sql(table)?
            .map(|sql| sql.to_uppercase().contains("AUTOINCREMENT"))
            .unwrap_or(false))
    }

    fn table_info(&self, table: &str) -> Result<Vec<TableInfoRow>, CatalogError> {
        let mut stmt = self.conn.prepare(&format!(
            "PRAGMA table_info({})",
            quote_identifier(table)
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TableInfoRow {
                    name: row.get(1)?,
                    data_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get(3)?,
                    default_value: row.get(4)?,
                    pk: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // Foreign keys may omit the referenced columns, meaning the target's primary key
    fn resolve_referenced_columns(
        &self,
        target: &str,
        count: usize,
    ) -> Result<Vec<String>, CatalogError> {
        let mut pk: Vec<TableInfoRow> = self
            .table_info(target)?
            .into_iter()
            .filter(|c| c.pk > 0)
            .collect();
        pk.sort_by_key(|c| c.pk);
        let columns: Vec<String> = pk.into_iter().map(|c| c.name).collect();
        if columns.len() != count {
            return Err(CatalogError::malformed(
                target,
                format!(
                    "foreign key references {count} implicit column(s) but the primary key has {}",
                    columns.len()
                ),
            ));
        }
        Ok(columns)
    }

    fn foreign_key_rows(&self, table: &str) -> Result<Vec<ForeignKeyRow>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seq, \"table\", \"from\", \"to\", on_update, on_delete \
             FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
        )?;
        let rows = stmt
            .query_map([table], |row| {
                Ok(ForeignKeyRow {
                    id: row.get(0)?,
                    seq: row.get(1)?,
                    foreign_table: row.get(2)?,
                    from: row.get(3)?,
                    to: row.get(4)?,
                    on_update: row.get(5)?,
                    on_delete: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn constraint_name(table: &str, id: i64) -> String {
        format!("fk_{table}_{id}")
    }
}

struct TableInfoRow {
    name: String,
    data_type: String,
    not_null: bool,
    default_value: Option<String>,
    pk: i64,
}

struct ForeignKeyRow {
    id: i64,
    seq: i64,
    foreign_table: String,
    from: String,
    to: Option<String>,
    on_update: Option<String>,
    on_delete: Option<String>,
}

impl Catalog for SqliteCatalog {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    fn ping(&mut self) -> Result<(), CatalogError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn table_names(&mut self) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, CatalogError> {
        let auto_increment_table = self.has_autoincrement(table)?;

        let columns = self
            .table_info(table)?
            .into_iter()
            .map(|row| {
                let dimensions = mapper::type_dimensions(&row.data_type);
                let auto_increment = row.pk > 0
                    && auto_increment_table
                    && row.data_type.to_uppercase().contains("INT");

                CatalogColumn {
                    name: row.name,
                    native_type: row.data_type,
                    length: dimensions.length,
                    precision: dimensions.precision,
                    scale: dimensions.scale,
                    // a primary key column is NOT NULL even when SQLite does not say so
                    nullable: !row.not_null && row.pk == 0,
                    default: normalize_default(row.default_value),
                    auto_increment,
                    comment: String::new(),
                }
            })
            .collect();
        Ok(columns)
    }

    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, CatalogError> {
        let mut pk: Vec<TableInfoRow> = self
            .table_info(table)?
            .into_iter()
            .filter(|c| c.pk > 0)
            .collect();
        pk.sort_by_key(|c| c.pk);
        Ok(pk.into_iter().map(|c| c.name).collect())
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, CatalogError> {
        let mut stmt = self.conn.prepare(&format!(
            "PRAGMA index_list({})",
            quote_identifier(table)
        ))?;

        let listed = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let unique: bool = row.get(2)?;
                let origin: String = row.get(3)?;
                Ok((name, unique, origin))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut indexes = Vec::with_capacity(listed.len());
        for (name, unique, origin) in listed {
            let mut col_stmt = self.conn.prepare(&format!(
                "PRAGMA index_info({})",
                quote_identifier(&name)
            ))?;

            // expression columns have no name
            let columns = col_stmt
                .query_map([], |row| row.get::<_, Option<String>>(2))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect();

            indexes.push(IndexInfo {
                name,
                columns,
                unique,
                is_primary: origin == "pk",
            });
        }
        // index_list reports the most recent index first
        indexes.reverse();
        Ok(indexes)
    }

    fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyInfo>, CatalogError> {
        let mut grouped: IndexMap<i64, Vec<ForeignKeyRow>> = IndexMap::new();
        for row in self.foreign_key_rows(table)? {
            grouped.entry(row.id).or_default().push(row);
        }

        let mut foreign_keys = Vec::with_capacity(grouped.len());
        for (id, mut pairs) in grouped {
            pairs.sort_by_key(|p| p.seq);
            let foreign_table = pairs[0].foreign_table.clone();
            let on_update = ReferentialAction::parse(pairs[0].on_update.as_deref());
            let on_delete = ReferentialAction::parse(pairs[0].on_delete.as_deref());
            let local_columns: Vec<String> = pairs.iter().map(|p| p.from.clone()).collect();

            let foreign_columns = if pairs.iter().all(|p| p.to.is_some()) {
                pairs.into_iter().filter_map(|p| p.to).collect()
            } else {
                self.resolve_referenced_columns(&foreign_table, local_columns.len())?
            };

            foreign_keys.push(ForeignKeyInfo {
                name: Self::constraint_name(table, id),
                local_columns,
                foreign_table,
                foreign_columns,
                on_update,
                on_delete,
            });
        }
        Ok(foreign_keys)
    }

    fn describe_columns(&mut self, table: &str) -> Result<Vec<DescribeRow>, CatalogError> {
        let auto_increment_table = self.has_autoincrement(table)?;

        let mut stmt = self.conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = stmt
            .query_map([table], |row| {
                let native_type: String = row.get::<_, Option<String>>(1)?.unwrap_or_default();
                let not_null: bool = row.get(2)?;
                let pk: i64 = row.get(4)?;
                let auto_increment =
                    pk > 0 && auto_increment_table && native_type.to_uppercase().contains("INT");
                Ok(DescribeRow {
                    field: row.get(0)?,
                    native_type,
                    null: if not_null || pk > 0 { "NO" } else { "YES" }.to_string(),
                    key: if pk > 0 { "PRI" } else { "" }.to_string(),
                    default: row.get(3)?,
                    extra: if auto_increment { "auto_increment" } else { "" }.to_string(),
                    comment: String::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn key_usage(&mut self, table: &str) -> Result<Vec<KeyUsageRow>, CatalogError> {
        let rows = self.foreign_key_rows(table)?;

        let mut usage = Vec::with_capacity(rows.len());
        for row in rows {
            let referenced_column = match row.to {
                Some(column) => column,
                None => {
                    let position = usize::try_from(row.seq).unwrap_or_default();
                    self.primary_key(&row.foreign_table)?
                        .into_iter()
                        .nth(position)
                        .ok_or_else(|| {
                            CatalogError::malformed(
                                table,
                                format!(
                                    "foreign key {} has no referenced column at position {position}",
                                    row.id
                                ),
                            )
                        })?
                }
            };
            usage.push(KeyUsageRow {
                constraint_name: Self::constraint_name(table, row.id),
                column_name: row.from,
                ordinal_position: u32::try_from(row.seq + 1).unwrap_or(u32::MAX),
                referenced_table: row.foreign_table,
                referenced_column,
                update_rule: row.on_update,
                delete_rule: row.on_delete,
            });
        }
        Ok(usage)
    }

    fn index_rows(&mut self, table: &str) -> Result<Vec<IndexRow>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT il.name, il.\"unique\", il.origin, ii.seqno, ii.name \
             FROM pragma_index_list(?1) AS il \
             JOIN pragma_index_info(il.name) AS ii \
             WHERE ii.name IS NOT NULL \
             ORDER BY il.seq DESC, ii.seqno",
        )?;
        let rows = stmt
            .query_map([table], |row| {
                let unique: bool = row.get(1)?;
                let origin: String = row.get(2)?;
                let seqno: i64 = row.get(3)?;
                Ok(IndexRow {
                    key_name: row.get(0)?,
                    non_unique: !unique,
                    seq_in_index: u32::try_from(seqno + 1).unwrap_or(u32::MAX),
                    column_name: row.get(4)?,
                    primary: origin == "pk",
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog(ddl: &str) -> SqliteCatalog {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        SqliteCatalog::from_connection(conn)
    }

    const SAKILA_SUBSET: &str = "
        CREATE TABLE language (
            language_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name CHAR(20) NOT NULL,
            last_update TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE film (
            film_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title VARCHAR(255) NOT NULL,
            rental_rate DECIMAL(4,2) NOT NULL DEFAULT 4.99,
            rating VARCHAR(10) DEFAULT 'G',
            language_id INTEGER NOT NULL REFERENCES language (language_id) ON UPDATE CASCADE,
            original_language_id INTEGER REFERENCES language
        );
        CREATE INDEX idx_title ON film (title);
        CREATE TABLE film_actor (
            actor_id INTEGER NOT NULL,
            film_id INTEGER NOT NULL REFERENCES film (film_id),
            PRIMARY KEY (actor_id, film_id)
        );
        CREATE UNIQUE INDEX idx_pair ON film_actor (film_id, actor_id);
    ";

    #[test]
    fn lists_tables_including_internal() {
        let mut catalog = catalog(SAKILA_SUBSET);
        let names = catalog.table_names().unwrap();
        assert_eq!(
            names,
            vec!["film", "film_actor", "language", "sqlite_sequence"]
        );
    }

    #[test]
    fn structured_columns() {
        let mut catalog = catalog(SAKILA_SUBSET);
        let columns = catalog.columns("film").unwrap();

        assert_eq!(columns.len(), 6);
        let film_id = &columns[0];
        assert!(film_id.auto_increment);
        assert!(!film_id.nullable);

        let title = &columns[1];
        assert_eq!(title.native_type, "VARCHAR(255)");
        assert_eq!(title.length, Some(255));

        let rate = &columns[2];
        assert_eq!((rate.precision, rate.scale), (Some(4), Some(2)));
        assert_eq!(rate.default.as_deref(), Some("4.99"));

        let rating = &columns[3];
        assert!(rating.nullable);
        assert_eq!(rating.default.as_deref(), Some("G"));
    }

    #[test]
    fn current_timestamp_default_is_normalized() {
        let mut catalog = catalog(SAKILA_SUBSET);
        let columns = catalog.columns("language").unwrap();
        assert_eq!(columns[2].default.as_deref(), Some("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn composite_primary_key_in_declared_order() {
        let mut catalog = catalog(SAKILA_SUBSET);
        assert_eq!(
            catalog.primary_key("film_actor").unwrap(),
            vec!["actor_id", "film_id"]
        );
        assert_eq!(catalog.primary_key("film").unwrap(), vec!["film_id"]);
    }

    #[test]
    fn foreign_keys_resolve_implicit_target_columns() {
        let mut catalog = catalog(SAKILA_SUBSET);
        let fks = catalog.foreign_keys("film").unwrap();

        assert_eq!(fks.len(), 2);
        let by_column = |col: &str| {
            fks.iter()
                .find(|fk| fk.local_columns == vec![col.to_string()])
                .unwrap()
        };
        let language = by_column("language_id");
        assert_eq!(language.foreign_table, "language");
        assert_eq!(language.foreign_columns, vec!["language_id"]);
        assert_eq!(language.on_update, ReferentialAction::Cascade);

        let original = by_column("original_language_id");
        assert_eq!(original.foreign_columns, vec!["language_id"]);
        assert_eq!(original.on_delete, ReferentialAction::NoAction);
    }

    #[test]
    fn structured_indexes_mark_primary() {
        let mut catalog = catalog(SAKILA_SUBSET);
        let indexes = catalog.indexes("film_actor").unwrap();

        let primary = indexes.iter().find(|i| i.is_primary).unwrap();
        assert_eq!(primary.columns, vec!["actor_id", "film_id"]);

        let pair = indexes.iter().find(|i| i.name == "idx_pair").unwrap();
        assert!(pair.unique);
        assert_eq!(pair.columns, vec!["film_id", "actor_id"]);
    }

    #[test]
    fn raw_rows_match_structured_data() {
        let mut catalog = catalog(SAKILA_SUBSET);

        let described = catalog.describe_columns("film").unwrap();
        assert_eq!(described[0].key, "PRI");
        assert_eq!(described[0].extra, "auto_increment");
        assert_eq!(described[3].null, "YES");
        assert_eq!(described[3].default.as_deref(), Some("'G'"));

        let usage = catalog.key_usage("film_actor").unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].referenced_table, "film");
        assert_eq!(usage[0].ordinal_position, 1);

        let grouped = IndexRow::group(catalog.index_rows("film_actor").unwrap());
        let mut structured = catalog.indexes("film_actor").unwrap();
        structured.sort_by(|a, b| a.name.cmp(&b.name));
        let mut grouped_sorted = grouped;
        grouped_sorted.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(grouped_sorted, structured);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SqliteCatalog::open("/definitely/not/here.db").err().unwrap();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
}
