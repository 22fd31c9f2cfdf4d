use super::{normalize_default, Catalog, CatalogColumn, CatalogError};
use crate::config::{ConnectionConfig, Driver};
use crate::mapper;
use crate::types::{DescribeRow, ForeignKeyInfo, IndexInfo, IndexRow, KeyUsageRow};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Executor, Row};
use tokio::runtime::{Builder, Runtime};

/// MySQL / MariaDB catalog.
///
/// The driver is async; every call is driven to completion on a private
/// current-thread runtime so the catalog stays synchronous. Queries run one
/// at a time over a single connection.
pub struct MySqlCatalog {
    runtime: Runtime,
    conn: MySqlConnection,
    schema: String,
}

const COLUMNS_SQL: &str = "\
    SELECT CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR), \
           CAST(IS_NULLABLE AS CHAR), CAST(COLUMN_DEFAULT AS CHAR), CAST(EXTRA AS CHAR), \
           CAST(COLUMN_COMMENT AS CHAR), CAST(CHARACTER_MAXIMUM_LENGTH AS CHAR), \
           CAST(NUMERIC_PRECISION AS CHAR), CAST(NUMERIC_SCALE AS CHAR) \
    FROM information_schema.COLUMNS \
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
    ORDER BY ORDINAL_POSITION";

const PRIMARY_KEY_SQL: &str = "\
    SELECT CAST(COLUMN_NAME AS CHAR) \
    FROM information_schema.KEY_COLUMN_USAGE \
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
    ORDER BY ORDINAL_POSITION";

const STATISTICS_SQL: &str = "\
    SELECT CAST(INDEX_NAME AS CHAR), CAST(NON_UNIQUE AS CHAR), \
           CAST(SEQ_IN_INDEX AS CHAR), CAST(COLUMN_NAME AS CHAR) \
    FROM information_schema.STATISTICS \
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME IS NOT NULL \
    ORDER BY INDEX_NAME = 'PRIMARY' DESC, INDEX_NAME, SEQ_IN_INDEX";

const KEY_USAGE_SQL: &str = "\
    SELECT CAST(k.CONSTRAINT_NAME AS CHAR), CAST(k.COLUMN_NAME AS CHAR), \
           CAST(k.ORDINAL_POSITION AS CHAR), CAST(k.REFERENCED_TABLE_NAME AS CHAR), \
           CAST(k.REFERENCED_COLUMN_NAME AS CHAR), CAST(r.UPDATE_RULE AS CHAR), \
           CAST(r.DELETE_RULE AS CHAR) \
    FROM information_schema.KEY_COLUMN_USAGE k \
    JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
      ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA \
     AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
     AND r.TABLE_NAME = k.TABLE_NAME \
    WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ? AND k.REFERENCED_TABLE_NAME IS NOT NULL \
    ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

impl MySqlCatalog {
    pub fn connect(config: &ConnectionConfig) -> Result<Self, CatalogError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CatalogError::Runtime)?;

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .charset(&config.charset);

        let conn = runtime.block_on(MySqlConnection::connect_with(&options))?;

        Ok(Self {
            runtime,
            conn,
            schema: config.database.clone(),
        })
    }

    /// Prepared statement bound to the current schema and `table`
    fn fetch_for_table(&mut self, sql: &str, table: &str) -> Result<Vec<MySqlRow>, CatalogError> {
        let query = sqlx::query(sql).bind(self.schema.as_str()).bind(table);
        let rows = self.runtime.block_on(query.fetch_all(&mut self.conn))?;
        Ok(rows)
    }

    /// Plain-text statement; `SHOW` statements go through here
    fn fetch_text(&mut self, sql: &str) -> Result<Vec<MySqlRow>, CatalogError> {
        let rows = self
            .runtime
            .block_on((&mut self.conn).fetch_all(sql))?;
        Ok(rows)
    }
}

// Every value is read as text: information_schema columns change their
// reported types between server versions, and SHOW statements use the text
// protocol anyway.
fn text(row: &MySqlRow, index: usize) -> Result<Option<String>, CatalogError> {
    let bytes: Option<Vec<u8>> = row.try_get_unchecked(index)?;
    Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
}

fn required_text(row: &MySqlRow, index: usize, table: &str) -> Result<String, CatalogError> {
    text(row, index)?.ok_or_else(|| {
        CatalogError::malformed(table, format!("unexpected NULL in result column {index}"))
    })
}

fn number(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

fn quote_mysql_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// One `information_schema.COLUMNS` row, as text
#[derive(Debug, Default)]
struct InfoSchemaColumn {
    name: String,
    column_type: String,
    is_nullable: String,
    default: Option<String>,
    extra: String,
    comment: String,
    char_length: Option<String>,
    numeric_precision: Option<String>,
    numeric_scale: Option<String>,
}

impl InfoSchemaColumn {
    fn into_catalog_column(self) -> CatalogColumn {
        // The declared type decides which dimensions apply; the catalog
        // reports a character length for enum and text columns too.
        let declared = mapper::type_dimensions(&self.column_type);
        let reported = |declared: Option<u32>, value: Option<&str>| {
            declared.and(number(value).or(declared))
        };
        let length = reported(declared.length, self.char_length.as_deref());
        let precision = reported(declared.precision, self.numeric_precision.as_deref());
        let scale = if precision.is_some() {
            number(self.numeric_scale.as_deref()).or(declared.scale)
        } else {
            None
        };

        CatalogColumn {
            name: self.name,
            native_type: self.column_type,
            length,
            precision,
            scale,
            nullable: self.is_nullable.eq_ignore_ascii_case("YES"),
            default: normalize_default(self.default),
            auto_increment: self.extra.to_ascii_lowercase().contains("auto_increment"),
            comment: self.comment,
        }
    }
}

impl Catalog for MySqlCatalog {
    fn driver(&self) -> Driver {
        Driver::Mysql
    }

    fn ping(&mut self) -> Result<(), CatalogError> {
        self.runtime.block_on(self.conn.ping())?;
        Ok(())
    }

    fn table_names(&mut self) -> Result<Vec<String>, CatalogError> {
        let query = sqlx::query(
            "SELECT CAST(TABLE_NAME AS CHAR) FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME",
        )
        .bind(self.schema.as_str());
        let rows = self.runtime.block_on(query.fetch_all(&mut self.conn))?;

        rows.iter()
            .map(|row| required_text(row, 0, "information_schema.TABLES"))
            .collect()
    }

    fn columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, CatalogError> {
        let rows = self.fetch_for_table(COLUMNS_SQL, table)?;
        rows.iter()
            .map(|row| -> Result<CatalogColumn, CatalogError> {
                let column = InfoSchemaColumn {
                    name: required_text(row, 0, table)?,
                    column_type: required_text(row, 1, table)?,
                    is_nullable: text(row, 2)?.unwrap_or_default(),
                    default: text(row, 3)?,
                    extra: text(row, 4)?.unwrap_or_default(),
                    comment: text(row, 5)?.unwrap_or_default(),
                    char_length: text(row, 6)?,
                    numeric_precision: text(row, 7)?,
                    numeric_scale: text(row, 8)?,
                };
                Ok(column.into_catalog_column())
            })
            .collect()
    }

    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, CatalogError> {
        let rows = self.fetch_for_table(PRIMARY_KEY_SQL, table)?;
        rows.iter().map(|row| required_text(row, 0, table)).collect()
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, CatalogError> {
        let rows = self.fetch_for_table(STATISTICS_SQL, table)?;
        let rows = rows
            .iter()
            .map(|row| -> Result<IndexRow, CatalogError> {
                let key_name = required_text(row, 0, table)?;
                Ok(IndexRow {
                    primary: key_name == "PRIMARY",
                    key_name,
                    non_unique: text(row, 1)?.as_deref().map(str::trim) != Some("0"),
                    seq_in_index: number(text(row, 2)?.as_deref()).unwrap_or(1),
                    column_name: required_text(row, 3, table)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexRow::group(rows))
    }

    fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyInfo>, CatalogError> {
        Ok(KeyUsageRow::group(self.key_usage(table)?))
    }

    fn describe_columns(&mut self, table: &str) -> Result<Vec<DescribeRow>, CatalogError> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_mysql_identifier(table));
        let rows = self.fetch_text(&sql)?;

        // Field, Type, Collation, Null, Key, Default, Extra, Privileges, Comment
        rows.iter()
            .map(|row| -> Result<DescribeRow, CatalogError> {
                Ok(DescribeRow {
                    field: required_text(row, 0, table)?,
                    native_type: required_text(row, 1, table)?,
                    null: text(row, 3)?.unwrap_or_default(),
                    key: text(row, 4)?.unwrap_or_default(),
                    default: text(row, 5)?,
                    extra: text(row, 6)?.unwrap_or_default(),
                    comment: text(row, 8)?.unwrap_or_default(),
                })
            })
            .collect()
    }

    fn key_usage(&mut self, table: &str) -> Result<Vec<KeyUsageRow>, CatalogError> {
        let rows = self.fetch_for_table(KEY_USAGE_SQL, table)?;
        rows.iter()
            .map(|row| -> Result<KeyUsageRow, CatalogError> {
                Ok(KeyUsageRow {
                    constraint_name: required_text(row, 0, table)?,
                    column_name: required_text(row, 1, table)?,
                    ordinal_position: number(text(row, 2)?.as_deref()).unwrap_or(1),
                    referenced_table: required_text(row, 3, table)?,
                    referenced_column: required_text(row, 4, table)?,
                    update_rule: text(row, 5)?,
                    delete_rule: text(row, 6)?,
                })
            })
            .collect()
    }

    fn index_rows(&mut self, table: &str) -> Result<Vec<IndexRow>, CatalogError> {
        let sql = format!("SHOW INDEX FROM {}", quote_mysql_identifier(table));
        let rows = self.fetch_text(&sql)?;

        // Table, Non_unique, Key_name, Seq_in_index, Column_name, ...
        let mut index_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            // functional key parts have no column
            let Some(column_name) = text(row, 4)? else {
                continue;
            };
            let key_name = required_text(row, 2, table)?;
            index_rows.push(IndexRow {
                primary: key_name == "PRIMARY",
                key_name,
                non_unique: text(row, 1)?.as_deref().map(str::trim) != Some("0"),
                seq_in_index: number(text(row, 3)?.as_deref()).unwrap_or(1),
                column_name,
            });
        }
        Ok(index_rows)
    }
}
