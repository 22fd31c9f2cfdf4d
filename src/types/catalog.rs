use crate::types::{ForeignKeyInfo, IndexInfo, ReferentialAction};
use indexmap::IndexMap;

/// One row of a "describe columns" statement (`SHOW FULL COLUMNS FROM t`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRow {
    pub field: String,
    pub native_type: String,
    /// `YES` or `NO`
    pub null: String,
    /// `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    pub default: Option<String>,
    /// e.g. `auto_increment`, `on update CURRENT_TIMESTAMP`
    pub extra: String,
    pub comment: String,
}

impl DescribeRow {
    pub fn is_nullable(&self) -> bool {
        self.null.eq_ignore_ascii_case("YES")
    }

    pub fn is_primary(&self) -> bool {
        self.key.eq_ignore_ascii_case("PRI")
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }
}

/// One local/foreign column pair of a foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUsageRow {
    pub constraint_name: String,
    pub column_name: String,
    /// 1-based position of the pair inside its constraint
    pub ordinal_position: u32,
    pub referenced_table: String,
    pub referenced_column: String,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

impl KeyUsageRow {
    /// Assemble foreign keys from key-usage rows, one per constraint name.
    ///
    /// Constraints keep the order in which they first appear; pairs inside a
    /// constraint are ordered by ordinal position.
    pub fn group(rows: Vec<KeyUsageRow>) -> Vec<ForeignKeyInfo> {
        let mut grouped: IndexMap<String, Vec<KeyUsageRow>> = IndexMap::new();
        for row in rows {
            grouped
                .entry(row.constraint_name.clone())
                .or_default()
                .push(row);
        }

        grouped
            .into_iter()
            .map(|(name, mut pairs)| {
                pairs.sort_by_key(|p| p.ordinal_position);
                let first = &pairs[0];
                let foreign_table = first.referenced_table.clone();
                let on_update = ReferentialAction::parse(first.update_rule.as_deref());
                let on_delete = ReferentialAction::parse(first.delete_rule.as_deref());
                let (local_columns, foreign_columns) = pairs
                    .into_iter()
                    .map(|p| (p.column_name, p.referenced_column))
                    .unzip();
                ForeignKeyInfo {
                    name,
                    local_columns,
                    foreign_table,
                    foreign_columns,
                    on_update,
                    on_delete,
                }
            })
            .collect()
    }
}

/// One row of an index listing (`SHOW INDEX FROM t`): one column of one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub key_name: String,
    pub non_unique: bool,
    /// 1-based position of the column inside the index
    pub seq_in_index: u32,
    pub column_name: String,
    pub primary: bool,
}

impl IndexRow {
    /// Assemble indexes from per-column rows, one per index name.
    pub fn group(rows: Vec<IndexRow>) -> Vec<IndexInfo> {
        let mut grouped: IndexMap<String, Vec<IndexRow>> = IndexMap::new();
        for row in rows {
            grouped.entry(row.key_name.clone()).or_default().push(row);
        }

        grouped
            .into_iter()
            .map(|(name, mut parts)| {
                parts.sort_by_key(|p| p.seq_in_index);
                let unique = !parts[0].non_unique;
                let is_primary = parts[0].primary;
                IndexInfo {
                    name,
                    columns: parts.into_iter().map(|p| p.column_name).collect(),
                    unique,
                    is_primary,
                }
            })
            .collect()
    }
}
