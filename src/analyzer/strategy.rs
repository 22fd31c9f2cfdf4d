use super::IntrospectError;
use crate::db::{normalize_default, Catalog, CatalogColumn, TypeRegistry};
use crate::mapper;
use crate::types::{ColumnInfo, DescribeRow, IndexRow, KeyUsageRow, TableDetail};
use tracing::debug;

/// One way of reading a table's detail out of a catalog
pub trait DetailStrategy {
    fn name(&self) -> &'static str;

    fn table_details(
        &self,
        catalog: &mut dyn Catalog,
        table: &str,
    ) -> Result<TableDetail, IntrospectError>;
}

/// Reads a table through the catalog's structured introspection facility.
///
/// Column types must resolve through the registry; the first one that does
/// not aborts the read with [`IntrospectError::UnknownType`].
pub struct IntrospectionStrategy<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> IntrospectionStrategy<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    fn resolve(&self, column: CatalogColumn) -> Result<ColumnInfo, IntrospectError> {
        let Some(persistence_type) = self.registry.resolve(&column.native_type) else {
            return Err(IntrospectError::UnknownType {
                column: Some(column.name),
                type_name: mapper::base_type(&column.native_type),
            });
        };
        let (enum_values, set_values) = literal_lists(&column.native_type);

        Ok(ColumnInfo {
            name: column.name,
            native_type: column.native_type,
            persistence_type,
            length: column.length,
            precision: column.precision,
            scale: column.scale,
            nullable: column.nullable,
            default: column.default,
            auto_increment: column.auto_increment,
            comment: column.comment,
            enum_values,
            set_values,
        })
    }
}

impl DetailStrategy for IntrospectionStrategy<'_> {
    fn name(&self) -> &'static str {
        "introspection"
    }

    fn table_details(
        &self,
        catalog: &mut dyn Catalog,
        table: &str,
    ) -> Result<TableDetail, IntrospectError> {
        let columns = catalog
            .columns(table)?
            .into_iter()
            .map(|column| self.resolve(column))
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(IntrospectError::MissingTable(table.to_string()));
        }

        let primary_key = catalog.primary_key(table)?;

        let mut indexes = catalog.indexes(table)?;
        if indexes.is_empty() {
            debug!(table, "no indexes from introspection, reading index rows");
            indexes = IndexRow::group(catalog.index_rows(table)?);
        }

        let mut foreign_keys = catalog.foreign_keys(table)?;
        if foreign_keys.is_empty() {
            debug!(table, "no foreign keys from introspection, reading key usage");
            foreign_keys = KeyUsageRow::group(catalog.key_usage(table)?);
        }

        Ok(TableDetail {
            name: table.to_string(),
            columns,
            indexes,
            foreign_keys,
            primary_key,
        })
    }
}

/// Reads a table with the catalog's descriptive statements only.
///
/// Every native type is accepted here: unknown ones map to strings and
/// `enum`/`set` columns get their literal values parsed out of the type.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogQueryStrategy;

impl DetailStrategy for CatalogQueryStrategy {
    fn name(&self) -> &'static str {
        "catalog query"
    }

    fn table_details(
        &self,
        catalog: &mut dyn Catalog,
        table: &str,
    ) -> Result<TableDetail, IntrospectError> {
        let rows = catalog.describe_columns(table)?;
        if rows.is_empty() {
            return Err(IntrospectError::MissingTable(table.to_string()));
        }

        let primary_key = rows
            .iter()
            .filter(|row| row.is_primary())
            .map(|row| row.field.clone())
            .collect();
        let columns = rows.into_iter().map(column_from_row).collect();
        let foreign_keys = KeyUsageRow::group(catalog.key_usage(table)?);
        let indexes = IndexRow::group(catalog.index_rows(table)?);

        Ok(TableDetail {
            name: table.to_string(),
            columns,
            indexes,
            foreign_keys,
            primary_key,
        })
    }
}

fn column_from_row(row: DescribeRow) -> ColumnInfo {
    let persistence_type = mapper::persistence_type(&row.native_type);
    let dimensions = mapper::type_dimensions(&row.native_type);
    let (enum_values, set_values) = literal_lists(&row.native_type);

    ColumnInfo {
        nullable: row.is_nullable(),
        auto_increment: row.is_auto_increment(),
        name: row.field,
        persistence_type,
        length: dimensions.length,
        precision: dimensions.precision,
        scale: dimensions.scale,
        default: normalize_default(row.default),
        comment: row.comment,
        enum_values,
        set_values,
        native_type: row.native_type,
    }
}

/// Enum and set literal values of a native type, `None` where the type is
/// not of that kind
fn literal_lists(native: &str) -> (Option<Vec<String>>, Option<Vec<String>>) {
    match mapper::base_type(native).as_str() {
        "enum" => (Some(mapper::enum_values(native)), None),
        "set" => (None, Some(mapper::set_values(native))),
        _ => (None, None),
    }
}
