//! Turns a table's catalog detail into generation-ready metadata.

pub mod naming;

use crate::db::CURRENT_TIMESTAMP;
use crate::error::MetadataExtractionError;
use crate::mapper::{self, LanguageType};
use crate::types::{
    ColumnInfo, ForeignKeyInfo, PropertyMetadata, PropertyType, RelationKind, RelationMetadata,
    TableDetail, TableMetadata,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Catalog detail that cannot be turned into consistent metadata
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Foreign key `{name}` pairs {local} local columns with {foreign} foreign columns")]
    ForeignKeyArity {
        name: String,
        local: usize,
        foreign: usize,
    },
    #[error("Foreign key `{0}` has no local columns")]
    EmptyForeignKey(String),
    #[error("Columns `{first}` and `{second}` both map to property `{property}`")]
    DuplicateProperty {
        property: String,
        first: String,
        second: String,
    },
}

/// Pure transformation from [`TableDetail`] to [`TableMetadata`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Metadata for one table.
    ///
    /// `all_tables` is the set of tables in the current run. Columns that take
    /// part in a foreign key become relations, never properties.
    pub fn extract(
        &self,
        detail: &TableDetail,
        all_tables: &[String],
    ) -> Result<TableMetadata, MetadataExtractionError> {
        build(detail, all_tables).map_err(|source| MetadataExtractionError {
            table: detail.name.clone(),
            source,
        })
    }
}

fn build(detail: &TableDetail, all_tables: &[String]) -> Result<TableMetadata, ExtractError> {
    let entity_name = naming::entity_name(&detail.name);

    let mut properties = Vec::new();
    let mut owners: HashMap<String, &str> = HashMap::new();
    for column in &detail.columns {
        if detail.is_foreign_key_column(&column.name) {
            continue;
        }
        let property = property(column, detail);
        if let Some(first) = owners.insert(property.property_name.clone(), &column.name) {
            return Err(ExtractError::DuplicateProperty {
                property: property.property_name,
                first: first.to_string(),
                second: column.name.clone(),
            });
        }
        properties.push(property);
    }

    let mut used: HashSet<String> = owners.into_keys().collect();
    let mut relations = Vec::with_capacity(detail.foreign_keys.len());
    for fk in &detail.foreign_keys {
        let relation = relation(fk, detail, all_tables, &used)?;
        used.insert(relation.property_name.clone());
        relations.push(relation);
    }

    Ok(TableMetadata {
        table_name: detail.name.clone(),
        repository_name: format!("{entity_name}Repository"),
        entity_name,
        properties,
        relations,
        indexes: detail
            .indexes
            .iter()
            .filter(|index| !index.is_primary)
            .cloned()
            .collect(),
        primary_key: detail.primary_key.clone(),
    })
}

fn property(column: &ColumnInfo, detail: &TableDetail) -> PropertyMetadata {
    let is_primary = detail.primary_key.contains(&column.name);
    let base = mapper::language_type(&column.native_type);
    let language_type = PropertyType::new(base, !is_primary && base != LanguageType::Bool);
    let needs_lifecycle_default = column.default.as_deref() == Some(CURRENT_TIMESTAMP)
        && column.persistence_type.is_instant();

    PropertyMetadata {
        column_name: column.name.clone(),
        property_name: naming::property_name(&column.name),
        language_type,
        persistence_type: column.persistence_type,
        nullable: column.nullable,
        length: column.length,
        precision: column.precision,
        scale: column.scale,
        default: column.default.clone(),
        is_primary,
        auto_increment: column.auto_increment,
        comment: enrich_comment(column),
        enum_values: column.enum_values.clone(),
        set_values: column.set_values.clone(),
        needs_lifecycle_default,
    }
}

fn relation(
    fk: &ForeignKeyInfo,
    detail: &TableDetail,
    all_tables: &[String],
    used: &HashSet<String>,
) -> Result<RelationMetadata, ExtractError> {
    let Some(first_local) = fk.local_columns.first() else {
        return Err(ExtractError::EmptyForeignKey(fk.name.clone()));
    };
    if fk.local_columns.len() != fk.foreign_columns.len() {
        return Err(ExtractError::ForeignKeyArity {
            name: fk.name.clone(),
            local: fk.local_columns.len(),
            foreign: fk.foreign_columns.len(),
        });
    }
    if !all_tables.contains(&fk.foreign_table) {
        debug!(
            table = %detail.name,
            target = %fk.foreign_table,
            "relation targets a table outside this run"
        );
    }

    let target_entity = naming::entity_name(&fk.foreign_table);
    Ok(RelationMetadata {
        kind: RelationKind::ManyToOne,
        property_name: naming::relation_name(first_local, &target_entity, used),
        target_entity,
        target_table: fk.foreign_table.clone(),
        local_columns: fk.local_columns.clone(),
        foreign_columns: fk.foreign_columns.clone(),
        on_update: fk.on_update,
        on_delete: fk.on_delete,
        nullable: detail
            .column(first_local)
            .map(|column| column.nullable)
            .unwrap_or(false),
    })
}

fn enrich_comment(column: &ColumnInfo) -> String {
    let listing = match (&column.enum_values, &column.set_values) {
        (Some(values), _) if !values.is_empty() => {
            format!("Possible values: {}", values.join(", "))
        }
        (_, Some(values)) if !values.is_empty() => {
            format!("Possible values (set): {}", values.join(", "))
        }
        _ => return column.comment.clone(),
    };
    if column.comment.is_empty() {
        listing
    } else {
        format!("{} - {listing}", column.comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{CatalogQueryStrategy, DetailStrategy};
    use crate::mapper::PersistenceType;
    use crate::testing::{self, FakeCatalog};
    use crate::types::{IndexInfo, ReferentialAction};
    use pretty_assertions::assert_eq;

    fn sakila(table: &str) -> TableDetail {
        CatalogQueryStrategy
            .table_details(&mut FakeCatalog::sakila(), table)
            .unwrap()
    }

    fn run_tables() -> Vec<String> {
        testing::strings(&["actor", "film", "film_actor", "language"])
    }

    fn column(name: &str, native: &str, nullable: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            native_type: native.to_string(),
            persistence_type: mapper::persistence_type(native),
            length: None,
            precision: None,
            scale: None,
            nullable,
            default: None,
            auto_increment: false,
            comment: String::new(),
            enum_values: None,
            set_values: None,
        }
    }

    fn fk(name: &str, local: &[&str], target: &str, foreign: &[&str]) -> ForeignKeyInfo {
        ForeignKeyInfo {
            name: name.to_string(),
            local_columns: testing::strings(local),
            foreign_table: target.to_string(),
            foreign_columns: testing::strings(foreign),
            on_update: ReferentialAction::Restrict,
            on_delete: ReferentialAction::Restrict,
        }
    }

    fn detail(name: &str, columns: Vec<ColumnInfo>, foreign_keys: Vec<ForeignKeyInfo>) -> TableDetail {
        TableDetail {
            name: name.to_string(),
            primary_key: vec![columns[0].name.clone()],
            columns,
            indexes: Vec::new(),
            foreign_keys,
        }
    }

    #[test]
    fn junction_table_has_only_relations() {
        let metadata = MetadataExtractor::new()
            .extract(&sakila("film_actor"), &run_tables())
            .unwrap();

        assert_eq!(metadata.entity_name, "FilmActor");
        assert_eq!(metadata.repository_name, "FilmActorRepository");
        assert_eq!(metadata.primary_key, testing::strings(&["actor_id", "film_id"]));
        assert!(metadata.property("actor_id").is_none());
        assert!(metadata.property("film_id").is_none());
        assert_eq!(metadata.properties.len(), 1);
        assert_eq!(metadata.properties[0].property_name, "lastUpdate");

        let names: Vec<&str> = metadata
            .relations
            .iter()
            .map(|r| r.property_name.as_str())
            .collect();
        assert_eq!(names, ["actor", "film"]);
        let actor = metadata.relation("actor").unwrap();
        assert_eq!(actor.kind, RelationKind::ManyToOne);
        assert_eq!(actor.target_entity, "Actor");
        assert_eq!(actor.on_update, ReferentialAction::Cascade);
        assert!(!actor.nullable);

        assert_eq!(
            metadata.indexes,
            vec![IndexInfo {
                name: "idx_fk_film_id".to_string(),
                columns: vec!["film_id".to_string()],
                unique: false,
                is_primary: false,
            }]
        );
    }

    #[test]
    fn enum_column_is_documented() {
        let metadata = MetadataExtractor::new()
            .extract(&sakila("film"), &run_tables())
            .unwrap();
        let rating = metadata.property("rating").unwrap();

        assert_eq!(rating.language_type.to_string(), "?string");
        assert_eq!(
            rating.enum_values,
            Some(testing::strings(&["G", "PG", "PG-13", "R", "NC-17"]))
        );
        assert_eq!(
            rating.comment,
            "MPAA rating - Possible values: G, PG, PG-13, R, NC-17"
        );
        for value in ["G", "PG", "PG-13", "R", "NC-17"] {
            assert!(rating.comment.contains(value));
        }

        let features = metadata.property("special_features").unwrap();
        assert_eq!(
            features.comment,
            "Possible values (set): Trailers, Commentaries, Deleted Scenes, Behind the Scenes"
        );
    }

    #[test]
    fn primary_key_and_language_types() {
        let metadata = MetadataExtractor::new()
            .extract(&sakila("film"), &run_tables())
            .unwrap();

        let id = metadata.property("film_id").unwrap();
        assert!(id.is_primary);
        assert!(id.auto_increment);
        assert_eq!(id.language_type.to_string(), "int");

        let title = metadata.property("title").unwrap();
        assert_eq!(title.language_type.to_string(), "?string");
        assert!(!title.nullable);

        let rate = metadata.property("rental_rate").unwrap();
        assert_eq!(rate.language_type.to_string(), "?string");
        assert_eq!(rate.persistence_type, PersistenceType::Decimal);
        assert_eq!(rate.default.as_deref(), Some("4.99"));

        assert!(metadata.property("language_id").is_none());
        assert_eq!(metadata.relation("language").unwrap().target_table, "language");
        assert!(metadata.indexes.iter().all(|index| !index.is_primary));
    }

    #[test]
    fn current_timestamp_needs_lifecycle_default() {
        let metadata = MetadataExtractor::new()
            .extract(&sakila("actor"), &run_tables())
            .unwrap();
        let last_update = metadata.property("last_update").unwrap();
        assert!(last_update.needs_lifecycle_default);
        assert!(!metadata.property("first_name").unwrap().needs_lifecycle_default);

        let mut date = column("created_on", "date", false);
        date.default = Some(CURRENT_TIMESTAMP.to_string());
        let metadata = MetadataExtractor::new()
            .extract(&detail("events", vec![column("id", "int", false), date], vec![]), &[])
            .unwrap();
        assert!(!metadata.property("created_on").unwrap().needs_lifecycle_default);
    }

    #[test]
    fn boolean_properties_are_never_nullable() {
        let metadata = MetadataExtractor::new()
            .extract(
                &detail(
                    "users",
                    vec![column("id", "int", false), column("active", "boolean", true)],
                    vec![],
                ),
                &[],
            )
            .unwrap();
        assert_eq!(metadata.entity_name, "User");
        assert_eq!(metadata.property("active").unwrap().language_type.to_string(), "bool");
    }

    #[test]
    fn foreign_keys_to_the_same_table_get_distinct_names() {
        let columns = vec![
            column("rental_id", "int", false),
            column("staff_id", "tinyint", false),
            column("manager_id", "tinyint", true),
            column("staff", "tinyint", true),
        ];
        let foreign_keys = vec![
            fk("fk_staff", &["staff_id"], "staff", &["staff_id"]),
            fk("fk_manager", &["manager_id"], "staff", &["staff_id"]),
            fk("fk_backup", &["staff"], "staff", &["staff_id"]),
        ];
        let metadata = MetadataExtractor::new()
            .extract(&detail("rental", columns, foreign_keys), &[])
            .unwrap();

        let names: Vec<&str> = metadata
            .relations
            .iter()
            .map(|r| r.property_name.as_str())
            .collect();
        assert_eq!(names, ["staff", "managerStaff", "staff2"]);
        assert!(!metadata.relation("staff").unwrap().nullable);
        assert!(metadata.relation("managerStaff").unwrap().nullable);
        assert_eq!(metadata.properties.len(), 1);
    }

    #[test]
    fn relation_never_shadows_a_property() {
        let columns = vec![
            column("id", "int", false),
            column("language", "varchar(20)", true),
            column("language_id", "int", false),
        ];
        let metadata = MetadataExtractor::new()
            .extract(
                &detail(
                    "books",
                    columns,
                    vec![fk("fk_lang", &["language_id"], "languages", &["id"])],
                ),
                &[],
            )
            .unwrap();
        assert!(metadata.property("language").is_some());
        assert_eq!(metadata.relations[0].property_name, "language2");
        assert_eq!(metadata.relations[0].target_entity, "Language");
    }

    #[test]
    fn relation_on_an_unlisted_column_is_not_nullable() {
        let metadata = MetadataExtractor::new()
            .extract(
                &detail(
                    "payment",
                    vec![column("id", "int", false)],
                    vec![fk("fk_customer", &["customer_id"], "customer", &["id"])],
                ),
                &[],
            )
            .unwrap();
        assert_eq!(metadata.relations[0].property_name, "customer");
        assert!(!metadata.relations[0].nullable);
    }

    #[test]
    fn composite_foreign_key_is_one_relation() {
        let columns = vec![
            column("id", "int", false),
            column("film_id", "int", false),
            column("actor_id", "int", false),
        ];
        let metadata = MetadataExtractor::new()
            .extract(
                &detail(
                    "film_actor_note",
                    columns,
                    vec![fk(
                        "fk_pair",
                        &["film_id", "actor_id"],
                        "film_actor",
                        &["film_id", "actor_id"],
                    )],
                ),
                &[],
            )
            .unwrap();
        assert_eq!(metadata.relations.len(), 1);
        assert_eq!(metadata.relations[0].property_name, "filmActor");
        assert_eq!(metadata.properties.len(), 1);
    }

    #[test]
    fn malformed_foreign_keys_fail_with_the_table_name() {
        let columns = vec![column("id", "int", false), column("a_id", "int", false)];
        let err = MetadataExtractor::new()
            .extract(
                &detail("things", columns.clone(), vec![fk("fk_a", &["a_id"], "a", &[])]),
                &[],
            )
            .unwrap_err();
        assert_eq!(err.table, "things");
        assert!(matches!(
            err.source,
            ExtractError::ForeignKeyArity { local: 1, foreign: 0, .. }
        ));

        let err = MetadataExtractor::new()
            .extract(&detail("things", columns, vec![fk("fk_b", &[], "b", &[])]), &[])
            .unwrap_err();
        assert!(matches!(err.source, ExtractError::EmptyForeignKey(ref n) if n == "fk_b"));
    }

    #[test]
    fn colliding_property_names_fail() {
        let columns = vec![
            column("id", "int", false),
            column("first_name", "varchar(45)", false),
            column("firstName", "varchar(45)", false),
        ];
        let err = MetadataExtractor::new()
            .extract(&detail("people", columns, vec![]), &[])
            .unwrap_err();
        match err.source {
            ExtractError::DuplicateProperty {
                property,
                first,
                second,
            } => {
                assert_eq!(property, "firstName");
                assert_eq!(first, "first_name");
                assert_eq!(second, "firstName");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
