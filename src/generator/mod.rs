//! Artifacts produced from table metadata.
//!
//! A [`Generator`] turns one table's metadata into files. Anything that must
//! not be emitted twice in a run (enum descriptors) is remembered in the
//! [`RunContext`] handed to it, which lives for exactly one run.

use crate::mapper;
use crate::types::{PropertyMetadata, TableMetadata};
use heck::ToUpperCamelCase;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// One generated file, named relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Could not render `{name}`")]
    Render {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Generator {
    fn generate(
        &self,
        metadata: &TableMetadata,
        context: &mut RunContext,
    ) -> Result<Vec<OutputFile>, GenerateError>;
}

/// State shared by every table of one generation run
#[derive(Debug, Default)]
pub struct RunContext {
    /// `<table>.<column>` → enum class emitted for it
    enums: HashMap<String, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class already emitted for an enumeration column in this run
    pub fn enum_class(&self, table: &str, column: &str) -> Option<&str> {
        self.enums.get(&enum_key(table, column)).map(String::as_str)
    }

    /// Record the class for an enumeration column. Returns `false` if one was
    /// already recorded, in which case the earlier class is kept.
    pub fn remember_enum(&mut self, table: &str, column: &str, class: &str) -> bool {
        let key = enum_key(table, column);
        if self.enums.contains_key(&key) {
            return false;
        }
        self.enums.insert(key, class.to_string());
        true
    }

    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }
}

fn enum_key(table: &str, column: &str) -> String {
    format!("{table}.{column}")
}

/// Renders JSON descriptors: one per entity, one per repository and one per
/// enumeration or flag-set column.
#[derive(Debug, Clone)]
pub struct DescriptorGenerator {
    namespace: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityDescriptor<'a> {
    class_name: String,
    repository_class: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    enum_types: BTreeMap<&'a str, String>,
    lifecycle_defaults: Vec<&'a str>,
    #[serde(flatten)]
    metadata: &'a TableMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryDescriptor<'a> {
    class_name: String,
    entity_class: String,
    table_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnumDescriptor<'a> {
    class_name: String,
    table_name: &'a str,
    column_name: &'a str,
    kind: &'static str,
    cases: Vec<EnumCase<'a>>,
}

#[derive(Serialize)]
struct EnumCase<'a> {
    name: String,
    value: &'a str,
}

impl DescriptorGenerator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn entity_class(&self, entity: &str) -> String {
        format!("{}\\{entity}", self.namespace)
    }

    fn sibling_class(&self, sibling: &str, name: &str) -> String {
        let root = self
            .namespace
            .strip_suffix("\\Entity")
            .unwrap_or(self.namespace.as_str());
        format!("{root}\\{sibling}\\{name}")
    }

    fn enum_descriptor<'a>(
        &self,
        metadata: &'a TableMetadata,
        property: &'a PropertyMetadata,
        class_name: String,
    ) -> Option<EnumDescriptor<'a>> {
        let (kind, values) = match (&property.enum_values, &property.set_values) {
            (Some(values), _) => ("enum", values),
            (_, Some(values)) => ("set", values),
            _ => return None,
        };
        Some(EnumDescriptor {
            class_name,
            table_name: &metadata.table_name,
            column_name: &property.column_name,
            kind,
            cases: enum_cases(values),
        })
    }
}

impl Default for DescriptorGenerator {
    fn default() -> Self {
        Self::new("App\\Entity")
    }
}

impl Generator for DescriptorGenerator {
    fn generate(
        &self,
        metadata: &TableMetadata,
        context: &mut RunContext,
    ) -> Result<Vec<OutputFile>, GenerateError> {
        let entity = &metadata.entity_name;
        let mut files = Vec::new();
        let mut enum_types = BTreeMap::new();

        for property in &metadata.properties {
            let short_name = format!(
                "{entity}{}",
                property.property_name.to_upper_camel_case()
            );
            let class_name = self.sibling_class("Enum", &short_name);
            let Some(descriptor) = self.enum_descriptor(metadata, property, class_name) else {
                continue;
            };

            let table = &metadata.table_name;
            let column = &property.column_name;
            let class = if context.remember_enum(table, column, &descriptor.class_name) {
                files.push(render(format!("Enum/{short_name}.json"), &descriptor)?);
                descriptor.class_name
            } else {
                debug!(table = %table, column = %column, "enum already emitted in this run");
                context
                    .enum_class(table, column)
                    .map(str::to_string)
                    .unwrap_or(descriptor.class_name)
            };
            enum_types.insert(property.property_name.as_str(), class);
        }

        let repository_class = self.sibling_class("Repository", &metadata.repository_name);
        let entity_descriptor = EntityDescriptor {
            class_name: self.entity_class(entity),
            repository_class: repository_class.clone(),
            enum_types,
            lifecycle_defaults: metadata
                .properties
                .iter()
                .filter(|p| p.needs_lifecycle_default)
                .map(|p| p.property_name.as_str())
                .collect(),
            metadata,
        };
        let repository_descriptor = RepositoryDescriptor {
            class_name: repository_class,
            entity_class: self.entity_class(entity),
            table_name: &metadata.table_name,
        };

        files.insert(0, render(format!("Entity/{entity}.json"), &entity_descriptor)?);
        files.insert(
            1,
            render(
                format!("Repository/{}.json", metadata.repository_name),
                &repository_descriptor,
            )?,
        );
        Ok(files)
    }
}

fn render<T: Serialize>(name: String, descriptor: &T) -> Result<OutputFile, GenerateError> {
    match serde_json::to_string_pretty(descriptor) {
        Ok(mut content) => {
            content.push('\n');
            Ok(OutputFile { name, content })
        }
        Err(source) => Err(GenerateError::Render { name, source }),
    }
}

/// Case names for literal values; repeated names get `_2`, `_3`, ...
fn enum_cases(values: &[String]) -> Vec<EnumCase<'_>> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| {
            let base = mapper::constant_name(value);
            let mut name = base.clone();
            let mut counter = 2;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{counter}");
                counter += 1;
            }
            EnumCase { name, value }
        })
        .collect()
}
