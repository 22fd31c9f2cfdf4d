//! Reverse-engineer ORM entity descriptors from a live MySQL or SQLite schema.
//!
//! The pipeline is [`SchemaAnalyzer`] (catalog → [`TableDetail`]),
//! [`MetadataExtractor`] (detail → [`TableMetadata`]), then a [`Generator`]
//! and a [`Writer`], all driven by the [`Orchestrator`].

pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod mapper;
pub mod orchestrator;
pub mod output;
pub mod types;

#[cfg(test)]
mod testing;

pub use analyzer::SchemaAnalyzer;
pub use config::{ConnectionConfig, Driver, GenerateOptions};
pub use db::TypeRegistry;
pub use error::{DatabaseConnectionError, GenerationError, MetadataExtractionError};
pub use extractor::MetadataExtractor;
pub use generator::{DescriptorGenerator, Generator, OutputFile, RunContext};
pub use orchestrator::{GenerationSummary, Orchestrator, TableFailure};
pub use output::{FileWriter, Writer};
pub use types::{TableDetail, TableMetadata};
