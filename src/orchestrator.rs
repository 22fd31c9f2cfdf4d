use crate::analyzer::SchemaAnalyzer;
use crate::config::GenerateOptions;
use crate::error::GenerationError;
use crate::extractor::MetadataExtractor;
use crate::generator::{DescriptorGenerator, Generator, RunContext};
use crate::output::{FileWriter, Writer};
use crate::types::TableMetadata;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// A table that could not be generated, and why
#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub error: GenerationError,
}

/// Outcome of one generation run
#[derive(Debug, Default)]
pub struct GenerationSummary {
    /// Tables attempted, failed ones included
    pub tables_processed: usize,
    pub entities: Vec<TableMetadata>,
    /// Written paths; empty in dry-run mode
    pub files: Vec<PathBuf>,
    pub failures: Vec<TableFailure>,
}

impl GenerationSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives analysis, extraction, generation and writing for a set of tables
pub struct Orchestrator {
    analyzer: SchemaAnalyzer,
    extractor: MetadataExtractor,
    generator: Box<dyn Generator>,
    writer: Box<dyn Writer>,
}

impl Orchestrator {
    pub fn new(
        analyzer: SchemaAnalyzer,
        generator: Box<dyn Generator>,
        writer: Box<dyn Writer>,
    ) -> Self {
        Self {
            analyzer,
            extractor: MetadataExtractor::new(),
            generator,
            writer,
        }
    }

    /// Descriptor generator and file writer configured from `options`
    pub fn with_options(analyzer: SchemaAnalyzer, options: &GenerateOptions) -> Self {
        Self::new(
            analyzer,
            Box::new(DescriptorGenerator::new(options.namespace.clone())),
            Box::new(FileWriter::new(options.output_dir.clone())),
        )
    }

    /// Run generation for every table the options select.
    ///
    /// A failing table is recorded in the summary and the run moves on to the
    /// next one, unless `fail_fast` is set. The run fails as a whole when no
    /// table is selected or when every table failed.
    pub fn run(&mut self, options: &GenerateOptions) -> Result<GenerationSummary, GenerationError> {
        let tables = self
            .analyzer
            .analyze_tables(&options.include, &options.exclude)?;
        if tables.is_empty() {
            return Err(GenerationError::NoTables);
        }
        info!(count = tables.len(), dry_run = options.dry_run, "generating");

        let mut run = Run {
            tables: &tables,
            options,
            context: RunContext::new(),
            entity_owners: HashMap::new(),
        };
        let mut summary = GenerationSummary::default();

        for table in &tables {
            summary.tables_processed += 1;
            match self.process(table, &mut run) {
                Ok((metadata, files)) => {
                    summary.entities.push(metadata);
                    summary.files.extend(files);
                }
                Err(error) if options.fail_fast => return Err(error),
                Err(error) => {
                    warn!(table = %table, error = %error, "skipping table");
                    summary.failures.push(TableFailure {
                        table: table.clone(),
                        error,
                    });
                }
            }
        }

        if summary.entities.is_empty() && !summary.failures.is_empty() {
            let count = summary.failures.len();
            let first = summary.failures.swap_remove(0);
            return Err(GenerationError::AllTablesFailed {
                count,
                first: Box::new(first.error),
            });
        }

        info!(
            entities = summary.entities.len(),
            files = summary.files.len(),
            failures = summary.failures.len(),
            "generation finished"
        );
        Ok(summary)
    }

    fn process(
        &mut self,
        table: &str,
        run: &mut Run<'_>,
    ) -> Result<(TableMetadata, Vec<PathBuf>), GenerationError> {
        let detail = self.analyzer.get_table_details(table)?;
        let metadata = self.extractor.extract(&detail, run.tables)?;

        if let Some(existing) = run.entity_owners.get(&metadata.entity_name) {
            return Err(GenerationError::EntityCollision {
                table: table.to_string(),
                entity: metadata.entity_name.clone(),
                existing: existing.clone(),
            });
        }
        let files = self
            .generator
            .generate(&metadata, &mut run.context)
            .map_err(|source| GenerationError::Generate {
                table: table.to_string(),
                source,
            })?;

        let mut paths = Vec::with_capacity(files.len());
        if !run.options.dry_run {
            for file in &files {
                let path = self
                    .writer
                    .write(file)
                    .map_err(|source| GenerationError::Write {
                        path: PathBuf::from(&file.name),
                        source,
                    })?;
                paths.push(path);
            }
        }

        // only a table that made it through claims its entity name
        run.entity_owners
            .insert(metadata.entity_name.clone(), table.to_string());
        Ok((metadata, paths))
    }
}

/// Per-run state threaded through every table
struct Run<'a> {
    tables: &'a [String],
    options: &'a GenerateOptions,
    context: RunContext,
    /// entity name → table that produced it
    entity_owners: HashMap<String, String>,
}
