use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ormgen::extractor::naming;
use ormgen::mapper::PersistenceType;
use ormgen::output::{write_table_list, ListFormat, TableListing};
use ormgen::{
    ConnectionConfig, Driver, GenerateOptions, Orchestrator, SchemaAnalyzer, TypeRegistry,
};
use std::error::Error as _;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ormgen")]
#[command(about = "Generate ORM entity descriptors from an existing MySQL or SQLite schema")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log debug output and print the full cause of errors
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Database engine
    #[arg(long, value_enum, env = "ORMGEN_DRIVER", default_value = "mysql")]
    driver: DriverArg,

    #[arg(long, env = "ORMGEN_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "ORMGEN_PORT", default_value_t = 3306)]
    port: u16,

    /// Schema name, or the database file path for SQLite
    #[arg(long, short, env = "ORMGEN_DATABASE")]
    database: String,

    #[arg(long, short, env = "ORMGEN_USERNAME", default_value = "root")]
    username: String,

    #[arg(long, env = "ORMGEN_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    #[arg(long, env = "ORMGEN_CHARSET", default_value = "utf8mb4")]
    charset: String,

    /// Extra native type for structured introspection, e.g. `enum=string`
    #[arg(long = "map-type", value_name = "NATIVE=TYPE", value_parser = parse_mapping)]
    map_types: Vec<(String, PersistenceType)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the database is reachable
    Check,

    /// List the tables a generation run would process
    Tables {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: ListFormatArg,
    },

    /// Generate entity, repository and enum descriptors
    Generate {
        #[command(flatten)]
        filter: FilterArgs,

        /// Namespace of the generated entity classes
        #[arg(long, default_value = "App\\Entity")]
        namespace: String,

        /// Output directory
        #[arg(long, short, default_value = "generated")]
        out: PathBuf,

        /// Print the entities that would be generated without writing files
        #[arg(long)]
        dry_run: bool,

        /// Abort at the first table that fails
        #[arg(long)]
        fail_fast: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only process these tables
    #[arg(long, short, value_delimiter = ',')]
    include: Vec<String>,

    /// Skip these tables
    #[arg(long, short = 'x', value_delimiter = ',')]
    exclude: Vec<String>,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum DriverArg {
    Mysql,
    Sqlite,
}

impl From<DriverArg> for Driver {
    fn from(driver: DriverArg) -> Self {
        match driver {
            DriverArg::Mysql => Driver::Mysql,
            DriverArg::Sqlite => Driver::Sqlite,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum ListFormatArg {
    Text,
    Json,
    Csv,
}

impl From<ListFormatArg> for ListFormat {
    fn from(fmt: ListFormatArg) -> Self {
        match fmt {
            ListFormatArg::Text => ListFormat::Text,
            ListFormatArg::Json => ListFormat::Json,
            ListFormatArg::Csv => ListFormat::Csv,
        }
    }
}

fn parse_mapping(value: &str) -> Result<(String, PersistenceType), String> {
    let (native, persistence) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NATIVE=TYPE, got `{value}`"))?;
    let persistence = persistence
        .parse::<PersistenceType>()
        .map_err(|e| e.to_string())?;
    Ok((native.trim().to_string(), persistence))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            if verbose {
                eprintln!("Error: {err:?}");
            } else {
                eprintln!("Error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let registry = cli
        .connection
        .map_types
        .iter()
        .fold(TypeRegistry::new(), |registry, (native, ty)| {
            registry.with_mapping(native, *ty)
        });
    let config = ConnectionConfig {
        driver: cli.connection.driver.into(),
        host: cli.connection.host,
        port: cli.connection.port,
        database: cli.connection.database,
        username: cli.connection.username,
        password: cli.connection.password,
        charset: cli.connection.charset,
    };
    let target = config.target();
    let mut analyzer = SchemaAnalyzer::new(config, registry);

    match cli.command {
        Commands::Check => {
            analyzer.test_connection()?;
            println!("Connected to {target}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tables { filter, format } => {
            let tables = analyzer.analyze_tables(&filter.include, &filter.exclude)?;
            let listings: Vec<TableListing> = tables
                .into_iter()
                .map(|table| TableListing {
                    entity: naming::entity_name(&table),
                    table,
                })
                .collect();

            let mut stdout = io::stdout().lock();
            write_table_list(&mut stdout, &listings, format.into())
                .context("Failed to write table list")?;
            stdout.flush().context("Failed to flush output")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Generate {
            filter,
            namespace,
            out,
            dry_run,
            fail_fast,
        } => {
            let options = GenerateOptions {
                include: filter.include,
                exclude: filter.exclude,
                namespace,
                output_dir: out,
                dry_run,
                fail_fast,
            };
            run_generate(analyzer, &options, cli.verbose)
        }
    }
}

fn run_generate(
    analyzer: SchemaAnalyzer,
    options: &GenerateOptions,
    verbose: bool,
) -> Result<ExitCode> {
    let mut orchestrator = Orchestrator::with_options(analyzer, options);
    let summary = orchestrator.run(options)?;

    if options.dry_run {
        for entity in &summary.entities {
            println!("{} -> {}", entity.table_name, entity.entity_name);
        }
    } else {
        println!(
            "Wrote {} files for {} entities to {}",
            summary.files.len(),
            summary.entities.len(),
            options.output_dir.display()
        );
    }

    for failure in &summary.failures {
        eprintln!("Skipped {}: {}", failure.table, failure.error);
        if verbose {
            let mut source = failure.error.source();
            while let Some(cause) = source {
                eprintln!("    caused by: {cause}");
                source = cause.source();
            }
        }
    }

    if summary.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}
