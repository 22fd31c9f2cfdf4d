use serde::Serialize;
use std::io::{self, Write};

/// How the `tables` command prints its result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// A table selected for generation and the entity it would become
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableListing {
    pub table: String,
    pub entity: String,
}

pub fn write_table_list<W: Write>(
    out: &mut W,
    tables: &[TableListing],
    format: ListFormat,
) -> io::Result<()> {
    match format {
        ListFormat::Text => {
            let width = tables.iter().map(|t| t.table.len()).max().unwrap_or(0);
            for listing in tables {
                writeln!(out, "{:<width$}  {}", listing.table, listing.entity)?;
            }
        }
        ListFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, tables)?;
            writeln!(out)?;
        }
        ListFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            for listing in tables {
                writer.serialize(listing)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
