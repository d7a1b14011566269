use crate::melt::types::{Row, RowSet, Tables};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File format for table output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    JsonLines,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::JsonLines => "jsonl",
        }
    }
}

/// A table that made it to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenTable {
    pub table: String,
    pub rows: usize,
    pub path: PathBuf,
}

/// Writes each row-set to its own file in a directory, one file per table
pub struct TableWriter {
    output_dir: PathBuf,
    format: OutputFormat,
}

impl TableWriter {
    /// Create a writer, creating `output_dir` if needed
    pub fn new<P: AsRef<Path>>(output_dir: P, format: OutputFormat) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create output directory")?;

        Ok(TableWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
            format,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every non-empty row-set; empty ones produce no file
    pub fn write_tables(&self, tables: &Tables) -> Result<Vec<WrittenTable>> {
        let mut written = Vec::new();

        for set in tables.iter() {
            let path = self
                .output_dir
                .join(format!("{}.{}", set.name(), self.format.extension()));

            match self.format {
                OutputFormat::Csv => write_csv(set, &path)?,
                OutputFormat::JsonLines => write_jsonl(set, &path)?,
            }

            info!(table = set.name(), rows = set.len(), path = %path.display(), "table written");
            written.push(WrittenTable {
                table: set.name().to_string(),
                rows: set.len(),
                path,
            });
        }

        if written.is_empty() {
            warn!("no tables written, check XML namespace or file path");
        }

        Ok(written)
    }
}

fn write_csv(set: &RowSet, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    writer
        .write_record(set.ordered_columns())
        .context("Failed to write header")?;
    for row in set.rows() {
        writer
            .write_record(set.ordered_values(row).into_iter().map(|value| value.unwrap_or("")))
            .context("Failed to write row")?;
    }

    writer.flush().context("Failed to flush writer")
}

fn write_jsonl(set: &RowSet, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for row in set.rows() {
        let object = row_object(set, row);
        let json = serde_json::to_string(&object).context("Failed to serialize row")?;
        writeln!(writer, "{}", json).context("Failed to write row")?;
    }

    writer.flush().context("Failed to flush writer")
}

fn row_object(set: &RowSet, row: &Row) -> Map<String, Value> {
    set.ordered_columns()
        .into_iter()
        .map(|column| {
            let value = row
                .get(column)
                .map_or(Value::Null, |v| Value::String(v.to_string()));
            (column.to_string(), value)
        })
        .collect()
}

/// A simpler writer that sends every row of every table to one output as
/// JSON Lines, tagging each object with its table name
pub struct SingleWriter<W: Write> {
    writer: W,
}

impl<W: Write> SingleWriter<W> {
    pub fn new(writer: W) -> Self {
        SingleWriter { writer }
    }

    /// Returns the number of rows written
    pub fn write_tables(&mut self, tables: &Tables) -> Result<usize> {
        let mut count = 0;
        for set in tables.iter() {
            for row in set.rows() {
                let mut object = Map::new();
                object.insert("_table".to_string(), Value::String(set.name().to_string()));
                object.extend(row_object(set, row));

                let json = serde_json::to_string(&object)
                    .context("Failed to serialize row")?;
                writeln!(self.writer, "{}", json)
                    .context("Failed to write row")?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
