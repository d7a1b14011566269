//! Bulk loading of melted tables into SQLite.
//!
//! Each table is dropped and recreated, then filled inside a single
//! transaction. Empty CSV fields become `NULL`. Column affinity is inferred
//! from the data, except identifier columns which always stay `TEXT` so that
//! ids such as `DB00001` or `9606` keep their exact spelling.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use crate::melt::types::{Tables, RECORD_ID_COLUMN};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;

/// CSV file to table name pairs loaded by default: the restricted rule set
/// under short table names.
pub const RESTRICTED_TABLES: [(&str, &str); 10] = [
    ("general_information_drugbank_drugs", "general_info"),
    ("pharmacology_drugbank_drugs", "pharmacology"),
    ("mixtures_drugbank_drugs", "mixtures"),
    ("synonyms_drugbank_drugs", "synonyms"),
    ("drug_interactions_drugbank_drugs", "drug_interactions"),
    ("food_interactions_drugbank_drugs_reactions", "food_interactions"),
    ("references_articles_drugbank_drugs", "ref_articles"),
    ("references_attachments_drugbank_drugs", "ref_attachments"),
    ("references_books_drugbank_drugs", "ref_books"),
    ("references_links_drugbank_drugs", "ref_links"),
];

/// Which CSV files in a directory get loaded, and under what table names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPlan {
    /// Every `*.csv`, each under its file stem
    All,
    /// Named files (stem without `.csv`) mapped to table names
    Mapped(Vec<(String, String)>),
}

impl LoadPlan {
    pub fn restricted() -> Self {
        LoadPlan::Mapped(
            RESTRICTED_TABLES
                .iter()
                .map(|(file, table)| (file.to_string(), table.to_string()))
                .collect(),
        )
    }

    /// Resolve the plan against `dir`; named files that do not exist are
    /// logged and left out.
    fn entries(&self, dir: &Path) -> Result<Vec<(PathBuf, String)>> {
        match self {
            LoadPlan::All => {
                let mut entries = Vec::new();
                for entry in std::fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        let table = stem.to_string();
                        entries.push((path, table));
                    }
                }
                entries.sort();
                Ok(entries)
            }
            LoadPlan::Mapped(files) => Ok(files
                .iter()
                .filter_map(|(file, table)| {
                    let path = dir.join(format!("{file}.csv"));
                    if path.is_file() {
                        Some((path, table.clone()))
                    } else {
                        warn!(file = %path.display(), table = %table, "csv missing, skipping table");
                        None
                    }
                })
                .collect()),
        }
    }
}

impl Default for LoadPlan {
    fn default() -> Self {
        LoadPlan::restricted()
    }
}

/// SQLite column affinity chosen for a loaded column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Real,
    Text,
}

impl Affinity {
    fn sql(&self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Text => "TEXT",
        }
    }

    fn infer<'a>(column: &str, mut values: impl Iterator<Item = Option<&'a str>> + Clone) -> Self {
        if is_text_column(column) {
            return Affinity::Text;
        }
        let mut present = values.clone().flatten().peekable();
        if present.peek().is_none() {
            return Affinity::Text;
        }
        if present.all(|v| v.parse::<i64>().is_ok()) {
            Affinity::Integer
        } else if values.all(|v| v.map_or(true, |v| v.parse::<f64>().map_or(false, f64::is_finite))) {
            Affinity::Real
        } else {
            Affinity::Text
        }
    }

    fn value(&self, cell: Option<&str>) -> Value {
        let Some(text) = cell else {
            return Value::Null;
        };
        match self {
            Affinity::Integer => text
                .parse()
                .map_or_else(|_| Value::Text(text.to_string()), Value::Integer),
            Affinity::Real => text
                .parse()
                .map_or_else(|_| Value::Text(text.to_string()), Value::Real),
            Affinity::Text => Value::Text(text.to_string()),
        }
    }
}

fn is_text_column(column: &str) -> bool {
    column == RECORD_ID_COLUMN || column.ends_with("_id") || column == "ingredients"
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// A table that was (re)created and filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTable {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<(String, Affinity)>,
}

/// A CSV file that failed to load. The previous contents of its table, if
/// any, are left untouched.
#[derive(Debug)]
pub struct FailedLoad {
    pub file: PathBuf,
    pub table: String,
    pub error: LoadError,
}

/// Result of loading a directory: each file succeeds or fails on its own
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub loaded: Vec<LoadedTable>,
    pub failed: Vec<FailedLoad>,
}

impl LoadSummary {
    pub fn rows(&self) -> usize {
        self.loaded.iter().map(|t| t.rows).sum()
    }
}

/// Loads melted tables into a SQLite database
pub struct SqliteLoader {
    conn: Connection,
}

impl SqliteLoader {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(SqliteLoader {
            conn: Connection::open(path)?,
        })
    }

    /// Open an in-memory database, useful for testing.
    pub fn open_in_memory() -> Result<Self> {
        Ok(SqliteLoader {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Load the CSV files of `dir` selected by `plan`. A file that fails is
    /// logged and recorded; the remaining files are still loaded. Only an
    /// unreadable directory is an error.
    pub fn load_csv_dir(&mut self, dir: impl AsRef<Path>, plan: &LoadPlan) -> Result<LoadSummary> {
        let dir = dir.as_ref();
        info!(dir = %dir.display(), "loading csv directory");

        let mut summary = LoadSummary::default();
        for (path, table) in plan.entries(dir)? {
            match self.load_csv(&path, &table) {
                Ok(loaded) => summary.loaded.push(loaded),
                Err(error) => {
                    warn!(file = %path.display(), table = %table, "failed to load csv: {error}");
                    summary.failed.push(FailedLoad {
                        file: path,
                        table,
                        error,
                    });
                }
            }
        }

        if summary.loaded.is_empty() {
            warn!(dir = %dir.display(), "no tables loaded");
        }
        Ok(summary)
    }

    /// Replace `table` with the contents of one CSV file
    pub fn load_csv(&mut self, path: impl AsRef<Path>, table: &str) -> Result<LoadedTable> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| (!field.is_empty()).then(|| field.to_string()))
                    .collect::<Vec<_>>(),
            );
        }

        info!(file = %path.display(), table, "processing csv");
        self.replace_table(table, &columns, &rows)
    }

    /// Replace one table per non-empty row-set, named after the row-set
    pub fn load_tables(&mut self, tables: &Tables) -> Result<Vec<LoadedTable>> {
        let mut loaded = Vec::new();
        for set in tables.iter() {
            let columns: Vec<String> = set.ordered_columns().into_iter().map(str::to_string).collect();
            let rows: Vec<Vec<Option<String>>> = set
                .rows()
                .iter()
                .map(|row| {
                    set.ordered_values(row)
                        .into_iter()
                        .map(|value| value.filter(|v| !v.is_empty()).map(str::to_string))
                        .collect()
                })
                .collect();
            loaded.push(self.replace_table(set.name(), &columns, &rows)?);
        }
        Ok(loaded)
    }

    fn replace_table(&mut self, table: &str, columns: &[String], rows: &[Vec<Option<String>>]) -> Result<LoadedTable> {
        let affinities: Vec<(String, Affinity)> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let values = rows.iter().map(move |row| row.get(idx).and_then(|v| v.as_deref()));
                (column.clone(), Affinity::infer(column, values))
            })
            .collect();

        let definitions = affinities
            .iter()
            .map(|(column, affinity)| format!("{} {}", quote(column), affinity.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(table)), [])?;
        tx.execute(&format!("CREATE TABLE {} ({definitions})", quote(table)), [])?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {} VALUES ({placeholders})", quote(table)))?;
            for row in rows {
                let params = affinities
                    .iter()
                    .enumerate()
                    .map(|(idx, (_, affinity))| affinity.value(row.get(idx).and_then(|v| v.as_deref())));
                stmt.execute(rusqlite::params_from_iter(params))?;
            }
        }
        tx.commit()?;

        info!(table, rows = rows.len(), columns = columns.len(), "table loaded");
        Ok(LoadedTable {
            table: table.to_string(),
            rows: rows.len(),
            columns: affinities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melt::types::Row;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_affinity_inference() {
        let ints = [Some("1"), None, Some("42")];
        let reals = [Some("1"), Some("2.5")];
        let mixed = [Some("1"), Some("oral")];

        assert_eq!(Affinity::infer("count", ints.iter().copied()), Affinity::Integer);
        assert_eq!(Affinity::infer("mass", reals.iter().copied()), Affinity::Real);
        assert_eq!(Affinity::infer("route", mixed.iter().copied()), Affinity::Text);
        assert_eq!(Affinity::infer("pubmed_id", ints.iter().copied()), Affinity::Text);
        assert_eq!(Affinity::infer("ingredients", ints.iter().copied()), Affinity::Text);
        assert_eq!(Affinity::infer("empty", [None, None].iter().copied()), Affinity::Text);
    }

    #[test]
    fn test_load_restricted_plan() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "general_information_drugbank_drugs.csv",
            "drugbank_id,name,cas_number,average_mass\nDB00001,Lepirudin,,6963.425\nDB00002,Cetuximab,205923-56-4,\n",
        );
        write(
            dir.path(),
            "synonyms_drugbank_drugs.csv",
            "drugbank_id,synonym,language\nDB00001,Hirudin,en\n",
        );

        let mut loader = SqliteLoader::open_in_memory().unwrap();
        let summary = loader.load_csv_dir(dir.path(), &LoadPlan::restricted()).unwrap();
        assert!(summary.failed.is_empty());
        let loaded = summary.loaded;

        let names: Vec<&str> = loaded.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(names, vec!["general_info", "synonyms"]);
        assert_eq!(loaded[0].rows, 2);
        assert!(loaded[0].columns.contains(&("average_mass".to_string(), Affinity::Real)));

        let conn = loader.connection();
        let cas: Option<String> = conn
            .query_row(
                "SELECT cas_number FROM general_info WHERE drugbank_id = 'DB00001'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(cas, None);

        let mass: f64 = conn
            .query_row(
                "SELECT average_mass FROM general_info WHERE drugbank_id = 'DB00001'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!((mass - 6963.425).abs() < 1e-9);
    }

    #[test]
    fn test_reload_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mixtures_drugbank_drugs.csv", "drugbank_id,name,ingredients\nDB1,A,1\nDB2,B,2\n");

        let mut loader = SqliteLoader::open_in_memory().unwrap();
        loader.load_csv_dir(dir.path(), &LoadPlan::All).unwrap();

        write(dir.path(), "mixtures_drugbank_drugs.csv", "drugbank_id,name,ingredients\nDB3,C,003\n");
        let summary = loader.load_csv_dir(dir.path(), &LoadPlan::All).unwrap();
        assert_eq!(summary.loaded[0].table, "mixtures_drugbank_drugs");

        let (count, ingredients): (i64, String) = loader
            .connection()
            .query_row(
                "SELECT COUNT(*), MAX(ingredients) FROM mixtures_drugbank_drugs",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(ingredients, "003");
    }

    #[test]
    fn test_bad_csv_does_not_stop_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "general_information_drugbank_drugs.csv",
            "drugbank_id,name\nDB00001,Lepirudin\nDB00002,Cetuximab,extra\n",
        );
        write(
            dir.path(),
            "synonyms_drugbank_drugs.csv",
            "drugbank_id,synonym\nDB00001,Hirudin\n",
        );

        let mut loader = SqliteLoader::open_in_memory().unwrap();
        let summary = loader.load_csv_dir(dir.path(), &LoadPlan::restricted()).unwrap();

        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].table, "general_info");
        assert!(matches!(summary.failed[0].error, LoadError::Csv(_)));
        assert_eq!(summary.loaded.len(), 1);
        assert_eq!(summary.loaded[0].table, "synonyms");
        assert_eq!(summary.rows(), 1);

        let conn = loader.connection();
        let synonym: String = conn
            .query_row("SELECT synonym FROM synonyms", [], |r| r.get(0))
            .unwrap();
        assert_eq!(synonym, "Hirudin");
        let general: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'general_info'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(general, 0);
    }

    #[test]
    fn test_load_tables_keeps_ids_as_text() {
        let mut tables = Tables::new();
        tables.push(
            "targets_polypeptides",
            Row::keyed("DB00001")
                .with("polypeptide_id", Some("P00734".into()))
                .with("organism_id", Some("9606".into()))
                .with("gene_name", None),
        );

        let mut loader = SqliteLoader::open_in_memory().unwrap();
        let loaded = loader.load_tables(&tables).unwrap();
        assert_eq!(loaded[0].columns[2], ("organism_id".to_string(), Affinity::Text));

        let kind: String = loader
            .connection()
            .query_row("SELECT typeof(organism_id) FROM targets_polypeptides", [], |r| r.get(0))
            .unwrap();
        assert_eq!(kind, "text");
    }
}
