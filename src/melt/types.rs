use serde::Serialize;
use std::collections::HashMap;

/// Identifier columns, in the order they lead every row-set.
pub const PRIORITY_COLUMNS: [&str; 3] = ["drugbank_id", "interactant_id", "polypeptide_id"];

/// Column carrying the owning record's primary identifier.
pub const RECORD_ID_COLUMN: &str = "drugbank_id";

/// One output row: column name to optional text value, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new() -> Self {
        Row { cells: Vec::new() }
    }

    /// Start a row keyed by the owning record's primary identifier
    pub fn keyed(drugbank_id: &str) -> Self {
        Row::new().with(RECORD_ID_COLUMN, Some(drugbank_id.to_string()))
    }

    pub fn with(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing its value if the column is already present
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Value of a column; `None` both when the column is missing and when it is absent
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// All rows destined for one named table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    name: String,
    /// Columns in first-seen order
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(name: impl Into<String>) -> Self {
        RowSet {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, row: Row) {
        for column in row.columns() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifier columns first (in `PRIORITY_COLUMNS` order), then the rest
    /// in the order they were first seen.
    pub fn ordered_columns(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = PRIORITY_COLUMNS
            .iter()
            .copied()
            .filter(|p| self.columns.iter().any(|c| c == p))
            .collect();
        ordered.extend(
            self.columns
                .iter()
                .map(String::as_str)
                .filter(|c| !PRIORITY_COLUMNS.contains(c)),
        );
        ordered
    }

    /// Row values laid out in `ordered_columns` order
    pub fn ordered_values<'a>(&'a self, row: &'a Row) -> Vec<Option<&'a str>> {
        self.ordered_columns()
            .into_iter()
            .map(|column| row.get(column))
            .collect()
    }
}

/// The accumulator for one pipeline run: every row-set keyed by table name,
/// kept in the order tables were first written to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    sets: Vec<RowSet>,
    index: HashMap<String, usize>,
}

impl Tables {
    pub fn new() -> Self {
        Tables::default()
    }

    pub fn push(&mut self, table: &str, row: Row) {
        let idx = match self.index.get(table) {
            Some(&idx) => idx,
            None => {
                self.sets.push(RowSet::new(table));
                self.index.insert(table.to_string(), self.sets.len() - 1);
                self.sets.len() - 1
            }
        };
        self.sets[idx].push(row);
    }

    pub fn get(&self, table: &str) -> Option<&RowSet> {
        self.index.get(table).map(|&idx| &self.sets[idx])
    }

    /// Rows of a table, empty when the table was never written to
    pub fn rows(&self, table: &str) -> &[Row] {
        self.get(table).map(RowSet::rows).unwrap_or(&[])
    }

    /// Non-empty row-sets in first-written order
    pub fn iter(&self) -> impl Iterator<Item = &RowSet> {
        self.sets.iter().filter(|set| !set.is_empty())
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.iter().map(RowSet::name).collect()
    }

    pub fn total_rows(&self) -> usize {
        self.sets.iter().map(RowSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}

/// Which extraction catalog a run applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleSet {
    /// Every table the export can be flattened into
    #[default]
    Full,
    /// Core drug info, references, synonyms, mixtures and interactions only
    Restricted,
}

/// Configuration for the melting process
#[derive(Debug, Clone)]
pub struct MeltConfig {
    /// Local name of the repeated record element
    pub record_tag: String,

    /// Namespace records must be bound to; unbound records are always accepted
    pub namespace: Option<String>,

    pub ruleset: RuleSet,

    /// Log progress every N records (0 disables)
    pub progress_interval: usize,
}

impl Default for MeltConfig {
    fn default() -> Self {
        MeltConfig {
            record_tag: String::from("drug"),
            namespace: Some(String::from("http://www.drugbank.ca")),
            ruleset: RuleSet::Full,
            progress_interval: 1000,
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeltSummary {
    /// Record elements encountered
    pub records: usize,
    /// Records that carried a primary id and were extracted
    pub melted: usize,
    /// Records dropped for lacking a primary id
    pub skipped: usize,
    /// Rule failures, one per (record, rule)
    pub failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_replaces_value() {
        let mut row = Row::keyed("DB00001").with("name", None);
        row.set("name", Some("Lepirudin".to_string()));

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("name"), Some("Lepirudin"));
        assert!(row.contains("drugbank_id"));
        assert!(!row.contains("state"));
    }

    #[test]
    fn test_identifier_columns_lead() {
        let mut set = RowSet::new("synonyms_drugbank_cett_targets_polypeptides");
        set.push(
            Row::new()
                .with("synonym", Some("x".into()))
                .with("polypeptide_id", Some("P1".into()))
                .with("interactant_id", Some("BE1".into()))
                .with("drugbank_id", Some("DB1".into())),
        );

        assert_eq!(
            set.ordered_columns(),
            vec!["drugbank_id", "interactant_id", "polypeptide_id", "synonym"]
        );
    }

    #[test]
    fn test_columns_first_seen_order() {
        let mut set = RowSet::new("t");
        set.push(Row::keyed("DB1").with("b", None));
        set.push(Row::keyed("DB2").with("a", Some("1".into())).with("b", None));

        assert_eq!(set.ordered_columns(), vec!["drugbank_id", "b", "a"]);
        assert_eq!(set.ordered_values(&set.rows()[0]), vec![Some("DB1"), None, None]);
    }

    #[test]
    fn test_tables_keep_first_written_order() {
        let mut tables = Tables::new();
        tables.push("z", Row::keyed("DB1"));
        tables.push("a", Row::keyed("DB1"));
        tables.push("z", Row::keyed("DB2"));

        assert_eq!(tables.table_names(), vec!["z", "a"]);
        assert_eq!(tables.rows("z").len(), 2);
        assert!(tables.rows("missing").is_empty());
        assert_eq!(tables.total_rows(), 3);
    }
}
