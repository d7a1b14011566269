use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::melt::error::ExtractError;
use crate::melt::node::Node;
use crate::melt::path;
use crate::melt::plan::{Catalog, ColumnSpec, ExtractionRule, ListRule, SingletonRule, StructuredRule};
use crate::melt::structured;
use crate::melt::types::{Row, Tables};

/// Reference selecting a record's primary identifier
pub const PRIMARY_ID_REFERENCE: &str = r#"drugbank-id[@primary="true"]"#;

/// One record being melted: its subtree, primary id and stream position
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub index: usize,
    pub id: &'a str,
    pub node: &'a Node,
}

impl<'a> Record<'a> {
    /// `None` when the record has no primary identifier
    pub fn new(index: usize, node: &'a Node) -> Option<Self> {
        let id = path::resolve(Some(node), PRIMARY_ID_REFERENCE)?;
        Some(Record { index, id, node })
    }

    /// Row keyed by this record's primary id
    pub fn row(&self) -> Row {
        Row::keyed(self.id)
    }
}

/// Rows produced by one rule for one record, committed only if the rule succeeds
#[derive(Debug, Default)]
pub struct Staging {
    rows: Vec<(String, Row)>,
}

impl Staging {
    pub fn new() -> Self {
        Staging::default()
    }

    pub fn push(&mut self, table: impl Into<String>, row: Row) {
        self.rows.push((table.into(), row));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn commit(self, tables: &mut Tables) {
        for (table, row) in self.rows {
            tables.push(&table, row);
        }
    }
}

/// A rule that failed on a record
#[derive(Debug)]
pub struct RuleFailure {
    pub record_index: usize,
    pub rule: &'static str,
    pub error: ExtractError,
}

/// Applies a catalog to records, one rule at a time
pub struct RecordMelter {
    catalog: Catalog,
}

impl RecordMelter {
    pub fn new(catalog: Catalog) -> Self {
        RecordMelter { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run every rule against `record`. Rows of successful rules land in
    /// `tables`; a failing rule contributes nothing and is reported back.
    pub fn melt(&self, record: &Record<'_>, tables: &mut Tables) -> Vec<RuleFailure> {
        let mut failures = Vec::new();

        for rule in self.catalog.rules() {
            match extract_rule(rule, record) {
                Ok(staging) => staging.commit(tables),
                Err(error) => {
                    warn!(
                        record_index = record.index,
                        drugbank_id = record.id,
                        rule = rule.name(),
                        "error processing drug: {error}"
                    );
                    failures.push(RuleFailure {
                        record_index: record.index,
                        rule: rule.name(),
                        error,
                    });
                }
            }
        }

        failures
    }
}

/// Run one rule in isolation; a panic inside the rule becomes an error
pub fn extract_rule(rule: &ExtractionRule, record: &Record<'_>) -> Result<Staging, ExtractError> {
    let mut staging = Staging::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| apply(rule, record, &mut staging)));
    match outcome {
        Ok(Ok(())) => Ok(staging),
        Ok(Err(error)) => Err(error),
        Err(payload) => Err(ExtractError::Panicked {
            rule: rule.name().to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn apply(rule: &ExtractionRule, record: &Record<'_>, staging: &mut Staging) -> Result<(), ExtractError> {
    match rule {
        ExtractionRule::Singleton(rule) => {
            extract_singleton(rule, record, staging);
            Ok(())
        }
        ExtractionRule::List(rule) => {
            extract_list(rule, record, staging);
            Ok(())
        }
        ExtractionRule::Structured(StructuredRule::Pathways) => {
            structured::extract_pathways(record, staging);
            Ok(())
        }
        ExtractionRule::Structured(StructuredRule::Reactions) => {
            structured::extract_reactions(record, staging);
            Ok(())
        }
        ExtractionRule::Structured(StructuredRule::Interactants(group)) => {
            structured::extract_interactants(group, record, staging);
            Ok(())
        }
        ExtractionRule::Structured(StructuredRule::Custom(rule)) => (rule.extract)(record, staging),
    }
}

/// Append every column of `columns`, resolved against `node`, to `row`
pub fn fill_columns(mut row: Row, node: Option<&Node>, columns: &[ColumnSpec]) -> Row {
    for spec in columns {
        row.set(spec.column, path::value(node, spec.reference));
    }
    row
}

fn extract_singleton(rule: &SingletonRule, record: &Record<'_>, staging: &mut Staging) {
    let node = match rule.anchor {
        Some(anchor) => match path::locate(Some(record.node), anchor) {
            Some(node) => node,
            None => return,
        },
        None => record.node,
    };
    staging.push(rule.table, fill_columns(record.row(), Some(node), rule.columns));
}

fn extract_list(rule: &ListRule, record: &Record<'_>, staging: &mut Staging) {
    let Some(container) = path::locate(Some(record.node), rule.container) else {
        return;
    };
    for item in container.children_named(rule.item) {
        staging.push(rule.table, fill_columns(record.row(), Some(item), rule.columns));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic")
    }
}
