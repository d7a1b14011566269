//! DrugBank melting - flatten the XML export into relational tables
//!
//! This module streams drug records out of a DrugBank XML document and applies
//! a catalog of extraction rules to each one, producing named row-sets keyed
//! by the drug's primary identifier.
//!
//! ## Failure isolation
//!
//! Each rule runs against each record on its own. A rule that fails (or
//! panics) contributes no rows for that record; every other rule and every
//! other record is unaffected.

pub mod types;
pub mod error;
pub mod node;
pub mod path;
pub mod plan;
pub mod extractor;
pub mod structured;
pub mod stream;
pub mod writer;

pub use types::{MeltConfig, MeltSummary, Row, RowSet, RuleSet, Tables, PRIORITY_COLUMNS};
pub use error::{Error, ExtractError};
pub use node::Node;
pub use plan::{Catalog, ColumnSpec, CustomRule, ExtractionRule, ListRule, SingletonRule, StructuredRule};
pub use extractor::{Record, RecordMelter, RuleFailure, Staging};
pub use stream::DrugBankMelter;
pub use writer::{OutputFormat, SingleWriter, TableWriter, WrittenTable};
