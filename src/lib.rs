//! # drugbank-melt - DrugBank XML flattening toolkit
//!
//! Streams a DrugBank XML export and flattens each drug record into a family
//! of relational tables, then optionally loads those tables into SQLite.
//!
//! ## Modules
//!
//! - **melt**: Stream records, apply the extraction rule catalog, write tables
//! - **load**: Bulk-load table CSVs (or melted tables) into SQLite
//!
//! ## Quick Start
//!
//! ```rust
//! use drugbank_melt::melt::{MeltConfig, RuleSet};
//!
//! # fn main() -> anyhow::Result<()> {
//! let xml = br#"<drugbank xmlns="http://www.drugbank.ca">
//!   <drug type="biotech">
//!     <drugbank-id primary="true">DB00001</drugbank-id>
//!     <name>Lepirudin</name>
//!     <synonyms><synonym language="en">Hirudin</synonym></synonyms>
//!   </drug>
//! </drugbank>"#;
//!
//! let config = MeltConfig {
//!     ruleset: RuleSet::Restricted,
//!     ..MeltConfig::default()
//! };
//! let (tables, summary) = drugbank_melt::melt_xml(&xml[..], config)?;
//!
//! assert_eq!(summary.melted, 1);
//! assert_eq!(tables.rows("synonyms_drugbank_drugs")[0].get("synonym"), Some("Hirudin"));
//! # Ok(())
//! # }
//! ```

use std::io::BufRead;

pub mod load;
pub mod melt;

// Re-export commonly used types for convenience
pub use load::{LoadPlan, LoadSummary, SqliteLoader};
pub use melt::{
    Catalog, DrugBankMelter, MeltConfig, MeltSummary, OutputFormat, Row, RowSet, RuleSet,
    SingleWriter, TableWriter, Tables,
};

/// Main entry point: melt a DrugBank XML stream into row-sets
pub fn melt_xml<R: BufRead>(reader: R, config: MeltConfig) -> Result<(Tables, MeltSummary), melt::Error> {
    let melter = DrugBankMelter::new(config);
    let mut tables = Tables::new();
    let summary = melter.melt_reader(reader, &mut tables)?;
    Ok((tables, summary))
}
