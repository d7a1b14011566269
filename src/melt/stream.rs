//! Streaming driver: walks the document event by event, builds one record
//! subtree at a time, melts it, and drops it before moving on.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use tracing::{debug, info};

use crate::melt::error::Error;
use crate::melt::extractor::{Record, RecordMelter};
use crate::melt::node::{Node, TreeBuilder};
use crate::melt::plan::Catalog;
use crate::melt::types::{MeltConfig, MeltSummary, Tables};

/// Melts a whole DrugBank export into row-sets
pub struct DrugBankMelter {
    config: MeltConfig,
    melter: RecordMelter,
}

impl DrugBankMelter {
    /// Melter using the catalog selected by `config.ruleset`
    pub fn new(config: MeltConfig) -> Self {
        let catalog = Catalog::for_ruleset(config.ruleset);
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: MeltConfig, catalog: Catalog) -> Self {
        DrugBankMelter {
            config,
            melter: RecordMelter::new(catalog),
        }
    }

    pub fn config(&self) -> &MeltConfig {
        &self.config
    }

    /// Melt a file into a fresh accumulator
    pub fn melt_file<P: AsRef<Path>>(&self, path: P) -> Result<(Tables, MeltSummary), Error> {
        let file = File::open(path.as_ref())?;
        let mut tables = Tables::new();
        let summary = self.melt_reader(BufReader::new(file), &mut tables)?;
        Ok((tables, summary))
    }

    /// Stream `reader` to the end, appending every extracted row to `tables`
    pub fn melt_reader<R: BufRead>(&self, reader: R, tables: &mut Tables) -> Result<MeltSummary, Error> {
        let mut reader = NsReader::from_reader(reader);

        info!(
            record_tag = %self.config.record_tag,
            rules = self.melter.catalog().len(),
            "streaming records"
        );

        let mut summary = MeltSummary::default();
        let mut depth = 0usize;
        let mut builder: Option<TreeBuilder> = None;
        let mut buf = Vec::new();

        loop {
            let finished = {
                let (record_level, event) = match reader.read_resolved_event_into(&mut buf) {
                    Ok((ns, event)) => (depth == 1 && self.namespace_matches(&ns), event),
                    Err(source) => {
                        return Err(Error::Xml {
                            position: reader.buffer_position() as u64,
                            source,
                        })
                    }
                };

                match event {
                    Event::Start(ref e) => {
                        if builder.is_none() && record_level && self.is_record_tag(e) {
                            builder = Some(TreeBuilder::default());
                        }
                        let result = match builder.as_mut() {
                            Some(b) => b.open(e),
                            None => Ok(()),
                        };
                        result.map_err(|source| Error::Xml {
                            position: reader.buffer_position() as u64,
                            source,
                        })?;
                        depth += 1;
                        None
                    }
                    Event::Empty(ref e) => {
                        let result = match builder.as_mut() {
                            Some(b) => b.empty(e),
                            None if record_level && self.is_record_tag(e) => TreeBuilder::default().empty(e),
                            None => Ok(None),
                        };
                        result.map_err(|source| Error::Xml {
                            position: reader.buffer_position() as u64,
                            source,
                        })?
                    }
                    Event::Text(ref e) => {
                        if let Some(b) = builder.as_mut() {
                            let text = e.unescape().map_err(|source| Error::Xml {
                                position: reader.buffer_position() as u64,
                                source,
                            })?;
                            b.text(&text);
                        }
                        None
                    }
                    Event::CData(ref e) => {
                        if let Some(b) = builder.as_mut() {
                            b.text(&String::from_utf8_lossy(e));
                        }
                        None
                    }
                    Event::End(_) => {
                        depth = depth.saturating_sub(1);
                        builder.as_mut().and_then(TreeBuilder::close)
                    }
                    Event::Eof => {
                        if depth > 0 {
                            return Err(Error::Truncated { depth });
                        }
                        break;
                    }
                    _ => None,
                }
            };
            buf.clear();

            if let Some(node) = finished {
                builder = None;
                self.process_record(node, &mut summary, tables);
            }
        }

        info!(
            records = summary.records,
            melted = summary.melted,
            skipped = summary.skipped,
            failures = summary.failures,
            tables = tables.iter().count(),
            rows = tables.total_rows(),
            "parsing complete"
        );
        Ok(summary)
    }

    fn is_record_tag(&self, start: &BytesStart<'_>) -> bool {
        start.local_name().as_ref() == self.config.record_tag.as_bytes()
    }

    /// Unbound elements always match; bound ones must use the configured namespace
    fn namespace_matches(&self, ns: &ResolveResult<'_>) -> bool {
        match (ns, self.config.namespace.as_deref()) {
            (ResolveResult::Bound(bound), Some(expected)) => bound.as_ref() == expected.as_bytes(),
            _ => true,
        }
    }

    /// Melt one record subtree; it is dropped when this returns
    fn process_record(&self, node: Node, summary: &mut MeltSummary, tables: &mut Tables) {
        let index = summary.records;
        summary.records += 1;

        match Record::new(index, &node) {
            Some(record) => {
                let failures = self.melter.melt(&record, tables);
                summary.failures += failures.len();
                summary.melted += 1;
            }
            None => {
                debug!(record_index = index, "record has no primary drugbank-id, skipping");
                summary.skipped += 1;
            }
        }

        let interval = self.config.progress_interval;
        if interval > 0 && summary.records % interval == 0 {
            info!(records = summary.records, "parsed {} drugs", summary.records);
        }
    }
}
