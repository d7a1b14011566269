//! The extraction rule catalog
//!
//! Every destination table is described here as data. Flat shapes are
//! `Singleton` or `List` rules carrying a (reference → column) map; shapes
//! with inner structure or synthesized keys are `Structured` rules handled by
//! [`crate::melt::structured`].

use crate::melt::error::ExtractError;
use crate::melt::extractor::{Record, Staging};
use crate::melt::types::RuleSet;

/// One (field reference → output column) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub reference: &'static str,
    pub column: &'static str,
}

impl ColumnSpec {
    pub const fn new(reference: &'static str, column: &'static str) -> Self {
        ColumnSpec { reference, column }
    }
}

const fn col(reference: &'static str, column: &'static str) -> ColumnSpec {
    ColumnSpec::new(reference, column)
}

/// At most one row per record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingletonRule {
    pub table: &'static str,
    /// Node the columns are resolved against; no row at all when it is absent.
    /// `None` resolves against the record itself and always yields a row.
    pub anchor: Option<&'static str>,
    pub columns: &'static [ColumnSpec],
}

/// One row per `item` child of the `container` node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRule {
    pub table: &'static str,
    pub container: &'static str,
    pub item: &'static str,
    pub columns: &'static [ColumnSpec],
}

/// Targets, enzymes, carriers or transporters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractantGroup {
    /// Container tag, e.g. `targets`
    pub container: &'static str,
    /// Member tag, e.g. `target`
    pub member: &'static str,
    /// Table name suffix, e.g. `drugbank_cett_targets`
    pub suffix: &'static str,
}

impl InteractantGroup {
    pub fn general_table(&self) -> String {
        format!("general_information_{}", self.suffix)
    }

    pub fn actions_table(&self) -> String {
        format!("actions_{}", self.suffix)
    }

    /// Polypeptide table for `kind` (`general_information`, `external_identity`,
    /// `synonyms`, `pfams`, `go`)
    pub fn polypeptide_table(&self, kind: &str) -> String {
        format!("{}_{}_polypeptides", kind, self.suffix)
    }
}

pub type CustomExtract = fn(&Record<'_>, &mut Staging) -> Result<(), ExtractError>;

/// A named hand-written rule
#[derive(Clone, Copy)]
pub struct CustomRule {
    pub name: &'static str,
    pub extract: CustomExtract,
}

impl std::fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomRule").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StructuredRule {
    Pathways,
    Reactions,
    Interactants(InteractantGroup),
    Custom(CustomRule),
}

/// Extraction rule for one record
#[derive(Debug, Clone, Copy)]
pub enum ExtractionRule {
    Singleton(SingletonRule),
    List(ListRule),
    Structured(StructuredRule),
}

impl ExtractionRule {
    /// Name used in logs: the table for flat rules, the shape for structured ones
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionRule::Singleton(rule) => rule.table,
            ExtractionRule::List(rule) => rule.table,
            ExtractionRule::Structured(StructuredRule::Pathways) => "pathways",
            ExtractionRule::Structured(StructuredRule::Reactions) => "reactions",
            ExtractionRule::Structured(StructuredRule::Interactants(group)) => group.container,
            ExtractionRule::Structured(StructuredRule::Custom(rule)) => rule.name,
        }
    }
}

// =============================================================================
// Drug-level singletons
// =============================================================================

pub static GENERAL: SingletonRule = SingletonRule {
    table: "general_information_drugbank_drugs",
    anchor: None,
    columns: &[
        col("name", "name"),
        col("@type", "type"),
        col("cas-number", "cas_number"),
        col("unii", "unii"),
        col("state", "state"),
        col("average-mass", "average_mass"),
        col("monoisotopic-mass", "monoisotopic_mass"),
        col("@created", "created"),
        col("@updated", "updated"),
        col("description", "description"),
    ],
};

pub static PHARMACOLOGY: SingletonRule = SingletonRule {
    table: "pharmacology_drugbank_drugs",
    anchor: None,
    columns: &[
        col("indication", "indication"),
        col("pharmacodynamics", "pharmacodynamics"),
        col("mechanism-of-action", "mechanism_of_action"),
        col("toxicity", "toxicity"),
        col("metabolism", "metabolism"),
        col("absorption", "absorption"),
        col("half-life", "half_life"),
        col("protein-binding", "protein_binding"),
        col("route-of-elimination", "route_of_elimination"),
        col("volume-of-distribution", "volume_of_distribution"),
        col("clearance", "clearance"),
    ],
};

pub static CLASSIFICATION: SingletonRule = SingletonRule {
    table: "drug_classification_drugbank_drugs",
    anchor: Some("classification"),
    columns: &[
        col("kingdom", "kingdom"),
        col("superclass", "superclass"),
        col("class", "class"),
        col("subclass", "subclass"),
        col("direct-parent", "direct_parent"),
    ],
};

// =============================================================================
// General references
// =============================================================================

pub static REFERENCE_ARTICLES: ListRule = ListRule {
    table: "references_articles_drugbank_drugs",
    container: "general-references/articles",
    item: "article",
    columns: &[
        col("@id", "ref_id"),
        col("pubmed-id", "pubmed_id"),
        col("citation", "citation"),
    ],
};

pub static REFERENCE_BOOKS: ListRule = ListRule {
    table: "references_books_drugbank_drugs",
    container: "general-references/textbooks",
    item: "textbook",
    columns: &[
        col("@id", "ref_id"),
        col("isbn", "isbn"),
        col("citation", "citation"),
    ],
};

pub static REFERENCE_LINKS: ListRule = ListRule {
    table: "references_links_drugbank_drugs",
    container: "general-references/links",
    item: "link",
    columns: &[
        col("@id", "ref_id"),
        col("title", "title"),
        col("url", "url"),
    ],
};

pub static REFERENCE_ATTACHMENTS: ListRule = ListRule {
    table: "references_attachments_drugbank_drugs",
    container: "general-references/attachments",
    item: "attachment",
    columns: &[
        col("@id", "ref_id"),
        col("title", "title"),
        col("url", "url"),
    ],
};

// =============================================================================
// Drug-level lists
// =============================================================================

pub static SYNONYMS: ListRule = ListRule {
    table: "synonyms_drugbank_drugs",
    container: "synonyms",
    item: "synonym",
    columns: &[
        col(".", "synonym"),
        col("@language", "language"),
        col("@coder", "coder"),
    ],
};

pub static INTERNATIONAL_BRANDS: ListRule = ListRule {
    table: "international_brands_drugbank_drugs",
    container: "international-brands",
    item: "international-brand",
    columns: &[col("name", "name"), col("company", "company")],
};

pub static MIXTURES: ListRule = ListRule {
    table: "mixtures_drugbank_drugs",
    container: "mixtures",
    item: "mixture",
    columns: &[col("name", "name"), col("ingredients", "ingredients")],
};

pub static CATEGORIES: ListRule = ListRule {
    table: "categories_drugbank_drugs",
    container: "categories",
    item: "category",
    columns: &[col("category", "category"), col("mesh-id", "mesh_id")],
};

pub static DOSAGES: ListRule = ListRule {
    table: "dosages_drugbank_drugs",
    container: "dosages",
    item: "dosage",
    columns: &[
        col("form", "form"),
        col("route", "route"),
        col("strength", "strength"),
    ],
};

pub static DRUG_INTERACTIONS: ListRule = ListRule {
    table: "drug_interactions_drugbank_drugs",
    container: "drug-interactions",
    item: "drug-interaction",
    columns: &[
        col("drugbank-id", "target_drugbank_id"),
        col("name", "name"),
        col("description", "description"),
    ],
};

pub static SEQUENCES: ListRule = ListRule {
    table: "sequences_drugbank_drugs",
    container: "sequences",
    item: "sequence",
    columns: &[col(".", "sequence"), col("@format", "format")],
};

pub static CALCULATED_PROPERTIES: ListRule = ListRule {
    table: "calculated_properties_drugbank_drugs",
    container: "calculated-properties",
    item: "property",
    columns: &[
        col("kind", "kind"),
        col("value", "value"),
        col("source", "source"),
    ],
};

pub static EXPERIMENTAL_PROPERTIES: ListRule = ListRule {
    table: "experimental_properties_drugbank_drugs",
    container: "experimental-properties",
    item: "property",
    columns: &[
        col("kind", "kind"),
        col("value", "value"),
        col("source", "source"),
    ],
};

pub static EXTERNAL_IDENTIFIERS: ListRule = ListRule {
    table: "external_identifiers_drugbank_drugs",
    container: "external-identifiers",
    item: "external-identifier",
    columns: &[col("resource", "resource"), col("identifier", "identifier")],
};

pub static SALTS: ListRule = ListRule {
    table: "salts_drugbank",
    container: "salts",
    item: "salt",
    columns: &[
        col("name", "name"),
        col("cas-number", "cas_number"),
        col("unii", "unii"),
    ],
};

pub static SNP_EFFECTS: ListRule = ListRule {
    table: "snp_effects_drugbank_drugs_reactions",
    container: "snp-effects",
    item: "effect",
    columns: &[
        col("protein-name", "protein_name"),
        col("gene-symbol", "gene_symbol"),
        col("description", "description"),
    ],
};

pub static SNP_ADVERSE_REACTIONS: ListRule = ListRule {
    table: "snp_adverse_reactions_drugbank_drugs_reactions",
    container: "snp-adverse-drug-reactions",
    item: "reaction",
    columns: &[
        col("protein-name", "protein_name"),
        col("adverse-reaction", "adverse_reaction"),
    ],
};

pub static FOOD_INTERACTIONS: ListRule = ListRule {
    table: "food_interactions_drugbank_drugs_reactions",
    container: "food-interactions",
    item: "food-interaction",
    columns: &[col(".", "interaction")],
};

pub static PDB_ENTRIES: ListRule = ListRule {
    table: "pdb_entries_drugbank_drugs_reactions",
    container: "pdb-entries",
    item: "pdb-entry",
    columns: &[col(".", "pdb_entry")],
};

// =============================================================================
// Interactant groups
// =============================================================================

pub static TARGETS: InteractantGroup = InteractantGroup {
    container: "targets",
    member: "target",
    suffix: "drugbank_cett_targets",
};

pub static ENZYMES: InteractantGroup = InteractantGroup {
    container: "enzymes",
    member: "enzyme",
    suffix: "drugbank_cett_enzymes",
};

pub static CARRIERS: InteractantGroup = InteractantGroup {
    container: "carriers",
    member: "carrier",
    suffix: "drugbank_cett_carriers",
};

pub static TRANSPORTERS: InteractantGroup = InteractantGroup {
    container: "transporters",
    member: "transporter",
    suffix: "drugbank_cett_transporters",
};

// =============================================================================
// Catalog
// =============================================================================

/// The ordered list of rules applied to every record
#[derive(Debug, Clone)]
pub struct Catalog {
    rules: Vec<ExtractionRule>,
}

impl Catalog {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Catalog { rules }
    }

    /// Every table: singletons, then lists, then structured shapes
    pub fn full() -> Self {
        let mut rules = vec![
            ExtractionRule::Singleton(GENERAL),
            ExtractionRule::Singleton(PHARMACOLOGY),
            ExtractionRule::Singleton(CLASSIFICATION),
        ];
        rules.extend(
            [
                REFERENCE_ARTICLES,
                REFERENCE_BOOKS,
                REFERENCE_LINKS,
                REFERENCE_ATTACHMENTS,
                SYNONYMS,
                INTERNATIONAL_BRANDS,
                MIXTURES,
                CATEGORIES,
                DOSAGES,
                DRUG_INTERACTIONS,
                SEQUENCES,
                CALCULATED_PROPERTIES,
                EXPERIMENTAL_PROPERTIES,
                EXTERNAL_IDENTIFIERS,
                SALTS,
                SNP_EFFECTS,
                SNP_ADVERSE_REACTIONS,
                FOOD_INTERACTIONS,
                PDB_ENTRIES,
            ]
            .into_iter()
            .map(ExtractionRule::List),
        );
        rules.push(ExtractionRule::Structured(StructuredRule::Pathways));
        rules.push(ExtractionRule::Structured(StructuredRule::Reactions));
        rules.extend(
            [TARGETS, ENZYMES, CARRIERS, TRANSPORTERS]
                .into_iter()
                .map(|group| ExtractionRule::Structured(StructuredRule::Interactants(group))),
        );
        Catalog { rules }
    }

    /// Core drug info, references, synonyms, mixtures and interactions
    pub fn restricted() -> Self {
        let mut rules = vec![
            ExtractionRule::Singleton(GENERAL),
            ExtractionRule::Singleton(PHARMACOLOGY),
        ];
        rules.extend(
            [
                REFERENCE_ARTICLES,
                REFERENCE_BOOKS,
                REFERENCE_LINKS,
                REFERENCE_ATTACHMENTS,
                SYNONYMS,
                MIXTURES,
                DRUG_INTERACTIONS,
                FOOD_INTERACTIONS,
            ]
            .into_iter()
            .map(ExtractionRule::List),
        );
        Catalog { rules }
    }

    pub fn for_ruleset(ruleset: RuleSet) -> Self {
        match ruleset {
            RuleSet::Full => Catalog::full(),
            RuleSet::Restricted => Catalog::restricted(),
        }
    }

    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::full()
    }
}
