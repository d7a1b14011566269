//! Hand-written extractors for pathways, reactions and interactant groups.
//!
//! These shapes need either a synthesized key or more than one level of
//! nesting, which a flat column map cannot carry. Every row still starts from
//! [`Record::row`], so the record's primary id is always the first column,
//! followed by the ids of each enclosing level.

use crate::melt::extractor::{fill_columns, Record, Staging};
use crate::melt::node::Node;
use crate::melt::path::{self, value};
use crate::melt::plan::{ColumnSpec, InteractantGroup};
use crate::melt::types::Row;

const PATHWAY_TABLE: &str = "general_information_drugbank_drugs_pathway";
const PATHWAY_DRUGS_TABLE: &str = "pathway_drugs_drugbank_drugs_pathway";
const PATHWAY_ENZYMES_TABLE: &str = "pathway_enzyme_drugbank_drugs_pathway";

const REACTION_TABLE: &str = "general_information_drugbank_drugs_reactions";
const REACTION_ENZYMES_TABLE: &str = "reaction_enzymes_drugbank_drugs_reactions";

const PATHWAY_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("name", "name"),
    ColumnSpec::new("category", "category"),
];

const PATHWAY_DRUG_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("drugbank-id", "pathway_drug_id"),
    ColumnSpec::new("name", "name"),
];

const REACTION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("sequence", "sequence"),
    ColumnSpec::new("left-element/drugbank-id", "left_element_drug_id"),
    ColumnSpec::new("left-element/name", "left_element_name"),
    ColumnSpec::new("right-element/drugbank-id", "right_element_drug_id"),
    ColumnSpec::new("right-element/name", "right_element_name"),
];

const REACTION_ENZYME_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("drugbank-id", "enzyme_drugbank_id"),
    ColumnSpec::new("uniprot-id", "uniprot_id"),
];

const INTERACTANT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("name", "name"),
    ColumnSpec::new("organism", "organism"),
    ColumnSpec::new("known-action", "known_action"),
];

const POLYPEPTIDE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("name", "name"),
    ColumnSpec::new("general-function", "general_function"),
    ColumnSpec::new("specific-function", "specific_function"),
    ColumnSpec::new("gene-name", "gene_name"),
    ColumnSpec::new("locus", "locus"),
    ColumnSpec::new("molecular-weight", "molecular_weight"),
    ColumnSpec::new("organism/@ncbi-taxonomy-id", "organism_id"),
    ColumnSpec::new("organism", "organism_name"),
];

/// A list nested under each polypeptide: (table kind, container/item path, columns)
struct PolypeptideList {
    kind: &'static str,
    path: &'static str,
    columns: &'static [ColumnSpec],
}

const POLYPEPTIDE_LISTS: &[PolypeptideList] = &[
    PolypeptideList {
        kind: "external_identity",
        path: "external-identifiers/external-identifier",
        columns: &[
            ColumnSpec::new("resource", "resource"),
            ColumnSpec::new("identifier", "identifier"),
        ],
    },
    PolypeptideList {
        kind: "synonyms",
        path: "synonyms/synonym",
        columns: &[ColumnSpec::new(".", "synonym")],
    },
    PolypeptideList {
        kind: "pfams",
        path: "pfams/pfam",
        columns: &[
            ColumnSpec::new("identifier", "identifier"),
            ColumnSpec::new("name", "name"),
        ],
    },
    PolypeptideList {
        kind: "go",
        path: "go-classifiers/go-classifier",
        columns: &[
            ColumnSpec::new("category", "category"),
            ColumnSpec::new("description", "description"),
        ],
    },
];

/// Synthesized key for the `ordinal`-th reaction of a record
pub fn reaction_id(drugbank_id: &str, ordinal: usize) -> String {
    format!("{drugbank_id}_rxn_{ordinal}")
}

pub fn extract_pathways(record: &Record<'_>, staging: &mut Staging) {
    let Some(container) = path::locate(Some(record.node), "pathways") else {
        return;
    };

    for pathway in container.children_named("pathway") {
        let smpdb_id = value(Some(pathway), "smpdb-id");
        let keyed = record.row().with("smpdb_id", smpdb_id);

        staging.push(
            PATHWAY_TABLE,
            fill_columns(keyed.clone(), Some(pathway), PATHWAY_COLUMNS),
        );

        for drug in pathway.find_all("drugs/drug") {
            staging.push(
                PATHWAY_DRUGS_TABLE,
                fill_columns(keyed.clone(), Some(drug), PATHWAY_DRUG_COLUMNS),
            );
        }

        for enzyme in pathway.find_all("enzymes/uniprot-id") {
            staging.push(
                PATHWAY_ENZYMES_TABLE,
                keyed
                    .clone()
                    .with("uniprot_id", enzyme.text().map(str::to_string)),
            );
        }
    }
}

pub fn extract_reactions(record: &Record<'_>, staging: &mut Staging) {
    let Some(container) = path::locate(Some(record.node), "reactions") else {
        return;
    };

    for (ordinal, reaction) in container.children_named("reaction").enumerate() {
        let keyed = record
            .row()
            .with("reaction_id", Some(reaction_id(record.id, ordinal)));

        staging.push(
            REACTION_TABLE,
            fill_columns(keyed.clone(), Some(reaction), REACTION_COLUMNS),
        );

        for enzyme in reaction.find_all("enzymes/enzyme") {
            staging.push(
                REACTION_ENZYMES_TABLE,
                fill_columns(keyed.clone(), Some(enzyme), REACTION_ENZYME_COLUMNS),
            );
        }
    }
}

/// Member id: the `<id>` child, or an `id` attribute when the child is missing
fn interactant_id(member: &Node) -> Option<String> {
    value(Some(member), "id").or_else(|| value(Some(member), "@id"))
}

pub fn extract_interactants(group: &InteractantGroup, record: &Record<'_>, staging: &mut Staging) {
    let Some(container) = path::locate(Some(record.node), group.container) else {
        return;
    };

    let general_table = group.general_table();
    let actions_table = group.actions_table();

    for member in container.children_named(group.member) {
        // Members without an id are dropped along with everything nested in them.
        let Some(id) = interactant_id(member) else {
            continue;
        };
        let keyed = record.row().with("interactant_id", Some(id));

        staging.push(
            general_table.as_str(),
            fill_columns(keyed.clone(), Some(member), INTERACTANT_COLUMNS),
        );

        for action in member.find_all("actions/action") {
            staging.push(
                actions_table.as_str(),
                keyed
                    .clone()
                    .with("action", action.text().map(str::to_string)),
            );
        }

        for polypeptide in member.children_named("polypeptide") {
            extract_polypeptide(group, &keyed, polypeptide, staging);
        }
    }
}

/// One polypeptide and its sub-lists, keyed by the polypeptide's `id`
/// attribute. A polypeptide without one is skipped along with its sub-lists
/// rather than emitted under a null `polypeptide_id`.
fn extract_polypeptide(group: &InteractantGroup, parent: &Row, polypeptide: &Node, staging: &mut Staging) {
    let Some(id) = polypeptide.attribute("id") else {
        return;
    };
    let keyed = parent.clone().with("polypeptide_id", Some(id.to_string()));

    staging.push(
        group.polypeptide_table("general_information"),
        fill_columns(keyed.clone(), Some(polypeptide), POLYPEPTIDE_COLUMNS),
    );

    for list in POLYPEPTIDE_LISTS {
        let items = polypeptide.find_all(list.path);
        if items.is_empty() {
            continue;
        }
        let table = group.polypeptide_table(list.kind);
        for item in items {
            staging.push(
                table.as_str(),
                fill_columns(keyed.clone(), Some(item), list.columns),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melt::plan::TARGETS;
    use crate::melt::types::Tables;

    fn melt(body: &str, extract: impl Fn(&Record<'_>, &mut Staging)) -> Tables {
        let xml = format!(
            r#"<drug><drugbank-id primary="true">DB00003</drugbank-id>{body}</drug>"#
        );
        let node = Node::parse(xml.as_bytes()).unwrap();
        let record = Record::new(0, &node).unwrap();
        let mut staging = Staging::new();
        extract(&record, &mut staging);
        let mut tables = Tables::new();
        staging.commit(&mut tables);
        tables
    }

    #[test]
    fn test_reactions_synthesize_ordinal_ids() {
        let tables = melt(
            r#"<reactions>
                <reaction>
                    <sequence>1</sequence>
                    <left-element><drugbank-id>DB00003</drugbank-id><name>Dornase alfa</name></left-element>
                    <right-element><drugbank-id>DBMET001</drugbank-id><name>Metabolite</name></right-element>
                    <enzymes>
                        <enzyme><drugbank-id>BE0002433</drugbank-id><uniprot-id>P05177</uniprot-id></enzyme>
                        <enzyme><drugbank-id>BE0002638</drugbank-id><uniprot-id>P11712</uniprot-id></enzyme>
                    </enzymes>
                </reaction>
                <reaction><sequence>2</sequence></reaction>
            </reactions>"#,
            extract_reactions,
        );

        let reactions = tables.rows(REACTION_TABLE);
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0].get("reaction_id"), Some("DB00003_rxn_0"));
        assert_eq!(reactions[1].get("reaction_id"), Some("DB00003_rxn_1"));
        assert_eq!(reactions[0].get("right_element_name"), Some("Metabolite"));
        assert_eq!(reactions[1].get("left_element_name"), None);

        let enzymes = tables.rows(REACTION_ENZYMES_TABLE);
        assert_eq!(enzymes.len(), 2);
        assert!(enzymes.iter().all(|r| r.get("reaction_id") == Some("DB00003_rxn_0")));
        assert_eq!(enzymes[1].get("uniprot_id"), Some("P11712"));
    }

    #[test]
    fn test_pathway_members_keyed_by_smpdb_id() {
        let tables = melt(
            r#"<pathways><pathway>
                <smpdb-id>SMP0000278</smpdb-id>
                <name>Lepirudin Action Pathway</name>
                <category>drug_action</category>
                <drugs>
                    <drug><drugbank-id>DB00001</drugbank-id><name>Lepirudin</name></drug>
                    <drug><drugbank-id>DB01373</drugbank-id><name>Calcium</name></drug>
                </drugs>
                <enzymes><uniprot-id>P00734</uniprot-id></enzymes>
            </pathway></pathways>"#,
            extract_pathways,
        );

        assert_eq!(tables.rows(PATHWAY_TABLE)[0].get("category"), Some("drug_action"));
        let drugs = tables.rows(PATHWAY_DRUGS_TABLE);
        assert_eq!(drugs.len(), 2);
        assert_eq!(drugs[1].get("pathway_drug_id"), Some("DB01373"));
        assert!(drugs.iter().all(|r| r.get("smpdb_id") == Some("SMP0000278")));
        assert_eq!(tables.rows(PATHWAY_ENZYMES_TABLE)[0].get("uniprot_id"), Some("P00734"));
    }

    #[test]
    fn test_target_without_id_is_skipped_with_children() {
        let tables = melt(
            r#"<targets>
                <target>
                    <name>Orphan</name>
                    <actions><action>inhibitor</action></actions>
                    <polypeptide id="P00734"><name>Prothrombin</name></polypeptide>
                </target>
            </targets>"#,
            |record, staging| extract_interactants(&TARGETS, record, staging),
        );

        assert!(tables.is_empty());
    }

    #[test]
    fn test_polypeptide_rows_carry_full_key() {
        let tables = melt(
            r#"<targets><target position="1">
                <id>BE0000048</id>
                <name>Prothrombin</name>
                <organism>Humans</organism>
                <actions><action>inhibitor</action><action>binder</action></actions>
                <known-action>yes</known-action>
                <polypeptide id="P00734" source="Swiss-Prot">
                    <name>Prothrombin</name>
                    <gene-name>F2</gene-name>
                    <organism ncbi-taxonomy-id="9606">Humans</organism>
                    <external-identifiers>
                        <external-identifier><resource>HUGO Gene Nomenclature Committee (HGNC)</resource><identifier>HGNC:3535</identifier></external-identifier>
                    </external-identifiers>
                    <synonyms><synonym>3.4.21.5</synonym><synonym>Coagulation factor II</synonym></synonyms>
                    <pfams><pfam><identifier>PF00051</identifier><name>Kringle</name></pfam></pfams>
                    <go-classifiers><go-classifier><category>component</category><description>extracellular region</description></go-classifier></go-classifiers>
                </polypeptide>
                <polypeptide><name>No id</name></polypeptide>
            </target></targets>"#,
            |record, staging| extract_interactants(&TARGETS, record, staging),
        );

        let general = tables.rows("general_information_drugbank_cett_targets");
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].get("known_action"), Some("yes"));
        assert_eq!(tables.rows("actions_drugbank_cett_targets").len(), 2);

        let polypeptides = tables.rows("general_information_drugbank_cett_targets_polypeptides");
        assert_eq!(polypeptides.len(), 1);
        assert_eq!(polypeptides[0].get("organism_id"), Some("9606"));
        assert_eq!(polypeptides[0].get("organism_name"), Some("Humans"));

        for table in [
            "external_identity_drugbank_cett_targets_polypeptides",
            "synonyms_drugbank_cett_targets_polypeptides",
            "pfams_drugbank_cett_targets_polypeptides",
            "go_drugbank_cett_targets_polypeptides",
        ] {
            let rows = tables.rows(table);
            assert!(!rows.is_empty(), "{table}");
            for row in rows {
                assert_eq!(row.get("drugbank_id"), Some("DB00003"));
                assert_eq!(row.get("interactant_id"), Some("BE0000048"));
                assert_eq!(row.get("polypeptide_id"), Some("P00734"));
            }
        }
        assert_eq!(tables.rows("synonyms_drugbank_cett_targets_polypeptides").len(), 2);
    }

    #[test]
    fn test_reaction_ids_are_stable() {
        assert_eq!(reaction_id("DB00003", 0), "DB00003_rxn_0");
        assert_eq!(reaction_id("DB00003", 12), reaction_id("DB00003", 12));
    }
}
