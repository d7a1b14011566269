/// Quickstart example - melt a tiny DrugBank export and write the tables
use drugbank_melt::melt::{DrugBankMelter, MeltConfig, OutputFormat, TableWriter, Tables};

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<drugbank xmlns="http://www.drugbank.ca" version="5.1">
  <drug type="biotech" created="2005-06-13" updated="2020-06-12">
    <drugbank-id primary="true">DB00001</drugbank-id>
    <drugbank-id>BTD00024</drugbank-id>
    <name>Lepirudin</name>
    <state>liquid</state>
    <synonyms>
      <synonym language="english" coder="">Hirudin variant-1</synonym>
      <synonym language="english" coder="">Lepirudin recombinant</synonym>
    </synonyms>
    <targets>
      <target position="1">
        <id>BE0000048</id>
        <name>Prothrombin</name>
        <organism>Humans</organism>
        <actions><action>inhibitor</action></actions>
        <known-action>yes</known-action>
        <polypeptide id="P00734" source="Swiss-Prot">
          <name>Prothrombin</name>
          <gene-name>F2</gene-name>
          <organism ncbi-taxonomy-id="9606">Humans</organism>
        </polypeptide>
      </target>
    </targets>
  </drug>
  <drug type="small molecule">
    <drugbank-id primary="true">DB00006</drugbank-id>
    <name>Bivalirudin</name>
    <drug-interactions>
      <drug-interaction>
        <drugbank-id>DB00001</drugbank-id>
        <name>Lepirudin</name>
        <description>The risk of bleeding can be increased.</description>
      </drug-interaction>
    </drug-interactions>
  </drug>
</drugbank>"#;

fn main() -> anyhow::Result<()> {
    println!("=== DrugBank Melt Quick Start ===\n");

    // Step 1: Create a melter with the full rule catalog
    let melter = DrugBankMelter::new(MeltConfig::default());

    // Step 2: Stream the XML into row-sets
    let mut tables = Tables::new();
    let summary = melter.melt_reader(SAMPLE.as_bytes(), &mut tables)?;
    println!(
        "Melted {} of {} records into {} tables:\n",
        summary.melted,
        summary.records,
        tables.table_names().len()
    );

    // Step 3: Look at what we got
    for set in tables.iter() {
        println!("{} ({} rows)", set.name(), set.len());
        println!("  columns: {}", set.ordered_columns().join(", "));
    }

    // Step 4: Write to files
    let output_dir = std::env::temp_dir().join("drugbank_quickstart");
    println!("\nWriting CSVs to {}...", output_dir.display());
    let writer = TableWriter::new(&output_dir, OutputFormat::Csv)?;
    let written = writer.write_tables(&tables)?;

    println!("\n✓ Done! Created {} files:", written.len());
    for table in &written {
        println!("  • {}", table.path.display());
    }

    Ok(())
}
