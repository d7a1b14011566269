//! Field references: small path expressions resolving to one text or
//! attribute value inside a record.
//!
//! | reference              | resolves to                                   |
//! |------------------------|-----------------------------------------------|
//! | `.`                    | the node's own text                           |
//! | `@attr`                | an attribute of the node                      |
//! | `a/b`                  | text of the first `a/b` descendant            |
//! | `a/b/@attr`            | attribute of the first `a/b` descendant       |
//! | `a[@k="v"]/b`          | steps may carry one attribute predicate       |
//!
//! A `prefix:` on any step is ignored. Resolution never fails: anything that
//! does not match, including a malformed reference, is `None`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::melt::node::Node;

static STEP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z_][\w.-]*:)?([A-Za-z_][\w.-]*)(?:\[@(?:[A-Za-z_][\w.-]*:)?([A-Za-z_][\w.-]*)=(?:"([^"]*)"|'([^']*)')\])?$"#,
    )
    .unwrap()
});

static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?:[A-Za-z_][\w.-]*:)?([A-Za-z_][\w.-]*)$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step<'r> {
    name: &'r str,
    predicate: Option<(&'r str, &'r str)>,
}

impl Step<'_> {
    fn matches(&self, node: &Node) -> bool {
        node.name() == self.name
            && self
                .predicate
                .map_or(true, |(key, value)| node.attribute(key) == Some(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target<'r> {
    Text,
    Attribute(&'r str),
}

/// A parsed field reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef<'r> {
    steps: Vec<Step<'r>>,
    target: Target<'r>,
}

impl<'r> FieldRef<'r> {
    /// Parse a reference; `None` when it is malformed
    pub fn parse(reference: &'r str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if reference == "." {
            return Some(FieldRef {
                steps: Vec::new(),
                target: Target::Text,
            });
        }

        let mut segments: Vec<&str> = reference.split('/').collect();
        let target = match segments.last().copied() {
            Some(last) if last.starts_with('@') => {
                let captures = ATTRIBUTE_REGEX.captures(last)?;
                let name = captures.get(1)?.as_str();
                segments.pop();
                Target::Attribute(name)
            }
            _ => Target::Text,
        };

        let steps = segments
            .into_iter()
            .map(parse_step)
            .collect::<Option<Vec<_>>>()?;

        Some(FieldRef { steps, target })
    }

    /// The node this reference points into, before the text/attribute lookup
    pub fn locate<'n>(&self, node: &'n Node) -> Option<&'n Node> {
        descend(node, &self.steps)
    }

    pub fn resolve<'n>(&self, node: &'n Node) -> Option<&'n str> {
        let found = self.locate(node)?;
        match self.target {
            Target::Text => found.text(),
            Target::Attribute(name) => found.attribute(name),
        }
    }
}

fn parse_step(segment: &str) -> Option<Step<'_>> {
    let captures = STEP_REGEX.captures(segment)?;
    let name = captures.get(1)?.as_str();
    let predicate = match captures.get(2) {
        Some(key) => {
            let value = captures.get(3).or_else(|| captures.get(4))?;
            Some((key.as_str(), value.as_str()))
        }
        None => None,
    };
    Some(Step { name, predicate })
}

/// Depth-first: the first node that completes the whole path wins, even if
/// an earlier sibling matched the first steps but not the rest.
fn descend<'n>(node: &'n Node, steps: &[Step<'_>]) -> Option<&'n Node> {
    let Some((step, rest)) = steps.split_first() else {
        return Some(node);
    };
    node.children()
        .iter()
        .filter(|child| step.matches(child))
        .find_map(|child| descend(child, rest))
}

/// Resolve `reference` against `node`. An absent node or a malformed
/// reference both yield `None`.
pub fn resolve<'n>(node: Option<&'n Node>, reference: &str) -> Option<&'n str> {
    let node = node?;
    FieldRef::parse(reference)?.resolve(node)
}

/// Owned variant of [`resolve`], the shape row cells want
pub fn value(node: Option<&Node>, reference: &str) -> Option<String> {
    resolve(node, reference).map(str::to_string)
}

/// Node reached by a text reference (`a/b`), `None` if absent or malformed.
///
/// Present-but-empty containers come back as `Some`, distinct from absence.
pub fn locate<'n>(node: Option<&'n Node>, reference: &str) -> Option<&'n Node> {
    let node = node?;
    let field = FieldRef::parse(reference)?;
    if field.target != Target::Text {
        return None;
    }
    field.locate(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drug() -> Node {
        Node::parse(
            br#"<drug type="small molecule" created="2005-06-13">
                <drugbank-id>APRD00001</drugbank-id>
                <drugbank-id primary="true">DB00002</drugbank-id>
                <name>Cetuximab</name>
                <reactions>
                    <reaction><sequence>1</sequence></reaction>
                    <reaction>
                        <left-element><name>Cetuximab</name></left-element>
                    </reaction>
                </reactions>
                <targets>
                    <target>
                        <polypeptide id="P00533">
                            <organism ncbi-taxonomy-id="9606">Humans</organism>
                        </polypeptide>
                    </target>
                </targets>
            </drug>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_text_and_attributes() {
        let drug = drug();
        let node = Some(&drug);

        assert_eq!(resolve(node, "name"), Some("Cetuximab"));
        assert_eq!(resolve(node, "@type"), Some("small molecule"));
        assert_eq!(resolve(node, "targets/target/polypeptide/@id"), Some("P00533"));
        assert_eq!(
            resolve(node, "targets/target/polypeptide/organism/@ncbi-taxonomy-id"),
            Some("9606")
        );
        assert_eq!(resolve(drug.child("name"), "."), Some("Cetuximab"));
    }

    #[test]
    fn test_predicate_selects_primary_id() {
        let drug = drug();
        assert_eq!(resolve(Some(&drug), "drugbank-id"), Some("APRD00001"));
        assert_eq!(
            resolve(Some(&drug), r#"drugbank-id[@primary="true"]"#),
            Some("DB00002")
        );
        assert_eq!(
            resolve(Some(&drug), "drugbank-id[@primary='false']"),
            None
        );
    }

    #[test]
    fn test_namespace_prefix_is_ignored() {
        let drug = drug();
        assert_eq!(resolve(Some(&drug), "db:name"), Some("Cetuximab"));
        assert_eq!(
            resolve(Some(&drug), "db:targets/db:target/db:polypeptide/@id"),
            Some("P00533")
        );
    }

    #[test]
    fn test_first_complete_match_wins() {
        let drug = drug();
        // The first <reaction> has no <left-element>; the second one does.
        assert_eq!(
            resolve(Some(&drug), "reactions/reaction/left-element/name"),
            Some("Cetuximab")
        );
    }

    #[test]
    fn test_absence_totality() {
        let drug = drug();
        let references = [
            "",
            "   ",
            "@",
            "/",
            "a//b",
            "name/@",
            "@type/name",
            "name[@x=]",
            "name[@x=\"1\"",
            "name/@a/@b",
            "1bad",
            "missing",
            "targets/@missing",
            "@missing",
        ];
        for reference in references {
            assert_eq!(resolve(Some(&drug), reference), None, "reference {reference:?}");
            assert_eq!(resolve(None, reference), None);
        }
        assert_eq!(resolve(None, "name"), None);
    }

    #[test]
    fn test_locate_distinguishes_empty_from_absent() {
        let drug = Node::parse(b"<drug><classification/></drug>").unwrap();

        let found = locate(Some(&drug), "classification");
        assert!(found.is_some());
        assert!(found.unwrap().children().is_empty());
        assert!(locate(Some(&drug), "pathways").is_none());
        assert!(locate(Some(&drug), "classification/@id").is_none());
    }
}
