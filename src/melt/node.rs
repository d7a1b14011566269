//! In-memory element tree for a single record.
//!
//! The stream driver only ever materializes one record's subtree at a time;
//! everything outside a record is skipped event by event.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::melt::error::Error;

/// An element with its local name, attributes, own text and children.
///
/// Namespace prefixes are dropped on both element and attribute names, so a
/// document with and without the `db:` prefix builds the same tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The element's own text; `None` when it has none (e.g. `<synonym/>`)
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Every node reached by following `path` (`a/b/c`, local names) from here
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Node> {
        let mut current = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |c| c.name == step))
                .collect();
        }
        current
    }

    /// Parse a complete (small) document into its root node
    pub fn parse(xml: &[u8]) -> Result<Node, Error> {
        let mut reader = Reader::from_reader(xml);

        let mut builder = TreeBuilder::default();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf);
            let finished = match event.map_err(|source| Error::Xml {
                position: reader.buffer_position() as u64,
                source,
            })? {
                Event::Start(ref e) => {
                    builder.open(e).map_err(|source| Error::Xml {
                        position: reader.buffer_position() as u64,
                        source,
                    })?;
                    None
                }
                Event::Empty(ref e) => builder.empty(e).map_err(|source| Error::Xml {
                    position: reader.buffer_position() as u64,
                    source,
                })?,
                Event::Text(ref e) => {
                    let text = e.unescape().map_err(|source| Error::Xml {
                        position: reader.buffer_position() as u64,
                        source,
                    })?;
                    builder.text(&text);
                    None
                }
                Event::CData(ref e) => {
                    builder.text(&String::from_utf8_lossy(e));
                    None
                }
                Event::End(_) => builder.close(),
                Event::Eof => {
                    return Err(match builder.depth() {
                        0 => Error::NoRoot,
                        depth => Error::Truncated { depth },
                    });
                }
                _ => None,
            };
            if let Some(root) = finished {
                return Ok(root);
            }
            buf.clear();
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let mut node = Node::new(String::from_utf8_lossy(start.local_name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }

    /// Append a raw chunk; chunks split by comments or CDATA join verbatim
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.text.as_mut() {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Trim the accumulated text once the element is complete
    fn finish_text(&mut self) {
        self.text = self
            .text
            .take()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
    }
}

/// Builds a tree from start/text/end events. `close` (or `empty` at the top
/// level) hands back the finished root.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    stack: Vec<Node>,
}

impl TreeBuilder {
    pub(crate) fn open(&mut self, start: &BytesStart<'_>) -> Result<(), quick_xml::Error> {
        self.stack.push(Node::from_start(start)?);
        Ok(())
    }

    pub(crate) fn empty(&mut self, start: &BytesStart<'_>) -> Result<Option<Node>, quick_xml::Error> {
        let node = Node::from_start(start)?;
        Ok(self.attach(node))
    }

    pub(crate) fn text(&mut self, text: &str) {
        if let Some(top) = self.stack.last_mut() {
            top.push_text(text);
        }
    }

    pub(crate) fn close(&mut self) -> Option<Node> {
        let node = self.stack.pop()?;
        self.attach(node)
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    fn attach(&mut self, mut node: Node) -> Option<Node> {
        node.finish_text();
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                None
            }
            None => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_tree() {
        let xml = br#"<drug type="biotech" xmlns="http://www.drugbank.ca">
            <drugbank-id primary="true">DB00001</drugbank-id>
            <name>Lepirudin</name>
            <synonyms>
                <synonym language="en">Hirudin variant-1</synonym>
                <synonym language="de"/>
            </synonyms>
        </drug>"#;

        let root = Node::parse(xml).unwrap();
        assert_eq!(root.name(), "drug");
        assert_eq!(root.attribute("type"), Some("biotech"));
        assert_eq!(root.attribute("xmlns"), None);
        assert_eq!(root.child("name").unwrap().text(), Some("Lepirudin"));

        let synonyms = root.find_all("synonyms/synonym");
        assert_eq!(synonyms.len(), 2);
        assert_eq!(synonyms[0].text(), Some("Hirudin variant-1"));
        assert_eq!(synonyms[1].text(), None);
        assert_eq!(synonyms[1].attribute("language"), Some("de"));
    }

    #[test]
    fn test_prefixes_are_dropped() {
        let xml = br#"<db:drug xmlns:db="http://www.drugbank.ca"><db:name db:lang="en">A &amp; B</db:name></db:drug>"#;
        let root = Node::parse(xml).unwrap();

        let name = root.child("name").unwrap();
        assert_eq!(name.text(), Some("A & B"));
        assert_eq!(name.attribute("lang"), Some("en"));
    }

    #[test]
    fn test_cdata_is_text() {
        let root = Node::parse(b"<d><description><![CDATA[x < y]]></description></d>").unwrap();
        assert_eq!(root.child("description").unwrap().text(), Some("x < y"));
    }

    #[test]
    fn test_text_split_by_comment_or_cdata() {
        let root = Node::parse(
            b"<d>\n  <description>Line one.<!-- note --> Line two.</description>\n  <state>solid <![CDATA[form]]></state>\n  <name>\n    padded\n  </name>\n</d>",
        )
        .unwrap();

        assert_eq!(root.child("description").unwrap().text(), Some("Line one. Line two."));
        assert_eq!(root.child("state").unwrap().text(), Some("solid form"));
        assert_eq!(root.child("name").unwrap().text(), Some("padded"));
        assert_eq!(root.text(), None);
    }

    #[test]
    fn test_empty_and_truncated_documents() {
        assert!(matches!(Node::parse(b""), Err(Error::NoRoot)));
        assert!(matches!(
            Node::parse(b"<drug><name>x</name>"),
            Err(Error::Truncated { depth: 1 }) | Err(Error::Xml { .. })
        ));
    }

    #[test]
    fn test_find_all_follows_every_branch() {
        let root = Node::new("pathway")
            .with_child(Node::new("drugs").with_child(Node::new("drug").with_text("a")))
            .with_child(Node::new("drugs").with_child(Node::new("drug").with_text("b")));

        let texts: Vec<_> = root.find_all("drugs/drug").iter().map(|n| n.text()).collect();
        assert_eq!(texts, vec![Some("a"), Some("b")]);
        assert!(root.find_all("enzymes/uniprot-id").is_empty());
    }
}
