//! Lossless serializer for glue trees
//!
//! Writes every node exactly as it is held. An unedited tree produced by
//! [`crate::parse`] serializes back to its source byte for byte.

use crate::document::{GlueData, GlueDocument, GlueId};

pub struct GlueSerializer<'a> {
    document: &'a GlueDocument,
    output: String,
}

impl<'a> GlueSerializer<'a> {
    pub fn new(document: &'a GlueDocument) -> Self {
        Self {
            document,
            output: String::new(),
        }
    }

    pub fn serialize(mut self) -> String {
        for &id in self.document.top_level() {
            self.write_node(id);
        }
        self.output
    }

    /// Serialize a single subtree
    pub fn serialize_node(mut self, id: GlueId) -> String {
        self.write_node(id);
        self.output
    }

    fn write_node(&mut self, id: GlueId) {
        match self.document.node(id).data() {
            GlueData::Element(element) => {
                self.output.push('<');
                self.output.push_str(element.tag_name());
                for attribute in element.attributes() {
                    self.output.push_str(&attribute.leading);
                    self.output.push_str(&attribute.name);
                    self.output.push_str(&attribute.separator);
                    self.output.push(attribute.quote);
                    self.output.push_str(&attribute.raw_value);
                    self.output.push(attribute.quote);
                }
                self.output.push_str(&element.trailing);
                if element.is_self_closing() {
                    self.output.push_str("/>");
                    return;
                }
                self.output.push('>');
                for &child in element.children() {
                    self.write_node(child);
                }
                self.output.push_str("</");
                self.output.push_str(element.tag_name());
                self.output.push_str(&element.end_trailing);
                self.output.push('>');
            }
            GlueData::Characters(raw) => self.output.push_str(raw),
            GlueData::Comment(text) => {
                self.output.push_str("<!--");
                self.output.push_str(text);
                self.output.push_str("-->");
            }
            GlueData::Instruction(instruction) => {
                self.output.push_str("<?");
                self.output.push_str(&instruction.target);
                self.output.push_str(&instruction.data);
                self.output.push_str("?>");
            }
            GlueData::CData(text) => {
                self.output.push_str("<![CDATA[");
                self.output.push_str(text);
                self.output.push_str("]]>");
            }
            GlueData::Doctype(text) => {
                self.output.push_str("<!DOCTYPE");
                self.output.push_str(text);
                self.output.push('>');
            }
        }
    }
}

/// Serialize a whole document
pub fn serialize(document: &GlueDocument) -> String {
    GlueSerializer::new(document).serialize()
}

/// Serialize one subtree of a document
pub fn serialize_node(document: &GlueDocument, id: GlueId) -> String {
    GlueSerializer::new(document).serialize_node(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_new_nodes_serialize_canonically() {
        let mut doc = GlueDocument::new();
        let root = doc.create_element("VBox");
        doc.set_root(Some(root));
        let comment = doc.create_comment(" note ");
        doc.insert_before(root, comment, None);
        assert_eq!(serialize(&doc), "<VBox>\n    <!-- note -->\n</VBox>\n");
    }

    #[test]
    fn test_serialize_node() {
        let doc = parse("<A>\n    <B c='d'/>\n</A>").unwrap();
        let root = doc.root().unwrap();
        let b = doc.element_children(root).next().unwrap();
        assert_eq!(serialize_node(&doc, b), "<B c='d'/>");
    }
}
