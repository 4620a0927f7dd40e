//! Serializes a document, first bringing its namespace declarations and
//! import block in line with the classes it uses.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalog::{package_of, simple_name};
use crate::document::{runtime_namespace, Document, FX_NAMESPACE, FX_NAMESPACE_PREFIX};
use crate::error::DomResult;
use crate::model::ObjectKind;
use crate::nodes::depth_first_order;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveOptions {
    /// Version written into the default namespace
    pub runtime_version: String,
    /// Collapse imports to `package.*`
    pub wildcard_imports: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            runtime_version: "21".to_string(),
            wildcard_imports: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Saver {
    options: SaveOptions,
}

impl Saver {
    pub fn new(options: SaveOptions) -> Self {
        Self { options }
    }

    #[instrument(skip_all)]
    pub fn fxml_text(&self, document: &mut Document) -> String {
        if document.root().is_some() {
            self.update_namespaces(document);
            self.update_imports(document);
        }
        document.glue_text()
    }

    fn update_namespaces(&self, document: &mut Document) {
        let Some(root) = document.root() else {
            return;
        };
        let wanted = [
            ("xmlns".to_string(), runtime_namespace(&self.options.runtime_version)),
            (FX_NAMESPACE_PREFIX.to_string(), FX_NAMESPACE.to_string()),
        ];
        for (name, value) in wanted {
            if document.fx_attribute(root, &name).as_deref() != Some(value.as_str()) {
                document.set_fx_attribute(root, &name, Some(&value));
            }
        }
    }

    /// Classes the markup names by simple name, qualified
    fn required_imports(&self, document: &Document) -> BTreeSet<String> {
        let imports = document.imports();
        let catalog = document.catalog();
        let mut classes = BTreeSet::new();

        for object in depth_first_order(document) {
            if document.is_literal_text(object) {
                continue;
            }
            if let (Some(declared), Some(tag)) = (document.declared_class(object), document.tag_name(object)) {
                let named_simply = match document.object(object).kind() {
                    ObjectKind::Instance { fx_root: true, .. } => document
                        .fx_attribute(object, "type")
                        .map(|declared_type| !declared_type.contains('.'))
                        .unwrap_or(false),
                    _ => !tag.contains('.') && !tag.contains(':'),
                };
                if named_simply {
                    classes.insert(declared.to_string());
                }
            }
            for property in document.properties_of(object) {
                let Some(residence) = &document.property(property).name().residence_class else {
                    continue;
                };
                if residence.contains('.') {
                    continue;
                }
                if let Some(qualified) = imports.resolve(residence, catalog) {
                    classes.insert(qualified);
                }
            }
        }

        classes.retain(|class| package_of(class) != "java.lang" && !package_of(class).is_empty());
        if self.options.wildcard_imports {
            classes = classes
                .iter()
                .map(|class| format!("{}.*", package_of(class)))
                .collect();
        }
        classes
    }

    fn update_imports(&self, document: &mut Document) {
        let mut wanted = self.required_imports(document);
        let unresolved: BTreeSet<String> = document
            .unresolved_classes()
            .iter()
            .map(|tag| simple_name(tag).to_string())
            .collect();

        let current = document.glue().imports();
        for (_, entry) in &current {
            let serves_unresolved = match entry.strip_suffix(".*") {
                Some(_) => !unresolved.is_empty(),
                None => unresolved.contains(simple_name(entry)),
            };
            if serves_unresolved {
                wanted.insert(entry.clone());
            }
        }

        let existing: BTreeSet<String> = current.iter().map(|(_, entry)| entry.clone()).collect();
        if existing == wanted {
            return;
        }
        debug!(before = existing.len(), after = wanted.len(), "rewriting import block");
        self.replace_import_block(document, &current, &wanted);
    }

    fn replace_import_block(
        &self,
        document: &mut Document,
        current: &[(fxom_glue::GlueId, String)],
        wanted: &BTreeSet<String>,
    ) {
        let glue = document.glue_mut();
        let top_level = glue.top_level().to_vec();
        let position = match current.first() {
            Some((first, _)) => top_level.iter().position(|id| id == first),
            None => glue.root().and_then(|root| top_level.iter().position(|&id| id == root)),
        }
        .unwrap_or(top_level.len());

        // Separators between old imports go with them; the one after the
        // last import stays.
        for (index, (import, _)) in current.iter().enumerate() {
            glue.remove_top_level(*import);
            if index + 1 == current.len() {
                continue;
            }
            let after = top_level
                .iter()
                .position(|id| id == import)
                .and_then(|i| top_level.get(i + 1))
                .copied();
            if let Some(separator) = after.filter(|&id| glue.node(id).is_whitespace()) {
                glue.remove_top_level(separator);
            }
        }

        let mut index = position;
        for (n, entry) in wanted.iter().enumerate() {
            if n > 0 {
                let newline = glue.create_characters("\n");
                glue.insert_top_level(index, newline);
                index += 1;
            }
            let instruction = glue.create_instruction("import", entry);
            glue.insert_top_level(index, instruction);
            index += 1;
        }
        if current.is_empty() && !wanted.is_empty() {
            let separator = glue.create_characters("\n\n");
            glue.insert_top_level(index, separator);
        }
    }
}

impl Document {
    pub fn fxml_text(&mut self, options: &SaveOptions) -> String {
        Saver::new(options.clone()).fxml_text(self)
    }

    pub fn save(&mut self, path: &Path, options: &SaveOptions) -> DomResult<()> {
        let text = self.fxml_text(options);
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::load;

    #[test]
    fn test_namespaces_and_imports_are_added() {
        let mut document = load("<?import javafx.scene.layout.*?>\n<VBox>\n    <HBox/>\n</VBox>");
        let root = document.root().unwrap();
        let button = document.new_instance("javafx.scene.control.Button");
        let children = document
            .property_named(root, &crate::model::PropertyName::new("children"))
            .unwrap();
        document.add_to_parent_property(button, children, None);

        let text = document.fxml_text(&SaveOptions::default());
        assert_eq!(
            text,
            "<?import javafx.scene.control.Button?>\n<?import javafx.scene.layout.HBox?>\n<?import javafx.scene.layout.VBox?>\n<VBox xmlns=\"http://javafx.com/javafx/21\" xmlns:fx=\"http://javafx.com/fxml/1\">\n    <HBox/>\n    <Button/>\n</VBox>"
        );
    }

    #[test]
    fn test_matching_import_block_is_kept_verbatim() {
        let source = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\n<?import javafx.scene.control.Label?>\n<?import javafx.scene.layout.VBox?>\n\n<VBox xmlns=\"http://javafx.com/javafx/21\" xmlns:fx=\"http://javafx.com/fxml/1\">\n    <Label text=\"A\"/>\n</VBox>\n";
        let mut document = load(source);
        assert_eq!(document.fxml_text(&SaveOptions::default()), source);
    }

    #[test]
    fn test_wildcard_imports_keep_header() {
        let mut document = load(
            "<?xml version=\"1.0\"?>\n\n<?import javafx.scene.control.Label?>\n<?import javafx.scene.layout.VBox?>\n\n<VBox>\n    <Label/>\n</VBox>\n",
        );
        let options = SaveOptions {
            wildcard_imports: true,
            ..Default::default()
        };
        let text = document.fxml_text(&options);
        assert!(text.starts_with(
            "<?xml version=\"1.0\"?>\n\n<?import javafx.scene.control.*?>\n<?import javafx.scene.layout.*?>\n\n<VBox "
        ));
    }

    #[test]
    fn test_imports_for_unresolved_tags_survive() {
        let mut document = load("<?import com.acme.Gizmo?>\n<?import javafx.scene.layout.VBox?>\n<VBox>\n    <Gizmo/>\n</VBox>");
        let text = document.fxml_text(&SaveOptions::default());
        assert!(text.contains("<?import com.acme.Gizmo?>"));
        assert!(text.contains("<?import javafx.scene.layout.VBox?>"));
    }

    #[test]
    fn test_java_lang_is_never_imported() {
        let mut document = load("<?import javafx.scene.control.Label?>\n<Label>\n    <text>\n        <String fx:value=\"Hi\"/>\n    </text>\n</Label>");
        let text = document.fxml_text(&SaveOptions::default());
        assert!(!text.contains("java.lang"));
    }
}
