//! Problems that did not stop a document from loading
//!
//! Unresolved classes, references and locations are tolerated by the loader
//! so that a document stays editable; the report lists them per object.

use serde::Serialize;

use crate::context::resolve_location;
use crate::document::Document;
use crate::expression::{parse_expression, Expression};
use crate::model::{ObjectId, ObjectKind};
use crate::nodes::{depth_first_order, reference_sites};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ErrorKind {
    UnresolvedClass(String),
    UnresolvedReference(String),
    UnresolvedLocation(String),
    UnresolvedResource(String),
    UnsupportedExpression(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub object: ObjectId,
    #[serde(flatten)]
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorReport {
    pub entries: Vec<ErrorEntry>,
}

impl ErrorReport {
    pub fn build(document: &Document) -> Self {
        let mut entries = Vec::new();
        let resources = &document.context().resources;

        for object in depth_first_order(document) {
            let unresolved_class = matches!(
                document.object(object).kind(),
                ObjectKind::Instance { declared_class: None, .. } | ObjectKind::Collection { declared_class: None, .. }
            );
            if unresolved_class {
                let tag = document.tag_name(object).unwrap_or_default().to_string();
                entries.push(ErrorEntry {
                    object,
                    kind: ErrorKind::UnresolvedClass(tag),
                });
            }

            for property in document.properties_of(object) {
                let node = document.property(property);
                let Some(text) = node.kind().text() else {
                    continue;
                };
                let kind = match parse_expression(&node.name().name, text) {
                    Expression::Location(path) => match resolve_location(document.location(), path) {
                        Some(url) if url.scheme() != "file" => None,
                        Some(url) => url
                            .to_file_path()
                            .ok()
                            .filter(|file| file.exists())
                            .map_or_else(|| Some(ErrorKind::UnresolvedLocation(path.to_string())), |_| None),
                        None => Some(ErrorKind::UnresolvedLocation(path.to_string())),
                    },
                    Expression::Resource(key) if resources.get(key).is_none() => {
                        Some(ErrorKind::UnresolvedResource(key.to_string()))
                    }
                    Expression::Binding(expression) => {
                        Some(ErrorKind::UnsupportedExpression(expression.to_string()))
                    }
                    _ => None,
                };
                if let Some(kind) = kind {
                    entries.push(ErrorEntry { object, kind });
                }
            }
        }

        if let Some(root) = document.root() {
            for site in reference_sites(document, root) {
                let Some(target) = site.target(document) else {
                    continue;
                };
                if document.search_with_fx_id(&target).is_some() {
                    continue;
                }
                let object = match site {
                    crate::nodes::ReferenceSite::Intrinsic(object) => Some(object),
                    crate::nodes::ReferenceSite::Expression(property) => document.property(property).owner(),
                };
                if let Some(object) = object {
                    entries.push(ErrorEntry {
                        object,
                        kind: ErrorKind::UnresolvedReference(target),
                    });
                }
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::load;

    #[test]
    fn test_report_lists_tolerated_problems() {
        let document = load(
            r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <Gizmo/>
    <Label text="%missing" labelFor="$nobody"/>
    <Label text="${model.name}" style="@style.css"/>
</VBox>"#,
        );
        let report = ErrorReport::build(&document);
        let kinds: Vec<&ErrorKind> = report.entries.iter().map(|entry| &entry.kind).collect();
        assert!(kinds.contains(&&ErrorKind::UnresolvedClass("Gizmo".into())));
        assert!(kinds.contains(&&ErrorKind::UnresolvedResource("missing".into())));
        assert!(kinds.contains(&&ErrorKind::UnresolvedReference("nobody".into())));
        assert!(kinds.contains(&&ErrorKind::UnsupportedExpression("${model.name}".into())));
        assert!(kinds.contains(&&ErrorKind::UnresolvedLocation("style.css".into())));
        assert_eq!(report.len(), 5);
    }

    #[test]
    fn test_report_serializes_with_kind_tag() {
        let entry = ErrorEntry {
            object: ObjectId(3),
            kind: ErrorKind::UnresolvedClass("Gizmo".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "unresolvedClass");
        assert_eq!(json["detail"], "Gizmo");
    }
}
