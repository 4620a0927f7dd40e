//! Evaluates the object model into live values.
//!
//! Objects are instantiated in document order. `$id` values that point
//! forward are patched once the whole tree is built; an `fx:reference` that
//! points forward stays absent.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use url::Url;

use crate::catalog::{ClassCatalog, ValueType};
use crate::context::{placeholder_url, resolve_location};
use crate::document::Document;
use crate::expression::{parse_expression, Expression};
use crate::loader::{LoadOptions, Loader};
use crate::model::{IntrinsicKind, ObjectId, ObjectKind, PropertyId, PropertyKind, PropertyName, SceneGraphObject};
use crate::runtime::{LiveObject, LiveValue};

/// Evaluate the tree below the root and store the results as loaded scene
/// graph objects.
pub(crate) fn evaluate(document: &mut Document, include_stack: &[Url]) {
    let values = {
        let mut evaluator = Evaluator::new(document, include_stack);
        if let Some(root) = document.root() {
            evaluator.object(root);
        }
        evaluator.patch_references();
        evaluator.values
    };
    for (object, value) in values {
        document.object_mut(object).scene_graph = SceneGraphObject::loaded(value);
    }
}

struct Evaluator<'a> {
    document: &'a Document,
    catalog: &'a dyn ClassCatalog,
    include_stack: &'a [Url],
    ids: BTreeMap<String, LiveValue>,
    values: BTreeMap<ObjectId, Option<LiveValue>>,
    pending: Vec<(LiveObject, String, String)>,
}

impl<'a> Evaluator<'a> {
    fn new(document: &'a Document, include_stack: &'a [Url]) -> Self {
        Self {
            document,
            catalog: document.catalog(),
            include_stack,
            ids: BTreeMap::new(),
            values: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    fn object(&mut self, id: ObjectId) -> Option<LiveValue> {
        let document = self.document;
        let value = match &document.object(id).kind {
            ObjectKind::Instance { declared_class, .. } => self.instance(id, declared_class.as_deref()),
            ObjectKind::Collection { declared_class, items } => {
                let live = declared_class.as_deref().map(LiveObject::new);
                for &item in items {
                    let value = self.object(item);
                    if let (Some(live), Some(value)) = (&live, value) {
                        live.push_item(value);
                    }
                }
                live.map(LiveValue::Object)
            }
            ObjectKind::Intrinsic { kind, .. } => self.intrinsic(id, *kind),
            ObjectKind::Define { items } => {
                for &item in items {
                    self.object(item);
                }
                None
            }
            ObjectKind::Comment | ObjectKind::Script => None,
        };

        if let (Some(fx_id), Some(value)) = (document.fx_id(id), &value) {
            self.ids.entry(fx_id).or_insert_with(|| value.clone());
        }
        self.values.insert(id, value.clone());
        value
    }

    fn instance(&mut self, id: ObjectId, declared_class: Option<&str>) -> Option<LiveValue> {
        let document = self.document;
        if document.is_literal_text(id) {
            let text = document.glue().text(document.object(id).glue()).unwrap_or_default();
            return Some(LiveValue::String(text));
        }

        let Some(class) = declared_class else {
            // Unresolved: children still get their own live values.
            for property in document.properties_of(id) {
                self.property_values(property);
            }
            return None;
        };

        if let Some(literal) = document.fx_value(id) {
            let value_type = self.catalog.literal_type(class).unwrap_or_default();
            return Some(coerce(value_type, &literal));
        }
        if let Some(constant) = document.fx_constant(id) {
            let value = self.catalog.constant(class, &constant).map(LiveValue::from_json);
            if value.is_none() {
                warn!(class, constant = %constant, "unknown constant");
            }
            return value;
        }

        let live = LiveObject::new(class);
        if let Some(factory) = document.fx_factory(id) {
            live.set_state("factory", LiveValue::String(factory));
        }
        for property in document.properties_of(id) {
            let name = document.property(property).name().clone();
            if let Some(value) = self.property(&live, Some(class), &name, property) {
                live.set(name.to_string(), value);
            }
        }
        Some(LiveValue::Object(live))
    }

    fn intrinsic(&mut self, id: ObjectId, kind: IntrinsicKind) -> Option<LiveValue> {
        for property in self.document.properties_of(id) {
            self.property_values(property);
        }
        match kind {
            IntrinsicKind::Reference => {
                let source = self.document.intrinsic_source(id)?;
                self.ids.get(&source).cloned()
            }
            IntrinsicKind::Copy => {
                let source = self.document.intrinsic_source(id)?;
                let original = self.ids.get(&source)?.as_object()?;
                Some(LiveValue::Object(original.shallow_copy()))
            }
            IntrinsicKind::Include => self.include(id),
        }
    }

    fn include(&mut self, id: ObjectId) -> Option<LiveValue> {
        let document = self.document;
        let source = document.intrinsic_source(id)?;
        let Some(url) = resolve_location(document.location(), &source) else {
            warn!(source = %source, "include cannot be located");
            return None;
        };
        if self.include_stack.contains(&url) || document.location() == Some(&url) {
            warn!(url = %url, "include cycle");
            return None;
        }
        let path = url.to_file_path().ok()?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) => {
                warn!(path = %path.display(), %error, "include not found");
                return None;
            }
        };

        let mut stack = self.include_stack.to_vec();
        stack.extend(document.location().cloned());
        let loader = Loader::new(document.context().clone(), LoadOptions::default()).with_include_stack(stack);
        match loader.load(&text, Some(url)) {
            Ok(included) => {
                debug!(path = %path.display(), "include loaded");
                included.scene_graph_root()
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "include failed to load");
                None
            }
        }
    }

    /// Evaluate the objects held by a property without using its value
    fn property_values(&mut self, property: PropertyId) {
        for &value in self.document.property(property).values() {
            self.object(value);
        }
    }

    fn property(
        &mut self,
        owner: &LiveObject,
        owner_class: Option<&str>,
        name: &PropertyName,
        property: PropertyId,
    ) -> Option<LiveValue> {
        let document = self.document;
        let descriptor = self.descriptor(owner_class, name);
        let value_type = descriptor.map(|(value_type, _)| value_type).unwrap_or_default();
        let weak = descriptor.map(|(_, weak)| weak).unwrap_or(false)
            || document.context().extensions.weak_properties.contains(&name.name);

        match &document.property(property).kind {
            PropertyKind::Text {
                value,
                values,
                placeholder,
            } => {
                for &child in values {
                    self.object(child);
                }
                if *placeholder {
                    return None;
                }
                self.text_value(owner, name, value, value_type)
            }
            PropertyKind::Complex { values } => {
                let mut live = Vec::new();
                for &child in values {
                    let value = self.object(child);
                    if document.object(child).kind().is_virtual() {
                        continue;
                    }
                    live.extend(value);
                }
                let value = if value_type == ValueType::List || live.len() > 1 {
                    LiveValue::List(live)
                } else {
                    live.into_iter().next()?
                };
                Some(if weak { value.downgrade() } else { value })
            }
        }
    }

    fn text_value(
        &mut self,
        owner: &LiveObject,
        name: &PropertyName,
        text: &str,
        value_type: ValueType,
    ) -> Option<LiveValue> {
        match parse_expression(&name.name, text) {
            Expression::Literal(literal) => Some(coerce(value_type, literal)),
            Expression::Escaped(literal) => Some(LiveValue::String(literal.to_string())),
            Expression::Reference(target) => match self.ids.get(target) {
                Some(value) => Some(value.downgrade()),
                None => {
                    self.pending
                        .push((owner.clone(), name.to_string(), target.to_string()));
                    None
                }
            },
            Expression::Binding(_) => Some(LiveValue::Null),
            Expression::Location(path) => {
                let url = resolve_location(self.document.location(), path).unwrap_or_else(placeholder_url);
                Some(LiveValue::String(url.to_string()))
            }
            Expression::Resource(key) => {
                let resources = &self.document.context().resources;
                Some(LiveValue::String(
                    resources.get(key).map(String::from).unwrap_or_else(|| text.to_string()),
                ))
            }
            Expression::Handler(_) => Some(LiveValue::String(text.to_string())),
        }
    }

    fn descriptor(&self, owner_class: Option<&str>, name: &PropertyName) -> Option<(ValueType, bool)> {
        let descriptor = match &name.residence_class {
            Some(residence) => {
                let residence = self.document.imports().resolve(residence, self.catalog)?;
                self.catalog.static_property(&residence, &name.name)
            }
            None => self.catalog.property(owner_class?, &name.name),
        }?;
        Some((descriptor.value_type, descriptor.weak))
    }

    fn patch_references(&mut self) {
        for (owner, name, target) in std::mem::take(&mut self.pending) {
            match self.ids.get(&target) {
                Some(value) => owner.set(name, value.downgrade()),
                None => debug!(target = %target, "unresolved reference"),
            }
        }
    }
}

/// Convert literal text to the property's value type; text that does not
/// parse stays a string.
pub fn coerce(value_type: ValueType, text: &str) -> LiveValue {
    match value_type {
        ValueType::Boolean => match text.trim() {
            "true" => LiveValue::Boolean(true),
            "false" => LiveValue::Boolean(false),
            _ => LiveValue::String(text.to_string()),
        },
        ValueType::Integer => text
            .trim()
            .parse::<i64>()
            .map(LiveValue::Integer)
            .unwrap_or_else(|_| LiveValue::String(text.to_string())),
        ValueType::Double => text
            .trim()
            .parse::<f64>()
            .map(LiveValue::Double)
            .unwrap_or_else(|_| LiveValue::String(text.to_string())),
        ValueType::String | ValueType::Object | ValueType::List | ValueType::Map => {
            LiveValue::String(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::load;

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(ValueType::Boolean, "true"), LiveValue::Boolean(true));
        assert_eq!(coerce(ValueType::Integer, " 3 "), LiveValue::Integer(3));
        assert_eq!(coerce(ValueType::Double, "1.5"), LiveValue::Double(1.5));
        assert_eq!(coerce(ValueType::Integer, "x"), LiveValue::String("x".into()));
    }

    #[test]
    fn test_typed_properties() {
        let document = load(
            r#"<?import javafx.scene.control.*?>
<Button text="OK" disable="true" layoutX="12.5"/>"#,
        );
        let live = document.scene_graph_root().unwrap().as_object().unwrap();
        assert_eq!(live.class_name(), "javafx.scene.control.Button");
        assert_eq!(live.get("text"), Some(LiveValue::String("OK".into())));
        assert_eq!(live.get("disable"), Some(LiveValue::Boolean(true)));
        assert_eq!(live.get("layoutX"), Some(LiveValue::Double(12.5)));
    }

    #[test]
    fn test_forward_expression_reference_is_patched() {
        let document = load(
            r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <Label labelFor="$field"/>
    <TextField fx:id="field"/>
</VBox>"#,
        );
        let field = document.search_with_fx_id("field").unwrap();
        let field_live = document.scene_graph_object(field).unwrap();
        let root = document.scene_graph_root().unwrap().as_object().unwrap();
        let children = match root.get("children") {
            Some(LiveValue::List(children)) => children,
            other => panic!("unexpected children {:?}", other),
        };
        let label = children[0].as_object().unwrap();
        assert!(label.get("labelFor").unwrap().same_object(&field_live));
    }

    #[test]
    fn test_reference_and_copy_intrinsics() {
        let document = load(
            r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <fx:define>
        <Tooltip fx:id="tip" text="Hint"/>
    </fx:define>
    <Button>
        <tooltip><fx:reference source="tip"/></tooltip>
    </Button>
    <Label>
        <tooltip><fx:copy source="tip"/></tooltip>
    </Label>
</VBox>"#,
        );
        let tip = document.scene_graph_object(document.search_with_fx_id("tip").unwrap()).unwrap();
        let root = document.scene_graph_root().unwrap().as_object().unwrap();
        let Some(LiveValue::List(children)) = root.get("children") else {
            panic!("children expected");
        };
        let button = children[0].as_object().unwrap();
        let label = children[1].as_object().unwrap();
        assert!(button.get("tooltip").unwrap().same_object(&tip));
        let copied = label.get("tooltip").unwrap();
        assert!(!copied.same_object(&tip));
        assert_eq!(copied.as_object().unwrap().get("text"), Some(LiveValue::String("Hint".into())));
    }

    #[test]
    fn test_unresolved_class_has_no_live_object() {
        let document = load("<?import javafx.scene.layout.*?>\n<VBox>\n    <Gizmo/>\n</VBox>");
        let root = document.root().unwrap();
        let gizmo = document.object_children(root)[0];
        assert!(document.scene_graph_object(gizmo).is_none());
        assert!(document.scene_graph_root().is_some());
    }
}
