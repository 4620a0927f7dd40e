//! # Mutation Primitives
//!
//! Node construction and the structural operations an editing layer builds
//! on. Every operation keeps the glue tree mirrored with the object model:
//!
//! - an object is detached from its previous parent before it is attached,
//! - its glue node moves with it (indentation is maintained by the glue layer),
//! - root-only markup (`xmlns*`, `fx:controller`, `fx:root`) is reset when an
//!   object stops being the root.
//!
//! Misuse (attaching the root to a property, adding objects to a text
//! property, creating a cycle) is a programming error and panics.

use fxom_glue::GlueId;

use crate::catalog::simple_name;
use crate::document::{Document, FX_NAMESPACE, FX_NAMESPACE_PREFIX};
use crate::error::{DomError, DomResult};
use crate::model::{
    IntrinsicKind, ObjectId, ObjectKind, ParentLink, PropertyForm, PropertyId, PropertyKind,
    PropertyName,
};

pub(crate) const LITERAL_TEXT_CLASS: &str = "java.lang.String";

impl Document {
    // ----- construction -----

    /// New unparented instance. `class` may be simple or fully qualified;
    /// an import is added when the class is known but not in scope.
    pub fn new_instance(&mut self, class: &str) -> ObjectId {
        let (tag, declared) = self.class_tag(class);
        let glue = self.glue.create_element(&tag);
        let collection = declared
            .as_deref()
            .map(|declared| self.catalog().is_collection(declared))
            .unwrap_or(false);
        let kind = if collection {
            ObjectKind::Collection {
                declared_class: declared,
                items: Vec::new(),
            }
        } else {
            ObjectKind::Instance {
                declared_class: declared,
                properties: Default::default(),
                fx_root: false,
            }
        };
        self.push_object(glue, kind)
    }

    /// New unparented collection, whatever the catalog says about `class`
    pub fn new_collection(&mut self, class: &str) -> ObjectId {
        let (tag, declared) = self.class_tag(class);
        let glue = self.glue.create_element(&tag);
        self.push_object(
            glue,
            ObjectKind::Collection {
                declared_class: declared,
                items: Vec::new(),
            },
        )
    }

    pub fn new_intrinsic(&mut self, kind: IntrinsicKind, source: &str) -> ObjectId {
        let glue = self.glue.create_element(kind.tag_name());
        if let Some(element) = self.glue.element_mut(glue) {
            element.set_attribute("source", source);
        }
        self.push_object(
            glue,
            ObjectKind::Intrinsic {
                kind,
                properties: Default::default(),
            },
        )
    }

    pub fn new_define(&mut self) -> ObjectId {
        let glue = self.glue.create_element("fx:define");
        self.push_object(glue, ObjectKind::Define { items: Vec::new() })
    }

    pub fn new_comment(&mut self, text: &str) -> ObjectId {
        let glue = self.glue.create_comment(text);
        self.push_object(glue, ObjectKind::Comment)
    }

    pub fn new_script(&mut self, source: Option<&str>, content: Option<&str>) -> ObjectId {
        let glue = self.glue.create_element("fx:script");
        if let Some(source) = source {
            if let Some(element) = self.glue.element_mut(glue) {
                element.set_attribute("source", source);
            }
        }
        if let Some(content) = content {
            self.glue.set_content_text(glue, content);
        }
        self.push_object(glue, ObjectKind::Script)
    }

    /// New detached text property, written as an attribute once added
    pub fn new_property_text(&mut self, name: PropertyName, value: &str) -> PropertyId {
        self.push_property(
            name,
            PropertyForm::Attribute,
            PropertyKind::Text {
                value: value.to_string(),
                values: Vec::new(),
                placeholder: false,
            },
        )
    }

    /// New detached complex property with its `<name>` element
    pub fn new_property_complex(&mut self, name: PropertyName) -> PropertyId {
        let glue = self.glue.create_element(&name.to_string());
        self.push_property(
            name,
            PropertyForm::Element(glue),
            PropertyKind::Complex { values: Vec::new() },
        )
    }

    fn class_tag(&mut self, class: &str) -> (String, Option<String>) {
        let catalog = self.context().catalog.clone();
        if class.contains('.') {
            if catalog.class(class).is_some() {
                self.ensure_import(class);
                return (simple_name(class).to_string(), Some(class.to_string()));
            }
            self.unresolved_classes.insert(class.to_string());
            return (class.to_string(), None);
        }
        match self.imports().resolve(class, catalog.as_ref()) {
            Some(declared) => (class.to_string(), Some(declared)),
            None => {
                self.unresolved_classes.insert(class.to_string());
                (class.to_string(), None)
            }
        }
    }

    /// Add `<?import qualified?>` unless the class is already in scope
    pub fn ensure_import(&mut self, qualified: &str) {
        if self.imports().covers(qualified) {
            return;
        }
        let imports = self.glue.imports();
        let top_level = self.glue.top_level().to_vec();
        let instruction = self.glue.create_instruction("import", qualified);
        let newline = self.glue.create_characters("\n");
        match imports.last() {
            Some((last, _)) => {
                let position = top_level.iter().position(|id| id == last).unwrap_or(0) + 1;
                self.glue.insert_top_level(position, newline);
                self.glue.insert_top_level(position + 1, instruction);
            }
            None => {
                let position = self
                    .glue
                    .root()
                    .and_then(|root| top_level.iter().position(|&id| id == root))
                    .unwrap_or(top_level.len());
                self.glue.insert_top_level(position, instruction);
                self.glue.insert_top_level(position + 1, newline);
            }
        }
    }

    // ----- structure -----

    /// Attach `object` as value `index` of `property` (appended when `None`).
    /// An object that already has a parent is moved; `index` then counts the
    /// values left after it was taken out. The property it leaves is dropped
    /// once empty, unless it is `property` itself.
    pub fn add_to_parent_property(&mut self, object: ObjectId, property: PropertyId, index: Option<usize>) {
        assert_ne!(Some(object), self.root, "the root object cannot become a property value");
        assert!(
            !self.property(property).kind.is_text(),
            "property '{}' holds text, not objects",
            self.property(property).name
        );
        if let Some(owner) = self.property(property).owner {
            assert!(
                owner != object && !self.is_descendant_of(owner, object),
                "adding {:?} below itself",
                object
            );
        }

        if let Some(previous) = self.detach_value(object) {
            if previous != property {
                self.drop_if_empty(previous);
            }
        }
        if self.property(property).form == PropertyForm::Implicit
            && matches!(self.object(object).kind, ObjectKind::Comment)
        {
            self.convert_to_element_form(property);
        }

        let values = self.property(property).values().to_vec();
        let index = index.unwrap_or(values.len());
        assert!(index <= values.len(), "index {} out of bounds", index);

        let object_glue = self.object(object).glue;
        let anchor = values.get(index).map(|&value| self.object(value).glue);
        match self.property(property).form {
            PropertyForm::Element(property_glue) => {
                self.glue.insert_before(property_glue, object_glue, anchor);
            }
            PropertyForm::Implicit => {
                let owner = self
                    .property(property)
                    .owner
                    .expect("implicit property without owner");
                let owner_glue = self.object(owner).glue;
                match (anchor, values.last()) {
                    (Some(anchor), _) => self.glue.insert_before(owner_glue, object_glue, Some(anchor)),
                    (None, Some(&last)) => {
                        let last_glue = self.object(last).glue;
                        self.glue.insert_after(owner_glue, object_glue, last_glue);
                    }
                    (None, None) => self.glue.insert_before(owner_glue, object_glue, None),
                }
            }
            PropertyForm::Attribute => unreachable!("complex properties are never attributes"),
        }

        self.property_mut(property).kind.values_mut().insert(index, object);
        self.object_mut(object).parent = ParentLink::Property(property);
        self.invalidate();
    }

    /// Attach `object` as item `index` of a collection or define block
    pub fn add_to_parent_collection(&mut self, object: ObjectId, collection: ObjectId, index: Option<usize>) {
        assert_ne!(Some(object), self.root, "the root object cannot become a collection item");
        assert!(
            collection != object && !self.is_descendant_of(collection, object),
            "adding {:?} below itself",
            object
        );
        assert!(
            self.object(collection).kind.items().is_some(),
            "{:?} is not a collection",
            collection
        );

        if let Some(previous) = self.detach_value(object) {
            self.drop_if_empty(previous);
        }

        let items = self.object(collection).kind.items().unwrap_or_default().to_vec();
        let index = index.unwrap_or(items.len());
        assert!(index <= items.len(), "index {} out of bounds", index);

        let object_glue = self.object(object).glue;
        let collection_glue = self.object(collection).glue;
        let anchor = items.get(index).map(|&item| self.object(item).glue);
        self.glue.insert_before(collection_glue, object_glue, anchor);

        if let Some(items) = self.object_mut(collection).kind.items_mut() {
            items.insert(index, object);
        }
        self.object_mut(object).parent = ParentLink::Collection(collection);
        self.invalidate();
    }

    /// Detach `object` from its property. A complex property left without
    /// values is removed from its owner.
    pub fn remove_from_parent_property(&mut self, object: ObjectId) {
        let ParentLink::Property(property) = self.object(object).parent else {
            panic!("{:?} is not a property value", object);
        };
        self.detach_value(object);
        self.drop_if_empty(property);
    }

    /// Remove a complex property that no longer holds any value
    fn drop_if_empty(&mut self, property: PropertyId) {
        let node = self.property(property);
        if !node.kind.is_text() && node.values().is_empty() && node.owner.is_some() {
            self.remove_property(property);
        }
    }

    /// Unlink `object` from its parent property or collection, glue included.
    /// The parent keeps its slot even when it ends up empty, so a move can
    /// reinsert into it. Returns the property the object left, if any.
    fn detach_value(&mut self, object: ObjectId) -> Option<PropertyId> {
        let glue = self.object(object).glue;
        let previous = match self.object(object).parent {
            ParentLink::None => return None,
            ParentLink::Property(property) => {
                self.glue.detach(glue);
                self.property_mut(property)
                    .kind
                    .values_mut()
                    .retain(|&value| value != object);
                Some(property)
            }
            ParentLink::Collection(collection) => {
                self.glue.detach(glue);
                if let Some(items) = self.object_mut(collection).kind.items_mut() {
                    items.retain(|&item| item != object);
                }
                None
            }
        };
        self.object_mut(object).parent = ParentLink::None;
        self.invalidate();
        previous
    }

    pub fn remove_from_parent_collection(&mut self, object: ObjectId) {
        assert!(
            matches!(self.object(object).parent, ParentLink::Collection(_)),
            "{:?} is not a collection item",
            object
        );
        self.detach_value(object);
    }

    /// Detach `object` from whatever holds it. No-op for unparented objects.
    pub fn remove_from_parent(&mut self, object: ObjectId) {
        match self.object(object).parent {
            ParentLink::None => {}
            ParentLink::Property(_) => self.remove_from_parent_property(object),
            ParentLink::Collection(_) => self.remove_from_parent_collection(object),
        }
    }

    /// Put `replacement` in the slot `object` occupies. `object` ends up
    /// unparented; an emptied property is never dropped on the way.
    pub fn replace_object(&mut self, object: ObjectId, replacement: ObjectId) {
        assert_ne!(object, replacement, "replacing {:?} with itself", object);
        assert!(
            !self.is_descendant_of(object, replacement),
            "{:?} cannot take the place of its own descendant",
            replacement
        );
        self.detach_value(replacement);
        if self.root == Some(object) {
            self.set_root(Some(replacement));
            return;
        }

        let old_glue = self.object(object).glue;
        let new_glue = self.object(replacement).glue;
        if let Some(glue_parent) = self.glue.parent(old_glue) {
            self.glue.insert_before(glue_parent, new_glue, Some(old_glue));
            self.glue.detach(old_glue);
        }

        let parent = self.object(object).parent;
        match parent {
            ParentLink::Property(property) => {
                for value in self.property_mut(property).kind.values_mut() {
                    if *value == object {
                        *value = replacement;
                    }
                }
            }
            ParentLink::Collection(collection) => {
                if let Some(items) = self.object_mut(collection).kind.items_mut() {
                    for item in items.iter_mut() {
                        if *item == object {
                            *item = replacement;
                        }
                    }
                }
            }
            ParentLink::None => {}
        }
        self.object_mut(replacement).parent = parent;
        self.object_mut(object).parent = ParentLink::None;
        self.invalidate();
    }

    /// Replace the root object. The previous root loses its root-only markup;
    /// the new one is detached from any parent first.
    pub fn set_root(&mut self, root: Option<ObjectId>) {
        if let Some(new_root) = root {
            assert!(
                self.glue.node(self.object(new_root).glue).is_element(),
                "{:?} cannot be a root",
                new_root
            );
            if self.object(new_root).parent != ParentLink::None {
                self.remove_from_parent(new_root);
            }
        }
        if let Some(old_root) = self.root {
            if Some(old_root) != root {
                self.reset_root_artifacts(old_root);
            }
        }

        let glue_root = root.map(|id| self.object(id).glue);
        self.glue.set_root(glue_root);
        if let Some(glue_root) = glue_root {
            if let Some(element) = self.glue.element_mut(glue_root) {
                if !element.has_attribute(FX_NAMESPACE_PREFIX) {
                    element.set_attribute(FX_NAMESPACE_PREFIX, FX_NAMESPACE);
                }
            }
        }
        self.root = root;
        self.invalidate();
    }

    fn reset_root_artifacts(&mut self, object: ObjectId) {
        let glue = self.object(object).glue;
        let fx_root = matches!(self.object(object).kind, ObjectKind::Instance { fx_root: true, .. });
        let Some(element) = self.glue.element_mut(glue) else {
            return;
        };
        let namespaces: Vec<String> = element
            .attributes()
            .iter()
            .filter(|a| a.name == "xmlns" || a.name.starts_with("xmlns:"))
            .map(|a| a.name.clone())
            .collect();
        for name in namespaces {
            element.remove_attribute(&name);
        }
        element.remove_attribute("fx:controller");
        if fx_root {
            if let Some(declared_type) = element.remove_attribute("type") {
                element.set_tag_name(declared_type);
            }
            if let ObjectKind::Instance { fx_root, .. } = &mut self.object_mut(object).kind {
                *fx_root = false;
            }
        }
    }

    /// Attach a detached property to `owner`
    pub fn add_property(&mut self, owner: ObjectId, property: PropertyId) {
        assert!(
            self.property(property).owner.is_none(),
            "property '{}' already has an owner",
            self.property(property).name
        );
        let name = self.property(property).name.clone();
        assert!(
            self.object(owner).kind.properties().is_some(),
            "{:?} cannot own properties",
            owner
        );
        assert!(
            self.property_named(owner, &name).is_none(),
            "{:?} already has a property '{}'",
            owner,
            name
        );

        let owner_glue = self.object(owner).glue;
        match self.property(property).form {
            PropertyForm::Attribute => {
                let PropertyKind::Text { value, values, .. } = &self.property(property).kind else {
                    panic!("complex properties are never attributes");
                };
                assert!(values.is_empty(), "attribute properties carry no objects");
                let value = value.clone();
                if let Some(element) = self.glue.element_mut(owner_glue) {
                    element.set_attribute(&name.to_string(), &value);
                }
            }
            PropertyForm::Element(glue) => self.glue.insert_before(owner_glue, glue, None),
            PropertyForm::Implicit => {
                let values = self.property(property).values().to_vec();
                for value in values {
                    let glue = self.object(value).glue;
                    self.glue.insert_before(owner_glue, glue, None);
                }
            }
        }

        if let Some(properties) = self.object_mut(owner).kind.properties_mut() {
            properties.insert(name, property);
        }
        self.property_mut(property).owner = Some(owner);
        self.invalidate();
    }

    /// Detach a property from its owner. Its values stay attached to it.
    pub fn remove_property(&mut self, property: PropertyId) {
        let Some(owner) = self.property(property).owner else {
            return;
        };
        let name = self.property(property).name.clone();
        let owner_glue = self.object(owner).glue;
        match self.property(property).form {
            PropertyForm::Attribute => {
                if let Some(element) = self.glue.element_mut(owner_glue) {
                    element.remove_attribute(&name.to_string());
                }
            }
            PropertyForm::Element(glue) => self.glue.detach(glue),
            PropertyForm::Implicit => {
                let values = self.property(property).values().to_vec();
                for value in values {
                    let glue = self.object(value).glue;
                    self.glue.detach(glue);
                }
            }
        }
        if let Some(properties) = self.object_mut(owner).kind.properties_mut() {
            properties.remove(&name);
        }
        self.property_mut(property).owner = None;
        self.invalidate();
    }

    /// Change the value of a text property in place
    pub fn set_property_value(&mut self, property: PropertyId, value: &str) -> DomResult<()> {
        let node = self.property(property);
        if node.is_placeholder() {
            return Err(DomError::ReadOnlyProperty(node.name.clone()));
        }
        let PropertyKind::Text { values, .. } = &node.kind else {
            panic!("property '{}' is complex", node.name);
        };
        let values = values.clone();
        let form = node.form;
        let owner = node.owner;
        let name = node.name.to_string();

        match form {
            PropertyForm::Attribute => {
                if let Some(owner) = owner {
                    let owner_glue = self.object(owner).glue;
                    if let Some(element) = self.glue.element_mut(owner_glue) {
                        element.set_attribute(&name, value);
                    }
                }
            }
            PropertyForm::Element(glue) if values.is_empty() => {
                self.glue.set_content_text(glue, value);
            }
            PropertyForm::Element(_) | PropertyForm::Implicit => {
                self.set_text_values(property, &values, value);
            }
        }

        if let PropertyKind::Text { value: current, .. } = &mut self.property_mut(property).kind {
            *current = value.to_string();
        }
        self.invalidate();
        Ok(())
    }

    fn set_text_values(&mut self, property: PropertyId, values: &[ObjectId], value: &str) {
        let literals: Vec<ObjectId> = values
            .iter()
            .copied()
            .filter(|&v| self.is_literal_text(v))
            .collect();

        if let Some((&first, rest)) = literals.split_first() {
            let glue = self.object(first).glue;
            self.glue.set_text(glue, value);
            for &extra in rest {
                let glue = self.object(extra).glue;
                self.glue.detach(glue);
                self.object_mut(extra).parent = ParentLink::None;
            }
            self.property_mut(property)
                .kind
                .values_mut()
                .retain(|v| !rest.contains(v));
            return;
        }

        if let Some(&literal) = values.iter().find(|&&v| self.fx_value(v).is_some()) {
            self.set_fx_value(literal, Some(value));
            return;
        }

        // Only virtual values so far: add the text after them.
        let parent_glue = match self.property(property).form {
            PropertyForm::Element(glue) => glue,
            _ => {
                let owner = self.property(property).owner.expect("implicit property without owner");
                self.object(owner).glue
            }
        };
        let characters = self.glue.create_text(value);
        self.glue.insert_before(parent_glue, characters, None);
        let literal = self.push_literal_text(characters);
        self.object_mut(literal).parent = ParentLink::Property(property);
        self.property_mut(property).kind.values_mut().push(literal);
    }

    pub(crate) fn push_literal_text(&mut self, characters: GlueId) -> ObjectId {
        self.push_object(
            characters,
            ObjectKind::Instance {
                declared_class: Some(LITERAL_TEXT_CLASS.to_string()),
                properties: Default::default(),
                fx_root: false,
            },
        )
    }

    /// Move the values of an implicit property into a `<name>` element
    fn convert_to_element_form(&mut self, property: PropertyId) {
        let owner = self
            .property(property)
            .owner
            .expect("implicit property without owner");
        let owner_glue = self.object(owner).glue;
        let values = self.property(property).values().to_vec();
        let element = self.glue.create_element(&self.property(property).name.to_string());
        let anchor = values.first().map(|&v| self.object(v).glue);
        self.glue.insert_before(owner_glue, element, anchor);
        for value in values {
            let glue = self.object(value).glue;
            self.glue.detach(glue);
            self.glue.insert_before(element, glue, None);
        }
        self.property_mut(property).form = PropertyForm::Element(element);
    }
}
