//! Builds object-model nodes over a parsed glue tree.
//!
//! The builder walks the glue tree depth first and materializes each node
//! when its element closes: attributes become text properties, property
//! elements are accumulated into a pending property whose final shape is
//! inferred from its content, and object elements written directly inside an
//! instance are accumulated into the implicit default property.

use std::collections::BTreeSet;

use fxom_glue::{GlueData, GlueId};
use tracing::warn;

use crate::catalog::{ImportSet, PropertyDescriptor, ValueType};
use crate::context::{ClassLoadingContext, TransientClassLoader};
use crate::document::Document;
use crate::model::{
    IntrinsicKind, ObjectId, ObjectKind, ParentLink, PropertyForm, PropertyId, PropertyKind,
    PropertyName,
};

/// Default property used when the owner's class is unknown
pub(crate) const FALLBACK_DEFAULT_PROPERTY: &str = "children";

const INTRINSIC_METADATA: [&str; 3] = ["source", "resources", "charset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementRole {
    Intrinsic(IntrinsicKind),
    Define,
    Script,
    FxRoot,
    Property,
    Object,
}

fn classify(tag: &str) -> ElementRole {
    if let Some(kind) = IntrinsicKind::from_tag(tag) {
        return ElementRole::Intrinsic(kind);
    }
    match tag {
        "fx:define" => ElementRole::Define,
        "fx:script" => ElementRole::Script,
        "fx:root" => ElementRole::FxRoot,
        _ if tag.starts_with("fx:") => ElementRole::Object,
        _ => {
            let local = tag.rsplit('.').next().unwrap_or(tag);
            if local.starts_with(|c: char| c.is_lowercase()) {
                ElementRole::Property
            } else {
                ElementRole::Object
            }
        }
    }
}

/// Namespace declarations and `fx:` attributes are not properties
pub(crate) fn is_metadata_attribute(name: &str) -> bool {
    name.starts_with("fx:") || name == "xmlns" || name.starts_with("xmlns:")
}

/// Content gathered for a property before its shape is known
#[derive(Debug)]
enum Pending {
    /// Object with a visual presence
    Real(ObjectId),
    /// Comment, script or define
    Virtual(ObjectId),
    Text(GlueId),
}

pub(crate) struct TransientBuilder<'d, 'c> {
    document: &'d mut Document,
    classes: TransientClassLoader<'c>,
    imports: ImportSet,
}

impl<'d, 'c> TransientBuilder<'d, 'c> {
    pub fn new(document: &'d mut Document, context: &'c ClassLoadingContext) -> Self {
        let imports = document.imports();
        Self {
            document,
            classes: TransientClassLoader::new(context, imports.clone()),
            imports,
        }
    }

    /// Build the tree below the glue root. Returns the unresolved tag names.
    pub fn build(mut self) -> BTreeSet<String> {
        if let Some(glue_root) = self.document.glue.root() {
            let root = self.build_object(glue_root);
            self.document.root = Some(root);
        }
        self.classes.into_unresolved()
    }

    fn tag(&self, glue: GlueId) -> String {
        self.document.glue.tag_name(glue).unwrap_or_default().to_string()
    }

    fn build_object(&mut self, glue: GlueId) -> ObjectId {
        let tag = self.tag(glue);
        match classify(&tag) {
            ElementRole::Intrinsic(kind) => self.build_intrinsic(glue, kind),
            ElementRole::Define => self.build_define(glue),
            ElementRole::Script => self.document.push_object(glue, ObjectKind::Script),
            ElementRole::FxRoot => {
                let declared_type = self
                    .document
                    .glue
                    .element(glue)
                    .and_then(|e| e.attribute("type"));
                let declared = declared_type.and_then(|t| self.classes.load_class(&t));
                self.build_instance(glue, declared, true)
            }
            ElementRole::Property | ElementRole::Object => {
                let declared = self.classes.load_class(&tag);
                let collection = declared
                    .as_deref()
                    .map(|d| self.classes.catalog().is_collection(d))
                    .unwrap_or(false);
                if collection {
                    self.build_collection(glue, declared)
                } else {
                    self.build_instance(glue, declared, false)
                }
            }
        }
    }

    fn build_intrinsic(&mut self, glue: GlueId, kind: IntrinsicKind) -> ObjectId {
        let object = self.document.push_object(
            glue,
            ObjectKind::Intrinsic {
                kind,
                properties: Default::default(),
            },
        );
        let attributes = self.attribute_values(glue, &INTRINSIC_METADATA);
        for (name, value) in attributes {
            let property = self.text_property(PropertyName::parse(&name), value);
            self.attach_property(object, property);
        }
        object
    }

    fn build_define(&mut self, glue: GlueId) -> ObjectId {
        let define = self.document.push_object(glue, ObjectKind::Define { items: Vec::new() });
        let items = self.build_items(glue);
        for &item in &items {
            self.document.object_mut(item).parent = ParentLink::Collection(define);
        }
        if let ObjectKind::Define { items: slot } = &mut self.document.object_mut(define).kind {
            *slot = items;
        }
        define
    }

    fn build_collection(&mut self, glue: GlueId, declared: Option<String>) -> ObjectId {
        let collection = self.document.push_object(
            glue,
            ObjectKind::Collection {
                declared_class: declared,
                items: Vec::new(),
            },
        );
        let items = self.build_items(glue);
        for &item in &items {
            self.document.object_mut(item).parent = ParentLink::Collection(collection);
        }
        if let ObjectKind::Collection { items: slot, .. } = &mut self.document.object_mut(collection).kind {
            *slot = items;
        }
        collection
    }

    /// Element and comment children of a collection or define block
    fn build_items(&mut self, glue: GlueId) -> Vec<ObjectId> {
        let children = self.document.glue.children(glue).to_vec();
        let mut items = Vec::new();
        for child in children {
            match self.document.glue.node(child).data() {
                GlueData::Element(_) => items.push(self.build_object(child)),
                GlueData::Comment(_) => {
                    items.push(self.document.push_object(child, ObjectKind::Comment));
                }
                _ => {}
            }
        }
        items
    }

    fn build_instance(&mut self, glue: GlueId, declared: Option<String>, fx_root: bool) -> ObjectId {
        let object = self.document.push_object(
            glue,
            ObjectKind::Instance {
                declared_class: declared.clone(),
                properties: Default::default(),
                fx_root,
            },
        );

        let skipped: &[&str] = if fx_root { &["type"] } else { &[] };
        for (name, value) in self.attribute_values(glue, skipped) {
            let property = self.text_property(PropertyName::parse(&name), value);
            self.attach_property(object, property);
        }

        let default_name = declared
            .as_deref()
            .and_then(|class| self.classes.catalog().default_property(class))
            .unwrap_or(FALLBACK_DEFAULT_PROPERTY)
            .to_string();
        let mut implicit = Vec::new();

        let children = self.document.glue.children(glue).to_vec();
        for child in children {
            match self.document.glue.node(child).data() {
                GlueData::Element(element) => {
                    let role = classify(element.tag_name());
                    match role {
                        ElementRole::Property => {
                            let property = self.build_property_element(declared.as_deref(), child);
                            self.attach_property(object, property);
                        }
                        ElementRole::Define | ElementRole::Script => {
                            implicit.push(Pending::Virtual(self.build_object(child)));
                        }
                        _ => implicit.push(Pending::Real(self.build_object(child))),
                    }
                }
                GlueData::Characters(_) | GlueData::CData(_) if !self.is_blank(child) => {
                    implicit.push(Pending::Text(child));
                }
                // Comments written directly in an instance stay in the glue.
                _ => {}
            }
        }

        if !implicit.is_empty() {
            let name = PropertyName::new(default_name);
            let property = self.finish_property(name, PropertyForm::Implicit, implicit);
            self.attach_property(object, property);
        }
        object
    }

    fn build_property_element(&mut self, owner_class: Option<&str>, glue: GlueId) -> PropertyId {
        let name = PropertyName::parse(&self.tag(glue));
        let map_typed = self
            .descriptor(owner_class, &name)
            .map(|d| d.value_type == ValueType::Map)
            .unwrap_or(false);
        if map_typed {
            // Content stays in the glue only.
            return self.document.push_property(
                name,
                PropertyForm::Element(glue),
                PropertyKind::Text {
                    value: String::new(),
                    values: Vec::new(),
                    placeholder: true,
                },
            );
        }

        let mut pending = Vec::new();
        let children = self.document.glue.children(glue).to_vec();
        for child in children {
            match self.document.glue.node(child).data() {
                GlueData::Element(element) => match classify(element.tag_name()) {
                    ElementRole::Define | ElementRole::Script => {
                        pending.push(Pending::Virtual(self.build_object(child)));
                    }
                    _ => pending.push(Pending::Real(self.build_object(child))),
                },
                GlueData::Comment(_) => {
                    let comment = self.document.push_object(child, ObjectKind::Comment);
                    pending.push(Pending::Virtual(comment));
                }
                GlueData::Characters(_) | GlueData::CData(_) => pending.push(Pending::Text(child)),
                _ => {}
            }
        }
        self.finish_property(name, PropertyForm::Element(glue), pending)
    }

    /// Decide the property shape from its accumulated content
    fn finish_property(&mut self, name: PropertyName, form: PropertyForm, pending: Vec<Pending>) -> PropertyId {
        let objects: Vec<ObjectId> = pending
            .iter()
            .filter_map(|entry| match entry {
                Pending::Real(id) | Pending::Virtual(id) => Some(*id),
                Pending::Text(_) => None,
            })
            .collect();
        let real: Vec<ObjectId> = pending
            .iter()
            .filter_map(|entry| match entry {
                Pending::Real(id) => Some(*id),
                _ => None,
            })
            .collect();
        let has_text = pending
            .iter()
            .any(|entry| matches!(entry, Pending::Text(glue) if !self.is_blank(*glue)));

        let kind = match (form, objects.is_empty()) {
            (PropertyForm::Element(glue), true) => PropertyKind::Text {
                value: self.document.glue.content_text(glue).unwrap_or_default(),
                values: Vec::new(),
                placeholder: false,
            },
            _ if real.len() == 1 && self.literal_value(real[0]).is_some() => PropertyKind::Text {
                value: self.literal_value(real[0]).unwrap_or_default(),
                values: objects,
                placeholder: false,
            },
            _ if real.is_empty() && has_text => self.split_free_text(pending),
            _ => PropertyKind::Complex { values: objects },
        };

        let property = self.document.push_property(name, form, kind);
        let values = self.document.property(property).values().to_vec();
        for value in values {
            self.document.object_mut(value).parent = ParentLink::Property(property);
        }
        property
    }

    /// Free text mixed with virtual values: every run of text becomes a
    /// literal object so the order survives a save.
    fn split_free_text(&mut self, pending: Vec<Pending>) -> PropertyKind {
        let mut value = String::new();
        let mut values = Vec::new();
        for entry in pending {
            match entry {
                Pending::Real(id) | Pending::Virtual(id) => values.push(id),
                Pending::Text(glue) => {
                    if self.is_blank(glue) {
                        continue;
                    }
                    let core = match self.document.glue.node(glue).data() {
                        GlueData::Characters(_) => self.document.glue.split_characters(glue).1,
                        _ => glue,
                    };
                    value.push_str(&self.document.glue.text(core).unwrap_or_default());
                    values.push(self.document.push_literal_text(core));
                }
            }
        }
        PropertyKind::Text {
            value,
            values,
            placeholder: false,
        }
    }

    /// `fx:value` of an instance
    fn literal_value(&self, object: ObjectId) -> Option<String> {
        match self.document.object(object).kind {
            ObjectKind::Instance { .. } => self.document.fx_value(object),
            _ => None,
        }
    }

    fn descriptor(&self, owner_class: Option<&str>, name: &PropertyName) -> Option<&'c PropertyDescriptor> {
        let catalog = self.classes.catalog();
        match &name.residence_class {
            Some(residence) => {
                let residence = self.imports.resolve(residence, catalog)?;
                catalog.static_property(&residence, &name.name)
            }
            None => catalog.property(owner_class?, &name.name),
        }
    }

    fn attribute_values(&self, glue: GlueId, skipped: &[&str]) -> Vec<(String, String)> {
        self.document
            .glue
            .element(glue)
            .map(|element| {
                element
                    .attributes()
                    .iter()
                    .filter(|a| !is_metadata_attribute(&a.name) && !skipped.contains(&a.name.as_str()))
                    .map(|a| (a.name.clone(), a.value()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn text_property(&mut self, name: PropertyName, value: String) -> PropertyId {
        self.document.push_property(
            name,
            PropertyForm::Attribute,
            PropertyKind::Text {
                value,
                values: Vec::new(),
                placeholder: false,
            },
        )
    }

    fn attach_property(&mut self, owner: ObjectId, property: PropertyId) {
        let name = self.document.property(property).name.clone();
        let Some(properties) = self.document.object_mut(owner).kind.properties_mut() else {
            return;
        };
        if properties.contains_key(&name) {
            warn!(property = %name, "property declared twice, keeping the first declaration");
            return;
        }
        properties.insert(name, property);
        self.document.property_mut(property).owner = Some(owner);
    }

    fn is_blank(&self, glue: GlueId) -> bool {
        match self.document.glue.node(glue).data() {
            GlueData::Characters(_) => self.document.glue.node(glue).is_whitespace(),
            GlueData::CData(text) => text.trim().is_empty(),
            _ => true,
        }
    }
}
