//! # Cloner
//!
//! Deep copies of object subtrees, within a document or across documents.
//!
//! 1. The glue subtree is imported into a scratch document and the object
//!    model is mirrored over it.
//! 2. Reference sites (`fx:reference`, `fx:copy`, `$id` values) whose target
//!    lies outside the copy are resolved against the source document: weak
//!    ones are dropped, strong ones pull a copy of their target in at the
//!    reference site.
//! 3. Identifiers are renamed in two phases. [`plan_renames`] picks a new
//!    name for each colliding declaration without touching anything, repeated
//!    declarations within the copy included; [`apply_renames`] rewrites
//!    declarations and references.
//!
//! The result is a [`Fragment`] that [`Document::insert_fragment`] absorbs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fxom_glue::GlueId;
use tracing::{debug, instrument, warn};

use crate::document::Document;
use crate::id_generator::FxIdGenerator;
use crate::model::{
    IntrinsicKind, ObjectId, ObjectKind, ObjectNode, ParentLink, PropertyForm, PropertyId,
    PropertyKind, PropertyNode,
};
use crate::nodes::{is_weak_reference, reference_sites, ReferenceSite};

/// Detached copy of a subtree, owned by a scratch document until inserted
#[derive(Debug)]
pub struct Fragment {
    pub document: Document,
    pub root: ObjectId,
}

pub struct Cloner<'a> {
    source: &'a Document,
}

impl<'a> Cloner<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self { source }
    }

    /// Copy `object` for insertion into a document declaring `target_ids`
    #[instrument(skip(self, target_ids))]
    pub fn clone_object(
        &self,
        object: ObjectId,
        preserve_top_level_id: bool,
        target_ids: &BTreeSet<String>,
    ) -> Fragment {
        let mut scratch = Document::new(self.source.context().clone());
        scratch.set_location(self.source.location().cloned());
        let root = copy_subtree(&mut scratch, self.source, object);

        self.pull_references(&mut scratch, root);

        let (declaring, declared): (Vec<ObjectId>, Vec<String>) = scratch
            .descendants(root)
            .into_iter()
            .filter_map(|object| scratch.fx_id(object).map(|fx_id| (object, fx_id)))
            .unzip();
        let exempt = if preserve_top_level_id {
            scratch.fx_id(root)
        } else {
            None
        };
        let renames = plan_renames(&declared, target_ids, exempt.as_deref());
        if renames.iter().any(Option::is_some) {
            debug!(?renames, "renaming cloned identifiers");
        }
        apply_renames(&mut scratch, root, &declaring, &renames);

        Fragment {
            document: scratch,
            root,
        }
    }

    fn pull_references(&self, scratch: &mut Document, root: ObjectId) {
        let mut declared: BTreeSet<String> = scratch.collect_fx_ids_in(root).into_keys().collect();
        let mut queue: VecDeque<ReferenceSite> = reference_sites(scratch, root).into();

        while let Some(site) = queue.pop_front() {
            if !site.is_within(scratch, root) {
                continue;
            }
            let Some(target_id) = site.target(scratch) else {
                continue;
            };
            if declared.contains(&target_id) {
                continue;
            }
            let Some(original) = self.source.search_with_fx_id(&target_id) else {
                warn!(id = %target_id, "reference without declaration in the source document");
                continue;
            };

            let weak = match site {
                ReferenceSite::Expression(property) => is_weak_reference(scratch, property),
                ReferenceSite::Intrinsic(object) => scratch
                    .parent_property(object)
                    .map(|property| is_weak_reference(scratch, property))
                    .unwrap_or(false),
            };
            if weak {
                debug!(id = %target_id, "dropping weak reference to an object outside the copy");
                match site {
                    ReferenceSite::Expression(property) => scratch.remove_property(property),
                    ReferenceSite::Intrinsic(object) => match scratch.parent_property(object) {
                        Some(property) => scratch.remove_property(property),
                        None => scratch.remove_from_parent(object),
                    },
                }
                continue;
            }

            let pulled = copy_subtree(scratch, self.source, original);
            match site {
                ReferenceSite::Intrinsic(object) => {
                    if scratch.intrinsic_kind(object) == Some(IntrinsicKind::Copy) {
                        scratch.set_fx_id(pulled, None);
                    } else {
                        declared.insert(target_id.clone());
                    }
                    scratch.replace_object(object, pulled);
                }
                ReferenceSite::Expression(property) => {
                    let Some(owner) = scratch.property(property).owner() else {
                        continue;
                    };
                    let name = scratch.property(property).name().clone();
                    scratch.remove_property(property);
                    let complex = scratch.new_property_complex(name);
                    scratch.add_property(owner, complex);
                    scratch.add_to_parent_property(pulled, complex, None);
                    declared.insert(target_id.clone());
                }
            }
            debug!(id = %target_id, "pulled referenced object into the copy");

            declared.extend(scratch.collect_fx_ids_in(pulled).into_keys());
            queue.extend(reference_sites(scratch, pulled));
        }
    }
}

/// Phase 1: one entry per declaration of the copy, in document order. A
/// declaration gets a fresh identifier when its id collides with
/// `target_ids` or with an earlier declaration of the copy. The first
/// declaration of `exempt` keeps its name regardless.
pub fn plan_renames(
    declared: &[String],
    target_ids: &BTreeSet<String>,
    exempt: Option<&str>,
) -> Vec<Option<String>> {
    let mut generator = FxIdGenerator::new(target_ids.iter().chain(declared).cloned());
    let mut seen = BTreeSet::new();
    declared
        .iter()
        .map(|id| {
            let first = seen.insert(id.as_str());
            let collides = if first {
                Some(id.as_str()) != exempt && target_ids.contains(id)
            } else {
                true
            };
            collides.then(|| generator.new_id(id))
        })
        .collect()
}

/// Phase 2: rename each of `declaring` per `renames` (aligned with it), then
/// rewrite intrinsic sources and `$id` values below `root`. References follow
/// the first declaration of the id they name.
pub fn apply_renames(
    document: &mut Document,
    root: ObjectId,
    declaring: &[ObjectId],
    renames: &[Option<String>],
) {
    let mut references: BTreeMap<String, String> = BTreeMap::new();
    let mut seen = BTreeSet::new();
    for (&object, rename) in declaring.iter().zip(renames) {
        let Some(old_id) = document.fx_id(object) else {
            continue;
        };
        let first = seen.insert(old_id.clone());
        if let Some(new_id) = rename {
            document.set_fx_id(object, Some(new_id));
            if first {
                references.insert(old_id, new_id.clone());
            }
        }
    }
    if references.is_empty() {
        return;
    }

    for object in document.descendants(root) {
        let renamed_source = document
            .intrinsic_source(object)
            .filter(|_| document.intrinsic_kind(object) != Some(IntrinsicKind::Include))
            .and_then(|source| references.get(&source));
        if let Some(new_source) = renamed_source.cloned() {
            document.set_intrinsic_source(object, &new_source);
        }
    }
    for site in reference_sites(document, root) {
        if let ReferenceSite::Expression(property) = site {
            let Some(new_id) = site.target(document).and_then(|id| references.get(&id)).cloned() else {
                continue;
            };
            if let Err(error) = document.set_property_value(property, &format!("${}", new_id)) {
                warn!(%error, "could not rename reference");
            }
        }
    }
}

/// Raw copy of `object` from `source` into `target`: glue and object model,
/// no reference processing, no renaming, no live values. The copy is
/// unparented.
pub(crate) fn copy_subtree(target: &mut Document, source: &Document, object: ObjectId) -> ObjectId {
    let mut map = BTreeMap::new();
    target
        .glue
        .import_subtree(&source.glue, source.object(object).glue(), &mut map);
    let copy = mirror_object(target, source, object, &map);
    target.import_declared_classes(copy);
    copy
}

/// Raw copy of a property. The copy is detached.
pub(crate) fn copy_property(target: &mut Document, source: &Document, property: PropertyId) -> PropertyId {
    let mut map = BTreeMap::new();
    let node = source.property(property);
    match node.form() {
        PropertyForm::Element(glue) => {
            target.glue.import_subtree(&source.glue, glue, &mut map);
        }
        PropertyForm::Implicit => {
            for &value in node.values() {
                target
                    .glue
                    .import_subtree(&source.glue, source.object(value).glue(), &mut map);
            }
        }
        PropertyForm::Attribute => {}
    }
    let copy = mirror_property(target, source, property, &map);
    for value in target.property(copy).values().to_vec() {
        target.import_declared_classes(value);
    }
    copy
}

fn mapped(map: &BTreeMap<GlueId, GlueId>, glue: GlueId) -> GlueId {
    *map.get(&glue)
        .unwrap_or_else(|| panic!("glue node {:?} lies outside the copied subtree", glue))
}

fn mirror_object(
    target: &mut Document,
    source: &Document,
    object: ObjectId,
    map: &BTreeMap<GlueId, GlueId>,
) -> ObjectId {
    let node = source.object(object);
    let glue = mapped(map, node.glue());
    let shell = match node.kind() {
        ObjectKind::Instance {
            declared_class,
            fx_root,
            ..
        } => ObjectKind::Instance {
            declared_class: declared_class.clone(),
            properties: Default::default(),
            fx_root: *fx_root,
        },
        ObjectKind::Collection { declared_class, .. } => ObjectKind::Collection {
            declared_class: declared_class.clone(),
            items: Vec::new(),
        },
        ObjectKind::Intrinsic { kind, .. } => ObjectKind::Intrinsic {
            kind: *kind,
            properties: Default::default(),
        },
        ObjectKind::Define { .. } => ObjectKind::Define { items: Vec::new() },
        ObjectKind::Comment => ObjectKind::Comment,
        ObjectKind::Script => ObjectKind::Script,
    };
    let copy = target.push_object(glue, shell);

    if let Some(properties) = node.kind().properties() {
        for (name, &property) in properties {
            let property_copy = mirror_property(target, source, property, map);
            target.property_mut(property_copy).owner = Some(copy);
            if let Some(slot) = target.object_mut(copy).kind.properties_mut() {
                slot.insert(name.clone(), property_copy);
            }
        }
    }
    if let Some(items) = node.kind().items() {
        for &item in items {
            let item_copy = mirror_object(target, source, item, map);
            target.object_mut(item_copy).parent = ParentLink::Collection(copy);
            if let Some(slot) = target.object_mut(copy).kind.items_mut() {
                slot.push(item_copy);
            }
        }
    }
    copy
}

fn mirror_property(
    target: &mut Document,
    source: &Document,
    property: PropertyId,
    map: &BTreeMap<GlueId, GlueId>,
) -> PropertyId {
    let node = source.property(property);
    let form = match node.form() {
        PropertyForm::Element(glue) => PropertyForm::Element(mapped(map, glue)),
        other => other,
    };
    let values: Vec<ObjectId> = node
        .values()
        .iter()
        .map(|&value| mirror_object(target, source, value, map))
        .collect();
    let kind = match node.kind() {
        PropertyKind::Text {
            value, placeholder, ..
        } => PropertyKind::Text {
            value: value.clone(),
            values: values.clone(),
            placeholder: *placeholder,
        },
        PropertyKind::Complex { .. } => PropertyKind::Complex {
            values: values.clone(),
        },
    };
    let copy = target.push_property(node.name().clone(), form, kind);
    for value in values {
        target.object_mut(value).parent = ParentLink::Property(copy);
    }
    copy
}

impl Document {
    /// Move the nodes of a fragment into this document. Returns the copied
    /// root, unparented and ready to be attached.
    pub fn insert_fragment(&mut self, fragment: Fragment) -> ObjectId {
        let Fragment { document, root } = fragment;
        let glue_offset = self.glue.absorb(document.glue);
        let object_offset = self.objects.len() as u32;
        let property_offset = self.properties.len() as u32;

        for node in document.objects {
            let kind = match node.kind {
                ObjectKind::Instance {
                    declared_class,
                    properties,
                    fx_root,
                } => ObjectKind::Instance {
                    declared_class,
                    properties: properties
                        .into_iter()
                        .map(|(name, p)| (name, p.offset(property_offset)))
                        .collect(),
                    fx_root,
                },
                ObjectKind::Collection {
                    declared_class,
                    items,
                } => ObjectKind::Collection {
                    declared_class,
                    items: items.into_iter().map(|i| i.offset(object_offset)).collect(),
                },
                ObjectKind::Intrinsic { kind, properties } => ObjectKind::Intrinsic {
                    kind,
                    properties: properties
                        .into_iter()
                        .map(|(name, p)| (name, p.offset(property_offset)))
                        .collect(),
                },
                ObjectKind::Define { items } => ObjectKind::Define {
                    items: items.into_iter().map(|i| i.offset(object_offset)).collect(),
                },
                other => other,
            };
            let parent = match node.parent {
                ParentLink::None => ParentLink::None,
                ParentLink::Property(p) => ParentLink::Property(p.offset(property_offset)),
                ParentLink::Collection(c) => ParentLink::Collection(c.offset(object_offset)),
            };
            self.objects.push(ObjectNode {
                glue: node.glue.offset(glue_offset),
                parent,
                scene_graph: node.scene_graph,
                kind,
            });
        }

        for node in document.properties {
            let form = match node.form {
                PropertyForm::Element(glue) => PropertyForm::Element(glue.offset(glue_offset)),
                other => other,
            };
            let kind = match node.kind {
                PropertyKind::Text {
                    value,
                    values,
                    placeholder,
                } => PropertyKind::Text {
                    value,
                    values: values.into_iter().map(|v| v.offset(object_offset)).collect(),
                    placeholder,
                },
                PropertyKind::Complex { values } => PropertyKind::Complex {
                    values: values.into_iter().map(|v| v.offset(object_offset)).collect(),
                },
            };
            self.properties.push(PropertyNode {
                name: node.name,
                owner: node.owner.map(|o| o.offset(object_offset)),
                form,
                kind,
            });
        }

        self.unresolved_classes.extend(document.unresolved_classes);
        let root = root.offset(object_offset);
        self.import_declared_classes(root);
        self.invalidate();
        root
    }

    /// Deep copy of `object` inside this document, identifiers renamed on
    /// collision
    pub fn clone_object(&mut self, object: ObjectId, preserve_top_level_id: bool) -> ObjectId {
        let target_ids: BTreeSet<String> = self.collect_fx_ids().into_keys().collect();
        let fragment = Cloner::new(self).clone_object(object, preserve_top_level_id, &target_ids);
        self.insert_fragment(fragment)
    }

    /// Deep copy of an object of another document into this one
    pub fn clone_from(&mut self, source: &Document, object: ObjectId, preserve_top_level_id: bool) -> ObjectId {
        let target_ids: BTreeSet<String> = self.collect_fx_ids().into_keys().collect();
        let fragment = Cloner::new(source).clone_object(object, preserve_top_level_id, &target_ids);
        self.insert_fragment(fragment)
    }

    /// Make sure every resolved class used below `object` is imported
    pub(crate) fn import_declared_classes(&mut self, object: ObjectId) {
        let mut classes = BTreeSet::new();
        for descendant in self.descendants(object) {
            let simple_tag = self.tag_name(descendant).map(|t| !t.contains('.')).unwrap_or(false);
            if let (true, Some(declared)) = (simple_tag, self.declared_class(descendant)) {
                if !self.is_literal_text(descendant) {
                    classes.insert(declared.to_string());
                }
            }
        }
        for class in classes {
            self.ensure_import(&class);
        }
    }
}
