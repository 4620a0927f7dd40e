//! Structural algorithms over a [`Document`]: ordering, diff-merge updates
//! between two documents and reference queries.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::PropertyDescriptor;
use crate::cloner::{copy_property, copy_subtree};
use crate::document::Document;
use crate::expression::reference_target;
use crate::id_generator::FxIdGenerator;
use crate::model::{IntrinsicKind, ObjectId, ObjectKind, PropertyForm, PropertyId, PropertyKind};

const UPDATED_METADATA: [&str; 5] = ["fx:id", "fx:value", "fx:constant", "fx:factory", "fx:controller"];

/// Every object of the document below the root, pre-order
pub fn depth_first_order(document: &Document) -> Vec<ObjectId> {
    document
        .root()
        .map(|root| document.descendants(root))
        .unwrap_or_default()
}

/// `objects` in document order. Objects outside the tree are dropped.
pub fn sort(document: &Document, objects: &[ObjectId]) -> Vec<ObjectId> {
    let wanted: BTreeSet<ObjectId> = objects.iter().copied().collect();
    depth_first_order(document)
        .into_iter()
        .filter(|object| wanted.contains(object))
        .collect()
}

/// `objects` without the ones that have an ancestor in the set
pub fn flatten(document: &Document, objects: &[ObjectId]) -> Vec<ObjectId> {
    let set: BTreeSet<ObjectId> = objects.iter().copied().collect();
    let mut seen = BTreeSet::new();
    objects
        .iter()
        .copied()
        .filter(|&object| {
            seen.insert(object) && !set.iter().any(|&other| document.is_descendant_of(object, other))
        })
        .collect()
}

/// What an update changed in the target document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub added: usize,
    pub removed: usize,
    pub replaced: usize,
    pub modified: usize,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn merge(&mut self, other: UpdateReport) {
        self.added += other.added;
        self.removed += other.removed;
        self.replaced += other.replaced;
        self.modified += other.modified;
    }
}

/// Copy of an object of `source` into `target`, unparented
pub fn import_object(target: &mut Document, source: &Document, object: ObjectId) -> ObjectId {
    copy_subtree(target, source, object)
}

/// Copy of a property of `source` into `target`, detached
pub fn import_property(target: &mut Document, source: &Document, property: PropertyId) -> PropertyId {
    copy_property(target, source, property)
}

/// Bring `object` in line with `source_object`, keeping every node that
/// already matches. Nodes whose shape differs are replaced in position.
/// Applying the same update twice changes nothing the second time.
pub fn update_object(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
) -> UpdateReport {
    if !same_shape(target, object, source, source_object) {
        let copy = import_object(target, source, source_object);
        target.replace_object(object, copy);
        debug!(?object, ?copy, "replaced object");
        return UpdateReport {
            replaced: 1,
            ..Default::default()
        };
    }
    match target.object(object).kind() {
        ObjectKind::Instance { .. } => update_instance(target, object, source, source_object),
        ObjectKind::Collection { .. } => update_collection(target, object, source, source_object),
        ObjectKind::Intrinsic { .. } => update_intrinsic(target, object, source, source_object),
        ObjectKind::Define { .. } => update_items(target, object, source, source_object),
        ObjectKind::Comment => {
            let text = source.comment_text(source_object).unwrap_or_default().to_string();
            if target.comment_text(object) != Some(text.as_str()) {
                target.set_comment_text(object, &text);
                return modified();
            }
            UpdateReport::default()
        }
        ObjectKind::Script => {
            let mut report = update_metadata(target, object, source, source_object, &["source"]);
            let content = source.script_content(source_object);
            if target.script_content(object) != content {
                target.set_script_content(object, content.as_deref().unwrap_or_default());
                report.modified += 1;
            }
            report
        }
    }
}

pub fn update_instance(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
) -> UpdateReport {
    if target.is_literal_text(object) {
        let glue = target.object(object).glue();
        let text = source.glue().text(source.object(source_object).glue());
        if target.glue().text(glue) != text {
            target.glue_mut().set_text(glue, text.as_deref().unwrap_or_default());
            return modified();
        }
        return UpdateReport::default();
    }
    let mut report = update_metadata(target, object, source, source_object, &UPDATED_METADATA);
    report.merge(update_properties(target, object, source, source_object));
    report
}

pub fn update_collection(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
) -> UpdateReport {
    let mut report = update_metadata(target, object, source, source_object, &UPDATED_METADATA);
    report.merge(update_items(target, object, source, source_object));
    report
}

pub fn update_intrinsic(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
) -> UpdateReport {
    let mut report = update_metadata(target, object, source, source_object, &["source", "fx:id"]);
    report.merge(update_properties(target, object, source, source_object));
    report
}

pub fn update_property(
    target: &mut Document,
    property: PropertyId,
    source: &Document,
    source_property: PropertyId,
) -> UpdateReport {
    let live = target.property(property);
    let wanted = source.property(source_property);
    let same_form = std::mem::discriminant(&live.form()) == std::mem::discriminant(&wanted.form());
    let same_kind = live.kind().is_text() == wanted.kind().is_text();
    let same_count = !live.kind().is_text() || live.values().len() == wanted.values().len();

    if !(same_form && same_kind && same_count) {
        let Some(owner) = live.owner() else {
            return UpdateReport::default();
        };
        target.remove_property(property);
        let copy = import_property(target, source, source_property);
        target.add_property(owner, copy);
        return UpdateReport {
            replaced: 1,
            ..Default::default()
        };
    }

    let mut report = UpdateReport::default();
    match (live.kind(), wanted.kind()) {
        (
            PropertyKind::Text {
                value, placeholder, ..
            },
            PropertyKind::Text {
                value: wanted_value, ..
            },
        ) => {
            if *placeholder {
                return report;
            }
            let live_value = value.clone();
            let wanted_value = wanted_value.clone();
            let pairs: Vec<(ObjectId, ObjectId)> = live
                .values()
                .iter()
                .copied()
                .zip(wanted.values().iter().copied())
                .collect();
            for (value, wanted_value) in &pairs {
                report.merge(update_object(target, *value, source, *wanted_value));
            }
            if live_value != wanted_value {
                if pairs.is_empty() {
                    if let Err(error) = target.set_property_value(property, &wanted_value) {
                        warn!(%error, "could not update property");
                    }
                } else if let PropertyKind::Text { value, .. } = &mut target.property_mut(property).kind {
                    *value = wanted_value;
                }
                report.modified += 1;
            }
        }
        _ => {
            let live_values = live.values().to_vec();
            let wanted_values = wanted.values().to_vec();
            for (value, wanted_value) in live_values.iter().zip(&wanted_values) {
                report.merge(update_object(target, *value, source, *wanted_value));
            }
            for &extra in wanted_values.iter().skip(live_values.len()) {
                let copy = import_object(target, source, extra);
                target.add_to_parent_property(copy, property, None);
                report.added += 1;
            }
            for &stale in live_values.iter().skip(wanted_values.len()).rev() {
                target.remove_from_parent_property(stale);
                report.removed += 1;
            }
        }
    }
    report
}

fn update_properties(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
) -> UpdateReport {
    let mut report = UpdateReport::default();
    let live = target.object(object).kind().properties().cloned().unwrap_or_default();
    let wanted = source
        .object(source_object)
        .kind()
        .properties()
        .cloned()
        .unwrap_or_default();

    for (name, &property) in &live {
        if !wanted.contains_key(name) {
            target.remove_property(property);
            report.removed += 1;
        }
    }
    for (name, &wanted_property) in &wanted {
        match live.get(name) {
            Some(&property) => report.merge(update_property(target, property, source, wanted_property)),
            None => {
                let copy = import_property(target, source, wanted_property);
                target.add_property(object, copy);
                report.added += 1;
            }
        }
    }
    report
}

fn update_items(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
) -> UpdateReport {
    let mut report = UpdateReport::default();
    let live = target.object(object).kind().items().unwrap_or_default().to_vec();
    let wanted = source.object(source_object).kind().items().unwrap_or_default().to_vec();

    for (item, wanted_item) in live.iter().zip(&wanted) {
        report.merge(update_object(target, *item, source, *wanted_item));
    }
    for &extra in wanted.iter().skip(live.len()) {
        let copy = import_object(target, source, extra);
        target.add_to_parent_collection(copy, object, None);
        report.added += 1;
    }
    for &stale in live.iter().skip(wanted.len()).rev() {
        target.remove_from_parent_collection(stale);
        report.removed += 1;
    }
    report
}

fn update_metadata(
    target: &mut Document,
    object: ObjectId,
    source: &Document,
    source_object: ObjectId,
    names: &[&str],
) -> UpdateReport {
    let mut report = UpdateReport::default();
    for name in names {
        let wanted = source.fx_attribute(source_object, name);
        if target.fx_attribute(object, name) != wanted {
            target.set_fx_attribute(object, name, wanted.as_deref());
            report.modified += 1;
        }
    }
    report
}

fn same_shape(target: &Document, object: ObjectId, source: &Document, source_object: ObjectId) -> bool {
    let live = target.object(object).kind();
    let wanted = source.object(source_object).kind();
    match (live, wanted) {
        (
            ObjectKind::Instance {
                declared_class,
                fx_root,
                ..
            },
            ObjectKind::Instance {
                declared_class: wanted_class,
                fx_root: wanted_root,
                ..
            },
        ) => {
            declared_class == wanted_class
                && fx_root == wanted_root
                && target.tag_name(object) == source.tag_name(source_object)
                && target.is_literal_text(object) == source.is_literal_text(source_object)
        }
        (
            ObjectKind::Collection { declared_class, .. },
            ObjectKind::Collection {
                declared_class: wanted_class,
                ..
            },
        ) => declared_class == wanted_class && target.tag_name(object) == source.tag_name(source_object),
        (ObjectKind::Intrinsic { kind, .. }, ObjectKind::Intrinsic { kind: wanted_kind, .. }) => {
            kind == wanted_kind
        }
        (ObjectKind::Define { .. }, ObjectKind::Define { .. })
        | (ObjectKind::Comment, ObjectKind::Comment)
        | (ObjectKind::Script, ObjectKind::Script) => true,
        _ => false,
    }
}

fn modified() -> UpdateReport {
    UpdateReport {
        modified: 1,
        ..Default::default()
    }
}

// ----- references -----

/// A place in the tree that names another object by `fx:id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ReferenceSite {
    /// `fx:reference` or `fx:copy` element
    Intrinsic(ObjectId),
    /// `$id` text property
    Expression(PropertyId),
}

impl ReferenceSite {
    /// Identifier named by the site
    pub fn target(&self, document: &Document) -> Option<String> {
        match *self {
            ReferenceSite::Intrinsic(object) => reference_source(document, object),
            ReferenceSite::Expression(property) => expression_reference(document, property),
        }
    }

    /// Whether the site is still attached at or below `scope`
    pub fn is_within(&self, document: &Document, scope: ObjectId) -> bool {
        let object = match *self {
            ReferenceSite::Intrinsic(object) => Some(object),
            ReferenceSite::Expression(property) => document.property(property).owner(),
        };
        object
            .map(|object| object == scope || document.is_descendant_of(object, scope))
            .unwrap_or(false)
    }
}

/// Source of an `fx:reference` or `fx:copy`
pub fn reference_source(document: &Document, object: ObjectId) -> Option<String> {
    match document.intrinsic_kind(object)? {
        IntrinsicKind::Reference | IntrinsicKind::Copy => document.intrinsic_source(object),
        IntrinsicKind::Include => None,
    }
}

/// Identifier of a `$id` text property
pub fn expression_reference(document: &Document, property: PropertyId) -> Option<String> {
    let node = document.property(property);
    let text = node.kind().text()?;
    reference_target(&node.name().name, text).map(str::to_string)
}

/// Catalog entry describing `property` on its owner
pub fn property_descriptor(document: &Document, property: PropertyId) -> Option<&PropertyDescriptor> {
    let node = document.property(property);
    let catalog = document.catalog();
    match &node.name().residence_class {
        Some(residence) => {
            let residence = document.imports().resolve(residence, catalog)?;
            catalog.static_property(&residence, &node.name().name)
        }
        None => {
            let owner_class = document.declared_class(node.owner()?)?;
            catalog.property(owner_class, &node.name().name)
        }
    }
}

/// Whether references held by `property` are associations rather than
/// ownership
pub fn is_weak_reference(document: &Document, property: PropertyId) -> bool {
    let name = &document.property(property).name().name;
    document.context().extensions.weak_properties.contains(name)
        || property_descriptor(document, property)
            .map(|descriptor| descriptor.weak)
            .unwrap_or(false)
}

/// Every reference site at or below `scope`, in document order
pub fn reference_sites(document: &Document, scope: ObjectId) -> Vec<ReferenceSite> {
    let mut sites = Vec::new();
    for object in document.descendants(scope) {
        if reference_source(document, object).is_some() {
            sites.push(ReferenceSite::Intrinsic(object));
        }
        for property in document.properties_of(object) {
            if expression_reference(document, property).is_some() {
                sites.push(ReferenceSite::Expression(property));
            }
        }
    }
    sites
}

/// Reference sites at or below `scope` naming `fx_id`
pub fn collect_references(document: &Document, scope: ObjectId, fx_id: &str) -> Vec<ReferenceSite> {
    reference_sites(document, scope)
        .into_iter()
        .filter(|site| site.target(document).as_deref() == Some(fx_id))
        .collect()
}

/// Properties at or below `scope` holding weak references
pub fn collect_weak_references(document: &Document, scope: ObjectId) -> Vec<PropertyId> {
    let mut properties: Vec<PropertyId> = reference_sites(document, scope)
        .into_iter()
        .filter_map(|site| match site {
            ReferenceSite::Expression(property) => Some(property),
            ReferenceSite::Intrinsic(object) => document.parent_property(object),
        })
        .filter(|&property| is_weak_reference(document, property))
        .collect();
    properties.dedup();
    properties
}

/// Fresh `fx:id` derived from `base`, unused in the document
pub fn new_fx_id(document: &Document, base: &str) -> String {
    let mut generator = FxIdGenerator::new(document.collect_fx_ids().into_keys());
    if !generator.is_taken(base) && crate::expression::is_identifier(base) {
        return base.to_string();
    }
    generator.new_id(base)
}

/// Whether the property is written as a child element
pub fn is_element_form(document: &Document, property: PropertyId) -> bool {
    matches!(document.property(property).form(), PropertyForm::Element(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyName;
    use crate::test_support::load;

    const SOURCE: &str = r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <HBox fx:id="row">
        <Button fx:id="a"/>
        <Label fx:id="b" labelFor="$a"/>
    </HBox>
    <Label fx:id="c">
        <labelFor>
            <fx:reference source="a"/>
        </labelFor>
    </Label>
</VBox>"#;

    #[test]
    fn test_sort_and_flatten() {
        let document = load(SOURCE);
        let row = document.search_with_fx_id("row").unwrap();
        let a = document.search_with_fx_id("a").unwrap();
        let c = document.search_with_fx_id("c").unwrap();
        assert_eq!(sort(&document, &[c, a, row]), vec![row, a, c]);
        assert_eq!(flatten(&document, &[a, row, c]), vec![row, c]);
    }

    #[test]
    fn test_collect_references() {
        let document = load(SOURCE);
        let root = document.root().unwrap();
        let sites = collect_references(&document, root, "a");
        assert_eq!(sites.len(), 2);
        assert!(matches!(sites[0], ReferenceSite::Expression(_)));
        assert!(matches!(sites[1], ReferenceSite::Intrinsic(_)));
        assert_eq!(collect_weak_references(&document, root).len(), 2);
    }

    #[test]
    fn test_new_fx_id() {
        let document = load(SOURCE);
        assert_eq!(new_fx_id(&document, "a"), "a1");
        assert_eq!(new_fx_id(&document, "slider"), "slider");
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut target = load(SOURCE);
        let source = load(&SOURCE.replace("fx:id=\"b\" labelFor=\"$a\"", "fx:id=\"b\" text=\"Hi\""));
        let root = target.root().unwrap();
        let source_root = source.root().unwrap();

        let first = update_object(&mut target, root, &source, source_root);
        assert_eq!(first.added, 1);
        assert_eq!(first.removed, 1);
        assert_eq!(target.glue_text(), source.glue_text());

        let second = update_object(&mut target, root, &source, source_root);
        assert!(second.is_empty());
    }

    #[test]
    fn test_update_replaces_mismatched_class() {
        let mut target = load("<VBox>\n    <Button fx:id=\"x\"/>\n</VBox>");
        let source = load("<VBox>\n    <Label fx:id=\"x\"/>\n</VBox>");
        let target_root = target.root().unwrap();
        let report = update_object(&mut target, target_root, &source, source.root().unwrap());
        assert_eq!(report.replaced, 1);
        assert_eq!(target.glue_text(), source.glue_text());
        let x = target.search_with_fx_id("x").unwrap();
        assert_eq!(target.tag_name(x), Some("Label"));
        let children = target
            .property_named(target.root().unwrap(), &PropertyName::new("children"))
            .unwrap();
        assert_eq!(target.property(children).values(), &[x]);
    }
}
