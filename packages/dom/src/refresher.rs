//! # Refresher
//!
//! Brings the live objects of a document up to date after edits. The markup
//! is serialized and loaded again as a transient document whose nodes must
//! line up one for one with the live tree; the fresh live values are then
//! moved over.
//!
//! ```text
//! glue text ──▶ transient load ──▶ backup state ──▶ check shapes ──▶ transplant ──▶ restore state
//!                    │                                   │
//!            retry without                         mismatch: dump
//!            controller/scripts                    markup, fail
//! ```

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::Write;
use std::path::PathBuf;

use fxom_glue::GlueData;
use tracing::{debug, error, warn};

use crate::document::Document;
use crate::error::{DomError, DomResult};
use crate::loader::{LoadOptions, Loader};
use crate::model::{ObjectId, Origin, PropertyId};
use crate::runtime::{LiveObject, LiveValue};

/// Runtime state that has no markup form and would be lost by a refresh
pub trait TransientStateHandler: Debug {
    fn backup(&self, document: &Document) -> BTreeMap<ObjectId, LiveValue>;

    fn restore(&self, document: &Document, state: &BTreeMap<ObjectId, LiveValue>);
}

fn is_instance_of(document: &Document, object: ObjectId, class: &str) -> bool {
    document
        .declared_class(object)
        .map(|declared| {
            document
                .catalog()
                .lineage(declared)
                .iter()
                .any(|descriptor| descriptor.name == class)
        })
        .unwrap_or(false)
}

fn live_objects_of<'d>(
    document: &'d Document,
    class: &'d str,
) -> impl Iterator<Item = (ObjectId, LiveObject)> + 'd {
    crate::nodes::depth_first_order(document)
        .into_iter()
        .filter(move |&object| is_instance_of(document, object, class))
        .filter_map(move |object| {
            document
                .scene_graph_object(object)
                .and_then(|value| value.as_object())
                .map(|live| (object, live))
        })
}

/// Keeps the selected tab of tab panes
#[derive(Debug)]
pub struct TabPaneSelectionHandler;

impl TabPaneSelectionHandler {
    pub const CLASS: &'static str = "javafx.scene.control.TabPane";
    pub const STATE: &'static str = "selectedIndex";
}

impl TransientStateHandler for TabPaneSelectionHandler {
    fn backup(&self, document: &Document) -> BTreeMap<ObjectId, LiveValue> {
        live_objects_of(document, Self::CLASS)
            .filter_map(|(object, live)| live.state(Self::STATE).map(|index| (object, index)))
            .collect()
    }

    fn restore(&self, document: &Document, state: &BTreeMap<ObjectId, LiveValue>) {
        for (object, live) in live_objects_of(document, Self::CLASS) {
            if let Some(index) = state.get(&object) {
                live.set_state(Self::STATE, index.clone());
            }
        }
    }
}

/// Keeps the expanded pane of accordions. The pane is remembered by its
/// position in `panes` since the pane objects themselves are replaced.
#[derive(Debug)]
pub struct AccordionExpansionHandler;

impl AccordionExpansionHandler {
    pub const CLASS: &'static str = "javafx.scene.control.Accordion";
    pub const STATE: &'static str = "expandedPane";

    fn panes(accordion: &LiveObject) -> Vec<LiveValue> {
        match accordion.get("panes") {
            Some(LiveValue::List(panes)) => panes,
            Some(single @ LiveValue::Object(_)) => vec![single],
            _ => accordion.items(),
        }
    }
}

impl TransientStateHandler for AccordionExpansionHandler {
    fn backup(&self, document: &Document) -> BTreeMap<ObjectId, LiveValue> {
        live_objects_of(document, Self::CLASS)
            .filter_map(|(object, live)| {
                let expanded = live.state(Self::STATE)?;
                let index = Self::panes(&live)
                    .iter()
                    .position(|pane| pane.same_object(&expanded))?;
                Some((object, LiveValue::Integer(index as i64)))
            })
            .collect()
    }

    fn restore(&self, document: &Document, state: &BTreeMap<ObjectId, LiveValue>) {
        for (object, live) in live_objects_of(document, Self::CLASS) {
            let Some(LiveValue::Integer(index)) = state.get(&object) else {
                continue;
            };
            if let Some(pane) = Self::panes(&live).get(*index as usize) {
                live.set_state(Self::STATE, pane.downgrade());
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Refresher;

impl Refresher {
    pub fn new() -> Self {
        Self
    }

    pub fn refresh(&self, document: &mut Document) -> DomResult<()> {
        let text = document.glue_text();
        let loader = Loader::new(document.context().clone(), LoadOptions::default());
        let mut transient = loader.load(&text, document.location().cloned())?;

        if transient.scene_graph_root().is_none() && document.root().is_some() {
            let stripped = strip_runtime_artifacts(&text)?;
            debug!("no live root, retrying without controller and scripts");
            let retry = loader.load(&stripped, document.location().cloned())?;
            if retry.scene_graph_root().is_some() {
                transient = retry;
            }
        }

        let pairs = match check(document, &transient) {
            Ok(pairs) => pairs,
            Err(message) => {
                let dump = dump_markup(&text);
                error!(%message, ?dump, "refresh mismatch");
                return Err(DomError::Refresh { message, dump });
            }
        };

        let context = document.context().clone();
        let handlers = &context.extensions.state_handlers;
        let backups: Vec<BTreeMap<ObjectId, LiveValue>> =
            handlers.iter().map(|handler| handler.backup(document)).collect();

        for (live, fresh) in pairs {
            let incoming = transient.object(fresh).scene_graph.clone();
            let current = &mut document.object_mut(live).scene_graph;
            if incoming.value.is_none() && current.origin == Origin::External {
                continue;
            }
            *current = incoming;
        }
        document.unresolved_classes = transient.unresolved_classes.clone();

        for (handler, backup) in handlers.iter().zip(&backups) {
            handler.restore(document, backup);
        }
        Ok(())
    }
}

/// Markup without `fx:controller` on the root and without script bodies or
/// sources. The element structure is unchanged.
fn strip_runtime_artifacts(text: &str) -> DomResult<String> {
    let mut glue = fxom_glue::parse(text)?;
    if let Some(root) = glue.root() {
        if let Some(element) = glue.element_mut(root) {
            element.remove_attribute("fx:controller");
        }
        let scripts: Vec<_> = glue
            .descendants(root)
            .into_iter()
            .filter(|&id| glue.tag_name(id) == Some("fx:script"))
            .collect();
        for script in scripts {
            if let Some(element) = glue.element_mut(script) {
                element.remove_attribute("source");
            }
            if matches!(glue.content_text(script), Some(content) if !content.is_empty()) {
                glue.set_content_text(script, "");
            }
        }
    }
    Ok(fxom_glue::serialize(&glue))
}

fn dump_markup(text: &str) -> Option<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("fxom-refresh-")
        .suffix(".fxml")
        .tempfile()
        .map_err(|e| warn!(error = %e, "could not create dump file"))
        .ok()?;
    file.write_all(text.as_bytes()).ok()?;
    let (_, path) = file.keep().ok()?;
    Some(path)
}

type Pairs = Vec<(ObjectId, ObjectId)>;

/// Pair every live node with its transient counterpart, or explain the first
/// mismatch
fn check(live: &Document, transient: &Document) -> Result<Pairs, String> {
    let mut pairs = Vec::new();
    match (live.root(), transient.root()) {
        (None, None) => {}
        (Some(a), Some(b)) => check_object(live, a, transient, b, &mut pairs)?,
        (a, b) => {
            return Err(format!(
                "root presence differs (live: {}, reloaded: {})",
                a.is_some(),
                b.is_some()
            ))
        }
    }
    Ok(pairs)
}

fn glue_kind(document: &Document, object: ObjectId) -> &'static str {
    match document.glue().node(document.object(object).glue()).data() {
        GlueData::Element(_) => "element",
        GlueData::Characters(_) | GlueData::CData(_) => "text",
        GlueData::Comment(_) => "comment",
        _ => "other",
    }
}

fn check_object(
    live: &Document,
    a: ObjectId,
    transient: &Document,
    b: ObjectId,
    pairs: &mut Pairs,
) -> Result<(), String> {
    let (kind_a, kind_b) = (live.object(a).kind(), transient.object(b).kind());
    if kind_a.label() != kind_b.label() {
        return Err(format!("{:?} is a {} but reloads as a {}", a, kind_a.label(), kind_b.label()));
    }
    if kind_a.declared_class() != kind_b.declared_class() {
        return Err(format!(
            "{:?} declares {:?} but reloads as {:?}",
            a,
            kind_a.declared_class(),
            kind_b.declared_class()
        ));
    }
    if glue_kind(live, a) != glue_kind(transient, b) {
        return Err(format!("{:?} changed markup kind", a));
    }
    pairs.push((a, b));

    if let (Some(props_a), Some(props_b)) = (kind_a.properties(), kind_b.properties()) {
        if !props_a.keys().eq(props_b.keys()) {
            return Err(format!(
                "{:?} has properties {:?} but reloads with {:?}",
                a,
                props_a.keys().map(ToString::to_string).collect::<Vec<_>>(),
                props_b.keys().map(ToString::to_string).collect::<Vec<_>>()
            ));
        }
        for (pa, pb) in props_a.values().zip(props_b.values()) {
            check_property(live, *pa, transient, *pb, pairs)?;
        }
    }
    if let (Some(items_a), Some(items_b)) = (kind_a.items(), kind_b.items()) {
        if items_a.len() != items_b.len() {
            return Err(format!(
                "{:?} has {} items but reloads with {}",
                a,
                items_a.len(),
                items_b.len()
            ));
        }
        for (ia, ib) in items_a.iter().zip(items_b) {
            check_object(live, *ia, transient, *ib, pairs)?;
        }
    }
    Ok(())
}

fn check_property(
    live: &Document,
    a: PropertyId,
    transient: &Document,
    b: PropertyId,
    pairs: &mut Pairs,
) -> Result<(), String> {
    let (node_a, node_b) = (live.property(a), transient.property(b));
    let (values_a, values_b) = (node_a.values(), node_b.values());
    // An empty complex property reads back as empty text.
    if values_a.is_empty() && values_b.is_empty() {
        return Ok(());
    }
    if node_a.kind().is_text() != node_b.kind().is_text() || values_a.len() != values_b.len() {
        return Err(format!(
            "property '{}' holds {} values but reloads with {}",
            node_a.name(),
            values_a.len(),
            values_b.len()
        ));
    }
    for (va, vb) in values_a.iter().zip(values_b) {
        check_object(live, *va, transient, *vb, pairs)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyName;
    use crate::test_support::load;

    #[test]
    fn test_refresh_after_edit_updates_live_values() {
        let mut document = load(
            r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <Button fx:id="ok" text="OK"/>
</VBox>"#,
        );
        let ok = document.search_with_fx_id("ok").unwrap();
        let text = document.property_named(ok, &PropertyName::new("text")).unwrap();

        document.begin_update();
        document.set_property_value(text, "Go").unwrap();
        let label = document.new_instance("Label");
        let children = document
            .property_named(document.root().unwrap(), &PropertyName::new("children"))
            .unwrap();
        document.add_to_parent_property(label, children, None);
        document.end_update().unwrap();

        let live = document.scene_graph_object(ok).and_then(|v| v.as_object()).unwrap();
        assert_eq!(live.get("text"), Some(LiveValue::String("Go".into())));
        assert!(document.scene_graph_object(label).is_some());
    }

    #[test]
    fn test_external_value_survives_refresh() {
        let mut document = load("<Gizmo/>");
        let root = document.root().unwrap();
        assert!(document.scene_graph_object(root).is_none());
        document.set_scene_graph_object(root, Some(LiveValue::String("host".into())));
        document.refresh().unwrap();
        assert_eq!(document.scene_graph_object(root), Some(LiveValue::String("host".into())));
        assert!(document.unresolved_classes().contains("Gizmo"));
    }

    #[test]
    fn test_tab_selection_survives_refresh() {
        let mut document = load(
            r#"<?import javafx.scene.control.*?>
<TabPane>
    <Tab text="One"/>
    <Tab text="Two"/>
</TabPane>"#,
        );
        let root = document.root().unwrap();
        let before = document.scene_graph_root().and_then(|v| v.as_object()).unwrap();
        before.set_state(TabPaneSelectionHandler::STATE, LiveValue::Integer(1));

        document.refresh().unwrap();

        let after = document.scene_graph_object(root).and_then(|v| v.as_object()).unwrap();
        assert!(!after.ptr_eq(&before));
        assert_eq!(after.state(TabPaneSelectionHandler::STATE), Some(LiveValue::Integer(1)));
    }

    #[test]
    fn test_strip_runtime_artifacts_keeps_structure() {
        let stripped = strip_runtime_artifacts(
            "<VBox fx:controller=\"a.B\">\n    <fx:script source=\"x.js\"/>\n</VBox>",
        )
        .unwrap();
        assert_eq!(stripped, "<VBox>\n    <fx:script/>\n</VBox>");
    }
}
