mod common;

use std::collections::BTreeSet;

use common::{all_fx_ids, load, shape};
use fxom_dom::nodes::reference_sites;
use fxom_dom::{Document, ObjectId, PropertyName};

fn children(document: &Document, object: ObjectId) -> fxom_dom::PropertyId {
    document
        .property_named(object, &PropertyName::new("children"))
        .unwrap()
}

fn assert_unique_ids(document: &Document) {
    let ids = all_fx_ids(document);
    let unique: BTreeSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate identifiers in {:?}", ids);
}

/// Every reference below `scope` names an object of the document
fn assert_closed(document: &Document, scope: ObjectId) {
    for site in reference_sites(document, scope) {
        let target = site.target(document).unwrap();
        assert!(
            document.search_with_fx_id(&target).is_some(),
            "dangling reference to {}",
            target
        );
    }
}

const ROW: &str = r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox xmlns:fx="http://javafx.com/fxml/1">
    <HBox fx:id="row">
        <Button fx:id="ok" text="OK"/>
        <Label fx:id="caption" labelFor="$ok"/>
    </HBox>
</VBox>"#;

#[test]
fn test_clone_renames_colliding_identifiers() {
    let mut document = load(ROW);
    let root = document.root().unwrap();
    let row = document.search_with_fx_id("row").unwrap();

    document.begin_update();
    let copy = document.clone_object(row, false);
    let children = children(&document, root);
    document.add_to_parent_property(copy, children, None);
    document.end_update().unwrap();

    assert_eq!(document.fx_id(copy).as_deref(), Some("row1"));
    assert_unique_ids(&document);
    assert_closed(&document, root);

    let text = document.glue_text();
    assert!(text.contains(
        "    <HBox fx:id=\"row1\">\n        <Button fx:id=\"ok1\" text=\"OK\"/>\n        <Label fx:id=\"caption1\" labelFor=\"$ok1\"/>\n    </HBox>\n</VBox>"
    ));
    // The copy's live label points at the copied button.
    let ok1 = document.search_with_fx_id("ok1").unwrap();
    let caption1 = document.search_with_fx_id("caption1").unwrap();
    let label = document.scene_graph_object(caption1).and_then(|v| v.as_object()).unwrap();
    assert!(label
        .get("labelFor")
        .unwrap()
        .same_object(&document.scene_graph_object(ok1).unwrap()));
}

#[test]
fn test_clone_pulls_strong_references_and_drops_weak_ones() {
    let mut document = load(
        r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <fx:define>
        <Tooltip fx:id="tip" text="Hint"/>
    </fx:define>
    <Button fx:id="b">
        <tooltip>
            <fx:reference source="tip"/>
        </tooltip>
    </Button>
    <Label fx:id="l" labelFor="$b"/>
</VBox>"#,
    );
    let root = document.root().unwrap();
    let button = document.search_with_fx_id("b").unwrap();
    let label = document.search_with_fx_id("l").unwrap();

    let button_copy = document.clone_object(button, false);
    let label_copy = document.clone_object(label, false);
    let children = children(&document, root);
    document.add_to_parent_property(button_copy, children, None);
    document.add_to_parent_property(label_copy, children, None);

    assert_eq!(
        shape(&document, button_copy),
        "instance:javafx.scene.control.Button#b1 tooltip=[instance:javafx.scene.control.Tooltip#tip1 text=\"Hint\"]"
    );
    assert_eq!(shape(&document, label_copy), "instance:javafx.scene.control.Label#l1");
    assert_unique_ids(&document);
    assert_closed(&document, root);
    document.refresh().unwrap();
}

#[test]
fn test_clone_keeps_top_level_identifier_when_asked() {
    let mut document = load(ROW);
    let row = document.search_with_fx_id("row").unwrap();
    let copy = document.clone_object(row, true);
    assert_eq!(document.fx_id(copy).as_deref(), Some("row"));
    let inner: Vec<String> = document
        .descendants(copy)
        .into_iter()
        .skip(1)
        .filter_map(|object| document.fx_id(object))
        .collect();
    assert_eq!(inner, vec!["ok1".to_string(), "caption1".to_string()]);
}

#[test]
fn test_clone_across_documents() {
    let source = load(ROW);
    let mut target = load(
        r#"<?import javafx.scene.layout.VBox?>
<VBox xmlns:fx="http://javafx.com/fxml/1">
    <VBox fx:id="ok"/>
</VBox>"#,
    );
    let row = source.search_with_fx_id("row").unwrap();
    let root = target.root().unwrap();

    let copy = target.clone_from(&source, row, false);
    let children = children(&target, root);
    target.add_to_parent_property(copy, children, None);

    // Only the colliding identifier changes.
    assert_eq!(target.fx_id(copy).as_deref(), Some("row"));
    let ids = all_fx_ids(&target);
    assert_eq!(ids, vec!["ok", "row", "ok1", "caption"]);
    assert_closed(&target, root);

    // Classes used by the copy were imported.
    let text = target.glue_text();
    assert!(text.contains("<?import javafx.scene.layout.HBox?>"));
    assert!(text.contains("<?import javafx.scene.control.Button?>"));
    assert!(text.contains("<?import javafx.scene.control.Label?>"));
    target.refresh().unwrap();
    assert!(target.scene_graph_object(copy).is_some());
}

#[test]
fn test_clone_with_repeated_copies_keeps_identifiers_unique() {
    let mut document = load(
        r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox xmlns:fx="http://javafx.com/fxml/1">
    <fx:define>
        <HBox fx:id="tpl">
            <Label fx:id="inner"/>
        </HBox>
    </fx:define>
    <VBox fx:id="box">
        <fx:copy source="tpl"/>
        <fx:copy source="tpl"/>
    </VBox>
</VBox>"#,
    );
    let root = document.root().unwrap();
    let b = document.search_with_fx_id("box").unwrap();

    document.begin_update();
    let copy = document.clone_object(b, false);
    let children = children(&document, root);
    document.add_to_parent_property(copy, children, None);
    document.end_update().unwrap();

    assert_unique_ids(&document);
    assert_closed(&document, root);
    assert_eq!(
        all_fx_ids(&document),
        vec!["tpl", "inner", "box", "box1", "inner1", "inner2"]
    );
}
