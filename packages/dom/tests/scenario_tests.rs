//! End-to-end scenarios: load, edit, save

mod common;

use common::{context, load};
use fxom_dom::nodes::{collect_references, expression_reference, is_weak_reference, ReferenceSite};
use fxom_dom::{Document, LoadOptions, PropertyName, SaveOptions};

#[test]
fn test_load_edit_save() {
    let source = r#"<?import javafx.scene.control.Button?>
<?import javafx.scene.control.Label?>
<?import javafx.scene.layout.VBox?>

<VBox xmlns="http://javafx.com/javafx/21" xmlns:fx="http://javafx.com/fxml/1">
    <Button fx:id="ok">
        <text>
            <String fx:value="OK"/>
        </text>
    </Button>
    <Label labelFor="$ok"/>
</VBox>
"#;
    let mut document = load(source);
    let root = document.root().unwrap();
    let button = document.search_with_fx_id("ok").unwrap();
    assert_eq!(document.property_text(button, "text"), Some("OK"));

    document.begin_update();
    for site in collect_references(&document, root, "ok") {
        match site {
            ReferenceSite::Expression(property) => document.remove_property(property),
            ReferenceSite::Intrinsic(object) => document.remove_from_parent(object),
        }
    }
    document.remove_from_parent(button);
    document.end_update().unwrap();

    let saved = document.fxml_text(&SaveOptions::default());
    assert!(!saved.contains("Button"));
    assert!(!saved.contains("$ok"));
    assert_eq!(
        saved,
        r#"<?import javafx.scene.control.Label?>
<?import javafx.scene.layout.VBox?>

<VBox xmlns="http://javafx.com/javafx/21" xmlns:fx="http://javafx.com/fxml/1">
    <Label/>
</VBox>
"#
    );
    assert!(document.search_with_fx_id("ok").is_none());
}

#[test]
fn test_reference_resolution() {
    let document = load(
        r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <fx:define>
        <ToggleGroup fx:id="group"/>
    </fx:define>
    <RadioButton fx:id="a" toggleGroup="$group"/>
    <RadioButton fx:id="b" toggleGroup="$group"/>
</VBox>"#,
    );
    let group = document.search_with_fx_id("group").unwrap();
    let group_live = document.scene_graph_object(group).unwrap();

    for radio in ["a", "b"] {
        let radio = document.search_with_fx_id(radio).unwrap();
        let property = document
            .property_named(radio, &PropertyName::new("toggleGroup"))
            .unwrap();
        assert!(is_weak_reference(&document, property));
        let target = expression_reference(&document, property).unwrap();
        assert_eq!(document.search_with_fx_id(&target), Some(group));

        let live = document.scene_graph_object(radio).and_then(|v| v.as_object()).unwrap();
        assert!(live.get("toggleGroup").unwrap().same_object(&group_live));
    }
}

#[test]
fn test_unresolved_type_tolerance() {
    let source = r#"<?import javafx.scene.layout.VBox?>

<VBox xmlns="http://javafx.com/javafx/21" xmlns:fx="http://javafx.com/fxml/1">
    <Gizmo fx:id="g" size="3">
        <com.acme.Part/>
    </Gizmo>
</VBox>
"#;
    let mut document = Document::load(source, None, context(), &LoadOptions::default()).unwrap();
    let gizmo = document.search_with_fx_id("g").unwrap();
    assert!(document.scene_graph_object(gizmo).is_none());
    assert_eq!(document.tag_name(gizmo), Some("Gizmo"));
    assert_eq!(document.property_text(gizmo, "size"), Some("3"));
    assert!(document.unresolved_classes().contains("Gizmo"));
    assert!(document.unresolved_classes().contains("com.acme.Part"));
    assert!(document.scene_graph_root().is_some());

    assert_eq!(document.fxml_text(&SaveOptions::default()), source);
}

#[test]
fn test_malformed_markup_fails_to_load() {
    let result = Document::load("<VBox>\n    <Button>\n</VBox>", None, context(), &LoadOptions::default());
    assert!(matches!(result, Err(fxom_dom::DomError::Format(_))));
}
