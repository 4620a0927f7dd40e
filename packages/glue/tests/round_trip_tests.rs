//! Round trips over realistic markup and edits across documents

use std::collections::BTreeMap;

use fxom_glue::{parse, serialize, GlueDocument, GlueId};

const SAMPLES: &[&str] = &[
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\n<?import javafx.scene.layout.*?>\n\n<VBox/>\n",
    r##"<!-- header -->
<?import javafx.scene.control.Button?>
<Button   text = 'Save &amp; exit'
        onAction="#save" >
</Button >
"##,
    "<Label>\r\n\t<text><![CDATA[<b>bold</b>]]></text>\r\n</Label>",
    r#"<!DOCTYPE fxml>
<GridPane hgap="4">
    <Label text="&quot;quoted&quot;" GridPane.rowIndex="0"/>

    <!-- spacer -->


    <TextField fx:id="name"/>
</GridPane>
<!-- trailing comment -->
"#,
    "<fx:root type=\"javafx.scene.layout.HBox\" xmlns:fx=\"http://javafx.com/fxml/1\"><fx:script>var a = 1 &lt; 2;</fx:script></fx:root>",
];

#[test]
fn test_samples_round_trip() {
    for sample in SAMPLES {
        let document = parse(sample).unwrap_or_else(|e| panic!("{}: {}", sample, e));
        assert_eq!(&serialize(&document), sample);
    }
}

fn first_element(document: &GlueDocument, parent: GlueId) -> GlueId {
    document.element_children(parent).next().unwrap()
}

#[test]
fn test_import_subtree_from_another_document() {
    let source = parse("<A>\n    <B x=\"1\">\n        <C/>\n    </B>\n</A>").unwrap();
    let mut target = parse("<Root>\n    <D/>\n</Root>").unwrap();
    let b = first_element(&source, source.root().unwrap());

    let mut map = BTreeMap::new();
    let copy = target.import_subtree(&source, b, &mut map);
    assert_eq!(map.len(), source.descendants(b).len());
    assert!(!target.is_attached(copy));

    let root = target.root().unwrap();
    target.insert_before(root, copy, None);
    assert_eq!(
        serialize(&target),
        "<Root>\n    <D/>\n    <B x=\"1\">\n        <C/>\n    </B>\n</Root>"
    );
    // The source is untouched.
    assert_eq!(
        serialize(&source),
        "<A>\n    <B x=\"1\">\n        <C/>\n    </B>\n</A>"
    );
}

#[test]
fn test_imported_subtree_is_reindented_when_nested_deeper() {
    let source = parse("<A>\n    <B x=\"1\">\n        <C/>\n    </B>\n</A>").unwrap();
    let mut target = parse("<Root>\n    <D/>\n</Root>").unwrap();
    let b = first_element(&source, source.root().unwrap());
    let d = first_element(&target, target.root().unwrap());

    let copy = target.import_subtree(&source, b, &mut BTreeMap::new());
    target.insert_before(d, copy, None);
    assert_eq!(
        serialize(&target),
        "<Root>\n    <D>\n        <B x=\"1\">\n            <C/>\n        </B>\n    </D>\n</Root>"
    );
}

#[test]
fn test_absorb_shifts_handles() {
    let mut target = parse("<Root>\n    <D/>\n</Root>").unwrap();
    let scratch = parse("<E>\n    <F/>\n</E>").unwrap();
    let scratch_root = scratch.root().unwrap();
    let before = target.len();

    let offset = target.absorb(scratch);
    assert_eq!(offset as usize, before);
    let e = scratch_root.offset(offset);
    assert_eq!(target.tag_name(e), Some("E"));
    assert_eq!(target.tag_name(first_element(&target, e)), Some("F"));

    let root = target.root().unwrap();
    target.insert_before(root, e, None);
    assert_eq!(
        serialize(&target),
        "<Root>\n    <D/>\n    <E>\n        <F/>\n    </E>\n</Root>"
    );
}
