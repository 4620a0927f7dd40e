use std::rc::Rc;

use fxom_dom::{ClassLoadingContext, Document, LoadOptions, ObjectId, PropertyKind, StaticCatalog};

pub fn context() -> Rc<ClassLoadingContext> {
    let catalog = StaticCatalog::from_json(include_str!("../fixtures/catalog.json")).unwrap();
    ClassLoadingContext::new(Rc::new(catalog)).shared()
}

pub fn load(text: &str) -> Document {
    Document::load(text, None, context(), &LoadOptions::default()).unwrap()
}

/// Textual summary of a subtree: node kinds, classes, identifiers and
/// property values, without any glue formatting.
pub fn shape(document: &Document, object: ObjectId) -> String {
    let node = document.object(object);
    let mut out = format!(
        "{}:{}",
        node.kind().label(),
        node.kind().declared_class().unwrap_or("?")
    );
    if let Some(fx_id) = document.fx_id(object) {
        out.push_str(&format!("#{}", fx_id));
    }
    for property in document.properties_of(object) {
        let property = document.property(property);
        out.push_str(&format!(" {}=", property.name()));
        if let PropertyKind::Text { value, .. } = property.kind() {
            out.push_str(&format!("{:?}", value));
        }
        let values: Vec<String> = property.values().iter().map(|&v| shape(document, v)).collect();
        if !values.is_empty() {
            out.push_str(&format!("[{}]", values.join(", ")));
        }
    }
    if let Some(items) = node.kind().items() {
        let items: Vec<String> = items.iter().map(|&i| shape(document, i)).collect();
        out.push_str(&format!(" items[{}]", items.join(", ")));
    }
    out
}

/// Every `fx:id` in document order, duplicates included
pub fn all_fx_ids(document: &Document) -> Vec<String> {
    fxom_dom::nodes::depth_first_order(document)
        .into_iter()
        .filter_map(|object| document.fx_id(object))
        .collect()
}
