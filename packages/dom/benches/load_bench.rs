use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fxom_dom::{ClassLoadingContext, Document, LoadOptions, SaveOptions, StaticCatalog};

fn context() -> Rc<ClassLoadingContext> {
    let catalog = StaticCatalog::from_json(include_str!("../tests/fixtures/catalog.json")).unwrap();
    ClassLoadingContext::new(Rc::new(catalog)).shared()
}

fn form(rows: usize) -> String {
    let mut text = String::from(
        "<?import javafx.geometry.Insets?>\n\
         <?import javafx.scene.control.*?>\n\
         <?import javafx.scene.layout.*?>\n\n\
         <VBox xmlns=\"http://javafx.com/javafx/21\" xmlns:fx=\"http://javafx.com/fxml/1\" spacing=\"8\">\n\
         \x20   <padding>\n\
         \x20       <Insets top=\"10\" left=\"10\"/>\n\
         \x20   </padding>\n\
         \x20   <GridPane hgap=\"4\" vgap=\"4\">\n",
    );
    for row in 0..rows {
        text.push_str(&format!(
            "        <Label fx:id=\"label{row}\" text=\"Field {row}\" labelFor=\"$field{row}\" GridPane.rowIndex=\"{row}\"/>\n\
             \x20       <TextField fx:id=\"field{row}\" GridPane.rowIndex=\"{row}\" GridPane.columnIndex=\"1\"/>\n"
        ));
    }
    text.push_str("    </GridPane>\n    <Button fx:id=\"ok\" text=\"OK\" defaultButton=\"true\"/>\n</VBox>\n");
    text
}

fn load_small_form(c: &mut Criterion) {
    let context = context();
    let source = form(5);

    c.bench_function("load_small_form", |b| {
        b.iter(|| Document::load(black_box(&source), None, context.clone(), &LoadOptions::default()))
    });
}

fn load_large_form(c: &mut Criterion) {
    let context = context();
    let source = form(200);

    c.bench_function("load_large_form", |b| {
        b.iter(|| Document::load(black_box(&source), None, context.clone(), &LoadOptions::default()))
    });
}

fn save_large_form(c: &mut Criterion) {
    let context = context();
    let source = form(200);
    let mut document = Document::load(&source, None, context, &LoadOptions::default()).unwrap();
    let options = SaveOptions::default();

    c.bench_function("save_large_form", |b| {
        b.iter(|| black_box(document.fxml_text(&options)))
    });
}

fn clone_large_form(c: &mut Criterion) {
    let context = context();
    let source = form(200);
    let document = Document::load(&source, None, context.clone(), &LoadOptions::default()).unwrap();
    let mut target = Document::load(&source, None, context, &LoadOptions::default()).unwrap();
    let grid = document.search_with_fx_id("label0").and_then(|label| document.parent_object(label)).unwrap();

    c.bench_function("clone_large_form", |b| {
        b.iter(|| black_box(target.clone_from(&document, grid, false)))
    });
}

criterion_group!(
    benches,
    load_small_form,
    load_large_form,
    save_large_form,
    clone_large_form
);
criterion_main!(benches);
