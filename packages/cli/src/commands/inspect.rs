use crate::commands::load_document;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fxom_dom::{Document, ObjectId, ObjectKind};
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Markup file to inspect
    pub input: PathBuf,

    /// Class catalog (overrides config)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Show property values
    #[arg(short, long)]
    pub properties: bool,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let context = config.context(cwd, args.catalog.as_deref())?;
    let document = load_document(&args.input, context)?;

    println!("{} {}", "📄".dimmed(), args.input.display());
    print!("{}", render_tree(&document, args.properties));

    if !document.unresolved_classes().is_empty() {
        println!();
        println!("{}", "Unresolved classes:".yellow());
        for class in document.unresolved_classes() {
            println!("  {}", class);
        }
    }
    if document.scene_graph_root().is_none() && document.root().is_some() {
        println!();
        println!("{} the document has no live scene graph", "⚠️ ".yellow());
    }

    Ok(())
}

/// One line per object, indented by depth
pub fn render_tree(document: &Document, properties: bool) -> String {
    let mut out = String::new();
    if let Some(root) = document.root() {
        render_object(document, root, 1, properties, &mut out);
    }
    out
}

fn render_object(document: &Document, object: ObjectId, depth: usize, properties: bool, out: &mut String) {
    let indent = "  ".repeat(depth);
    let node = document.object(object);
    let name = match node.kind() {
        kind @ (ObjectKind::Instance { .. } | ObjectKind::Collection { .. }) => kind
            .declared_class()
            .map(String::from)
            .or_else(|| document.tag_name(object).map(|tag| format!("{}?", tag)))
            .unwrap_or_else(|| kind.label().to_string()),
        kind => document
            .tag_name(object)
            .map(String::from)
            .unwrap_or_else(|| format!("({})", kind.label())),
    };
    let _ = write!(out, "{}{}", indent, name);
    if let Some(fx_id) = document.fx_id(object) {
        let _ = write!(out, " #{}", fx_id);
    }
    out.push('\n');

    for property in document.properties_of(object) {
        let property = document.property(property);
        let values = property.values();
        match property.kind().text() {
            Some(text) if properties && values.is_empty() => {
                let _ = writeln!(out, "{}  .{} = {:?}", indent, property.name(), text);
            }
            _ if !values.is_empty() => {
                let _ = writeln!(out, "{}  .{}", indent, property.name());
                for &value in values {
                    render_object(document, value, depth + 2, properties, out);
                }
            }
            _ => {}
        }
    }
    if let Some(items) = node.kind().items() {
        for &item in items {
            render_object(document, item, depth + 1, properties, out);
        }
    }
}
