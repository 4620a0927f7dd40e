use crate::commands::{find_fxml_files, load_document};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fxom_dom::{AssetEntry, AssetIndex};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AssetsArgs {
    /// Markup file or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Class catalog (overrides config)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Only list assets whose file does not exist
    #[arg(short, long)]
    pub missing: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn assets(args: AssetsArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let context = config.context(cwd, args.catalog.as_deref())?;
    let mut listing = Vec::new();

    for file in find_fxml_files(&args.input)? {
        let document = load_document(&file, context.clone())?;
        let index = AssetIndex::build(&document);
        let entries: Vec<AssetEntry> = if args.missing {
            index.missing().cloned().collect()
        } else {
            index.assets
        };
        listing.push((file, entries));
    }

    if args.json {
        let json: Vec<serde_json::Value> = listing
            .iter()
            .map(|(file, entries)| {
                serde_json::json!({
                    "file": file.display().to_string(),
                    "assets": entries,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for (file, entries) in &listing {
        if entries.is_empty() {
            continue;
        }
        println!("{}", file.display());
        for entry in entries {
            println!("  {}", format_entry(entry));
        }
        println!();
    }

    Ok(())
}

fn format_entry(entry: &AssetEntry) -> String {
    let marker = match entry.exists {
        Some(true) => "✓".green(),
        Some(false) => "✗".red(),
        None => "?".dimmed(),
    };
    let kind = format!("{:?}", entry.kind).to_lowercase();
    format!("{} {:<10} {}", marker, kind, entry.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxom_dom::AssetKind;

    #[test]
    fn test_format_entry() {
        colored::control::set_override(false);
        let entry = AssetEntry {
            path: "@logo.png".to_string(),
            url: None,
            kind: AssetKind::Image,
            objects: Vec::new(),
            exists: Some(false),
        };
        assert_eq!(format_entry(&entry), "✗ image      @logo.png");
    }
}
