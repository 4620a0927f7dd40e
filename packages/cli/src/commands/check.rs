use crate::commands::{find_fxml_files, load_document};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fxom_dom::{ClassLoadingContext, ErrorKind, ErrorReport};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Markup file or directory to check
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Class catalog (overrides config)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Show files without problems too
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Per-file outcome
enum Outcome {
    Failed,
    Loaded(ErrorReport),
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let context = config.context(cwd, args.catalog.as_deref())?;
    let files = find_fxml_files(&args.input)?;

    if args.format != "json" {
        println!("🔍 {} fxom check", "Starting".green().bold());
        println!("   Input: {}", args.input.display());
        println!("   Found {} .fxml files", files.len());
        println!();
    }

    let mut failed = 0;
    let mut problems = 0;
    for file in &files {
        match check_file(file, context.clone(), &args)? {
            Outcome::Failed => failed += 1,
            Outcome::Loaded(report) => problems += report.len(),
        }
    }

    if args.format != "json" {
        println!();
        println!(
            "✨ {} Check complete!",
            if failed > 0 {
                "Done".red().bold()
            } else {
                "Done".green().bold()
            }
        );
        println!("   Files checked: {}", files.len());
        if failed > 0 {
            println!("   {} {}", "Failed to load:".red(), failed);
        }
        if problems > 0 {
            println!("   {} {}", "Unresolved:".yellow(), problems);
        }
        if failed == 0 && problems == 0 {
            println!("   {} No issues found!", "✓".green());
        }
    }

    // Unresolved content still loads; only malformed files fail the run.
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn check_file(file: &Path, context: Rc<ClassLoadingContext>, args: &CheckArgs) -> Result<Outcome> {
    let document = match load_document(file, context) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("{} {}", "✗".red(), file.display());
            eprintln!("{}", err);
            return Ok(Outcome::Failed);
        }
    };
    let report = ErrorReport::build(&document);

    if args.format == "json" {
        let json = serde_json::json!({
            "file": file.display().to_string(),
            "entries": report.entries,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(Outcome::Loaded(report));
    }

    if report.is_empty() {
        if args.verbose {
            println!("{} {}", "✓".green(), file.display());
        }
        return Ok(Outcome::Loaded(report));
    }

    println!("{}", file.display());
    for entry in &report.entries {
        let subject = document
            .fx_id(entry.object)
            .map(|id| format!("#{}", id))
            .or_else(|| document.tag_name(entry.object).map(|tag| format!("<{}>", tag)))
            .unwrap_or_default();
        println!("  {} {} {}", "warning".yellow().bold(), describe(&entry.kind), subject.dimmed());
    }
    println!();

    Ok(Outcome::Loaded(report))
}

fn describe(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::UnresolvedClass(class) => format!("unresolved class '{}'", class),
        ErrorKind::UnresolvedReference(id) => format!("unresolved reference '{}'", id),
        ErrorKind::UnresolvedLocation(path) => format!("unresolved location '{}'", path),
        ErrorKind::UnresolvedResource(key) => format!("missing resource '{}'", key),
        ErrorKind::UnsupportedExpression(text) => format!("unsupported expression '{}'", text),
    }
}
