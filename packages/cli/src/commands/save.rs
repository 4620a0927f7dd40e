use crate::commands::{find_fxml_files, load_document};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use fxom_dom::SaveOptions;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Markup file or directory to re-save
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Class catalog (overrides config)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Output directory (files are rewritten in place otherwise)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Print to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,

    /// Collapse imports to package wildcards
    #[arg(long)]
    pub wildcard: bool,

    /// Runtime version written into the default namespace
    #[arg(long)]
    pub runtime_version: Option<String>,
}

pub fn save(args: SaveArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let context = config.context(cwd, args.catalog.as_deref())?;
    let options = save_options(&config, &args);
    let files = find_fxml_files(&args.input)?;

    if files.is_empty() {
        println!("{}", "⚠️  No .fxml files found".yellow());
        return Ok(());
    }

    let base = if args.input.is_dir() {
        args.input.clone()
    } else {
        args.input.parent().map(Path::to_path_buf).unwrap_or_default()
    };

    let mut rewritten = 0;
    let mut errors = 0;
    for file in &files {
        let relative = file.strip_prefix(&base).unwrap_or(file);
        let mut document = match load_document(file, context.clone()) {
            Ok(document) => document,
            Err(err) => {
                errors += 1;
                eprintln!("  {} {} - {}", "✗".red(), relative.display(), err);
                continue;
            }
        };
        let original = document.glue_text();
        let text = document.fxml_text(&options);

        if args.stdout {
            print!("{}", text);
            continue;
        }

        let target = match &args.out_dir {
            Some(out_dir) => out_dir.join(relative),
            None => file.clone(),
        };
        if text == original && target == *file {
            println!("  {} {} (unchanged)", "·".dimmed(), relative.display());
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &text)?;
        rewritten += 1;
        println!("  {} {} → {}", "✓".green(), relative.display(), target.display());
    }

    if !args.stdout {
        println!();
        println!("{} {} files written", "✨".green(), rewritten);
    }

    if errors > 0 {
        return Err(anyhow!("{} files could not be loaded", errors));
    }

    Ok(())
}

/// Config defaults, overridden by the command line
fn save_options(config: &Config, args: &SaveArgs) -> SaveOptions {
    let mut options = config.save.clone();
    if args.wildcard {
        options.wildcard_imports = true;
    }
    if let Some(version) = &args.runtime_version {
        options.runtime_version = version.clone();
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &Path) -> SaveArgs {
        SaveArgs {
            input: input.to_path_buf(),
            catalog: None,
            out_dir: None,
            stdout: false,
            wildcard: false,
            runtime_version: None,
        }
    }

    #[test]
    fn test_command_line_overrides_config() {
        let config: Config = serde_json::from_str(r#"{ "save": { "runtimeVersion": "17" } }"#).unwrap();
        let mut args = args(Path::new("."));
        assert_eq!(save_options(&config, &args).runtime_version, "17");

        args.wildcard = true;
        args.runtime_version = Some("22".to_string());
        let options = save_options(&config, &args);
        assert!(options.wildcard_imports);
        assert_eq!(options.runtime_version, "22");
    }

    #[test]
    fn test_save_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("main.fxml"), "<Pane/>\n").unwrap();

        let mut args = args(&src);
        args.out_dir = Some(dir.path().join("out"));
        save(args, &cwd).unwrap();

        let written = fs::read_to_string(dir.path().join("out/main.fxml")).unwrap();
        assert!(written.contains("xmlns=\"http://javafx.com/javafx/21\""));
        assert!(written.contains("xmlns:fx=\"http://javafx.com/fxml/1\""));
        // Source untouched
        assert_eq!(fs::read_to_string(src.join("main.fxml")).unwrap(), "<Pane/>\n");
    }
}
