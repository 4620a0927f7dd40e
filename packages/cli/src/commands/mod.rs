pub mod assets;
pub mod check;
pub mod inspect;
pub mod save;

pub use assets::{assets, AssetsArgs};
pub use check::{check, CheckArgs};
pub use inspect::{inspect, InspectArgs};
pub use save::{save, SaveArgs};

use anyhow::{anyhow, Result};
use fxom_dom::{ClassLoadingContext, Document, DomError, LoadOptions};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::WalkDir;

/// `input` itself when it is a file, otherwise every `.fxml` file below it
pub fn find_fxml_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "fxml").unwrap_or(false) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();

    Ok(files)
}

/// Load a document, rendering format errors against the source text
pub fn load_document(path: &Path, context: Rc<ClassLoadingContext>) -> Result<Document> {
    match Document::from_path(path, context, &LoadOptions::normalized()) {
        Ok(document) => Ok(document),
        Err(DomError::Format(err)) => {
            let source = std::fs::read_to_string(path)?;
            Err(anyhow!(
                "{}",
                fxom_glue::format_error(&source, &path.to_string_lossy(), &err)
            ))
        }
        Err(err) => Err(err.into()),
    }
}
