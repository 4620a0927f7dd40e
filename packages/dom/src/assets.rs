//! Index of the files a document refers to: `@` locations, included
//! documents and script sources.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::Serialize;
use url::Url;

use crate::context::resolve_location;
use crate::document::Document;
use crate::expression::{parse_expression, Expression};
use crate::model::{IntrinsicKind, ObjectId};
use crate::nodes::depth_first_order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Stylesheet,
    Font,
    Markup,
    Media,
    Script,
    Other,
}

/// Recognizes the kind of a referenced file
pub trait FileAssetLoader: Debug {
    /// `None` when the loader does not handle `url`
    fn classify(&self, url: &Url) -> Option<AssetKind>;
}

/// Classifies by file extension
#[derive(Debug)]
pub struct ExtensionAssetLoader;

impl FileAssetLoader for ExtensionAssetLoader {
    fn classify(&self, url: &Url) -> Option<AssetKind> {
        let (_, extension) = url.path().rsplit_once('.')?;
        let kind = match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" => AssetKind::Image,
            "css" | "bss" => AssetKind::Stylesheet,
            "ttf" | "otf" => AssetKind::Font,
            "fxml" => AssetKind::Markup,
            "mp3" | "mp4" | "wav" | "aac" | "m4a" | "flv" => AssetKind::Media,
            "js" | "groovy" | "py" | "rb" => AssetKind::Script,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// Path as written in the markup
    pub path: String,
    /// Resolved location, absent when the document has no location to
    /// resolve a relative path against
    pub url: Option<String>,
    pub kind: AssetKind,
    pub objects: Vec<ObjectId>,
    /// Whether the file exists, for `file:` locations
    pub exists: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetIndex {
    pub assets: Vec<AssetEntry>,
}

impl AssetIndex {
    pub fn build(document: &Document) -> Self {
        let mut references: BTreeMap<String, Vec<ObjectId>> = BTreeMap::new();
        for object in depth_first_order(document) {
            let source = match document.intrinsic_kind(object) {
                Some(IntrinsicKind::Include) => document.intrinsic_source(object),
                _ => document.script_source(object),
            };
            if let Some(source) = source {
                references.entry(source).or_default().push(object);
            }
            for property in document.properties_of(object) {
                let node = document.property(property);
                let Some(text) = node.kind().text() else {
                    continue;
                };
                if let Expression::Location(path) = parse_expression(&node.name().name, text) {
                    references.entry(path.to_string()).or_default().push(object);
                }
            }
        }

        let loaders = &document.context().extensions.asset_loaders;
        let assets = references
            .into_iter()
            .map(|(path, mut objects)| {
                objects.dedup();
                let url = resolve_location(document.location(), &path);
                let kind = url
                    .as_ref()
                    .and_then(|url| loaders.iter().find_map(|loader| loader.classify(url)))
                    .unwrap_or(AssetKind::Other);
                let exists = url
                    .as_ref()
                    .filter(|url| url.scheme() == "file")
                    .and_then(|url| url.to_file_path().ok())
                    .map(|path| path.exists());
                AssetEntry {
                    path,
                    url: url.map(String::from),
                    kind,
                    objects,
                    exists,
                }
            })
            .collect();
        Self { assets }
    }

    pub fn of_kind(&self, kind: AssetKind) -> impl Iterator<Item = &AssetEntry> {
        self.assets.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn missing(&self) -> impl Iterator<Item = &AssetEntry> {
        self.assets.iter().filter(|entry| entry.exists == Some(false))
    }
}
