//! Class-loading context handed to every document: catalog, resource bundle
//! and the injected extension lists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::assets::{ExtensionAssetLoader, FileAssetLoader};
use crate::catalog::{ClassCatalog, ImportSet, StaticCatalog};
use crate::normalizer::{Normalizer, ReferenceExpressionNormalizer};
use crate::refresher::{AccordionExpansionHandler, TabPaneSelectionHandler, TransientStateHandler};

/// Returned for locations that cannot be resolved, so evaluation never sees
/// an absent URL.
pub const PLACEHOLDER_RESOURCE_URL: &str = "file:///fxom-unresolved-resource";

/// Key to text lookup used by `%key` values
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ResourceBundle {
    entries: BTreeMap<String, String>,
}

impl ResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }
}

/// Property names that denote associations rather than ownership,
/// independently of the catalog's own `weak` flags.
#[derive(Debug, Clone)]
pub struct WeakPropertyRegistry {
    names: BTreeSet<String>,
}

impl Default for WeakPropertyRegistry {
    fn default() -> Self {
        Self {
            names: ["toggleGroup", "labelFor", "expandedPane"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl WeakPropertyRegistry {
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Pluggable behavior, constructed by the host and handed to documents
pub struct Extensions {
    pub normalizers: Vec<Box<dyn Normalizer>>,
    pub state_handlers: Vec<Box<dyn TransientStateHandler>>,
    pub weak_properties: WeakPropertyRegistry,
    pub asset_loaders: Vec<Box<dyn FileAssetLoader>>,
}

impl Default for Extensions {
    fn default() -> Self {
        Self {
            normalizers: vec![Box::new(ReferenceExpressionNormalizer)],
            state_handlers: vec![
                Box::new(TabPaneSelectionHandler),
                Box::new(AccordionExpansionHandler),
            ],
            weak_properties: WeakPropertyRegistry::default(),
            asset_loaders: vec![Box::new(ExtensionAssetLoader)],
        }
    }
}

impl Extensions {
    pub fn empty() -> Self {
        Self {
            normalizers: Vec::new(),
            state_handlers: Vec::new(),
            weak_properties: WeakPropertyRegistry::empty(),
            asset_loaders: Vec::new(),
        }
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("normalizers", &self.normalizers)
            .field("state_handlers", &self.state_handlers)
            .field("weak_properties", &self.weak_properties)
            .field("asset_loaders", &self.asset_loaders.len())
            .finish()
    }
}

#[derive(Debug)]
pub struct ClassLoadingContext {
    pub catalog: Rc<dyn ClassCatalog>,
    pub resources: ResourceBundle,
    pub extensions: Extensions,
}

impl ClassLoadingContext {
    pub fn new(catalog: Rc<dyn ClassCatalog>) -> Self {
        Self {
            catalog,
            resources: ResourceBundle::new(),
            extensions: Extensions::default(),
        }
    }

    pub fn with_resources(mut self, resources: ResourceBundle) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

impl Default for ClassLoadingContext {
    fn default() -> Self {
        Self::new(Rc::new(StaticCatalog::new()))
    }
}

/// Class loader used while building a document. Lookups that fail are
/// recorded instead of aborting the load.
#[derive(Debug)]
pub struct TransientClassLoader<'a> {
    context: &'a ClassLoadingContext,
    imports: ImportSet,
    unresolved: BTreeSet<String>,
}

impl<'a> TransientClassLoader<'a> {
    pub fn new(context: &'a ClassLoadingContext, imports: ImportSet) -> Self {
        Self {
            context,
            imports,
            unresolved: BTreeSet::new(),
        }
    }

    pub fn context(&self) -> &'a ClassLoadingContext {
        self.context
    }

    pub fn catalog(&self) -> &'a dyn ClassCatalog {
        self.context.catalog.as_ref()
    }

    pub fn load_class(&mut self, tag: &str) -> Option<String> {
        let resolved = self.imports.resolve(tag, self.catalog());
        if resolved.is_none() && self.unresolved.insert(tag.to_string()) {
            warn!(class = tag, "unresolved class");
        }
        resolved
    }

    /// Resolve `path` against the document location, or the placeholder URL
    pub fn resource_url(&self, location: Option<&Url>, path: &str) -> Url {
        resolve_location(location, path).unwrap_or_else(placeholder_url)
    }

    pub fn into_unresolved(self) -> BTreeSet<String> {
        self.unresolved
    }
}

pub fn resolve_location(location: Option<&Url>, path: &str) -> Option<Url> {
    match location {
        Some(base) => base.join(path).ok(),
        None => Url::parse(path).ok(),
    }
}

pub fn placeholder_url() -> Url {
    Url::parse(PLACEHOLDER_RESOURCE_URL).unwrap_or_else(|_| unreachable!("constant URL parses"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClassDescriptor;

    #[test]
    fn test_unresolved_classes_are_recorded_once() {
        let catalog = StaticCatalog::new().with_class(ClassDescriptor::new("a.b.Known"));
        let context = ClassLoadingContext::new(Rc::new(catalog));
        let mut loader = TransientClassLoader::new(&context, ImportSet::new(vec!["a.b.*".into()]));
        assert_eq!(loader.load_class("Known").as_deref(), Some("a.b.Known"));
        assert_eq!(loader.load_class("Gadget"), None);
        assert_eq!(loader.load_class("Gadget"), None);
        let unresolved = loader.into_unresolved();
        assert_eq!(unresolved.len(), 1);
        assert!(unresolved.contains("Gadget"));
    }

    #[test]
    fn test_resource_url_falls_back_to_placeholder() {
        let context = ClassLoadingContext::default();
        let loader = TransientClassLoader::new(&context, ImportSet::default());
        assert_eq!(loader.resource_url(None, "img.png").as_str(), PLACEHOLDER_RESOURCE_URL);
        let base = Url::parse("file:///ui/main.fxml").unwrap();
        assert_eq!(
            loader.resource_url(Some(&base), "img/logo.png").as_str(),
            "file:///ui/img/logo.png"
        );
    }

    #[test]
    fn test_default_weak_registry() {
        let registry = WeakPropertyRegistry::default();
        assert!(registry.contains("toggleGroup"));
        assert!(registry.contains("labelFor"));
        assert!(!registry.contains("children"));
    }
}
