//! # Class Catalog
//!
//! Read-only lookup service describing the classes a document may declare:
//! their properties, default property, static properties, constants and
//! literal form. The host supplies the catalog; [`StaticCatalog`] is the
//! JSON-configured implementation.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DomResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Boolean,
    Integer,
    Double,
    Object,
    List,
    Map,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    /// Association rather than ownership (e.g. `toggleGroup`)
    #[serde(default)]
    pub weak: bool,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDescriptor {
    /// Fully qualified name
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub default_property: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDescriptor>,
    #[serde(default)]
    pub static_properties: BTreeMap<String, PropertyDescriptor>,
    #[serde(default)]
    pub constants: BTreeMap<String, serde_json::Value>,
    /// Instances are lists (their children are items)
    #[serde(default)]
    pub collection: bool,
    /// Type of the value built from `fx:value`
    #[serde(default)]
    pub literal: Option<ValueType>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn package(&self) -> &str {
        package_of(&self.name)
    }
}

pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

pub fn package_of(qualified: &str) -> &str {
    qualified.rsplit_once('.').map(|(package, _)| package).unwrap_or("")
}

/// Lookup service consumed by the loader, saver and structural algorithms
pub trait ClassCatalog: Debug {
    fn class(&self, qualified: &str) -> Option<&ClassDescriptor>;

    /// Chain of descriptors from `qualified` up through its superclasses
    fn lineage(&self, qualified: &str) -> Vec<&ClassDescriptor> {
        let mut chain = Vec::new();
        let mut current = self.class(qualified);
        while let Some(descriptor) = current {
            if chain.iter().any(|c: &&ClassDescriptor| c.name == descriptor.name) {
                break;
            }
            chain.push(descriptor);
            current = descriptor.superclass.as_deref().and_then(|s| self.class(s));
        }
        chain
    }

    fn property(&self, class: &str, name: &str) -> Option<&PropertyDescriptor> {
        self.lineage(class)
            .into_iter()
            .find_map(|descriptor| descriptor.properties.get(name))
    }

    fn static_property(&self, residence_class: &str, name: &str) -> Option<&PropertyDescriptor> {
        self.lineage(residence_class)
            .into_iter()
            .find_map(|descriptor| descriptor.static_properties.get(name))
    }

    fn default_property(&self, class: &str) -> Option<&str> {
        self.lineage(class)
            .into_iter()
            .find_map(|descriptor| descriptor.default_property.as_deref())
    }

    fn is_collection(&self, class: &str) -> bool {
        self.lineage(class).iter().any(|descriptor| descriptor.collection)
    }

    fn constant(&self, class: &str, name: &str) -> Option<&serde_json::Value> {
        self.lineage(class)
            .into_iter()
            .find_map(|descriptor| descriptor.constants.get(name))
    }

    fn literal_type(&self, class: &str) -> Option<ValueType> {
        self.lineage(class)
            .into_iter()
            .find_map(|descriptor| descriptor.literal)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    classes: Vec<ClassDescriptor>,
}

/// Catalog backed by an in-memory class table
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `{ "classes": [ ... ] }`
    pub fn from_json(text: &str) -> DomResult<Self> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Ok(file.classes.into_iter().collect())
    }

    pub fn from_path(path: &Path) -> DomResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn insert(&mut self, descriptor: ClassDescriptor) {
        self.classes.insert(descriptor.name.clone(), descriptor);
    }

    pub fn with_class(mut self, descriptor: ClassDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<ClassDescriptor> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = ClassDescriptor>>(iter: I) -> Self {
        let mut catalog = StaticCatalog::new();
        for descriptor in iter {
            catalog.insert(descriptor);
        }
        catalog
    }
}

impl ClassCatalog for StaticCatalog {
    fn class(&self, qualified: &str) -> Option<&ClassDescriptor> {
        self.classes.get(qualified)
    }
}

/// Class-name imports declared by a document's `<?import?>` instructions.
/// `java.lang.*` is always in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    entries: Vec<String>,
}

impl ImportSet {
    pub fn new(entries: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Fully qualified class for a tag name, if the catalog knows it
    pub fn resolve(&self, tag: &str, catalog: &dyn ClassCatalog) -> Option<String> {
        if tag.contains('.') {
            return catalog.class(tag).map(|c| c.name.clone());
        }
        let suffix = format!(".{}", tag);
        for entry in &self.entries {
            if let Some(package) = entry.strip_suffix(".*") {
                let candidate = format!("{}.{}", package, tag);
                if catalog.class(&candidate).is_some() {
                    return Some(candidate);
                }
            } else if entry.ends_with(&suffix) && catalog.class(entry).is_some() {
                return Some(entry.clone());
            }
        }
        let fallback = format!("java.lang.{}", tag);
        catalog.class(&fallback).map(|c| c.name.clone())
    }

    /// Whether `qualified` is reachable by its simple name
    pub fn covers(&self, qualified: &str) -> bool {
        let package = package_of(qualified);
        package == "java.lang"
            || self.entries.iter().any(|entry| {
                entry == qualified || entry.strip_suffix(".*") == Some(package)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_json(
            r#"{
                "classes": [
                    { "name": "javafx.scene.Node", "properties": { "id": {} } },
                    { "name": "javafx.scene.layout.Pane", "superclass": "javafx.scene.Node",
                      "defaultProperty": "children",
                      "properties": { "children": { "type": "list" } } },
                    { "name": "javafx.scene.layout.VBox", "superclass": "javafx.scene.layout.Pane" },
                    { "name": "javafx.scene.control.RadioButton",
                      "properties": { "toggleGroup": { "type": "object", "weak": true } } },
                    { "name": "java.lang.String", "literal": "string" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_inherited_lookups() {
        let catalog = catalog();
        assert_eq!(catalog.default_property("javafx.scene.layout.VBox"), Some("children"));
        assert_eq!(
            catalog
                .property("javafx.scene.layout.VBox", "children")
                .map(|p| p.value_type),
            Some(ValueType::List)
        );
        assert!(catalog.property("javafx.scene.layout.VBox", "id").is_some());
        assert!(catalog
            .property("javafx.scene.control.RadioButton", "toggleGroup")
            .unwrap()
            .weak);
    }

    #[test]
    fn test_import_resolution() {
        let catalog = catalog();
        let imports = ImportSet::new(vec![
            "javafx.scene.layout.*".to_string(),
            "javafx.scene.control.RadioButton".to_string(),
        ]);
        assert_eq!(
            imports.resolve("VBox", &catalog).as_deref(),
            Some("javafx.scene.layout.VBox")
        );
        assert_eq!(
            imports.resolve("RadioButton", &catalog).as_deref(),
            Some("javafx.scene.control.RadioButton")
        );
        assert_eq!(imports.resolve("String", &catalog).as_deref(), Some("java.lang.String"));
        assert_eq!(imports.resolve("Gizmo", &catalog), None);
        assert!(imports.covers("javafx.scene.layout.Pane"));
        assert!(!imports.covers("javafx.scene.control.Button"));
    }

    #[test]
    fn test_bad_catalog_is_error() {
        assert!(StaticCatalog::from_json("{ \"classes\": 3 }").is_err());
    }
}
