//! # Object Model Nodes
//!
//! Typed nodes layered over the glue tree. Objects and properties live in
//! arenas owned by [`crate::Document`] and are addressed with [`ObjectId`] and
//! [`PropertyId`]. Handles stay valid for the lifetime of the document, also
//! for nodes that were removed from the tree.
//!
//! ```text
//! Instance ──┬── PropertyNode (Text)    value="OK"   glue: attribute
//!            ├── PropertyNode (Complex) values=[..]  glue: <children> or implicit
//!            └── ...
//! Collection ── items=[..]
//! Intrinsic (fx:reference / fx:copy / fx:include)
//! Define ── items=[..]    Comment    Script
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use fxom_glue::GlueId;
use serde::Serialize;

use crate::runtime::LiveValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn offset(self, by: u32) -> Self {
        ObjectId(self.0 + by)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PropertyId(pub(crate) u32);

impl PropertyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn offset(self, by: u32) -> Self {
        PropertyId(self.0 + by)
    }
}

/// Structural parent of an object. An object has at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentLink {
    #[default]
    None,
    /// Value of a property
    Property(PropertyId),
    /// Item of a collection or of an `fx:define` block
    Collection(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    Reference,
    Copy,
    Include,
}

impl IntrinsicKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            IntrinsicKind::Reference => "fx:reference",
            IntrinsicKind::Copy => "fx:copy",
            IntrinsicKind::Include => "fx:include",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fx:reference" => Some(IntrinsicKind::Reference),
            "fx:copy" => Some(IntrinsicKind::Copy),
            "fx:include" => Some(IntrinsicKind::Include),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Instance {
        /// Fully qualified class, `None` when the tag could not be resolved
        declared_class: Option<String>,
        properties: BTreeMap<PropertyName, PropertyId>,
        /// Declared with `<fx:root type="...">`
        fx_root: bool,
    },
    Collection {
        declared_class: Option<String>,
        items: Vec<ObjectId>,
    },
    Intrinsic {
        kind: IntrinsicKind,
        properties: BTreeMap<PropertyName, PropertyId>,
    },
    Define {
        items: Vec<ObjectId>,
    },
    Comment,
    Script,
}

impl ObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Instance { .. } => "instance",
            ObjectKind::Collection { .. } => "collection",
            ObjectKind::Intrinsic { .. } => "intrinsic",
            ObjectKind::Define { .. } => "define",
            ObjectKind::Comment => "comment",
            ObjectKind::Script => "script",
        }
    }

    pub fn declared_class(&self) -> Option<&str> {
        match self {
            ObjectKind::Instance { declared_class, .. }
            | ObjectKind::Collection { declared_class, .. } => declared_class.as_deref(),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&BTreeMap<PropertyName, PropertyId>> {
        match self {
            ObjectKind::Instance { properties, .. } | ObjectKind::Intrinsic { properties, .. } => {
                Some(properties)
            }
            _ => None,
        }
    }

    pub(crate) fn properties_mut(&mut self) -> Option<&mut BTreeMap<PropertyName, PropertyId>> {
        match self {
            ObjectKind::Instance { properties, .. } | ObjectKind::Intrinsic { properties, .. } => {
                Some(properties)
            }
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[ObjectId]> {
        match self {
            ObjectKind::Collection { items, .. } | ObjectKind::Define { items } => Some(items),
            _ => None,
        }
    }

    pub(crate) fn items_mut(&mut self) -> Option<&mut Vec<ObjectId>> {
        match self {
            ObjectKind::Collection { items, .. } | ObjectKind::Define { items } => Some(items),
            _ => None,
        }
    }

    /// Comments, scripts and defines have no visual presence
    pub fn is_virtual(&self) -> bool {
        matches!(
            self,
            ObjectKind::Comment | ObjectKind::Script | ObjectKind::Define { .. }
        )
    }
}

/// Whether the live value was built by the loader or handed in by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Loaded,
    External,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraphObject {
    pub value: Option<LiveValue>,
    pub origin: Origin,
}

impl SceneGraphObject {
    pub fn loaded(value: Option<LiveValue>) -> Self {
        Self {
            value,
            origin: Origin::Loaded,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// Element for most kinds; a comment node for comments; a character
    /// node for literal text split out of a text property.
    pub(crate) glue: GlueId,
    pub(crate) parent: ParentLink,
    pub(crate) scene_graph: SceneGraphObject,
    pub(crate) kind: ObjectKind,
}

impl ObjectNode {
    pub fn glue(&self) -> GlueId {
        self.glue
    }

    pub fn parent(&self) -> ParentLink {
        self.parent
    }

    pub fn scene_graph(&self) -> &SceneGraphObject {
        &self.scene_graph
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }
}

/// Property name, optionally scoped to a residence class (`GridPane.rowIndex`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PropertyName {
    pub residence_class: Option<String>,
    pub name: String,
}

impl PropertyName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            residence_class: None,
            name: name.into(),
        }
    }

    pub fn with_residence(residence_class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            residence_class: Some(residence_class.into()),
            name: name.into(),
        }
    }

    /// Parse `name` or `Class.name`
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((residence, name)) => Self::with_residence(residence, name),
            None => Self::new(text),
        }
    }

    pub fn is_static(&self) -> bool {
        self.residence_class.is_some()
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.residence_class {
            Some(residence) => write!(f, "{}.{}", residence, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl Ord for PropertyName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for PropertyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Where a property is written in the markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyForm {
    /// `name="value"` on the owner element
    Attribute,
    /// `<name>...</name>` inside the owner element
    Element(GlueId),
    /// Values written directly inside the owner element (default property)
    Implicit,
}

#[derive(Debug, Clone)]
pub enum PropertyKind {
    Text {
        value: String,
        /// Literal or virtual objects carried by the text (`fx:value`
        /// instances, comments around free text)
        values: Vec<ObjectId>,
        /// Stand-in for a value that cannot be edited (map-typed)
        placeholder: bool,
    },
    Complex {
        values: Vec<ObjectId>,
    },
}

impl PropertyKind {
    pub fn values(&self) -> &[ObjectId] {
        match self {
            PropertyKind::Text { values, .. } | PropertyKind::Complex { values } => values,
        }
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<ObjectId> {
        match self {
            PropertyKind::Text { values, .. } | PropertyKind::Complex { values } => values,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            PropertyKind::Text { value, .. } => Some(value),
            PropertyKind::Complex { .. } => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, PropertyKind::Text { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub(crate) name: PropertyName,
    pub(crate) owner: Option<ObjectId>,
    pub(crate) form: PropertyForm,
    pub(crate) kind: PropertyKind,
}

impl PropertyNode {
    pub fn name(&self) -> &PropertyName {
        &self.name
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub fn form(&self) -> PropertyForm {
        self.form
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn values(&self) -> &[ObjectId] {
        self.kind.values()
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, PropertyKind::Text { placeholder: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_name_parse_and_display() {
        let name = PropertyName::parse("GridPane.rowIndex");
        assert_eq!(name.residence_class.as_deref(), Some("GridPane"));
        assert_eq!(name.name, "rowIndex");
        assert_eq!(name.to_string(), "GridPane.rowIndex");
        assert!(!PropertyName::parse("text").is_static());
    }

    #[test]
    fn test_property_names_sort_by_text() {
        let mut names = vec![
            PropertyName::new("text"),
            PropertyName::parse("GridPane.rowIndex"),
            PropertyName::new("alignment"),
        ];
        names.sort();
        let sorted: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(sorted, vec!["GridPane.rowIndex", "alignment", "text"]);
    }

    #[test]
    fn test_intrinsic_tags() {
        for kind in [IntrinsicKind::Reference, IntrinsicKind::Copy, IntrinsicKind::Include] {
            assert_eq!(IntrinsicKind::from_tag(kind.tag_name()), Some(kind));
        }
        assert_eq!(IntrinsicKind::from_tag("fx:define"), None);
    }
}
