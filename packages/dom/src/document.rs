//! # Document
//!
//! A `Document` owns one glue tree, the object and property arenas layered
//! over it, the root object and the class-loading context used to evaluate
//! it.
//!
//! ## Lifecycle
//!
//! ```text
//! load(text) ──▶ begin_update ──▶ mutations ──▶ end_update ──▶ fxml_text / save
//!                                                  │
//!                                          refresh live objects
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;

use fxom_glue::{serialize, GlueData, GlueDocument, GlueId};
use tracing::debug;
use url::Url;

use crate::catalog::{ClassCatalog, ImportSet};
use crate::context::ClassLoadingContext;
use crate::error::DomResult;
use crate::loader::{LoadOptions, Loader};
use crate::model::{
    IntrinsicKind, ObjectId, ObjectKind, ObjectNode, Origin, ParentLink, PropertyForm, PropertyId,
    PropertyKind, PropertyName, PropertyNode, SceneGraphObject,
};
use crate::refresher::Refresher;
use crate::runtime::LiveValue;

pub const FX_NAMESPACE: &str = "http://javafx.com/fxml/1";
pub const FX_NAMESPACE_PREFIX: &str = "xmlns:fx";

pub fn runtime_namespace(version: &str) -> String {
    format!("http://javafx.com/javafx/{}", version)
}

#[derive(Debug)]
pub struct Document {
    pub(crate) glue: GlueDocument,
    pub(crate) objects: Vec<ObjectNode>,
    pub(crate) properties: Vec<PropertyNode>,
    pub(crate) root: Option<ObjectId>,
    location: Option<Url>,
    context: Rc<ClassLoadingContext>,
    pub(crate) unresolved_classes: BTreeSet<String>,
    scene_graph_revision: u64,
    updating: bool,
    fx_ids: RefCell<Option<BTreeMap<String, ObjectId>>>,
}

impl Document {
    /// Empty document without a root
    pub fn new(context: Rc<ClassLoadingContext>) -> Self {
        Self {
            glue: GlueDocument::new(),
            objects: Vec::new(),
            properties: Vec::new(),
            root: None,
            location: None,
            context,
            unresolved_classes: BTreeSet::new(),
            scene_graph_revision: 0,
            updating: false,
            fx_ids: RefCell::new(None),
        }
    }

    /// Parse markup text. Format errors fail the load; unresolved classes and
    /// references do not.
    pub fn load(
        text: &str,
        location: Option<Url>,
        context: Rc<ClassLoadingContext>,
        options: &LoadOptions,
    ) -> DomResult<Self> {
        Loader::new(context, options.clone()).load(text, location)
    }

    pub fn from_path(
        path: &Path,
        context: Rc<ClassLoadingContext>,
        options: &LoadOptions,
    ) -> DomResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let absolute = std::fs::canonicalize(path)?;
        let location = Url::from_file_path(&absolute).ok();
        Self::load(&text, location, context, options)
    }

    pub(crate) fn with_glue(glue: GlueDocument, location: Option<Url>, context: Rc<ClassLoadingContext>) -> Self {
        let mut document = Self::new(context);
        document.glue = glue;
        document.location = location;
        document
    }

    // ----- arenas -----

    pub(crate) fn push_object(&mut self, glue: GlueId, kind: ObjectKind) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(ObjectNode {
            glue,
            parent: ParentLink::None,
            scene_graph: SceneGraphObject::default(),
            kind,
        });
        id
    }

    pub(crate) fn push_property(
        &mut self,
        name: PropertyName,
        form: PropertyForm,
        kind: PropertyKind,
    ) -> PropertyId {
        let id = PropertyId(self.properties.len() as u32);
        self.properties.push(PropertyNode {
            name,
            owner: None,
            form,
            kind,
        });
        id
    }

    pub fn object(&self, id: ObjectId) -> &ObjectNode {
        &self.objects[id.index()]
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> &mut ObjectNode {
        &mut self.objects[id.index()]
    }

    pub fn property(&self, id: PropertyId) -> &PropertyNode {
        &self.properties[id.index()]
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> &mut PropertyNode {
        &mut self.properties[id.index()]
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ----- accessors -----

    pub fn glue(&self) -> &GlueDocument {
        &self.glue
    }

    pub(crate) fn glue_mut(&mut self) -> &mut GlueDocument {
        &mut self.glue
    }

    pub fn root(&self) -> Option<ObjectId> {
        self.root
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Option<Url>) {
        self.location = location;
    }

    pub fn context(&self) -> &Rc<ClassLoadingContext> {
        &self.context
    }

    pub fn catalog(&self) -> &dyn ClassCatalog {
        self.context.catalog.as_ref()
    }

    /// Tag names that did not resolve to a catalog class during the last load
    /// or refresh
    pub fn unresolved_classes(&self) -> &BTreeSet<String> {
        &self.unresolved_classes
    }

    pub fn scene_graph_revision(&self) -> u64 {
        self.scene_graph_revision
    }

    pub fn scene_graph_root(&self) -> Option<LiveValue> {
        self.root.and_then(|root| self.scene_graph_object(root))
    }

    pub fn scene_graph_object(&self, id: ObjectId) -> Option<LiveValue> {
        self.object(id).scene_graph.value.clone()
    }

    /// Attach a live value supplied by the host. It is kept across refreshes
    /// that cannot produce one.
    pub fn set_scene_graph_object(&mut self, id: ObjectId, value: Option<LiveValue>) {
        self.object_mut(id).scene_graph = SceneGraphObject {
            value,
            origin: Origin::External,
        };
    }

    pub fn imports(&self) -> ImportSet {
        ImportSet::new(self.glue.imports().into_iter().map(|(_, value)| value))
    }

    pub fn tag_name(&self, id: ObjectId) -> Option<&str> {
        self.glue.tag_name(self.object(id).glue)
    }

    pub fn declared_class(&self, id: ObjectId) -> Option<&str> {
        self.object(id).kind.declared_class()
    }

    /// Literal text split out of a text property by the loader
    pub fn is_literal_text(&self, id: ObjectId) -> bool {
        matches!(
            self.glue.node(self.object(id).glue).data(),
            GlueData::Characters(_) | GlueData::CData(_)
        )
    }

    // ----- fx metadata -----

    pub fn fx_attribute(&self, id: ObjectId, name: &str) -> Option<String> {
        self.glue.element(self.object(id).glue)?.attribute(name)
    }

    pub(crate) fn set_fx_attribute(&mut self, id: ObjectId, name: &str, value: Option<&str>) {
        let glue = self.object(id).glue;
        if let Some(element) = self.glue.element_mut(glue) {
            match value {
                Some(value) => element.set_attribute(name, value),
                None => {
                    element.remove_attribute(name);
                }
            }
        }
        self.invalidate();
    }

    pub fn fx_id(&self, id: ObjectId) -> Option<String> {
        self.fx_attribute(id, "fx:id")
    }

    pub fn set_fx_id(&mut self, id: ObjectId, fx_id: Option<&str>) {
        self.set_fx_attribute(id, "fx:id", fx_id);
    }

    pub fn fx_value(&self, id: ObjectId) -> Option<String> {
        self.fx_attribute(id, "fx:value")
    }

    pub fn set_fx_value(&mut self, id: ObjectId, value: Option<&str>) {
        self.set_fx_attribute(id, "fx:value", value);
    }

    pub fn fx_constant(&self, id: ObjectId) -> Option<String> {
        self.fx_attribute(id, "fx:constant")
    }

    pub fn set_fx_constant(&mut self, id: ObjectId, value: Option<&str>) {
        self.set_fx_attribute(id, "fx:constant", value);
    }

    pub fn fx_factory(&self, id: ObjectId) -> Option<String> {
        self.fx_attribute(id, "fx:factory")
    }

    pub fn set_fx_factory(&mut self, id: ObjectId, value: Option<&str>) {
        self.set_fx_attribute(id, "fx:factory", value);
    }

    pub fn fx_controller(&self, id: ObjectId) -> Option<String> {
        self.fx_attribute(id, "fx:controller")
    }

    pub fn set_fx_controller(&mut self, id: ObjectId, value: Option<&str>) {
        self.set_fx_attribute(id, "fx:controller", value);
    }

    /// Object declaring `fx_id` in the tree below the root
    pub fn search_with_fx_id(&self, fx_id: &str) -> Option<ObjectId> {
        let mut cache = self.fx_ids.borrow_mut();
        let ids = cache.get_or_insert_with(|| self.collect_fx_ids());
        ids.get(fx_id).copied()
    }

    /// Every `fx:id` declared below the root. The first declaration wins
    /// when a document repeats an identifier.
    pub fn collect_fx_ids(&self) -> BTreeMap<String, ObjectId> {
        match self.root {
            Some(root) => self.collect_fx_ids_in(root),
            None => BTreeMap::new(),
        }
    }

    pub fn collect_fx_ids_in(&self, scope: ObjectId) -> BTreeMap<String, ObjectId> {
        let mut ids = BTreeMap::new();
        for object in self.descendants(scope) {
            if let Some(fx_id) = self.fx_id(object) {
                ids.entry(fx_id).or_insert(object);
            }
        }
        ids
    }

    // ----- intrinsic, comment and script data -----

    pub fn intrinsic_kind(&self, id: ObjectId) -> Option<IntrinsicKind> {
        match &self.object(id).kind {
            ObjectKind::Intrinsic { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn intrinsic_source(&self, id: ObjectId) -> Option<String> {
        self.intrinsic_kind(id)?;
        self.fx_attribute(id, "source")
    }

    pub fn set_intrinsic_source(&mut self, id: ObjectId, source: &str) {
        assert!(self.intrinsic_kind(id).is_some(), "{:?} is not an intrinsic", id);
        self.set_fx_attribute(id, "source", Some(source));
    }

    pub fn comment_text(&self, id: ObjectId) -> Option<&str> {
        self.glue.comment(self.object(id).glue)
    }

    pub fn set_comment_text(&mut self, id: ObjectId, text: &str) {
        let glue = self.object(id).glue;
        self.glue.set_comment(glue, text);
    }

    pub fn script_source(&self, id: ObjectId) -> Option<String> {
        match self.object(id).kind {
            ObjectKind::Script => self.fx_attribute(id, "source"),
            _ => None,
        }
    }

    pub fn script_content(&self, id: ObjectId) -> Option<String> {
        match self.object(id).kind {
            ObjectKind::Script => self.glue.content_text(self.object(id).glue),
            _ => None,
        }
    }

    pub fn set_script_content(&mut self, id: ObjectId, content: &str) {
        assert!(matches!(self.object(id).kind, ObjectKind::Script), "{:?} is not a script", id);
        let glue = self.object(id).glue;
        self.glue.set_content_text(glue, content);
        self.invalidate();
    }

    // ----- properties -----

    pub fn properties_of(&self, id: ObjectId) -> Vec<PropertyId> {
        self.object(id)
            .kind
            .properties()
            .map(|properties| properties.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn property_named(&self, id: ObjectId, name: &PropertyName) -> Option<PropertyId> {
        self.object(id).kind.properties()?.get(name).copied()
    }

    /// Text value of a property, looked up by its textual name
    pub fn property_text(&self, id: ObjectId, name: &str) -> Option<&str> {
        let property = self.property_named(id, &PropertyName::parse(name))?;
        self.property(property).kind.text()
    }

    // ----- tree -----

    /// Direct children in document order: property values by property name,
    /// then items.
    pub fn object_children(&self, id: ObjectId) -> Vec<ObjectId> {
        match &self.object(id).kind {
            ObjectKind::Instance { properties, .. } | ObjectKind::Intrinsic { properties, .. } => {
                properties
                    .values()
                    .flat_map(|&p| self.property(p).values().iter().copied())
                    .collect()
            }
            ObjectKind::Collection { items, .. } | ObjectKind::Define { items } => items.clone(),
            ObjectKind::Comment | ObjectKind::Script => Vec::new(),
        }
    }

    pub fn parent_property(&self, id: ObjectId) -> Option<PropertyId> {
        match self.object(id).parent {
            ParentLink::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn parent_object(&self, id: ObjectId) -> Option<ObjectId> {
        match self.object(id).parent {
            ParentLink::None => None,
            ParentLink::Property(property) => self.property(property).owner,
            ParentLink::Collection(collection) => Some(collection),
        }
    }

    pub fn is_descendant_of(&self, id: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = self.parent_object(id);
        while let Some(object) = current {
            if object == ancestor {
                return true;
            }
            current = self.parent_object(object);
        }
        false
    }

    /// `id` and every object below it, pre-order
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.object_children(current).into_iter().rev());
        }
        result
    }

    /// Every property owned by `id` or one of its descendants, pre-order
    pub fn descendant_properties(&self, id: ObjectId) -> Vec<PropertyId> {
        self.descendants(id)
            .into_iter()
            .flat_map(|object| self.properties_of(object))
            .collect()
    }

    // ----- update bracket -----

    pub fn begin_update(&mut self) {
        assert!(!self.updating, "begin_update cannot be nested");
        self.updating = true;
        self.invalidate();
    }

    /// Close the update bracket and bring the live objects up to date
    pub fn end_update(&mut self) -> DomResult<()> {
        assert!(self.updating, "end_update without begin_update");
        self.updating = false;
        self.invalidate();
        self.refresh()
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Regenerate the live objects from the current markup
    pub fn refresh(&mut self) -> DomResult<()> {
        Refresher::new().refresh(self)?;
        self.scene_graph_revision += 1;
        debug!(revision = self.scene_graph_revision, "scene graph refreshed");
        Ok(())
    }

    pub(crate) fn invalidate(&self) {
        self.fx_ids.borrow_mut().take();
    }

    /// Glue serialized as is, without namespace or import maintenance
    pub fn glue_text(&self) -> String {
        serialize(&self.glue)
    }
}
