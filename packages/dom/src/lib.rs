//! # fxom-dom
//!
//! Editable object model for declarative UI markup.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ glue: markup text ⇄ format-preserving tree  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dom: object model layered over the glue     │
//! │  - Load: transient builder + evaluator      │
//! │  - Mutate: structural primitives            │
//! │  - Clone, diff-merge, order, save           │
//! │  - Refresh live objects after edits         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ live values: catalog-driven instantiation   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Markup is the source of truth**: live objects are regenerated from it
//! 2. **Edits are local**: untouched text survives byte for byte
//! 3. **Loading is tolerant**: unknown classes and dangling references are
//!    recorded, never fatal; only malformed markup fails a load
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fxom_dom::{ClassLoadingContext, Document, LoadOptions, SaveOptions, StaticCatalog};
//!
//! let catalog = StaticCatalog::from_path("catalog.json".as_ref())?;
//! let context = ClassLoadingContext::new(Rc::new(catalog)).shared();
//! let mut doc = Document::from_path("Main.fxml".as_ref(), context, &LoadOptions::default())?;
//!
//! doc.begin_update();
//! let button = doc.new_instance("javafx.scene.control.Button");
//! doc.set_root(Some(button));
//! doc.end_update()?;
//!
//! doc.save("Main.fxml".as_ref(), &SaveOptions::default())?;
//! ```

pub mod assets;
pub mod catalog;
pub mod cloner;
pub mod context;
pub mod document;
pub mod error;
mod evaluator;
pub mod expression;
pub mod id_generator;
pub mod loader;
pub mod model;
mod mutation;
pub mod nodes;
pub mod normalizer;
pub mod path;
pub mod refresher;
pub mod report;
pub mod runtime;
pub mod saver;
mod transient;

pub use assets::{AssetEntry, AssetIndex, AssetKind, ExtensionAssetLoader, FileAssetLoader};
pub use catalog::{ClassCatalog, ClassDescriptor, ImportSet, PropertyDescriptor, StaticCatalog, ValueType};
pub use cloner::{Cloner, Fragment};
pub use context::{
    ClassLoadingContext, Extensions, ResourceBundle, WeakPropertyRegistry, PLACEHOLDER_RESOURCE_URL,
};
pub use document::{Document, FX_NAMESPACE};
pub use error::{DomError, DomResult};
pub use evaluator::coerce;
pub use loader::{LoadOptions, Loader};
pub use model::{
    IntrinsicKind, ObjectId, ObjectKind, Origin, ParentLink, PropertyForm, PropertyId, PropertyKind,
    PropertyName,
};
pub use nodes::{ReferenceSite, UpdateReport};
pub use normalizer::{Normalizer, ReferenceExpressionNormalizer};
pub use path::ObjectPath;
pub use refresher::{AccordionExpansionHandler, Refresher, TabPaneSelectionHandler, TransientStateHandler};
pub use report::{ErrorEntry, ErrorKind, ErrorReport};
pub use runtime::{LiveObject, LiveValue};
pub use saver::{SaveOptions, Saver};
