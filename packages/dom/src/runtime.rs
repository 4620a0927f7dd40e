//! Live values produced by evaluating the object model against the class
//! catalog.
//!
//! Live objects are shared, mutable and may form cycles (`$id` back links), so
//! they are `Rc<RefCell<_>>` and back links are held weakly.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Clone)]
pub enum LiveValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Object(LiveObject),
    List(Vec<LiveValue>),
    /// Association to an object owned elsewhere
    Reference(Weak<RefCell<LiveObjectData>>),
}

impl LiveValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<LiveObject> {
        match self {
            LiveValue::Object(object) => Some(object.clone()),
            LiveValue::Reference(weak) => weak.upgrade().map(LiveObject),
            _ => None,
        }
    }

    /// Weak counterpart of an object value, other values unchanged
    pub fn downgrade(&self) -> LiveValue {
        match self {
            LiveValue::Object(object) => LiveValue::Reference(Rc::downgrade(&object.0)),
            other => other.clone(),
        }
    }

    /// Whether both values denote the same live object
    pub fn same_object(&self, other: &LiveValue) -> bool {
        match (self.as_object(), other.as_object()) {
            (Some(a), Some(b)) => a.ptr_eq(&b),
            _ => false,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> LiveValue {
        match value {
            serde_json::Value::Null => LiveValue::Null,
            serde_json::Value::Bool(b) => LiveValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => LiveValue::Integer(i),
                None => LiveValue::Double(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => LiveValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                LiveValue::List(items.iter().map(LiveValue::from_json).collect())
            }
            serde_json::Value::Object(_) => LiveValue::String(value.to_string()),
        }
    }
}

impl PartialEq for LiveValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LiveValue::Null, LiveValue::Null) => true,
            (LiveValue::Boolean(a), LiveValue::Boolean(b)) => a == b,
            (LiveValue::Integer(a), LiveValue::Integer(b)) => a == b,
            (LiveValue::Double(a), LiveValue::Double(b)) => a == b,
            (LiveValue::String(a), LiveValue::String(b)) => a == b,
            (LiveValue::List(a), LiveValue::List(b)) => a == b,
            _ => self.same_object(other),
        }
    }
}

impl fmt::Debug for LiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveValue::Null => f.write_str("Null"),
            LiveValue::Boolean(b) => write!(f, "Boolean({})", b),
            LiveValue::Integer(i) => write!(f, "Integer({})", i),
            LiveValue::Double(d) => write!(f, "Double({})", d),
            LiveValue::String(s) => write!(f, "String({:?})", s),
            LiveValue::Object(object) => write!(f, "{:?}", object),
            LiveValue::List(items) => f.debug_list().entries(items).finish(),
            LiveValue::Reference(weak) => match weak.upgrade() {
                Some(object) => write!(f, "Reference({})", object.borrow().class_name),
                None => f.write_str("Reference(<dropped>)"),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct LiveObjectData {
    pub class_name: String,
    pub properties: BTreeMap<String, LiveValue>,
    pub items: Vec<LiveValue>,
    /// Runtime-only state that has no markup form (selected tab, expanded pane)
    pub state: BTreeMap<String, LiveValue>,
}

/// Shared handle to an instantiated object
#[derive(Clone)]
pub struct LiveObject(pub(crate) Rc<RefCell<LiveObjectData>>);

impl LiveObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        LiveObject(Rc::new(RefCell::new(LiveObjectData {
            class_name: class_name.into(),
            ..Default::default()
        })))
    }

    pub fn class_name(&self) -> String {
        self.0.borrow().class_name.clone()
    }

    pub fn get(&self, name: &str) -> Option<LiveValue> {
        self.0.borrow().properties.get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: LiveValue) {
        self.0.borrow_mut().properties.insert(name.into(), value);
    }

    pub fn items(&self) -> Vec<LiveValue> {
        self.0.borrow().items.clone()
    }

    pub fn push_item(&self, value: LiveValue) {
        self.0.borrow_mut().items.push(value);
    }

    pub fn state(&self, key: &str) -> Option<LiveValue> {
        self.0.borrow().state.get(key).cloned()
    }

    pub fn set_state(&self, key: impl Into<String>, value: LiveValue) {
        self.0.borrow_mut().state.insert(key.into(), value);
    }

    pub fn ptr_eq(&self, other: &LiveObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// New object with the same class, properties and items
    pub fn shallow_copy(&self) -> LiveObject {
        let data = self.0.borrow();
        LiveObject(Rc::new(RefCell::new(LiveObjectData {
            class_name: data.class_name.clone(),
            properties: data.properties.clone(),
            items: data.items.clone(),
            state: BTreeMap::new(),
        })))
    }
}

impl fmt::Debug for LiveObject {
    // Property values are not printed: objects can reach themselves.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("LiveObject")
                .field("class", &data.class_name)
                .field("properties", &data.properties.keys().collect::<Vec<_>>())
                .field("items", &data.items.len())
                .finish(),
            Err(_) => f.write_str("LiveObject(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallow_copy_is_distinct() {
        let original = LiveObject::new("javafx.scene.control.Button");
        original.set("text", LiveValue::String("OK".into()));
        let copy = original.shallow_copy();
        assert!(!copy.ptr_eq(&original));
        assert_eq!(copy.get("text"), Some(LiveValue::String("OK".into())));
    }

    #[test]
    fn test_reference_upgrades_to_same_object() {
        let group = LiveObject::new("javafx.scene.control.ToggleGroup");
        let strong = LiveValue::Object(group.clone());
        let weak = strong.downgrade();
        assert!(matches!(weak, LiveValue::Reference(_)));
        assert!(weak.same_object(&strong));
        assert_eq!(weak, strong);
    }

    #[test]
    fn test_debug_survives_cycles() {
        let a = LiveObject::new("A");
        a.set("me", LiveValue::Object(a.clone()));
        let rendered = format!("{:?}", a);
        assert!(rendered.contains("\"A\""));
        a.set("me", LiveValue::Null);
    }
}
