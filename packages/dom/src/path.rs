//! Positional addresses of objects, used to order arbitrary selections.
//!
//! A path is a snapshot: it goes stale as soon as the tree changes.

use std::cmp::Ordering;

use crate::document::Document;
use crate::model::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Ancestor chain, root first, the object itself last
    items: Vec<ObjectId>,
    /// Position of each item among its parent's children (0 for the top)
    indices: Vec<usize>,
}

impl ObjectPath {
    pub fn of(document: &Document, object: ObjectId) -> Self {
        let mut items = vec![object];
        let mut indices = Vec::new();
        let mut current = object;
        while let Some(parent) = document.parent_object(current) {
            let index = document
                .object_children(parent)
                .iter()
                .position(|&child| child == current)
                .unwrap_or(0);
            indices.push(index);
            items.push(parent);
            current = parent;
        }
        indices.push(0);
        items.reverse();
        indices.reverse();
        Self { items, indices }
    }

    pub fn items(&self) -> &[ObjectId] {
        &self.items
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn top_object(&self) -> Option<ObjectId> {
        self.items.first().copied()
    }

    pub fn leaf(&self) -> Option<ObjectId> {
        self.items.last().copied()
    }

    pub fn is_before(&self, other: &ObjectPath) -> bool {
        self.cmp(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &ObjectPath) -> bool {
        self.cmp(other) == Ordering::Greater
    }

    /// Longest shared prefix. Empty when the paths start at different tops.
    pub fn common_path_with(&self, other: &ObjectPath) -> ObjectPath {
        let shared = self
            .items
            .iter()
            .zip(&other.items)
            .take_while(|(a, b)| a == b)
            .count();
        ObjectPath {
            items: self.items[..shared].to_vec(),
            indices: self.indices[..shared].to_vec(),
        }
    }

    /// Longest prefix shared by every path. `None` for no paths or paths
    /// without a common top.
    pub fn common_path<'a>(paths: impl IntoIterator<Item = &'a ObjectPath>) -> Option<ObjectPath> {
        let mut paths = paths.into_iter();
        let mut common = paths.next()?.clone();
        for path in paths {
            common = common.common_path_with(path);
            if common.items.is_empty() {
                return None;
            }
        }
        Some(common)
    }
}

impl Ord for ObjectPath {
    /// An ancestor sorts before its descendants; siblings by position.
    fn cmp(&self, other: &Self) -> Ordering {
        self.indices
            .iter()
            .zip(&other.indices)
            .map(|(a, b)| a.cmp(b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.indices.len().cmp(&other.indices.len()))
            .then_with(|| self.items.cmp(&other.items))
    }
}

impl PartialOrd for ObjectPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Topmost object of a selection in document order
pub fn first_object(document: &Document, objects: &[ObjectId]) -> Option<ObjectId> {
    objects
        .iter()
        .map(|&object| ObjectPath::of(document, object))
        .min()
        .and_then(|path| path.leaf())
}

/// Bottommost object of a selection in document order
pub fn last_object(document: &Document, objects: &[ObjectId]) -> Option<ObjectId> {
    objects
        .iter()
        .map(|&object| ObjectPath::of(document, object))
        .max()
        .and_then(|path| path.leaf())
}

/// Nearest object that contains (or is) every object of the selection
pub fn common_ancestor(document: &Document, objects: &[ObjectId]) -> Option<ObjectId> {
    let paths: Vec<ObjectPath> = objects
        .iter()
        .map(|&object| ObjectPath::of(document, object))
        .collect();
    ObjectPath::common_path(&paths)?.leaf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::load;

    const SOURCE: &str = r#"<VBox>
    <HBox fx:id="row">
        <Button fx:id="a"/>
        <Button fx:id="b"/>
    </HBox>
    <Label fx:id="c"/>
</VBox>"#;

    #[test]
    fn test_ordering() {
        let document = load(SOURCE);
        let row = document.search_with_fx_id("row").unwrap();
        let a = ObjectPath::of(&document, document.search_with_fx_id("a").unwrap());
        let b = ObjectPath::of(&document, document.search_with_fx_id("b").unwrap());
        let c = ObjectPath::of(&document, document.search_with_fx_id("c").unwrap());
        let row_path = ObjectPath::of(&document, row);

        assert!(a.is_before(&b));
        assert!(b.is_before(&c));
        assert!(c.is_after(&a));
        // An ancestor comes before its descendants.
        assert!(row_path.is_before(&a));
        assert_eq!(a.depth(), 3);
        assert_eq!(a.top_object(), document.root());
    }

    #[test]
    fn test_common_path_of_several_objects() {
        let document = load(SOURCE);
        let row = document.search_with_fx_id("row").unwrap();
        let a = document.search_with_fx_id("a").unwrap();
        let b = document.search_with_fx_id("b").unwrap();
        let c = document.search_with_fx_id("c").unwrap();

        assert_eq!(common_ancestor(&document, &[a, b]), Some(row));
        assert_eq!(common_ancestor(&document, &[a, b, c]), document.root());
        assert_eq!(common_ancestor(&document, &[a]), Some(a));
        assert_eq!(common_ancestor(&document, &[]), None);
        assert_eq!(first_object(&document, &[c, b, a]), Some(a));
        assert_eq!(last_object(&document, &[c, b, a]), Some(c));
    }

    #[test]
    fn test_unrelated_paths_have_no_common_path() {
        let mut document = load(SOURCE);
        let a = document.search_with_fx_id("a").unwrap();
        let loose = document.new_instance("Button");
        let paths = [ObjectPath::of(&document, a), ObjectPath::of(&document, loose)];
        assert!(ObjectPath::common_path(&paths).is_none());
    }
}
