//! # Glue Tree
//!
//! Arena-based, format-preserving markup tree.
//!
//! Every byte of a parsed source is held by some node: whitespace lives in
//! [`GlueData::Characters`] nodes, attributes keep their leading whitespace,
//! separator and quote character, and tags keep the whitespace before their
//! closing delimiter. Serializing an unedited tree reproduces the input.
//!
//! Nodes are never freed. A detached node stays in the arena and can be
//! attached again later, so a [`GlueId`] stays valid for the lifetime of its
//! document.
//!
//! Structural edits ([`GlueDocument::insert_before`], [`GlueDocument::detach`])
//! maintain indentation: inserted elements get the indentation of their new
//! siblings and their subtree is re-indented; detached elements take their
//! leading line break with them.

use std::collections::BTreeMap;

use crate::escape::{escape_attribute, escape_text, unescape};

/// Indentation added for each nesting level when no sibling shows the way.
pub const INDENT_UNIT: &str = "    ";

/// Handle of a node inside one [`GlueDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlueId(u32);

impl GlueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Shift the handle by `by`, as done when one arena is appended to another
    pub fn offset(self, by: u32) -> Self {
        GlueId(self.0 + by)
    }
}

/// An attribute with everything needed to write it back unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueAttribute {
    /// Whitespace between the previous token and the name
    pub leading: String,
    pub name: String,
    /// Text between the name and the opening quote, `=` included
    pub separator: String,
    pub quote: char,
    /// Value as written, entities still escaped
    pub raw_value: String,
}

impl GlueAttribute {
    pub fn new(name: impl Into<String>, value: &str) -> Self {
        Self {
            leading: " ".to_string(),
            name: name.into(),
            separator: "=".to_string(),
            quote: '"',
            raw_value: escape_attribute(value, '"'),
        }
    }

    /// Decoded value
    pub fn value(&self) -> String {
        unescape(&self.raw_value).into_owned()
    }

    pub fn set_value(&mut self, value: &str) {
        self.raw_value = escape_attribute(value, self.quote);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueElement {
    tag_name: String,
    attributes: Vec<GlueAttribute>,
    children: Vec<GlueId>,
    /// Whitespace before `>` or `/>` in the start tag
    pub trailing: String,
    /// Whitespace before `>` in the end tag
    pub end_trailing: String,
    self_closing: bool,
}

impl GlueElement {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            trailing: String::new(),
            end_trailing: String::new(),
            self_closing: true,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn set_tag_name(&mut self, tag_name: impl Into<String>) {
        self.tag_name = tag_name.into();
    }

    pub fn attributes(&self) -> &[GlueAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(GlueAttribute::value)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Replace the value in place, or append a new attribute
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attribute) => attribute.set_value(value),
            None => self.attributes.push(GlueAttribute::new(name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let position = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(position).value())
    }

    pub(crate) fn push_attribute(&mut self, attribute: GlueAttribute) {
        self.attributes.push(attribute);
    }

    pub fn children(&self) -> &[GlueId] {
        &self.children
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing && self.children.is_empty()
    }

    pub(crate) fn set_self_closing(&mut self, self_closing: bool) {
        self.self_closing = self_closing;
    }
}

/// Processing instruction, e.g. `<?import javafx.scene.control.*?>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueInstruction {
    pub target: String,
    /// Everything after the target, leading whitespace included
    pub data: String,
}

impl GlueInstruction {
    pub fn new(target: impl Into<String>, value: &str) -> Self {
        Self {
            target: target.into(),
            data: format!(" {}", value),
        }
    }

    pub fn value(&self) -> &str {
        self.data.trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlueData {
    Element(GlueElement),
    /// Raw character data, entities still escaped
    Characters(String),
    Comment(String),
    Instruction(GlueInstruction),
    CData(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
pub struct GlueNode {
    parent: Option<GlueId>,
    data: GlueData,
}

impl GlueNode {
    pub fn parent(&self) -> Option<GlueId> {
        self.parent
    }

    pub fn data(&self) -> &GlueData {
        &self.data
    }

    pub fn as_element(&self) -> Option<&GlueElement> {
        match &self.data {
            GlueData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, GlueData::Element(_))
    }

    /// Whitespace-only character data
    pub fn is_whitespace(&self) -> bool {
        matches!(&self.data, GlueData::Characters(text) if is_blank(text))
    }

    fn is_line_break(&self) -> bool {
        matches!(&self.data, GlueData::Characters(text) if is_blank(text) && text.contains('\n'))
    }
}

pub(crate) fn is_blank(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// Format-preserving markup document
#[derive(Debug, Clone, Default)]
pub struct GlueDocument {
    nodes: Vec<GlueNode>,
    top_level: Vec<GlueId>,
    root: Option<GlueId>,
}

impl GlueDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, data: GlueData) -> GlueId {
        let id = GlueId(self.nodes.len() as u32);
        self.nodes.push(GlueNode { parent: None, data });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: GlueId) -> &GlueNode {
        &self.nodes[id.index()]
    }

    pub fn data_mut(&mut self, id: GlueId) -> &mut GlueData {
        &mut self.nodes[id.index()].data
    }

    pub fn element(&self, id: GlueId) -> Option<&GlueElement> {
        self.node(id).as_element()
    }

    pub fn element_mut(&mut self, id: GlueId) -> Option<&mut GlueElement> {
        match &mut self.nodes[id.index()].data {
            GlueData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn root(&self) -> Option<GlueId> {
        self.root
    }

    /// Nodes outside the root element (prolog, root, epilog) in document order
    pub fn top_level(&self) -> &[GlueId] {
        &self.top_level
    }

    pub fn parent(&self, id: GlueId) -> Option<GlueId> {
        self.node(id).parent
    }

    pub fn children(&self, id: GlueId) -> &[GlueId] {
        self.element(id).map(GlueElement::children).unwrap_or(&[])
    }

    pub fn element_children(&self, id: GlueId) -> impl Iterator<Item = GlueId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.node(child).is_element())
    }

    pub fn tag_name(&self, id: GlueId) -> Option<&str> {
        self.element(id).map(GlueElement::tag_name)
    }

    /// Whether the node is reachable from the top level
    pub fn is_attached(&self, id: GlueId) -> bool {
        let mut current = id;
        loop {
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return self.top_level.contains(&current),
            }
        }
    }

    // ----- node construction -----

    /// New detached, self-closing element
    pub fn create_element(&mut self, tag_name: &str) -> GlueId {
        self.push(GlueData::Element(GlueElement::new(tag_name)))
    }

    /// New detached character node holding already escaped text
    pub fn create_characters(&mut self, raw: &str) -> GlueId {
        self.push(GlueData::Characters(raw.to_string()))
    }

    /// New detached character node; `text` is escaped
    pub fn create_text(&mut self, text: &str) -> GlueId {
        self.push(GlueData::Characters(escape_text(text)))
    }

    pub fn create_comment(&mut self, text: &str) -> GlueId {
        self.push(GlueData::Comment(text.to_string()))
    }

    pub fn create_instruction(&mut self, target: &str, value: &str) -> GlueId {
        self.push(GlueData::Instruction(GlueInstruction::new(target, value)))
    }

    // ----- content accessors -----

    /// Decoded text of a character or CDATA node
    pub fn text(&self, id: GlueId) -> Option<String> {
        match &self.node(id).data {
            GlueData::Characters(raw) => Some(unescape(raw).into_owned()),
            GlueData::CData(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: GlueId, text: &str) {
        match &mut self.nodes[id.index()].data {
            GlueData::Characters(raw) => *raw = escape_text(text),
            GlueData::CData(content) => *content = text.to_string(),
            other => panic!("set_text on a non-text glue node: {:?}", other),
        }
    }

    pub fn comment(&self, id: GlueId) -> Option<&str> {
        match &self.node(id).data {
            GlueData::Comment(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_comment(&mut self, id: GlueId, text: &str) {
        match &mut self.nodes[id.index()].data {
            GlueData::Comment(content) => *content = text.to_string(),
            other => panic!("set_comment on a non-comment glue node: {:?}", other),
        }
    }

    pub fn instruction(&self, id: GlueId) -> Option<&GlueInstruction> {
        match &self.node(id).data {
            GlueData::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    /// Concatenated text content of an element without element children.
    ///
    /// Returns `None` when the element has element children.
    pub fn content_text(&self, id: GlueId) -> Option<String> {
        let element = self.element(id)?;
        let mut text = String::new();
        for &child in element.children() {
            match &self.node(child).data {
                GlueData::Element(_) => return None,
                GlueData::Characters(raw) => text.push_str(&unescape(raw)),
                GlueData::CData(content) => text.push_str(content),
                _ => {}
            }
        }
        Some(text)
    }

    /// Replace the character data of an element, keeping comments and
    /// instructions.
    pub fn set_content_text(&mut self, id: GlueId, text: &str) {
        let children: Vec<GlueId> = self.children(id).to_vec();
        let kept: Vec<GlueId> = children
            .into_iter()
            .filter(|&child| {
                !matches!(
                    self.node(child).data,
                    GlueData::Characters(_) | GlueData::CData(_)
                )
            })
            .collect();
        let characters = self.create_text(text);
        self.nodes[characters.index()].parent = Some(id);
        let element = self
            .element_mut(id)
            .expect("set_content_text on a non-element glue node");
        element.children = kept;
        element.children.push(characters);
        element.self_closing = false;
    }

    /// All `<?import ...?>` instructions at the top level
    pub fn imports(&self) -> Vec<(GlueId, String)> {
        self.top_level
            .iter()
            .filter_map(|&id| {
                self.instruction(id)
                    .filter(|pi| pi.target == "import")
                    .map(|pi| (id, pi.value().to_string()))
            })
            .collect()
    }

    /// Pre-order list of `id` and all its descendants
    pub fn descendants(&self, id: GlueId) -> Vec<GlueId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    // ----- siblings -----

    fn siblings(&self, id: GlueId) -> &[GlueId] {
        match self.node(id).parent {
            Some(parent) => self.children(parent),
            None => &self.top_level,
        }
    }

    pub fn index_in_parent(&self, id: GlueId) -> Option<usize> {
        self.siblings(id).iter().position(|&s| s == id)
    }

    pub fn previous_sibling(&self, id: GlueId) -> Option<GlueId> {
        let siblings = self.siblings(id);
        let index = siblings.iter().position(|&s| s == id)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    pub fn next_sibling(&self, id: GlueId) -> Option<GlueId> {
        let siblings = self.siblings(id);
        let index = siblings.iter().position(|&s| s == id)?;
        siblings.get(index + 1).copied()
    }

    // ----- indentation -----

    /// Indentation of the line a node starts on, derived from the character
    /// data preceding it.
    pub fn indent_of(&self, id: GlueId) -> String {
        if let Some(previous) = self.previous_sibling(id) {
            if let GlueData::Characters(raw) = &self.node(previous).data {
                if let Some(newline) = raw.rfind('\n') {
                    let tail = &raw[newline + 1..];
                    if is_blank(tail) {
                        return tail.to_string();
                    }
                }
            }
        }
        match self.node(id).parent {
            Some(parent) => format!("{}{}", self.indent_of(parent), INDENT_UNIT),
            None => String::new(),
        }
    }

    /// Indentation of an element's end tag, if it sits on its own line
    fn closing_indent(&self, id: GlueId) -> Option<String> {
        let last = *self.children(id).last()?;
        match &self.node(last).data {
            GlueData::Characters(raw) if is_blank(raw) => {
                raw.rfind('\n').map(|newline| raw[newline + 1..].to_string())
            }
            _ => None,
        }
    }

    fn reindent(&mut self, id: GlueId, from: &str, to: &str) {
        for descendant in self.descendants(id) {
            if descendant == id {
                continue;
            }
            if let GlueData::Characters(raw) = &mut self.nodes[descendant.index()].data {
                if !is_blank(raw) || !raw.contains('\n') {
                    continue;
                }
                let mut lines = raw.split('\n');
                let mut rebuilt = lines.next().unwrap_or_default().to_string();
                for line in lines {
                    rebuilt.push('\n');
                    match line.strip_prefix(from) {
                        Some(rest) => {
                            rebuilt.push_str(to);
                            rebuilt.push_str(rest);
                        }
                        None => rebuilt.push_str(line),
                    }
                }
                *raw = rebuilt;
            }
        }
    }

    // ----- structure -----

    fn set_children(&mut self, parent: GlueId, children: Vec<GlueId>) {
        for &child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        let element = self
            .element_mut(parent)
            .expect("glue parent must be an element");
        element.self_closing = children.is_empty() && element.self_closing;
        element.children = children;
    }

    /// Append without any formatting; used while parsing.
    pub(crate) fn push_child(&mut self, parent: GlueId, child: GlueId) {
        self.nodes[child.index()].parent = Some(parent);
        let element = self
            .element_mut(parent)
            .expect("glue parent must be an element");
        element.children.push(child);
        element.self_closing = false;
    }

    pub(crate) fn push_top_level(&mut self, id: GlueId) {
        self.top_level.push(id);
    }

    pub(crate) fn set_root_raw(&mut self, id: GlueId) {
        self.root = Some(id);
    }

    /// Insert a detached node into `parent`, before `anchor` or after the
    /// last non-blank child when `anchor` is `None`.
    pub fn insert_before(&mut self, parent: GlueId, node: GlueId, anchor: Option<GlueId>) {
        assert!(
            self.node(node).parent.is_none() && !self.top_level.contains(&node),
            "glue node {:?} is already attached",
            node
        );
        assert!(self.node(parent).is_element(), "glue parent must be an element");

        let old_indent = self.closing_indent(node);
        let mut children = self.children(parent).to_vec();
        let new_indent;

        match anchor {
            Some(anchor) => {
                let position = children
                    .iter()
                    .position(|&c| c == anchor)
                    .expect("anchor must be a child of parent");
                new_indent = self.indent_of(anchor);
                let leading = position
                    .checked_sub(1)
                    .map(|p| children[p])
                    .filter(|&ws| self.node(ws).is_line_break());
                let mut inserted = vec![node];
                if let Some(ws) = leading {
                    let raw = self.raw_characters(ws);
                    inserted.push(self.create_characters(&raw));
                }
                children.splice(position..position, inserted);
            }
            None => {
                let last_content = children
                    .iter()
                    .rposition(|&c| !self.node(c).is_whitespace());
                match last_content {
                    Some(last) => {
                        let last_id = children[last];
                        new_indent = self.indent_of(last_id);
                        let leading = last
                            .checked_sub(1)
                            .map(|p| children[p])
                            .filter(|&ws| self.node(ws).is_line_break());
                        let mut inserted = Vec::new();
                        if let Some(ws) = leading {
                            let raw = self.raw_characters(ws);
                            inserted.push(self.create_characters(&raw));
                        }
                        inserted.push(node);
                        children.splice(last + 1..last + 1, inserted);
                    }
                    None => {
                        let base = self.indent_of(parent);
                        new_indent = format!("{}{}", base, INDENT_UNIT);
                        let opening = self.create_characters(&format!("\n{}", new_indent));
                        let closing = self.create_characters(&format!("\n{}", base));
                        children = vec![opening, node, closing];
                    }
                }
            }
        }

        self.set_children(parent, children);
        if let Some(element) = self.element_mut(parent) {
            element.self_closing = false;
        }
        if let Some(old_indent) = old_indent {
            if old_indent != new_indent {
                self.reindent(node, &old_indent, &new_indent);
            }
        }
    }

    /// Insert a detached node right after `previous`, a child of `parent`.
    pub fn insert_after(&mut self, parent: GlueId, node: GlueId, previous: GlueId) {
        let children = self.children(parent);
        let position = children
            .iter()
            .position(|&c| c == previous)
            .expect("previous must be a child of parent");
        let anchor = children[position + 1..]
            .iter()
            .copied()
            .find(|&c| !self.node(c).is_whitespace());
        match anchor {
            Some(anchor) => self.insert_before(parent, node, Some(anchor)),
            None => self.insert_before(parent, node, None),
        }
    }

    fn raw_characters(&self, id: GlueId) -> String {
        match &self.node(id).data {
            GlueData::Characters(raw) => raw.clone(),
            _ => String::new(),
        }
    }

    /// Detach a node from its parent (or from the top level), dropping the
    /// line break that introduced it.
    pub fn detach(&mut self, node: GlueId) {
        match self.node(node).parent {
            Some(parent) => {
                let mut children = self.children(parent).to_vec();
                let Some(position) = children.iter().position(|&c| c == node) else {
                    return;
                };
                children.remove(position);
                if position > 0 && self.node(children[position - 1]).is_whitespace() {
                    let ws = children.remove(position - 1);
                    self.nodes[ws.index()].parent = None;
                } else if position == 0
                    && children.len() > 1
                    && self.node(children[0]).is_whitespace()
                {
                    let ws = children.remove(0);
                    self.nodes[ws.index()].parent = None;
                }
                let blank = children.iter().all(|&c| self.node(c).is_whitespace());
                if blank {
                    for &c in &children {
                        self.nodes[c.index()].parent = None;
                    }
                    children.clear();
                }
                let element = self
                    .element_mut(parent)
                    .expect("glue parent must be an element");
                element.children = children;
                if blank {
                    element.self_closing = true;
                }
            }
            None => {
                self.top_level.retain(|&id| id != node);
                if self.root == Some(node) {
                    self.root = None;
                }
            }
        }
        self.nodes[node.index()].parent = None;
    }

    /// Make `node` the root element, replacing the current root in place.
    ///
    /// Returns the previous root, now detached.
    pub fn set_root(&mut self, node: Option<GlueId>) -> Option<GlueId> {
        let previous = self.root;
        if previous == node {
            return previous;
        }
        if let Some(node) = node {
            assert!(self.node(node).is_element(), "glue root must be an element");
            if self.node(node).parent.is_some() {
                self.detach(node);
            }
        }
        match (previous, node) {
            (Some(old), Some(new)) => {
                let position = self.top_level.iter().position(|&id| id == old);
                match position {
                    Some(position) => self.top_level[position] = new,
                    None => self.top_level.push(new),
                }
            }
            (Some(old), None) => self.top_level.retain(|&id| id != old),
            (None, Some(new)) => {
                let needs_break = self
                    .top_level
                    .last()
                    .map(|&last| match &self.node(last).data {
                        GlueData::Characters(raw) => !raw.ends_with('\n'),
                        _ => true,
                    })
                    .unwrap_or(false);
                if needs_break {
                    let ws = self.create_characters("\n");
                    self.top_level.push(ws);
                }
                self.top_level.push(new);
                let ws = self.create_characters("\n");
                self.top_level.push(ws);
            }
            (None, None) => {}
        }
        self.root = node;
        previous
    }

    /// Insert a detached node in the top-level list at `index`
    pub fn insert_top_level(&mut self, index: usize, node: GlueId) {
        assert!(self.node(node).parent.is_none(), "top-level node must be detached");
        let index = index.min(self.top_level.len());
        self.top_level.insert(index, node);
    }

    pub fn remove_top_level(&mut self, node: GlueId) {
        assert_ne!(Some(node), self.root, "use set_root to remove the root element");
        self.top_level.retain(|&id| id != node);
    }

    /// Split character data into leading whitespace, core text and trailing
    /// whitespace. The core keeps the original handle; blank parts become
    /// new sibling nodes.
    pub fn split_characters(&mut self, id: GlueId) -> (Option<GlueId>, GlueId, Option<GlueId>) {
        let raw = match &self.node(id).data {
            GlueData::Characters(raw) => raw.clone(),
            other => panic!("split_characters on a non-character glue node: {:?}", other),
        };
        let core = raw.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
        if core.is_empty() || core.len() == raw.len() {
            return (None, id, None);
        }
        let start = raw.find(core).unwrap_or(0);
        let front = &raw[..start];
        let tail = &raw[start + core.len()..];

        let front_id = (!front.is_empty()).then(|| self.create_characters(front));
        let tail_id = (!tail.is_empty()).then(|| self.create_characters(tail));
        self.nodes[id.index()].data = GlueData::Characters(core.to_string());

        let parent = self.node(id).parent;
        let siblings = match parent {
            Some(parent) => match &mut self.nodes[parent.index()].data {
                GlueData::Element(element) => &mut element.children,
                _ => unreachable!("glue parent must be an element"),
            },
            None => &mut self.top_level,
        };
        if let Some(position) = siblings.iter().position(|&c| c == id) {
            let mut replacement = Vec::new();
            replacement.extend(front_id);
            replacement.push(id);
            replacement.extend(tail_id);
            siblings.splice(position..=position, replacement);
        }
        for part in [front_id, tail_id].into_iter().flatten() {
            self.nodes[part.index()].parent = parent;
        }
        (front_id, id, tail_id)
    }

    // ----- copying -----

    /// Deep copy of a subtree inside this document. The copy is detached.
    pub fn duplicate(&mut self, id: GlueId) -> GlueId {
        let mut map = BTreeMap::new();
        self.duplicate_mapped(id, &mut map)
    }

    /// Deep copy recording `original -> copy` for every node of the subtree.
    pub fn duplicate_mapped(&mut self, id: GlueId, map: &mut BTreeMap<GlueId, GlueId>) -> GlueId {
        let mut data = self.node(id).data.clone();
        if let GlueData::Element(element) = &mut data {
            let children = std::mem::take(&mut element.children);
            element.children = children
                .into_iter()
                .map(|child| self.duplicate_mapped(child, map))
                .collect();
        }
        let copy = self.push(data);
        for child in self.children(copy).to_vec() {
            self.nodes[child.index()].parent = Some(copy);
        }
        map.insert(id, copy);
        copy
    }

    /// Deep copy of a subtree of another document into this one.
    pub fn import_subtree(
        &mut self,
        source: &GlueDocument,
        id: GlueId,
        map: &mut BTreeMap<GlueId, GlueId>,
    ) -> GlueId {
        let mut data = source.node(id).data.clone();
        if let GlueData::Element(element) = &mut data {
            let children = std::mem::take(&mut element.children);
            element.children = children
                .into_iter()
                .map(|child| self.import_subtree(source, child, map))
                .collect();
        }
        let copy = self.push(data);
        for child in self.children(copy).to_vec() {
            self.nodes[child.index()].parent = Some(copy);
        }
        map.insert(id, copy);
        copy
    }

    /// Append every node of `other` to this arena. Handles of `other` become
    /// valid here after shifting them by the returned offset. The top level of
    /// `other` is discarded; its nodes arrive detached.
    pub fn absorb(&mut self, other: GlueDocument) -> u32 {
        let offset = self.nodes.len() as u32;
        for mut node in other.nodes {
            node.parent = node.parent.map(|p| p.offset(offset));
            if let GlueData::Element(element) = &mut node.data {
                for child in &mut element.children {
                    *child = child.offset(offset);
                }
            }
            self.nodes.push(node);
        }
        for top in other.top_level {
            self.nodes[top.offset(offset).index()].parent = None;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, serialize};

    #[test]
    fn test_attribute_editing_keeps_position() {
        let mut doc = parse("<Button text='A' fx:id=\"b\"/>").unwrap();
        let root = doc.root().unwrap();
        doc.element_mut(root).unwrap().set_attribute("text", "B & C");
        assert_eq!(serialize(&doc), "<Button text='B &amp; C' fx:id=\"b\"/>");
        doc.element_mut(root).unwrap().set_attribute("visible", "false");
        assert_eq!(
            serialize(&doc),
            "<Button text='B &amp; C' fx:id=\"b\" visible=\"false\"/>"
        );
    }

    #[test]
    fn test_detach_takes_line_break() {
        let source = "<VBox>\n    <A/>\n    <B/>\n</VBox>";
        let mut doc = parse(source).unwrap();
        let root = doc.root().unwrap();
        let a = doc.element_children(root).next().unwrap();
        doc.detach(a);
        assert_eq!(serialize(&doc), "<VBox>\n    <B/>\n</VBox>");
        assert!(doc.node(a).parent().is_none());
    }

    #[test]
    fn test_detach_last_child_collapses_element() {
        let mut doc = parse("<VBox>\n    <A/>\n</VBox>").unwrap();
        let root = doc.root().unwrap();
        let a = doc.element_children(root).next().unwrap();
        doc.detach(a);
        assert_eq!(serialize(&doc), "<VBox/>");
    }

    #[test]
    fn test_insert_before_copies_indentation() {
        let mut doc = parse("<VBox>\n    <A/>\n    <B/>\n</VBox>").unwrap();
        let root = doc.root().unwrap();
        let b = doc.element_children(root).nth(1).unwrap();
        let c = doc.create_element("C");
        doc.insert_before(root, c, Some(b));
        assert_eq!(serialize(&doc), "<VBox>\n    <A/>\n    <C/>\n    <B/>\n</VBox>");
    }

    #[test]
    fn test_append_into_empty_element() {
        let mut doc = parse("<Root>\n    <VBox/>\n</Root>").unwrap();
        let root = doc.root().unwrap();
        let vbox = doc.element_children(root).next().unwrap();
        let c = doc.create_element("C");
        doc.insert_before(vbox, c, None);
        assert_eq!(
            serialize(&doc),
            "<Root>\n    <VBox>\n        <C/>\n    </VBox>\n</Root>"
        );
    }

    #[test]
    fn test_moved_subtree_is_reindented() {
        let source = "<Root>\n    <Deep>\n        <Pane>\n            <X/>\n        </Pane>\n    </Deep>\n    <Shallow/>\n</Root>";
        let mut doc = parse(source).unwrap();
        let root = doc.root().unwrap();
        let deep = doc.element_children(root).next().unwrap();
        let pane = doc.element_children(deep).next().unwrap();
        doc.detach(pane);
        doc.insert_before(root, pane, None);
        assert_eq!(
            serialize(&doc),
            "<Root>\n    <Deep/>\n    <Shallow/>\n    <Pane>\n        <X/>\n    </Pane>\n</Root>"
        );
    }

    #[test]
    fn test_split_characters() {
        let mut doc = parse("<text>\n  Hello\n</text>").unwrap();
        let root = doc.root().unwrap();
        let chars = doc.children(root)[0];
        let (front, core, tail) = doc.split_characters(chars);
        assert_eq!(core, chars);
        assert_eq!(doc.text(core).as_deref(), Some("Hello"));
        assert!(front.is_some() && tail.is_some());
        assert_eq!(doc.children(root).len(), 3);
        assert_eq!(serialize(&doc), "<text>\n  Hello\n</text>");
    }

    #[test]
    fn test_duplicate_is_detached_deep_copy() {
        let mut doc = parse("<A>\n    <B x=\"1\"/>\n</A>").unwrap();
        let root = doc.root().unwrap();
        let copy = doc.duplicate(root);
        assert!(doc.node(copy).parent().is_none());
        assert!(!doc.is_attached(copy));
        let b = doc.element_children(copy).next().unwrap();
        assert_eq!(doc.element(b).unwrap().attribute("x").as_deref(), Some("1"));
    }

    #[test]
    fn test_content_text_and_set() {
        let mut doc = parse("<text>a &amp; b</text>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.content_text(root).as_deref(), Some("a & b"));
        doc.set_content_text(root, "<c>");
        assert_eq!(serialize(&doc), "<text>&lt;c&gt;</text>");
    }

    #[test]
    fn test_set_root_replaces_in_place() {
        let mut doc = parse("<?import a.B?>\n<!-- c -->\n<Old/>\n").unwrap();
        let new_root = doc.create_element("New");
        let old = doc.set_root(Some(new_root));
        assert!(old.is_some());
        assert_eq!(serialize(&doc), "<?import a.B?>\n<!-- c -->\n<New/>\n");
    }
}
