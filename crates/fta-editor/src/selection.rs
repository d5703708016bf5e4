//! Multi-selection of annotations and raw DSL nodes.
//!
//! The set never holds an item together with one of its ancestors.

use crate::engine::AnnotationEngine;
use fta_core::geometry::Bounds;
use fta_core::id::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionKind {
    Annotation,
    Dsl,
}

/// One selected item. An annotation and a DSL node may share an id; the
/// kind tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionItem {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: SelectionKind,
}

impl SelectionItem {
    pub fn annotation(id: NodeId) -> Self {
        Self {
            id,
            kind: SelectionKind::Annotation,
        }
    }

    pub fn dsl(id: NodeId) -> Self {
        Self {
            id,
            kind: SelectionKind::Dsl,
        }
    }
}

/// How a multi-select addition treats an already-selected ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiSelectMode {
    /// Plain toggle: a descendant of a selected item is refused.
    #[default]
    Toggle,
    /// Explicit "select parent": selected ancestors give way to the new item.
    SelectParent,
}

/// What a selection call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionChange {
    Added,
    Removed,
    Refused,
    Replaced,
}

/// Answers "is `a` an ancestor of `b`" for selection items.
pub trait AncestryOracle {
    fn is_ancestor_of(&self, a: &SelectionItem, b: &SelectionItem) -> bool;
}

/// Ordered, duplicate-free selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    items: Vec<SelectionItem>,
}

impl SelectionSet {
    /// Replace the whole set with `item`.
    pub fn select_single(&mut self, item: SelectionItem) -> SelectionChange {
        self.items.clear();
        self.items.push(item);
        SelectionChange::Replaced
    }

    /// Toggle `item` in or out of the set.
    pub fn toggle(
        &mut self,
        item: SelectionItem,
        mode: MultiSelectMode,
        oracle: &dyn AncestryOracle,
    ) -> SelectionChange {
        if self.remove(&item) {
            return SelectionChange::Removed;
        }
        if self.items.iter().any(|s| oracle.is_ancestor_of(&item, s)) {
            log::debug!("selection refused: {} is an ancestor of a selected item", item.id);
            return SelectionChange::Refused;
        }
        let has_selected_ancestor = self.items.iter().any(|s| oracle.is_ancestor_of(s, &item));
        if has_selected_ancestor {
            match mode {
                MultiSelectMode::Toggle => {
                    log::debug!("selection refused: {} is inside a selected item", item.id);
                    return SelectionChange::Refused;
                }
                MultiSelectMode::SelectParent => {
                    self.items.retain(|s| !oracle.is_ancestor_of(s, &item));
                }
            }
        }
        self.items.push(item);
        SelectionChange::Added
    }

    pub fn remove(&mut self, item: &SelectionItem) -> bool {
        let before = self.items.len();
        self.items.retain(|s| s != item);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, item: &SelectionItem) -> bool {
        self.items.contains(item)
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ancestry from the engine's current state: DSL adjacency when both items
/// are DSL nodes, strict box containment otherwise.
pub struct EngineAncestry<'a> {
    engine: &'a AnnotationEngine,
}

impl<'a> EngineAncestry<'a> {
    pub fn new(engine: &'a AnnotationEngine) -> Self {
        Self { engine }
    }
}

impl AncestryOracle for EngineAncestry<'_> {
    fn is_ancestor_of(&self, a: &SelectionItem, b: &SelectionItem) -> bool {
        if a.kind == SelectionKind::Dsl && b.kind == SelectionKind::Dsl {
            return self.engine.dsl.is_ancestor_of(a.id, b.id);
        }
        match (self.engine.item_bounds(a), self.engine.item_bounds(b)) {
            (Some(outer), Some(inner)) => outer.strictly_encloses(&inner),
            _ => false,
        }
    }
}

impl AnnotationEngine {
    /// Absolute box of a selection item, `None` when it no longer resolves.
    pub fn item_bounds(&self, item: &SelectionItem) -> Option<Bounds> {
        match item.kind {
            SelectionKind::Annotation => self.find_by_id(item.id).map(|n| n.bounds()),
            SelectionKind::Dsl => self
                .dsl
                .get_by_id(item.id)
                .map(|_| self.dsl_bounds(item.id)),
        }
    }

    /// Single-select.
    pub fn select(&mut self, item: SelectionItem) -> SelectionChange {
        self.selection.select_single(item)
    }

    /// Multi-select toggle, checked against the current trees.
    pub fn toggle_select(&mut self, item: SelectionItem, mode: MultiSelectMode) -> SelectionChange {
        let mut selection = std::mem::take(&mut self.selection);
        let change = selection.toggle(item, mode, &EngineAncestry::new(self));
        self.selection = selection;
        change
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fta_core::annotation::AnnotationExtra;
    use fta_core::config::EngineConfig;
    use fta_core::dsl::{DslTree, RawDslNode};
    use pretty_assertions::assert_eq;

    fn n(id: &str) -> NodeId {
        NodeId::intern(id)
    }

    fn engine() -> AnnotationEngine {
        let raw = RawDslNode::new("sel_page", "frame", 0.0, 0.0, 400.0, 400.0).with_children(vec![
            RawDslNode::new("sel_card", "frame", 10.0, 10.0, 200.0, 100.0).with_children(vec![
                RawDslNode::new("sel_title", "text", 10.0, 10.0, 100.0, 20.0),
            ]),
            RawDslNode::new("sel_footer", "frame", 10.0, 300.0, 380.0, 80.0),
        ]);
        AnnotationEngine::new(DslTree::from_raw(&raw).unwrap(), EngineConfig::default())
    }

    #[test]
    fn single_select_replaces() {
        let mut e = engine();
        e.select(SelectionItem::dsl(n("sel_card")));
        assert_eq!(e.select(SelectionItem::dsl(n("sel_footer"))), SelectionChange::Replaced);
        assert_eq!(e.selection.items(), &[SelectionItem::dsl(n("sel_footer"))]);
    }

    #[test]
    fn toggle_adds_and_removes() {
        let mut e = engine();
        let card = SelectionItem::dsl(n("sel_card"));
        let footer = SelectionItem::dsl(n("sel_footer"));
        assert_eq!(e.toggle_select(card, MultiSelectMode::Toggle), SelectionChange::Added);
        assert_eq!(e.toggle_select(footer, MultiSelectMode::Toggle), SelectionChange::Added);
        assert_eq!(e.toggle_select(card, MultiSelectMode::Toggle), SelectionChange::Removed);
        assert_eq!(e.selection.items(), &[footer]);
    }

    #[test]
    fn ancestor_of_selected_is_refused() {
        let mut e = engine();
        e.toggle_select(SelectionItem::dsl(n("sel_title")), MultiSelectMode::Toggle);
        let change = e.toggle_select(SelectionItem::dsl(n("sel_card")), MultiSelectMode::SelectParent);
        assert_eq!(change, SelectionChange::Refused);
        assert_eq!(e.selection.len(), 1);
    }

    #[test]
    fn descendant_depends_on_mode() {
        let mut e = engine();
        let card = SelectionItem::dsl(n("sel_card"));
        let title = SelectionItem::dsl(n("sel_title"));
        e.toggle_select(card, MultiSelectMode::Toggle);
        assert_eq!(e.toggle_select(title, MultiSelectMode::Toggle), SelectionChange::Refused);
        assert_eq!(e.toggle_select(title, MultiSelectMode::SelectParent), SelectionChange::Added);
        assert_eq!(e.selection.items(), &[title]);
    }

    #[test]
    fn mixed_kinds_use_spatial_containment() {
        let mut e = engine();
        e.create_annotation(n("sel_card"), "Card", AnnotationExtra::default());
        e.toggle_select(SelectionItem::annotation(n("sel_card")), MultiSelectMode::Toggle);
        let change = e.toggle_select(SelectionItem::dsl(n("sel_title")), MultiSelectMode::Toggle);
        assert_eq!(change, SelectionChange::Refused);
        // footer lies outside the card box
        let change = e.toggle_select(SelectionItem::dsl(n("sel_footer")), MultiSelectMode::Toggle);
        assert_eq!(change, SelectionChange::Added);
    }

    #[test]
    fn selection_item_serde_shape() {
        let json = serde_json::to_string(&SelectionItem::dsl(n("sel_card"))).unwrap();
        assert_eq!(json, r#"{"id":"sel_card","type":"DSL"}"#);
    }
}
