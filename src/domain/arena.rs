use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::entities::{DataIndicator, Indicator, SupportingMaterial};

/// Records attached to a leaf indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafContent {
    pub data_indicators: Vec<DataIndicator>,
    pub supporting_materials: Vec<SupportingMaterial>,
}

/// Leaf/container status of a node. A container owns its ordered children.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(LeafContent),
    Container(Vec<Index>),
}

/// Indicator node stored in the arena.
#[derive(Debug, Clone)]
pub struct IndicatorNode {
    /// Stable identifier, never recomputed
    pub id: String,
    /// Derived positional code
    pub code: String,
    pub name: String,
    pub description: String,
    /// 1 for roots
    pub level: u8,
    pub weight: Option<f64>,
    /// Arena index of the parent, None for roots
    pub parent: Option<Index>,
    pub kind: NodeKind,
}

impl IndicatorNode {
    pub(crate) fn leaf(id: String, name: String, level: u8) -> Self {
        Self {
            id,
            code: String::new(),
            name,
            description: String::new(),
            level,
            weight: None,
            parent: None,
            kind: NodeKind::Leaf(LeafContent::default()),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Child indices in order; empty for leaves.
    pub fn children(&self) -> &[Index] {
        match &self.kind {
            NodeKind::Container(children) => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    pub fn content(&self) -> Option<&LeafContent> {
        match &self.kind {
            NodeKind::Leaf(content) => Some(content),
            NodeKind::Container(_) => None,
        }
    }
}

impl fmt::Display for IndicatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.name)
    }
}

/// Arena-based indicator forest.
///
/// Nodes are held behind `Arc`, so cloning a tree shares every node and a
/// mutation copies only the nodes it touches. Structural operations take
/// `&self` and return a new tree; see `mutator.rs`.
#[derive(Debug, Clone)]
pub struct IndicatorTree {
    arena: Arena<Arc<IndicatorNode>>,
    /// Level-1 nodes in order
    roots: Vec<Index>,
    by_id: HashMap<String, Index>,
}

impl Default for IndicatorTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for IndicatorTree {
    fn eq(&self, other: &Self) -> bool {
        self.to_document() == other.to_document()
    }
}

impl IndicatorTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn get_node(&self, idx: Index) -> Option<&IndicatorNode> {
        self.arena.get(idx).map(|node| node.as_ref())
    }

    pub fn index_of(&self, id: &str) -> Option<Index> {
        self.by_id.get(id).copied()
    }

    pub fn find(&self, id: &str) -> Option<&IndicatorNode> {
        self.index_of(id).and_then(|idx| self.get_node(idx))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&IndicatorNode> {
        self.iter().map(|(_, node)| node).find(|node| node.code == code)
    }

    pub fn parent_of(&self, id: &str) -> Option<&IndicatorNode> {
        self.find(id)
            .and_then(|node| node.parent)
            .and_then(|parent| self.get_node(parent))
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        self.get_node(idx).map(|node| node.children()).unwrap_or(&[])
    }

    /// The sibling list `idx` lives in: its parent's children or the roots.
    pub fn siblings(&self, idx: Index) -> &[Index] {
        match self.get_node(idx).and_then(|node| node.parent) {
            Some(parent) => self.children(parent),
            None => &self.roots,
        }
    }

    /// 0-based sibling index.
    pub fn position(&self, idx: Index) -> Option<usize> {
        self.siblings(idx).iter().position(|&i| i == idx)
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels in the deepest branch, 0 for an empty tree.
    #[instrument(level = "trace", skip(self))]
    pub fn depth(&self) -> u8 {
        self.roots
            .iter()
            .map(|&root| self.subtree_height(root))
            .max()
            .unwrap_or(0)
    }

    /// Levels spanned by the subtree at `idx`, counting the node itself.
    pub fn subtree_height(&self, idx: Index) -> u8 {
        match self.get_node(idx) {
            Some(node) => {
                1 + node
                    .children()
                    .iter()
                    .map(|&child| self.subtree_height(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Leaf nodes in document order.
    pub fn leaf_nodes(&self) -> Vec<&IndicatorNode> {
        self.iter()
            .map(|(_, node)| node)
            .filter(|node| node.is_leaf())
            .collect()
    }

    /// Mutable access, copying the node out of any shared snapshot first.
    pub(crate) fn node_mut(&mut self, idx: Index) -> Option<&mut IndicatorNode> {
        self.arena.get_mut(idx).map(Arc::make_mut)
    }

    /// Store a detached node and index its id.
    pub(crate) fn alloc(&mut self, node: IndicatorNode) -> Index {
        let id = node.id.clone();
        let idx = self.arena.insert(Arc::new(node));
        self.by_id.insert(id, idx);
        idx
    }

    /// Link `idx` under `parent` (or as a root) at `position`, appending when
    /// `None`. A leaf parent becomes a container and loses its leaf content.
    pub(crate) fn attach(&mut self, idx: Index, parent: Option<Index>, position: Option<usize>) {
        if let Some(node) = self.node_mut(idx) {
            node.parent = parent;
        }
        match parent {
            None => {
                let at = position.unwrap_or(self.roots.len()).min(self.roots.len());
                self.roots.insert(at, idx);
            }
            Some(parent_idx) => {
                if let Some(parent_node) = self.node_mut(parent_idx) {
                    if let NodeKind::Leaf(content) = &parent_node.kind {
                        if content != &LeafContent::default() {
                            debug!(
                                "attach: {} becomes a container, dropping its leaf content",
                                parent_node.id
                            );
                        }
                        parent_node.kind = NodeKind::Container(Vec::new());
                    }
                    if let NodeKind::Container(children) = &mut parent_node.kind {
                        let at = position.unwrap_or(children.len()).min(children.len());
                        children.insert(at, idx);
                    }
                }
            }
        }
    }

    /// Unlink `idx` from its sibling list. Returns the former parent and position.
    pub(crate) fn detach(&mut self, idx: Index) -> Option<(Option<Index>, usize)> {
        let parent = self.get_node(idx)?.parent;
        let siblings = match parent {
            None => &mut self.roots,
            Some(parent_idx) => match &mut self.node_mut(parent_idx)?.kind {
                NodeKind::Container(children) => children,
                NodeKind::Leaf(_) => return None,
            },
        };
        let position = siblings.iter().position(|&i| i == idx)?;
        siblings.remove(position);
        Some((parent, position))
    }

    /// Drop `idx` and all its descendants from storage. Call after `detach`.
    pub(crate) fn remove_subtree(&mut self, idx: Index) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current) {
                self.by_id.remove(&node.id);
                stack.extend_from_slice(node.children());
            }
        }
    }

    /// A container left without children turns back into an empty leaf.
    ///
    /// This is the single place the rule is enforced; every structural
    /// operation calls it on the nodes it may have emptied.
    pub(crate) fn restore_leaf_status(&mut self, idx: Index) -> bool {
        let emptied = matches!(
            self.get_node(idx).map(|node| &node.kind),
            Some(NodeKind::Container(children)) if children.is_empty()
        );
        if emptied {
            if let Some(node) = self.node_mut(idx) {
                debug!("restore_leaf_status: {} has no children left, now a leaf", node.id);
                node.kind = NodeKind::Leaf(LeafContent::default());
            }
        }
        emptied
    }

    /// Move the level of `idx` and its whole subtree by `delta`.
    pub(crate) fn shift_levels(&mut self, idx: Index, delta: i8) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node_mut(current) {
                node.level = (i16::from(node.level) + i16::from(delta)) as u8;
                stack.extend_from_slice(node.children());
            }
        }
    }

    /// Serialize the snapshot into document form.
    pub fn to_document(&self) -> Vec<Indicator> {
        self.roots
            .iter()
            .filter_map(|&root| self.node_document(root))
            .collect()
    }

    fn node_document(&self, idx: Index) -> Option<Indicator> {
        let node = self.get_node(idx)?;
        let mut doc = Indicator {
            id: node.id.clone(),
            code: node.code.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            level: node.level,
            is_leaf: node.is_leaf(),
            weight: node.weight,
            ..Indicator::default()
        };
        match &node.kind {
            NodeKind::Leaf(content) => {
                doc.data_indicators = Some(content.data_indicators.clone());
                doc.supporting_materials = Some(content.supporting_materials.clone());
            }
            NodeKind::Container(children) => {
                doc.children = Some(
                    children
                        .iter()
                        .filter_map(|&child| self.node_document(child))
                        .collect(),
                );
            }
        }
        Some(doc)
    }

    /// Build a tree from documents already checked by the normalizer.
    ///
    /// Levels come from nesting position; codes are copied and must be
    /// reassigned by the caller.
    pub(crate) fn from_document(nodes: &[Indicator]) -> Self {
        let mut tree = Self::new();
        for node in nodes {
            tree.insert_document(node, None, 1);
        }
        tree
    }

    fn insert_document(&mut self, doc: &Indicator, parent: Option<Index>, level: u8) {
        let mut node = IndicatorNode::leaf(doc.id.clone(), doc.name.clone(), level);
        node.code = doc.code.clone();
        node.description = doc.description.clone();
        node.weight = doc.weight;
        let children = doc.children.as_deref().unwrap_or_default();
        if doc.is_leaf || children.is_empty() {
            node.kind = NodeKind::Leaf(LeafContent {
                data_indicators: doc.data_indicators.clone().unwrap_or_default(),
                supporting_materials: doc.supporting_materials.clone().unwrap_or_default(),
            });
        } else {
            node.kind = NodeKind::Container(Vec::new());
        }
        let is_leaf = node.is_leaf();
        let idx = self.alloc(node);
        self.attach(idx, parent, None);
        if !is_leaf {
            for child in children {
                self.insert_document(child, Some(idx), level + 1);
            }
        }
    }
}

/// Pre-order traversal over all roots, left to right.
pub struct TreeIterator<'a> {
    tree: &'a IndicatorTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a IndicatorTree) -> Self {
        let stack = tree.roots().iter().rev().copied().collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a IndicatorNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current) {
                // reverse push keeps left-to-right order
                self.stack.extend(node.children().iter().rev());
                return Some((current, node));
            }
        }
        None
    }
}

/// Post-order traversal: children before their parent.
pub struct PostOrderIterator<'a> {
    tree: &'a IndicatorTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a IndicatorTree) -> Self {
        let stack = tree.roots().iter().rev().map(|&idx| (idx, false)).collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a IndicatorNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for &child in node.children().iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str, level: u8) -> IndicatorNode {
        IndicatorNode::leaf(id.to_string(), id.to_uppercase(), level)
    }

    //  a
    //  ├── a1
    //  │   └── a11
    //  └── a2
    //  b
    fn sample() -> IndicatorTree {
        let mut tree = IndicatorTree::new();
        let a = tree.alloc(leaf("a", 1));
        tree.attach(a, None, None);
        let a1 = tree.alloc(leaf("a1", 2));
        tree.attach(a1, Some(a), None);
        let a11 = tree.alloc(leaf("a11", 3));
        tree.attach(a11, Some(a1), None);
        let a2 = tree.alloc(leaf("a2", 2));
        tree.attach(a2, Some(a), None);
        let b = tree.alloc(leaf("b", 1));
        tree.attach(b, None, None);
        tree
    }

    fn ids<'a>(it: impl Iterator<Item = (Index, &'a IndicatorNode)>) -> Vec<String> {
        it.map(|(_, n)| n.id.clone()).collect()
    }

    #[test]
    fn given_forest_when_iterating_then_visits_preorder_and_postorder() {
        let tree = sample();
        assert_eq!(ids(tree.iter()), vec!["a", "a1", "a11", "a2", "b"]);
        assert_eq!(ids(tree.iter_postorder()), vec!["a11", "a1", "a2", "a", "b"]);
    }

    #[test]
    fn given_forest_when_measuring_then_reports_depth_and_leaves() {
        let tree = sample();
        assert_eq!(tree.depth(), 3);
        let a1 = tree.index_of("a1").unwrap();
        assert_eq!(tree.subtree_height(a1), 2);
        let leaves: Vec<_> = tree.leaf_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(leaves, vec!["a11", "a2", "b"]);
    }

    #[test]
    fn given_only_child_when_detached_then_parent_restores_leaf_status() {
        let mut tree = sample();
        let a11 = tree.index_of("a11").unwrap();
        let a1 = tree.index_of("a1").unwrap();
        assert_eq!(tree.detach(a11), Some((Some(a1), 0)));
        tree.remove_subtree(a11);
        assert!(tree.restore_leaf_status(a1));
        assert!(tree.find("a1").unwrap().is_leaf());
        assert!(!tree.contains("a11"));
    }

    #[test]
    fn given_cloned_snapshot_when_mutating_then_original_is_untouched() {
        let original = sample();
        let mut copy = original.clone();
        let b = copy.index_of("b").unwrap();
        copy.node_mut(b).unwrap().name = "changed".into();
        assert_eq!(original.find("b").unwrap().name, "B");
        assert_eq!(copy.find("b").unwrap().name, "changed");
        // untouched nodes are still shared
        let a = original.index_of("a").unwrap();
        assert!(Arc::ptr_eq(&original.arena[a], &copy.arena[a]));
    }

    #[test]
    fn given_tree_when_round_tripping_document_then_structure_is_kept() {
        let tree = sample();
        let doc = tree.to_document();
        assert_eq!(doc.len(), 2);
        assert!(!doc[0].is_leaf);
        assert_eq!(doc[0].children.as_ref().unwrap().len(), 2);
        assert_eq!(IndicatorTree::from_document(&doc), tree);
    }
}
