//! Structural operations on an indicator tree
//!
//! Every operation borrows the current snapshot and returns a new one with
//! codes regenerated. All checks run against the borrowed snapshot before
//! anything is written, so a rejected operation has no effect.

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{IndicatorNode, IndicatorTree, LeafContent, NodeKind};
use crate::domain::content::{next_unused, prepare_records, LeafDefaults};
use crate::domain::entities::{Direction, IndicatorPatch, NewIndicator, MAX_LEVEL};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{IdGenerator, IdKind};

/// Structural actions currently available for one node.
///
/// Lets a caller disable controls instead of provoking a rejection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeActions {
    pub move_up: bool,
    pub move_down: bool,
    pub promote: bool,
    pub demote: bool,
    pub add_child: bool,
    pub delete: bool,
}

impl IndicatorTree {
    pub(crate) fn require(&self, id: &str) -> DomainResult<Index> {
        self.index_of(id)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))
    }

    fn require_node(&self, idx: Index, id: &str) -> DomainResult<&IndicatorNode> {
        self.get_node(idx)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))
    }

    /// Append a new node under `parent_id`, or at root level when `None`.
    ///
    /// `level` must be 1 for a root and the parent's level + 1 otherwise.
    /// A leaf parent becomes a container and loses its leaf content.
    /// Supplied records get `defaults` and ids unique across the tree.
    /// Returns the new snapshot and the id of the created node.
    #[instrument(level = "debug", skip(self, fields, ids, defaults))]
    pub fn add(
        &self,
        parent_id: Option<&str>,
        level: u8,
        fields: NewIndicator,
        ids: &mut dyn IdGenerator,
        defaults: &LeafDefaults,
    ) -> DomainResult<(Self, String)> {
        let name = fields.name.trim();
        if name.is_empty() {
            return Err(DomainError::EmptyName);
        }
        let parent = match parent_id {
            Some(pid) => {
                let idx = self.require(pid)?;
                Some((idx, self.require_node(idx, pid)?.level))
            }
            None => None,
        };
        let expected = parent.map_or(1, |(_, parent_level)| parent_level + 1);
        if level != expected {
            return Err(DomainError::InvalidLevel { level, expected });
        }
        if level > MAX_LEVEL {
            return Err(DomainError::MaxDepthExceeded {
                id: parent_id.unwrap_or(name).to_string(),
                level,
                max: MAX_LEVEL,
            });
        }

        let mut taken = self.taken_ids();
        let id = next_unused(IdKind::Indicator, &taken, ids);
        taken.insert(id.clone());
        let mut node = IndicatorNode::leaf(id.clone(), name.to_string(), level);
        node.description = fields.description;
        node.weight = fields.weight;
        if fields.is_leaf {
            let mut content = LeafContent {
                data_indicators: fields.data_indicators,
                supporting_materials: fields.supporting_materials,
            };
            prepare_records(&mut content.data_indicators, &mut taken, ids, defaults);
            prepare_records(&mut content.supporting_materials, &mut taken, ids, defaults);
            node.kind = NodeKind::Leaf(content);
        } else {
            node.kind = NodeKind::Container(Vec::new());
        }

        let mut next = self.clone();
        let idx = next.alloc(node);
        next.attach(idx, parent.map(|(parent_idx, _)| parent_idx), None);
        next.restore_leaf_status(idx);
        next.assign_codes();
        debug!("add: {} at level {}", id, level);
        Ok((next, id))
    }

    /// Replace content fields of one node. Never touches structure.
    ///
    /// A replaced record list may keep the ids it had on this node; ids used
    /// anywhere else in the tree are regenerated.
    #[instrument(level = "debug", skip(self, patch, ids, defaults))]
    pub fn edit(
        &self,
        id: &str,
        patch: IndicatorPatch,
        ids: &mut dyn IdGenerator,
        defaults: &LeafDefaults,
    ) -> DomainResult<Self> {
        let idx = self.require(id)?;
        let node = self.require_node(idx, id)?;
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(DomainError::EmptyName);
        }
        let touches_content =
            patch.data_indicators.is_some() || patch.supporting_materials.is_some();
        if touches_content && !node.is_leaf() {
            return Err(DomainError::NotALeaf(id.to_string()));
        }
        let mut taken = self.taken_ids();
        if let Some(content) = node.content() {
            if patch.data_indicators.is_some() {
                for record in &content.data_indicators {
                    taken.remove(&record.id);
                }
            }
            if patch.supporting_materials.is_some() {
                for record in &content.supporting_materials {
                    taken.remove(&record.id);
                }
            }
        }

        let mut next = self.clone();
        if let Some(node) = next.node_mut(idx) {
            if let Some(name) = patch.name {
                node.name = name.trim().to_string();
            }
            if let Some(description) = patch.description {
                node.description = description;
            }
            if let Some(weight) = patch.weight {
                node.weight = weight;
            }
            if let NodeKind::Leaf(content) = &mut node.kind {
                if let Some(mut records) = patch.data_indicators {
                    prepare_records(&mut records, &mut taken, ids, defaults);
                    content.data_indicators = records;
                }
                if let Some(mut records) = patch.supporting_materials {
                    prepare_records(&mut records, &mut taken, ids, defaults);
                    content.supporting_materials = records;
                }
            }
        }
        if touches_content {
            next.assign_content_codes(idx);
        }
        Ok(next)
    }

    /// Remove a node and its subtree. Unknown ids leave the tree as is.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, id: &str) -> Self {
        let Some(idx) = self.index_of(id) else {
            debug!("delete: {} not found, nothing to do", id);
            return self.clone();
        };
        let mut next = self.clone();
        if let Some((parent, _)) = next.detach(idx) {
            next.remove_subtree(idx);
            if let Some(parent) = parent {
                next.restore_leaf_status(parent);
            }
        }
        next.assign_codes();
        next
    }

    /// Swap a node with its neighbour. At the edge of its sibling list this
    /// is a no-op; `available_actions` reports it as disabled.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&self, id: &str, direction: Direction) -> DomainResult<Self> {
        let idx = self.require(id)?;
        let position = self
            .position(idx)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;
        let count = self.siblings(idx).len();
        let target = match direction {
            Direction::Up if position > 0 => position - 1,
            Direction::Down if position + 1 < count => position + 1,
            _ => {
                debug!("move_node: {} cannot move {}, unchanged", id, direction);
                return Ok(self.clone());
            }
        };

        let mut next = self.clone();
        if let Some((parent, _)) = next.detach(idx) {
            next.attach(idx, parent, Some(target));
        }
        next.assign_codes();
        Ok(next)
    }

    /// Lift a node out of its parent, placing it right after the parent.
    #[instrument(level = "debug", skip(self))]
    pub fn promote(&self, id: &str) -> DomainResult<Self> {
        let idx = self.require(id)?;
        let parent = self
            .require_node(idx, id)?
            .parent
            .ok_or_else(|| DomainError::RootPromotion(id.to_string()))?;
        let grandparent = self.get_node(parent).and_then(|node| node.parent);
        let parent_position = self
            .position(parent)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;

        let mut next = self.clone();
        next.detach(idx);
        next.attach(idx, grandparent, Some(parent_position + 1));
        next.shift_levels(idx, -1);
        next.restore_leaf_status(parent);
        next.assign_codes();
        Ok(next)
    }

    /// Move a node to the end of its preceding sibling's children.
    ///
    /// The sibling must already be a container and the node's subtree must
    /// still fit within the level bound one level down.
    #[instrument(level = "debug", skip(self))]
    pub fn demote(&self, id: &str) -> DomainResult<Self> {
        let idx = self.require(id)?;
        let node = self.require_node(idx, id)?;
        let position = self
            .position(idx)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;
        let target = position
            .checked_sub(1)
            .and_then(|before| self.siblings(idx).get(before).copied())
            .ok_or_else(|| DomainError::NoPrecedingSibling(id.to_string()))?;
        let target_node = self.require_node(target, id)?;
        if target_node.is_leaf() {
            return Err(DomainError::TargetIsLeaf {
                id: id.to_string(),
                target: target_node.id.clone(),
            });
        }
        let deepest = node.level + self.subtree_height(idx);
        if deepest > MAX_LEVEL {
            return Err(DomainError::MaxDepthExceeded {
                id: id.to_string(),
                level: deepest,
                max: MAX_LEVEL,
            });
        }

        let mut next = self.clone();
        next.detach(idx);
        next.attach(idx, Some(target), None);
        next.shift_levels(idx, 1);
        next.assign_codes();
        Ok(next)
    }

    /// Which structural actions would currently succeed for `id`.
    pub fn available_actions(&self, id: &str) -> Option<NodeActions> {
        let idx = self.index_of(id)?;
        let node = self.get_node(idx)?;
        let siblings = self.siblings(idx);
        let position = self.position(idx)?;
        let demote = position
            .checked_sub(1)
            .and_then(|before| siblings.get(before))
            .and_then(|&target| self.get_node(target))
            .is_some_and(|target| !target.is_leaf())
            && node.level + self.subtree_height(idx) <= MAX_LEVEL;
        Some(NodeActions {
            move_up: position > 0,
            move_down: position + 1 < siblings.len(),
            promote: node.parent.is_some(),
            demote,
            add_child: node.level < MAX_LEVEL,
            delete: true,
        })
    }
}
