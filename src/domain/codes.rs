//! Positional code generation
//!
//! Codes are a pure function of tree shape: `1`, `1.2`, `1.2.3` for nodes,
//! `1.2-D1` / `1.2-M1` for the records of leaf `1.2`.

use generational_arena::Index;
use tracing::instrument;

use crate::domain::arena::{IndicatorNode, IndicatorTree, LeafContent, NodeKind};

/// Code of the node at 0-based `index` under `parent` (or at root level).
pub fn node_code(parent: Option<&str>, index: usize) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{}.{}", parent, index + 1),
        _ => (index + 1).to_string(),
    }
}

pub fn data_indicator_code(leaf_code: &str, index: usize) -> String {
    format!("{}-D{}", leaf_code, index + 1)
}

pub fn material_code(leaf_code: &str, index: usize) -> String {
    format!("{}-M{}", leaf_code, index + 1)
}

pub(crate) fn content_is_current(leaf_code: &str, content: &LeafContent) -> bool {
    content
        .data_indicators
        .iter()
        .enumerate()
        .all(|(i, di)| di.code == data_indicator_code(leaf_code, i))
        && content
            .supporting_materials
            .iter()
            .enumerate()
            .all(|(i, sm)| sm.code == material_code(leaf_code, i))
}

fn recode_content(leaf_code: &str, content: &mut LeafContent) {
    for (i, di) in content.data_indicators.iter_mut().enumerate() {
        di.code = data_indicator_code(leaf_code, i);
    }
    for (i, sm) in content.supporting_materials.iter_mut().enumerate() {
        sm.code = material_code(leaf_code, i);
    }
}

fn is_current(node: &IndicatorNode, code: &str) -> bool {
    node.code == code
        && node
            .content()
            .map_or(true, |content| content_is_current(code, content))
}

impl IndicatorTree {
    /// Recompute every code top-down.
    ///
    /// Nodes whose code is already correct are not written, so they stay
    /// shared with earlier snapshots. Running it twice changes nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn assign_codes(&mut self) {
        let mut stack: Vec<(Index, String)> = self
            .roots()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &idx)| (idx, node_code(None, i)))
            .collect();

        while let Some((idx, code)) = stack.pop() {
            let children = self.children(idx);
            for (i, &child) in children.iter().enumerate().rev() {
                stack.push((child, node_code(Some(&code), i)));
            }
            self.set_code(idx, code);
        }
    }

    /// Recode only the leaf-content records of `idx`.
    pub(crate) fn assign_content_codes(&mut self, idx: Index) {
        let Some(code) = self.get_node(idx).map(|node| node.code.clone()) else {
            return;
        };
        self.set_code(idx, code);
    }

    fn set_code(&mut self, idx: Index, code: String) {
        match self.get_node(idx) {
            Some(node) if !is_current(node, &code) => {}
            _ => return,
        }
        if let Some(IndicatorNode {
            code: current, kind, ..
        }) = self.node_mut(idx)
        {
            *current = code;
            if let NodeKind::Leaf(content) = kind {
                recode_content(current.as_str(), content);
            }
        }
    }

    /// Codes every node and record would have after `assign_codes`.
    pub(crate) fn expected_codes(&self) -> Vec<(String, String)> {
        let mut expected = Vec::with_capacity(self.len());
        let mut stack: Vec<(Index, String)> = self
            .roots()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &idx)| (idx, node_code(None, i)))
            .collect();
        while let Some((idx, code)) = stack.pop() {
            if let Some(node) = self.get_node(idx) {
                for (i, &child) in node.children().iter().enumerate().rev() {
                    stack.push((child, node_code(Some(&code), i)));
                }
                expected.push((node.id.clone(), code));
            }
        }
        expected
    }
}
