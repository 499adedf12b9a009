//! Rendering of indicator trees with `termtree`
use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::{IndicatorNode, IndicatorTree, NodeKind};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn label(node: &IndicatorNode) -> String {
    let mut label = node.to_string();
    if let Some(weight) = node.weight {
        label.push_str(&format!(" ({}%)", weight));
    }
    if let NodeKind::Leaf(content) = &node.kind {
        label.push_str(&format!(
            " [{}D/{}M]",
            content.data_indicators.len(),
            content.supporting_materials.len()
        ));
    }
    label
}

impl TreeNodeConvert for IndicatorTree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &IndicatorTree, idx: Index) -> Option<Tree<String>> {
            let node = tree.get_node(idx)?;
            let leaves: Vec<_> = node
                .children()
                .iter()
                .filter_map(|&child| build_tree(tree, child))
                .collect();
            Some(Tree::new(label(node)).with_leaves(leaves))
        }

        let title = if self.is_empty() {
            "Empty tree".to_string()
        } else {
            format!("Indicators ({})", self.len())
        };
        let roots: Vec<_> = self
            .roots()
            .iter()
            .filter_map(|&root| build_tree(self, root))
            .collect();
        Tree::new(title).with_leaves(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LeafDefaults, NewIndicator, SequentialIdGenerator};

    #[test]
    fn given_nested_tree_when_rendering_then_shows_codes_and_record_counts() {
        let mut ids = SequentialIdGenerator::new();
        let defaults = LeafDefaults::default();
        let (tree, a) = IndicatorTree::new()
            .add(None, 1, NewIndicator::leaf("Teaching"), &mut ids, &defaults)
            .unwrap();
        let (tree, _) = tree
            .add(Some(&a), 2, NewIndicator::leaf("Staff").with_weight(40.0), &mut ids, &defaults)
            .unwrap();
        let rendered = tree.to_tree_string().to_string();
        assert!(rendered.starts_with("Indicators (2)"));
        assert!(rendered.contains("1 Teaching"));
        assert!(rendered.contains("1.1 Staff (40%) [0D/0M]"));
    }
}
