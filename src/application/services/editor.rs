//! Editing session over one active indicator tree
//!
//! Each call runs the corresponding tree operation against the active
//! snapshot and swaps in the result only when it succeeds.

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{
    normalize_str, DataIndicator, Direction, DomainResult, IdGenerator, IndicatorPatch,
    IndicatorTree, LeafDefaults, NewIndicator, NodeActions, SupportingMaterial,
};

pub struct TreeEditor {
    tree: IndicatorTree,
    ids: Box<dyn IdGenerator>,
    defaults: LeafDefaults,
}

impl TreeEditor {
    /// Start a session with an empty tree.
    pub fn new(ids: Box<dyn IdGenerator>, defaults: LeafDefaults) -> Self {
        Self::with_tree(IndicatorTree::new(), ids, defaults)
    }

    pub fn with_tree(tree: IndicatorTree, ids: Box<dyn IdGenerator>, defaults: LeafDefaults) -> Self {
        Self {
            tree,
            ids,
            defaults,
        }
    }

    /// The active snapshot.
    pub fn tree(&self) -> &IndicatorTree {
        &self.tree
    }

    pub fn into_tree(self) -> IndicatorTree {
        self.tree
    }

    pub fn defaults(&self) -> &LeafDefaults {
        &self.defaults
    }

    /// Replace the active snapshot wholesale, e.g. after a load.
    pub fn replace(&mut self, tree: IndicatorTree) {
        self.tree = tree;
    }

    /// Normalize `json` and make it the active snapshot. On any import issue
    /// the current snapshot stays active.
    #[instrument(level = "debug", skip(self, json))]
    pub fn replace_from_import(&mut self, json: &str) -> ApplicationResult<()> {
        let tree = normalize_str(json, self.ids.as_mut(), &self.defaults)?;
        debug!("replace_from_import: {} indicators", tree.len());
        self.tree = tree;
        Ok(())
    }

    fn commit<T>(&mut self, result: DomainResult<(IndicatorTree, T)>) -> ApplicationResult<T> {
        let (tree, value) = result?;
        self.tree = tree;
        Ok(value)
    }

    pub fn add(
        &mut self,
        parent_id: Option<&str>,
        level: u8,
        fields: NewIndicator,
    ) -> ApplicationResult<String> {
        let result = self
            .tree
            .add(parent_id, level, fields, self.ids.as_mut(), &self.defaults);
        self.commit(result)
    }

    pub fn edit(&mut self, id: &str, patch: IndicatorPatch) -> ApplicationResult<()> {
        let result = self.tree.edit(id, patch, self.ids.as_mut(), &self.defaults);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn delete(&mut self, id: &str) {
        self.tree = self.tree.delete(id);
    }

    pub fn move_node(&mut self, id: &str, direction: Direction) -> ApplicationResult<()> {
        let result = self.tree.move_node(id, direction);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn promote(&mut self, id: &str) -> ApplicationResult<()> {
        let result = self.tree.promote(id);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn demote(&mut self, id: &str) -> ApplicationResult<()> {
        let result = self.tree.demote(id);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn available_actions(&self, id: &str) -> Option<NodeActions> {
        self.tree.available_actions(id)
    }

    pub fn add_data_indicator(
        &mut self,
        node_id: &str,
        record: DataIndicator,
    ) -> ApplicationResult<String> {
        let result =
            self.tree
                .add_data_indicator(node_id, record, self.ids.as_mut(), &self.defaults);
        self.commit(result)
    }

    pub fn update_data_indicator(
        &mut self,
        node_id: &str,
        record_id: &str,
        update: impl FnOnce(&mut DataIndicator),
    ) -> ApplicationResult<()> {
        let result = self
            .tree
            .update_data_indicator(node_id, record_id, &self.defaults, update);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn remove_data_indicator(&mut self, node_id: &str, record_id: &str) -> ApplicationResult<()> {
        let result = self.tree.remove_data_indicator(node_id, record_id);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn add_supporting_material(
        &mut self,
        node_id: &str,
        record: SupportingMaterial,
    ) -> ApplicationResult<String> {
        let result =
            self.tree
                .add_supporting_material(node_id, record, self.ids.as_mut(), &self.defaults);
        self.commit(result)
    }

    pub fn update_supporting_material(
        &mut self,
        node_id: &str,
        record_id: &str,
        update: impl FnOnce(&mut SupportingMaterial),
    ) -> ApplicationResult<()> {
        let result = self
            .tree
            .update_supporting_material(node_id, record_id, &self.defaults, update);
        self.commit(result.map(|tree| (tree, ())))
    }

    pub fn remove_supporting_material(
        &mut self,
        node_id: &str,
        record_id: &str,
    ) -> ApplicationResult<()> {
        let result = self.tree.remove_supporting_material(node_id, record_id);
        self.commit(result.map(|tree| (tree, ())))
    }
}
