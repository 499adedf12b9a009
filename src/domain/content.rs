//! Leaf-content records: data indicators and supporting materials
//!
//! Records live only on leaf indicators. Adding or removing one regenerates
//! the record codes of that leaf; node codes are unaffected.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::arena::{IndicatorTree, LeafContent, NodeKind};
use crate::domain::entities::{DataIndicator, SupportingMaterial, ThresholdType};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{IdGenerator, IdKind};

/// Values given to record fields that were left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafDefaults {
    pub threshold_type: ThresholdType,
    pub precision: u32,
    /// Allow-list entries, comma-joined when applied
    pub file_types: Vec<String>,
    pub max_size: String,
    pub data_indicator_name: String,
    pub material_name: String,
}

impl Default for LeafDefaults {
    fn default() -> Self {
        Self {
            threshold_type: ThresholdType::Single,
            precision: 2,
            file_types: vec!["PDF".into(), "Word".into(), "Excel".into()],
            max_size: "10MB".into(),
            data_indicator_name: "New data indicator".into(),
            material_name: "New supporting material".into(),
        }
    }
}

impl LeafDefaults {
    pub fn file_types_joined(&self) -> String {
        self.file_types.join(",")
    }
}

/// Shared handling for the two record kinds.
pub(crate) trait ContentRecord: Sized {
    const KIND: IdKind;
    const LABEL: &'static str;

    fn id(&self) -> &str;
    fn id_mut(&mut self) -> &mut String;
    fn name(&self) -> &str;
    fn code_mut(&mut self) -> &mut String;
    fn list(content: &LeafContent) -> &[Self];
    fn list_mut(content: &mut LeafContent) -> &mut Vec<Self>;
    fn apply_defaults(&mut self, defaults: &LeafDefaults);
}

impl ContentRecord for DataIndicator {
    const KIND: IdKind = IdKind::DataIndicator;
    const LABEL: &'static str = "data indicator";

    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn code_mut(&mut self) -> &mut String {
        &mut self.code
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn list(content: &LeafContent) -> &[Self] {
        &content.data_indicators
    }
    fn list_mut(content: &mut LeafContent) -> &mut Vec<Self> {
        &mut content.data_indicators
    }
    fn apply_defaults(&mut self, defaults: &LeafDefaults) {
        fill_name(&mut self.name, &defaults.data_indicator_name);
        self.threshold_type.get_or_insert(defaults.threshold_type);
        self.precision.get_or_insert(defaults.precision);
    }
}

impl ContentRecord for SupportingMaterial {
    const KIND: IdKind = IdKind::SupportingMaterial;
    const LABEL: &'static str = "supporting material";

    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn code_mut(&mut self) -> &mut String {
        &mut self.code
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn list(content: &LeafContent) -> &[Self] {
        &content.supporting_materials
    }
    fn list_mut(content: &mut LeafContent) -> &mut Vec<Self> {
        &mut content.supporting_materials
    }
    fn apply_defaults(&mut self, defaults: &LeafDefaults) {
        fill_name(&mut self.name, &defaults.material_name);
        if self.file_types.trim().is_empty() {
            self.file_types = defaults.file_types_joined();
        }
        if self.max_size.trim().is_empty() {
            self.max_size = defaults.max_size.clone();
        }
    }
}

fn fill_name(name: &mut String, default: &str) {
    let trimmed = name.trim();
    *name = if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    };
}

/// First generated id of `kind` not in `taken`.
pub(crate) fn next_unused(kind: IdKind, taken: &HashSet<String>, ids: &mut dyn IdGenerator) -> String {
    loop {
        let id = ids.next_id(kind);
        if !taken.contains(&id) {
            return id;
        }
    }
}

/// Fill defaults and settle ids for records about to enter a tree.
///
/// Blank ids and ids already in `taken` get a fresh one; every id kept or
/// handed out joins `taken`.
pub(crate) fn prepare_records<R: ContentRecord>(
    records: &mut [R],
    taken: &mut HashSet<String>,
    ids: &mut dyn IdGenerator,
    defaults: &LeafDefaults,
) {
    for record in records.iter_mut() {
        record.apply_defaults(defaults);
        let id = record.id().trim().to_string();
        *record.id_mut() = if id.is_empty() || taken.contains(&id) {
            next_unused(R::KIND, taken, ids)
        } else {
            id
        };
        taken.insert(record.id().to_string());
    }
}

impl IndicatorTree {
    /// Every node and record id in the snapshot. Ids are unique across both.
    pub(crate) fn taken_ids(&self) -> HashSet<String> {
        let mut taken = HashSet::new();
        for (_, node) in self.iter() {
            taken.insert(node.id.clone());
            if let Some(content) = node.content() {
                taken.extend(content.data_indicators.iter().map(|r| r.id.clone()));
                taken.extend(content.supporting_materials.iter().map(|r| r.id.clone()));
            }
        }
        taken
    }

    fn require_leaf(&self, node_id: &str) -> DomainResult<generational_arena::Index> {
        let idx = self.require(node_id)?;
        match self.get_node(idx) {
            Some(node) if node.is_leaf() => Ok(idx),
            _ => Err(DomainError::NotALeaf(node_id.to_string())),
        }
    }

    fn require_record<R: ContentRecord>(
        &self,
        node_id: &str,
        record_id: &str,
    ) -> DomainResult<(generational_arena::Index, usize)> {
        let idx = self.require_leaf(node_id)?;
        self.get_node(idx)
            .and_then(|node| node.content())
            .and_then(|content| R::list(content).iter().position(|r| r.id() == record_id))
            .map(|position| (idx, position))
            .ok_or_else(|| DomainError::ContentNotFound {
                id: node_id.to_string(),
                record: record_id.to_string(),
                kind: R::LABEL,
            })
    }

    fn add_record<R: ContentRecord>(
        &self,
        node_id: &str,
        mut record: R,
        ids: &mut dyn IdGenerator,
        defaults: &LeafDefaults,
    ) -> DomainResult<(Self, String)> {
        let idx = self.require_leaf(node_id)?;
        let mut taken = self.taken_ids();
        prepare_records(std::slice::from_mut(&mut record), &mut taken, ids, defaults);
        let record_id = record.id().to_string();

        let mut next = self.clone();
        if let Some(NodeKind::Leaf(content)) = next.node_mut(idx).map(|node| &mut node.kind) {
            R::list_mut(content).push(record);
        }
        next.assign_content_codes(idx);
        Ok((next, record_id))
    }

    fn update_record<R: ContentRecord>(
        &self,
        node_id: &str,
        record_id: &str,
        defaults: &LeafDefaults,
        update: impl FnOnce(&mut R),
    ) -> DomainResult<Self> {
        let (idx, position) = self.require_record::<R>(node_id, record_id)?;

        let mut next = self.clone();
        if let Some(NodeKind::Leaf(content)) = next.node_mut(idx).map(|node| &mut node.kind) {
            if let Some(record) = R::list_mut(content).get_mut(position) {
                let id = record.id().to_string();
                let code = record.code_mut().clone();
                update(record);
                // id and code are not editable
                *record.id_mut() = id;
                *record.code_mut() = code;
                if record.name().trim().is_empty() {
                    return Err(DomainError::EmptyName);
                }
                record.apply_defaults(defaults);
            }
        }
        Ok(next)
    }

    fn remove_record<R: ContentRecord>(&self, node_id: &str, record_id: &str) -> DomainResult<Self> {
        let (idx, position) = self.require_record::<R>(node_id, record_id)?;

        let mut next = self.clone();
        if let Some(NodeKind::Leaf(content)) = next.node_mut(idx).map(|node| &mut node.kind) {
            R::list_mut(content).remove(position);
        }
        next.assign_content_codes(idx);
        Ok(next)
    }

    /// Append a data indicator to a leaf. Returns the new snapshot and record id.
    #[instrument(level = "debug", skip(self, record, ids, defaults))]
    pub fn add_data_indicator(
        &self,
        node_id: &str,
        record: DataIndicator,
        ids: &mut dyn IdGenerator,
        defaults: &LeafDefaults,
    ) -> DomainResult<(Self, String)> {
        self.add_record(node_id, record, ids, defaults)
    }

    /// Change a record in place. Id and code stay fixed; emptied optional
    /// fields fall back to `defaults`.
    #[instrument(level = "debug", skip(self, defaults, update))]
    pub fn update_data_indicator(
        &self,
        node_id: &str,
        record_id: &str,
        defaults: &LeafDefaults,
        update: impl FnOnce(&mut DataIndicator),
    ) -> DomainResult<Self> {
        self.update_record(node_id, record_id, defaults, update)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn remove_data_indicator(&self, node_id: &str, record_id: &str) -> DomainResult<Self> {
        self.remove_record::<DataIndicator>(node_id, record_id)
    }

    /// Append a supporting material to a leaf. Returns the new snapshot and record id.
    #[instrument(level = "debug", skip(self, record, ids, defaults))]
    pub fn add_supporting_material(
        &self,
        node_id: &str,
        record: SupportingMaterial,
        ids: &mut dyn IdGenerator,
        defaults: &LeafDefaults,
    ) -> DomainResult<(Self, String)> {
        self.add_record(node_id, record, ids, defaults)
    }

    /// Change a record in place. Id and code stay fixed; emptied optional
    /// fields fall back to `defaults`.
    #[instrument(level = "debug", skip(self, defaults, update))]
    pub fn update_supporting_material(
        &self,
        node_id: &str,
        record_id: &str,
        defaults: &LeafDefaults,
        update: impl FnOnce(&mut SupportingMaterial),
    ) -> DomainResult<Self> {
        self.update_record(node_id, record_id, defaults, update)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn remove_supporting_material(&self, node_id: &str, record_id: &str) -> DomainResult<Self> {
        self.remove_record::<SupportingMaterial>(node_id, record_id)
    }
}
