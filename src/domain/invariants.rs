//! Whole-tree invariant checks and summary statistics

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::arena::{IndicatorTree, LeafContent, NodeKind};
use crate::domain::codes::content_is_current;
use crate::domain::entities::MAX_LEVEL;
use crate::domain::error::InvariantViolation;

/// Counts over one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub indicators: usize,
    pub containers: usize,
    pub leaves: usize,
    pub data_indicators: usize,
    pub supporting_materials: usize,
    pub depth: u8,
}

impl IndicatorTree {
    /// Verify level bounds, leaf/container exclusivity, id uniqueness across
    /// nodes and records, and canonical codes. Returns every violation found.
    pub fn check_invariants(&self) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (_, node) in self.iter() {
            if !seen.insert(node.id.as_str()) {
                violations.push(InvariantViolation::DuplicateId(node.id.clone()));
            }
            if node.name.trim().is_empty() {
                violations.push(InvariantViolation::EmptyName(node.id.clone()));
            }
            let expected = node
                .parent
                .and_then(|parent| self.get_node(parent))
                .map_or(1, |parent| parent.level + 1);
            if node.level != expected {
                violations.push(InvariantViolation::LevelMismatch {
                    id: node.id.clone(),
                    level: node.level,
                    expected,
                });
            }
            if node.level > MAX_LEVEL {
                violations.push(InvariantViolation::TooDeep {
                    id: node.id.clone(),
                    level: node.level,
                    max: MAX_LEVEL,
                });
            }
            match &node.kind {
                NodeKind::Container(children) if children.is_empty() => {
                    violations.push(InvariantViolation::EmptyContainer(node.id.clone()));
                }
                NodeKind::Container(_) if node.level >= MAX_LEVEL => {
                    violations.push(InvariantViolation::ContainerAtMaxLevel {
                        id: node.id.clone(),
                        level: node.level,
                    });
                }
                NodeKind::Leaf(content) if !content_is_current(&node.code, content) => {
                    violations.push(InvariantViolation::StaleCode {
                        id: node.id.clone(),
                        actual: node.code.clone(),
                        expected: format!("{} (records)", node.code),
                    });
                }
                _ => {}
            }
            if let Some(content) = node.content() {
                check_records(&node.id, content, &mut seen, &mut violations);
            }
        }

        for (id, expected) in self.expected_codes() {
            if let Some(node) = self.find(&id) {
                if node.code != expected {
                    violations.push(InvariantViolation::StaleCode {
                        id,
                        actual: node.code.clone(),
                        expected,
                    });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            depth: self.depth(),
            ..TreeStats::default()
        };
        for (_, node) in self.iter() {
            stats.indicators += 1;
            match &node.kind {
                NodeKind::Container(_) => stats.containers += 1,
                NodeKind::Leaf(content) => {
                    stats.leaves += 1;
                    stats.data_indicators += content.data_indicators.len();
                    stats.supporting_materials += content.supporting_materials.len();
                }
            }
        }
        stats
    }
}

fn check_records<'a>(
    node_id: &str,
    content: &'a LeafContent,
    seen: &mut HashSet<&'a str>,
    violations: &mut Vec<InvariantViolation>,
) {
    let records = content
        .data_indicators
        .iter()
        .map(|r| ("data indicator", r.id.as_str(), r.name.as_str()))
        .chain(
            content
                .supporting_materials
                .iter()
                .map(|r| ("supporting material", r.id.as_str(), r.name.as_str())),
        );
    for (kind, id, name) in records {
        if id.trim().is_empty() {
            violations.push(InvariantViolation::MissingRecordId {
                id: node_id.to_string(),
                kind,
            });
        } else if !seen.insert(id) {
            violations.push(InvariantViolation::DuplicateId(id.to_string()));
        }
        if name.trim().is_empty() {
            violations.push(InvariantViolation::EmptyRecordName {
                id: node_id.to_string(),
                record: id.to_string(),
                kind,
            });
        }
    }
}
