//! Import normalization: loosely-shaped JSON into an invariant-satisfying tree
//!
//! Accepts a top-level array of indicators or an object with a `tree` array.
//! Every problem in the document is collected before rejecting it; nothing is
//! dropped or guessed. Supplied codes are discarded and regenerated.
//!
//! Levels follow nesting position (roots are level 1). A declared `level` is
//! honoured as a constraint: a node declared at level 3 may not carry
//! children, and a declared level above 3 is rejected.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::domain::arena::IndicatorTree;
use crate::domain::content::LeafDefaults;
use crate::domain::entities::{
    DataIndicator, Indicator, SupportingMaterial, ThresholdType, MAX_LEVEL,
};
use crate::domain::error::{ImportError, ImportIssue, ImportIssueKind};
use crate::domain::ids::{IdGenerator, IdKind};

/// Parse and normalize an import document.
pub fn normalize_str(
    json: &str,
    ids: &mut dyn IdGenerator,
    defaults: &LeafDefaults,
) -> Result<IndicatorTree, ImportError> {
    let raw: Value = serde_json::from_str(json)
        .map_err(|e| ImportError::single("$", ImportIssueKind::Syntax(e.to_string())))?;
    normalize(&raw, ids, defaults)
}

/// Normalize an already parsed document.
#[instrument(level = "debug", skip_all)]
pub fn normalize(
    raw: &Value,
    ids: &mut dyn IdGenerator,
    defaults: &LeafDefaults,
) -> Result<IndicatorTree, ImportError> {
    let (nodes, base) = match raw {
        Value::Array(nodes) => (nodes, "$".to_string()),
        Value::Object(obj) => match obj.get("tree") {
            Some(Value::Array(nodes)) => (nodes, "$.tree".to_string()),
            _ => return Err(ImportError::single("$", ImportIssueKind::Format)),
        },
        _ => return Err(ImportError::single("$", ImportIssueKind::Format)),
    };

    let mut normalizer = Normalizer::new(ids, defaults);
    normalizer.reserve_ids(nodes);
    let docs: Vec<Indicator> = nodes
        .iter()
        .enumerate()
        .filter_map(|(i, node)| normalizer.indicator(node, &format!("{}[{}]", base, i), 1))
        .collect();

    if !normalizer.issues.is_empty() {
        debug!("normalize: rejected with {} issues", normalizer.issues.len());
        return Err(ImportError {
            issues: normalizer.issues,
        });
    }

    let mut tree = IndicatorTree::from_document(&docs);
    tree.assign_codes();
    debug!("normalize: accepted {} indicators", tree.len());
    Ok(tree)
}

impl IndicatorTree {
    /// Export document: the snapshot as a pretty-printed array of indicators.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_document())
    }
}

/// Text form of scalars; objects, arrays and null have none.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Field lookup where `null` counts as absent.
fn field<'v>(obj: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    obj.get(key).filter(|v| !v.is_null())
}

struct Normalizer<'a> {
    ids: &'a mut dyn IdGenerator,
    defaults: &'a LeafDefaults,
    issues: Vec<ImportIssue>,
    /// Ids supplied anywhere in the document; generated ids avoid them
    reserved: HashSet<String>,
    /// Ids already handed out, supplied or generated
    used: HashSet<String>,
}

impl<'a> Normalizer<'a> {
    fn new(ids: &'a mut dyn IdGenerator, defaults: &'a LeafDefaults) -> Self {
        Self {
            ids,
            defaults,
            issues: Vec::new(),
            reserved: HashSet::new(),
            used: HashSet::new(),
        }
    }

    fn issue(&mut self, path: &str, kind: ImportIssueKind) {
        self.issues.push(ImportIssue::new(path, kind));
    }

    fn invalid(&mut self, path: &str, field: &'static str, reason: impl Into<String>) {
        self.issue(
            path,
            ImportIssueKind::InvalidField {
                field,
                reason: reason.into(),
            },
        );
    }

    fn reserve_ids(&mut self, nodes: &[Value]) {
        let mut stack: Vec<&Value> = nodes.iter().collect();
        while let Some(value) = stack.pop() {
            let Some(obj) = value.as_object() else {
                continue;
            };
            if let Some(id) = field(obj, "id").and_then(text) {
                self.reserved.insert(id.trim().to_string());
            }
            for key in ["children", "dataIndicators", "supportingMaterials"] {
                if let Some(Value::Array(items)) = field(obj, key) {
                    stack.extend(items.iter());
                }
            }
        }
    }

    /// Supplied id if usable, else a fresh one. Repeated ids are reported.
    fn id(&mut self, obj: &Map<String, Value>, path: &str, kind: IdKind) -> String {
        let supplied = field(obj, "id")
            .and_then(text)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let id = match supplied {
            Some(id) => {
                if self.used.contains(&id) {
                    self.issue(path, ImportIssueKind::DuplicateId(id.clone()));
                }
                id
            }
            None => loop {
                let fresh = self.ids.next_id(kind);
                if !self.reserved.contains(&fresh) && !self.used.contains(&fresh) {
                    break fresh;
                }
            },
        };
        self.used.insert(id.clone());
        id
    }

    fn name(&mut self, obj: &Map<String, Value>, path: &str) -> Option<String> {
        let name = field(obj, "name")
            .and_then(text)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        if name.is_none() {
            self.issue(path, ImportIssueKind::MissingName);
        }
        name
    }

    fn optional_text(
        &mut self,
        obj: &Map<String, Value>,
        key: &'static str,
        path: &str,
    ) -> Option<String> {
        let value = field(obj, key)?;
        let text = text(value);
        if text.is_none() {
            self.invalid(path, key, "expected text");
        }
        text
    }

    fn optional_bool(
        &mut self,
        obj: &Map<String, Value>,
        key: &'static str,
        path: &str,
    ) -> Option<bool> {
        match field(obj, key)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.invalid(path, key, "expected true or false");
                None
            }
        }
    }

    fn optional_array<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &'static str,
        path: &str,
    ) -> Option<&'v Vec<Value>> {
        match field(obj, key)? {
            Value::Array(items) => Some(items),
            _ => {
                self.invalid(path, key, "expected an array");
                None
            }
        }
    }

    fn indicator(&mut self, value: &Value, path: &str, level: u8) -> Option<Indicator> {
        let Some(obj) = value.as_object() else {
            self.issue(path, ImportIssueKind::NotAnObject);
            return None;
        };
        let before = self.issues.len();

        let name = self.name(obj, path);
        let label = name.clone().unwrap_or_else(|| path.to_string());
        let id = self.id(obj, path, IdKind::Indicator);
        let description = self.optional_text(obj, "description", path).unwrap_or_default();
        let weight = match field(obj, "weight") {
            None => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => {
                self.invalid(path, "weight", "expected a number");
                None
            }
        };
        let declared_level = match field(obj, "level") {
            None => None,
            Some(v) => match v.as_u64() {
                Some(l) if (1..=u64::from(u8::MAX)).contains(&l) => Some(l as u8),
                _ => {
                    self.invalid(path, "level", "expected a positive integer");
                    None
                }
            },
        };
        let declared_leaf = self.optional_bool(obj, "isLeaf", path);
        let children = self.optional_array(obj, "children", path);
        let has_children = children.is_some_and(|c| !c.is_empty());

        let effective_level = declared_level.map_or(level, |declared| declared.max(level));
        let too_deep = effective_level > MAX_LEVEL || (effective_level >= MAX_LEVEL && has_children);
        if too_deep {
            self.issue(
                path,
                ImportIssueKind::DepthExceeded {
                    name: label.clone(),
                    max: MAX_LEVEL,
                },
            );
        }

        let is_leaf = if effective_level >= MAX_LEVEL {
            true
        } else if has_children {
            false
        } else {
            declared_leaf.unwrap_or(true)
        };
        if declared_leaf == Some(false) && !has_children && effective_level < MAX_LEVEL {
            debug!("normalize: {} declared as container without children, now a leaf", label);
        }

        let mut doc = Indicator {
            id,
            code: String::new(),
            name: name.unwrap_or_default(),
            description,
            level,
            is_leaf,
            weight,
            ..Indicator::default()
        };

        if is_leaf {
            if has_children && !too_deep {
                warn!("normalize: children of {} ignored at level {}", label, effective_level);
            }
            doc.data_indicators = Some(self.data_indicators(obj, path));
            doc.supporting_materials = Some(self.supporting_materials(obj, path));
        } else {
            if field(obj, "dataIndicators").is_some() || field(obj, "supportingMaterials").is_some() {
                warn!("normalize: leaf content of container {} ignored", label);
            }
            doc.children = Some(
                children
                    .into_iter()
                    .flatten()
                    .enumerate()
                    .filter_map(|(i, child)| {
                        self.indicator(child, &format!("{}.children[{}]", path, i), level + 1)
                    })
                    .collect(),
            );
        }

        (self.issues.len() == before).then_some(doc)
    }

    fn data_indicators(&mut self, obj: &Map<String, Value>, path: &str) -> Vec<DataIndicator> {
        let Some(items) = self.optional_array(obj, "dataIndicators", path) else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.data_indicator(item, &format!("{}.dataIndicators[{}]", path, i)))
            .collect()
    }

    fn data_indicator(&mut self, value: &Value, path: &str) -> Option<DataIndicator> {
        let Some(obj) = value.as_object() else {
            self.issue(path, ImportIssueKind::NotAnObject);
            return None;
        };
        let before = self.issues.len();
        let name = self.name(obj, path);
        let id = self.id(obj, path, IdKind::DataIndicator);
        let threshold = self.optional_text(obj, "threshold", path).unwrap_or_default();
        let description = self.optional_text(obj, "description", path).unwrap_or_default();
        let threshold_type = match field(obj, "thresholdType") {
            None => self.defaults.threshold_type,
            Some(v) => match v.as_str().and_then(ThresholdType::parse) {
                Some(t) => t,
                None => {
                    self.invalid(path, "thresholdType", "expected \"single\" or \"range\"");
                    self.defaults.threshold_type
                }
            },
        };
        let precision = match field(obj, "precision") {
            None => self.defaults.precision,
            Some(v) => match v.as_u64().and_then(|p| u32::try_from(p).ok()) {
                Some(p) => p,
                None => {
                    self.invalid(path, "precision", "expected a non-negative integer");
                    self.defaults.precision
                }
            },
        };
        let target_type = self.optional_text(obj, "targetType", path);

        (self.issues.len() == before).then(|| DataIndicator {
            id,
            code: String::new(),
            name: name.unwrap_or_default(),
            threshold,
            description,
            threshold_type: Some(threshold_type),
            precision: Some(precision),
            target_type,
        })
    }

    fn supporting_materials(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
    ) -> Vec<SupportingMaterial> {
        let Some(items) = self.optional_array(obj, "supportingMaterials", path) else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                self.supporting_material(item, &format!("{}.supportingMaterials[{}]", path, i))
            })
            .collect()
    }

    fn supporting_material(&mut self, value: &Value, path: &str) -> Option<SupportingMaterial> {
        let Some(obj) = value.as_object() else {
            self.issue(path, ImportIssueKind::NotAnObject);
            return None;
        };
        let before = self.issues.len();
        let name = self.name(obj, path);
        let id = self.id(obj, path, IdKind::SupportingMaterial);
        let file_types = match field(obj, "fileTypes") {
            None => self.defaults.file_types_joined(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => {
                let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                match parts {
                    Some(parts) => parts.join(","),
                    None => {
                        self.invalid(path, "fileTypes", "expected text entries");
                        String::new()
                    }
                }
            }
            Some(_) => {
                self.invalid(path, "fileTypes", "expected text or an array of text");
                String::new()
            }
        };
        let max_size = match field(obj, "maxSize") {
            None => self.defaults.max_size.clone(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => format!("{}MB", n),
            Some(_) => {
                self.invalid(path, "maxSize", "expected a size such as \"10MB\"");
                String::new()
            }
        };
        let description = self.optional_text(obj, "description", path).unwrap_or_default();
        let required = self.optional_bool(obj, "required", path).unwrap_or(false);
        let target_type = self.optional_text(obj, "targetType", path);

        (self.issues.len() == before).then(|| SupportingMaterial {
            id,
            code: String::new(),
            name: name.unwrap_or_default(),
            file_types,
            max_size,
            description,
            required,
            target_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::SequentialIdGenerator;
    use serde_json::json;

    fn run(raw: Value) -> Result<IndicatorTree, ImportError> {
        normalize(&raw, &mut SequentialIdGenerator::new(), &LeafDefaults::default())
    }

    #[test]
    fn given_blank_id_when_supplied_id_matches_generated_then_generated_skips_it() {
        let tree = run(json!([{ "name": "A" }, { "id": "ind-1", "name": "B" }])).unwrap();
        let ids: Vec<_> = tree.iter().map(|(_, n)| n.id.clone()).collect();
        assert_eq!(ids, vec!["ind-2", "ind-1"]);
    }

    #[test]
    fn given_numeric_name_and_threshold_when_normalizing_then_stringifies() {
        let tree = run(json!([{ "name": 42, "dataIndicators": [{ "name": "d", "threshold": 4.2 }] }]))
            .unwrap();
        let node = tree.find_by_code("1").unwrap();
        assert_eq!(node.name, "42");
        assert_eq!(node.content().unwrap().data_indicators[0].threshold, "4.2");
    }

    #[test]
    fn given_several_problems_when_normalizing_then_reports_all_of_them() {
        let err = run(json!([
            "oops",
            { "level": 1 },
            { "name": "ok", "weight": "heavy" }
        ]))
        .unwrap_err();
        assert_eq!(err.issues.len(), 3);
        assert_eq!(err.issues[0].path, "$[0]");
        assert_eq!(err.issues[1].kind, ImportIssueKind::MissingName);
        assert!(matches!(
            err.issues[2].kind,
            ImportIssueKind::InvalidField { field: "weight", .. }
        ));
    }
}
