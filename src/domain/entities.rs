//! Domain entities: the indicator document model
//!
//! These are the wire/document shapes exchanged with importers, exporters and
//! the persistence collaborator. The editable in-memory form is
//! [`IndicatorTree`](crate::domain::IndicatorTree).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Deepest level an indicator may live at. Root indicators are level 1.
pub const MAX_LEVEL: u8 = 3;

/// How a data indicator's threshold expression is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdType {
    /// Single comparison, e.g. `>= 4.2`
    #[default]
    Single,
    /// Interval, e.g. `0.6-0.9`
    Range,
}

impl ThresholdType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "range" => Some(Self::Range),
            _ => None,
        }
    }
}

impl fmt::Display for ThresholdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Range => write!(f, "range"),
        }
    }
}

/// Measurable datum attached to a leaf indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIndicator {
    pub id: String,
    /// Derived, e.g. `1.2-D1`
    #[serde(default)]
    pub code: String,
    pub name: String,
    /// Free-form comparison expression, e.g. `>= 4.2`
    #[serde(default)]
    pub threshold: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_type: Option<ThresholdType>,
    /// Decimal places
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Applicability tag, e.g. a school type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl DataIndicator {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Evidence document requirement attached to a leaf indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingMaterial {
    pub id: String,
    /// Derived, e.g. `1.2-M1`
    #[serde(default)]
    pub code: String,
    pub name: String,
    /// Comma-joined allow-list, e.g. `PDF,Word,Excel`
    #[serde(default)]
    pub file_types: String,
    /// Size with unit, e.g. `10MB`
    #[serde(default)]
    pub max_size: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

fn max_size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(b|kb|mb|gb)?\s*$").expect("valid max size regex")
    })
}

impl SupportingMaterial {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Individual entries of the `fileTypes` allow-list.
    pub fn file_type_list(&self) -> Vec<&str> {
        self.file_types
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Parse `maxSize` into bytes.
    ///
    /// A bare number is read as megabytes. Returns `None` when the value
    /// has no leading number or an unknown unit.
    pub fn max_size_bytes(&self) -> Option<u64> {
        let caps = max_size_regex().captures(&self.max_size)?;
        let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_uppercase())
            .unwrap_or_else(|| "MB".to_string());
        let factor: f64 = match unit.as_str() {
            "B" => 1.0,
            "KB" => 1024.0,
            "MB" => 1024.0 * 1024.0,
            "GB" => 1024.0 * 1024.0 * 1024.0,
            _ => return None,
        };
        Some((amount * factor).round() as u64)
    }
}

/// Indicator node in document form.
///
/// `children` is present iff `is_leaf == false`; `data_indicators` and
/// `supporting_materials` are present iff `is_leaf == true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: String,
    /// Derived, e.g. `1.2.3`
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub level: u8,
    pub is_leaf: bool,
    /// Percentage weight, interpreted by scoring consumers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Indicator>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_indicators: Option<Vec<DataIndicator>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supporting_materials: Option<Vec<SupportingMaterial>>,
}

/// Initial fields for a node created by `IndicatorTree::add`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndicator {
    pub name: String,
    pub description: String,
    pub weight: Option<f64>,
    /// Requesting a container here yields a leaf: a container needs children.
    pub is_leaf: bool,
    pub data_indicators: Vec<DataIndicator>,
    pub supporting_materials: Vec<SupportingMaterial>,
}

impl NewIndicator {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            weight: None,
            is_leaf: true,
            data_indicators: Vec::new(),
            supporting_materials: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Content edit for `IndicatorTree::edit`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the weight
    pub weight: Option<Option<f64>>,
    pub data_indicators: Option<Vec<DataIndicator>>,
    pub supporting_materials: Option<Vec<SupportingMaterial>>,
}

impl IndicatorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.weight.is_none()
            && self.data_indicators.is_none()
            && self.supporting_materials.is_none()
    }
}

/// Reorder direction for `IndicatorTree::move_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}
