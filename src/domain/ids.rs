//! Injectable id generation
//!
//! Ids are assigned once at creation and never recomputed.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an id is being generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Indicator,
    DataIndicator,
    SupportingMaterial,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Indicator => "ind",
            Self::DataIndicator => "di",
            Self::SupportingMaterial => "sm",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Indicator => 0,
            Self::DataIndicator => 1,
            Self::SupportingMaterial => 2,
        }
    }
}

/// Source of fresh stable ids.
pub trait IdGenerator: Send {
    fn next_id(&mut self, kind: IdKind) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&mut self, _kind: IdKind) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic per-kind counters: `ind-1`, `ind-2`, `di-1`, ...
#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    counters: [u64; 3],
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self, kind: IdKind) -> String {
        let counter = &mut self.counters[kind.slot()];
        *counter += 1;
        format!("{}-{}", kind.prefix(), counter)
    }
}

/// Configured choice of generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequential,
}

impl IdStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Some(Self::Uuid),
            "sequential" => Some(Self::Sequential),
            _ => None,
        }
    }

    pub fn generator(self) -> Box<dyn IdGenerator> {
        match self {
            Self::Uuid => Box::new(UuidIdGenerator),
            Self::Sequential => Box::new(SequentialIdGenerator::new()),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid => write!(f, "uuid"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_sequential_generator_when_mixing_kinds_then_counts_per_kind() {
        let mut ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(IdKind::Indicator), "ind-1");
        assert_eq!(ids.next_id(IdKind::DataIndicator), "di-1");
        assert_eq!(ids.next_id(IdKind::Indicator), "ind-2");
        assert_eq!(ids.next_id(IdKind::SupportingMaterial), "sm-1");
    }

    #[test]
    fn given_uuid_generator_when_generating_then_ids_differ() {
        let mut ids = UuidIdGenerator;
        assert_ne!(
            ids.next_id(IdKind::Indicator),
            ids.next_id(IdKind::Indicator)
        );
    }
}
