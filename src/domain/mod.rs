//! Domain layer: indicator tree model and structural engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod codes;
pub mod content;
pub mod entities;
pub mod error;
pub mod ids;
pub mod invariants;
pub mod mutator;
pub mod normalize;

pub use arena::{IndicatorNode, IndicatorTree, LeafContent, NodeKind};
pub use content::LeafDefaults;
pub use entities::*;
pub use error::{
    DomainError, DomainResult, ImportError, ImportIssue, ImportIssueKind, InvariantViolation,
};
pub use ids::{IdGenerator, IdKind, IdStrategy, SequentialIdGenerator, UuidIdGenerator};
pub use invariants::TreeStats;
pub use mutator::NodeActions;
pub use normalize::{normalize, normalize_str};
