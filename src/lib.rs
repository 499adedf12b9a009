//! indtree: structural engine for bounded-depth indicator trees
//!
//! An indicator system is an ordered forest of at most three levels. Inner
//! nodes group children; leaves carry data indicators and supporting
//! materials. Every node and record has a positional code (`1.2.3`,
//! `1.2-D1`, `1.2-M1`) regenerated after each structural change.
//!
//! Layers:
//! - [`domain`]: tree model, code generator, structural operations, import normalizer
//! - [`application`]: editing session and indicator system service
//! - [`infrastructure`]: filesystem and JSON file store, service container
//! - [`cli`]: the `indtree` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use domain::{
    normalize, normalize_str, Direction, DomainError, ImportError, Indicator, IndicatorTree,
    NewIndicator,
};
