//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, TreeStore)
//! but are themselves concrete structs, not traits.

mod editor;
mod system;

pub use editor::TreeEditor;
pub use system::IndicatorSystemService;
