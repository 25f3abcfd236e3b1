//! Selection methods, settings and the engine boundary.

pub mod engine;
pub mod method;

pub use engine::{ExternalEngine, SelectionEngine, SelectionResult};
pub use method::{SelectionConfig, SelectionMethod};
