//! Zero handling.

pub mod pseudocount;

pub use pseudocount::{add_pseudocount, DISCRETIZE_PSEUDOCOUNT};
