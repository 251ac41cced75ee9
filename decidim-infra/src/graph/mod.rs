//! The in-memory resource graph.
//!
//! Synthesis builds stacks of resource declarations wired together with
//! deferred values; the assembler orders builders and threads exported
//! handles to their consumers.

mod app;
mod resource;
mod stack;
mod value;

pub use app::{App, Assembly, OutputRegistry};
pub use resource::{DeletionPolicy, Resource};
pub use stack::{pascal_case, Output, PublishedParameter, Stack};
pub use value::Value;
