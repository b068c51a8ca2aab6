//! Adapter implementations of the story ports.

pub mod evaluator;
pub mod memory;
pub mod sqlite;
