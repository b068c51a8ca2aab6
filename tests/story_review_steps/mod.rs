//! Step definitions for story review BDD scenarios.

mod given;
mod then;
mod when;
pub mod world;
