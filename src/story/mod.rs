//! Versioned story workflow.
//!
//! A story is driven through repeated generate, review, accept/reject
//! cycles. Titles and scripts are append-only revisions, reviews are
//! append-only audit records, and the story row is the only thing that
//! changes. The module follows hexagonal architecture:
//!
//! - Domain types and the transition resolver in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
