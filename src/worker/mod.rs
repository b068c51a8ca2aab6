//! Task-claiming workers.
//!
//! A worker polls an external coordination service for tasks, processes
//! them, and reports the outcome, backing off exponentially while the queue
//! is empty. The module follows the same layout as the story workflow:
//!
//! - Task records, configuration, and backoff in [`task`], [`config`], and
//!   [`backoff`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The generic loop in [`engine`]
//! - Specializations in [`scoring`] and [`review`]

pub mod adapters;
pub mod backoff;
pub mod config;
pub mod engine;
pub mod ports;
pub mod review;
pub mod scoring;
pub mod task;

#[cfg(test)]
mod tests;
