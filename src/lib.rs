//! Storyloom: versioned story workflow and task-claiming workers.
//!
//! A story is driven through repeated generate, review, and accept/reject
//! cycles. Every title, script, and review is persisted as a versioned row,
//! and the reviews are run by workers that poll an external coordination
//! service for tasks, back off exponentially when idle, and update the
//! workflow state in one transaction per step.
//!
//! # Architecture
//!
//! Storyloom follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP, memory)
//!
//! # Modules
//!
//! - [`storage`]: `SQLite` schema management, start-up, and error taxonomy
//! - [`story`]: Story entities, the transition resolver, and the workflow
//!   service
//! - [`worker`]: The claim, process, and report loop and its specializations
//! - [`config`]: Application configuration for the worker binary

pub mod config;
pub mod storage;
pub mod story;
pub mod worker;
