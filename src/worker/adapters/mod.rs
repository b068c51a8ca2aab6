//! Adapters for task coordination and item scoring.

pub mod http;
pub mod memory;
mod scorer;
