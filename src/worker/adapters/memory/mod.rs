//! In-memory adapters for task coordination and scoring.

mod coordinator;
mod score_store;

pub use coordinator::InMemoryTaskCoordinator;
pub use score_store::InMemoryScoreStore;
