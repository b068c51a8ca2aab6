//! In-memory adapters for story persistence.

mod story;

pub use story::InMemoryStoryRepository;
