//! `SQLite` adapters for story persistence.
//!
//! Titles and scripts share a row layout, so revision queries pick the table
//! from the content kind and use raw SQL; everything else goes through the
//! Diesel query builder.

mod models;
mod repository;

pub use repository::SqliteStoryRepository;
