//! Unit tests for the storage foundation.
