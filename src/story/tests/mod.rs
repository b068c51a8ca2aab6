//! Unit tests for the story workflow.

mod service_tests;
