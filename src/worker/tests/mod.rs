//! Unit tests for the worker engine and its specializations.

mod config_tests;
mod support;
