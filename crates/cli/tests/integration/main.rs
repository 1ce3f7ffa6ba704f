//! CLI integration tests.

mod build_tests;
mod common;
mod settings_tests;
