//! Build scenarios against real files.

mod common;
mod settings_tests;
