//! Shared utilities.
//!
//! Time helpers used by settings and file-backed rules, plus test helpers.

pub mod time;

#[cfg(test)]
pub mod testutil;
