//! kiln-lib: an embeddable incremental build engine
//!
//! This crate provides the pieces of a Make-style build:
//! - `Rule`: targets, their prerequisites and settings, and a `RuleKind`
//!   deciding how outputs are checked and produced
//! - `Plan`: the memoized walk of everything a target depends on, with the
//!   staleness of each node
//! - `Trace`: the groups of targets executed by one build, in order
//! - `SettingsStore`: versioned values that invalidate the targets declaring them
//! - `Engine`: the registry and settings of a session, and the build entry points
//! - `Manifest`: a JSON build description registered into an `Engine`

pub mod consts;
pub mod engine;
pub mod error;
pub mod execute;
pub mod export;
pub mod graph;
pub mod manifest;
pub mod registry;
pub mod rule;
pub mod settings;
pub mod util;

pub use engine::Engine;
pub use error::BuildError;
pub use execute::{ExecuteConfig, Trace};
pub use graph::{Plan, PlanNode};
pub use manifest::{Manifest, ManifestError};
pub use registry::RuleRegistry;
pub use rule::{BuildContext, Rule, RuleError, RuleId, RuleKind};
pub use settings::{SettingsError, SettingsStore};
