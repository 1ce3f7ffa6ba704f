mod build;
mod graph;
mod plan;
mod set;
mod settings;

pub use build::cmd_build;
pub use graph::cmd_graph;
pub use plan::cmd_plan;
pub use set::cmd_set;
pub use settings::cmd_settings;
