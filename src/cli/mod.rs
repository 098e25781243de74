//! CLI commands

pub mod context;
pub mod land;
pub mod progress;
pub mod prompt;
pub mod status;
pub mod style;

pub use land::{LandOptions, run_land};
pub use status::run_status;
