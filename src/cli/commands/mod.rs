//! CLI command implementations

pub mod clean;
pub mod config;
pub mod hash;
pub mod info;
pub mod list;
pub mod stats;

pub use clean::execute as clean;
pub use config::execute as config;
pub use hash::execute as hash;
pub use info::execute as info;
pub use list::execute as list;
pub use stats::execute as stats;
