//! CLI output and prompting
//!
//! Uses `cliclack` for interactive prompts and spinners with automatic
//! fallback to plain output in CI/non-interactive environments.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, outro_warn, remark, section, step_error,
    step_info, step_ok, step_warn, step_warn_hint,
};
pub use progress::{EntryProgress, TaskSpinner};
pub use prompts::confirm;
