//! CLI domain: parse, route, output, and presentation only.
//! No storage logic; the route table dispatches to the selected backend.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands};
pub use presentation::{format_metadata_text, format_section_heading, format_tree_text};
pub use route::{load_config, RunContext, RunOptions};
