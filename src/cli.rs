//! CLI domain: parse, route, output and the replay driver.

mod output;
mod parse;
mod replay;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use replay::{replay_steps, ReplayStep, ReplaySummary};
pub use route::RunContext;
