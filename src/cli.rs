//! CLI domain: parse, route and output only.
//! Orchestration lives in the domain modules; the route table wires them up.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::RunContext;
