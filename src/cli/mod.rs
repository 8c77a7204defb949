//! CLI module - argument parsing and subcommand runners

mod args;
pub mod evaluate;
pub mod prepare;

pub use args::{Cli, Commands, EvaluateArgs, PrepareArgs};
