pub mod args;
pub mod commands;

pub use args::{Cli, Commands, DebugArgs, DisasmArgs, OutputFormat, RunArgs, Verbosity};
