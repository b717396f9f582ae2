use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(version, about = "Step through stepwise scripts one instruction at a time")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file
    #[arg(long, env = "STEPWISE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            return Verbosity::Quiet;
        }
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            2 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }
}

/// Log verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
    Trace,
}

impl Verbosity {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn to_log_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a program without the debugger
    Run(RunArgs),

    /// Run a program, halting before every instruction
    Debug(DebugArgs),

    /// Print the instructions and line tables of a program
    Disasm(DisasmArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Program to run
    pub program: PathBuf,

    /// Arguments passed to the program as `args`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DebugArgs {
    /// Program to debug
    pub program: PathBuf,

    /// Do not clear the screen before each step
    #[arg(long)]
    pub no_clear: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Arguments passed to the program as `args`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DisasmArgs {
    /// Program to disassemble
    pub program: PathBuf,

    /// Realign the program first and show the captured true line tables
    #[arg(long)]
    pub realign: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
