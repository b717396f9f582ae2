//! Instruction-level single-step debugger for stepwise scripts.
//!
//! - [`runtime`]  — the host engine: language front-end, compiler, stack VM and hook points.
//! - [`debugger`] — the instrumentation core: position oracle, realigner, controller, tracer, evaluator.
//! - [`ui`]       — terminal rendering and line input used by the tracer.
//! - [`cli`]      — command-line surface.

pub mod cli;
pub mod config;
pub mod debugger;
pub mod runtime;
pub mod source;
pub mod ui;

use thiserror::Error;

/// Application-level errors surfaced by the CLI commands.
#[derive(Debug, Error)]
pub enum DebuggerError {
    #[error("Failed to load program: {0}")]
    LoadError(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Session terminated by the operator")]
    Terminated,
}

pub type Result<T> = anyhow::Result<T>;
