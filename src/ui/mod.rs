//! Terminal front-end of the step tracer.
//!
//! - [`console`] — full-screen step display on a terminal.
//! - [`prompt`]  — line input with interrupt detection.
//!
//! The tracer only talks to the [`Renderer`] and [`prompt::Prompt`] traits, so
//! sessions can be driven by scripted implementations in tests.

pub mod console;
pub mod prompt;

use crate::runtime::disasm::InstructionRow;
use std::io;

pub use console::{ConsoleOptions, ConsoleRenderer};
pub use prompt::{Input, Prompt, RustylinePrompt};

/// Kind of event a step view was captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Step,
    Return,
}

/// One entry of the call stack, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub name: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewInstruction {
    pub row: InstructionRow,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: u32,
    pub text: String,
    pub current: bool,
}

/// Source lines around the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExcerpt {
    pub filename: String,
    /// True line of the current instruction.
    pub line: Option<u32>,
    pub lines: Vec<SourceLine>,
}

/// A binding rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// Everything shown for one activation of the tracer.
#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub kind: StepKind,
    pub stack: Vec<FrameSummary>,
    pub instructions: Vec<ViewInstruction>,
    pub source: SourceExcerpt,
    pub locals: Vec<Binding>,
}

/// Output side of a debugging session.
pub trait Renderer {
    /// Redraw the display for a new activation.
    fn render(&mut self, view: &StepView) -> io::Result<()>;

    /// Show the representation of an evaluated value.
    fn show_value(&mut self, repr: &str) -> io::Result<()>;

    /// Show an evaluation failure.
    fn show_error(&mut self, message: &str) -> io::Result<()>;
}
