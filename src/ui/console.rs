//! Full-screen step display on a terminal.
//!
//! Each activation clears the screen (when enabled and writing to a terminal)
//! and draws four panels: frame stack, instructions, source and locals.

use crate::ui::{Renderer, StepView};
use colored::{ColoredString, Colorize};
use crossterm::{cursor::MoveTo, execute, terminal};
use is_terminal::IsTerminal;
use std::io::{self, Stdout, Write};

const FALLBACK_WIDTH: usize = 80;

/// Display switches of a [`ConsoleRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    pub clear_screen: bool,
    pub color: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            clear_screen: true,
            color: true,
        }
    }
}

pub struct ConsoleRenderer<W: Write> {
    out: W,
    options: ConsoleOptions,
    width: usize,
}

impl ConsoleRenderer<Stdout> {
    /// Renderer on stdout. Clearing and colour are disabled when stdout is
    /// not a terminal.
    pub fn stdout(options: ConsoleOptions) -> Self {
        let is_tty = io::stdout().is_terminal();
        let options = ConsoleOptions {
            clear_screen: options.clear_screen && is_tty,
            color: options.color && is_tty,
        };
        let width = terminal::size()
            .map(|(columns, _)| columns as usize)
            .unwrap_or(FALLBACK_WIDTH);
        Self::new(io::stdout(), options, width)
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, options: ConsoleOptions, width: usize) -> Self {
        Self {
            out,
            options,
            width: width.max(40),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, style: fn(ColoredString) -> ColoredString) -> String {
        if self.options.color {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }

    fn title(&mut self, title: &str) -> io::Result<()> {
        let head = format!("── {} ", title);
        let fill = self.width.saturating_sub(head.chars().count());
        let rule = format!("{}{}", head, "─".repeat(fill));
        let painted = self.paint(&rule, |s| s.cyan().bold());
        writeln!(self.out, "{}", painted)
    }

    fn clip(&self, text: String) -> String {
        if text.chars().count() <= self.width {
            text
        } else {
            text.chars().take(self.width).collect()
        }
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, view: &StepView) -> io::Result<()> {
        if self.options.clear_screen {
            execute!(self.out, terminal::Clear(terminal::ClearType::All), MoveTo(0, 0))?;
        }

        self.title("Frame stack")?;
        for frame in &view.stack {
            writeln!(self.out, "{} ({})", frame.name, frame.filename)?;
        }

        self.title("Instructions")?;
        for instruction in &view.instructions {
            let row = &instruction.row;
            let arg = match row.arg {
                Some(arg) if row.argval.is_empty() => arg.to_string(),
                Some(arg) => format!("{} ({})", arg, row.argval),
                None => String::new(),
            };
            let prefix = if instruction.current { "--> " } else { "    " };
            let line = self.clip(format!("{}{:>4} {:<24}{}", prefix, row.offset, row.opcode.name(), arg));
            let line = if instruction.current {
                self.paint(&line, |s| s.green().bold())
            } else {
                line
            };
            writeln!(self.out, "{}", line)?;
        }

        let source_title = format!("Source: {}", view.source.filename);
        self.title(&source_title)?;
        if view.source.lines.is_empty() {
            writeln!(self.out, "no source available")?;
        }
        for source_line in &view.source.lines {
            let marker = if source_line.current { "->" } else { "  " };
            let line = self.clip(format!("{:>4} {} {}", source_line.number, marker, source_line.text));
            let line = if source_line.current {
                self.paint(&line, |s| s.green().bold())
            } else {
                line
            };
            writeln!(self.out, "{}", line)?;
        }

        self.title("Locals")?;
        for binding in &view.locals {
            let name = self.paint(&binding.name, |s| s.yellow());
            let line = format!("{} = {}", name, binding.value);
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()
    }

    fn show_value(&mut self, repr: &str) -> io::Result<()> {
        writeln!(self.out, "{}", repr)?;
        self.out.flush()
    }

    fn show_error(&mut self, message: &str) -> io::Result<()> {
        let message = self.paint(message, |s| s.red());
        writeln!(self.out, "{}", message)?;
        self.out.flush()
    }
}
