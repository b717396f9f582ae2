use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io;
use tracing::debug;

/// Result of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// The operator pressed Ctrl-C.
    Interrupted,
    /// Input is exhausted.
    Closed,
}

/// Line-oriented operator input.
pub trait Prompt {
    fn read_line(&mut self, prompt: &str) -> io::Result<Input>;

    /// Ask a yes/no question, re-asking until the answer is recognised.
    /// An empty answer, an interrupt or closed input select `default`.
    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "y" } else { "n" };
        let text = format!("{} [y/n] ({}): ", question, hint);
        loop {
            match self.read_line(&text)? {
                Input::Line(answer) => match answer.trim().to_ascii_lowercase().as_str() {
                    "" => return Ok(default),
                    "y" | "yes" => return Ok(true),
                    "n" | "no" => return Ok(false),
                    _ => continue,
                },
                Input::Interrupted | Input::Closed => return Ok(default),
            }
        }
    }
}

/// [`Prompt`] backed by rustyline. History lives only as long as the session.
pub struct RustylinePrompt {
    editor: DefaultEditor,
}

impl RustylinePrompt {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompt for RustylinePrompt {
    fn read_line(&mut self, prompt: &str) -> io::Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        debug!("Failed to record history entry: {}", e);
                    }
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Closed),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }
}
