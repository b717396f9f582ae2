//! Evaluation of operator-typed expressions against a bindings snapshot.

use crate::runtime::compiler::compile_expression;
use crate::runtime::error::{RuntimeError, SyntaxError};
use crate::runtime::executor::{Engine, Namespace};
use crate::runtime::value::Value;
use std::io::{self, Write};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("SyntaxError: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Evaluates single expressions on an engine of its own.
///
/// The snapshot is the innermost namespace, then the evaluator's globals,
/// then builtins. Only expressions are accepted, so an evaluation can never
/// bind names in the program being debugged.
pub struct Evaluator {
    engine: Engine,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Evaluator whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            engine: Engine::with_output(output),
        }
    }

    /// Make `name` visible to every later evaluation.
    pub fn define(&mut self, name: &str, value: Value) {
        self.engine.set_global(name, value);
    }

    pub fn evaluate(&mut self, text: &str, bindings: &Namespace) -> Result<Value, EvalError> {
        let unit = compile_expression(text, "<input>")?;
        Ok(self.engine.evaluate(Rc::new(unit), bindings.clone())?)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
