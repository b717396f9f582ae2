//! Host execution engine for stepwise scripts.
//!
//! Sub-modules:
//! - [`lexer`], [`parser`], [`ast`] — source text to syntax tree.
//! - [`compiler`] — syntax tree to [`CompiledUnit`] trees.
//! - [`unit`]     — compiled units, instructions and line tables.
//! - [`value`]    — immutable runtime values and operators.
//! - [`builtins`] — functions visible in every namespace.
//! - [`executor`] — the stack machine and its frames.
//! - [`hooks`]    — overridable unit runner and step callback.
//! - [`disasm`]   — instruction listings.
//! - [`loader`]   — reading and compiling program files.
//! - [`output`]   — program output writers.

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod disasm;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod lexer;
pub mod loader;
pub mod output;
pub mod parser;
pub mod unit;
pub mod value;

pub use builtins::Builtin;
pub use compiler::{compile_expression, compile_program};
pub use error::{ErrorKind, RuntimeError, SyntaxError, TraceEntry};
pub use executor::{Engine, FrameRef, Namespace};
pub use hooks::{DirectRunner, Halt, Hooks, Stepper, TraceEvent, UnitRunner};
pub use loader::{load_program, LoadedProgram};
pub use unit::{CompiledUnit, Constant, Instruction, LineRange, LineTable, Opcode, UnitId, INSTRUCTION_WIDTH};
pub use value::{Function, Value};
