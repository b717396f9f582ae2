//! Instruction-level stepping on top of the engine's line-based tracing.
//!
//! Sub-modules:
//! - [`oracle`]     — true line tables captured before realignment.
//! - [`realign`]    — rewrites units so every instruction reports its own line.
//! - [`instrument`] — installs and restores the engine hooks.
//! - [`tracer`]     — the step callback and inspection loop.
//! - [`evaluator`]  — expression evaluation against a bindings snapshot.
//! - [`window`]     — instruction and source viewports.

pub mod evaluator;
pub mod instrument;
pub mod oracle;
pub mod realign;
pub mod tracer;
pub mod window;

pub use evaluator::{EvalError, Evaluator};
pub use instrument::{Instrumentation, RealigningRunner};
pub use oracle::PositionOracle;
pub use realign::{realign, realign_shared};
pub use tracer::{StepTracer, TracerSettings, RETURN_BINDING};
