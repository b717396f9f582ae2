//! Overridable entry points of the engine.
//!
//! The engine never calls a unit or a trace callback directly: both go
//! through the shared [`Hooks`] table so an instrumentation layer can swap
//! them for the duration of a session and put the previous ones back.

use crate::runtime::error::RuntimeError;
use crate::runtime::executor::{Engine, FrameRef};
use crate::runtime::unit::CompiledUnit;
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Event delivered to a [`Stepper`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A new frame was entered. Sent to the global stepper; its answer
    /// becomes the frame's local stepper.
    Call,
    /// The frame is about to execute the instruction at its current offset.
    Step,
    /// The frame is returning the value.
    Return(Value),
}

/// Request from a stepper to abort the running program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("execution halted")]
pub struct Halt;

/// Per-instruction trace callback.
pub trait Stepper {
    /// Handle `event` for `frame`. The returned stepper traces the frame from
    /// now on; `None` stops local tracing of that frame.
    fn on_event(
        self: Rc<Self>,
        frame: FrameRef<'_>,
        event: &TraceEvent,
    ) -> Result<Option<Rc<dyn Stepper>>, Halt>;
}

/// Entry point used to execute a top-level unit.
pub trait UnitRunner {
    fn run(&self, engine: &mut Engine, unit: Rc<CompiledUnit>) -> Result<Value, RuntimeError>;
}

/// Runs units as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectRunner;

impl UnitRunner for DirectRunner {
    fn run(&self, engine: &mut Engine, unit: Rc<CompiledUnit>) -> Result<Value, RuntimeError> {
        engine.execute(unit)
    }
}

/// The engine's hook table.
pub struct Hooks {
    runner: RefCell<Rc<dyn UnitRunner>>,
    stepper: RefCell<Option<Rc<dyn Stepper>>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self {
            runner: RefCell::new(Rc::new(DirectRunner)),
            stepper: RefCell::new(None),
        }
    }

    pub fn runner(&self) -> Rc<dyn UnitRunner> {
        Rc::clone(&self.runner.borrow())
    }

    /// Install `runner`, returning the one it replaces.
    pub fn replace_runner(&self, runner: Rc<dyn UnitRunner>) -> Rc<dyn UnitRunner> {
        self.runner.replace(runner)
    }

    pub fn stepper(&self) -> Option<Rc<dyn Stepper>> {
        self.stepper.borrow().clone()
    }

    /// Install `stepper`, returning the one it replaces.
    pub fn replace_stepper(&self, stepper: Option<Rc<dyn Stepper>>) -> Option<Rc<dyn Stepper>> {
        self.stepper.replace(stepper)
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("stepper_installed", &self.stepper.borrow().is_some())
            .finish_non_exhaustive()
    }
}
