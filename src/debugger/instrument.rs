//! Installation and removal of the debugger's engine hooks.

use crate::debugger::oracle::PositionOracle;
use crate::debugger::realign::realign_shared;
use crate::runtime::error::RuntimeError;
use crate::runtime::executor::Engine;
use crate::runtime::hooks::{Hooks, Stepper, UnitRunner};
use crate::runtime::unit::CompiledUnit;
use crate::runtime::value::Value;
use std::rc::Rc;
use tracing::{debug, info};

/// Unit runner that realigns a unit before handing it to the runner it wraps.
pub struct RealigningRunner {
    oracle: Rc<PositionOracle>,
    inner: Rc<dyn UnitRunner>,
}

impl RealigningRunner {
    pub fn new(oracle: Rc<PositionOracle>, inner: Rc<dyn UnitRunner>) -> Self {
        Self { oracle, inner }
    }
}

impl UnitRunner for RealigningRunner {
    fn run(&self, engine: &mut Engine, unit: Rc<CompiledUnit>) -> Result<Value, RuntimeError> {
        let before = self.oracle.len();
        let unit = realign_shared(&self.oracle, unit);
        debug!(
            unit = %unit.name,
            realigned = self.oracle.len() - before,
            "prepared unit for stepping"
        );
        self.inner.run(engine, unit)
    }
}

struct SavedHooks {
    runner: Rc<dyn UnitRunner>,
    stepper: Option<Rc<dyn Stepper>>,
}

/// Guard holding the hooks that were installed before the debugger's.
///
/// The previous hooks are put back exactly once: by [`Instrumentation::restore`]
/// or, failing that, when the guard is dropped.
pub struct Instrumentation {
    hooks: Rc<Hooks>,
    saved: Option<SavedHooks>,
}

impl Instrumentation {
    /// Wrap the unit runner with a [`RealigningRunner`] and install `stepper`.
    pub fn install(hooks: &Rc<Hooks>, oracle: Rc<PositionOracle>, stepper: Rc<dyn Stepper>) -> Self {
        let runner = Rc::new(RealigningRunner::new(oracle, hooks.runner()));
        let previous_runner = hooks.replace_runner(runner);
        let previous_stepper = hooks.replace_stepper(Some(stepper));
        info!(
            had_stepper = previous_stepper.is_some(),
            "Instrumentation installed"
        );
        Self {
            hooks: Rc::clone(hooks),
            saved: Some(SavedHooks {
                runner: previous_runner,
                stepper: previous_stepper,
            }),
        }
    }

    /// Whether the debugger's hooks are still installed.
    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// Put the previous hooks back.
    pub fn restore(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.hooks.replace_runner(saved.runner);
            self.hooks.replace_stepper(saved.stepper);
            info!("Instrumentation removed");
        }
    }
}

impl Drop for Instrumentation {
    fn drop(&mut self) {
        self.release();
    }
}
