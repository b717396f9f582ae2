//! The step tracer: the callback that halts at every realigned instruction.
//!
//! # Key responsibilities
//!
//! - Ignore frames whose unit was never realigned.
//! - Snapshot the frame's bindings so inspection never aliases live state.
//! - Build the [`StepView`] (stack, instruction viewport, source, locals) and
//!   hand it to the [`Renderer`].
//! - Serve the inspection loop until the operator resumes or confirms an
//!   interrupt.

use crate::debugger::evaluator::Evaluator;
use crate::debugger::oracle::PositionOracle;
use crate::debugger::window::{
    instruction_index, instruction_viewport, resolve_line, source_window,
    DEFAULT_INSTRUCTION_WINDOW, DEFAULT_SOURCE_WINDOW,
};
use crate::runtime::disasm::instruction_rows;
use crate::runtime::executor::{FrameRef, Namespace};
use crate::runtime::hooks::{Halt, Stepper, TraceEvent};
use crate::runtime::unit::LineTable;
use crate::source::SourceCache;
use crate::ui::{
    Binding, FrameSummary, Input, Prompt, Renderer, SourceExcerpt, SourceLine, StepKind, StepView,
    ViewInstruction,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Name under which a returning frame's value is shown and can be evaluated.
pub const RETURN_BINDING: &str = "__return__";

const INTERRUPT_QUESTION: &str = "Are you sure you want to interrupt the execution?";

/// Display and input settings of a tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerSettings {
    pub instruction_window: usize,
    pub source_window: usize,
    pub prompt: String,
}

impl Default for TracerSettings {
    fn default() -> Self {
        Self {
            instruction_window: DEFAULT_INSTRUCTION_WINDOW,
            source_window: DEFAULT_SOURCE_WINDOW,
            prompt: ">>> ".to_string(),
        }
    }
}

struct Session {
    renderer: Box<dyn Renderer>,
    prompt: Box<dyn Prompt>,
    evaluator: Evaluator,
    sources: SourceCache,
    activations: usize,
}

impl Session {
    /// Read and evaluate input until the operator resumes.
    fn inspect(&mut self, prompt: &str, snapshot: &Namespace) -> Result<(), Halt> {
        loop {
            let input = match self.prompt.read_line(prompt) {
                Ok(input) => input,
                Err(e) => {
                    warn!("Failed to read input, resuming: {}", e);
                    return Ok(());
                }
            };
            match input {
                Input::Line(text) if text.trim().is_empty() => return Ok(()),
                Input::Line(text) => {
                    let shown = match self.evaluator.evaluate(text.trim(), snapshot) {
                        Ok(value) => self.renderer.show_value(&value.repr()),
                        Err(e) => self.renderer.show_error(&e.to_string()),
                    };
                    if let Err(e) = shown {
                        warn!("Failed to show evaluation result: {}", e);
                    }
                }
                Input::Interrupted => match self.prompt.confirm(INTERRUPT_QUESTION, true) {
                    Ok(false) => continue,
                    Ok(true) => {
                        info!("Execution interrupted by the operator");
                        return Err(Halt);
                    }
                    Err(e) => {
                        warn!("Failed to read confirmation, interrupting: {}", e);
                        return Err(Halt);
                    }
                },
                Input::Closed => {
                    debug!("input closed, resuming");
                    return Ok(());
                }
            }
        }
    }
}

/// [`Stepper`] that renders every realigned instruction boundary and blocks
/// on operator input.
pub struct StepTracer {
    oracle: Rc<PositionOracle>,
    settings: TracerSettings,
    session: RefCell<Session>,
}

impl StepTracer {
    pub fn new(oracle: Rc<PositionOracle>, renderer: Box<dyn Renderer>, prompt: Box<dyn Prompt>) -> Self {
        Self {
            oracle,
            settings: TracerSettings::default(),
            session: RefCell::new(Session {
                renderer,
                prompt,
                evaluator: Evaluator::new(),
                sources: SourceCache::new(),
                activations: 0,
            }),
        }
    }

    pub fn with_settings(mut self, settings: TracerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.session.get_mut().evaluator = evaluator;
        self
    }

    pub fn with_sources(mut self, sources: SourceCache) -> Self {
        self.session.get_mut().sources = sources;
        self
    }

    /// Number of activations so far.
    pub fn activations(&self) -> usize {
        self.session.borrow().activations
    }

    fn activate(&self, frame: FrameRef<'_>, event: &TraceEvent, table: &LineTable) -> Result<(), Halt> {
        let Ok(mut guard) = self.session.try_borrow_mut() else {
            warn!("Ignoring nested activation");
            return Ok(());
        };
        let session = &mut *guard;

        let mut snapshot = frame.locals();
        let kind = match event {
            TraceEvent::Return(value) => {
                snapshot.insert(Rc::from(RETURN_BINDING), value.clone());
                StepKind::Return
            }
            _ => StepKind::Step,
        };

        let view = self.capture(frame, kind, table, &snapshot, &mut session.sources);
        session.activations += 1;
        debug!(
            unit = %frame.unit().name,
            offset = frame.offset(),
            line = ?view.source.line,
            activation = session.activations,
            "tracer activated"
        );

        if let Err(e) = session.renderer.render(&view) {
            warn!("Failed to render step: {}", e);
        }
        session.inspect(&self.settings.prompt, &snapshot)
    }

    fn capture(
        &self,
        frame: FrameRef<'_>,
        kind: StepKind,
        table: &LineTable,
        snapshot: &Namespace,
        sources: &mut SourceCache,
    ) -> StepView {
        let unit = frame.unit();
        let offset = frame.offset();
        let current = instruction_index(offset);

        let rows = instruction_rows(unit);
        let viewport = instruction_viewport(current, rows.len(), self.settings.instruction_window);
        let instructions = rows
            .into_iter()
            .enumerate()
            .filter(|(index, _)| viewport.contains(index))
            .map(|(index, row)| ViewInstruction {
                row,
                current: index == current,
            })
            .collect();

        let filename = unit.filename.to_string();
        let line = resolve_line(table, offset);
        let lines = match line {
            Some(line) => {
                let max_line = table.max_line().unwrap_or(line);
                source_window(line, max_line, self.settings.source_window)
                    .filter_map(|number| {
                        sources.line(&filename, number).map(|text| SourceLine {
                            number,
                            text,
                            current: number == line,
                        })
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let locals = snapshot
            .iter()
            .map(|(name, value)| Binding {
                name: name.to_string(),
                value: value.repr(),
            })
            .collect();

        StepView {
            kind,
            stack: call_stack(frame),
            instructions,
            source: SourceExcerpt {
                filename,
                line,
                lines,
            },
            locals,
        }
    }
}

/// Frames from the root to `frame`.
fn call_stack(frame: FrameRef<'_>) -> Vec<FrameSummary> {
    let mut stack = Vec::new();
    let mut cursor = Some(frame);
    while let Some(frame) = cursor {
        stack.push(FrameSummary {
            name: frame.unit().name.to_string(),
            filename: frame.unit().filename.to_string(),
        });
        cursor = frame.back();
    }
    stack.reverse();
    stack
}

impl Stepper for StepTracer {
    fn on_event(
        self: Rc<Self>,
        frame: FrameRef<'_>,
        event: &TraceEvent,
    ) -> Result<Option<Rc<dyn Stepper>>, Halt> {
        if matches!(event, TraceEvent::Call) {
            return Ok(Some(self));
        }
        let Some(table) = self.oracle.table(frame.unit().id()) else {
            return Ok(Some(self));
        };
        self.activate(frame, event, &table)?;
        Ok(Some(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::compiler::compile_program;
    use crate::runtime::executor::Engine;
    use crate::runtime::output::SharedBuffer;
    use std::io;

    struct Silent;

    impl Renderer for Silent {
        fn render(&mut self, _view: &StepView) -> io::Result<()> {
            Ok(())
        }

        fn show_value(&mut self, _repr: &str) -> io::Result<()> {
            Ok(())
        }

        fn show_error(&mut self, _message: &str) -> io::Result<()> {
            Ok(())
        }
    }

    struct Closed;

    impl Prompt for Closed {
        fn read_line(&mut self, _prompt: &str) -> io::Result<Input> {
            Ok(Input::Closed)
        }
    }

    fn tracer(oracle: &Rc<PositionOracle>) -> Rc<StepTracer> {
        Rc::new(StepTracer::new(Rc::clone(oracle), Box::new(Silent), Box::new(Closed)))
    }

    #[test]
    fn units_outside_the_oracle_are_not_intercepted() {
        let oracle = Rc::new(PositionOracle::new());
        let tracer = tracer(&oracle);
        let mut engine = Engine::with_output(Box::new(SharedBuffer::new()));
        engine.hooks().replace_stepper(Some(tracer.clone()));

        let unit = compile_program("x = 1;\ny = 2;\n", "t.sw").unwrap();
        engine.execute(Rc::new(unit)).unwrap();
        assert_eq!(tracer.activations(), 0);
    }

    #[test]
    fn captured_units_are_intercepted_without_realignment() {
        let oracle = Rc::new(PositionOracle::new());
        let tracer = tracer(&oracle);
        let mut engine = Engine::with_output(Box::new(SharedBuffer::new()));
        engine.hooks().replace_stepper(Some(tracer.clone()));

        let unit = compile_program("x = 1;\ny = 2;\n", "t.sw").unwrap();
        oracle.capture(&unit);
        engine.execute(Rc::new(unit)).unwrap();
        // One step per line change plus the module return.
        assert_eq!(tracer.activations(), 3);
    }

    #[test]
    fn default_settings_match_the_display_defaults() {
        let settings = TracerSettings::default();
        assert_eq!(settings.instruction_window, 11);
        assert_eq!(settings.source_window, 6);
        assert_eq!(settings.prompt, ">>> ");
    }
}
