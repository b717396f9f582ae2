//! The stack machine that executes compiled units.
//!
//! # Key responsibilities
//!
//! - Keep an explicit frame stack; a call pushes a frame instead of recursing.
//! - Resolve names through frame slots, the module namespace and builtins.
//! - Deliver [`TraceEvent`]s to the installed [`Stepper`] with line-based
//!   stepping: a `Step` fires only when the reported line changes within a
//!   frame, or control jumps backwards.
//! - Attach a traceback to every error that unwinds out of the engine.

use crate::runtime::builtins::Builtin;
use crate::runtime::error::{ErrorKind, RuntimeError, TraceEntry};
use crate::runtime::hooks::{Halt, Hooks, Stepper, TraceEvent};
use crate::runtime::unit::{CompiledUnit, Constant, Opcode, UnitKind, INSTRUCTION_WIDTH};
use crate::runtime::value::{self, Function, Value};
use indexmap::IndexMap;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::{debug, info};

/// Ordered name-to-value bindings.
pub type Namespace = IndexMap<Rc<str>, Value>;

/// Default maximum number of live frames.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// A live activation of a compiled unit.
pub struct Frame {
    unit: Rc<CompiledUnit>,
    /// Index of the next instruction to fetch.
    pc: usize,
    /// Byte offset of the instruction being executed.
    offset: usize,
    last_offset: Option<usize>,
    last_line: Option<u32>,
    slots: Vec<Option<Value>>,
    /// Innermost namespace of expression frames.
    namespace: Option<Namespace>,
    stack: Vec<Value>,
    tracer: Option<Rc<dyn Stepper>>,
}

impl Frame {
    fn new(unit: Rc<CompiledUnit>, namespace: Option<Namespace>) -> Self {
        let slots = vec![None; unit.locals.len()];
        Self {
            unit,
            pc: 0,
            offset: 0,
            last_offset: None,
            last_line: None,
            slots,
            namespace,
            stack: Vec::new(),
            tracer: None,
        }
    }

    fn call(function: &Function, args: Vec<Value>) -> Result<Self, ErrorKind> {
        let arity = function.unit.arity as usize;
        if args.len() != arity {
            return Err(ErrorKind::Arity {
                name: function.name.to_string(),
                expected: arity,
                given: args.len(),
            });
        }
        let mut frame = Self::new(Rc::clone(&function.unit), None);
        if frame.slots.len() < arity {
            return Err(function.unit.malformed("fewer local slots than parameters".into()));
        }
        for (slot, arg) in frame.slots.iter_mut().zip(args) {
            *slot = Some(arg);
        }
        Ok(frame)
    }

    fn pop(&mut self) -> Result<Value, ErrorKind> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.unit.malformed("value stack underflow".into())),
        }
    }

    fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, ErrorKind> {
        if self.stack.len() < count {
            return Err(self.unit.malformed("value stack underflow".into()));
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    fn top(&self) -> Result<&Value, ErrorKind> {
        self.stack
            .last()
            .ok_or_else(|| self.unit.malformed("value stack underflow".into()))
    }

    fn jump(&mut self, target: u32) {
        self.pc = target as usize;
    }

    fn trace_entry(&self) -> TraceEntry {
        let index = self.offset / INSTRUCTION_WIDTH;
        TraceEntry {
            unit: self.unit.id(),
            name: self.unit.name.to_string(),
            filename: self.unit.filename.to_string(),
            offset: self.offset,
            line: self
                .unit
                .instructions
                .get(index)
                .map(|instruction| instruction.line)
                .unwrap_or(0),
        }
    }
}

/// Read-only view of one frame and, through [`FrameRef::back`], its callers.
#[derive(Clone, Copy)]
pub struct FrameRef<'a> {
    frames: &'a [Frame],
    globals: &'a Namespace,
    index: usize,
}

impl<'a> FrameRef<'a> {
    pub fn unit(&self) -> &'a Rc<CompiledUnit> {
        &self.frames[self.index].unit
    }

    /// Byte offset of the instruction being executed.
    pub fn offset(&self) -> usize {
        self.frames[self.index].offset
    }

    /// The calling frame, if any.
    pub fn back(&self) -> Option<FrameRef<'a>> {
        self.index.checked_sub(1).map(|index| FrameRef { index, ..*self })
    }

    /// Number of frames below this one.
    pub fn depth(&self) -> usize {
        self.index
    }

    /// Copy of the frame's bindings. Module frames see the module namespace.
    pub fn locals(&self) -> Namespace {
        let frame = &self.frames[self.index];
        match (frame.unit.kind, &frame.namespace) {
            (UnitKind::Function, _) => frame
                .unit
                .locals
                .iter()
                .zip(&frame.slots)
                .filter_map(|(name, slot)| slot.as_ref().map(|v| (Rc::clone(name), v.clone())))
                .collect(),
            (_, Some(namespace)) => namespace.clone(),
            (_, None) => self.globals.clone(),
        }
    }
}

impl std::fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRef")
            .field("unit", &self.unit().name)
            .field("offset", &self.offset())
            .field("depth", &self.index)
            .finish()
    }
}

enum Flow {
    Continue,
    Return(Value),
}

/// Executes compiled units.
pub struct Engine {
    globals: Namespace,
    frames: Vec<Frame>,
    hooks: Rc<Hooks>,
    output: Box<dyn Write>,
    max_depth: usize,
}

impl Engine {
    /// Create an engine writing program output to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            globals: Namespace::new(),
            frames: Vec::new(),
            hooks: Rc::new(Hooks::new()),
            output,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn hooks(&self) -> &Rc<Hooks> {
        &self.hooks
    }

    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(Rc::from(name), value);
    }

    /// Run a module through the installed unit runner.
    pub fn run_module(&mut self, unit: Rc<CompiledUnit>) -> Result<Value, RuntimeError> {
        info!(unit = %unit.name, file = %unit.filename, "running module");
        let runner = self.hooks.runner();
        let result = runner.run(self, unit);
        self.output.flush().map_err(ErrorKind::from)?;
        result
    }

    /// Execute `unit` against the module namespace.
    pub fn execute(&mut self, unit: Rc<CompiledUnit>) -> Result<Value, RuntimeError> {
        self.start(Frame::new(unit, None))
    }

    /// Execute `unit` with `namespace` as its innermost namespace.
    pub fn evaluate(
        &mut self,
        unit: Rc<CompiledUnit>,
        namespace: Namespace,
    ) -> Result<Value, RuntimeError> {
        self.start(Frame::new(unit, Some(namespace)))
    }

    fn start(&mut self, frame: Frame) -> Result<Value, RuntimeError> {
        let base = self.frames.len();
        if let Err(kind) = self.enter(frame) {
            return Err(self.unwind(base, kind));
        }
        self.run(base)
    }

    fn frame_ref(&self, index: usize) -> FrameRef<'_> {
        FrameRef {
            frames: &self.frames,
            globals: &self.globals,
            index,
        }
    }

    /// Push `frame` and let the global stepper choose its local stepper.
    fn enter(&mut self, frame: Frame) -> Result<(), ErrorKind> {
        if self.frames.len() >= self.max_depth {
            return Err(ErrorKind::Recursion(self.max_depth));
        }
        self.frames.push(frame);
        let index = self.frames.len() - 1;
        if let Some(stepper) = self.hooks.stepper() {
            let local = stepper
                .on_event(self.frame_ref(index), &TraceEvent::Call)
                .map_err(|Halt| ErrorKind::Halted)?;
            self.frames[index].tracer = local;
        }
        Ok(())
    }

    /// Build the traceback for `kind` and drop every frame above `base`.
    fn unwind(&mut self, base: usize, kind: ErrorKind) -> RuntimeError {
        let traceback = self.frames[base..].iter().map(Frame::trace_entry).collect();
        self.frames.truncate(base);
        debug!(error = %kind, "unwound to depth {}", base);
        RuntimeError { kind, traceback }
    }

    fn run(&mut self, base: usize) -> Result<Value, RuntimeError> {
        loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Return(value)) => {
                    self.frames.pop();
                    if self.frames.len() == base {
                        return Ok(value);
                    }
                    if let Some(caller) = self.frames.last_mut() {
                        caller.stack.push(value);
                    }
                }
                Err(kind) => return Err(self.unwind(base, kind)),
            }
        }
    }

    /// Fire `Step` for the instruction at `offset` when the stepping rules say so.
    fn trace_step(&mut self, index: usize, offset: usize, line: u32) -> Result<(), ErrorKind> {
        let frame = &mut self.frames[index];
        let new_line = frame.last_line != Some(line);
        let jumped_back = frame.last_offset.is_some_and(|last| offset < last);
        frame.offset = offset;
        frame.last_offset = Some(offset);
        frame.last_line = Some(line);
        if !(new_line || jumped_back) {
            return Ok(());
        }
        let Some(tracer) = frame.tracer.clone() else {
            return Ok(());
        };
        let next = tracer
            .on_event(self.frame_ref(index), &TraceEvent::Step)
            .map_err(|Halt| ErrorKind::Halted)?;
        self.frames[index].tracer = next;
        Ok(())
    }

    fn trace_return(&mut self, index: usize, value: &Value) -> Result<(), ErrorKind> {
        if let Some(tracer) = self.frames[index].tracer.clone() {
            tracer
                .on_event(self.frame_ref(index), &TraceEvent::Return(value.clone()))
                .map_err(|Halt| ErrorKind::Halted)?;
        }
        Ok(())
    }

    /// Execute one instruction of the innermost frame.
    fn step(&mut self) -> Result<Flow, ErrorKind> {
        let index = match self.frames.len().checked_sub(1) {
            Some(index) => index,
            None => return Err(ErrorKind::Type("no frame to execute".into())),
        };
        let (instruction, offset) = {
            let frame = &mut self.frames[index];
            let Some(&instruction) = frame.unit.instructions.get(frame.pc) else {
                return Err(frame
                    .unit
                    .malformed(format!("no instruction at index {}", frame.pc)));
            };
            let offset = frame.pc * INSTRUCTION_WIDTH;
            frame.pc += 1;
            (instruction, offset)
        };
        self.trace_step(index, offset, instruction.line)?;

        let arg = instruction.arg;
        let frame = &mut self.frames[index];
        match instruction.opcode {
            Opcode::Nop => {}
            Opcode::LoadConst => {
                let value = match frame.unit.constant(arg)? {
                    Constant::Value(value) => value.clone(),
                    Constant::Unit(_) => {
                        return Err(frame.unit.malformed(format!("constant {} is a unit", arg)))
                    }
                };
                frame.stack.push(value);
            }
            Opcode::LoadName => {
                let name = Rc::clone(frame.unit.name_at(arg)?);
                let value = frame
                    .namespace
                    .as_ref()
                    .and_then(|namespace| namespace.get(&name).cloned())
                    .or_else(|| self.globals.get(&name).cloned())
                    .or_else(|| Builtin::lookup(&name).map(Value::Builtin))
                    .ok_or_else(|| ErrorKind::Name(name.to_string()))?;
                frame.stack.push(value);
            }
            Opcode::StoreName => {
                let name = Rc::clone(frame.unit.name_at(arg)?);
                let value = frame.pop()?;
                match frame.namespace.as_mut() {
                    Some(namespace) => namespace.insert(name, value),
                    None => self.globals.insert(name, value),
                };
            }
            Opcode::LoadGlobal => {
                let name = Rc::clone(frame.unit.name_at(arg)?);
                let value = self
                    .globals
                    .get(&name)
                    .cloned()
                    .or_else(|| Builtin::lookup(&name).map(Value::Builtin))
                    .ok_or_else(|| ErrorKind::Name(name.to_string()))?;
                frame.stack.push(value);
            }
            Opcode::LoadFast => {
                let slot = arg as usize;
                let value = match frame.slots.get(slot) {
                    Some(Some(value)) => value.clone(),
                    Some(None) => {
                        return Err(ErrorKind::UnboundLocal(frame.unit.local_at(arg)?.to_string()))
                    }
                    None => return Err(frame.unit.malformed(format!("no local slot {}", slot))),
                };
                frame.stack.push(value);
            }
            Opcode::StoreFast => {
                let value = frame.pop()?;
                match frame.slots.get_mut(arg as usize) {
                    Some(slot) => *slot = Some(value),
                    None => return Err(frame.unit.malformed(format!("no local slot {}", arg))),
                }
            }
            Opcode::Pop => {
                frame.pop()?;
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Gt
            | Opcode::Ge => {
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                frame.stack.push(value::binary(instruction.opcode, &lhs, &rhs)?);
            }
            Opcode::Neg | Opcode::Not => {
                let operand = frame.pop()?;
                frame.stack.push(value::unary(instruction.opcode, &operand)?);
            }
            Opcode::Jump => frame.jump(arg),
            Opcode::JumpIfFalse => {
                if !frame.pop()?.is_truthy() {
                    frame.jump(arg);
                }
            }
            Opcode::JumpIfFalseOrPop => {
                if frame.top()?.is_truthy() {
                    frame.pop()?;
                } else {
                    frame.jump(arg);
                }
            }
            Opcode::JumpIfTrueOrPop => {
                if frame.top()?.is_truthy() {
                    frame.jump(arg);
                } else {
                    frame.pop()?;
                }
            }
            Opcode::BuildList => {
                let items = frame.pop_n(arg as usize)?;
                frame.stack.push(Value::list(items));
            }
            Opcode::Index => {
                let position = frame.pop()?;
                let container = frame.pop()?;
                frame.stack.push(value::index(&container, &position)?);
            }
            Opcode::MakeFunction => {
                let function = match frame.unit.constant(arg)? {
                    Constant::Unit(unit) => Function::new(Rc::clone(unit)),
                    Constant::Value(_) => {
                        return Err(frame.unit.malformed(format!("constant {} is not a unit", arg)))
                    }
                };
                frame.stack.push(Value::Function(Rc::new(function)));
            }
            Opcode::Call => {
                let args = frame.pop_n(arg as usize)?;
                let callee = frame.pop()?;
                match callee {
                    Value::Builtin(builtin) => {
                        let result = builtin.call(args, &mut *self.output)?;
                        self.frames[index].stack.push(result);
                    }
                    Value::Function(function) => {
                        let callee = Frame::call(&function, args)?;
                        self.enter(callee)?;
                    }
                    other => {
                        return Err(ErrorKind::Type(format!(
                            "'{}' object is not callable",
                            other.type_name()
                        )))
                    }
                }
            }
            Opcode::Return => {
                let value = frame.pop()?;
                self.trace_return(index, &value)?;
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
