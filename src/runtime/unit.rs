//! Compiled units: instruction sequences, constant pools and line tables.

use crate::runtime::error::ErrorKind;
use crate::runtime::value::Value;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Size in bytes of one instruction. Instruction pointers are byte offsets.
pub const INSTRUCTION_WIDTH: usize = 2;

/// Stable identity of a compiled unit. Clones of a unit share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(u64);

impl UnitId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        UnitId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Opcode {
    Nop,
    LoadConst,
    LoadName,
    StoreName,
    LoadFast,
    StoreFast,
    LoadGlobal,
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Neg,
    Not,
    Jump,
    JumpIfFalse,
    JumpIfFalseOrPop,
    JumpIfTrueOrPop,
    BuildList,
    Index,
    Call,
    MakeFunction,
    Return,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::LoadName => "LOAD_NAME",
            Opcode::StoreName => "STORE_NAME",
            Opcode::LoadFast => "LOAD_FAST",
            Opcode::StoreFast => "STORE_FAST",
            Opcode::LoadGlobal => "LOAD_GLOBAL",
            Opcode::Pop => "POP_TOP",
            Opcode::Add => "BINARY_ADD",
            Opcode::Sub => "BINARY_SUBTRACT",
            Opcode::Mul => "BINARY_MULTIPLY",
            Opcode::Div => "BINARY_DIVIDE",
            Opcode::Mod => "BINARY_MODULO",
            Opcode::Eq => "COMPARE_EQ",
            Opcode::Ne => "COMPARE_NE",
            Opcode::Lt => "COMPARE_LT",
            Opcode::Le => "COMPARE_LE",
            Opcode::Gt => "COMPARE_GT",
            Opcode::Ge => "COMPARE_GE",
            Opcode::Neg => "UNARY_NEGATIVE",
            Opcode::Not => "UNARY_NOT",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "POP_JUMP_IF_FALSE",
            Opcode::JumpIfFalseOrPop => "JUMP_IF_FALSE_OR_POP",
            Opcode::JumpIfTrueOrPop => "JUMP_IF_TRUE_OR_POP",
            Opcode::BuildList => "BUILD_LIST",
            Opcode::Index => "BINARY_SUBSCR",
            Opcode::Call => "CALL",
            Opcode::MakeFunction => "MAKE_FUNCTION",
            Opcode::Return => "RETURN_VALUE",
        }
    }

    /// Whether the operand carries meaning for this opcode.
    pub fn has_arg(self) -> bool {
        matches!(
            self,
            Opcode::LoadConst
                | Opcode::LoadName
                | Opcode::StoreName
                | Opcode::LoadFast
                | Opcode::StoreFast
                | Opcode::LoadGlobal
                | Opcode::Jump
                | Opcode::JumpIfFalse
                | Opcode::JumpIfFalseOrPop
                | Opcode::JumpIfTrueOrPop
                | Opcode::BuildList
                | Opcode::Call
                | Opcode::MakeFunction
        )
    }

    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfFalseOrPop | Opcode::JumpIfTrueOrPop
        )
    }
}

impl From<Opcode> for &'static str {
    fn from(op: Opcode) -> Self {
        op.name()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One instruction. `line` is the line the engine reports for stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg: u32,
    pub line: u32,
}

impl Instruction {
    pub fn new(opcode: Opcode, arg: u32, line: u32) -> Self {
        Self { opcode, arg, line }
    }
}

/// Entry of a unit's constant pool.
#[derive(Debug, Clone)]
pub enum Constant {
    Value(Value),
    Unit(Rc<CompiledUnit>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Module,
    Function,
    Expression,
}

/// Inclusive byte-offset range `[start, end]` mapped to a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
    pub line: u32,
}

impl LineRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Ordered, non-overlapping line ranges of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LineTable {
    ranges: Vec<LineRange>,
}

impl LineTable {
    /// Group consecutive instructions reporting the same line into one range.
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        let mut ranges: Vec<LineRange> = Vec::new();
        for (index, instruction) in instructions.iter().enumerate() {
            let start = index * INSTRUCTION_WIDTH;
            let end = start + INSTRUCTION_WIDTH - 1;
            match ranges.last_mut() {
                Some(last) if last.line == instruction.line => last.end = end,
                _ => ranges.push(LineRange {
                    start,
                    end,
                    line: instruction.line,
                }),
            }
        }
        Self { ranges }
    }

    pub fn from_ranges(ranges: Vec<LineRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[LineRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Line of the range containing `offset`, if any.
    pub fn line_for_offset(&self, offset: usize) -> Option<u32> {
        self.ranges
            .iter()
            .find(|range| range.contains(offset))
            .map(|range| range.line)
    }

    pub fn max_line(&self) -> Option<u32> {
        self.ranges.iter().map(|range| range.line).max()
    }
}

/// A unit of compiled instructions: a module body, a function body or a
/// single expression.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    id: UnitId,
    pub name: Rc<str>,
    pub filename: Rc<str>,
    pub kind: UnitKind,
    /// Number of parameters; they occupy the first local slots.
    pub arity: u32,
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Constant>,
    /// Operand table for `LOAD_NAME`, `STORE_NAME` and `LOAD_GLOBAL`.
    pub names: Vec<Rc<str>>,
    /// Slot names for `LOAD_FAST` and `STORE_FAST`.
    pub locals: Vec<Rc<str>>,
}

impl CompiledUnit {
    pub fn new(name: impl Into<Rc<str>>, filename: impl Into<Rc<str>>, kind: UnitKind) -> Self {
        Self {
            id: UnitId::fresh(),
            name: name.into(),
            filename: filename.into(),
            kind,
            arity: 0,
            instructions: Vec::new(),
            constants: Vec::new(),
            names: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Line table derived from the lines the instructions currently report.
    pub fn line_table(&self) -> LineTable {
        LineTable::from_instructions(&self.instructions)
    }

    pub fn push(&mut self, opcode: Opcode, arg: u32, line: u32) -> usize {
        self.instructions.push(Instruction::new(opcode, arg, line));
        self.instructions.len() - 1
    }

    pub fn add_constant(&mut self, constant: Constant) -> u32 {
        self.constants.push(constant);
        (self.constants.len() - 1) as u32
    }

    /// Index of `name` in the name table, interning it on first use.
    pub fn intern_name(&mut self, name: &str) -> u32 {
        if let Some(index) = self.names.iter().position(|n| &**n == name) {
            return index as u32;
        }
        self.names.push(Rc::from(name));
        (self.names.len() - 1) as u32
    }

    pub fn constant(&self, index: u32) -> Result<&Constant, ErrorKind> {
        self.constants
            .get(index as usize)
            .ok_or_else(|| self.malformed(format!("constant {} out of range", index)))
    }

    pub fn name_at(&self, index: u32) -> Result<&Rc<str>, ErrorKind> {
        self.names
            .get(index as usize)
            .ok_or_else(|| self.malformed(format!("name {} out of range", index)))
    }

    pub fn local_at(&self, index: u32) -> Result<&Rc<str>, ErrorKind> {
        self.locals
            .get(index as usize)
            .ok_or_else(|| self.malformed(format!("local slot {} out of range", index)))
    }

    pub(crate) fn malformed(&self, detail: String) -> ErrorKind {
        ErrorKind::Malformed {
            unit: self.name.to_string(),
            detail,
        }
    }

    /// Every unit reachable through the constant pool, this one first.
    pub fn walk(&self) -> Vec<&CompiledUnit> {
        let mut out = vec![self];
        let mut index = 0;
        while index < out.len() {
            let unit = out[index];
            for constant in &unit.constants {
                match constant {
                    Constant::Unit(nested) => out.push(nested),
                    Constant::Value(Value::Function(function)) => out.push(&function.unit),
                    Constant::Value(_) => {}
                }
            }
            index += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_with_lines(lines: &[u32]) -> CompiledUnit {
        let mut unit = CompiledUnit::new("u", "u.sw", UnitKind::Module);
        for &line in lines {
            unit.push(Opcode::Nop, 0, line);
        }
        unit
    }

    #[test]
    fn line_table_groups_consecutive_lines() {
        let unit = unit_with_lines(&[1, 1, 2, 2, 2, 1]);
        let table = unit.line_table();
        assert_eq!(
            table.ranges(),
            &[
                LineRange { start: 0, end: 3, line: 1 },
                LineRange { start: 4, end: 9, line: 2 },
                LineRange { start: 10, end: 11, line: 1 },
            ]
        );
        assert_eq!(table.max_line(), Some(2));
    }

    #[test]
    fn every_offset_in_a_range_resolves_to_its_line() {
        let table = unit_with_lines(&[3, 3, 3, 7]).line_table();
        for offset in 0..=5 {
            assert_eq!(table.line_for_offset(offset), Some(3));
        }
        assert_eq!(table.line_for_offset(6), Some(7));
        assert_eq!(table.line_for_offset(7), Some(7));
        assert_eq!(table.line_for_offset(8), None);
    }

    #[test]
    fn empty_unit_has_empty_table() {
        let table = unit_with_lines(&[]).line_table();
        assert!(table.is_empty());
        assert_eq!(table.max_line(), None);
    }

    #[test]
    fn clones_share_identity() {
        let unit = unit_with_lines(&[1]);
        let copy = unit.clone();
        assert_eq!(unit.id(), copy.id());
        assert_ne!(unit.id(), unit_with_lines(&[1]).id());
    }

    #[test]
    fn names_are_interned_once() {
        let mut unit = unit_with_lines(&[]);
        assert_eq!(unit.intern_name("x"), 0);
        assert_eq!(unit.intern_name("y"), 1);
        assert_eq!(unit.intern_name("x"), 0);
    }
}
