//! Human- and machine-readable listings of compiled units.

use crate::runtime::unit::{CompiledUnit, Constant, Instruction, LineTable, Opcode, UnitId, UnitKind, INSTRUCTION_WIDTH};
use serde::Serialize;
use std::fmt::{self, Write as _};

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionRow {
    pub index: usize,
    pub offset: usize,
    pub opcode: Opcode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<u32>,
    /// Operand resolved against the unit's tables.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub argval: String,
    /// Line the instruction reports to the engine.
    pub line: u32,
}

impl fmt::Display for InstructionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arg = self.arg.map(|arg| arg.to_string()).unwrap_or_default();
        write!(
            f,
            "{:>4} {:>6} {:>5}  {:<22}{:>4}",
            self.index, self.offset, self.line, self.opcode.name(), arg
        )?;
        if !self.argval.is_empty() {
            write!(f, " ({})", self.argval)?;
        }
        Ok(())
    }
}

/// Disassemble every instruction of `unit`.
pub fn instruction_rows(unit: &CompiledUnit) -> Vec<InstructionRow> {
    unit.instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| InstructionRow {
            index,
            offset: index * INSTRUCTION_WIDTH,
            opcode: instruction.opcode,
            arg: instruction.opcode.has_arg().then_some(instruction.arg),
            argval: describe_arg(unit, instruction),
            line: instruction.line,
        })
        .collect()
}

fn describe_arg(unit: &CompiledUnit, instruction: &Instruction) -> String {
    let arg = instruction.arg;
    match instruction.opcode {
        Opcode::LoadConst | Opcode::MakeFunction => match unit.constant(arg) {
            Ok(Constant::Value(value)) => value.repr(),
            Ok(Constant::Unit(nested)) => format!("<unit {} {}>", nested.name, nested.id()),
            Err(_) => "?".to_string(),
        },
        Opcode::LoadName | Opcode::StoreName | Opcode::LoadGlobal => unit
            .name_at(arg)
            .map(|name| name.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        Opcode::LoadFast | Opcode::StoreFast => unit
            .local_at(arg)
            .map(|name| name.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        op if op.is_jump() => format!("to {}", arg as usize * INSTRUCTION_WIDTH),
        _ => String::new(),
    }
}

/// Full listing of one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitListing {
    pub id: UnitId,
    pub name: String,
    pub filename: String,
    pub kind: UnitKind,
    pub instructions: Vec<InstructionRow>,
    /// Table derived from the lines instructions currently report.
    pub line_table: LineTable,
    /// Table captured before realignment, when the unit was realigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_line_table: Option<LineTable>,
}

impl UnitListing {
    pub fn new(unit: &CompiledUnit) -> Self {
        Self {
            id: unit.id(),
            name: unit.name.to_string(),
            filename: unit.filename.to_string(),
            kind: unit.kind,
            instructions: instruction_rows(unit),
            line_table: unit.line_table(),
            true_line_table: None,
        }
    }

    pub fn with_true_lines(mut self, table: LineTable) -> Self {
        self.true_line_table = Some(table);
        self
    }
}

fn write_table(out: &mut String, title: &str, table: &LineTable) {
    let _ = writeln!(out, "{}:", title);
    for range in table.ranges() {
        let _ = writeln!(out, "  [{}, {}] -> line {}", range.start, range.end, range.line);
    }
}

/// Render listings the way the `disasm` command prints them.
pub fn render_text(listings: &[UnitListing]) -> String {
    let mut out = String::new();
    for (position, listing) in listings.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "Disassembly of {} {} ({}):",
            listing.name, listing.id, listing.filename
        );
        let _ = writeln!(out, "{:>4} {:>6} {:>5}  {:<22}{:>4}", "idx", "offset", "line", "opcode", "arg");
        for row in &listing.instructions {
            let _ = writeln!(out, "{}", row);
        }
        write_table(&mut out, "Line table", &listing.line_table);
        if let Some(table) = &listing.true_line_table {
            write_table(&mut out, "True line table", table);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::compiler::compile_program;

    #[test]
    fn rows_resolve_operands() {
        let unit = compile_program("x = \"hi\";\nif x { x = 1; }\n", "t.sw").unwrap();
        let rows = instruction_rows(&unit);
        assert_eq!(rows[0].opcode, Opcode::LoadConst);
        assert_eq!(rows[0].argval, "\"hi\"");
        assert_eq!(rows[1].argval, "x");
        assert_eq!(rows[1].offset, 2);
        let jump = rows.iter().find(|row| row.opcode == Opcode::JumpIfFalse).unwrap();
        assert!(jump.argval.starts_with("to "));
        let pop = rows.iter().find(|row| row.opcode == Opcode::Return).unwrap();
        assert_eq!(pop.arg, None);
    }

    #[test]
    fn text_listing_includes_line_tables() {
        let unit = compile_program("x = 1;\n", "t.sw").unwrap();
        let text = render_text(&[UnitListing::new(&unit)]);
        assert!(text.starts_with("Disassembly of <module>"));
        assert!(text.contains("LOAD_CONST"));
        assert!(text.contains("Line table:\n  [0, 7] -> line 1"));
        assert!(!text.contains("True line table"));
    }

    #[test]
    fn listings_serialize_to_json() {
        let unit = compile_program("x = 1;\n", "t.sw").unwrap();
        let json = serde_json::to_value(UnitListing::new(&unit)).unwrap();
        assert_eq!(json["kind"], "module");
        assert_eq!(json["instructions"][0]["opcode"], "LOAD_CONST");
        assert_eq!(json["line_table"][0]["line"], 1);
        assert!(json.get("true_line_table").is_none());
    }
}
