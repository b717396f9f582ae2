//! Compiles syntax trees into trees of [`CompiledUnit`]s.
//!
//! Module and expression units resolve names dynamically through
//! `LOAD_NAME`/`STORE_NAME`. Function units keep parameters, assigned names
//! and nested declarations in local slots; every other name is global.
//!
//! Function declarations that are direct children of a unit body are hoisted:
//! they are materialized as `Function` constants and bound before the first
//! statement runs, so they can be called ahead of their declaration.

use crate::runtime::ast::{BinaryOp, Expr, ExprKind, FnDecl, Literal, LogicalOp, Stmt, UnaryOp};
use crate::runtime::error::SyntaxError;
use crate::runtime::parser::{parse_expression, parse_program};
use crate::runtime::unit::{CompiledUnit, Constant, Opcode, UnitKind};
use crate::runtime::value::{Function, Value};
use std::rc::Rc;
use tracing::debug;

type CompileResult<T> = Result<T, SyntaxError>;

/// Compile a whole program into its module unit.
pub fn compile_program(source: &str, filename: &str) -> CompileResult<CompiledUnit> {
    let program = parse_program(source)?;
    let mut builder = UnitBuilder::new(CompiledUnit::new("<module>", filename, UnitKind::Module));
    builder.body(&program)?;
    let last_line = program.last().map(Stmt::line).unwrap_or(1);
    builder.implicit_return(last_line);
    debug!(filename, units = builder.unit.walk().len(), "compiled program");
    Ok(builder.unit)
}

/// Compile a single expression into a unit that returns its value.
pub fn compile_expression(source: &str, filename: &str) -> CompileResult<CompiledUnit> {
    let expr = parse_expression(source)?;
    let mut builder =
        UnitBuilder::new(CompiledUnit::new("<expression>", filename, UnitKind::Expression));
    builder.expr(&expr)?;
    builder.emit(Opcode::Return, 0, expr.line);
    Ok(builder.unit)
}

fn compile_function(decl: &FnDecl, filename: &Rc<str>) -> CompileResult<CompiledUnit> {
    let name = decl.name.as_deref().unwrap_or("<lambda>");
    let mut unit = CompiledUnit::new(name, Rc::clone(filename), UnitKind::Function);
    unit.arity = decl.params.len() as u32;

    let mut locals = decl.params.clone();
    collect_locals(&decl.body, &mut locals);
    unit.locals = locals.iter().map(|local| Rc::from(local.as_str())).collect();

    let mut builder = UnitBuilder::new(unit);
    builder.body(&decl.body)?;
    builder.implicit_return(decl.end_line);
    Ok(builder.unit)
}

/// Names bound anywhere in a function body, outside nested functions.
fn collect_locals(statements: &[Stmt], out: &mut Vec<String>) {
    let mut add = |name: &str, out: &mut Vec<String>| {
        if !out.iter().any(|existing| existing == name) {
            out.push(name.to_string());
        }
    };
    for statement in statements {
        match statement {
            Stmt::Assign { name, .. } => add(name, out),
            Stmt::Fn(FnDecl { name: Some(name), .. }) => add(name, out),
            Stmt::If {
                then, otherwise, ..
            } => {
                collect_locals(then, out);
                collect_locals(otherwise, out);
            }
            Stmt::While { body, .. } => collect_locals(body, out),
            Stmt::Fn(_) | Stmt::Return { .. } | Stmt::Expr(_) => {}
        }
    }
}

struct UnitBuilder {
    unit: CompiledUnit,
}

impl UnitBuilder {
    fn new(unit: CompiledUnit) -> Self {
        Self { unit }
    }

    fn emit(&mut self, opcode: Opcode, arg: u32, line: u32) -> usize {
        self.unit.push(opcode, arg, line)
    }

    /// Point the jump at `at` to the next instruction to be emitted.
    fn patch(&mut self, at: usize) {
        let target = self.unit.len() as u32;
        self.unit.instructions[at].arg = target;
    }

    fn constant(&mut self, value: Value) -> u32 {
        let existing = self.unit.constants.iter().position(|constant| {
            matches!(constant, Constant::Value(v)
                if v.type_name() == value.type_name()
                    && !matches!(v, Value::Function(_))
                    && *v == value)
        });
        match existing {
            Some(index) => index as u32,
            None => self.unit.add_constant(Constant::Value(value)),
        }
    }

    fn implicit_return(&mut self, line: u32) {
        let nil = self.constant(Value::Nil);
        self.emit(Opcode::LoadConst, nil, line);
        self.emit(Opcode::Return, 0, line);
    }

    fn local_slot(&self, name: &str) -> Option<u32> {
        if self.unit.kind != UnitKind::Function {
            return None;
        }
        self.unit
            .locals
            .iter()
            .position(|local| &**local == name)
            .map(|slot| slot as u32)
    }

    fn load(&mut self, name: &str, line: u32) {
        match (self.unit.kind, self.local_slot(name)) {
            (UnitKind::Function, Some(slot)) => self.emit(Opcode::LoadFast, slot, line),
            (UnitKind::Function, None) => {
                let index = self.unit.intern_name(name);
                self.emit(Opcode::LoadGlobal, index, line)
            }
            _ => {
                let index = self.unit.intern_name(name);
                self.emit(Opcode::LoadName, index, line)
            }
        };
    }

    fn store(&mut self, name: &str, line: u32) {
        match self.local_slot(name) {
            Some(slot) => self.emit(Opcode::StoreFast, slot, line),
            None => {
                let index = self.unit.intern_name(name);
                self.emit(Opcode::StoreName, index, line)
            }
        };
    }

    /// A unit body: hoisted declarations first, then the statements.
    fn body(&mut self, statements: &[Stmt]) -> CompileResult<()> {
        for statement in statements {
            if let Stmt::Fn(decl) = statement {
                let unit = compile_function(decl, &self.unit.filename)?;
                let function = Function::new(Rc::new(unit));
                let index = self
                    .unit
                    .add_constant(Constant::Value(Value::Function(Rc::new(function))));
                self.emit(Opcode::LoadConst, index, decl.line);
                if let Some(name) = &decl.name {
                    self.store(name, decl.line);
                }
            }
        }
        for statement in statements {
            if !matches!(statement, Stmt::Fn(_)) {
                self.stmt(statement)?;
            }
        }
        Ok(())
    }

    fn block(&mut self, statements: &[Stmt]) -> CompileResult<()> {
        for statement in statements {
            self.stmt(statement)?;
        }
        Ok(())
    }

    fn stmt(&mut self, statement: &Stmt) -> CompileResult<()> {
        match statement {
            Stmt::Assign { name, value, line } => {
                self.expr(value)?;
                self.store(name, *line);
            }
            Stmt::Fn(decl) => {
                self.make_function(decl)?;
                if let Some(name) = &decl.name {
                    self.store(name, decl.line);
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
                line,
            } => {
                self.expr(cond)?;
                let skip_then = self.emit(Opcode::JumpIfFalse, 0, *line);
                self.block(then)?;
                if otherwise.is_empty() {
                    self.patch(skip_then);
                } else {
                    let skip_else = self.emit(Opcode::Jump, 0, *line);
                    self.patch(skip_then);
                    self.block(otherwise)?;
                    self.patch(skip_else);
                }
            }
            Stmt::While { cond, body, line } => {
                let start = self.unit.len() as u32;
                self.expr(cond)?;
                let exit = self.emit(Opcode::JumpIfFalse, 0, *line);
                self.block(body)?;
                self.emit(Opcode::Jump, start, *line);
                self.patch(exit);
            }
            Stmt::Return { value, line } => {
                if self.unit.kind != UnitKind::Function {
                    return Err(SyntaxError::new(*line, "'return' outside function"));
                }
                match value {
                    Some(value) => self.expr(value)?,
                    None => {
                        let nil = self.constant(Value::Nil);
                        self.emit(Opcode::LoadConst, nil, *line);
                    }
                }
                self.emit(Opcode::Return, 0, *line);
            }
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.emit(Opcode::Pop, 0, expr.line);
            }
        }
        Ok(())
    }

    fn make_function(&mut self, decl: &FnDecl) -> CompileResult<()> {
        let unit = compile_function(decl, &self.unit.filename)?;
        let index = self.unit.add_constant(Constant::Unit(Rc::new(unit)));
        self.emit(Opcode::MakeFunction, index, decl.line);
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> CompileResult<()> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Literal(literal) => {
                let value = match literal {
                    Literal::Nil => Value::Nil,
                    Literal::Bool(b) => Value::Bool(*b),
                    Literal::Int(i) => Value::Int(*i),
                    Literal::Float(x) => Value::Float(*x),
                    Literal::Str(s) => Value::str(s),
                };
                let index = self.constant(value);
                self.emit(Opcode::LoadConst, index, line);
            }
            ExprKind::Name(name) => self.load(name, line),
            ExprKind::List(items) => {
                for item in items {
                    self.expr(item)?;
                }
                self.emit(Opcode::BuildList, items.len() as u32, line);
            }
            ExprKind::Unary(op, operand) => {
                self.expr(operand)?;
                let opcode = match op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                };
                self.emit(opcode, 0, line);
            }
            ExprKind::Binary(op, lhs, rhs) => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.emit(binary_opcode(*op), 0, line);
            }
            ExprKind::Logical(op, lhs, rhs) => {
                self.expr(lhs)?;
                let opcode = match op {
                    LogicalOp::And => Opcode::JumpIfFalseOrPop,
                    LogicalOp::Or => Opcode::JumpIfTrueOrPop,
                };
                let short_circuit = self.emit(opcode, 0, line);
                self.expr(rhs)?;
                self.patch(short_circuit);
            }
            ExprKind::Call(callee, args) => {
                self.expr(callee)?;
                for arg in args {
                    self.expr(arg)?;
                }
                self.emit(Opcode::Call, args.len() as u32, line);
            }
            ExprKind::Index(container, index) => {
                self.expr(container)?;
                self.expr(index)?;
                self.emit(Opcode::Index, 0, line);
            }
            ExprKind::Lambda(decl) => self.make_function(decl)?,
        }
        Ok(())
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(unit: &CompiledUnit) -> Vec<Opcode> {
        unit.instructions.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn module_statements_use_dynamic_names() {
        let unit = compile_program("x = 1;\nprint(x);\n", "t.sw").unwrap();
        assert_eq!(
            opcodes(&unit),
            vec![
                Opcode::LoadConst,
                Opcode::StoreName,
                Opcode::LoadName,
                Opcode::LoadName,
                Opcode::Call,
                Opcode::Pop,
                Opcode::LoadConst,
                Opcode::Return,
            ]
        );
        let lines: Vec<u32> = unit.instructions.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![1, 1, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn top_level_functions_are_hoisted_as_constants() {
        let unit = compile_program("f();\nfn f() {\n  return 1;\n}\n", "t.sw").unwrap();
        assert_eq!(&opcodes(&unit)[..2], &[Opcode::LoadConst, Opcode::StoreName]);
        assert_eq!(unit.instructions[0].line, 2);
        let Constant::Value(Value::Function(function)) = &unit.constants[0] else {
            panic!("expected a function constant");
        };
        assert_eq!(&*function.name, "f");
        assert_eq!(function.unit.kind, UnitKind::Function);
    }

    #[test]
    fn function_scope_uses_slots_and_globals() {
        let unit = compile_program(
            "fn f(a) {\n  b = a + g;\n  return b;\n}\n",
            "t.sw",
        )
        .unwrap();
        let Constant::Value(Value::Function(function)) = &unit.constants[0] else {
            panic!("expected a function constant");
        };
        let body = &function.unit;
        assert_eq!(body.arity, 1);
        assert_eq!(
            body.locals.iter().map(|l| &**l).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(
            opcodes(body),
            vec![
                Opcode::LoadFast,
                Opcode::LoadGlobal,
                Opcode::Add,
                Opcode::StoreFast,
                Opcode::LoadFast,
                Opcode::Return,
                Opcode::LoadConst,
                Opcode::Return,
            ]
        );
        assert_eq!(body.instructions.last().unwrap().line, 4);
    }

    #[test]
    fn nested_declarations_become_unit_constants() {
        let unit = compile_program("if true {\n  fn g() { return 2; }\n}\n", "t.sw").unwrap();
        assert!(opcodes(&unit).contains(&Opcode::MakeFunction));
        assert!(unit
            .constants
            .iter()
            .any(|constant| matches!(constant, Constant::Unit(u) if &*u.name == "g")));
    }

    #[test]
    fn while_loops_jump_back_to_the_condition() {
        let unit = compile_program("i = 0;\nwhile i < 3 {\n  i = i + 1;\n}\n", "t.sw").unwrap();
        let jump = unit
            .instructions
            .iter()
            .find(|i| i.opcode == Opcode::Jump)
            .unwrap();
        assert_eq!(jump.arg, 2);
        let exit = unit
            .instructions
            .iter()
            .find(|i| i.opcode == Opcode::JumpIfFalse)
            .unwrap();
        assert_eq!(unit.instructions[exit.arg as usize].opcode, Opcode::LoadConst);
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let err = compile_program("return 1;", "t.sw").unwrap_err();
        assert_eq!(err, SyntaxError::new(1, "'return' outside function"));
    }

    #[test]
    fn expressions_compile_to_a_returning_unit() {
        let unit = compile_expression("a + 1", "<eval>").unwrap();
        assert_eq!(unit.kind, UnitKind::Expression);
        assert_eq!(
            opcodes(&unit),
            vec![Opcode::LoadName, Opcode::LoadConst, Opcode::Add, Opcode::Return]
        );
    }
}
