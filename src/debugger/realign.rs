//! Rewrites units so every instruction reports its own line.
//!
//! The engine only raises a step event when the reported line changes. After
//! realignment instruction `i` of a unit reports line `i + 1`, so every
//! instruction boundary is observable. The true lines are kept in the
//! [`PositionOracle`], which also serves as the visited set.

use crate::debugger::oracle::PositionOracle;
use crate::runtime::unit::{CompiledUnit, Constant};
use crate::runtime::value::Value;
use std::rc::Rc;
use tracing::debug;

/// Realign `unit` and every unit reachable from its constant pool.
///
/// Returns the number of units rewritten; zero when `unit` was already
/// realigned, in which case it is replaced by the stored realigned copy.
pub fn realign(oracle: &PositionOracle, unit: &mut CompiledUnit) -> usize {
    if let Some(realigned) = oracle.realigned(unit.id()) {
        *unit = CompiledUnit::clone(&realigned);
        return 0;
    }
    if !oracle.capture(unit) {
        return 0;
    }
    let rewritten = rewrite(oracle, unit);
    oracle.remember(Rc::new(unit.clone()));
    rewritten
}

fn rewrite(oracle: &PositionOracle, unit: &mut CompiledUnit) -> usize {
    for (position, instruction) in unit.instructions.iter_mut().enumerate() {
        instruction.line = position as u32 + 1;
    }
    debug!(
        unit = %unit.name,
        id = %unit.id(),
        instructions = unit.len(),
        "realigned unit"
    );

    let mut rewritten = 1;
    for constant in unit.constants.iter_mut() {
        match constant {
            Constant::Unit(nested) => rewritten += realign_nested(oracle, nested),
            Constant::Value(Value::Function(function)) => {
                if is_current(oracle, &function.unit) {
                    continue;
                }
                let function = Rc::make_mut(function);
                rewritten += realign_nested(oracle, &mut function.unit);
            }
            Constant::Value(_) => {}
        }
    }
    rewritten
}

/// True when `unit` is already the stored realigned copy, or is being
/// realigned further up the current walk.
fn is_current(oracle: &PositionOracle, unit: &Rc<CompiledUnit>) -> bool {
    match oracle.realigned(unit.id()) {
        Some(realigned) => Rc::ptr_eq(&realigned, unit),
        None => oracle.contains(unit.id()),
    }
}

fn realign_nested(oracle: &PositionOracle, unit: &mut Rc<CompiledUnit>) -> usize {
    if let Some(realigned) = oracle.realigned(unit.id()) {
        *unit = realigned;
        return 0;
    }
    if !oracle.capture(&**unit) {
        return 0;
    }
    let rewritten = rewrite(oracle, Rc::make_mut(unit));
    oracle.remember(Rc::clone(unit));
    rewritten
}

/// Realign a shared unit.
///
/// The unit is rewritten in place when uniquely owned. Otherwise a realigned
/// copy is made once and handed back for every later call with the same unit.
pub fn realign_shared(oracle: &PositionOracle, mut unit: Rc<CompiledUnit>) -> Rc<CompiledUnit> {
    realign_nested(oracle, &mut unit);
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::compiler::compile_program;
    use crate::runtime::unit::UnitKind;

    const PROGRAM: &str = "\
fn add(a, b) {
  return a + b;
}
if true {
  fn twice(x) { return add(x, x); }
}
print(twice(2));
";

    fn lines(unit: &CompiledUnit) -> Vec<u32> {
        unit.instructions.iter().map(|i| i.line).collect()
    }

    #[test]
    fn positions_are_dense_and_ascending() {
        let oracle = PositionOracle::new();
        let mut unit = compile_program(PROGRAM, "t.sw").unwrap();
        let count = realign(&oracle, &mut unit);

        assert_eq!(count, 3);
        for unit in unit.walk() {
            let expected: Vec<u32> = (1..=unit.len() as u32).collect();
            assert_eq!(lines(unit), expected, "unit {}", unit.name);
        }
    }

    #[test]
    fn true_lines_are_captured_before_rewriting() {
        let oracle = PositionOracle::new();
        let mut unit = compile_program(PROGRAM, "t.sw").unwrap();
        let before = unit.line_table();
        realign(&oracle, &mut unit);

        assert_eq!(*oracle.table(unit.id()).unwrap(), before);
        let add = unit
            .walk()
            .into_iter()
            .find(|u| &*u.name == "add")
            .unwrap();
        assert_eq!(oracle.resolve(add.id(), 0), Some(2));
    }

    #[test]
    fn realigning_twice_is_a_no_op() {
        let oracle = PositionOracle::new();
        let mut unit = compile_program(PROGRAM, "t.sw").unwrap();
        realign(&oracle, &mut unit);
        let first = lines(&unit);
        let table = oracle.table(unit.id()).unwrap();

        assert_eq!(realign(&oracle, &mut unit), 0);
        assert_eq!(lines(&unit), first);
        assert!(Rc::ptr_eq(&table, &oracle.table(unit.id()).unwrap()));
        assert_eq!(oracle.len(), 3);
    }

    #[test]
    fn empty_units_are_captured_without_positions() {
        let oracle = PositionOracle::new();
        let mut unit = CompiledUnit::new("empty", "e.sw", UnitKind::Module);
        assert_eq!(realign(&oracle, &mut unit), 1);
        assert!(unit.is_empty());
        assert!(oracle.table(unit.id()).unwrap().is_empty());
    }

    #[test]
    fn shared_units_keep_their_identity() {
        let oracle = PositionOracle::new();
        let unit = Rc::new(compile_program("x = 1;\ny = 2;\n", "t.sw").unwrap());
        let id = unit.id();
        let realigned = realign_shared(&oracle, unit);
        assert_eq!(realigned.id(), id);
        assert_eq!(lines(&realigned), (1..=realigned.len() as u32).collect::<Vec<_>>());
    }

    fn assert_dense(unit: &CompiledUnit) {
        for unit in unit.walk() {
            let expected: Vec<u32> = (1..=unit.len() as u32).collect();
            assert_eq!(lines(unit), expected, "unit {}", unit.name);
        }
    }

    #[test]
    fn a_unit_still_held_by_its_caller_is_realigned_on_every_run() {
        let oracle = PositionOracle::new();
        let original = Rc::new(compile_program(PROGRAM, "t.sw").unwrap());
        let before = lines(&original);

        let first = realign_shared(&oracle, Rc::clone(&original));
        let second = realign_shared(&oracle, Rc::clone(&original));

        assert_eq!(lines(&original), before);
        assert!(Rc::ptr_eq(&first, &second));
        assert_dense(&second);
        assert_eq!(oracle.len(), 3);
    }

    #[test]
    fn nested_units_are_swapped_for_their_realigned_copies() {
        let oracle = PositionOracle::new();
        let original = Rc::new(compile_program(PROGRAM, "t.sw").unwrap());
        let realigned = realign_shared(&oracle, Rc::clone(&original));

        for nested in original.constants.iter().filter_map(|constant| match constant {
            Constant::Unit(unit) => Some(unit),
            Constant::Value(Value::Function(function)) => Some(&function.unit),
            Constant::Value(_) => None,
        }) {
            let mut held = Rc::clone(nested);
            assert_eq!(realign_nested(&oracle, &mut held), 0);
            assert!(Rc::ptr_eq(&held, &oracle.realigned(nested.id()).unwrap()));
            assert_dense(&held);
        }

        let mut copy = CompiledUnit::clone(&original);
        assert_eq!(realign(&oracle, &mut copy), 0);
        assert_eq!(lines(&copy), lines(&realigned));
        assert_dense(&copy);
    }
}
