use proptest::prelude::*;
use stepwise::debugger::{realign, PositionOracle};
use stepwise::runtime::unit::UnitKind;
use stepwise::runtime::{CompiledUnit, Constant, Opcode, INSTRUCTION_WIDTH};
use std::rc::Rc;

fn unit_with_lines(name: &str, lines: &[u32]) -> CompiledUnit {
    let mut unit = CompiledUnit::new(name, "prop.sw", UnitKind::Function);
    for &line in lines {
        unit.push(Opcode::Nop, 0, line);
    }
    unit
}

proptest! {
    #[test]
    fn realigned_positions_are_dense(
        outer in prop::collection::vec(1u32..200, 0..64),
        inner in prop::collection::vec(1u32..200, 0..64),
    ) {
        let mut unit = unit_with_lines("outer", &outer);
        let nested = unit_with_lines("inner", &inner);
        let nested_id = nested.id();
        let inner_table = nested.line_table();
        unit.add_constant(Constant::Unit(Rc::new(nested)));
        let outer_table = unit.line_table();

        let oracle = PositionOracle::new();
        prop_assert_eq!(realign(&oracle, &mut unit), 2);
        prop_assert_eq!(realign(&oracle, &mut unit), 0);

        let positions: Vec<u32> = unit.instructions.iter().map(|i| i.line).collect();
        let expected: Vec<u32> = (1..=outer.len() as u32).collect();
        prop_assert_eq!(positions, expected);

        prop_assert_eq!(&*oracle.table(unit.id()).unwrap(), &outer_table);
        prop_assert_eq!(&*oracle.table(nested_id).unwrap(), &inner_table);

        for (index, &line) in outer.iter().enumerate() {
            let offset = index * INSTRUCTION_WIDTH;
            prop_assert_eq!(oracle.resolve(unit.id(), offset), Some(line));
        }
    }
}
