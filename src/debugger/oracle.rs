use crate::runtime::unit::{CompiledUnit, LineTable, UnitId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Stores the true line table of every realigned unit
///
/// Tables are captured once, before the unit is rewritten, and never replaced.
/// A unit is present here if and only if it has been realigned. The rewritten
/// unit is kept too, so a caller still holding the original gets the same
/// realigned copy on its next run.
#[derive(Debug, Default)]
pub struct PositionOracle {
    tables: RefCell<HashMap<UnitId, Rc<LineTable>>>,
    units: RefCell<HashMap<UnitId, Rc<CompiledUnit>>>,
}

impl PositionOracle {
    /// Create an empty oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the line table `unit` currently reports.
    ///
    /// Returns `false` without touching the stored entry when the unit was
    /// captured before.
    pub fn capture(&self, unit: &CompiledUnit) -> bool {
        let mut tables = self.tables.borrow_mut();
        if tables.contains_key(&unit.id()) {
            return false;
        }
        tables.insert(unit.id(), Rc::new(unit.line_table()));
        true
    }

    /// Keep the rewritten copy of a captured unit
    pub fn remember(&self, unit: Rc<CompiledUnit>) {
        self.units.borrow_mut().insert(unit.id(), unit);
    }

    /// Get the rewritten copy of a unit, once its realignment has finished
    pub fn realigned(&self, id: UnitId) -> Option<Rc<CompiledUnit>> {
        self.units.borrow().get(&id).cloned()
    }

    /// Check whether a unit has been captured
    pub fn contains(&self, id: UnitId) -> bool {
        self.tables.borrow().contains_key(&id)
    }

    /// Get the captured table of a unit
    pub fn table(&self, id: UnitId) -> Option<Rc<LineTable>> {
        self.tables.borrow().get(&id).cloned()
    }

    /// Resolve a byte offset of a unit to its true source line
    pub fn resolve(&self, id: UnitId, offset: usize) -> Option<u32> {
        self.tables
            .borrow()
            .get(&id)
            .and_then(|table| table.line_for_offset(offset))
    }

    /// Get count of captured units
    pub fn len(&self) -> usize {
        self.tables.borrow().len()
    }

    /// Check if nothing has been captured yet
    pub fn is_empty(&self) -> bool {
        self.tables.borrow().is_empty()
    }
}
