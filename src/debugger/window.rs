//! Viewport arithmetic for the step display.

use crate::runtime::unit::{LineTable, INSTRUCTION_WIDTH};
use std::ops::{Range, RangeInclusive};

/// Instructions shown around the current one.
pub const DEFAULT_INSTRUCTION_WINDOW: usize = 11;

/// Source lines shown around the current one.
pub const DEFAULT_SOURCE_WINDOW: usize = 6;

/// Index of the instruction at byte offset `offset`.
pub fn instruction_index(offset: usize) -> usize {
    offset / INSTRUCTION_WIDTH
}

/// Indices of the `width` instructions centred on `current`, clamped to the
/// `count` instructions of the unit.
pub fn instruction_viewport(current: usize, count: usize, width: usize) -> Range<usize> {
    if count <= width {
        return 0..count;
    }
    let start = current.saturating_sub(width / 2).min(count - width);
    start..start + width
}

/// Source lines to show for `line`: `height` lines starting two above it,
/// kept within `[1, max(1, max_line - (height - 1))]`.
pub fn source_window(line: u32, max_line: u32, height: usize) -> RangeInclusive<u32> {
    let height = height.max(1) as u32;
    let upper = max_line.saturating_sub(height - 1).max(1);
    let first = line.saturating_sub(2).clamp(1, upper);
    first..=first + height - 1
}

/// True line of the instruction at `offset` according to `table`.
pub fn resolve_line(table: &LineTable, offset: usize) -> Option<u32> {
    table.line_for_offset(offset)
}
