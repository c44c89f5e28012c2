//! Per-builder identifier allocation.
//!
//! Plan nodes refer to columns by integer id rather than by reference so
//! that subtrees (a CTE referenced more than once) can be cheaply cloned
//! without back-pointers (see `DESIGN.md` / spec §9 "Cyclic graphs via
//! indices").

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing id source, owned exclusively by one builder run
/// (invariant 1: every id issued at most once per run; not process-wide).
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_column: u32,
    next_table: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next_column: 0,
            next_table: 0,
        }
    }

    pub fn new_column_id(&mut self) -> ColumnId {
        let id = ColumnId(self.next_column);
        self.next_column += 1;
        id
    }

    pub fn new_table_id(&mut self) -> TableId {
        let id = TableId(self.next_table);
        self.next_table += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut alloc = IdAllocator::new();
        let a = alloc.new_column_id();
        let b = alloc.new_column_id();
        let t1 = alloc.new_table_id();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
        assert_eq!(t1.0, 0);
    }
}
