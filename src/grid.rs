//! Grid state: fruit occupants addressed by column `x` and row `y`.
//!
//! Row 0 is the bottom of the board; gravity pulls towards lower rows.

use std::collections::BTreeSet;
use std::fmt;

/// Fruit identity tag. Kinds are numbered from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FruitId(pub u8);

impl FruitId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Letter used by [`Grid::from_rows`] and the `Display` impl.
    pub fn letter(self) -> char {
        char::from(b'A' + self.0 % 26)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal direction. `Up` points towards higher rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    fn delta(self) -> (isize, isize) {
        match self {
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Up => (0, 1),
            Self::Down => (0, -1),
        }
    }
}

/// Column-major grid of optional occupants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Option<FruitId>>,
}

impl Grid {
    /// Empty grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    /// Builds a grid from text rows listed top row first. `A`..`Z` are fruit
    /// kinds 0..25, `.` is an empty cell. Returns `None` for ragged rows or
    /// unknown characters.
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut grid = Self::new(width, height);
        for (i, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return None;
            }
            let y = height - 1 - i;
            for (x, c) in row.chars().enumerate() {
                let fruit = match c {
                    '.' => None,
                    'A'..='Z' => Some(FruitId(c as u8 - b'A')),
                    _ => return None,
                };
                grid.set(Pos::new(x, y), fruit);
            }
        }
        Some(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Pos) -> usize {
        pos.x * self.height + pos.y
    }

    /// Occupant at `pos`; `None` for empty or out-of-bounds cells.
    pub fn get(&self, pos: Pos) -> Option<FruitId> {
        if self.contains(pos) {
            self.cells[self.index(pos)]
        } else {
            None
        }
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: Pos, fruit: Option<FruitId>) {
        if self.contains(pos) {
            let i = self.index(pos);
            self.cells[i] = fruit;
        }
    }

    pub fn neighbor(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        let (dx, dy) = dir.delta();
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        let next = Pos::new(x, y);
        self.contains(next).then_some(next)
    }

    /// Exchanges two occupants. Swapping twice restores the grid exactly.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        if self.contains(a) && self.contains(b) {
            let (ia, ib) = (self.index(a), self.index(b));
            self.cells.swap(ia, ib);
        }
    }

    /// All positions, column by column, bottom to top.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let (width, height) = (self.width, self.height);
        (0..width).flat_map(move |x| (0..height).map(move |y| Pos::new(x, y)))
    }

    /// Occupants of column `x`, bottom first.
    pub fn column(&self, x: usize) -> &[Option<FruitId>] {
        if x < self.width {
            let start = x * self.height;
            &self.cells[start..start + self.height]
        } else {
            &[]
        }
    }

    /// Stable gravity for one column: survivors slide down over the gaps,
    /// keeping their relative order. Returns the positions that received a
    /// moved fruit.
    pub fn collapse_column(&mut self, x: usize) -> Vec<Pos> {
        let mut moved = Vec::new();
        if x >= self.width {
            return moved;
        }
        let start = x * self.height;
        let column = &mut self.cells[start..start + self.height];
        let mut write = 0;
        for read in 0..column.len() {
            if let Some(fruit) = column[read] {
                if read != write {
                    column[write] = Some(fruit);
                    column[read] = None;
                    moved.push(Pos::new(x, write));
                }
                write += 1;
            }
        }
        moved
    }

    /// Empty cells within the given columns, bottom to top.
    pub fn empty_cells(&self, columns: &BTreeSet<usize>) -> Vec<Pos> {
        columns
            .iter()
            .filter(|&&x| x < self.width)
            .flat_map(|&x| (0..self.height).map(move |y| Pos::new(x, y)))
            .filter(|&p| self.get(p).is_none())
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Occupants of `fruit` kind currently on the board.
    pub fn count(&self, fruit: FruitId) -> usize {
        self.cells.iter().filter(|c| **c == Some(fruit)).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let c = self.get(Pos::new(x, y)).map_or('.', FruitId::letter);
                write!(f, "{c}")?;
            }
            if y > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rows_are_read_top_first() {
        let grid = Grid::from_rows(&["AB.", "CAB"]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(Pos::new(0, 0)), Some(FruitId(2)));
        assert_eq!(grid.get(Pos::new(0, 1)), Some(FruitId(0)));
        assert_eq!(grid.get(Pos::new(2, 1)), None);
        assert_eq!(grid.to_string(), "AB.\nCAB");
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(Grid::from_rows(&["AB", "A"]).is_none());
        assert!(Grid::from_rows(&["a"]).is_none());
    }

    #[test]
    fn neighbors_stop_at_edges() {
        let grid = Grid::new(3, 3);
        assert_eq!(grid.neighbor(Pos::new(0, 0), Direction::Left), None);
        assert_eq!(grid.neighbor(Pos::new(0, 0), Direction::Down), None);
        assert_eq!(
            grid.neighbor(Pos::new(0, 0), Direction::Up),
            Some(Pos::new(0, 1))
        );
        assert_eq!(grid.neighbor(Pos::new(2, 2), Direction::Right), None);
    }

    #[test]
    fn collapse_example_column() {
        // Column [A, A, B] bottom to top with the bottom two cleared.
        let mut grid = Grid::from_rows(&["B", "A", "A"]).unwrap();
        grid.set(Pos::new(0, 0), None);
        grid.set(Pos::new(0, 1), None);
        let moved = grid.collapse_column(0);
        assert_eq!(moved, vec![Pos::new(0, 0)]);
        assert_eq!(grid.column(0), &[Some(FruitId(1)), None, None]);
        let empties = grid.empty_cells(&BTreeSet::from([0]));
        assert_eq!(empties, vec![Pos::new(0, 1), Pos::new(0, 2)]);
    }

    fn column_strategy() -> impl Strategy<Value = Vec<Option<u8>>> {
        prop::collection::vec(prop::option::of(0u8..6), 1..12)
    }

    proptest! {
        #[test]
        fn collapse_keeps_order_and_leaves_no_gaps(column in column_strategy()) {
            let mut grid = Grid::new(1, column.len());
            for (y, c) in column.iter().enumerate() {
                grid.set(Pos::new(0, y), c.map(FruitId));
            }
            let survivors: Vec<FruitId> = column.iter().flatten().copied().map(FruitId).collect();
            grid.collapse_column(0);
            let after = grid.column(0);
            let packed: Vec<FruitId> = after.iter().take(survivors.len()).flatten().copied().collect();
            prop_assert_eq!(&packed, &survivors);
            prop_assert!(after[survivors.len()..].iter().all(Option::is_none));
        }

        #[test]
        fn swapping_twice_restores_grid(
            cells in prop::collection::vec(0u8..6, 16),
            a in 0usize..16,
            b in 0usize..16,
        ) {
            let mut grid = Grid::new(4, 4);
            for (i, c) in cells.iter().enumerate() {
                grid.set(Pos::new(i / 4, i % 4), Some(FruitId(*c)));
            }
            let before = grid.clone();
            let (pa, pb) = (Pos::new(a / 4, a % 4), Pos::new(b / 4, b % 4));
            grid.swap(pa, pb);
            grid.swap(pa, pb);
            prop_assert_eq!(grid, before);
        }
    }
}
