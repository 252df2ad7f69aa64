//! Match detection: runs of equal fruit along rows and columns.

use std::collections::BTreeSet;

use crate::grid::{Direction, FruitId, Grid, Pos};

/// Shortest run that counts as a match.
pub const MIN_MATCH: usize = 3;

/// Ordered, de-duplicated set of matched cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    cells: BTreeSet<Pos>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }

    pub fn insert(&mut self, pos: Pos) -> bool {
        self.cells.insert(pos)
    }

    /// Merges `other` in and returns how many cells were new.
    pub fn union(&mut self, other: &MatchSet) -> usize {
        let before = self.cells.len();
        self.cells.extend(other.cells.iter().copied());
        self.cells.len() - before
    }

    pub fn iter(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells.iter().copied()
    }

    /// Columns touched by the set.
    pub fn columns(&self) -> BTreeSet<usize> {
        self.cells.iter().map(|p| p.x).collect()
    }
}

impl FromIterator<Pos> for MatchSet {
    fn from_iter<I: IntoIterator<Item = Pos>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Pos;
    type IntoIter = std::collections::btree_set::Iter<'a, Pos>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

/// Cells beyond `pos` in `dir` that hold `fruit`, nearest first.
fn run(grid: &Grid, pos: Pos, fruit: FruitId, dir: Direction) -> Vec<Pos> {
    let mut out = Vec::new();
    let mut cursor = pos;
    while let Some(next) = grid.neighbor(cursor, dir) {
        if grid.get(next) != Some(fruit) {
            break;
        }
        out.push(next);
        cursor = next;
    }
    out
}

/// Horizontal and vertical runs through `pos` that reach [`MIN_MATCH`].
/// Empty cells never match.
pub fn matches_at(grid: &Grid, pos: Pos) -> MatchSet {
    let mut set = MatchSet::new();
    let Some(fruit) = grid.get(pos) else {
        return set;
    };
    for (a, b) in [
        (Direction::Left, Direction::Right),
        (Direction::Up, Direction::Down),
    ] {
        let mut line = run(grid, pos, fruit, a);
        line.extend(run(grid, pos, fruit, b));
        line.push(pos);
        if line.len() >= MIN_MATCH {
            set.cells.extend(line);
        }
    }
    set
}

/// Result of scanning a batch of seed cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub cells: MatchSet,
    /// Seeds that contributed at least [`MIN_MATCH`] cells not already found.
    pub groups: usize,
}

impl Scan {
    pub fn found(&self) -> bool {
        self.cells.len() >= MIN_MATCH
    }
}

/// Unions the matches around every seed. Membership does not depend on the
/// order of the seeds.
pub fn scan(grid: &Grid, seeds: impl IntoIterator<Item = Pos>) -> Scan {
    let mut out = Scan::default();
    for seed in seeds {
        let found = matches_at(grid, seed);
        if out.cells.union(&found) >= MIN_MATCH {
            out.groups += 1;
        }
    }
    out
}

/// Every match on the board.
pub fn find_all(grid: &Grid) -> MatchSet {
    scan(grid, grid.positions()).cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(rows: &[&str]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn horizontal_run_of_three() {
        let g = grid(&["BCB", "AAA"]);
        let set = matches_at(&g, Pos::new(1, 0));
        assert_eq!(set.len(), 3);
        assert!((0..3).all(|x| set.contains(Pos::new(x, 0))));
    }

    #[test]
    fn run_of_two_is_not_a_match() {
        let g = grid(&["AB", "AB"]);
        assert!(matches_at(&g, Pos::new(0, 0)).is_empty());
        assert!(find_all(&g).is_empty());
    }

    #[test]
    fn cross_shape_unions_both_axes() {
        let g = grid(&[".A.", "AAA", ".A."]);
        let set = matches_at(&g, Pos::new(1, 1));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn empty_cells_never_match() {
        let g = grid(&["...", "..."]);
        assert!(matches_at(&g, Pos::new(1, 0)).is_empty());
    }

    #[test]
    fn scan_counts_distinct_groups() {
        let g = grid(&["BBB", "CAC", "AAA"]);
        let both = scan(&g, [Pos::new(0, 0), Pos::new(0, 2)]);
        assert_eq!(both.groups, 2);
        assert_eq!(both.cells.len(), 6);
        // Two seeds on the same run count it once.
        let same = scan(&g, [Pos::new(0, 0), Pos::new(2, 0)]);
        assert_eq!(same.groups, 1);
        assert!(same.found());
    }

    fn random_grid() -> impl Strategy<Value = Grid> {
        (3usize..7, 3usize..7).prop_flat_map(|(w, h)| {
            prop::collection::vec(0u8..3, w * h).prop_map(move |cells| {
                let mut g = Grid::new(w, h);
                for (i, c) in cells.into_iter().enumerate() {
                    g.set(Pos::new(i / h, i % h), Some(FruitId(c)));
                }
                g
            })
        })
    }

    proptest! {
        #[test]
        fn every_matched_cell_sits_on_a_long_run(g in random_grid()) {
            for pos in &find_all(&g) {
                let fruit = g.get(*pos).unwrap();
                let horizontal = 1 + run(&g, *pos, fruit, Direction::Left).len()
                    + run(&g, *pos, fruit, Direction::Right).len();
                let vertical = 1 + run(&g, *pos, fruit, Direction::Up).len()
                    + run(&g, *pos, fruit, Direction::Down).len();
                prop_assert!(horizontal >= MIN_MATCH || vertical >= MIN_MATCH);
            }
        }

        #[test]
        fn seed_order_does_not_change_membership(g in random_grid()) {
            let forward = scan(&g, g.positions()).cells;
            let mut reversed: Vec<Pos> = g.positions().collect();
            reversed.reverse();
            prop_assert_eq!(forward, scan(&g, reversed).cells);
        }
    }
}
