use crate::board::{BoardError, BoardState, Cell, Coord, Direction, Edge, Player, Rules, WinKind};
use std::collections::HashSet;

/// Immutable Havannah geometry for one board dimension.
///
/// A board of side `s` is stored in a `(2s - 1) x (2s - 1)` grid. Column `j` holds the rows
/// `0 ..= mid + min(j, dim - 1 - j)`, where `mid = s - 1`; the remaining cells lie outside
/// the hexagon and are blocked. Adjacent columns are skewed by half a cell, so the diagonal
/// offsets depend on which side of the middle column a cell lies.
#[derive(Debug, Clone)]
pub struct HavannahRules {
    dim: usize,
    mid: usize,
    neighbours: Vec<Vec<Coord>>,
    corners: [Coord; 6],
    edges: Vec<Option<Edge>>,
    border: Vec<Coord>,
}

impl HavannahRules {
    /// Builds the geometry table for a grid of dimension `dim` (odd, at least 3).
    pub fn new(dim: usize) -> Result<Self, BoardError> {
        if dim < 3 || dim % 2 == 0 {
            return Err(BoardError::InvalidDimension(dim));
        }

        let mid = dim / 2;
        let corners = [
            Coord::new(0, 0),
            Coord::new(mid, 0),
            Coord::new(0, mid),
            Coord::new(dim - 1, mid),
            Coord::new(0, dim - 1),
            Coord::new(mid, dim - 1),
        ];

        let mut rules = Self {
            dim,
            mid,
            neighbours: vec![Vec::new(); dim * dim],
            corners,
            edges: vec![None; dim * dim],
            border: Vec::new(),
        };

        for row in 0..dim {
            for col in 0..dim {
                let cell = Coord::new(row, col);
                if !rules.is_playable(cell) {
                    continue;
                }
                let adjacent: Vec<Coord> = Direction::CLOCKWISE
                    .iter()
                    .filter_map(|&direction| rules.step(cell, direction))
                    .collect();
                if adjacent.len() < Direction::CLOCKWISE.len() {
                    rules.border.push(cell);
                }
                rules.neighbours[row * dim + col] = adjacent;
                rules.edges[row * dim + col] = rules.classify_edge(cell);
            }
        }

        Ok(rules)
    }

    /// Builds the geometry table for a hexagon with `side` cells per edge.
    pub fn with_side(side: usize) -> Result<Self, BoardError> {
        Self::new((2 * side).saturating_sub(1))
    }

    /// Returns the side length of the hexagon.
    pub fn side(&self) -> usize {
        self.mid + 1
    }

    /// Returns a fresh board: every hexagon cell empty, everything else blocked.
    pub fn empty_board(&self) -> BoardState {
        let mut state = BoardState::filled(self.dim, Cell::Blocked);
        for row in 0..self.dim {
            for col in 0..self.dim {
                let cell = Coord::new(row, col);
                if self.is_playable(cell) {
                    state.set(cell, Cell::Empty);
                }
            }
        }
        state
    }

    /// Returns the six corner cells.
    pub fn corners(&self) -> &[Coord; 6] {
        &self.corners
    }

    fn is_playable(&self, cell: Coord) -> bool {
        self.in_bounds(cell.row as isize, cell.col as isize)
    }

    fn column_bottom(&self, col: usize) -> usize {
        self.mid + col.min(self.dim - 1 - col)
    }

    fn classify_edge(&self, cell: Coord) -> Option<Edge> {
        if self.corners.contains(&cell) {
            return None;
        }

        let Coord { row, col } = cell;
        let last = self.dim - 1;
        if col == 0 {
            Some(Edge::Left)
        } else if col == last {
            Some(Edge::Right)
        } else if row == 0 && col < self.mid {
            Some(Edge::TopLeft)
        } else if row == 0 && col > self.mid {
            Some(Edge::TopRight)
        } else if row == self.column_bottom(col) && col < self.mid {
            Some(Edge::BottomLeft)
        } else if row == self.column_bottom(col) && col > self.mid {
            Some(Edge::BottomRight)
        } else {
            None
        }
    }

    fn offset(&self, col: usize, direction: Direction) -> (isize, isize) {
        use std::cmp::Ordering::{Equal, Greater, Less};

        let half = col.cmp(&self.mid);
        match (direction, half) {
            (Direction::Up, _) => (-1, 0),
            (Direction::Down, _) => (1, 0),
            (Direction::TopLeft, Less | Equal) => (-1, -1),
            (Direction::TopLeft, Greater) => (0, -1),
            (Direction::BottomLeft, Less | Equal) => (0, -1),
            (Direction::BottomLeft, Greater) => (1, -1),
            (Direction::TopRight, Less) => (0, 1),
            (Direction::TopRight, Equal | Greater) => (-1, 1),
            (Direction::BottomRight, Less) => (1, 1),
            (Direction::BottomRight, Equal | Greater) => (0, 1),
        }
    }

    /// Collects the group of `stone` cells connected to `start`.
    fn group_of(&self, state: &BoardState, start: Coord, stone: Cell) -> Vec<bool> {
        let mut in_group = vec![false; self.dim * self.dim];
        let mut stack = vec![start];
        while let Some(cell) = stack.pop() {
            let index = cell.row * self.dim + cell.col;
            if in_group[index] || state.get(cell) != stone {
                continue;
            }
            in_group[index] = true;
            stack.extend(self.neighbours(cell).iter().copied());
        }
        in_group
    }

    /// A group forms a ring when some cell outside it can't reach the border without crossing it.
    fn encloses_cell(&self, in_group: &[bool]) -> bool {
        let mut reached = in_group.to_vec();
        let mut stack: Vec<Coord> = self
            .border
            .iter()
            .copied()
            .filter(|cell| !in_group[cell.row * self.dim + cell.col])
            .collect();

        while let Some(cell) = stack.pop() {
            let index = cell.row * self.dim + cell.col;
            if reached[index] {
                continue;
            }
            reached[index] = true;
            stack.extend(self.neighbours(cell).iter().copied());
        }

        (0..self.dim * self.dim).any(|index| {
            !reached[index] && self.is_playable(Coord::new(index / self.dim, index % self.dim))
        })
    }
}

impl Rules for HavannahRules {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn in_bounds(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        let (row, col) = (row as usize, col as usize);
        row < self.dim && col < self.dim && row <= self.column_bottom(col)
    }

    fn valid_moves(&self, state: &BoardState) -> Vec<Coord> {
        state
            .cells()
            .filter(|&(cell, value)| value == Cell::Empty && self.is_playable(cell))
            .map(|(cell, _)| cell)
            .collect()
    }

    fn neighbours(&self, cell: Coord) -> &[Coord] {
        &self.neighbours[cell.row * self.dim + cell.col]
    }

    fn step(&self, cell: Coord, direction: Direction) -> Option<Coord> {
        let (d_row, d_col) = self.offset(cell.col, direction);
        let row = cell.row as isize + d_row;
        let col = cell.col as isize + d_col;
        self.in_bounds(row, col)
            .then(|| Coord::new(row as usize, col as usize))
    }

    fn is_corner(&self, cell: Coord) -> bool {
        self.corners.contains(&cell)
    }

    fn edge_of(&self, cell: Coord) -> Option<Edge> {
        self.edges[cell.row * self.dim + cell.col]
    }

    fn check_win(&self, state: &BoardState, last_move: Coord, player: Player) -> Option<WinKind> {
        let stone = Cell::from(player);
        if state.get(last_move) != stone {
            return None;
        }

        let in_group = self.group_of(state, last_move, stone);
        let members = || {
            (0..self.dim * self.dim)
                .filter(|&index| in_group[index])
                .map(|index| Coord::new(index / self.dim, index % self.dim))
        };

        let corners = members().filter(|&cell| self.is_corner(cell)).count();
        if corners >= 2 {
            return Some(WinKind::Bridge);
        }

        let edges: HashSet<Edge> = members().filter_map(|cell| self.edge_of(cell)).collect();
        if edges.len() >= 3 {
            return Some(WinKind::Fork);
        }

        let own_neighbours = self
            .neighbours(last_move)
            .iter()
            .filter(|&&cell| state.get(cell) == stone)
            .count();
        if own_neighbours >= 2 && self.encloses_cell(&in_group) {
            return Some(WinKind::Ring);
        }

        None
    }
}
