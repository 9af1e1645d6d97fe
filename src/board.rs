use std::fmt;
use thiserror::Error;

/// Errors raised while building a `BoardState` from raw cell codes.
#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("board must be square, row {row} has {len} cells instead of {dim}")]
    NotSquare { row: usize, len: usize, dim: usize },

    #[error("board dimension {0} must be odd and at least 3")]
    InvalidDimension(usize),

    #[error("unknown cell code {code} at ({row}, {col})")]
    UnknownCell { row: usize, col: usize, code: u8 },
}

/// One of the two players. The numeric value matches the cell encoding.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Player {
    One = 1,
    Two = 2,
}

impl Player {
    /// Returns the other player.
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// The content of a single grid cell.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Cell {
    Empty = 0,
    One = 1,
    Two = 2,
    Blocked = 3,
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::One => Cell::One,
            Player::Two => Cell::Two,
        }
    }
}

impl TryFrom<u8> for Cell {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::One),
            2 => Ok(Cell::Two),
            3 => Ok(Cell::Blocked),
            other => Err(other),
        }
    }
}

/// A `(row, column)` position on the grid.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Self {
        Coord::new(row, col)
    }
}

impl From<Coord> for (usize, usize) {
    fn from(coord: Coord) -> Self {
        (coord.row, coord.col)
    }
}

/// The six hex directions, listed clockwise starting from `Up`.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Direction {
    Up,
    TopRight,
    BottomRight,
    Down,
    BottomLeft,
    TopLeft,
}

impl Direction {
    pub const CLOCKWISE: [Direction; 6] = [
        Direction::Up,
        Direction::TopRight,
        Direction::BottomRight,
        Direction::Down,
        Direction::BottomLeft,
        Direction::TopLeft,
    ];
}

/// One of the six edge groups of the hexagon. Corners belong to no edge.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone)]
pub enum Edge {
    Left,
    TopLeft,
    TopRight,
    Right,
    BottomRight,
    BottomLeft,
}

/// The structure completed by a winning move.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum WinKind {
    /// The group encloses at least one cell.
    Ring,
    /// The group touches two corners.
    Bridge,
    /// The group touches three distinct edges.
    Fork,
}

/// A square grid of cells. Every move produces a new state; states are never shared.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct BoardState {
    dim: usize,
    cells: Vec<Cell>,
}

impl BoardState {
    /// Creates a grid of the given dimension with every cell set to `fill`.
    pub fn filled(dim: usize, fill: Cell) -> Self {
        Self {
            dim,
            cells: vec![fill; dim * dim],
        }
    }

    /// Parses a grid of raw cell codes (`0` empty, `1`/`2` players, `3` blocked).
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, BoardError> {
        let dim = rows.len();
        if dim < 3 || dim % 2 == 0 {
            return Err(BoardError::InvalidDimension(dim));
        }

        let mut cells = Vec::with_capacity(dim * dim);
        for (row, codes) in rows.iter().enumerate() {
            let codes = codes.as_ref();
            if codes.len() != dim {
                return Err(BoardError::NotSquare {
                    row,
                    len: codes.len(),
                    dim,
                });
            }
            for (col, &code) in codes.iter().enumerate() {
                let cell = Cell::try_from(code)
                    .map_err(|code| BoardError::UnknownCell { row, col, code })?;
                cells.push(cell);
            }
        }

        Ok(Self { dim, cells })
    }

    /// Returns the side length of the grid.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, coord: Coord) -> Cell {
        self.cells[coord.row * self.dim + coord.col]
    }

    pub fn set(&mut self, coord: Coord, cell: Cell) {
        self.cells[coord.row * self.dim + coord.col] = cell;
    }

    /// Returns a copy of this state with `player` occupying `coord`.
    pub fn with_move(&self, coord: Coord, player: Player) -> Self {
        let mut next = self.clone();
        next.set(coord, player.into());
        next
    }

    /// Iterates over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Cell)> + '_ {
        let dim = self.dim;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &cell)| (Coord::new(i / dim, i % dim), cell))
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.dim) {
            let line: Vec<&str> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => ".",
                    Cell::One => "1",
                    Cell::Two => "2",
                    Cell::Blocked => " ",
                })
                .collect();
            writeln!(f, "{}", line.join(" ").trim_end())?;
        }
        Ok(())
    }
}

/// The geometry and win-detection oracle the search relies on.
///
/// Implementations are expected to be immutable tables built once per board dimension.
pub trait Rules {
    /// Returns the dimension of the grid this geometry was built for.
    fn dimension(&self) -> usize;

    /// Returns `true` if `(row, col)` is a playable cell.
    fn in_bounds(&self, row: isize, col: isize) -> bool;

    /// Returns every empty playable cell in row-major order.
    fn valid_moves(&self, state: &BoardState) -> Vec<Coord>;

    /// Returns the playable cells adjacent to `cell`.
    fn neighbours(&self, cell: Coord) -> &[Coord];

    /// Returns the adjacent cell in `direction`, if it is playable.
    fn step(&self, cell: Coord, direction: Direction) -> Option<Coord>;

    fn is_corner(&self, cell: Coord) -> bool;

    fn edge_of(&self, cell: Coord) -> Option<Edge>;

    /// Checks whether `last_move`, already placed for `player`, completes a win.
    fn check_win(&self, state: &BoardState, last_move: Coord, player: Player) -> Option<WinKind>;
}
