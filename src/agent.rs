//! Per-turn decision facade.
//!
//! The agent answers immediate wins and blocks directly, and otherwise builds a fresh search
//! tree for the current position. The only state kept between turns is the board as it was
//! after the agent's own previous move, used to recover the opponent's reply.

use crate::board::{BoardError, BoardState, Cell, Coord, Player, Rules};
use crate::config::SearchConfig;
use crate::mcts::{MonteCarloTreeSearch, SearchError};
use crate::random::{RandomGenerator, StandardRandomGenerator};
use thiserror::Error;
use tracing::debug;

/// Errors returned by `HavannahAgent`.
#[derive(Debug, Error, PartialEq)]
pub enum AgentError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("invalid board: {0}")]
    Board(#[from] BoardError),

    #[error("board dimension {actual} does not match the rules dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A Havannah player backed by heuristic-guided Monte Carlo tree search.
pub struct HavannahAgent<R: Rules, K: RandomGenerator> {
    player: Player,
    rules: R,
    config: SearchConfig,
    random: K,
    previous_state: Option<BoardState>,
}

impl<R: Rules> HavannahAgent<R, StandardRandomGenerator> {
    /// Creates an agent playing as `player` with the default search budget.
    pub fn new(player: Player, rules: R) -> Self {
        Self::with_random_generator(player, rules, StandardRandomGenerator)
    }
}

impl<R: Rules, K: RandomGenerator> HavannahAgent<R, K> {
    pub fn with_random_generator(player: Player, rules: R, random: K) -> Self {
        Self {
            player,
            rules,
            config: SearchConfig::default(),
            random,
            previous_state: None,
        }
    }

    /// Sets the search budget used for every turn.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn opponent(&self) -> Player {
        self.player.opponent()
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// The board after this agent's last move, if it has moved.
    pub fn previous_state(&self) -> Option<&BoardState> {
        self.previous_state.as_ref()
    }

    /// Parses a grid of raw cell codes and returns the chosen `(row, col)`.
    pub fn get_move<C: AsRef<[u8]>>(&mut self, rows: &[C]) -> Result<(usize, usize), AgentError> {
        let state = BoardState::from_rows(rows)?;
        self.decide(&state).map(Into::into)
    }

    /// Chooses the cell to play in `state`.
    pub fn decide(&mut self, state: &BoardState) -> Result<Coord, AgentError> {
        if state.dim() != self.rules.dimension() {
            return Err(AgentError::DimensionMismatch {
                expected: self.rules.dimension(),
                actual: state.dim(),
            });
        }

        let valid_moves = self.rules.valid_moves(state);
        if valid_moves.is_empty() {
            return Err(SearchError::NoValidMoves.into());
        }

        if let Some(action) = winning_move(&self.rules, state, &valid_moves, self.player) {
            debug!(player = ?self.player, ?action, "playing immediate win");
            return Ok(self.commit(state, action));
        }
        if let Some(action) = winning_move(&self.rules, state, &valid_moves, self.opponent()) {
            debug!(player = ?self.player, ?action, "blocking immediate win");
            return Ok(self.commit(state, action));
        }

        let last_move = self
            .previous_state
            .as_ref()
            .and_then(|previous| infer_opponent_move(previous, state, self.opponent()));
        debug!(player = ?self.player, ?last_move, "starting search");

        let outcome = MonteCarloTreeSearch::builder(&self.rules, state.clone(), self.player)
            .with_last_move(last_move)
            .with_config(self.config.clone())
            .build(&mut self.random)
            .run()?;

        debug!(
            player = ?self.player,
            action = ?outcome.action,
            iterations = outcome.iterations,
            forced = outcome.forced,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "search chose move"
        );
        self.previous_state = Some(outcome.state);
        Ok(outcome.action)
    }

    fn commit(&mut self, state: &BoardState, action: Coord) -> Coord {
        self.previous_state = Some(state.with_move(action, self.player));
        action
    }
}

/// Returns the first of `candidates` that wins outright for `player`.
pub fn winning_move<R: Rules>(
    rules: &R,
    state: &BoardState,
    candidates: &[Coord],
    player: Player,
) -> Option<Coord> {
    candidates.iter().copied().find(|&action| {
        let next = state.with_move(action, player);
        rules.check_win(&next, action, player).is_some()
    })
}

/// Finds the cell that became the opponent's between two observed boards.
///
/// Returns the first such cell in row-major order, or `None` if there is none.
pub fn infer_opponent_move(
    previous: &BoardState,
    current: &BoardState,
    opponent: Player,
) -> Option<Coord> {
    let stone = Cell::from(opponent);
    previous
        .cells()
        .zip(current.cells())
        .find(|&((_, before), (_, after))| before != after && after == stone)
        .map(|((cell, _), _)| cell)
}

#[cfg(test)]
mod tests {
    use crate::agent::{infer_opponent_move, AgentError, HavannahAgent};
    use crate::board::{BoardError, BoardState, Cell, Coord, Player, Rules};
    use crate::boards::havannah::HavannahRules;
    use crate::config::SearchConfig;
    use crate::mcts::SearchError;
    use crate::random::SeededRandomGenerator;
    use std::time::{Duration, Instant};

    fn agent(player: Player, side: usize) -> HavannahAgent<HavannahRules, SeededRandomGenerator> {
        let rules = HavannahRules::with_side(side).unwrap();
        HavannahAgent::with_random_generator(player, rules, SeededRandomGenerator::default())
            .with_config(SearchConfig::for_testing())
    }

    /// Player one needs (0,3) for a bridge along the top; player two needs (3,6) down the right.
    fn double_threat(rules: &HavannahRules) -> BoardState {
        let mut state = rules.empty_board();
        for cell in [(0, 0), (0, 1), (0, 2)] {
            state = state.with_move(cell.into(), Player::One);
        }
        for cell in [(0, 6), (1, 6), (2, 6)] {
            state = state.with_move(cell.into(), Player::Two);
        }
        state
    }

    #[test]
    fn test1_takes_immediate_win() {
        let mut one = agent(Player::One, 4);
        let state = double_threat(one.rules());

        assert_eq!(one.decide(&state), Ok(Coord::new(0, 3)));
        assert_eq!(
            one.previous_state().unwrap().get(Coord::new(0, 3)),
            Cell::One
        );

        let mut two = agent(Player::Two, 4);
        assert_eq!(two.decide(&state), Ok(Coord::new(3, 6)));
    }

    #[test]
    fn test2_blocks_immediate_win() {
        let mut one = agent(Player::One, 4);
        let mut state = one.rules().empty_board();
        for cell in [(0, 0), (0, 1), (0, 2)] {
            state = state.with_move(cell.into(), Player::One);
        }

        let mut two = agent(Player::Two, 4);
        assert_eq!(one.decide(&state), Ok(Coord::new(0, 3)));
        assert_eq!(two.decide(&state), Ok(Coord::new(0, 3)));
        assert_eq!(
            two.previous_state().unwrap().get(Coord::new(0, 3)),
            Cell::Two
        );
    }

    #[test]
    fn test3_infers_opponent_move() {
        let rules = HavannahRules::with_side(3).unwrap();
        let previous = rules.empty_board().with_move(Coord::new(2, 2), Player::One);
        let current = previous.with_move(Coord::new(1, 3), Player::Two);

        assert_eq!(
            infer_opponent_move(&previous, &current, Player::Two),
            Some(Coord::new(1, 3))
        );
        assert_eq!(infer_opponent_move(&previous, &previous, Player::Two), None);
        assert_eq!(infer_opponent_move(&previous, &current, Player::One), None);
    }

    #[test]
    fn test4_searches_empty_board_within_budget() {
        // arrange
        let rules = HavannahRules::with_side(4).unwrap();
        let state = rules.empty_board();
        let config = SearchConfig::default()
            .with_time_limit(Duration::from_secs(2))
            .with_iteration_limit(10_000);
        let mut one = HavannahAgent::with_random_generator(Player::One, rules, SeededRandomGenerator::new(5))
            .with_config(config);

        // act
        let started = Instant::now();
        let action = one.decide(&state).unwrap();
        let elapsed = started.elapsed();

        // assert
        assert!(one.rules().in_bounds(action.row as isize, action.col as isize));
        assert_eq!(state.get(action), Cell::Empty);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test5_remembers_own_move_for_next_turn() {
        // arrange
        let mut one = agent(Player::One, 3);
        let first = one.rules().empty_board();

        // act
        let action = one.decide(&first).unwrap();
        let after_own = one.previous_state().unwrap().clone();
        let reply = one
            .rules()
            .valid_moves(&after_own)
            .into_iter()
            .next()
            .unwrap();
        let second = after_own.with_move(reply, Player::Two);
        let next_action = one.decide(&second).unwrap();

        // assert
        assert_eq!(after_own.get(action), Cell::One);
        assert_eq!(infer_opponent_move(&after_own, &second, Player::Two), Some(reply));
        assert_eq!(second.get(next_action), Cell::Empty);
    }

    #[test]
    fn test6_rejects_bad_boards() {
        let mut one = agent(Player::One, 3);

        let ragged = one.get_move(&[vec![0u8, 0, 0], vec![0, 0], vec![0, 0, 0]]);
        assert_eq!(
            ragged,
            Err(AgentError::Board(BoardError::NotSquare {
                row: 1,
                len: 2,
                dim: 3
            }))
        );

        let small = BoardState::filled(3, Cell::Empty);
        assert_eq!(
            one.decide(&small),
            Err(AgentError::DimensionMismatch {
                expected: 5,
                actual: 3
            })
        );

        let full = BoardState::filled(5, Cell::Blocked);
        assert_eq!(
            one.decide(&full),
            Err(AgentError::Search(SearchError::NoValidMoves))
        );
    }

    #[test]
    fn test7_get_move_returns_coordinate_pair() {
        let mut one = agent(Player::One, 3);
        let rows: Vec<Vec<u8>> = vec![
            vec![1, 0, 1, 0, 0],
            vec![0, 0, 0, 0, 0],
            vec![0, 0, 2, 0, 0],
            vec![3, 0, 2, 0, 3],
            vec![3, 3, 0, 3, 3],
        ];

        assert_eq!(one.get_move(&rows), Ok((0, 1)));
    }
}
