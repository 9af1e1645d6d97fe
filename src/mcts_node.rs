use crate::board::{BoardState, Coord, Player, Rules};
use crate::heuristic::HeuristicEvaluator;
use std::collections::HashMap;

/// Represents a single node in the Monte Carlo search tree.
///
/// A node owns a copy of the board reached by its action. Its heuristic scores and the
/// ranking of its unexplored actions are computed once, when the node is created.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// The game state that this node represents.
    pub state: BoardState,
    /// The move that led to this state. For the root this is the opponent's last move, if known.
    pub action: Option<Coord>,
    /// The player to move in this node's state.
    pub player: Player,
    /// The number of times this node has been visited during the search.
    pub visits: u32,
    /// Wins credited to the player who moved into this node.
    pub wins: f64,
    /// The move that produced this node already won the game for the player who made it.
    pub is_terminal: bool,
    /// Had `player` made this move instead, they would have won.
    pub opponent_would_win: bool,
    heuristic_scores: HashMap<Coord, f64>,
    /// Unexplored actions, lowest score first so that `pop` yields the best one.
    unexplored: Vec<Coord>,
}

impl SearchNode {
    /// Creates a root node for `player` to move. `last_move` is the opponent's previous move.
    pub fn root<R: Rules>(
        rules: &R,
        state: BoardState,
        player: Player,
        last_move: Option<Coord>,
    ) -> Self {
        Self::new(rules, state, player, last_move, false, false)
    }

    /// Creates the node reached when the player to move in `parent` plays `action`.
    pub fn child_of<R: Rules>(rules: &R, parent: &SearchNode, action: Coord) -> Self {
        let mover = parent.player;
        let next_player = mover.opponent();

        let state = parent.state.with_move(action, mover);
        let is_terminal = rules.check_win(&state, action, mover).is_some();
        let swapped = parent.state.with_move(action, next_player);
        let opponent_would_win = rules.check_win(&swapped, action, next_player).is_some();

        Self::new(
            rules,
            state,
            next_player,
            Some(action),
            is_terminal,
            opponent_would_win,
        )
    }

    fn new<R: Rules>(
        rules: &R,
        state: BoardState,
        player: Player,
        action: Option<Coord>,
        is_terminal: bool,
        opponent_would_win: bool,
    ) -> Self {
        let valid_moves = rules.valid_moves(&state);
        let evaluator = HeuristicEvaluator::new(rules);
        let mut heuristic_scores = HashMap::with_capacity(valid_moves.len());
        for &candidate in &valid_moves {
            let score = evaluator.score(&state, candidate, player, action);
            heuristic_scores.insert(candidate, score);
        }

        // Stable sort keeps row-major order among equal scores.
        let mut ranked = valid_moves;
        ranked.sort_by(|a, b| heuristic_scores[b].total_cmp(&heuristic_scores[a]));
        ranked.reverse();

        SearchNode {
            state,
            action,
            player,
            visits: 0,
            wins: 0.0,
            is_terminal,
            opponent_would_win,
            heuristic_scores,
            unexplored: ranked,
        }
    }

    /// Returns the heuristic score this node assigned to `action`, or zero if it wasn't valid.
    pub fn heuristic_score(&self, action: Coord) -> f64 {
        self.heuristic_scores.get(&action).copied().unwrap_or(0.0)
    }

    /// Returns the unexplored actions, best first.
    pub fn unexplored_actions(&self) -> impl Iterator<Item = Coord> + '_ {
        self.unexplored.iter().rev().copied()
    }

    /// Removes and returns the best-ranked unexplored action.
    pub fn take_best_unexplored(&mut self) -> Option<Coord> {
        if self.is_terminal {
            return None;
        }
        self.unexplored.pop()
    }

    /// Returns `true` once every valid action has been materialized as a child.
    pub fn is_fully_expanded(&self) -> bool {
        self.unexplored.is_empty()
    }

    /// Calculates the win rate of this node.
    pub fn wins_rate(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.wins / self.visits as f64
        }
    }
}
