use crate::board::{BoardState, Coord, Player, Rules};
use crate::config::SearchConfig;
use crate::mcts_node::SearchNode;
use crate::random::RandomGenerator;
use ego_tree::{NodeId, NodeRef, Tree};
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Win credit every node on the path receives for a drawn rollout.
const DRAW_CREDIT: f64 = 0.25;
/// Visit count assumed for a node that has never been visited.
const UNVISITED_PLACEHOLDER: f64 = 0.25;

/// Errors that can occur during a search.
#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("no valid moves available")]
    NoValidMoves,
}

/// The result of a rollout or a terminal node.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Reward {
    Win(Player),
    /// The board filled up without a winner.
    Draw,
}

impl Reward {
    pub fn winner(self) -> Option<Player> {
        match self {
            Reward::Win(player) => Some(player),
            Reward::Draw => None,
        }
    }
}

/// The move chosen by a finished search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The chosen cell.
    pub action: Coord,
    /// The board after the chosen move.
    pub state: BoardState,
    /// Completed select/simulate/backpropagate iterations.
    pub iterations: u32,
    /// The search stopped early on a winning or blocking reply next to the root.
    pub forced: bool,
    pub elapsed: Duration,
}

/// Monte Carlo tree search for one turn.
///
/// Nodes live in an arena tree owned by the search; the whole tree is dropped with it.
pub struct MonteCarloTreeSearch<'a, R: Rules, K: RandomGenerator> {
    tree: Tree<SearchNode>,
    root_id: NodeId,
    rules: &'a R,
    random: &'a mut K,
    config: SearchConfig,
    iterations: u32,
}

/// A builder for creating instances of `MonteCarloTreeSearch`.
pub struct MonteCarloTreeSearchBuilder<'a, R: Rules, K: RandomGenerator> {
    rules: &'a R,
    state: BoardState,
    player: Player,
    last_move: Option<Coord>,
    config: SearchConfig,
    random: PhantomData<K>,
}

impl<'a, R: Rules, K: RandomGenerator> MonteCarloTreeSearchBuilder<'a, R, K> {
    /// Creates a new builder searching for `player`'s move in `state`.
    pub fn new(rules: &'a R, state: BoardState, player: Player) -> Self {
        Self {
            rules,
            state,
            player,
            last_move: None,
            config: SearchConfig::default(),
            random: PhantomData,
        }
    }

    /// Sets the opponent's last move, which biases the heuristic towards local replies.
    pub fn with_last_move(mut self, last_move: Option<Coord>) -> Self {
        self.last_move = last_move;
        self
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the search, creating the root node.
    pub fn build(self, random: &'a mut K) -> MonteCarloTreeSearch<'a, R, K> {
        let root = SearchNode::root(self.rules, self.state, self.player, self.last_move);
        let tree = Tree::new(root);
        let root_id = tree.root().id();

        MonteCarloTreeSearch {
            tree,
            root_id,
            rules: self.rules,
            random,
            config: self.config,
            iterations: 0,
        }
    }
}

impl<'a, R: Rules, K: RandomGenerator> MonteCarloTreeSearch<'a, R, K> {
    /// Returns a new builder for `MonteCarloTreeSearch`.
    pub fn builder(
        rules: &'a R,
        state: BoardState,
        player: Player,
    ) -> MonteCarloTreeSearchBuilder<'a, R, K> {
        MonteCarloTreeSearchBuilder::new(rules, state, player)
    }

    /// Returns an immutable reference to the underlying search tree.
    pub fn get_tree(&self) -> &Tree<SearchNode> {
        &self.tree
    }

    /// Returns a reference to the root node of the search tree.
    pub fn get_root(&self) -> NodeRef<'_, SearchNode> {
        self.tree.root()
    }

    /// Returns the number of completed iterations.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Runs the search until the time or iteration budget is spent and returns the chosen move.
    pub fn run(&mut self) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let root = self.get_root();
        if !root.has_children() && root.value().is_fully_expanded() {
            return Err(SearchError::NoValidMoves);
        }

        while self.iterations < self.config.iteration_limit
            && started.elapsed() < self.config.time_limit
        {
            if let Some(forced) = self.do_iteration() {
                debug!(
                    iterations = self.iterations,
                    action = ?self.node(forced).action,
                    "forced reply next to the root"
                );
                return Ok(self.outcome(forced, true, started.elapsed()));
            }
        }

        let best = match self.get_most_visited_child() {
            Some(best) => best,
            None => self
                .expand(self.root_id)
                .ok_or(SearchError::NoValidMoves)?,
        };

        let elapsed = started.elapsed();
        debug!(
            iterations = self.iterations,
            elapsed_ms = elapsed.as_millis() as u64,
            root_visits = self.get_root().value().visits,
            nodes = self.tree.nodes().count(),
            "search finished"
        );
        Ok(self.outcome(best, false, elapsed))
    }

    /// Performs one iteration. Returns the forced reply instead if selection reached one.
    pub fn do_iteration(&mut self) -> Option<NodeId> {
        let (selected, is_terminal) = self.select();
        if let Some(forced) = self.forced_reply(selected) {
            return Some(forced);
        }

        let reward = self.evaluate(selected, is_terminal);
        self.backpropagate(selected, reward);
        self.iterations += 1;
        None
    }

    /// A terminal node was won by the player who moved into it; anything else is rolled out.
    fn evaluate(&mut self, selected: NodeId, is_terminal: bool) -> Reward {
        let node = self.node(selected);
        if is_terminal {
            return Reward::Win(node.player.opponent());
        }
        let (state, player) = (node.state.clone(), node.player);
        rollout(self.rules, state, player, &mut *self.random)
    }

    /// Runs up to `n` iterations, stopping early on a forced reply.
    pub fn iterate_n_times(&mut self, n: u32) -> Option<NodeId> {
        for _ in 0..n {
            if let Some(forced) = self.do_iteration() {
                return Some(forced);
            }
        }
        None
    }

    /// Returns the most visited child of the root. Ties go to the earliest child.
    pub fn get_most_visited_child(&self) -> Option<NodeId> {
        let mut best: Option<NodeRef<'_, SearchNode>> = None;
        for child in self.get_root().children() {
            if best.is_none_or(|best| child.value().visits > best.value().visits) {
                best = Some(child);
            }
        }
        best.map(|node| node.id())
    }

    fn node(&self, id: NodeId) -> &SearchNode {
        self.tree
            .get(id)
            .map(|node| node.value())
            .expect("node ids are only issued by this tree")
    }

    fn has_children(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some_and(|node| node.has_children())
    }

    fn outcome(&self, id: NodeId, forced: bool, elapsed: Duration) -> SearchOutcome {
        let node = self.node(id);
        SearchOutcome {
            action: node.action.expect("children of the root are created with their action"),
            state: node.state.clone(),
            iterations: self.iterations,
            forced,
            elapsed,
        }
    }

    /// Descends from the root, expanding one child per visited node.
    ///
    /// Returns the selected node and whether it is terminal.
    fn select(&mut self) -> (NodeId, bool) {
        let mut current = self.root_id;
        loop {
            if self.node(current).is_terminal {
                return (current, true);
            }

            if self.has_children(current) {
                self.expand(current);
            } else {
                let Some(child) = self.expand(current) else {
                    return (current, false);
                };
                if self.node(child).is_terminal {
                    return (child, true);
                }
                if self.node(current).visits == 0 {
                    return (current, false);
                }
            }

            match self.best_child(current) {
                Some(next) => current = next,
                None => return (current, false),
            }
        }
    }

    /// Materializes the best-ranked unexplored action of `id` as a new child.
    fn expand(&mut self, id: NodeId) -> Option<NodeId> {
        let rules = self.rules;
        let mut parent = self.tree.get_mut(id)?;
        let action = parent.value().take_best_unexplored()?;
        let child = SearchNode::child_of(rules, parent.value(), action);
        Some(parent.append(child).id())
    }

    /// Picks the child to descend into: forced moves first, then unvisited children, then UCB.
    fn best_child(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.tree.get(id)?;

        if let Some(forced) = parent.children().find(|child| {
            let child = child.value();
            child.is_terminal || child.opponent_would_win
        }) {
            return Some(forced.id());
        }
        if let Some(fresh) = parent.children().find(|child| child.value().visits == 0) {
            return Some(fresh.id());
        }

        let parent_data = parent.value();
        let mut best_child = None;
        let mut best_score = f64::NEG_INFINITY;
        for child in parent.children() {
            let data = child.value();
            let heuristic = data
                .action
                .map_or(0.0, |action| parent_data.heuristic_score(action));
            let score = ucb_value(
                parent_data.visits,
                data.wins,
                data.visits,
                heuristic,
                self.config.exploration,
            );
            if score > best_score {
                best_score = score;
                best_child = Some(child.id());
            }
        }
        best_child
    }

    /// Returns the root's child on the path to `selected` if it wins or blocks a win outright.
    fn forced_reply(&self, selected: NodeId) -> Option<NodeId> {
        let mut current = self.tree.get(selected)?;
        loop {
            let parent = current.parent()?;
            if parent.id() == self.root_id {
                break;
            }
            current = parent;
        }

        let data = current.value();
        (data.is_terminal || data.opponent_would_win).then(|| current.id())
    }

    /// Credits `reward` to every node from `selected` up to the root.
    fn backpropagate(&mut self, selected: NodeId, reward: Reward) {
        let mut current = Some(selected);
        while let Some(id) = current {
            current = self
                .tree
                .get(id)
                .and_then(|node| node.parent())
                .map(|parent| parent.id());

            let Some(mut node) = self.tree.get_mut(id) else {
                break;
            };
            let data = node.value();
            data.visits += 1;
            if reward == Reward::Draw {
                data.wins += DRAW_CREDIT;
            }
            // Wins are stored for the player who moved into the node.
            if reward.winner() != Some(data.player) {
                data.wins += 1.0;
            }
        }
    }
}

/// Plays uniformly random moves from `state`, alternating movers, until someone wins or the
/// board is full. Each step fills one empty cell, so the loop ends after at most that many steps.
pub fn rollout<R: Rules, K: RandomGenerator>(
    rules: &R,
    mut state: BoardState,
    mut mover: Player,
    random: &mut K,
) -> Reward {
    loop {
        let moves = rules.valid_moves(&state);
        let Some(&action) = random.choose(&moves) else {
            return Reward::Draw;
        };
        state.set(action, mover.into());
        if rules.check_win(&state, action, mover).is_some() {
            return Reward::Win(mover);
        }
        mover = mover.opponent();
    }
}

/// Calculates the UCB1 value of a child, biased by the parent's heuristic score for its action.
///
/// The heuristic term decays as the child accumulates visits.
pub fn ucb_value(
    parent_visits: u32,
    node_wins: f64,
    node_visits: u32,
    heuristic: f64,
    exploration: f64,
) -> f64 {
    let visits = if node_visits == 0 {
        UNVISITED_PLACEHOLDER
    } else {
        node_visits as f64
    };

    let exploitation = node_wins / visits;
    let exploration = exploration * f64::sqrt(f64::ln(parent_visits as f64) / visits);
    let heuristic_bias = heuristic / visits;
    exploitation + exploration + heuristic_bias
}
