//! Move-ordering heuristic.
//!
//! The score of a candidate move is a weighted sum of independent sub-scores: how many
//! anchors (corners and edges) the move connects, whether it bridges separate groups, how
//! much of its neighbourhood the mover already owns, how closely it answers the opponent's
//! last move, and whether it restores a two-bridge broken by that move.

use crate::board::{BoardState, Cell, Coord, Direction, Edge, Player, Rules};
use std::collections::{HashMap, HashSet};

const GROUP_WEIGHT: f64 = 2.0;
const LOCALITY_WEIGHT: f64 = 2.0;
const CONNECTIVITY_WEIGHT: f64 = 20.0;
const LOCAL_REPLY_WEIGHT: f64 = 3.0;
const MAINTAIN_VC_WEIGHT: f64 = 100.0;
const THREE_CONNECTOR_BONUS: f64 = 11.0;

const NEIGHBOUR_BONUS: f64 = 3.0;
const VIRTUAL_CONN_BONUS: f64 = 2.0;
const PROTECTED_VIRTUAL_CONN_BONUS: f64 = 5.0;
const NON_VIRTUAL_CONN_BONUS: f64 = 1.0;
const PANIC_THREAT_BONUS: f64 = 300.0;

/// Connectivity credited to an anchor played with no friendly stone next to it.
const ISOLATED_ANCHOR_CREDIT: f64 = 0.4;

/// A structure that counts towards a bridge or a fork.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
enum Anchor {
    Corner(Coord),
    Edge(Edge),
}

/// The cells around a move, split by how many direct neighbours lead to them.
#[derive(Debug, Default)]
pub struct SecondLayer {
    /// Cells adjacent to the move.
    pub neighbours: Vec<Coord>,
    /// Cells reachable through exactly two neighbours (two-bridge points).
    pub virtual_connections: Vec<Coord>,
    /// Cells reachable through exactly one neighbour.
    pub non_virtual_connections: Vec<Coord>,
}

/// Scores candidate moves for a player. Pure: the same inputs always give the same score.
pub struct HeuristicEvaluator<'a, R: Rules> {
    rules: &'a R,
}

impl<'a, R: Rules> HeuristicEvaluator<'a, R> {
    pub fn new(rules: &'a R) -> Self {
        Self { rules }
    }

    /// Returns the composite score of `candidate` for `player`. Higher is better.
    pub fn score(
        &self,
        state: &BoardState,
        candidate: Coord,
        player: Player,
        last_move: Option<Coord>,
    ) -> f64 {
        let (locality, local_reply) = self.locality(state, candidate, player, last_move);
        let (group, connectivity) = self.group_and_connectivity(state, candidate, player);
        let maintain_vc = match last_move {
            Some(last_move) if group > 0.0 => {
                self.maintained_virtual_connections(state, last_move, candidate, player)
            }
            _ => 0.0,
        };
        let three_connector = if self.opens_three_anchors(state, candidate) {
            THREE_CONNECTOR_BONUS
        } else {
            0.0
        };

        group * GROUP_WEIGHT
            + locality * LOCALITY_WEIGHT
            + connectivity * CONNECTIVITY_WEIGHT
            + local_reply * LOCAL_REPLY_WEIGHT
            + maintain_vc * MAINTAIN_VC_WEIGHT
            + three_connector
    }

    /// Classifies the two rings of cells around `candidate`.
    pub fn second_layer(&self, candidate: Coord) -> SecondLayer {
        let neighbours = self.rules.neighbours(candidate).to_vec();

        let mut paths: HashMap<Coord, u32> = HashMap::new();
        let mut order = Vec::new();
        for &neighbour in &neighbours {
            for &cell in self.rules.neighbours(neighbour) {
                if cell == candidate || neighbours.contains(&cell) {
                    continue;
                }
                let count = paths.entry(cell).or_insert(0);
                if *count == 0 {
                    order.push(cell);
                }
                *count += 1;
            }
        }

        let mut layer = SecondLayer {
            neighbours,
            ..SecondLayer::default()
        };
        for cell in order {
            match paths[&cell] {
                1 => layer.non_virtual_connections.push(cell),
                2 => layer.virtual_connections.push(cell),
                _ => {}
            }
        }
        layer
    }

    /// Returns `(locality, local_reply)`.
    fn locality(
        &self,
        state: &BoardState,
        candidate: Coord,
        player: Player,
        last_move: Option<Coord>,
    ) -> (f64, f64) {
        let stone = Cell::from(player);
        let opponent = player.opponent();
        let layer = self.second_layer(candidate);
        let mut locality = 0.0;
        let mut local_reply = 0.0;

        for &cell in &layer.neighbours {
            if state.get(cell) == stone {
                locality += NEIGHBOUR_BONUS;
            }
            if Some(cell) == last_move {
                local_reply += NEIGHBOUR_BONUS;
            }
        }

        for &cell in &layer.virtual_connections {
            let bridging = self.open_bridging_cells(state, cell, &layer.neighbours);
            if state.get(cell) == stone {
                locality += VIRTUAL_CONN_BONUS;
                if bridging.len() == 2 {
                    locality += PROTECTED_VIRTUAL_CONN_BONUS;
                }
            }
            if Some(cell) == last_move {
                local_reply += VIRTUAL_CONN_BONUS;
                if bridging.len() == 2 {
                    local_reply += PROTECTED_VIRTUAL_CONN_BONUS;
                    locality += self.panic_threat(state, cell, &bridging, opponent);
                }
            }
        }

        for &cell in &layer.non_virtual_connections {
            if state.get(cell) == stone {
                locality += NON_VIRTUAL_CONN_BONUS;
            }
            if Some(cell) == last_move {
                local_reply += NON_VIRTUAL_CONN_BONUS;
            }
        }

        (locality, local_reply)
    }

    /// Empty cells adjacent to both `point` and the candidate.
    fn open_bridging_cells(
        &self,
        state: &BoardState,
        point: Coord,
        candidate_neighbours: &[Coord],
    ) -> Vec<Coord> {
        self.rules
            .neighbours(point)
            .iter()
            .copied()
            .filter(|cell| candidate_neighbours.contains(cell) && state.get(*cell) == Cell::Empty)
            .collect()
    }

    /// Bonus for each bridging cell that, filled in turn by the opponent, completes their win.
    fn panic_threat(
        &self,
        state: &BoardState,
        point: Coord,
        bridging: &[Coord],
        opponent: Player,
    ) -> f64 {
        let mut threatened = state.with_move(point, opponent);
        let mut bonus = 0.0;
        for &cell in bridging {
            threatened.set(cell, opponent.into());
            if self.rules.check_win(&threatened, cell, opponent).is_some() {
                bonus += PANIC_THREAT_BONUS;
            }
        }
        bonus
    }

    /// Returns `(group, connectivity)` for the groups `candidate` would merge.
    ///
    /// The group score is the merged size, counted only when the move joins more than one
    /// existing group. Connectivity is the number of distinct anchors the merged group
    /// touches, counted only when the move adds an anchor the first group lacked.
    fn group_and_connectivity(
        &self,
        state: &BoardState,
        candidate: Coord,
        player: Player,
    ) -> (f64, f64) {
        let stone = Cell::from(player);
        let friendly: Vec<Coord> = self
            .rules
            .neighbours(candidate)
            .iter()
            .copied()
            .filter(|&cell| state.get(cell) == stone)
            .collect();

        let mut total_group: HashSet<Coord> = HashSet::new();
        let mut total_anchors: HashSet<Anchor> = HashSet::new();
        let mut group_needed = false;
        let mut connectivity_needed = false;
        let mut connectivity = 0.0;

        for (i, &start) in friendly.iter().enumerate() {
            if total_group.contains(&start) {
                continue;
            }
            let (group, anchors) = self.flood(state, start, stone);
            let group_before = total_group.len();
            let anchors_before = total_anchors.len();
            total_group.extend(group);
            total_anchors.extend(anchors);
            if i > 0 {
                group_needed |= total_group.len() > group_before;
                connectivity_needed |= total_anchors.len() > anchors_before;
            }
        }

        if self.rules.is_corner(candidate) {
            if friendly.is_empty() {
                connectivity_needed = false;
                connectivity = ISOLATED_ANCHOR_CREDIT;
            } else {
                connectivity_needed = true;
                total_anchors.insert(Anchor::Corner(candidate));
            }
        }
        if let Some(edge) = self.rules.edge_of(candidate) {
            if !total_anchors.contains(&Anchor::Edge(edge)) {
                if friendly.is_empty() {
                    connectivity_needed = false;
                    connectivity = ISOLATED_ANCHOR_CREDIT;
                } else {
                    connectivity_needed = true;
                    total_anchors.insert(Anchor::Edge(edge));
                }
            }
        }

        let group = if group_needed {
            total_group.len() as f64
        } else {
            0.0
        };
        if connectivity_needed {
            connectivity = total_anchors.len() as f64;
        }
        (group, connectivity)
    }

    /// Depth-first flood fill over `stone` cells from `start`, collecting the anchors touched.
    fn flood(&self, state: &BoardState, start: Coord, stone: Cell) -> (HashSet<Coord>, HashSet<Anchor>) {
        let mut group = HashSet::new();
        let mut anchors = HashSet::new();
        let mut stack = vec![start];

        while let Some(cell) = stack.pop() {
            if state.get(cell) != stone || !group.insert(cell) {
                continue;
            }
            if self.rules.is_corner(cell) {
                anchors.insert(Anchor::Corner(cell));
            } else if let Some(edge) = self.rules.edge_of(cell) {
                anchors.insert(Anchor::Edge(edge));
            }
            stack.extend(
                self.rules
                    .neighbours(cell)
                    .iter()
                    .copied()
                    .filter(|&next| state.get(next) == stone),
            );
        }

        (group, anchors)
    }

    /// Counts the two-bridges around `last_move` that `candidate` restores.
    ///
    /// For each pair of cells two steps apart around the opponent's last move, playing the
    /// cell between them keeps both connected when the mover owns the pair.
    fn maintained_virtual_connections(
        &self,
        state: &BoardState,
        last_move: Coord,
        candidate: Coord,
        player: Player,
    ) -> f64 {
        let stone = Cell::from(player);
        let sides = Direction::CLOCKWISE;
        let mut score = 0.0;

        for i in 0..sides.len() {
            let middle = self.rules.step(last_move, sides[(i + 1) % sides.len()]);
            if middle != Some(candidate) {
                continue;
            }
            let first = self.rules.step(last_move, sides[i]);
            let second = self.rules.step(last_move, sides[(i + 2) % sides.len()]);
            if let (Some(first), Some(second)) = (first, second) {
                if state.get(first) == stone && state.get(second) == stone {
                    score += 1.0;
                }
            }
        }

        score
    }

    /// `true` when exactly three anchors next to `candidate` are still open.
    fn opens_three_anchors(&self, state: &BoardState, candidate: Coord) -> bool {
        let mut openings = 0;
        let mut edges = Vec::new();
        for &cell in self.rules.neighbours(candidate) {
            if state.get(cell) != Cell::Empty {
                continue;
            }
            if self.rules.is_corner(cell) {
                openings += 1;
            }
            if let Some(edge) = self.rules.edge_of(cell) {
                if !edges.contains(&edge) {
                    edges.push(edge);
                    openings += 1;
                }
            }
        }
        openings == 3
    }
}

#[cfg(test)]
mod tests {
    use crate::board::{Coord, Player, Rules};
    use crate::boards::havannah::HavannahRules;
    use crate::heuristic::HeuristicEvaluator;

    #[test]
    fn score_is_deterministic() {
        let rules = HavannahRules::with_side(4).unwrap();
        let state = rules
            .empty_board()
            .with_move(Coord::new(2, 2), Player::One)
            .with_move(Coord::new(3, 3), Player::Two);
        let evaluator = HeuristicEvaluator::new(&rules);

        for candidate in rules.valid_moves(&state) {
            let first = evaluator.score(&state, candidate, Player::One, Some(Coord::new(3, 3)));
            let second = evaluator.score(&state, candidate, Player::One, Some(Coord::new(3, 3)));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn second_layer_of_centre_cell() {
        let rules = HavannahRules::with_side(4).unwrap();
        let evaluator = HeuristicEvaluator::new(&rules);

        let layer = evaluator.second_layer(Coord::new(3, 3));

        assert_eq!(layer.neighbours.len(), 6);
        assert_eq!(layer.virtual_connections.len(), 6);
        assert_eq!(layer.non_virtual_connections.len(), 6);
        assert!(layer.virtual_connections.contains(&Coord::new(1, 2)));
        assert!(layer.non_virtual_connections.contains(&Coord::new(1, 3)));
    }

    #[test]
    fn isolated_corner_gets_partial_connectivity() {
        let rules = HavannahRules::with_side(4).unwrap();
        let state = rules.empty_board();
        let evaluator = HeuristicEvaluator::new(&rules);

        let (group, connectivity) =
            evaluator.group_and_connectivity(&state, Coord::new(0, 0), Player::One);

        assert_eq!(group, 0.0);
        assert_eq!(connectivity, 0.4);
    }

    #[test]
    fn joining_two_groups_scores_group_and_anchors() {
        let rules = HavannahRules::with_side(4).unwrap();
        // (0,1) and (2,1) are only joined through (1,1).
        let state = rules
            .empty_board()
            .with_move(Coord::new(0, 1), Player::One)
            .with_move(Coord::new(2, 0), Player::One)
            .with_move(Coord::new(2, 1), Player::One);
        let evaluator = HeuristicEvaluator::new(&rules);

        let (group, connectivity) =
            evaluator.group_and_connectivity(&state, Coord::new(1, 1), Player::One);

        assert_eq!(group, 3.0);
        assert_eq!(connectivity, 2.0);
    }

    #[test]
    fn restoring_broken_bridge_dominates() {
        let rules = HavannahRules::with_side(4).unwrap();
        // Player one holds (2,3) and (3,4); player two intrudes at (3,3), leaving (2,4) as
        // the only remaining link between them.
        let state = rules
            .empty_board()
            .with_move(Coord::new(2, 3), Player::One)
            .with_move(Coord::new(3, 4), Player::One)
            .with_move(Coord::new(3, 3), Player::Two);
        let evaluator = HeuristicEvaluator::new(&rules);
        let last_move = Some(Coord::new(3, 3));

        let repair = evaluator.score(&state, Coord::new(2, 4), Player::One, last_move);
        let best_other = rules
            .valid_moves(&state)
            .into_iter()
            .filter(|&cell| cell != Coord::new(2, 4))
            .map(|cell| evaluator.score(&state, cell, Player::One, last_move))
            .fold(f64::MIN, f64::max);

        assert!(repair > best_other);
    }

    #[test]
    fn protected_bridge_earns_extra_locality() {
        let rules = HavannahRules::with_side(4).unwrap();
        let evaluator = HeuristicEvaluator::new(&rules);
        // (1,2) reaches the centre through (2,2) and (2,3).
        let state = rules.empty_board().with_move(Coord::new(1, 2), Player::One);

        let protected = evaluator.locality(&state, Coord::new(3, 3), Player::One, None);
        let intruded = state.with_move(Coord::new(2, 3), Player::Two);
        let broken = evaluator.locality(&intruded, Coord::new(3, 3), Player::One, None);

        assert_eq!(protected, (7.0, 0.0));
        assert_eq!(broken, (2.0, 0.0));
    }

    #[test]
    fn local_reply_depends_on_distance_to_last_move() {
        let rules = HavannahRules::with_side(4).unwrap();
        let evaluator = HeuristicEvaluator::new(&rules);
        let candidate = Coord::new(3, 3);
        let reply_to = |cell: Coord| {
            let state = rules.empty_board().with_move(cell, Player::Two);
            evaluator.locality(&state, candidate, Player::One, Some(cell))
        };

        assert_eq!(reply_to(Coord::new(2, 3)), (0.0, 3.0));
        assert_eq!(reply_to(Coord::new(1, 2)), (0.0, 7.0));
        assert_eq!(reply_to(Coord::new(1, 3)), (0.0, 1.0));
        assert_eq!(reply_to(Coord::new(6, 3)), (0.0, 0.0));

        // With one bridging cell taken the bridge is no longer protected.
        let state = rules
            .empty_board()
            .with_move(Coord::new(1, 2), Player::Two)
            .with_move(Coord::new(2, 2), Player::One);
        assert_eq!(
            evaluator.locality(&state, candidate, Player::One, Some(Coord::new(1, 2))),
            (3.0, 2.0)
        );
    }

    #[test]
    fn panic_threat_when_bridge_completes_opponent_win() {
        let rules = HavannahRules::with_side(4).unwrap();
        let evaluator = HeuristicEvaluator::new(&rules);
        // Filling (0,1) after (1,2) joins corners (0,0) and (0,3) for player two.
        let state = rules
            .empty_board()
            .with_move(Coord::new(0, 0), Player::Two)
            .with_move(Coord::new(0, 3), Player::Two)
            .with_move(Coord::new(0, 2), Player::Two);

        let scores = evaluator.locality(&state, Coord::new(1, 1), Player::One, Some(Coord::new(0, 2)));

        assert_eq!(scores, (300.0, 7.0));
    }

    #[test]
    fn three_open_anchors_earn_connector_bonus() {
        let rules = HavannahRules::with_side(4).unwrap();
        let evaluator = HeuristicEvaluator::new(&rules);
        let state = rules.empty_board();
        let candidate = Coord::new(1, 1);

        assert!(evaluator.opens_three_anchors(&state, candidate));
        assert!(!evaluator.opens_three_anchors(&state, Coord::new(3, 3)));

        // Taking the corner leaves only the two edges open.
        let blocked = state.with_move(Coord::new(0, 0), Player::Two);
        assert!(!evaluator.opens_three_anchors(&blocked, candidate));

        let open = evaluator.score(&state, candidate, Player::One, None);
        let closed = evaluator.score(&blocked, candidate, Player::One, None);
        assert_eq!(open - closed, 11.0);
    }
}
