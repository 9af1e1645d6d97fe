//! A Monte Carlo tree search agent for Havannah.
//!
//! Each turn the agent first looks for a move that wins outright or blocks the opponent's
//! outright win. Otherwise it grows a fresh search tree from the current position. Tree
//! expansion and selection are guided by a connection heuristic that rewards joining groups,
//! reaching corners and edges, answering the opponent's last move locally and keeping
//! two-bridges intact. The most visited reply of the root is played.
//!
//! # Example
//!
//! ```rust
//! use havannah_mcts::agent::HavannahAgent;
//! use havannah_mcts::board::Player;
//! use havannah_mcts::boards::havannah::HavannahRules;
//! use havannah_mcts::config::SearchConfig;
//!
//! // A hexagon with four cells per side, stored in a 7x7 grid
//! let rules = HavannahRules::with_side(4).unwrap();
//! let board = rules.empty_board();
//!
//! // Create an agent with a small search budget
//! let mut agent = HavannahAgent::new(Player::One, rules).with_config(SearchConfig::for_testing());
//!
//! // Pick a move
//! let action = agent.decide(&board).unwrap();
//!
//! println!("The chosen move is: {:?}", action);
//! ```

/// The per-turn `HavannahAgent` facade.
pub mod agent;
/// Board representation and the `Rules` trait the search relies on.
pub mod board;
/// Contains concrete implementations of the `Rules` trait.
pub mod boards;
/// Search budget configuration.
pub mod config;
/// The move-ordering heuristic.
pub mod heuristic;
/// The core module of the library, containing the `MonteCarloTreeSearch` implementation.
pub mod mcts;
/// Contains the `SearchNode` struct, which represents a node in the search tree.
pub mod mcts_node;
/// Contains traits and implementations for random number generation.
pub mod random;
