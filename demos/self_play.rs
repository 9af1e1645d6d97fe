extern crate havannah_mcts;

use havannah_mcts::agent::HavannahAgent;
use havannah_mcts::board::{Player, Rules};
use havannah_mcts::boards::havannah::HavannahRules;
use havannah_mcts::config::SearchConfig;
use havannah_mcts::random::SeededRandomGenerator;
use std::time::Duration;

fn main() {
    // A hexagon with four cells per side
    let rules = HavannahRules::with_side(4).expect("side 4 is a valid board");
    let mut board = rules.empty_board();

    // Two agents with a small budget so the whole game finishes quickly
    let config = SearchConfig::default()
        .with_iteration_limit(100)
        .with_time_limit(Duration::from_secs(2));
    let mut agents = [
        HavannahAgent::with_random_generator(Player::One, rules.clone(), SeededRandomGenerator::new(1))
            .with_config(config.clone()),
        HavannahAgent::with_random_generator(Player::Two, rules.clone(), SeededRandomGenerator::new(2))
            .with_config(config),
    ];

    // Alternate turns until someone wins or the board is full
    let mut turn = 0;
    loop {
        let agent = &mut agents[turn % 2];
        let player = agent.player();
        let action = match agent.decide(&board) {
            Ok(action) => action,
            Err(err) => {
                println!("No move for {:?}: {}", player, err);
                break;
            }
        };

        board = board.with_move(action, player);
        println!("Move {}: {:?} plays {:?}", turn + 1, player, action);

        if let Some(kind) = rules.check_win(&board, action, player) {
            println!("{}", board);
            println!("{:?} wins with a {:?}", player, kind);
            return;
        }
        turn += 1;
    }

    println!("{}", board);
    println!("The game is a draw");
}
