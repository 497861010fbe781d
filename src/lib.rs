use std::time::Instant;

use crate::board::Board;
use crate::error::Result;

pub mod board;
pub mod castling;
pub mod document;
pub mod error;
pub mod move_generator;
pub mod movelist;
pub mod options;
pub mod pgn;
pub mod piece;
pub mod r#move;
pub mod reconstruct;
pub mod rules;
pub mod san;
pub mod session;
pub mod shell;
pub mod square;
pub mod square_set;
pub mod timer;
pub mod tracker;
pub mod tree;

pub use error::Error;
pub use tracker::{Outcome, Status, Tracker};
pub use tree::{GameTree, Path, PathToken};

/// Counts the leaves of the plain-rules move tree, depth by depth, and
/// prints them. Used to check move generation against known figures.
pub fn perft(depth: u32, fen: Option<String>) -> Result<()> {
    println!("perft");
    let board = Board::from_fen(fen.as_deref().unwrap_or(Board::STARTING_FEN))?;
    println!("{}\n", board);
    println!("depth nodes\n--------");
    for d in 0..depth + 1 {
        let start = Instant::now();
        let nodes = count_leaves(&board, d);
        let elapsed = start.elapsed();
        println!(
            "{}     {} ({}s, {} nps)",
            d,
            nodes,
            elapsed.as_secs_f32(),
            nodes as f32 / elapsed.as_secs_f32()
        );
    }
    Ok(())
}

pub fn count_leaves(board: &Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = board.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|mv| {
            let mut next = board.clone();
            next.play(*mv);
            count_leaves(&next, depth - 1)
        })
        .sum()
}
