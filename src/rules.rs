use crate::board::Board;
use crate::error::Result;
use crate::movelist::MoveList;
use crate::piece::{Color, Piece};
use crate::r#move::Move;
use crate::san;
use crate::square::{king_steps, Square};
use crate::square_set::SquareSet;
use std::fmt::Debug;

/// What the candidate tracker needs from a chess position.
///
/// Positions are values: the tracker clones one per game tree node and
/// never shares them.
pub trait Rules: Clone + Debug {
    fn from_fen(fen: &str) -> Result<Self>
    where
        Self: Sized;

    fn turn(&self) -> Color;
    fn halfmoves(&self) -> u32;
    fn fullmoves(&self) -> u32;

    fn piece_at(&self, sq: Square) -> Option<Piece>;
    fn pieces_of(&self, color: Color) -> SquareSet;
    fn king_of(&self, color: Color) -> Option<Square>;
    fn remove_piece(&mut self, sq: Square) -> Option<Piece>;

    /// Pieces of `by` attacking `sq`, kings included, sliders only blocked
    /// by squares of `occupancy`
    fn attackers(&self, sq: Square, by: Color, occupancy: SquareSet) -> SquareSet;

    /// The square is attacked by none of `by`'s pieces, looking only at
    /// `by`'s own pieces as blockers
    fn is_safe_from(&self, sq: Square, by: Color) -> bool {
        self.attackers(sq, by, self.pieces_of(by)).is_empty()
    }

    fn king_step_targets(&self, sq: Square) -> SquareSet {
        king_steps(sq)
    }

    fn legal_moves(&self) -> MoveList;
    fn play(&mut self, mv: Move);
    fn pass(&mut self);

    fn san(&self, mv: Move) -> String;
    fn parse_san(&self, text: &str) -> Option<Move>;

    /// Full FEN with `extra` pieces dropped on the board
    fn fen_with(&self, extra: &[(Square, Piece)]) -> String;
    /// Piece placement only, with `extra` pieces dropped on the board
    fn board_fen_with(&self, extra: &[(Square, Piece)]) -> String;
}

impl Board {
    fn with_extra(&self, extra: &[(Square, Piece)]) -> Board {
        let mut board = self.clone();
        for (sq, piece) in extra {
            board.add_piece(*piece, *sq);
        }
        board
    }
}

impl Rules for Board {
    fn from_fen(fen: &str) -> Result<Self> {
        Board::from_fen(fen)
    }

    fn turn(&self) -> Color {
        self.side_to_move()
    }
    fn halfmoves(&self) -> u32 {
        Board::halfmoves(self)
    }
    fn fullmoves(&self) -> u32 {
        Board::fullmoves(self)
    }

    fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.piece_on(sq)
    }
    fn pieces_of(&self, color: Color) -> SquareSet {
        self.color_set(color)
    }
    fn king_of(&self, color: Color) -> Option<Square> {
        self.king_square(color)
    }
    fn remove_piece(&mut self, sq: Square) -> Option<Piece> {
        Board::remove_piece(self, sq)
    }

    fn attackers(&self, sq: Square, by: Color, occupancy: SquareSet) -> SquareSet {
        self.attackers_with(sq, by, occupancy)
    }

    fn legal_moves(&self) -> MoveList {
        Board::legal_moves(self)
    }
    fn play(&mut self, mv: Move) {
        Board::play(self, mv)
    }
    fn pass(&mut self) {
        Board::pass(self)
    }

    fn san(&self, mv: Move) -> String {
        san::san(self, mv)
    }
    fn parse_san(&self, text: &str) -> Option<Move> {
        san::parse_san(self, text)
    }

    fn fen_with(&self, extra: &[(Square, Piece)]) -> String {
        self.with_extra(extra).fen()
    }
    fn board_fen_with(&self, extra: &[(Square, Piece)]) -> String {
        self.with_extra(extra).board_fen()
    }
}
