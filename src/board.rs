use crate::castling::CastlingRights;
use crate::error::{Error, Result};
use crate::move_generator::generate;
use crate::movelist::MoveList;
use crate::piece::{Color, Piece, PieceType};
use crate::r#move::{Move, MoveFlags};
use crate::square::{parse_square, square_name, Square};
use crate::square_set::SquareSet;
use std::fmt::{Display, Formatter};

// Sets are indexed by color and piece type, with a redundant
// color occupancy set at index 6.
const OCCUPANCY: usize = 6;

/// Full chess position. Boards are cloned rather than unmade, every
/// game tree node keeps its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    sets: [[SquareSet; 7]; 2],
    pieces: [Option<Piece>; 64],
    side_to_move: Color,
    castling_rights: CastlingRights,
    ep_target: Option<Square>,
    halfmoves: u32,
    fullmoves: u32,
}

impl Board {
    pub const STARTING_FEN: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn empty() -> Board {
        Board {
            sets: [[SquareSet::EMPTY; 7]; 2],
            pieces: [None; 64],
            side_to_move: Color::White,
            castling_rights: CastlingRights::none(),
            ep_target: None,
            halfmoves: 0,
            fullmoves: 1,
        }
    }

    /// Creates a new board given its FEN representation. Only the piece
    /// placement is mandatory, missing fields read as `w - - 0 1`.
    pub fn from_fen(fen: &str) -> Result<Board> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or_else(|| Error::InvalidFen("empty string".to_string()))?;
        let mut board = Board::empty();
        board.set_placement(placement)?;

        board.side_to_move = match fields.next().unwrap_or("w") {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(Error::InvalidFen(format!("unknown side to move '{}'", other))),
        };
        board.castling_rights = CastlingRights::from_fen(fields.next().unwrap_or("-"));
        board.ep_target = match fields.next().unwrap_or("-") {
            "-" => None,
            sq => Some(
                parse_square(sq)
                    .filter(|target| board.is_en_passant_target(*target))
                    .ok_or_else(|| Error::InvalidFen(format!("bad en passant square '{}'", sq)))?,
            ),
        };
        board.halfmoves = Self::parse_counter(fields.next(), 0)?;
        board.fullmoves = Self::parse_counter(fields.next(), 1)?.max(1);
        if fields.next().is_some() {
            return Err(Error::InvalidFen("trailing fields".to_string()));
        }
        board.sanitize_castling_rights();
        Ok(board)
    }

    // The square behind a pawn of the other side that just pushed two steps
    fn is_en_passant_target(&self, target: Square) -> bool {
        let (rank, pushed) = match self.side_to_move {
            Color::White => (5, target.wrapping_sub(8)),
            Color::Black => (2, target + 8),
        };
        target / 8 == rank
            && self.piece_on(target).is_none()
            && self.piece_on(pushed) == Some(Piece::new(PieceType::Pawn, self.side_to_move.opposite()))
    }

    fn parse_counter(field: Option<&str>, default: u32) -> Result<u32> {
        match field {
            None => Ok(default),
            Some(s) => s.parse::<u32>().map_err(|_| Error::InvalidFen(format!("bad move counter '{}'", s))),
        }
    }

    fn set_placement(&mut self, placement: &str) -> Result<()> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(Error::InvalidFen(format!("expected 8 ranks, found {}", ranks.len())));
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                    continue;
                }
                let piece = Piece::from_char(c).ok_or_else(|| Error::InvalidFen(format!("unknown piece '{}'", c)))?;
                if file > 7 {
                    return Err(Error::InvalidFen(format!("rank {} overflows", rank + 1)));
                }
                self.add_piece(piece, rank * 8 + file);
                file += 1;
            }
            if file != 8 {
                return Err(Error::InvalidFen(format!("rank {} has {} files", rank + 1, file)));
            }
        }
        Ok(())
    }

    // Rights only survive when king and rook still stand on their home squares
    fn sanitize_castling_rights(&mut self) {
        for color in [Color::White, Color::Black] {
            let home = if color == Color::White { 0 } else { 56 };
            let king = Some(Piece::new(PieceType::King, color));
            let rook = Some(Piece::new(PieceType::Rook, color));
            if self.pieces[home + 4] != king {
                self.castling_rights.uncastle(color);
            }
            if self.pieces[home + 7] != rook {
                self.castling_rights.uncastle_kingside(color);
            }
            if self.pieces[home] != rook {
                self.castling_rights.uncastle_queenside(color);
            }
        }
    }

    /// Plays a move on the board.
    /// The move is expected to come from `legal_moves`; anything else
    /// leaves the position in an unspecified state.
    pub fn play(&mut self, mv: Move) {
        if mv.is_null() {
            self.pass();
            return;
        }
        let (origin, target) = (mv.origin(), mv.target());
        let side = self.side_to_move;
        let Some(moved) = self.remove_piece(origin) else {
            debug_assert!(false, "no piece on {} for {}", origin, mv);
            return;
        };
        let captured = self.remove_piece(target);

        if moved.piece_type == PieceType::Pawn || captured.is_some() {
            self.halfmoves = 0;
        } else {
            self.halfmoves += 1;
        }
        if moved.piece_type == PieceType::King {
            self.castling_rights.uncastle(side);
        }
        self.castling_rights.touch(origin);
        self.castling_rights.touch(target);
        self.ep_target = None;

        let mut placed = moved;
        match mv.flags() {
            MoveFlags::DoublePush => self.ep_target = Some((origin + target) / 2),
            MoveFlags::EnPassant => {
                self.remove_piece(if side == Color::White { target - 8 } else { target + 8 });
                self.halfmoves = 0;
            }
            MoveFlags::Promotion(p) | MoveFlags::PromotionCapture(p) => placed = Piece::new(p, side),
            MoveFlags::KingSideCastle => self.move_piece(target + 1, target - 1),
            MoveFlags::QueenSideCastle => self.move_piece(target - 2, target + 1),
            _ => (),
        }
        self.add_piece(placed, target);

        if side == Color::Black {
            self.fullmoves += 1;
        }
        self.side_to_move = side.opposite();
    }

    /// The side to move passes its turn, only the counters advance
    pub fn pass(&mut self) {
        self.ep_target = None;
        self.halfmoves += 1;
        if self.side_to_move == Color::Black {
            self.fullmoves += 1;
        }
        self.side_to_move = self.side_to_move.opposite();
    }

    fn move_piece(&mut self, from: Square, to: Square) {
        if let Some(piece) = self.remove_piece(from) {
            self.add_piece(piece, to)
        }
    }

    /// Places a new piece on a given square, replacing whatever stood there
    pub fn add_piece(&mut self, piece: Piece, sq: Square) {
        self.remove_piece(sq);
        self.pieces[sq] = Some(piece);
        let sets = &mut self.sets[piece.color as usize];
        sets[piece.piece_type as usize] = sets[piece.piece_type as usize].with(sq);
        sets[OCCUPANCY] = sets[OCCUPANCY].with(sq);
    }

    /// Clears the given square, returning the piece that has been removed if any
    pub fn remove_piece(&mut self, sq: Square) -> Option<Piece> {
        let removed = self.pieces[sq].take();
        if let Some(p) = removed {
            let sets = &mut self.sets[p.color as usize];
            sets[p.piece_type as usize] = sets[p.piece_type as usize].without(sq);
            sets[OCCUPANCY] = sets[OCCUPANCY].without(sq);
        }
        removed
    }

    /*
    INTERESTING GETTERS
     */
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }
    pub fn side_to_move_castling_rights(&self) -> (bool, bool) {
        self.castling_rights.get(self.side_to_move)
    }
    pub fn en_passant_target(&self) -> Option<Square> {
        self.ep_target
    }
    /// Half-moves since the last capture or pawn move
    pub fn halfmoves(&self) -> u32 {
        self.halfmoves
    }
    pub fn fullmoves(&self) -> u32 {
        self.fullmoves
    }

    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.pieces[sq]
    }
    pub fn piece_type_on(&self, sq: Square) -> Option<PieceType> {
        self.pieces[sq].map(|p| p.piece_type)
    }

    pub fn pieces(&self, piece_type: PieceType, color: Color) -> SquareSet {
        self.sets[color as usize][piece_type as usize]
    }
    pub fn color_set(&self, color: Color) -> SquareSet {
        self.sets[color as usize][OCCUPANCY]
    }
    pub fn occupancy(&self) -> SquareSet {
        self.sets[0][OCCUPANCY] | self.sets[1][OCCUPANCY]
    }
    pub fn diagonal_sliders(&self, color: Color) -> SquareSet {
        self.pieces(PieceType::Bishop, color) | self.pieces(PieceType::Queen, color)
    }
    pub fn cardinal_sliders(&self, color: Color) -> SquareSet {
        self.pieces(PieceType::Rook, color) | self.pieces(PieceType::Queen, color)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(PieceType::King, color).first()
    }

    /// A side without a king is never in check
    pub fn in_check(&self, side: Color) -> bool {
        match self.king_square(side) {
            Some(sq) => self.attackers(sq, side.opposite()).non_empty(),
            None => false,
        }
    }

    /// Every piece of `attacking_color` hitting `target`, kings included
    pub fn attackers(&self, target: Square, attacking_color: Color) -> SquareSet {
        self.attackers_with(target, attacking_color, self.occupancy())
    }

    /// Same as `attackers`, sliders looking through anything missing from `occupancy`
    pub fn attackers_with(&self, target: Square, attacking_color: Color, occupancy: SquareSet) -> SquareSet {
        let pawns = SquareSet::pawn_attacks(SquareSet::from_square(target), attacking_color.opposite())
            & self.pieces(PieceType::Pawn, attacking_color);
        let knights = SquareSet::KNIGHT_ATTACKS[target] & self.pieces(PieceType::Knight, attacking_color);
        let kings = SquareSet::KING_STEPS[target] & self.pieces(PieceType::King, attacking_color);
        let diagonals = SquareSet::bishop_attacks(target, occupancy) & self.diagonal_sliders(attacking_color);
        let cardinals = SquareSet::rook_attacks(target, occupancy) & self.cardinal_sliders(attacking_color);
        pawns | knights | kings | diagonals | cardinals
    }

    /// Every square attacked by `attacking_color`. With `ignore_king`,
    /// sliders see through the defending king so it cannot hide behind itself.
    pub fn attack_map(&self, attacking_color: Color, ignore_king: bool) -> SquareSet {
        let mut occupancy = self.occupancy();
        if ignore_king {
            occupancy = occupancy - self.pieces(PieceType::King, attacking_color.opposite());
        }
        let mut attacks = SquareSet::pawn_attacks(self.pieces(PieceType::Pawn, attacking_color), attacking_color);
        for sq in self.pieces(PieceType::Knight, attacking_color) {
            attacks = attacks | SquareSet::KNIGHT_ATTACKS[sq];
        }
        for sq in self.pieces(PieceType::King, attacking_color) {
            attacks = attacks | SquareSet::KING_STEPS[sq];
        }
        for sq in self.diagonal_sliders(attacking_color) {
            attacks = attacks | SquareSet::bishop_attacks(sq, occupancy);
        }
        for sq in self.cardinal_sliders(attacking_color) {
            attacks = attacks | SquareSet::rook_attacks(sq, occupancy);
        }
        attacks
    }

    /// Generates two distinct sets: (pinned pieces, pinning pieces).
    pub fn pins(&self, relative_to: Square) -> (SquareSet, SquareSet) {
        let mut pinners = SquareSet::EMPTY;
        let mut pinned = SquareSet::EMPTY;

        let occupancy = self.occupancy();
        let friendly = self.color_set(self.side_to_move);
        let attacking_side = self.side_to_move.opposite();

        let candidates = (SquareSet::xray_bishop_attacks(relative_to, occupancy, friendly)
            & self.diagonal_sliders(attacking_side))
            | (SquareSet::xray_rook_attacks(relative_to, occupancy, friendly) & self.cardinal_sliders(attacking_side));
        for pinner in candidates {
            let pinned_piece = SquareSet::ray(relative_to, pinner) & friendly;
            if pinned_piece.non_empty() {
                pinned = pinned | pinned_piece;
                pinners = pinners.with(pinner);
            }
        }
        (pinned, pinners)
    }

    pub fn legal_moves(&self) -> MoveList {
        generate(self)
    }

    /// Finds the legal move matching a long algebraic move
    pub fn find_move(&self, origin: Square, target: Square, promotion: Option<PieceType>) -> Option<Move> {
        self.legal_moves()
            .iter()
            .find(|m| m.origin() == origin && m.target() == target && m.promotion_target() == promotion)
            .copied()
    }

    /*
    FEN STRING OPERATIONS
     */
    pub fn board_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty_counter = 0;
            for file in 0..8 {
                match self.pieces[rank * 8 + file] {
                    Some(p) => {
                        if empty_counter != 0 {
                            fen.push_str(&empty_counter.to_string());
                            empty_counter = 0;
                        }
                        fen.push_str(&p.to_string());
                    }
                    None => empty_counter += 1,
                }
            }
            if empty_counter != 0 {
                fen.push_str(&empty_counter.to_string());
            }
            if rank != 0 {
                fen.push('/');
            }
        }
        fen
    }

    pub fn fen(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.board_fen(),
            self.side_to_move,
            self.castling_rights,
            self.ep_target.and_then(square_name).unwrap_or_else(|| "-".to_string()),
            self.halfmoves,
            self.fullmoves
        )
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::empty()
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                match self.pieces[rank * 8 + file] {
                    Some(p) => write!(f, " {}", p)?,
                    None => write!(f, " .")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        write!(f, "fen: {}", self.fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fen_round_trips() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        assert_eq!(Board::from_fen(fen).unwrap().fen(), fen);
    }

    #[test]
    fn board_only_fen_gets_defaults() {
        let board = Board::from_fen("8/8/8/8/8/8/8/4K2R").unwrap();
        assert_eq!(board.fen(), "8/8/8/8/8/8/8/4K2R w - - 0 1");
    }

    #[test]
    fn malformed_fen_is_an_error() {
        assert!(matches!(Board::from_fen("8/8/8/8/8/8/8"), Err(Error::InvalidFen(_))));
        assert!(matches!(Board::from_fen("9/8/8/8/8/8/8/8"), Err(Error::InvalidFen(_))));
        assert!(matches!(Board::from_fen("8/8/8/8/8/8/8/7X w"), Err(Error::InvalidFen(_))));
        assert!(matches!(Board::from_fen("8/8/8/8/8/8/8/8 x"), Err(Error::InvalidFen(_))));
        assert!(matches!(Board::from_fen(""), Err(Error::InvalidFen(_))));
    }

    #[test]
    fn en_passant_square_must_follow_a_double_push() {
        assert!(matches!(Board::from_fen("8/8/8/8/8/8/8/K7 w - a1 0 1"), Err(Error::InvalidFen(_))));
        assert!(matches!(Board::from_fen("8/8/8/8/8/8/8/K7 w - e6 0 1"), Err(Error::InvalidFen(_))));
        assert!(matches!(Board::from_fen("8/8/8/8/4P3/8/8/K7 b - e6 0 1"), Err(Error::InvalidFen(_))));
        let board = Board::from_fen("8/8/8/3pP3/8/8/8/K7 w - d6 0 1").unwrap();
        assert_eq!(board.en_passant_target(), parse_square("d6"));
        let board = Board::from_fen("8/8/8/8/4P3/8/8/K7 b - e3 0 1").unwrap();
        assert_eq!(board.fen(), "8/8/8/8/4P3/8/8/K7 b - e3 0 1");
    }

    #[test]
    fn castling_rights_need_pieces_at_home() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w KQkq - 0 1").unwrap();
        assert_eq!(board.castling_rights().to_string(), "Q");
    }

    #[test]
    fn pass_flips_turn_and_counts() {
        let mut board = Board::from_fen("8/8/8/8/8/8/8/4K3 b - - 7 12").unwrap();
        board.pass();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.halfmoves(), 8);
        assert_eq!(board.fullmoves(), 13);
    }

    #[test]
    fn castling_moves_the_rook() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let castle = board.find_move(4, 6, None).unwrap();
        board.play(castle);
        assert_eq!(board.board_fen(), "4k3/8/8/8/8/8/8/5RK1");
        assert_eq!(board.castling_rights().to_string(), "-");
    }

    #[test]
    fn attackers_include_the_king() {
        let board = Board::from_fen("8/8/8/8/8/8/1K6/8 w - - 0 1").unwrap();
        assert_eq!(board.attackers(0, Color::White), SquareSet::from_square(9));
        assert!(!board.in_check(Color::Black));
    }
}
