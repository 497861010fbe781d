use crate::piece::{Color, PieceType};
use crate::square::{self, square_name, Square};
use std::fmt::{Display, Formatter};

/// Moves are stored as a 2bytes word, with the following alignment:
/// - 6*2 bits for origin and destination square
/// - 4 bits used for various flags
///
/// The all-zero word (a1 to a1, quiet) never occurs as a real move and
/// stands for a pass.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move(u16);

const DOUBLE_PUSH: u16 = 0b0001;
const KINGSIDE_CASTLE: u16 = 0b0010;
const QUEENSIDE_CASTLE: u16 = 0b0011;
const CAPTURE: u16 = 0b0100;
const EN_PASSANT: u16 = 0b0101;
const PROMOTION: u16 = 0b1000;

impl Move {
    pub const NULL: Move = Move(0);

    fn new(origin: Square, target: Square, flags: u16) -> Move {
        Move(((origin as u16) << 10) | ((target as u16) << 4) | flags)
    }
    pub fn new_quiet(origin: Square, target: Square) -> Move {
        Self::new(origin, target, 0)
    }
    pub fn new_double_push(origin: Square, target: Square) -> Move {
        Self::new(origin, target, DOUBLE_PUSH)
    }
    pub fn new_capture(origin: Square, target: Square) -> Move {
        Self::new(origin, target, CAPTURE)
    }
    pub fn new_en_passant(origin: Square, target: Square) -> Move {
        Self::new(origin, target, EN_PASSANT)
    }
    pub fn new_kingside_castle(color: Color) -> Move {
        let rank_offset = if color == Color::White { 0 } else { 56 };
        Self::new(rank_offset + 4, rank_offset + 6, KINGSIDE_CASTLE)
    }
    pub fn new_queenside_castle(color: Color) -> Move {
        let rank_offset = if color == Color::White { 0 } else { 56 };
        Self::new(rank_offset + 4, rank_offset + 2, QUEENSIDE_CASTLE)
    }
    pub fn new_promotion(origin: Square, target: Square, promote_to: PieceType, capture: bool) -> Move {
        let capture_bit = if capture { CAPTURE } else { 0 };
        Self::new(origin, target, PROMOTION | capture_bit | Self::promotion_bits(promote_to))
    }
    pub fn all_promotions(origin: Square, target: Square, capture: bool) -> [Move; 4] {
        [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen]
            .map(|p| Self::new_promotion(origin, target, p, capture))
    }

    fn promotion_bits(promote_to: PieceType) -> u16 {
        match promote_to {
            PieceType::Knight => 0b00,
            PieceType::Bishop => 0b01,
            PieceType::Rook => 0b10,
            _ => 0b11,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
    pub fn origin(&self) -> Square {
        (self.0 >> 10) as Square
    }
    pub fn target(&self) -> Square {
        ((self.0 >> 4) & 0b111111) as Square
    }
    pub fn flags(&self) -> MoveFlags {
        match self.0 & 0b1111 {
            DOUBLE_PUSH => MoveFlags::DoublePush,
            KINGSIDE_CASTLE => MoveFlags::KingSideCastle,
            QUEENSIDE_CASTLE => MoveFlags::QueenSideCastle,
            CAPTURE => MoveFlags::Capture,
            EN_PASSANT => MoveFlags::EnPassant,
            f if f & PROMOTION != 0 => {
                let piece = match f & 0b11 {
                    0b00 => PieceType::Knight,
                    0b01 => PieceType::Bishop,
                    0b10 => PieceType::Rook,
                    _ => PieceType::Queen,
                };
                if f & CAPTURE != 0 {
                    MoveFlags::PromotionCapture(piece)
                } else {
                    MoveFlags::Promotion(piece)
                }
            }
            _ => MoveFlags::Quiet,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.0 & CAPTURE != 0
    }
    pub fn is_castle(&self) -> bool {
        matches!(self.flags(), MoveFlags::KingSideCastle | MoveFlags::QueenSideCastle)
    }

    pub fn promotion_target(&self) -> Option<PieceType> {
        match self.flags() {
            MoveFlags::Promotion(p) | MoveFlags::PromotionCapture(p) => Some(p),
            _ => None,
        }
    }

    /// Parses a move formatted in long algebraic notation.
    /// Since no information can be given on flags, it simply returns origin, target and potential
    /// piece type to promote to
    pub fn parse(mv: &str) -> Option<(Square, Square, Option<PieceType>)> {
        if !mv.is_ascii() || !(4..=5).contains(&mv.len()) {
            return None;
        }
        let origin = square::parse_square(&mv[0..2])?;
        let target = square::parse_square(&mv[2..4])?;
        let promotion_target = match &mv[4..] {
            "" => None,
            "n" => Some(PieceType::Knight),
            "b" => Some(PieceType::Bishop),
            "r" => Some(PieceType::Rook),
            "q" => Some(PieceType::Queen),
            _ => return None,
        };
        Some((origin, target, promotion_target))
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }
        let o = square_name(self.origin()).unwrap_or_else(|| String::from("**"));
        let t = square_name(self.target()).unwrap_or_else(|| String::from("**"));
        match self.promotion_target() {
            Some(p) => write!(f, "{}{}{}", o, t, p),
            None => write!(f, "{}{}", o, t),
        }
    }
}

impl Default for Move {
    fn default() -> Self {
        Self::NULL
    }
}

pub enum MoveFlags {
    Quiet,
    DoublePush,
    KingSideCastle,
    QueenSideCastle,
    Capture,
    EnPassant,
    Promotion(PieceType),
    PromotionCapture(PieceType),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_keeps_squares_and_flags() {
        let mv = Move::new_promotion(52, 61, PieceType::Rook, true);
        assert_eq!(mv.origin(), 52);
        assert_eq!(mv.target(), 61);
        assert!(mv.is_capture());
        assert_eq!(mv.promotion_target(), Some(PieceType::Rook));
        assert_eq!(mv.to_string(), "e7f8r");
    }

    #[test]
    fn castles_are_king_moves() {
        let mv = Move::new_queenside_castle(Color::Black);
        assert_eq!(mv.to_string(), "e8c8");
        assert!(mv.is_castle());
        assert!(!mv.is_capture());
    }

    #[test]
    fn null_move_is_a_pass() {
        assert!(Move::default().is_null());
        assert_eq!(Move::NULL.to_string(), "0000");
        assert_eq!(Move::parse("0000"), None);
        assert_eq!(Move::parse("g7g8q"), Some((54, 62, Some(PieceType::Queen))));
    }
}
