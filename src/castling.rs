use crate::piece::Color;
use std::fmt::{Display, Formatter};

/// Castling rights as four bits: white kingside, white queenside, black kingside, black queenside
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    const WHITE_KINGSIDE: u8 = 0b1000;
    const WHITE_QUEENSIDE: u8 = 0b0100;
    const BLACK_KINGSIDE: u8 = 0b0010;
    const BLACK_QUEENSIDE: u8 = 0b0001;

    pub fn none() -> CastlingRights {
        CastlingRights(0)
    }

    /// Reads the FEN castling field, `-` and unknown letters granting nothing
    pub fn from_fen(s: &str) -> CastlingRights {
        let mut res = CastlingRights(0);
        for c in s.chars() {
            res.0 |= match c {
                'K' => Self::WHITE_KINGSIDE,
                'Q' => Self::WHITE_QUEENSIDE,
                'k' => Self::BLACK_KINGSIDE,
                'q' => Self::BLACK_QUEENSIDE,
                _ => 0,
            }
        }
        res
    }

    /// Returns the (kingside, queenside) rights of a given color
    pub fn get(&self, side: Color) -> (bool, bool) {
        let (king, queen) = Self::bits(side);
        (self.0 & king != 0, self.0 & queen != 0)
    }

    /// Marks the given side as unable to castle
    pub fn uncastle(&mut self, side: Color) {
        let (king, queen) = Self::bits(side);
        self.0 &= !(king | queen)
    }
    pub fn uncastle_kingside(&mut self, side: Color) {
        self.0 &= !Self::bits(side).0
    }
    pub fn uncastle_queenside(&mut self, side: Color) {
        self.0 &= !Self::bits(side).1
    }

    /// Drops the rights a rook leaving or being captured on `sq` would lose
    pub fn touch(&mut self, sq: usize) {
        match sq {
            0 => self.uncastle_queenside(Color::White),
            7 => self.uncastle_kingside(Color::White),
            56 => self.uncastle_queenside(Color::Black),
            63 => self.uncastle_kingside(Color::Black),
            _ => (),
        }
    }

    fn bits(side: Color) -> (u8, u8) {
        match side {
            Color::White => (Self::WHITE_KINGSIDE, Self::WHITE_QUEENSIDE),
            Color::Black => (Self::BLACK_KINGSIDE, Self::BLACK_QUEENSIDE),
        }
    }
}

impl Display for CastlingRights {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0 == 0 {
            return write!(f, "-");
        }
        let (wking, wqueen) = self.get(Color::White);
        let (bking, bqueen) = self.get(Color::Black);
        write!(
            f,
            "{}{}{}{}",
            if wking { "K" } else { "" },
            if wqueen { "Q" } else { "" },
            if bking { "k" } else { "" },
            if bqueen { "q" } else { "" }
        )
    }
}
