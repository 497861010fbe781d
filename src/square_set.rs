use crate::piece::Color;
use crate::square::Square;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not, Sub};

// Build script to calculate lookup tables at compile time
include!(concat!(env!("OUT_DIR"), "/lookup.rs"));

/// A set of squares packed in a 64 bit word.
///
/// Every operation returns a new value, so a set can be handed to several
/// positions without any of them observing the others' changes.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct SquareSet(pub u64);

impl SquareSet {
    pub const EMPTY: SquareSet = SquareSet(0);
    pub const FILES: [SquareSet; 8] = [
        SquareSet(0x0101010101010101),
        SquareSet(0x0202020202020202),
        SquareSet(0x0404040404040404),
        SquareSet(0x0808080808080808),
        SquareSet(0x1010101010101010),
        SquareSet(0x2020202020202020),
        SquareSet(0x4040404040404040),
        SquareSet(0x8080808080808080),
    ];
    pub const RANKS: [SquareSet; 8] = [
        SquareSet(0x00000000000000ff),
        SquareSet(0x000000000000ff00),
        SquareSet(0x0000000000ff0000),
        SquareSet(0x00000000ff000000),
        SquareSet(0x000000ff00000000),
        SquareSet(0x0000ff0000000000),
        SquareSet(0x00ff000000000000),
        SquareSet(0xff00000000000000),
    ];
    // Indexed by color then (kingside, queenside)
    pub const CASTLING_PATH: [[SquareSet; 2]; 2] = [
        [SquareSet(0x6000000000000000), SquareSet(0x0e00000000000000)],
        [SquareSet(0x60), SquareSet(0x0e)],
    ];
    pub const CASTLING_SAFE: [[SquareSet; 2]; 2] = [
        [SquareSet(0x6000000000000000), SquareSet(0x0c00000000000000)],
        [SquareSet(0x60), SquareSet(0x0c)],
    ];

    pub fn from_square(sq: Square) -> SquareSet {
        SquareSet(1u64 << sq)
    }

    pub fn union(self, other: SquareSet) -> SquareSet {
        SquareSet(self.0 | other.0)
    }
    pub fn intersect(self, other: SquareSet) -> SquareSet {
        SquareSet(self.0 & other.0)
    }
    pub fn diff(self, other: SquareSet) -> SquareSet {
        SquareSet(self.0 & !other.0)
    }
    pub fn with(self, sq: Square) -> SquareSet {
        SquareSet(self.0 | (1u64 << sq))
    }
    pub fn without(self, sq: Square) -> SquareSet {
        SquareSet(self.0 & !(1u64 << sq))
    }

    #[inline(always)]
    pub fn has(&self, sq: Square) -> bool {
        self.0 & (1u64 << sq) != 0
    }
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
    #[inline(always)]
    pub fn non_empty(&self) -> bool {
        self.0 != 0
    }
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
    /// Lowest square of the set
    #[inline(always)]
    pub fn first(&self) -> Option<Square> {
        if self.is_empty() {
            None
        } else {
            Some(self.0.trailing_zeros() as Square)
        }
    }
    /// Highest square of the set
    pub fn last(&self) -> Option<Square> {
        if self.is_empty() {
            None
        } else {
            Some(63 - self.0.leading_zeros() as Square)
        }
    }

    /// Squares in ascending order
    pub fn iter(&self) -> SquareSetIter {
        SquareSetIter(self.0)
    }

    /*
    SHIFTS
     */
    fn north(self) -> SquareSet {
        SquareSet(self.0 << 8)
    }
    fn south(self) -> SquareSet {
        SquareSet(self.0 >> 8)
    }
    fn north_west(self) -> SquareSet {
        SquareSet(self.0 << 7).diff(Self::FILES[7])
    }
    fn north_east(self) -> SquareSet {
        SquareSet(self.0 << 9).diff(Self::FILES[0])
    }
    fn south_west(self) -> SquareSet {
        SquareSet(self.0 >> 9).diff(Self::FILES[7])
    }
    fn south_east(self) -> SquareSet {
        SquareSet(self.0 >> 7).diff(Self::FILES[0])
    }

    /*
    ATTACKS
     */
    pub fn pawn_pushes(pawns: SquareSet, empty: SquareSet, color: Color) -> SquareSet {
        let shifted = match color {
            Color::White => pawns.north(),
            Color::Black => pawns.south(),
        };
        shifted & empty
    }
    pub fn pawn_double_pushes(pawns: SquareSet, empty: SquareSet, color: Color) -> SquareSet {
        let single = Self::pawn_pushes(pawns, empty, color);
        let shifted = match color {
            Color::White => (single & Self::RANKS[2]).north(),
            Color::Black => (single & Self::RANKS[5]).south(),
        };
        shifted & empty
    }
    /// Captures towards the h file
    pub fn pawn_east_attacks(pawns: SquareSet, color: Color) -> SquareSet {
        match color {
            Color::White => pawns.north_east(),
            Color::Black => pawns.south_east(),
        }
    }
    /// Captures towards the a file
    pub fn pawn_west_attacks(pawns: SquareSet, color: Color) -> SquareSet {
        match color {
            Color::White => pawns.north_west(),
            Color::Black => pawns.south_west(),
        }
    }
    pub fn pawn_attacks(pawns: SquareSet, color: Color) -> SquareSet {
        Self::pawn_west_attacks(pawns, color) | Self::pawn_east_attacks(pawns, color)
    }

    #[inline]
    pub fn bishop_attacks(origin: Square, occupancy: SquareSet) -> SquareSet {
        let blockers = occupancy & Self::BISHOP_MASKS[origin];
        let key = blockers.0.wrapping_mul(Self::BISHOP_MAGICS[origin])
            >> (64 - Self::BISHOP_INDEX_BITS[origin]);
        Self::BISHOP_ATTACKS[origin][key as usize]
    }
    #[inline]
    pub fn rook_attacks(origin: Square, occupancy: SquareSet) -> SquareSet {
        let blockers = occupancy & Self::ROOK_MASKS[origin];
        let key = blockers.0.wrapping_mul(Self::ROOK_MAGICS[origin])
            >> (64 - Self::ROOK_INDEX_BITS[origin]);
        Self::ROOK_ATTACKS[origin][key as usize]
    }
    pub fn queen_attacks(origin: Square, occupancy: SquareSet) -> SquareSet {
        Self::bishop_attacks(origin, occupancy) | Self::rook_attacks(origin, occupancy)
    }

    /// Attacks through the first layer of `blockers`, used to find pinners
    pub fn xray_bishop_attacks(origin: Square, occupancy: SquareSet, blockers: SquareSet) -> SquareSet {
        let attacks = Self::bishop_attacks(origin, occupancy);
        let behind = Self::bishop_attacks(origin, occupancy.diff(blockers & attacks));
        SquareSet(attacks.0 ^ behind.0)
    }
    pub fn xray_rook_attacks(origin: Square, occupancy: SquareSet, blockers: SquareSet) -> SquareSet {
        let attacks = Self::rook_attacks(origin, occupancy);
        let behind = Self::rook_attacks(origin, occupancy.diff(blockers & attacks));
        SquareSet(attacks.0 ^ behind.0)
    }

    /// Squares strictly between two aligned squares, plus `target` itself.
    /// Empty when they share no line.
    #[inline]
    pub fn ray(origin: Square, target: Square) -> SquareSet {
        Self::BETWEEN[origin][target]
    }
}

impl fmt::Display for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                let mark = if self.has(rank * 8 + file) { "x" } else { "." };
                write!(f, "{}{}", mark, if file == 7 { "" } else { " " })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().filter_map(crate::square::square_name))
            .finish()
    }
}

/// Pops the lowest square each step
pub struct SquareSetIter(u64);

impl Iterator for SquareSetIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }
        let sq = self.0.trailing_zeros() as Square;
        self.0 &= self.0 - 1;
        Some(sq)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Square> for SquareSet {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        iter.into_iter().fold(SquareSet::EMPTY, SquareSet::with)
    }
}

/*
SET OPERATORS
 */
impl BitAnd for SquareSet {
    type Output = SquareSet;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersect(rhs)
    }
}
impl BitOr for SquareSet {
    type Output = SquareSet;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}
impl Sub for SquareSet {
    type Output = SquareSet;
    fn sub(self, rhs: Self) -> Self::Output {
        self.diff(rhs)
    }
}
impl Not for SquareSet {
    type Output = SquareSet;
    fn not(self) -> Self::Output {
        SquareSet(!self.0)
    }
}
