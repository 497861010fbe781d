use crate::square_set::SquareSet;

/// Board cells are indexed from a1 (0) to h8 (63), rank by rank.
pub type Square = usize;

pub fn rank_of(sq: Square) -> usize {
    sq / 8
}
pub fn file_of(sq: Square) -> usize {
    sq % 8
}
pub fn square_at(file: usize, rank: usize) -> Square {
    rank * 8 + file
}

/// Parses a square from a given string slice,
/// only caring that the first two characters form a valid square representation
/// ```
/// use invisible_king::square::parse_square;
/// assert_eq!(parse_square("e4"), Some(28));
/// assert_eq!(parse_square("d2someotherstuff"), Some(11));
/// assert_eq!(parse_square("randoma1stuff"), None);
/// assert_eq!(parse_square("k9"), None);
/// ```
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = match chars.next()? {
        c @ 'a'..='h' => c as usize - 'a' as usize,
        _ => return None,
    };
    let rank = match chars.next()?.to_digit(10) {
        Some(r) if (1..=8).contains(&r) => r as usize - 1,
        _ => return None,
    };
    Some(square_at(file, rank))
}

/// Returns the string representation of a square
/// ```
/// use invisible_king::square::square_name;
/// assert_eq!(square_name(28), Some(String::from("e4")));
/// assert_eq!(square_name(11), Some(String::from("d2")));
/// assert_eq!(square_name(65), None);
/// ```
pub fn square_name(sq: Square) -> Option<String> {
    if !is_valid(sq) {
        return None;
    }
    let file = (b'a' + file_of(sq) as u8) as char;
    let rank = (b'1' + rank_of(sq) as u8) as char;
    Some([file, rank].iter().collect())
}

/// Checks whether a given square is in bounds (0..64) or not
/// ```
/// use invisible_king::square::is_valid;
/// assert!(is_valid(12));
/// assert!(!is_valid(64));
/// ```
pub fn is_valid(sq: Square) -> bool {
    sq < 64
}

/// The squares one king step away from `sq`
/// ```
/// use invisible_king::square::{king_steps, parse_square};
/// let corner = king_steps(parse_square("a1").unwrap());
/// assert_eq!(corner.len(), 3);
/// ```
pub fn king_steps(sq: Square) -> SquareSet {
    SquareSet::KING_STEPS[sq]
}
