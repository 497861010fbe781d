use crate::board::Board;
use crate::piece::PieceType;
use crate::r#move::{Move, MoveFlags};
use crate::square::{file_of, parse_square, rank_of, square_name};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SAN_RE: Regex =
        Regex::new(r"^([NBRQK])?([a-h])?([1-8])?(x)?([a-h][1-8])(?:=?([NBRQnbrq]))?$").expect("SAN pattern compiles");
}

/// Standard algebraic notation of a legal move, played from `board`
pub fn san(board: &Board, mv: Move) -> String {
    if mv.is_null() {
        return "--".to_string();
    }
    let mut san = match mv.flags() {
        MoveFlags::KingSideCastle => "O-O".to_string(),
        MoveFlags::QueenSideCastle => "O-O-O".to_string(),
        _ => body(board, mv),
    };

    let mut after = board.clone();
    after.play(mv);
    let opponent = after.side_to_move();
    if after.king_square(opponent).is_some() && after.in_check(opponent) {
        san.push(if after.legal_moves().is_empty() { '#' } else { '+' });
    }
    san
}

fn body(board: &Board, mv: Move) -> String {
    let (origin, target) = (mv.origin(), mv.target());
    let target_name = square_name(target).unwrap_or_default();
    let piece_type = board.piece_type_on(origin).unwrap_or(PieceType::Pawn);
    let capture = mv.is_capture() || board.piece_on(target).is_some();
    let mut san = String::new();

    match piece_type.san_char() {
        None => {
            if capture {
                san.push((b'a' + file_of(origin) as u8) as char);
                san.push('x');
            }
            san.push_str(&target_name);
            if let Some(p) = mv.promotion_target() {
                san.push('=');
                san.push_str(&p.to_string().to_uppercase());
            }
        }
        Some(letter) => {
            san.push(letter);
            let rivals: Vec<Move> = board
                .legal_moves()
                .iter()
                .filter(|m| m.target() == target && m.origin() != origin)
                .filter(|m| board.piece_type_on(m.origin()) == Some(piece_type))
                .copied()
                .collect();
            if !rivals.is_empty() {
                let same_file = rivals.iter().any(|m| file_of(m.origin()) == file_of(origin));
                let same_rank = rivals.iter().any(|m| rank_of(m.origin()) == rank_of(origin));
                let origin_name = square_name(origin).unwrap_or_default();
                if !same_file {
                    san.push_str(&origin_name[0..1]);
                } else if !same_rank {
                    san.push_str(&origin_name[1..2]);
                } else {
                    san.push_str(&origin_name);
                }
            }
            if capture {
                san.push('x');
            }
            san.push_str(&target_name);
        }
    }
    san
}

/// Finds the legal move described by `text`, tolerating missing or extra
/// check marks, annotations, zero-style castling and over-disambiguation.
pub fn parse_san(board: &Board, text: &str) -> Option<Move> {
    let text = text.trim_end_matches(&['+', '#', '!', '?'][..]);
    let castle = match text {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    };
    if let Some(kingside) = castle {
        return board.legal_moves().iter().copied().find(|m| {
            matches!(
                (m.flags(), kingside),
                (MoveFlags::KingSideCastle, true) | (MoveFlags::QueenSideCastle, false)
            )
        });
    }

    let caps = SAN_RE.captures(text)?;
    let piece_type = match caps.get(1) {
        Some(p) => PieceType::from_san_char(p.as_str().chars().next()?)?,
        None => PieceType::Pawn,
    };
    let from_file = caps.get(2).map(|m| m.as_str().as_bytes()[0] - b'a');
    let from_rank = caps.get(3).map(|m| m.as_str().as_bytes()[0] - b'1');
    let target = parse_square(caps.get(5)?.as_str())?;
    let promotion = match caps.get(6) {
        Some(p) => Some(PieceType::from_san_char(p.as_str().chars().next()?.to_ascii_uppercase())?),
        None => None,
    };

    let legal = board.legal_moves();
    let mut found = legal.iter().copied().filter(|m| {
        m.target() == target
            && board.piece_type_on(m.origin()) == Some(piece_type)
            && from_file.map_or(true, |f| file_of(m.origin()) == f as usize)
            && from_rank.map_or(true, |r| rank_of(m.origin()) == r as usize)
            && m.promotion_target() == promotion
    });
    let mv = found.next()?;
    match found.next() {
        Some(_) => None,
        None => Some(mv),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(fen: &str, text: &str) -> String {
        let board = Board::from_fen(fen).unwrap();
        let mv = parse_san(&board, text).unwrap_or_else(|| panic!("{} should parse", text));
        san(&board, mv)
    }

    #[test]
    fn encodes_common_moves() {
        assert_eq!(round_trip(Board::STARTING_FEN, "e4"), "e4");
        assert_eq!(round_trip(Board::STARTING_FEN, "Nf3"), "Nf3");
        assert_eq!(round_trip("4k3/8/8/8/8/8/8/4K2R w K - 0 1", "0-0"), "O-O");
        assert_eq!(round_trip("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", "b8=Q"), "b8=Q+");
    }

    #[test]
    fn disambiguates_only_when_needed() {
        let fen = "4k3/8/8/8/8/8/4K3/R6R w - - 0 1";
        assert_eq!(round_trip(fen, "Rad1"), "Rad1");
        assert_eq!(round_trip(fen, "Ra1d1"), "Rad1");
        assert_eq!(round_trip(fen, "Ra2"), "Ra2");
        assert!(parse_san(&Board::from_fen(fen).unwrap(), "Rd1").is_none());
    }

    #[test]
    fn no_check_mark_without_an_enemy_king() {
        assert_eq!(round_trip("8/8/8/8/8/8/8/R3K3 w - - 0 1", "Ra8"), "Ra8");
    }

    #[test]
    fn tolerates_annotations() {
        let board = Board::from_fen(Board::STARTING_FEN).unwrap();
        assert!(parse_san(&board, "e4!?").is_some());
        assert!(parse_san(&board, "Nf3+").is_some());
        assert!(parse_san(&board, "--").is_none());
        assert!(parse_san(&board, "Ke2").is_none());
    }

    #[test]
    fn mate_is_marked() {
        let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
        assert_eq!(round_trip(fen, "Ra8"), "Ra8#");
    }
}
