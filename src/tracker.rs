use crate::board::Board;
use crate::error::{Error, Result};
use crate::movelist::MoveList;
use crate::piece::{Color, Piece, PieceType};
use crate::r#move::{Move, MoveFlags};
use crate::rules::Rules;
use crate::square::{parse_square, Square};
use crate::square_set::SquareSet;
use std::fmt::{Display, Formatter};
use tracing::{debug, trace};

/// The standard array without the hidden side and without pawns
pub const DEFAULT_SETUP: &str = "8/8/8/8/8/8/8/RNBQKBNR w KQ - 0 1";

/// Half-moves without capture or pawn move after which the game is drawn
pub const HALFMOVE_LIMIT: u32 = 100;

/// Notation of a hidden-side ply as stored in the game tree
pub const PASS_SAN: &str = "--";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    None,
    Check,
    Mate,
    Stalemate,
    Capture,
}

/// Status of one candidate square, with the arrows worth drawing for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareStatus {
    pub status: Status,
    pub arrows: Vec<(Square, Square)>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Outcome {
    pub winner: Option<Color>,
}

impl Outcome {
    pub const DRAW: Outcome = Outcome { winner: None };

    pub fn win(color: Color) -> Outcome {
        Outcome { winner: Some(color) }
    }

    /// Result token of an optional outcome, `*` while undecided
    pub fn result(outcome: Option<Outcome>) -> String {
        outcome.map_or_else(|| "*".to_string(), |o| o.to_string())
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.winner {
            Some(Color::White) => write!(f, "1-0"),
            Some(Color::Black) => write!(f, "0-1"),
            None => write!(f, "1/2-1/2"),
        }
    }
}

/// Presentation of every candidate status at once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub checks: SquareSet,
    pub arrows: Vec<(Square, Square)>,
}

struct Nearby {
    captures: SquareSet,
    attackers: Vec<(Square, Square)>,
    safe: SquareSet,
}

/// A position of the visible side together with every square the hidden
/// king could be standing on.
#[derive(Clone, Debug)]
pub struct Tracker<R: Rules = Board> {
    position: R,
    candidates: SquareSet,
    delta: SquareSet,
}

impl Default for Tracker<Board> {
    fn default() -> Self {
        Tracker::from_fen(DEFAULT_SETUP).expect("default setup is valid")
    }
}

impl<R: Rules> Tracker<R> {
    pub fn from_fen(fen: &str) -> Result<Self> {
        Self::from_setup(R::from_fen(fen)?)
    }

    /// Validates a setup and seeds the candidates with every safe square
    /// the visible side does not occupy. Hidden kings are dropped, any
    /// other hidden piece makes the setup invalid.
    pub fn from_setup(mut position: R) -> Result<Self> {
        for sq in position.pieces_of(Color::HIDDEN) {
            match position.piece_at(sq) {
                Some(p) if p.piece_type == PieceType::King => {
                    position.remove_piece(sq);
                }
                Some(p) => return Err(Error::InvalidSetup(format!("hidden side cannot own a {}", p))),
                None => (),
            }
        }
        let visible_kings = position
            .pieces_of(Color::VISIBLE)
            .iter()
            .filter(|sq| matches!(position.piece_at(*sq), Some(p) if p.piece_type == PieceType::King))
            .count();
        if visible_kings != 1 {
            return Err(Error::InvalidSetup(format!("expected one visible king, found {}", visible_kings)));
        }

        let free = !position.pieces_of(Color::VISIBLE);
        let candidates = free
            .iter()
            .filter(|sq| position.is_safe_from(*sq, Color::VISIBLE))
            .collect::<SquareSet>();
        if candidates.is_empty() {
            return Err(Error::InvalidSetup("no square can hold the hidden king".to_string()));
        }
        debug!(candidates = candidates.len(), "tracker initialized");
        Ok(Tracker {
            position,
            candidates,
            delta: SquareSet::EMPTY,
        })
    }

    pub fn position(&self) -> &R {
        &self.position
    }
    pub fn candidates(&self) -> SquareSet {
        self.candidates
    }
    /// Squares added to the candidates by the last hidden-side ply
    pub fn delta(&self) -> SquareSet {
        self.delta
    }
    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    pub fn is_safe(&self, sq: Square) -> bool {
        self.position.is_safe_from(sq, Color::VISIBLE)
    }

    pub fn king_step_targets(&self, sq: Square) -> SquareSet {
        self.position.king_step_targets(sq)
    }

    fn visible_attackers(&self, sq: Square) -> SquareSet {
        self.position
            .attackers(sq, Color::VISIBLE, self.position.pieces_of(Color::VISIBLE))
    }

    fn nearby(&self, king: Square) -> Nearby {
        let mut nearby = Nearby {
            captures: SquareSet::EMPTY,
            attackers: Vec::new(),
            safe: SquareSet::EMPTY,
        };
        let visible_king = self.position.king_of(Color::VISIBLE);
        for sq in self.king_step_targets(king) {
            let attackers = self.visible_attackers(sq);
            if attackers.is_empty() {
                nearby.safe = nearby.safe.with(sq);
                if self.position.pieces_of(Color::VISIBLE).has(sq) {
                    nearby.captures = nearby.captures.with(sq);
                }
            } else {
                nearby.attackers.extend(attackers.iter().map(|a| (a, sq)));
                if Some(sq) == visible_king {
                    nearby.captures = nearby.captures.with(sq);
                }
            }
        }
        nearby
    }

    /// Status of the hidden king, were it standing on `king`.
    ///
    /// # Panics
    /// When `king` is not a candidate.
    pub fn status(&self, king: Square) -> SquareStatus {
        assert!(self.candidates.has(king), "status asked for non-candidate square {}", king);
        let nearby = self.nearby(king);
        let status = if nearby.captures.non_empty() {
            SquareStatus {
                status: Status::Capture,
                arrows: nearby.captures.iter().map(|c| (king, c)).collect(),
            }
        } else {
            let in_check = !self.is_safe(king);
            let can_move = nearby.safe.non_empty();
            match (in_check, can_move) {
                (true, true) => SquareStatus { status: Status::Check, arrows: vec![] },
                (true, false) => SquareStatus { status: Status::Mate, arrows: vec![] },
                (false, false) => SquareStatus {
                    status: Status::Stalemate,
                    arrows: nearby.attackers,
                },
                (false, true) => SquareStatus { status: Status::None, arrows: vec![] },
            }
        };
        trace!(king, status = ?status.status, "candidate status");
        status
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome_with_witness().0
    }

    /// Outcome seen from the side to move, along with the candidate that
    /// decided it: the first capture or stalemate square on a draw, the
    /// first square still able to move when undecided.
    pub fn outcome_with_witness(&self) -> (Option<Outcome>, Option<Square>) {
        if self.turn() == Color::VISIBLE {
            let exhausted = self.position.halfmoves() >= HALFMOVE_LIMIT || self.legal_moves().is_empty();
            return (exhausted.then_some(Outcome::DRAW), None);
        }
        let mut movable = None;
        for king in self.candidates {
            match self.status(king).status {
                Status::Capture | Status::Stalemate => return (Some(Outcome::DRAW), Some(king)),
                Status::Mate => (),
                Status::None | Status::Check => {
                    movable.get_or_insert(king);
                }
            }
        }
        match movable {
            Some(king) => (None, Some(king)),
            None => (Some(Outcome::win(Color::VISIBLE)), None),
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }

    // Every square a candidate can safely step to
    fn stepped_candidates(&self) -> SquareSet {
        self.candidates
            .iter()
            .fold(SquareSet::EMPTY, |acc, king| acc | self.nearby(king).safe)
    }

    // Squares a visible move proves the hidden king is not standing on
    fn blocked_by(mv: Move) -> SquareSet {
        let blocked = SquareSet::from_square(mv.target());
        match mv.flags() {
            MoveFlags::DoublePush => blocked.with((mv.origin() + mv.target()) / 2),
            _ => blocked,
        }
    }

    // A push may not walk into the last square the hidden king can be on
    fn keeps_a_candidate(&self, mv: Move) -> bool {
        !(self.candidates - Self::blocked_by(mv)).is_empty()
    }

    /// On the visible side's turn, the base legal moves that leave the
    /// hidden king somewhere to stand; on the hidden side's turn, the pass.
    pub fn legal_moves(&self) -> MoveList {
        if self.turn() != Color::VISIBLE {
            return MoveList::from(vec![Move::NULL]);
        }
        let mut moves = MoveList::default();
        for mv in self.position.legal_moves().iter() {
            if self.keeps_a_candidate(*mv) {
                moves.push(*mv);
            }
        }
        moves
    }

    fn is_hidden_step(&self, mv: Move) -> bool {
        self.candidates.has(mv.origin())
            && self.king_step_targets(mv.origin()).has(mv.target())
            && self.stepped_candidates().has(mv.target())
    }

    /// Refuses illegal moves and anything after the game ended
    pub fn validate(&self, mv: Move) -> Result<()> {
        if let Some(outcome) = self.outcome() {
            return Err(Error::GameOver(outcome.to_string()));
        }
        let legal = if self.turn() == Color::VISIBLE {
            self.legal_moves().contains(&mv)
        } else {
            mv.is_null() || self.is_hidden_step(mv)
        };
        if legal {
            Ok(())
        } else {
            Err(Error::IllegalMove(mv.to_string()))
        }
    }

    /// Plays a validated move. A hidden-side king step is accepted but
    /// recorded as the pass, the candidates never collapse onto one square.
    pub fn play(&mut self, mv: Move) -> Result<()> {
        self.validate(mv)?;
        if self.turn() == Color::VISIBLE {
            self.play_visible(mv);
        } else {
            self.play_hidden();
        }
        Ok(())
    }

    // Histories in which the move would have run into the hidden king are gone
    fn play_visible(&mut self, mv: Move) {
        self.position.play(mv);
        self.candidates = self.candidates - Self::blocked_by(mv) - self.position.pieces_of(Color::VISIBLE);
        debug!(%mv, candidates = self.candidates.len(), "visible move");
    }

    fn play_hidden(&mut self) {
        let stepped = self.stepped_candidates();
        self.delta = stepped - self.candidates;
        self.candidates = stepped;
        self.position.pass();
        debug!(
            candidates = self.candidates.len(),
            added = self.delta.len(),
            "hidden king stepped"
        );
    }

    /// Notation of a move in this position, `--` for every hidden-side ply
    pub fn san(&self, mv: Move) -> String {
        if self.turn() == Color::VISIBLE {
            self.position.san(mv)
        } else {
            PASS_SAN.to_string()
        }
    }

    pub fn san_and_play(&mut self, mv: Move) -> Result<String> {
        let san = self.san(mv);
        self.play(mv)?;
        Ok(san)
    }

    /// Reads a move in this position. On the hidden side's turn, `--`,
    /// `Z0`, `0000` and any king move to a square the king could step to
    /// all stand for the pass.
    pub fn parse_san(&self, text: &str) -> Result<Move> {
        let illegal = || Error::IllegalMove(text.to_string());
        if self.turn() == Color::VISIBLE {
            return self.position.parse_san(text).ok_or_else(illegal);
        }
        let trimmed = text.trim_end_matches(&['+', '#', '!', '?'][..]);
        match trimmed {
            "--" | "Z0" | "0000" => Ok(Move::NULL),
            _ => {
                let target = trimmed
                    .strip_prefix('K')
                    .map(|rest| rest.trim_start_matches('x'))
                    .filter(|sq| sq.len() == 2)
                    .and_then(parse_square)
                    .ok_or_else(illegal)?;
                if self.stepped_candidates().has(target) {
                    Ok(Move::NULL)
                } else {
                    Err(illegal())
                }
            }
        }
    }

    /// Check highlights and arrows of every candidate. Arrows win over
    /// highlights, a stalemated candidate points at itself.
    pub fn marks(&self) -> Marks {
        let mut marks = Marks::default();
        if self.turn() == Color::VISIBLE {
            return marks;
        }
        for king in self.candidates {
            let SquareStatus { status, arrows } = self.status(king);
            marks.arrows.extend(arrows);
            match status {
                Status::Check | Status::Mate => marks.checks = marks.checks.with(king),
                Status::Stalemate => marks.arrows.push((king, king)),
                _ => (),
            }
        }
        if !marks.arrows.is_empty() {
            marks.checks = SquareSet::EMPTY;
        }
        marks
    }

    fn hidden_kings(&self, squares: SquareSet) -> Vec<(Square, Piece)> {
        squares
            .iter()
            .map(|sq| (sq, Piece::new(PieceType::King, Color::HIDDEN)))
            .collect()
    }

    /// Piece placement with a hidden king on every candidate
    pub fn board_fen_with_candidates(&self) -> String {
        self.position.board_fen_with(&self.hidden_kings(self.candidates))
    }

    /// Full FEN with the hidden king materialized on `king`
    pub fn fen_with_king(&self, king: Square) -> String {
        self.position.fen_with(&self.hidden_kings(SquareSet::from_square(king)))
    }
}

impl<R: Rules> Display for Tracker<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let sq = rank * 8 + file;
                match self.position.piece_at(sq) {
                    Some(p) => write!(f, " {}", p)?,
                    None if self.delta.has(sq) => write!(f, " +")?,
                    None if self.candidates.has(sq) => write!(f, " *")?,
                    None => write!(f, " .")?,
                }
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::parse_square;

    fn sq(name: &str) -> Square {
        parse_square(name).unwrap()
    }

    fn squares(names: &[&str]) -> SquareSet {
        names.iter().map(|n| sq(n)).collect()
    }

    #[test]
    fn default_setup_seeds_safe_squares() {
        let tracker: Tracker = Tracker::default();
        let candidates = tracker.candidates();
        assert!(!candidates.has(sq("e1")));
        // Rooks on a1 and h1 sweep their files
        assert!(!candidates.has(sq("a8")));
        assert!(!candidates.has(sq("h5")));
        // The queen sees the d-file and both diagonals
        assert!(!candidates.has(sq("d8")));
        assert!(!candidates.has(sq("a4")));
        assert!(candidates.has(sq("e8")));
        assert!(candidates.iter().all(|s| tracker.is_safe(s)));
        assert!(candidates.iter().all(|s| tracker.position().piece_at(s).is_none()));
    }

    #[test]
    fn rook_scenario_steps_into_safe_squares() {
        let mut tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/8/KR6 w - - 0 1").unwrap();
        let before = tracker.candidates();
        assert!(!before.has(sq("b5")));
        assert!(!before.has(sq("d1")));
        assert!(before.has(sq("d2")));

        let mv = tracker.parse_san("Rb2").unwrap();
        tracker.play(mv).unwrap();
        // The visible ply leaves the candidates alone, safety is enforced on the hidden ply
        assert_eq!(tracker.candidates(), before);

        let expected = before
            .iter()
            .flat_map(|s| SquareSet::KING_STEPS[s].iter())
            .filter(|s| tracker.is_safe(*s))
            .collect::<SquareSet>();
        tracker.play(Move::NULL).unwrap();
        assert_eq!(tracker.candidates(), expected);
        assert_eq!(tracker.delta(), expected - before);
        assert!(tracker.delta().has(sq("d1")));
        assert!(!tracker.candidates().has(sq("d2")));
        assert!(!tracker.candidates().has(sq("b5")));
        assert!(tracker.candidates().iter().all(|s| tracker.is_safe(s)));
    }

    #[test]
    fn every_candidate_mated_is_a_win() {
        let mut tracker = Tracker::<Board>::from_fen("R7/8/8/8/8/8/8/1R5K w - - 0 1").unwrap();
        tracker.candidates = squares(&["a1"]);
        let mv = tracker.parse_san("Rb7").unwrap();
        tracker.play(mv).unwrap();
        // a1 is hit down the a-file, b1 and b2 are covered from b7
        assert_eq!(tracker.status(sq("a1")).status, Status::Mate);
        assert_eq!(tracker.outcome(), Some(Outcome::win(Color::White)));
        assert!(matches!(tracker.play(Move::NULL), Err(Error::GameOver(_))));
    }

    #[test]
    fn mates_on_both_wings() {
        let mut tracker = Tracker::<Board>::from_fen("3R4/3R4/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        tracker.candidates = squares(&["a8", "h8"]);
        for king in tracker.candidates() {
            assert_eq!(tracker.status(king).status, Status::Mate, "{}", king);
        }
        assert_eq!(tracker.outcome_with_witness(), (Some(Outcome::win(Color::White)), None));
    }

    #[test]
    fn one_movable_candidate_keeps_the_game_open() {
        let mut tracker = Tracker::<Board>::from_fen("3R4/3R4/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        tracker.candidates = squares(&["a8", "e4"]);
        assert_eq!(tracker.status(sq("e4")).status, Status::None);
        assert_eq!(tracker.outcome_with_witness(), (None, Some(sq("e4"))));
    }

    #[test]
    fn capture_is_a_draw() {
        let mut tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/8/N3K3 b - - 0 1").unwrap();
        tracker.candidates = squares(&["b2", "h8"]);
        let status = tracker.status(sq("b2"));
        assert_eq!(status.status, Status::Capture);
        assert_eq!(status.arrows, vec![(sq("b2"), sq("a1"))]);
        assert_eq!(tracker.outcome_with_witness(), (Some(Outcome::DRAW), Some(sq("b2"))));
    }

    #[test]
    fn stalemate_is_a_draw() {
        let mut tracker = Tracker::<Board>::from_fen("8/8/1Q6/8/8/8/8/4K3 b - - 0 1").unwrap();
        tracker.candidates = squares(&["a8"]);
        // a8 itself is safe but the queen covers a7, b7 and b8
        let status = tracker.status(sq("a8"));
        assert_eq!(status.status, Status::Stalemate);
        assert!(status.arrows.contains(&(sq("b6"), sq("b7"))));
        assert_eq!(tracker.outcome(), Some(Outcome::DRAW));
        assert_eq!(tracker.marks().arrows.last(), Some(&(sq("a8"), sq("a8"))));
    }

    #[test]
    fn halfmove_limit_draws() {
        let tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/8/R3K3 w - - 100 80").unwrap();
        assert_eq!(tracker.outcome(), Some(Outcome::DRAW));
        let tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/8/R3K3 w - - 99 80").unwrap();
        assert_eq!(tracker.outcome(), None);
    }

    #[test]
    fn hidden_ply_notation() {
        let mut tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/8/KR6 b - - 0 1").unwrap();
        assert_eq!(tracker.parse_san("--").unwrap(), Move::NULL);
        assert_eq!(tracker.parse_san("Z0").unwrap(), Move::NULL);
        assert_eq!(tracker.parse_san("Kd5").unwrap(), Move::NULL);
        assert!(tracker.parse_san("Kb5").is_err());
        assert!(tracker.parse_san("Rh5").is_err());
        assert_eq!(tracker.san_and_play(Move::NULL).unwrap(), "--");
        assert_eq!(tracker.turn(), Color::White);
    }

    #[test]
    fn rejects_bad_setups() {
        assert!(matches!(Tracker::<Board>::from_fen("8/8/8/8/8/8/8/R7 w - - 0 1"), Err(Error::InvalidSetup(_))));
        assert!(matches!(Tracker::<Board>::from_fen("7q/8/8/8/8/8/8/K7 w - - 0 1"), Err(Error::InvalidSetup(_))));
        let tracker = Tracker::<Board>::from_fen("7k/8/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert!(tracker.position().king_of(Color::Black).is_none());
        assert!(tracker.candidates().has(sq("h8")));
    }

    #[test]
    fn visible_moves_must_be_legal() {
        let mut tracker: Tracker = Tracker::default();
        assert!(matches!(tracker.play(Move::new_quiet(0, 9)), Err(Error::IllegalMove(_))));
        let king_step = Move::new_quiet(sq("e1"), sq("e2"));
        assert!(tracker.play(king_step).is_ok());
        assert!(tracker.legal_moves().contains(&Move::NULL));
    }

    #[test]
    fn pushes_cannot_run_through_the_king() {
        let mut tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/4P3/K7 w - - 0 1").unwrap();
        assert!(tracker.candidates().has(sq("e3")));
        let mv = tracker.parse_san("e4").unwrap();
        tracker.play(mv).unwrap();
        assert!(!tracker.candidates().has(sq("e3")));
        assert!(!tracker.candidates().has(sq("e4")));
    }

    #[test]
    fn pushes_cannot_take_the_last_candidate() {
        let mut tracker = Tracker::<Board>::from_fen("7Q/7Q/Q7/Q7/1Q6/8/4P2Q/K1R5 w - - 0 1").unwrap();
        assert_eq!(tracker.candidates(), squares(&["e3"]));
        assert!(tracker.legal_moves().iter().all(|mv| mv.origin() != sq("e2")));
        assert!(!tracker.legal_moves().is_empty());
        let push = tracker.position().parse_san("e3").unwrap();
        assert!(matches!(tracker.play(push), Err(Error::IllegalMove(_))));
        let double = tracker.position().parse_san("e4").unwrap();
        assert!(matches!(tracker.play(double), Err(Error::IllegalMove(_))));
        assert!(tracker.parse_san("e3").is_ok());
        assert_eq!(tracker.candidates(), squares(&["e3"]));
        assert_eq!(tracker.outcome(), None);
    }

    #[test]
    fn candidates_render_as_kings() {
        let tracker = Tracker::<Board>::from_fen("8/8/8/8/8/8/8/K6R w - - 0 1").unwrap();
        let fen = tracker.board_fen_with_candidates();
        assert!(fen.starts_with("kkkkkkk1/"));
        assert!(fen.ends_with("/2kkkkk1/K6R"));
    }
}
