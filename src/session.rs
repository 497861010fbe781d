use crate::board::Board;
use crate::document;
use crate::error::{Error, Result};
use crate::piece::{Color, Piece, PieceType};
use crate::r#move::Move;
use crate::reconstruct::export;
use crate::square::Square;
use crate::timer::AutoMove;
use crate::tracker::Tracker;
use crate::tree::{GameTree, NodeId, Path};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Free board editing, no game tree
    Edit,
    Play,
    /// Waiting for the hidden side's delayed reply
    Timer,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Edit => "edit",
            Mode::Play => "play",
            Mode::Timer => "timer",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One interactive game: the tree, the active node, and the board being
/// edited before play starts.
pub struct Session {
    tree: GameTree,
    current: NodeId,
    mode: Mode,
    generation: u64,
    setup: Board,
    pub delay: Duration,
    pub auto_move: bool,
}

impl Default for Session {
    fn default() -> Self {
        let tree = GameTree::default();
        let setup = tree.node(tree.root()).tracker.position().clone();
        Session {
            current: tree.root(),
            tree,
            mode: Mode::Edit,
            generation: 0,
            setup,
            delay: Duration::from_millis(1000),
            auto_move: true,
        }
    }
}

impl Session {
    pub fn new(delay: Duration, auto_move: bool) -> Session {
        Session {
            delay,
            auto_move,
            ..Default::default()
        }
    }

    pub fn tree(&self) -> &GameTree {
        &self.tree
    }
    pub fn current(&self) -> NodeId {
        self.current
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }
    pub fn setup(&self) -> &Board {
        &self.setup
    }
    pub fn tracker(&self) -> &Tracker {
        &self.tree.node(self.current).tracker
    }
    pub fn path(&self) -> &Path {
        self.tree.path_of(self.current)
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "mode changed");
            self.mode = mode;
        }
    }

    /// Replaces the tree. Without a document the session goes back to
    /// board editing; a document that fails to load leaves the default
    /// game in play mode and the error is returned.
    pub fn load(&mut self, document: Option<&str>) -> Result<()> {
        self.generation += 1;
        let Some(text) = document else {
            self.tree = GameTree::default();
            self.current = self.tree.root();
            self.setup = self.tracker().position().clone();
            self.set_mode(Mode::Edit);
            return Ok(());
        };
        self.set_mode(Mode::Play);
        match document::load(text) {
            Ok(tree) => {
                self.tree = tree;
                self.current = self.tree.root();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "document rejected, starting from the default setup");
                self.tree = GameTree::default();
                self.current = self.tree.root();
                Err(e)
            }
        }
    }

    fn require(&self, mode: Mode) -> Result<()> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(Error::WrongMode(self.mode.name()))
        }
    }

    pub fn put(&mut self, sq: Square, piece: Piece) -> Result<()> {
        self.require(Mode::Edit)?;
        self.setup.add_piece(piece, sq);
        Ok(())
    }

    pub fn remove(&mut self, sq: Square) -> Result<Option<Piece>> {
        self.require(Mode::Edit)?;
        Ok(self.setup.remove_piece(sq))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.require(Mode::Edit)?;
        self.setup = Board::empty();
        Ok(())
    }

    /// Starts play from the edited board, White to move
    pub fn start(&mut self) -> Result<()> {
        self.require(Mode::Edit)?;
        let document = format!("[FEN \"{} w - - 0 1\"]", self.setup.board_fen());
        self.load(Some(&document))
    }

    /// Back to board editing on the default setup. A pending reply is
    /// dropped along with the tree.
    pub fn reset(&mut self) -> Result<()> {
        self.load(None)
    }

    fn enter(&mut self, mv: Move) -> Result<NodeId> {
        let played = self.tree.play(self.current, mv);
        match played {
            Ok(id) => {
                self.current = id;
                Ok(id)
            }
            Err(e) => {
                warn!(%mv, path = %self.path(), error = %e, "move rejected");
                Err(e)
            }
        }
    }

    /// Plays a visible-side move at the active node. When the game goes on,
    /// the session waits for the hidden side and hands out the ticket the
    /// caller should schedule.
    pub fn apply_move(&mut self, origin: Square, target: Square, promotion: Option<PieceType>) -> Result<Option<AutoMove>> {
        self.require(Mode::Play)?;
        let tracker = self.tracker();
        if tracker.turn() != Color::VISIBLE {
            return Err(Error::IllegalMove(format!("{} to move", Color::HIDDEN.name())));
        }
        let Some(mv) = tracker.position().find_move(origin, target, promotion) else {
            let mv = Move::new_quiet(origin, target);
            warn!(%mv, path = %self.path(), "move rejected");
            return Err(Error::IllegalMove(mv.to_string()));
        };
        self.enter(mv)?;
        if self.tracker().is_over() || !self.auto_move {
            return Ok(None);
        }
        self.generation += 1;
        self.set_mode(Mode::Timer);
        Ok(Some(AutoMove {
            generation: self.generation,
            delay: self.delay,
        }))
    }

    /// Plays the hidden side's pass at the active node
    pub fn pass(&mut self) -> Result<()> {
        self.require(Mode::Play)?;
        self.enter(Move::NULL).map(|_| ())
    }

    /// Runs the delayed hidden-side reply. Returns whether it was applied:
    /// tickets of an older generation, or arriving outside the timer mode,
    /// do nothing.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.mode != Mode::Timer {
            return false;
        }
        self.set_mode(Mode::Play);
        if let Some(next) = self.tree.children(self.current).first() {
            self.current = *next;
            return true;
        }
        self.enter(Move::NULL).is_ok()
    }

    pub fn next(&mut self) -> Result<bool> {
        self.require(Mode::Play)?;
        match self.tree.children(self.current).first() {
            Some(next) => {
                self.current = *next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn prev(&mut self) -> Result<bool> {
        self.require(Mode::Play)?;
        match self.tree.parent(self.current) {
            Some(parent) => {
                self.current = parent;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn first(&mut self) -> Result<()> {
        self.require(Mode::Play)?;
        self.current = self.tree.root();
        Ok(())
    }

    /// Follows the main line from the active node to its end
    pub fn last(&mut self) -> Result<()> {
        self.require(Mode::Play)?;
        while let Some(next) = self.tree.children(self.current).first() {
            self.current = *next;
        }
        Ok(())
    }

    pub fn goto(&mut self, path: &Path) -> Result<()> {
        self.require(Mode::Play)?;
        self.current = self
            .tree
            .node_at(path)
            .ok_or_else(|| Error::UnknownPath(path.to_string()))?;
        Ok(())
    }

    /// Notation document of the active line
    pub fn export(&self) -> Result<String> {
        if self.mode == Mode::Edit {
            return Err(Error::WrongMode(self.mode.name()));
        }
        export(&self.tree, self.path())
    }

    /// Text of the edited board in edit mode, of the active position otherwise
    pub fn fen(&self) -> String {
        match self.mode {
            Mode::Edit => self.setup.fen(),
            _ => self.tracker().board_fen_with_candidates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::parse_square;
    use crate::tracker::DEFAULT_SETUP;

    fn sq(name: &str) -> Square {
        parse_square(name).unwrap()
    }

    fn playing() -> Session {
        let mut session = Session::new(Duration::ZERO, true);
        session.load(Some("*")).unwrap();
        session
    }

    #[test]
    fn starts_in_edit_mode() {
        let session = Session::default();
        assert_eq!(session.mode(), Mode::Edit);
        assert_eq!(session.fen(), DEFAULT_SETUP);
    }

    #[test]
    fn loading_a_document_enters_play_at_the_root() {
        let mut session = Session::default();
        session.load(Some("1. Nf3 -- 2. Ng5 *")).unwrap();
        assert_eq!(session.mode(), Mode::Play);
        assert_eq!(session.current(), session.tree().root());
        assert_eq!(session.tree().len(), 4);
    }

    #[test]
    fn broken_documents_fall_back_to_the_default_game() {
        let mut session = Session::default();
        assert!(matches!(session.load(Some("1. Nf3 (")), Err(Error::InvalidPgn(_))));
        assert_eq!(session.mode(), Mode::Play);
        assert_eq!(session.tree().len(), 1);
        assert_eq!(session.tracker().position().fen(), DEFAULT_SETUP);
    }

    #[test]
    fn edited_board_becomes_the_setup() {
        let mut session = Session::default();
        session.clear().unwrap();
        session.put(sq("a1"), Piece::new(PieceType::King, Color::White)).unwrap();
        session.put(sq("b1"), Piece::new(PieceType::Rook, Color::White)).unwrap();
        session.put(sq("c1"), Piece::new(PieceType::Queen, Color::White)).unwrap();
        assert_eq!(session.remove(sq("c1")).unwrap().map(|p| p.piece_type), Some(PieceType::Queen));
        session.start().unwrap();
        assert_eq!(session.mode(), Mode::Play);
        assert_eq!(session.tracker().position().fen(), "8/8/8/8/8/8/8/KR6 w - - 0 1");
        assert!(matches!(session.put(sq("h1"), Piece::new(PieceType::Rook, Color::White)), Err(Error::WrongMode(_))));

        session.reset().unwrap();
        assert_eq!(session.mode(), Mode::Edit);
        assert_eq!(session.fen(), DEFAULT_SETUP);
    }

    #[test]
    fn visible_moves_schedule_the_reply() {
        let mut session = playing();
        let before = session.generation();
        let ticket = session.apply_move(sq("g1"), sq("f3"), None).unwrap().unwrap();
        assert_eq!(ticket.generation, before + 1);
        assert_eq!(session.mode(), Mode::Timer);
        assert!(matches!(session.apply_move(sq("f3"), sq("g5"), None), Err(Error::WrongMode("timer"))));

        assert!(session.fire(ticket.generation));
        assert_eq!(session.mode(), Mode::Play);
        assert_eq!(session.path().to_string(), "g1f3/0000");
        assert_eq!(session.tracker().turn(), Color::White);
    }

    #[test]
    fn stale_tickets_do_nothing() {
        let mut session = playing();
        let ticket = session.apply_move(sq("g1"), sq("f3"), None).unwrap().unwrap();
        session.load(Some("*")).unwrap();
        assert!(!session.fire(ticket.generation));
        assert_eq!(session.tree().len(), 1);
    }

    #[test]
    fn reset_drops_the_pending_reply() {
        let mut session = playing();
        let ticket = session.apply_move(sq("g1"), sq("f3"), None).unwrap().unwrap();
        assert_eq!(session.mode(), Mode::Timer);
        session.reset().unwrap();
        assert_eq!(session.mode(), Mode::Edit);
        assert!(session.generation() > ticket.generation);
        assert!(!session.fire(ticket.generation));
        assert_eq!(session.mode(), Mode::Edit);
        assert_eq!(session.tree().len(), 1);
        assert_eq!(session.fen(), DEFAULT_SETUP);
    }

    #[test]
    fn broken_en_passant_squares_fail_the_load() {
        let mut session = Session::default();
        let loaded = session.load(Some("[FEN \"8/8/8/8/8/8/8/K7 w - a1 0 1\"]\n\n1. Kb1 *"));
        assert!(matches!(loaded, Err(Error::InvalidFen(_))));
        assert_eq!(session.tree().len(), 1);
        assert_eq!(session.tracker().position().fen(), DEFAULT_SETUP);
    }

    #[test]
    fn reply_follows_an_existing_branch() {
        let mut session = Session::new(Duration::ZERO, true);
        session.load(Some("1. Nf3 Kg6 2. Ng5 *")).unwrap();
        let ticket = session.apply_move(sq("g1"), sq("f3"), None).unwrap().unwrap();
        assert!(session.fire(ticket.generation));
        assert_eq!(session.tree().len(), 4);
        assert!(session.next().unwrap());
        assert_eq!(session.tree().node(session.current()).san.as_deref(), Some("Ng5"));
    }

    #[test]
    fn illegal_moves_change_nothing() {
        let mut session = playing();
        assert!(matches!(session.apply_move(sq("g1"), sq("g3"), None), Err(Error::IllegalMove(_))));
        assert_eq!(session.tree().len(), 1);
        assert_eq!(session.mode(), Mode::Play);
    }

    #[test]
    fn deciding_moves_schedule_nothing() {
        let mut session = playing();
        // The knight on c3 can be taken by a king on b2, c2 or d2
        assert_eq!(session.apply_move(sq("b1"), sq("c3"), None).unwrap(), None);
        assert_eq!(session.mode(), Mode::Play);
        assert!(session.tracker().is_over());
        assert!(matches!(session.pass(), Err(Error::GameOver(_))));
    }

    #[test]
    fn navigation_walks_the_tree() {
        let mut session = Session::default();
        assert!(matches!(session.next(), Err(Error::WrongMode("edit"))));
        session.load(Some("1. Nf3 -- 2. Ng5 -- (2... Z0) 3. Nh3 *")).unwrap();
        session.last().unwrap();
        assert_eq!(session.path().to_string(), "g1f3/0000/f3g5/0000/g5h3");
        assert!(session.prev().unwrap());
        session.first().unwrap();
        assert!(!session.prev().unwrap());
        session.goto(&"g1f3/0000".parse().unwrap()).unwrap();
        assert_eq!(session.tracker().turn(), Color::White);
        assert!(matches!(session.goto(&"a2a4".parse().unwrap()), Err(Error::UnknownPath(_))));
    }

    #[test]
    fn export_reconstructs_the_active_line() {
        let mut session = playing();
        let ticket = session.apply_move(sq("g1"), sq("f3"), None).unwrap().unwrap();
        session.fire(ticket.generation);
        let pgn = session.export().unwrap();
        assert!(pgn.contains("[Result \"*\"]"));
        assert!(pgn.contains("1. Nf3 K"));
    }
}
